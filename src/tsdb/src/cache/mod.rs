//! Memory tier: fixed-size blocks grouped into slots.
//!
//! A sample index maps to `(slot, block, offset)` by plain arithmetic:
//! `slot = i / slot_size`, `block = (i % slot_size) / block_size`,
//! `offset = i % block_size`.

pub mod block;
pub mod slot;

pub use block::{Block, BlockSummary};
pub use slot::{Residency, Slot, SlotState};
