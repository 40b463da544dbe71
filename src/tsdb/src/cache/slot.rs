use std::sync::Arc;

use crate::cache::block::Block;
use crate::sample::SampleType;

/// Slot is a fixed-capacity group of consecutive blocks and the unit of disk
/// paging. Blocks are allocated on demand, so a fresh slot holds no memory.
#[derive(Clone, Debug)]
pub struct Slot<T: SampleType> {
    blocks: Vec<Block<T>>,
    block_size: usize,
    capacity: usize,
    len: usize,
}

impl<T: SampleType> Slot<T> {
    pub fn new(block_size: usize, slot_size: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(slot_size / block_size),
            block_size,
            capacity: slot_size,
            len: 0,
        }
    }

    /// from_samples rebuilds a slot from its serialized samples.
    ///
    /// Panics if `samples` does not fit in the slot.
    pub fn from_samples(block_size: usize, slot_size: usize, samples: &[T]) -> Self {
        assert!(samples.len() <= slot_size);
        let mut slot = Self::new(block_size, slot_size);
        for chunk in samples.chunks(block_size) {
            slot.blocks.push(Block::from_samples(block_size, chunk));
        }
        slot.len = samples.len();
        slot
    }

    /// append adds `value` after the last sample, opening a new block when the
    /// current one is full. Returns false and does nothing when the slot is full.
    pub fn append(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        match self.blocks.last_mut() {
            Some(block) if !block.is_full() => {
                block.push(value);
            }
            _ => {
                let mut block = Block::new(self.block_size);
                block.push(value);
                self.blocks.push(block);
            }
        }
        self.len += 1;
        true
    }

    pub fn get(&self, local_index: usize) -> T {
        self.blocks[local_index / self.block_size].get(local_index % self.block_size)
    }

    /// copy_into appends `count` samples starting at `local_index` to `out`.
    ///
    /// Panics if the run extends past the filled part of the slot.
    pub fn copy_into(&self, local_index: usize, count: usize, out: &mut Vec<T>) {
        assert!(
            local_index + count <= self.len,
            "slot range [{}, {}) out of length {}",
            local_index,
            local_index + count,
            self.len
        );

        let mut next = local_index;
        let end = local_index + count;
        while next < end {
            let block = &self.blocks[next / self.block_size];
            let offset = next % self.block_size;
            let take = (self.block_size - offset).min(end - next);
            out.extend_from_slice(&block.as_slice()[offset..offset + take]);
            next += take;
        }
    }

    pub fn block(&self, i: usize) -> &Block<T> {
        &self.blocks[i]
    }

    pub fn blocks(&self) -> &[Block<T>] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn fill_fraction(&self) -> f32 {
        self.len as f32 / self.capacity as f32
    }
}

/// SlotState is the residency of a sealed slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    MemoryResident,
    OnDisk,
    Loading,
}

/// Residency tags where a sealed slot's samples currently live. A resident
/// slot is shared immutably, so a reader holding it is unaffected by a
/// concurrent release.
#[derive(Clone, Debug)]
pub enum Residency<T: SampleType> {
    MemoryResident(Arc<Slot<T>>),
    OnDisk,
    Loading,
}

impl<T: SampleType> Residency<T> {
    pub fn state(&self) -> SlotState {
        match self {
            Self::MemoryResident(_) => SlotState::MemoryResident,
            Self::OnDisk => SlotState::OnDisk,
            Self::Loading => SlotState::Loading,
        }
    }

    pub fn resident(&self) -> Option<&Arc<Slot<T>>> {
        match self {
            Self::MemoryResident(slot) => Some(slot),
            _ => None,
        }
    }
}
