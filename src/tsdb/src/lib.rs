//! Tiered storage for telemetry samples.
//!
//! Samples are appended to per-channel stores that keep the newest slots in
//! memory and page older slots out to one file per slot. Reads by index and
//! timestamp searches hide where a slot currently lives.

pub mod cache;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod options;
pub mod sample;

pub use dataset::Dataset;
pub use engine::{ChannelStats, ChannelStore, PageStore};
pub use error::{Error, Result};
pub use options::StoreOptions;
pub use sample::SampleType;
