use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// DEFAULT_BLOCK_SIZE is the number of samples per in-memory block.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// DEFAULT_SLOT_SIZE is the number of samples per disk-paged slot (1M).
pub const DEFAULT_SLOT_SIZE: usize = 1024 * 1024;

/// DEFAULT_LOADED_SLOT_LIMIT bounds the slots kept resident after being read back from disk.
pub const DEFAULT_LOADED_SLOT_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreOptions {
    /// Directory holding one sub-directory of page files per channel.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Must be a multiple of `block_size`.
    #[serde(default = "default_slot_size")]
    pub slot_size: usize,

    /// Slots loaded back from disk that may stay resident at once; the least
    /// recently loaded one is released first.
    #[serde(default = "default_loaded_slot_limit")]
    pub loaded_slot_limit: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            block_size: default_block_size(),
            slot_size: default_slot_size(),
            loaded_slot_limit: default_loaded_slot_limit(),
        }
    }
}

impl StoreOptions {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_geometry(mut self, block_size: usize, slot_size: usize) -> Self {
        self.block_size = block_size;
        self.slot_size = slot_size;
        self
    }

    pub fn with_loaded_slot_limit(mut self, limit: usize) -> Self {
        self.loaded_slot_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::InvalidOptions("block_size must be positive".to_string()));
        }
        if self.slot_size == 0 || self.slot_size % self.block_size != 0 {
            return Err(Error::InvalidOptions(format!(
                "slot_size {} must be a positive multiple of block_size {}",
                self.slot_size, self.block_size
            )));
        }
        if self.slot_size > u32::MAX as usize {
            return Err(Error::InvalidOptions(format!(
                "slot_size {} exceeds the page sample limit {}",
                self.slot_size,
                u32::MAX
            )));
        }
        if self.loaded_slot_limit == 0 {
            return Err(Error::InvalidOptions(
                "loaded_slot_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

fn default_slot_size() -> usize {
    DEFAULT_SLOT_SIZE
}

fn default_loaded_slot_limit() -> usize {
    DEFAULT_LOADED_SLOT_LIMIT
}
