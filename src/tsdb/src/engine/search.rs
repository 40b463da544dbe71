//! Timestamp search over a channel whose samples never decrease.
//!
//! Both searches reduce to `first_greater`: the first index whose sample is
//! strictly greater than the target. Block minima narrow the search to one
//! block, so a search reads at most one block of samples and loads at most
//! one slot.

use crate::engine::channel::ChannelStore;
use crate::error::{Error, Result};
use crate::sample::SampleType;

impl<T: SampleType> ChannelStore<T> {
    /// first_greater returns the first index below `upper` holding a sample
    /// greater than `target`, or `upper` if there is none.
    async fn first_greater(&self, target: T, upper: usize) -> Result<usize> {
        let block_size = self.options().block_size;
        let blocks = self.leading_blocks_at_or_below(target).await?;
        if upper == 0 || blocks == 0 {
            return Ok(0);
        }

        // every sample before this block is <= its first sample <= target
        let start = (blocks - 1) * block_size;
        if start >= upper {
            return Ok(upper);
        }

        let end = (start + block_size).min(upper);
        let samples = self.get_range(start, end - 1).await?;
        Ok(start + samples.partition_point(|s| *s <= target))
    }

    /// closest_at_or_before returns the greatest index in `0..=max_index`
    /// whose sample is at most `target`. Among equal samples the last one
    /// wins. `None` means every sample up to `max_index` is later.
    pub async fn closest_at_or_before(&self, target: T, max_index: usize) -> Result<Option<usize>> {
        let count = self.sample_count().await;
        if max_index >= count {
            return Err(Error::IndexOutOfRange {
                index: max_index,
                count,
            });
        }

        let p = self.first_greater(target, max_index + 1).await?;
        Ok(p.checked_sub(1))
    }

    /// closest_after returns the smallest index whose sample is greater than
    /// `target`, or `None` if no such sample has been appended yet.
    pub async fn closest_after(&self, target: T) -> Result<Option<usize>> {
        let count = self.sample_count().await;
        let p = self.first_greater(target, count).await?;
        Ok(if p < count { Some(p) } else { None })
    }
}
