//! Dataset: the storage of one telemetry connection.
//!
//! A dataset owns one `f32` channel per measured quantity and one `i64`
//! channel of millisecond timestamps, all advancing together. The timestamps
//! channel is written last, so its length is the dataset's sample count and
//! a reader never sees a row whose values are still being written.
//!
//! Page files live under `{cache_dir}/{dataset}/{channel}/`.

use std::collections::HashSet;
use std::sync::Arc;

use telemetry_storage::remove_dir_if_exists;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::block::BlockSummary;
use crate::engine::channel::{validate_channel_id, ChannelStats, ChannelStore};
use crate::engine::page::PageStore;
use crate::error::{Error, Result};
use crate::options::StoreOptions;

const TIMESTAMPS_CHANNEL: &str = "timestamps";

#[derive(Default)]
struct AppendState {
    newest: Option<i64>,
    /// a row reached some value channels but not the timestamps channel
    poisoned: bool,
}

pub struct Dataset {
    name: String,
    names: Vec<String>,
    pages: Arc<PageStore>,
    values: Vec<ChannelStore<f32>>,
    timestamps: ChannelStore<i64>,
    /// serializes appends
    writer: Mutex<AppendState>,
}

impl Dataset {
    pub fn new<S: AsRef<str>>(name: &str, channels: &[S], options: StoreOptions) -> Result<Self> {
        options.validate()?;
        validate_channel_id(name)?;
        let pages = Arc::new(PageStore::new(options.cache_dir.join(name)));

        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(channels.len());
        let mut values = Vec::with_capacity(channels.len());
        for channel in channels {
            let channel = channel.as_ref();
            if channel == TIMESTAMPS_CHANNEL || !seen.insert(channel) {
                return Err(Error::InvalidOptions(format!(
                    "duplicate channel name {:?} in dataset {}",
                    channel, name
                )));
            }
            values.push(ChannelStore::new(channel, options.clone(), pages.clone())?);
            names.push(channel.to_string());
        }

        let timestamps = ChannelStore::new(TIMESTAMPS_CHANNEL, options, pages.clone())?;

        Ok(Self {
            name: name.to_string(),
            names,
            pages,
            values,
            timestamps,
            writer: Mutex::new(AppendState::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel_names(&self) -> &[String] {
        &self.names
    }

    fn channel(&self, name: &str) -> Result<&ChannelStore<f32>> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
            .ok_or_else(|| Error::UnknownChannel(name.to_string()))
    }

    /// append stores one row: a value for every channel, in the order of
    /// `channel_names`, taken at `timestamp_ms`. Returns the row's index.
    ///
    /// If a page write fails part way, channels written before the failure
    /// keep the new value while the row stays invisible. Every later append
    /// fails with [`Error::Inconsistent`] until the dataset is cleared.
    pub async fn append(&self, values: &[f32], timestamp_ms: i64) -> Result<usize> {
        let mut state = self.writer.lock().await;
        if state.poisoned {
            return Err(Error::Inconsistent(self.name.clone()));
        }
        if values.len() != self.values.len() {
            return Err(Error::ArityMismatch {
                expected: self.values.len(),
                actual: values.len(),
            });
        }
        if let Some(previous) = state.newest {
            if timestamp_ms < previous {
                return Err(Error::OutOfOrder {
                    previous,
                    timestamp: timestamp_ms,
                });
            }
        }

        let mut written = 0_usize;
        let appended: Result<usize> = async {
            for (channel, value) in self.values.iter().zip(values) {
                channel.append(*value).await?;
                written += 1;
            }
            self.timestamps.append(timestamp_ms).await
        }
        .await;

        match appended {
            Ok(index) => {
                state.newest = Some(timestamp_ms);
                Ok(index)
            }
            Err(e) => {
                // a channel that fails keeps its old length
                if written > 0 {
                    state.poisoned = true;
                    warn!(dataset = %self.name, written, "append failed part way: {}", e);
                }
                Err(e)
            }
        }
    }

    pub async fn sample_count(&self) -> usize {
        self.timestamps.sample_count().await
    }

    async fn check_index(&self, index: usize) -> Result<()> {
        let count = self.sample_count().await;
        if index >= count {
            return Err(Error::IndexOutOfRange { index, count });
        }
        Ok(())
    }

    pub async fn first_timestamp(&self) -> Result<Option<i64>> {
        if self.sample_count().await == 0 {
            return Ok(None);
        }
        self.timestamps.get(0).await.map(Some)
    }

    pub async fn last_timestamp(&self) -> Result<Option<i64>> {
        match self.sample_count().await {
            0 => Ok(None),
            count => self.timestamps.get(count - 1).await.map(Some),
        }
    }

    pub async fn value(&self, channel: &str, index: usize) -> Result<f32> {
        let channel = self.channel(channel)?;
        self.check_index(index).await?;
        channel.get(index).await
    }

    pub async fn values(&self, channel: &str, first: usize, last: usize) -> Result<Vec<f32>> {
        let channel = self.channel(channel)?;
        if last >= first {
            self.check_index(last).await?;
        }
        channel.get_range(first, last).await
    }

    pub async fn value_min_max(
        &self,
        channel: &str,
        first: usize,
        last: usize,
    ) -> Result<BlockSummary<f32>> {
        let channel = self.channel(channel)?;
        if last >= first {
            self.check_index(last).await?;
        }
        channel.range_min_max(first, last).await
    }

    pub async fn timestamp(&self, index: usize) -> Result<i64> {
        self.timestamps.get(index).await
    }

    /// timestamps_relative returns `timestamp - origin_ms` for `first..=last`
    /// as `f32`, the x coordinates of a plot whose left edge is `origin_ms`.
    pub async fn timestamps_relative(
        &self,
        first: usize,
        last: usize,
        origin_ms: i64,
    ) -> Result<Vec<f32>> {
        let timestamps = self.timestamps.get_range(first, last).await?;
        Ok(timestamps
            .into_iter()
            .map(|t| (t - origin_ms) as f32)
            .collect())
    }

    /// closest_at_or_before returns the last row at or before `timestamp_ms`
    /// among rows `0..=max_index`.
    pub async fn closest_at_or_before(
        &self,
        timestamp_ms: i64,
        max_index: usize,
    ) -> Result<Option<usize>> {
        self.timestamps
            .closest_at_or_before(timestamp_ms, max_index)
            .await
    }

    /// closest_after returns the first row after `timestamp_ms`.
    pub async fn closest_after(&self, timestamp_ms: i64) -> Result<Option<usize>> {
        self.timestamps.closest_after(timestamp_ms).await
    }

    pub async fn stats(&self) -> Vec<(String, ChannelStats)> {
        let mut stats = Vec::with_capacity(self.values.len() + 1);
        for channel in self.values.iter() {
            stats.push((channel.id().to_string(), channel.stats().await));
        }
        stats.push((
            self.timestamps.id().to_string(),
            self.timestamps.stats().await,
        ));
        stats
    }

    /// clear drops every row. Must not race with other operations.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.writer.lock().await;
        for channel in self.values.iter() {
            channel.clear().await?;
        }
        self.timestamps.clear().await?;
        *state = AppendState::default();
        info!(dataset = %self.name, "cleared dataset");
        Ok(())
    }

    /// dispose deletes every page file of the dataset and its directory.
    /// Disposing twice is not an error.
    pub async fn dispose(&self) -> Result<()> {
        let mut state = self.writer.lock().await;
        for channel in self.values.iter() {
            channel.dispose().await?;
        }
        self.timestamps.dispose().await?;
        let root = self.pages.root();
        remove_dir_if_exists(root)
            .await
            .map_err(|e| Error::io(root, e))?;
        *state = AppendState::default();
        info!(dataset = %self.name, "disposed dataset");
        Ok(())
    }
}
