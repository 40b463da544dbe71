use std::iter::Peekable;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::block::BlockSummary;
use crate::cache::slot::{Residency, Slot, SlotState};
use crate::engine::page::PageStore;
use crate::error::{Error, Result};
use crate::options::StoreOptions;
use crate::sample::SampleType;

/// ChannelStats is a point-in-time view of a channel's residency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStats {
    pub sample_count: usize,
    pub slot_count: usize,
    pub resident_slots: usize,
    pub on_disk_slots: usize,
    /// page files read back since the channel was created or cleared
    pub page_loads: u64,
}

struct SlotEntry<T: SampleType> {
    residency: Residency<T>,
    /// the page file exists and matches the slot
    persisted: bool,
    /// load epoch, orders read-back slots for release
    resident_since: u64,
    load_lock: Arc<Mutex<()>>,
}

impl<T: SampleType> SlotEntry<T> {
    fn sealed(slot: Slot<T>, epoch: u64) -> Self {
        Self {
            residency: Residency::MemoryResident(Arc::new(slot)),
            persisted: false,
            resident_since: epoch,
            load_lock: Arc::new(Mutex::new(())),
        }
    }
}

struct ChannelState<T: SampleType> {
    /// every slot before the open one, all full and immutable
    sealed: Vec<SlotEntry<T>>,
    /// slot `sealed.len()`, the only one appended to
    open: Slot<T>,
    summaries: Vec<BlockSummary<T>>,
    count: usize,
    epoch: u64,
    page_loads: u64,
    disposed: bool,
}

impl<T: SampleType> ChannelState<T> {
    fn new(options: &StoreOptions) -> Self {
        Self {
            sealed: vec![],
            open: Slot::new(options.block_size, options.slot_size),
            summaries: vec![],
            count: 0,
            epoch: 0,
            page_loads: 0,
            disposed: false,
        }
    }

    fn check_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn check_range(&self, first: usize, last: usize) -> Result<()> {
        self.check_live()?;
        if last < first {
            return Err(Error::InvalidRange { first, last });
        }
        if last >= self.count {
            return Err(Error::IndexOutOfRange {
                index: last,
                count: self.count,
            });
        }
        Ok(())
    }

    fn push(&mut self, value: T, block_size: usize) {
        let index = self.count;
        self.open.append(value);
        match self.summaries.last_mut() {
            Some(summary) if index % block_size != 0 => summary.include(value),
            _ => self.summaries.push(BlockSummary::of(value)),
        }
        self.count += 1;
    }

    /// release_loaded drops the least recently loaded slots until at most
    /// `limit` read-back slots stay resident.
    fn release_loaded(&mut self, limit: usize, channel: &str) {
        loop {
            let loaded = self
                .sealed
                .iter()
                .enumerate()
                .filter(|(_, e)| e.persisted && e.residency.resident().is_some());
            if loaded.clone().count() <= limit {
                return;
            }

            let oldest = loaded.min_by_key(|(_, e)| e.resident_since).map(|(i, _)| i);
            match oldest {
                Some(slot_index) => {
                    self.sealed[slot_index].residency = Residency::OnDisk;
                    debug!(channel, slot_index, "released loaded slot");
                }
                None => return,
            }
        }
    }
}

/// ChannelStore keeps one unbounded, append-only stream of samples.
///
/// The newest slots live in memory; older slots are paged out to the
/// [`PageStore`] and read back on demand. There is a single writer; any
/// number of readers may query concurrently with it.
pub struct ChannelStore<T: SampleType> {
    id: String,
    options: StoreOptions,
    pages: Arc<PageStore>,
    state: RwLock<ChannelState<T>>,
    writer: Mutex<()>,
}

impl<T: SampleType> ChannelStore<T> {
    pub fn new(id: impl Into<String>, options: StoreOptions, pages: Arc<PageStore>) -> Result<Self> {
        let id = id.into();
        options.validate()?;
        validate_channel_id(&id)?;

        Ok(Self {
            state: RwLock::new(ChannelState::new(&options)),
            id,
            options,
            pages,
            writer: Mutex::new(()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// append stores `value` and returns its sample index.
    pub async fn append(&self, value: T) -> Result<usize> {
        self.push_values(std::iter::once(value)).await
    }

    /// extend appends every sample of `values` in order and returns the index
    /// of the first one.
    pub async fn extend(&self, values: &[T]) -> Result<usize> {
        self.push_values(values.iter().copied()).await
    }

    /// append_repeated stores `count` copies of `value`.
    pub async fn append_repeated(&self, value: T, count: usize) -> Result<usize> {
        self.push_values(std::iter::repeat(value).take(count)).await
    }

    async fn push_values<I>(&self, values: I) -> Result<usize>
    where
        I: Iterator<Item = T> + Send,
    {
        let _writer = self.writer.lock().await;
        let first_index = {
            let st = self.state.read().await;
            st.check_live()?;
            st.count
        };

        let block_size = self.options.block_size;
        let mut values: Peekable<I> = values.peekable();
        while values.peek().is_some() {
            let open_full = {
                let st = self.state.read().await;
                st.check_live()?;
                st.open.is_full()
            };
            if open_full {
                self.roll_over().await?;
            }

            let mut st = self.state.write().await;
            let room = st.open.capacity() - st.open.len();
            for value in values.by_ref().take(room) {
                st.push(value, block_size);
            }
        }

        Ok(first_index)
    }

    /// roll_over seals the full open slot and opens the next one. The slot
    /// two before the new one is flushed and released first; if that flush
    /// fails the channel is left as it was.
    async fn roll_over(&self) -> Result<()> {
        let flush_target = {
            let st = self.state.read().await;
            st.check_live()?;
            st.sealed.len().checked_sub(1).and_then(|slot_index| {
                let entry = &st.sealed[slot_index];
                match (&entry.residency, entry.persisted) {
                    (Residency::MemoryResident(slot), false) => Some((slot_index, slot.clone())),
                    _ => None,
                }
            })
        };

        if let Some((slot_index, slot)) = &flush_target {
            self.flush_slot(*slot_index, slot).await?;
        }

        let mut st = self.state.write().await;
        st.check_live()?;
        if let Some((slot_index, _)) = flush_target {
            let entry = &mut st.sealed[slot_index];
            entry.persisted = true;
            entry.residency = Residency::OnDisk;
            debug!(channel = %self.id, slot_index, "released flushed slot");
        }

        let full = std::mem::replace(
            &mut st.open,
            Slot::new(self.options.block_size, self.options.slot_size),
        );
        st.epoch += 1;
        let epoch = st.epoch;
        st.sealed.push(SlotEntry::sealed(full, epoch));
        debug!(channel = %self.id, slot_index = st.sealed.len(), "opened slot");
        Ok(())
    }

    async fn flush_slot(&self, slot_index: usize, slot: &Slot<T>) -> Result<u64> {
        self.pages.flush(&self.id, slot_index, slot).await
    }

    /// load_slot returns a sealed slot, reading it back from its page file if
    /// it is not resident. Concurrent misses on one slot read the file once.
    async fn load_slot(&self, slot_index: usize) -> Result<Arc<Slot<T>>> {
        let load_lock = {
            let st = self.state.read().await;
            st.check_live()?;
            let entry = self.sealed_entry(&st, slot_index)?;
            if let Some(slot) = entry.residency.resident() {
                return Ok(slot.clone());
            }
            entry.load_lock.clone()
        };

        let _loading = load_lock.lock().await;
        {
            let mut st = self.state.write().await;
            st.check_live()?;
            let count = st.count;
            let entry = st
                .sealed
                .get_mut(slot_index)
                .ok_or(Error::IndexOutOfRange {
                    index: slot_index * self.options.slot_size,
                    count,
                })?;
            if let Some(slot) = entry.residency.resident() {
                return Ok(slot.clone());
            }
            entry.residency = Residency::Loading;
        }

        let loaded = self
            .pages
            .load::<T>(
                &self.id,
                slot_index,
                self.options.block_size,
                self.options.slot_size,
            )
            .await;

        let mut st = self.state.write().await;
        st.check_live()?;
        match loaded {
            Ok(slot) => {
                let slot = Arc::new(slot);
                st.epoch += 1;
                st.page_loads += 1;
                let epoch = st.epoch;
                let entry = &mut st.sealed[slot_index];
                entry.residency = Residency::MemoryResident(slot.clone());
                entry.resident_since = epoch;
                debug!(channel = %self.id, slot_index, "loaded slot");

                st.release_loaded(self.options.loaded_slot_limit, &self.id);
                Ok(slot)
            }
            Err(e) => {
                st.sealed[slot_index].residency = Residency::OnDisk;
                Err(e)
            }
        }
    }

    fn sealed_entry<'a>(
        &self,
        st: &'a ChannelState<T>,
        slot_index: usize,
    ) -> Result<&'a SlotEntry<T>> {
        st.sealed.get(slot_index).ok_or(Error::IndexOutOfRange {
            index: slot_index * self.options.slot_size,
            count: st.count,
        })
    }

    /// with_slot runs `f` on slot `slot_index`, wherever it lives.
    async fn with_slot<F, R>(&self, slot_index: usize, f: F) -> Result<R>
    where
        F: FnOnce(&Slot<T>) -> R + Send,
    {
        {
            let st = self.state.read().await;
            st.check_live()?;
            if slot_index == st.sealed.len() {
                return Ok(f(&st.open));
            }
            if let Some(slot) = self.sealed_entry(&st, slot_index)?.residency.resident() {
                return Ok(f(slot));
            }
        }

        let slot = self.load_slot(slot_index).await?;
        Ok(f(&slot))
    }

    pub async fn get(&self, index: usize) -> Result<T> {
        {
            let st = self.state.read().await;
            st.check_live()?;
            if index >= st.count {
                return Err(Error::IndexOutOfRange {
                    index,
                    count: st.count,
                });
            }
        }

        let slot_size = self.options.slot_size;
        self.with_slot(index / slot_size, |slot| slot.get(index % slot_size))
            .await
    }

    /// get_range returns samples `first..=last` as one contiguous buffer.
    pub async fn get_range(&self, first: usize, last: usize) -> Result<Vec<T>> {
        self.state.read().await.check_range(first, last)?;

        let slot_size = self.options.slot_size;
        let mut out = Vec::with_capacity(last - first + 1);
        let mut next = first;
        while next <= last {
            let local = next % slot_size;
            let take = (slot_size - local).min(last + 1 - next);
            let buf = &mut out;
            self.with_slot(next / slot_size, move |slot| {
                slot.copy_into(local, take, buf)
            })
            .await?;
            next += take;
        }
        Ok(out)
    }

    /// range_min_max returns the smallest and largest sample in `first..=last`.
    /// Blocks fully inside the range are answered from their summaries; only
    /// the partially covered edge blocks are read.
    pub async fn range_min_max(&self, first: usize, last: usize) -> Result<BlockSummary<T>> {
        self.state.read().await.check_range(first, last)?;

        let block_size = self.options.block_size;
        let first_block = first / block_size;
        let last_block = last / block_size;
        if first_block == last_block {
            return self.summarize_range(first, last).await;
        }

        let mut full_blocks = first_block..last_block + 1;
        let mut edges = Vec::with_capacity(2);
        if first % block_size != 0 {
            edges.push((first, (first_block + 1) * block_size - 1));
            full_blocks.start += 1;
        }
        if last % block_size != block_size - 1 {
            edges.push((last_block * block_size, last));
            full_blocks.end -= 1;
        }

        let mut summary: Option<BlockSummary<T>> = None;
        {
            let st = self.state.read().await;
            st.check_live()?;
            for block in &st.summaries[full_blocks] {
                match summary.as_mut() {
                    Some(s) => s.merge(block),
                    None => summary = Some(*block),
                }
            }
        }
        for (edge_first, edge_last) in edges {
            let edge = self.summarize_range(edge_first, edge_last).await?;
            match summary.as_mut() {
                Some(s) => s.merge(&edge),
                None => summary = Some(edge),
            }
        }

        summary.ok_or(Error::InvalidRange { first, last })
    }

    async fn summarize_range(&self, first: usize, last: usize) -> Result<BlockSummary<T>> {
        let samples = self.get_range(first, last).await?;
        BlockSummary::summarize(&samples).ok_or(Error::InvalidRange { first, last })
    }

    /// leading_blocks_at_or_below counts the leading blocks whose smallest
    /// sample is at most `target`. For a non-decreasing channel these are
    /// exactly the blocks that start at or below `target`.
    pub(crate) async fn leading_blocks_at_or_below(&self, target: T) -> Result<usize> {
        let st = self.state.read().await;
        st.check_live()?;
        Ok(st.summaries.partition_point(|s| s.min <= target))
    }

    pub async fn sample_count(&self) -> usize {
        self.state.read().await.count
    }

    pub async fn stats(&self) -> ChannelStats {
        let st = self.state.read().await;
        let resident = st
            .sealed
            .iter()
            .filter(|e| e.residency.state() == SlotState::MemoryResident)
            .count();
        let open = usize::from(st.count > 0 && !st.open.is_empty());

        ChannelStats {
            sample_count: st.count,
            slot_count: st.sealed.len() + open,
            resident_slots: resident + open,
            on_disk_slots: st.sealed.len() - resident,
            page_loads: st.page_loads,
        }
    }

    /// clear drops every sample and page file. The channel stays usable.
    /// Must not race with other operations on the channel.
    pub async fn clear(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let mut st = self.state.write().await;
        st.check_live()?;

        self.pages.delete_all(&self.id).await?;
        let dropped = st.count;
        *st = ChannelState::new(&self.options);
        info!(channel = %self.id, samples = dropped, "cleared channel");
        Ok(())
    }

    /// dispose deletes every page file of the channel. Every later operation
    /// fails with [`Error::Disposed`]; disposing twice is not an error.
    pub async fn dispose(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let mut st = self.state.write().await;
        if st.disposed {
            return Ok(());
        }

        for (slot_index, entry) in st.sealed.iter().enumerate() {
            if entry.persisted {
                self.pages.delete(&self.id, slot_index).await?;
            }
        }
        self.pages.delete_all(&self.id).await?;

        let samples = st.count;
        *st = ChannelState::new(&self.options);
        st.disposed = true;
        info!(channel = %self.id, samples, "disposed channel");
        Ok(())
    }
}

/// Channel ids become directory names under the cache root.
pub(crate) fn validate_channel_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidOptions(format!("invalid channel id {:?}", id)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use quickcheck::{QuickCheck, TestResult};
    use rand::Rng;
    use tempfile::TempDir;

    use crate::cache::block::BlockSummary;
    use crate::cache::slot::SlotState;
    use crate::engine::channel::ChannelStore;
    use crate::engine::page::PageStore;
    use crate::error::Error;
    use crate::options::StoreOptions;
    use crate::sample::SampleType;

    pub(crate) const B: usize = 4;
    pub(crate) const S: usize = 16;

    pub(crate) const RISKY_SAMPLE_COUNTS: [usize; 10] =
        [1, B - 1, B, B + 1, S - 1, S, S + 1, 3 * S - 1, 3 * S, 3 * S + 1];

    pub(crate) fn small_options(dir: &TempDir) -> StoreOptions {
        StoreOptions::new(dir.path()).with_geometry(B, S)
    }

    pub(crate) fn channel<T: SampleType>(dir: &TempDir, id: &str) -> ChannelStore<T> {
        let options = small_options(dir);
        let pages = Arc::new(PageStore::new(options.cache_dir.clone()));
        ChannelStore::new(id, options, pages).unwrap()
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_at_risky_counts() {
        for n in RISKY_SAMPLE_COUNTS {
            let dir = tempfile::tempdir().unwrap();
            let store = channel::<f32>(&dir, "values");

            for i in 0..n {
                assert_eq!(store.append(i as f32).await.unwrap(), i);
            }
            assert_eq!(store.sample_count().await, n);

            for i in 0..n {
                assert_eq!(store.get(i).await.unwrap(), i as f32, "n={} i={}", n, i);
            }
            assert!(matches!(
                store.get(n).await,
                Err(Error::IndexOutOfRange { index, count }) if index == n && count == n
            ));
        }
    }

    #[tokio::test]
    async fn test_rollover_flushes_second_oldest_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = channel::<f32>(&dir, "values");
        let pages = PageStore::new(dir.path());

        store.extend(&vec![1.0; 2 * S]).await.unwrap();
        // both slots full, the third is not opened until the next append
        assert!(!pages.page_path("values", 0).exists());
        assert_eq!(store.stats().await.slot_count, 2);

        store.append(1.0).await.unwrap();
        assert!(pages.page_path("values", 0).exists());
        assert!(!pages.page_path("values", 1).exists());

        let stats = store.stats().await;
        assert_eq!(stats.slot_count, 3);
        assert_eq!(stats.on_disk_slots, 1);
        assert_eq!(stats.resident_slots, 2);

        store.extend(&vec![1.0; S]).await.unwrap();
        assert!(pages.page_path("values", 1).exists());
        assert_eq!(store.stats().await.on_disk_slots, 2);
    }

    #[tokio::test]
    async fn test_get_reloads_flushed_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = channel::<i64>(&dir, "ts");

        let values: Vec<i64> = (0..(3 * S + 1) as i64).map(|i| i * 1000).collect();
        store.extend(&values).await.unwrap();

        let before = store.stats().await;
        assert_eq!(before.on_disk_slots, 2);

        assert_eq!(store.get(S + 3).await.unwrap(), (S as i64 + 3) * 1000);
        let after = store.stats().await;
        assert_eq!(after.on_disk_slots, 1);
        assert_eq!(after.resident_slots, before.resident_slots + 1);
        assert_eq!(after.page_loads, 1);
    }

    #[tokio::test]
    async fn test_loaded_slot_limit() {
        let dir = tempfile::tempdir().unwrap();
        let options = small_options(&dir).with_loaded_slot_limit(1);
        let pages = Arc::new(PageStore::new(dir.path()));
        let store = ChannelStore::<f32>::new("limited", options, pages).unwrap();

        store.append_repeated(2.5, 5 * S).await.unwrap();
        assert_eq!(store.stats().await.on_disk_slots, 3);

        store.get(0).await.unwrap();
        store.get(S).await.unwrap();
        store.get(2 * S).await.unwrap();

        let st = store.state.read().await;
        let states: Vec<SlotState> = st.sealed.iter().map(|e| e.residency.state()).collect();
        assert_eq!(
            states,
            vec![
                SlotState::OnDisk,
                SlotState::OnDisk,
                SlotState::MemoryResident,
                SlotState::MemoryResident,
            ]
        );
    }

    #[tokio::test]
    async fn test_get_range_across_boundaries() {
        let dir = tempfile::tempdir().unwrap();
        let store = channel::<f32>(&dir, "values");
        let n = 3 * S + 1;
        let values: Vec<f32> = (0..n).map(|i| i as f32).collect();
        store.extend(&values).await.unwrap();

        for (first, last) in [
            (0, 0),
            (B - 1, B),
            (S - 1, S),
            (S - 2, 2 * S + 1),
            (0, n - 1),
            (3 * S, 3 * S),
        ] {
            let range = store.get_range(first, last).await.unwrap();
            assert_eq!(range.as_slice(), &values[first..=last], "[{}, {}]", first, last);
        }

        assert!(matches!(
            store.get_range(5, 4).await,
            Err(Error::InvalidRange { first: 5, last: 4 })
        ));
        assert!(matches!(
            store.get_range(0, n).await,
            Err(Error::IndexOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_range_min_max() {
        let dir = tempfile::tempdir().unwrap();
        let store = channel::<f32>(&dir, "wave");
        let values: Vec<f32> = (0..3 * S + 3)
            .map(|i| ((i * 7919) % 101) as f32 - 50.0)
            .collect();
        store.extend(&values).await.unwrap();

        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let first = rng.gen_range(0..values.len());
            let last = rng.gen_range(first..values.len());
            let expected = BlockSummary::summarize(&values[first..=last]).unwrap();
            assert_eq!(
                store.range_min_max(first, last).await.unwrap(),
                expected,
                "[{}, {}]",
                first,
                last
            );
        }
    }

    #[tokio::test]
    async fn test_append_after_failed_flush_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = channel::<f32>(&dir, "values");
        store.extend(&vec![0.0; 2 * S]).await.unwrap();

        // a plain file where the channel directory should be
        tokio::fs::write(dir.path().join("values"), b"x").await.unwrap();

        assert!(matches!(store.append(1.0).await, Err(Error::Io { .. })));
        assert_eq!(store.sample_count().await, 2 * S);
        assert_eq!(store.stats().await.slot_count, 2);

        tokio::fs::remove_file(dir.path().join("values")).await.unwrap();
        assert_eq!(store.append(1.0).await.unwrap(), 2 * S);
        assert_eq!(store.get(2 * S).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_clear_then_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let store = channel::<f32>(&dir, "values");
        store.append_repeated(3.0, 3 * S).await.unwrap();
        assert!(dir.path().join("values").exists());

        store.clear().await.unwrap();
        assert_eq!(store.sample_count().await, 0);
        assert!(!dir.path().join("values").exists());
        assert!(store.get(0).await.is_err());

        store.extend(&[7.0, 8.0]).await.unwrap();
        assert_eq!(store.get_range(0, 1).await.unwrap(), vec![7.0, 8.0]);
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = channel::<f32>(&dir, "values");
        store.append_repeated(1.0, 3 * S + 1).await.unwrap();

        store.dispose().await.unwrap();
        store.dispose().await.unwrap();
        assert!(!dir.path().join("values").exists());

        assert!(matches!(store.get(0).await, Err(Error::Disposed)));
        assert!(matches!(store.append(1.0).await, Err(Error::Disposed)));
        assert!(matches!(store.clear().await, Err(Error::Disposed)));
        assert_eq!(store.sample_count().await, 0);
    }

    #[test]
    fn test_rejects_bad_channel_ids() {
        let dir = tempfile::tempdir().unwrap();
        let pages = Arc::new(PageStore::new(dir.path()));
        for id in ["", ".", "..", "a/b", "a b"] {
            let r = ChannelStore::<f32>::new(id, small_options(&dir), pages.clone());
            assert!(matches!(r, Err(Error::InvalidOptions(_))), "{:?}", id);
        }
        assert!(ChannelStore::<f32>::new("ds-1.values_x", small_options(&dir), pages).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_race_writer() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(channel::<i64>(&dir, "ts"));
        let total = 8 * S + 3;

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..total {
                    store.append(i as i64).await.unwrap();
                    if i % 7 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            })
        };

        let mut readers = Vec::new();
        for seed in 0..4_u64 {
            let store = store.clone();
            readers.push(tokio::spawn(async move {
                let mut rounds = 0;
                while store.sample_count().await < total {
                    let count = store.sample_count().await;
                    if count == 0 {
                        tokio::task::yield_now().await;
                        continue;
                    }
                    let first = (seed as usize * 13 + rounds * 5) % count;
                    let range = store.get_range(first, count - 1).await.unwrap();
                    for (offset, v) in range.iter().enumerate() {
                        assert_eq!(*v, (first + offset) as i64);
                    }
                    assert_eq!(store.get(first).await.unwrap(), first as i64);
                    rounds += 1;
                }
            }));
        }

        writer.await.unwrap();
        for r in readers {
            r.await.unwrap();
        }
        let all = store.get_range(0, total - 1).await.unwrap();
        assert!(all.iter().enumerate().all(|(i, v)| *v == i as i64));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_load_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(channel::<i64>(&dir, "ts"));
        let values: Vec<i64> = (0..(3 * S + 1) as i64).collect();
        store.extend(&values).await.unwrap();
        assert_eq!(store.stats().await.page_loads, 0);

        let readers = 16;
        let barrier = Arc::new(tokio::sync::Barrier::new(readers));
        let mut handles = Vec::new();
        for r in 0..readers {
            let store = store.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                let index = r % S;
                assert_eq!(store.get(index).await.unwrap(), index as i64);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.stats().await.page_loads, 1);

        // every further read is served from memory
        let pages = PageStore::new(dir.path());
        tokio::fs::remove_file(pages.page_path("ts", 0)).await.unwrap();
        let range = store.get_range(0, S - 1).await.unwrap();
        assert_eq!(range.as_slice(), &values[..S]);
        assert_eq!(store.stats().await.page_loads, 1);
    }

    #[test]
    fn prop_range_matches_point_reads() {
        fn prop(values: Vec<i64>, a: usize, b: usize) -> TestResult {
            if values.is_empty() {
                return TestResult::discard();
            }
            let (first, last) = {
                let (x, y) = (a % values.len(), b % values.len());
                (x.min(y), x.max(y))
            };

            runtime().block_on(async {
                let dir = tempfile::tempdir().unwrap();
                let store = channel::<i64>(&dir, "prop");
                store.extend(&values).await.unwrap();

                let range = store.get_range(first, last).await.unwrap();
                for (offset, v) in range.iter().enumerate() {
                    if store.get(first + offset).await.unwrap() != *v {
                        return TestResult::failed();
                    }
                }
                TestResult::from_bool(range.as_slice() == &values[first..=last])
            })
        }

        QuickCheck::new()
            .tests(50)
            .quickcheck(prop as fn(Vec<i64>, usize, usize) -> TestResult);
    }
}
