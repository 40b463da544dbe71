use crate::sample::SampleType;

/// Block is a fixed-capacity run of consecutive samples. Only the last block
/// of a channel is ever partially filled.
#[derive(Clone, Debug)]
pub struct Block<T: SampleType> {
    samples: Box<[T]>,
    len: usize,
}

impl<T: SampleType> Block<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![T::default(); capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// from_samples builds a block holding a copy of `samples`.
    ///
    /// Panics if `samples` does not fit in `capacity`.
    pub fn from_samples(capacity: usize, samples: &[T]) -> Self {
        let mut block = Self::new(capacity);
        block.samples[..samples.len()].copy_from_slice(samples);
        block.len = samples.len();
        block
    }

    /// set writes `value` at `offset`, growing the filled length if needed.
    ///
    /// Panics if `offset` is beyond the block capacity.
    pub fn set(&mut self, offset: usize, value: T) {
        assert!(
            offset < self.samples.len(),
            "block offset {} out of capacity {}",
            offset,
            self.samples.len()
        );
        self.samples[offset] = value;
        if offset >= self.len {
            self.len = offset + 1;
        }
    }

    /// get reads the sample at `offset`.
    ///
    /// Panics if `offset` has not been written.
    pub fn get(&self, offset: usize) -> T {
        assert!(
            offset < self.len,
            "block offset {} out of length {}",
            offset,
            self.len
        );
        self.samples[offset]
    }

    /// push appends `value`, returning false if the block is full.
    pub fn push(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.samples[self.len] = value;
        self.len += 1;
        true
    }

    pub fn is_full(&self) -> bool {
        self.len == self.samples.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// as_slice returns the filled part of the block.
    pub fn as_slice(&self) -> &[T] {
        &self.samples[..self.len]
    }
}

/// BlockSummary holds the smallest and largest sample of one block. Summaries
/// stay in memory when the owning slot is paged out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockSummary<T: SampleType> {
    pub min: T,
    pub max: T,
}

impl<T: SampleType> BlockSummary<T> {
    pub fn of(value: T) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn include(&mut self, value: T) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn merge(&mut self, other: &BlockSummary<T>) {
        self.include(other.min);
        self.include(other.max);
    }

    /// summarize folds a non-empty run of samples.
    pub fn summarize(samples: &[T]) -> Option<Self> {
        let (first, rest) = samples.split_first()?;
        let mut summary = Self::of(*first);
        rest.iter().for_each(|v| summary.include(*v));
        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::block::{Block, BlockSummary};

    #[test]
    fn test_block_push_until_full() {
        let mut block = Block::<f32>::new(3);
        assert!(block.is_empty());
        assert!(block.push(1.0));
        assert!(block.push(2.0));
        assert!(!block.is_full());
        assert!(block.push(3.0));
        assert!(block.is_full());
        assert!(!block.push(4.0));
        assert_eq!(block.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(block.get(2), 3.0);
    }

    #[test]
    fn test_block_set_extends_len() {
        let mut block = Block::<i64>::new(4);
        block.set(0, 7);
        block.set(1, 8);
        assert_eq!(block.len(), 2);
        block.set(0, 9);
        assert_eq!(block.len(), 2);
        assert_eq!(block.as_slice(), &[9, 8]);
    }

    #[test]
    #[should_panic]
    fn test_block_get_unwritten_offset() {
        let block = Block::<f32>::from_samples(4, &[1.0]);
        block.get(1);
    }

    #[test]
    #[should_panic]
    fn test_block_set_beyond_capacity() {
        let mut block = Block::<f32>::new(2);
        block.set(2, 1.0);
    }

    #[test]
    fn test_block_summary() {
        assert_eq!(BlockSummary::<f32>::summarize(&[]), None);

        let mut s = BlockSummary::summarize(&[3.0_f32, -1.0, 2.0]).unwrap();
        assert_eq!(s, BlockSummary { min: -1.0, max: 3.0 });

        s.merge(&BlockSummary::of(10.0));
        assert_eq!(s.max, 10.0);
        assert_eq!(s.min, -1.0);
    }
}
