#[macro_use]
extern crate async_trait;

use std::io;

pub mod file;
pub mod mmap;

pub use file::writable_file::WritableFile;
pub use file::{create_dir_all, remove_dir_if_exists, remove_file_if_exists};
pub use mmap::MmapReadableFile;

/// RandomAccessFile reads bytes at absolute offsets. Implementations must be
/// safe to share between concurrent readers.
#[async_trait]
pub trait RandomAccessFile: Send + Sync {
    /// read fills `buf` from `offset`. A read past the end of the file is an
    /// `UnexpectedEof` error, never a short read.
    async fn read(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// len returns the file size in bytes at open time.
    fn len(&self) -> u64;

    async fn close(self) -> io::Result<()>;
}

#[async_trait]
pub trait RandomAccessFileExt: RandomAccessFile {
    /// read_vec reads exactly `len` bytes starting at `offset`.
    async fn read_vec(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0_u8; len];
        self.read(offset, &mut buf[..]).await?;
        Ok(buf)
    }
}

impl<R: RandomAccessFile + ?Sized> RandomAccessFileExt for R {}

/// Writable is an append-only sink.
#[async_trait]
pub trait Writable: Send {
    /// append writes all of `data` and returns its length.
    async fn append(&mut self, data: &[u8]) -> io::Result<usize>;

    /// sync flushes and forces the written bytes to the storage medium.
    async fn sync(&mut self) -> io::Result<()>;
}
