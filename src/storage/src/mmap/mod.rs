use std::io;
use std::io::ErrorKind;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};
use tokio::fs::File;

use crate::RandomAccessFile;

/// MmapReadableFile maps a whole file read-only. An empty file has no mapping.
pub struct MmapReadableFile {
    f: File,
    len: usize,
    mmap: Option<Mmap>,
}

impl MmapReadableFile {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let f = File::open(path).await?;

        let meta = f.metadata().await?;
        let len = meta.len() as usize;

        let mmap = if len == 0 {
            None
        } else {
            // the file is never written again once it is readable under its final name
            Some(unsafe { MmapOptions::new().offset(0).len(len).map(&f)? })
        };

        Ok(Self { f, len, mmap })
    }

    /// as_slice exposes the mapped bytes without copying.
    pub fn as_slice(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }
}

#[async_trait]
impl RandomAccessFile for MmapReadableFile {
    async fn read(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let size = buf.len();
        if size == 0 {
            return Ok(0);
        }

        let offset = offset as usize;
        let upper = offset + size;
        if upper > self.len {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("read [{}, {}) beyond file length {}", offset, upper, self.len),
            ));
        }

        buf.copy_from_slice(&self.as_slice()[offset..upper]);
        Ok(size)
    }

    fn len(&self) -> u64 {
        self.len as u64
    }

    async fn close(self) -> io::Result<()> {
        drop(self.mmap);
        drop(self.f);
        Ok(())
    }
}
