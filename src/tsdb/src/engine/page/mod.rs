//! Page store: one file per (channel, slot) holding that slot's samples.
//!
//! ```text
//! {cache_dir}/{channel}/{slot:010}.page
//!
//! | header(10B) | sample 0 | sample 1 | ... | sample n-1 | crc32(4B) |
//! ```
//!
//! A page is written once, to a `.tmp` sibling that is fsynced and then
//! renamed, so a reader never observes a partially written page.

use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};
use telemetry_storage::{
    create_dir_all, remove_dir_if_exists, remove_file_if_exists, MmapReadableFile,
    RandomAccessFile, Writable, WritableFile,
};
use tracing::{debug, warn};

use crate::cache::slot::Slot;
use crate::error::{Error, Result};
use crate::sample::{decode_samples, SampleType};

pub mod header;

pub use header::{PageHeader, PAGE_CHECKSUM_SIZE, PAGE_HEADER_SIZE};

/// PAGE_FILE_EXTENSION is the extension of a complete page file.
pub(crate) const PAGE_FILE_EXTENSION: &str = "page";

/// TMP_PAGE_FILE_EXTENSION is the extension of a page file still being written.
pub(crate) const TMP_PAGE_FILE_EXTENSION: &str = "tmp";

/// PageFile is a verified page read back from disk with its payload undecoded.
pub struct PageFile {
    pub header: PageHeader,
    pub payload: Vec<u8>,
}

impl PageFile {
    pub fn samples<T: SampleType>(&self) -> Vec<T> {
        decode_samples(self.payload.as_slice())
    }
}

pub struct PageStore {
    root: PathBuf,
}

impl PageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub fn channel_dir(&self, channel: &str) -> PathBuf {
        self.root.join(channel)
    }

    pub fn page_path(&self, channel: &str, slot_index: usize) -> PathBuf {
        self.channel_dir(channel)
            .join(format!("{:010}.{}", slot_index, PAGE_FILE_EXTENSION))
    }

    fn tmp_page_path(&self, channel: &str, slot_index: usize) -> PathBuf {
        self.page_path(channel, slot_index)
            .with_extension(TMP_PAGE_FILE_EXTENSION)
    }

    /// flush persists every sample of `slot`. Returns the number of bytes written.
    pub async fn flush<T: SampleType>(
        &self,
        channel: &str,
        slot_index: usize,
        slot: &Slot<T>,
    ) -> Result<u64> {
        let dir = self.channel_dir(channel);
        create_dir_all(&dir).await.map_err(|e| Error::io(&dir, e))?;

        let buf = encode_page(slot);

        // truncation discards a leftover from an interrupted flush
        let tmp_path = self.tmp_page_path(channel, slot_index);
        {
            let mut w = WritableFile::create_truncate(&tmp_path)
                .await
                .map_err(|e| Error::io(&tmp_path, e))?;
            w.append(buf.as_ref())
                .await
                .map_err(|e| Error::io(&tmp_path, e))?;
            w.sync().await.map_err(|e| Error::io(&tmp_path, e))?;
            w.close().await.map_err(|e| Error::io(&tmp_path, e))?;
        }

        let path = self.page_path(channel, slot_index);
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Error::io(&path, e))?;

        debug!(
            channel,
            slot_index,
            samples = slot.len(),
            bytes = buf.len(),
            "flushed slot page"
        );
        Ok(buf.len() as u64)
    }

    /// load reads a slot back. A missing page means the slot was never
    /// flushed, which is reported as an `Io` error.
    pub async fn load<T: SampleType>(
        &self,
        channel: &str,
        slot_index: usize,
        block_size: usize,
        slot_size: usize,
    ) -> Result<Slot<T>> {
        let path = self.page_path(channel, slot_index);
        let page = read_page(&path).await?;

        if page.header.sample_type != T::page_type() {
            return Err(Error::corrupt(
                &path,
                format!(
                    "page holds sample type {}, expected {}",
                    page.header.sample_type,
                    T::page_type()
                ),
            ));
        }
        if page.header.sample_count as usize > slot_size {
            return Err(Error::corrupt(
                &path,
                format!(
                    "page holds {} samples, slot capacity is {}",
                    page.header.sample_count, slot_size
                ),
            ));
        }
        if page.payload.len() != page.header.sample_count as usize * T::WIDTH {
            return Err(Error::corrupt(
                &path,
                format!(
                    "payload of {} bytes does not hold {} samples of {} bytes",
                    page.payload.len(),
                    page.header.sample_count,
                    T::WIDTH
                ),
            ));
        }

        let samples = page.samples::<T>();
        debug!(channel, slot_index, samples = samples.len(), "loaded slot page");
        Ok(Slot::from_samples(block_size, slot_size, &samples))
    }

    /// delete removes one page. Deleting an absent page is not an error.
    pub async fn delete(&self, channel: &str, slot_index: usize) -> Result<()> {
        let path = self.page_path(channel, slot_index);
        remove_file_if_exists(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;
        Ok(())
    }

    /// delete_all removes every page of `channel` and its directory.
    pub async fn delete_all(&self, channel: &str) -> Result<()> {
        let dir = self.channel_dir(channel);
        remove_dir_if_exists(&dir)
            .await
            .map_err(|e| Error::io(&dir, e))?;
        Ok(())
    }
}

fn encode_page<T: SampleType>(slot: &Slot<T>) -> BytesMut {
    let payload_len = slot.len() * T::WIDTH;
    let mut buf = BytesMut::with_capacity(PAGE_HEADER_SIZE + payload_len + PAGE_CHECKSUM_SIZE);

    PageHeader::new(T::page_type(), slot.len() as u32).write_to(&mut buf);
    for block in slot.blocks() {
        for v in block.as_slice() {
            v.put(&mut buf);
        }
    }

    let checksum = crc32fast::hash(&buf[PAGE_HEADER_SIZE..]);
    buf.put_u32(checksum);
    buf
}

/// read_page opens a page file and verifies its header, length and checksum.
pub async fn read_page(path: impl AsRef<Path>) -> Result<PageFile> {
    let path = path.as_ref();
    let file = MmapReadableFile::open(path)
        .await
        .map_err(|e| Error::io(path, e))?;

    let header = PageHeader::read_from(&file)
        .await
        .map_err(|reason| Error::corrupt(path, reason))?;

    let width = match header.sample_type {
        crate::sample::PAGE_FLOAT32 => 4,
        crate::sample::PAGE_FLOAT64 | crate::sample::PAGE_INTEGER => 8,
        other => {
            return Err(Error::corrupt(
                path,
                format!("unknown sample type {}", other),
            ))
        }
    };

    let expected = header.file_len(width);
    if file.len() != expected {
        warn!(
            path = %path.display(),
            len = file.len(),
            expected,
            "page file has unexpected length"
        );
        return Err(Error::corrupt(
            path,
            format!("file is {} bytes, expected {}", file.len(), expected),
        ));
    }

    let bytes = file.as_slice();
    let checksum_pos = bytes.len() - PAGE_CHECKSUM_SIZE;
    let payload = &bytes[PAGE_HEADER_SIZE..checksum_pos];
    let stored = u32::from_be_bytes([
        bytes[checksum_pos],
        bytes[checksum_pos + 1],
        bytes[checksum_pos + 2],
        bytes[checksum_pos + 3],
    ]);
    let actual = crc32fast::hash(payload);
    if stored != actual {
        warn!(path = %path.display(), stored, actual, "page checksum mismatch");
        return Err(Error::corrupt(
            path,
            format!("checksum mismatch: stored {:#x}, computed {:#x}", stored, actual),
        ));
    }

    let page = PageFile {
        header,
        payload: payload.to_vec(),
    };
    file.close().await.map_err(|e| Error::io(path, e))?;
    Ok(page)
}
