use bytes::{Buf, BufMut};
use telemetry_storage::RandomAccessFileExt;

/// PAGE_MAGIC is written as the first 4 bytes of a page file.
pub(crate) const PAGE_MAGIC: u32 = 0x7E1E_5107;

/// PAGE_VERSION indicates the version of the page file format.
pub(crate) const PAGE_VERSION: u8 = 1;

/// Page header: | magic(4B) | version(1B) | sample type(1B) | sample count(4B) |
pub const PAGE_HEADER_SIZE: usize = 4 + 1 + 1 + 4;

/// The payload is followed by a CRC32 of the payload bytes.
pub const PAGE_CHECKSUM_SIZE: usize = 4;

/// PageHeader represents the header of a page file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub version: u8,
    pub sample_type: u8,
    pub sample_count: u32,
}

impl PageHeader {
    pub fn new(sample_type: u8, sample_count: u32) -> Self {
        Self {
            version: PAGE_VERSION,
            sample_type,
            sample_count,
        }
    }

    pub fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32(PAGE_MAGIC);
        buf.put_u8(self.version);
        buf.put_u8(self.sample_type);
        buf.put_u32(self.sample_count);
    }

    pub fn decode(mut b: &[u8]) -> Result<Self, String> {
        if b.len() < PAGE_HEADER_SIZE {
            return Err(format!(
                "not enough data for page header: {} < {}",
                b.len(),
                PAGE_HEADER_SIZE
            ));
        }

        let magic = b.get_u32();
        if magic != PAGE_MAGIC {
            return Err(format!("invalid page magic number: {:#x}", magic));
        }

        let version = b.get_u8();
        if version != PAGE_VERSION {
            return Err(format!(
                "page is version {}, expected {}",
                version, PAGE_VERSION
            ));
        }

        Ok(Self {
            version,
            sample_type: b.get_u8(),
            sample_count: b.get_u32(),
        })
    }

    /// read_from reads and verifies the header at the start of `r`.
    pub async fn read_from<R: RandomAccessFileExt + ?Sized>(r: &R) -> Result<Self, String> {
        if r.len() < PAGE_HEADER_SIZE as u64 {
            return Err(format!(
                "file too small for page header: {} < {}",
                r.len(),
                PAGE_HEADER_SIZE
            ));
        }

        let b = r
            .read_vec(0, PAGE_HEADER_SIZE)
            .await
            .map_err(|e| format!("error reading page header: {}", e))?;
        Self::decode(b.as_slice())
    }

    /// file_len is the exact size of a page file carrying `sample_width`-byte samples.
    pub fn file_len(&self, sample_width: usize) -> u64 {
        (PAGE_HEADER_SIZE + PAGE_CHECKSUM_SIZE) as u64
            + self.sample_count as u64 * sample_width as u64
    }
}
