use std::fmt::Debug;

use bytes::{Buf, BufMut};

/// PAGE_FLOAT32 designates a page of float32 samples.
pub const PAGE_FLOAT32: u8 = 0;

/// PAGE_FLOAT64 designates a page of float64 samples.
pub const PAGE_FLOAT64: u8 = 1;

/// PAGE_INTEGER designates a page of int64 samples.
pub const PAGE_INTEGER: u8 = 2;

/// SampleType is a fixed-width value that a channel can store. Samples are
/// written big-endian, one after another, with no per-sample framing.
pub trait SampleType: Copy + Default + Debug + PartialOrd + Send + Sync + 'static {
    /// encoded size in bytes
    const WIDTH: usize;

    fn page_type() -> u8;

    fn put<B: BufMut>(self, buf: &mut B);

    fn get<B: Buf>(buf: &mut B) -> Self;
}

impl SampleType for f32 {
    const WIDTH: usize = 4;

    fn page_type() -> u8 {
        PAGE_FLOAT32
    }

    fn put<B: BufMut>(self, buf: &mut B) {
        buf.put_f32(self)
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_f32()
    }
}

impl SampleType for f64 {
    const WIDTH: usize = 8;

    fn page_type() -> u8 {
        PAGE_FLOAT64
    }

    fn put<B: BufMut>(self, buf: &mut B) {
        buf.put_f64(self)
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_f64()
    }
}

impl SampleType for i64 {
    const WIDTH: usize = 8;

    fn page_type() -> u8 {
        PAGE_INTEGER
    }

    fn put<B: BufMut>(self, buf: &mut B) {
        buf.put_i64(self)
    }

    fn get<B: Buf>(buf: &mut B) -> Self {
        buf.get_i64()
    }
}

/// page_type_name maps a page type tag to a printable name.
pub fn page_type_name(page_type: u8) -> Option<&'static str> {
    match page_type {
        PAGE_FLOAT32 => Some("float32"),
        PAGE_FLOAT64 => Some("float64"),
        PAGE_INTEGER => Some("int64"),
        _ => None,
    }
}

/// decode_samples decodes a big-endian payload of `T`s. Trailing bytes that
/// do not form a whole sample are ignored.
pub fn decode_samples<T: SampleType>(mut payload: &[u8]) -> Vec<T> {
    let mut samples = Vec::with_capacity(payload.len() / T::WIDTH);
    while payload.remaining() >= T::WIDTH {
        samples.push(T::get(&mut payload));
    }
    samples
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use crate::sample::{decode_samples, SampleType, PAGE_FLOAT32, PAGE_INTEGER};

    #[test]
    fn test_f32_is_big_endian() {
        let mut buf = BytesMut::new();
        1.0_f32.put(&mut buf);
        assert_eq!(buf.as_ref(), &[0x3f, 0x80, 0, 0]);
        assert_eq!(f32::page_type(), PAGE_FLOAT32);
    }

    #[test]
    fn test_decode_samples_ignores_partial_tail() {
        let mut buf = BytesMut::new();
        for v in [-3_i64, 0, 1 << 40] {
            v.put(&mut buf);
        }
        buf.extend_from_slice(&[1, 2, 3]);

        let samples = decode_samples::<i64>(buf.as_ref());
        assert_eq!(samples, vec![-3, 0, 1 << 40]);
        assert_eq!(i64::page_type(), PAGE_INTEGER);
    }
}
