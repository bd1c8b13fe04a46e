//! Incremental Checksums for Chunk Verification
//!
//! This module provides the streaming checksum engine used everywhere chunk
//! data is verified: the client read path checks each checksum-boundary
//! segment of a chunk against its recorded value, and the container engine
//! protects its descriptor file with a self-checksum of the serialized form.
//!
//! ## Why CRC-32C?
//!
//! CRC-32C (Castagnoli) has hardware support (SSE 4.2 / ARMv8 CRC
//! instructions) on every platform a datanode runs on, so verifying a chunk
//! costs a small fraction of reading it from disk. The `crc32c` crate picks
//! the accelerated implementation at runtime.
//!
//! ## Thread Safety
//!
//! A checksum instance is a tiny piece of mutable state and is deliberately
//! NOT shareable across threads. Create one per stream; they are cheap.

use bytes::Buf;

/// An incremental checksum over a stream of bytes.
///
/// The accumulated value is exposed as a `u64` so that wider algorithms can
/// share the interface; CRC-32C only ever populates the low 32 bits.
pub trait ChecksumByteBuffer {
    /// Feed a single byte.
    fn update_byte(&mut self, b: u8);

    /// Feed a contiguous slice.
    fn update(&mut self, data: &[u8]);

    /// Feed everything remaining in a buffer view.
    ///
    /// A contiguous view is fed directly; a fragmented view (multiple
    /// non-adjacent chunks) is first copied into a bounce buffer so the
    /// underlying implementation sees one slice.
    fn update_buf<B: Buf>(&mut self, buf: &mut B);

    /// The current checksum value.
    fn value(&self) -> u64;

    /// Reset to the initial state.
    fn reset(&mut self);
}

/// CRC-32C (Castagnoli) implementation of [`ChecksumByteBuffer`].
#[derive(Debug, Default)]
pub struct Crc32cChecksum {
    state: u32,
}

impl Crc32cChecksum {
    pub fn new() -> Self {
        Self { state: 0 }
    }
}

impl ChecksumByteBuffer for Crc32cChecksum {
    fn update_byte(&mut self, b: u8) {
        self.state = crc32c::crc32c_append(self.state, &[b]);
    }

    fn update(&mut self, data: &[u8]) {
        self.state = crc32c::crc32c_append(self.state, data);
    }

    fn update_buf<B: Buf>(&mut self, buf: &mut B) {
        let remaining = buf.remaining();
        if buf.chunk().len() == remaining {
            self.state = crc32c::crc32c_append(self.state, buf.chunk());
            buf.advance(remaining);
        } else {
            let mut bounce = vec![0u8; remaining];
            buf.copy_to_slice(&mut bounce);
            self.state = crc32c::crc32c_append(self.state, &bounce);
        }
    }

    fn value(&self) -> u64 {
        self.state as u64
    }

    fn reset(&mut self) {
        self.state = 0;
    }
}

/// One-shot CRC-32C of a slice.
pub fn crc32c_of(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Buf;

    #[test]
    fn test_empty_value_is_zero() {
        let c = Crc32cChecksum::new();
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut c = Crc32cChecksum::new();
        c.update(&data[..10]);
        c.update(&data[10..]);
        assert_eq!(c.value(), crc32c_of(data) as u64);
    }

    #[test]
    fn test_byte_at_a_time_matches_one_shot() {
        let data = b"abcdefgh";
        let mut c = Crc32cChecksum::new();
        for &b in data.iter() {
            c.update_byte(b);
        }
        assert_eq!(c.value(), crc32c_of(data) as u64);
    }

    #[test]
    fn test_reset() {
        let mut c = Crc32cChecksum::new();
        c.update(b"some data");
        c.reset();
        assert_eq!(c.value(), 0);
        c.update(b"xyz");
        assert_eq!(c.value(), crc32c_of(b"xyz") as u64);
    }

    #[test]
    fn test_update_buf_contiguous() {
        let data = b"contiguous buffer".to_vec();
        let mut c = Crc32cChecksum::new();
        let mut buf = &data[..];
        c.update_buf(&mut buf);
        assert_eq!(c.value(), crc32c_of(&data) as u64);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_update_buf_fragmented_uses_bounce_buffer() {
        // A chain of two slices is a non-contiguous Buf.
        let first = bytes::Bytes::from_static(b"first half ");
        let second = bytes::Bytes::from_static(b"second half");
        let mut chained = first.chain(second);

        let mut c = Crc32cChecksum::new();
        c.update_buf(&mut chained);
        assert_eq!(c.value(), crc32c_of(b"first half second half") as u64);
    }

    #[test]
    fn test_known_vector() {
        // RFC 3720 appendix B.4 test vector: 32 bytes of zero.
        let zeros = [0u8; 32];
        assert_eq!(crc32c_of(&zeros), 0x8a9136aa);
    }
}
