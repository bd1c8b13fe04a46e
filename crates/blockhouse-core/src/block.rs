//! Block and Chunk Model
//!
//! A *block* is a contiguous logical byte range addressed by a 64-bit id
//! inside one container. It is materialized on disk as an ordered list of
//! immutable *chunks*, each carrying its own checksum record so a reader can
//! verify data without trusting the datanode it came from.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::checksum::{crc32c_of, ChecksumByteBuffer, Crc32cChecksum};

/// Identifies a block: the container it lives in plus the container-scoped
/// local id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
    pub container_id: u64,
    pub local_id: u64,
}

impl BlockId {
    pub fn new(container_id: u64, local_id: u64) -> Self {
        Self {
            container_id,
            local_id,
        }
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container_id, self.local_id)
    }
}

/// Checksum algorithm recorded for a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    None,
    Crc32c,
}

/// The checksum record of one chunk: the algorithm, the segment width, and
/// one fixed-width checksum per `bytes_per_checksum` segment of the chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChecksumData {
    pub algorithm: ChecksumAlgorithm,
    pub bytes_per_checksum: u32,
    /// One entry per segment; for CRC-32C each entry is the 4-byte
    /// big-endian checksum of that segment.
    pub checksums: Vec<Bytes>,
}

impl Default for ChecksumAlgorithm {
    fn default() -> Self {
        ChecksumAlgorithm::None
    }
}

impl ChecksumData {
    pub fn new(algorithm: ChecksumAlgorithm, bytes_per_checksum: u32) -> Self {
        Self {
            algorithm,
            bytes_per_checksum,
            checksums: Vec::new(),
        }
    }

    /// Compute the full checksum record for `data` split into
    /// `bytes_per_checksum` segments. This is what a datanode records at
    /// write time and what the read path verifies against.
    pub fn compute(algorithm: ChecksumAlgorithm, bytes_per_checksum: u32, data: &[u8]) -> Self {
        let mut checksums = Vec::new();
        if algorithm == ChecksumAlgorithm::Crc32c && bytes_per_checksum > 0 {
            for segment in data.chunks(bytes_per_checksum as usize) {
                checksums.push(Bytes::copy_from_slice(
                    &crc32c_of(segment).to_be_bytes()[..],
                ));
            }
        }
        Self {
            algorithm,
            bytes_per_checksum,
            checksums,
        }
    }

    /// Verify one segment against the recorded checksum at `segment_index`.
    /// Returns false on value mismatch or a missing entry.
    pub fn verify_segment(&self, segment_index: usize, data: &[u8]) -> bool {
        match self.algorithm {
            ChecksumAlgorithm::None => true,
            ChecksumAlgorithm::Crc32c => {
                let Some(expected) = self.checksums.get(segment_index) else {
                    return false;
                };
                let mut engine = Crc32cChecksum::new();
                engine.update(data);
                expected.as_ref() == &(engine.value() as u32).to_be_bytes()[..]
            }
        }
    }
}

/// Metadata of one immutable chunk of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Chunk file name, `<block-local-id>_chunk_<n>`.
    pub chunk_name: String,
    /// Offset of this chunk's first byte within the block.
    pub offset: u64,
    /// Chunk length in bytes.
    pub len: u64,
    pub checksum_data: ChecksumData,
}

impl ChunkInfo {
    pub fn new(chunk_name: impl Into<String>, offset: u64, len: u64) -> Self {
        Self {
            chunk_name: chunk_name.into(),
            offset,
            len,
            checksum_data: ChecksumData::default(),
        }
    }
}

/// Opaque bearer credential authorizing access to a block. The core never
/// inspects the contents; it is carried on the wire as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockToken(Bytes);

impl BlockToken {
    pub fn new(raw: impl Into<Bytes>) -> Self {
        Self(raw.into())
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }
}
