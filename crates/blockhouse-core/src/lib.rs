pub mod block;
pub mod checksum;
pub mod pipeline;

pub use block::{BlockId, BlockToken, ChecksumAlgorithm, ChecksumData, ChunkInfo};
pub use checksum::{crc32c_of, ChecksumByteBuffer, Crc32cChecksum};
pub use pipeline::{DatanodeDetails, Pipeline, PipelineId, ReplicationConfig, ReplicationFactor};
