//! Client Error Types
//!
//! Read-path failures fall into three classes the stream machinery treats
//! differently:
//!
//! - **Retryable**: `RpcTransport` and `StorageContainer` results the
//!   datanode marks retriable. The block stream absorbs these up to the
//!   retry policy's budget, refreshing the pipeline for storage-container
//!   failures.
//! - **Never retried**: `SecurityFault` (token problems do not get better
//!   by retrying) and `StorageContainer` with a non-retriable result.
//! - **Corruption**: `ChecksumMismatch` and `InconsistentChunkRead` mean
//!   the data on the wire is wrong, not that the network hiccuped; they
//!   surface immediately.

use thiserror::Error;

use blockhouse_core::BlockId;
use blockhouse_proto::datanode::ContainerResult;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("end of stream at position {pos} for block {block}")]
    EndOfStream { block: BlockId, pos: u64 },

    #[error("checksum mismatch in chunk {chunk} at segment {segment}")]
    ChecksumMismatch { chunk: String, segment: usize },

    #[error(
        "inconsistent read for chunk {chunk}: requested {requested} bytes, got {got}"
    )]
    InconsistentChunkRead {
        chunk: String,
        requested: u64,
        got: u64,
    },

    #[error("transport error: {0}")]
    RpcTransport(String),

    #[error("security fault: {0}")]
    SecurityFault(String),

    #[error("storage container error ({result:?}): {message}")]
    StorageContainer {
        result: ContainerResult,
        message: String,
    },

    #[error("stream has been closed")]
    StreamClosed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Whether the retry machinery may absorb this failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::RpcTransport(_) => true,
            ClientError::StorageContainer { result, .. } => result.is_retryable(),
            _ => false,
        }
    }

    pub fn is_storage_container(&self) -> bool {
        matches!(self, ClientError::StorageContainer { .. })
    }

    pub fn is_security_fault(&self) -> bool {
        matches!(self, ClientError::SecurityFault(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability_classes() {
        assert!(ClientError::RpcTransport("connection reset".into()).is_retryable());
        assert!(ClientError::StorageContainer {
            result: ContainerResult::ContainerNotOpen,
            message: "closing".into(),
        }
        .is_retryable());

        assert!(!ClientError::StorageContainer {
            result: ContainerResult::NotRetriable,
            message: "gone".into(),
        }
        .is_retryable());
        assert!(!ClientError::SecurityFault("bad token".into()).is_retryable());
        assert!(!ClientError::ChecksumMismatch {
            chunk: "1_chunk_0".into(),
            segment: 0,
        }
        .is_retryable());
        assert!(!ClientError::InconsistentChunkRead {
            chunk: "1_chunk_0".into(),
            requested: 20,
            got: 5,
        }
        .is_retryable());
        assert!(!ClientError::EndOfStream {
            block: BlockId::new(1, 1),
            pos: 100,
        }
        .is_retryable());
    }
}
