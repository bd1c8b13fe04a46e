//! Container Engine Error Types
//!
//! All container operations return `Result<T>` aliased to
//! `Result<T, ContainerError>`, so `?` propagation works across the engine.
//! The variants mirror the failure classes a caller can act on: state
//! preconditions (`NotOpen`, `InvalidState`, `UnsupportedRequest`),
//! placement (`DiskOutOfSpace`, `AlreadyExists`), descriptor persistence
//! (`FileWrite`), and embedded-store operations (`DbCompact`, `DbSync`,
//! `StoreBusy`).

use thiserror::Error;

use crate::descriptor::ContainerState;

pub type Result<T> = std::result::Result<T, ContainerError>;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container {0} already exists")]
    AlreadyExists(u64),

    #[error("container {id} is not open: state is {state}")]
    NotOpen { id: u64, state: ContainerState },

    #[error("operation not allowed for container {id} in state {state}")]
    InvalidState { id: u64, state: ContainerState },

    #[error("unsupported request: {0}")]
    UnsupportedRequest(String),

    #[error("no volume with {requested} bytes free")]
    DiskOutOfSpace { requested: u64 },

    #[error("failed to write descriptor for container {id}: {source}")]
    FileWrite {
        id: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("store compaction failed for container {id}: {message}")]
    DbCompact { id: u64, message: String },

    #[error("store sync failed for container {id}: {message}")]
    DbSync { id: u64, message: String },

    #[error("store for container {0} has outstanding handles")]
    StoreBusy(u64),

    #[error("descriptor missing from container archive for container {0}")]
    MissingDescriptor(u64),

    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rocksdb::Error> for ContainerError {
    fn from(e: rocksdb::Error) -> Self {
        ContainerError::Store(e.to_string())
    }
}
