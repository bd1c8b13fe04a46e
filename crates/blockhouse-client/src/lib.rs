//! Client-Side Block Read Path
//!
//! Reassembles a block from its chunks across a replica pipeline. A
//! [`BlockReadStream`] is created per read session with the block id, the
//! declared length, the pipeline, and an opaque token; on first use it
//! fetches the block's chunk list over `GetBlock` and builds one lazy
//! [`ChunkReadStream`] per chunk. Reads and seeks delegate to the active
//! chunk stream; transient failures retry per [`RetryPolicy`], and
//! storage-container failures first try a pipeline refresh so the read can
//! move to replicas that still hold the container.
//!
//! The RPC transport is behind [`ReplicaClient`]/[`ClientFactory`] so the
//! stream logic is independent of the wire; [`ClientPool`] is the pooled
//! production implementation.

pub mod block_stream;
pub mod calls;
pub mod chunk_stream;
pub mod client_pool;
pub mod error;
pub mod retry;

pub use block_stream::{BlockReadStream, PipelineRefresher};
pub use chunk_stream::ChunkReadStream;
pub use client_pool::{ClientFactory, ClientPool, ReplicaClient};
pub use error::{ClientError, Result};
pub use retry::RetryPolicy;
