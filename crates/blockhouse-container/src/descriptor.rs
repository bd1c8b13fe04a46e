//! Container Descriptor
//!
//! The descriptor is the single source of truth for a container's
//! attributes. It is a human-readable key/value document (pretty-printed
//! JSON) embedding a CRC-32C checksum of its own content, computed with the
//! checksum field zeroed. That convention lets any replica validate a
//! descriptor it received in an archive without extra metadata, and is
//! preserved here for backward compatibility.
//!
//! ## Write discipline
//!
//! The descriptor is never written in place. Every rewrite serializes to a
//! temp file in the *same directory*, fsyncs it, and atomically renames it
//! over the target. A failure anywhere in that sequence removes the temp
//! file and leaves the descriptor on disk untouched.
//!
//! ## Load discipline
//!
//! A checksum mismatch on load does not fail the load path: the container
//! is still usable for triage, so the descriptor comes back with its state
//! forced to [`ContainerState::Unhealthy`] and a warning is logged.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use blockhouse_core::crc32c_of;

use crate::error::{ContainerError, Result};

/// Lifecycle state of a container. Transitions follow a DAG; `Deleted` is
/// terminal and `Unhealthy` is a sink that only `delete` can leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerState {
    Open,
    Closing,
    QuasiClosed,
    Closed,
    Unhealthy,
    Deleted,
}

impl ContainerState {
    /// The transition DAG. Close straight from `Open` is permitted (a
    /// datanode may close a container it never got the explicit
    /// mark-for-close for); every other edge is the strict lifecycle.
    pub fn can_transition_to(self, next: ContainerState) -> bool {
        use ContainerState::*;
        matches!(
            (self, next),
            (Open, Closing)
                | (Open, Closed)
                | (Closing, Closed)
                | (Closing, QuasiClosed)
                | (Open, Unhealthy)
                | (Closing, Unhealthy)
                | (QuasiClosed, Unhealthy)
                | (Closed, Unhealthy)
                | (QuasiClosed, Deleted)
                | (Closed, Deleted)
                | (Unhealthy, Deleted)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == ContainerState::Deleted
    }

    pub fn is_open(self) -> bool {
        self == ContainerState::Open
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContainerState::Open => "OPEN",
            ContainerState::Closing => "CLOSING",
            ContainerState::QuasiClosed => "QUASI_CLOSED",
            ContainerState::Closed => "CLOSED",
            ContainerState::Unhealthy => "UNHEALTHY",
            ContainerState::Deleted => "DELETED",
        };
        f.write_str(s)
    }
}

/// Version of the block record schema in the embedded store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    V1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerType {
    KeyValue,
}

/// Every persisted attribute of a container. Field order is the on-disk
/// order; the self-checksum covers the serialized form with `checksum`
/// emptied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub container_id: u64,
    pub container_type: ContainerType,
    pub state: ContainerState,
    pub schema_version: SchemaVersion,
    pub layout_version: u32,
    pub max_size: u64,
    pub bytes_used: u64,
    pub key_count: u64,
    pub read_count: u64,
    pub write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub block_commit_sequence_id: u64,
    pub delete_transaction_id: u64,
    pub origin_node_id: String,
    pub origin_pipeline_id: String,
    /// Millis since epoch of the last successful data scan, if any.
    pub last_data_scan_timestamp: Option<i64>,
    pub metadata: BTreeMap<String, String>,
    /// Hex CRC-32C of the serialized descriptor with this field emptied.
    pub checksum: String,
}

impl ContainerDescriptor {
    pub fn new(
        container_id: u64,
        max_size: u64,
        origin_node_id: impl Into<String>,
        origin_pipeline_id: impl Into<String>,
    ) -> Self {
        Self {
            container_id,
            container_type: ContainerType::KeyValue,
            state: ContainerState::Open,
            schema_version: SchemaVersion::V1,
            layout_version: 1,
            max_size,
            bytes_used: 0,
            key_count: 0,
            read_count: 0,
            write_count: 0,
            read_bytes: 0,
            write_bytes: 0,
            block_commit_sequence_id: 0,
            delete_transaction_id: 0,
            origin_node_id: origin_node_id.into(),
            origin_pipeline_id: origin_pipeline_id.into(),
            last_data_scan_timestamp: None,
            metadata: BTreeMap::new(),
            checksum: String::new(),
        }
    }

    /// Raise the block-commit sequence id. Smaller values are ignored so
    /// the id stays monotonically non-decreasing under replays.
    pub fn update_block_commit_sequence_id(&mut self, bcs_id: u64) {
        if bcs_id > self.block_commit_sequence_id {
            self.block_commit_sequence_id = bcs_id;
        }
    }

    /// CRC-32C of the serialized form with the checksum field emptied.
    pub fn compute_checksum(&self) -> String {
        let mut zeroed = self.clone();
        zeroed.checksum = String::new();
        // Serialization of a fully in-memory document cannot fail.
        let bytes = serde_json::to_vec_pretty(&zeroed).unwrap_or_default();
        format!("{:08x}", crc32c_of(&bytes))
    }

    /// Serialize with a freshly computed self-checksum.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut sealed = self.clone();
        sealed.checksum = self.compute_checksum();
        serde_json::to_vec_pretty(&sealed)
            .map_err(|e| ContainerError::MalformedDescriptor(e.to_string()))
    }

    /// Parse a descriptor and validate its self-checksum. A mismatch marks
    /// the result `Unhealthy` instead of failing the load.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut descriptor: ContainerDescriptor = serde_json::from_slice(bytes)
            .map_err(|e| ContainerError::MalformedDescriptor(e.to_string()))?;
        let expected = descriptor.compute_checksum();
        if descriptor.checksum != expected {
            warn!(
                container_id = descriptor.container_id,
                stored = %descriptor.checksum,
                computed = %expected,
                "descriptor checksum mismatch, marking container unhealthy"
            );
            descriptor.state = ContainerState::Unhealthy;
        }
        Ok(descriptor)
    }

    /// Load from disk, validating the self-checksum.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

/// Atomically (re)write a descriptor file: serialize, write a temp file in
/// the target's directory, fsync, rename over the target. The temp file is
/// removed on every failure path.
pub fn write_atomic(path: &Path, descriptor: &ContainerDescriptor) -> Result<()> {
    let id = descriptor.container_id;
    let bytes = descriptor.to_bytes()?;
    let dir = path.parent().ok_or_else(|| {
        ContainerError::Internal(format!("descriptor path {} has no parent", path.display()))
    })?;

    let write = || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        // NamedTempFile removes itself on drop, so an error before this
        // point leaves no stray temp file behind.
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    };

    write().map_err(|source| ContainerError::FileWrite { id, source })
}
