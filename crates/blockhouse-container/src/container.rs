//! Key-Value Container State Machine
//!
//! [`KeyValueContainer`] owns one container's lifecycle. Every mutation
//! runs under the container's write lock and follows the same procedure:
//! record the old state, apply the in-memory change, rewrite the descriptor
//! atomically, and on a write failure roll the in-memory state back unless
//! the container has gone `Unhealthy` (unhealthy is sticky so a failing
//! disk cannot be "rolled back" into looking fine).
//!
//! ## Locking
//!
//! The lock is a non-fair `tokio::sync::RwLock` around the container's
//! mutable data. Mutations take the write half; scans, reports, and export
//! streaming take the read half. Export needs both in sequence: it prepares
//! the store under the write guard and then *downgrades* to a read guard
//! for the archive streaming so concurrent readers are only blocked for the
//! preparation window. Cancelling a task that is waiting on either half
//! simply drops the lock future, aborting the operation without side
//! effects.
//!
//! ## fsync discipline
//!
//! Close and quasi-close flush-and-fsync the embedded store twice: once
//! before taking the write lock (the expensive fsync must not happen under
//! the lock) and once again under it, which is cheap and covers writes that
//! slipped in between the two.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::descriptor::{self, ContainerDescriptor, ContainerState};
use crate::error::{ContainerError, Result};
use crate::layout::ContainerPaths;
use crate::packer::TarContainerPacker;
use crate::store::{StoreCache, StoreHandle};
use crate::volume::{Volume, VolumeSet};

struct ContainerInner {
    descriptor: ContainerDescriptor,
    paths: Option<ContainerPaths>,
    volume: Option<Arc<Volume>>,
}

impl ContainerInner {
    fn paths(&self) -> Result<&ContainerPaths> {
        self.paths
            .as_ref()
            .ok_or_else(|| ContainerError::Internal("container paths not populated".into()))
    }
}

/// Point-in-time replica report handed to the surrounding system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerReport {
    pub container_id: u64,
    pub state: ContainerState,
    pub bytes_used: u64,
    pub key_count: u64,
    pub read_count: u64,
    pub write_count: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub block_commit_sequence_id: u64,
    pub delete_transaction_id: u64,
    pub origin_node_id: String,
}

pub struct KeyValueContainer {
    id: u64,
    store_cache: Arc<StoreCache>,
    inner: RwLock<ContainerInner>,
}

impl KeyValueContainer {
    pub fn new(descriptor: ContainerDescriptor, store_cache: Arc<StoreCache>) -> Self {
        Self {
            id: descriptor.container_id,
            store_cache,
            inner: RwLock::new(ContainerInner {
                descriptor,
                paths: None,
                volume: None,
            }),
        }
    }

    /// Bring an existing container back from disk, e.g. at datanode
    /// startup. A descriptor whose self-checksum fails loads as
    /// `Unhealthy`.
    pub async fn load(
        volume: Arc<Volume>,
        container_id: u64,
        store_cache: Arc<StoreCache>,
    ) -> Result<Self> {
        let paths = ContainerPaths::build(volume.root(), volume.cluster_id(), container_id);
        let descriptor = ContainerDescriptor::load(&paths.descriptor_file)?;
        Ok(Self {
            id: container_id,
            store_cache,
            inner: RwLock::new(ContainerInner {
                descriptor,
                paths: Some(paths),
                volume: Some(volume),
            }),
        })
    }

    pub fn container_id(&self) -> u64 {
        self.id
    }

    // -----------------------------------------------------------------
    // Creation and path population
    // -----------------------------------------------------------------

    /// Create the container on one of the set's volumes: pick a volume with
    /// room for `max_size` under the set's read lock, lay out the directory
    /// tree and the embedded store, and write the initial descriptor. A
    /// failure removes whatever was partially created.
    pub async fn create(&self, volume_set: &VolumeSet) -> Result<()> {
        let mut inner = self.inner.write().await;
        let max_size = inner.descriptor.max_size;

        let volume = volume_set.choose_volume(max_size).await?;
        if !volume.commit(max_size) {
            return Err(ContainerError::DiskOutOfSpace {
                requested: max_size,
            });
        }
        let paths = ContainerPaths::build(volume.root(), volume.cluster_id(), self.id);

        match self.create_on_disk(&paths, &inner.descriptor).await {
            Ok(()) => {
                inner.paths = Some(paths);
                inner.volume = Some(volume);
                debug!(container_id = self.id, "container created");
                Ok(())
            }
            Err(e) => {
                volume.release(max_size);
                if !matches!(e, ContainerError::AlreadyExists(_)) {
                    let _ = self.store_cache.evict(self.id).await;
                    let _ = std::fs::remove_dir_all(&paths.root);
                }
                Err(e)
            }
        }
    }

    async fn create_on_disk(
        &self,
        paths: &ContainerPaths,
        descriptor: &ContainerDescriptor,
    ) -> Result<()> {
        if paths.descriptor_file.exists() || paths.metadata_dir.exists() {
            return Err(ContainerError::AlreadyExists(self.id));
        }
        std::fs::create_dir_all(&paths.metadata_dir)?;
        std::fs::create_dir_all(&paths.chunks_dir)?;
        // Opening with create=true lays out the store directory.
        let _store = self
            .store_cache
            .acquire(self.id, &paths.store_dir, true)
            .await?;
        descriptor::write_atomic(&paths.descriptor_file, descriptor)?;
        Ok(())
    }

    /// Set the path fields for a container that will be filled by import;
    /// nothing is created on disk.
    pub async fn populate_paths(&self, volume: Arc<Volume>) {
        let mut inner = self.inner.write().await;
        inner.paths = Some(ContainerPaths::build(
            volume.root(),
            volume.cluster_id(),
            self.id,
        ));
        inner.volume = Some(volume);
    }

    // -----------------------------------------------------------------
    // State transitions
    // -----------------------------------------------------------------

    /// `OPEN -> CLOSING`. Only legal from `OPEN`.
    pub async fn mark_for_close(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        let state = inner.descriptor.state;
        if !state.is_open() {
            return Err(ContainerError::NotOpen { id: self.id, state });
        }
        Self::update_descriptor(self.id, &mut inner, |d| d.state = ContainerState::Closing)?;
        debug!(container_id = self.id, "container marked for close");
        Ok(())
    }

    /// Any non-terminal state `-> UNHEALTHY`, unconditionally.
    pub async fn mark_unhealthy(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        let state = inner.descriptor.state;
        if state.is_terminal() {
            return Err(ContainerError::InvalidState { id: self.id, state });
        }
        Self::update_descriptor(self.id, &mut inner, |d| d.state = ContainerState::Unhealthy)?;
        warn!(
            container_id = self.id,
            previous_state = %state,
            "container marked unhealthy"
        );
        Ok(())
    }

    /// `OPEN | CLOSING -> CLOSED`, with the store flushed and fsynced
    /// before the transition is recorded.
    pub async fn close(&self) -> Result<()> {
        // The expensive fsync happens outside the write lock.
        self.flush_and_sync_store().await?;

        let mut inner = self.inner.write().await;
        let state = inner.descriptor.state;
        if !state.can_transition_to(ContainerState::Closed) {
            return Err(ContainerError::NotOpen { id: self.id, state });
        }
        // Second sync is cheap and covers writes interleaved between the
        // two fsyncs.
        self.flush_store_locked(&inner).await?;
        Self::update_descriptor(self.id, &mut inner, |d| d.state = ContainerState::Closed)?;
        info!(
            container_id = self.id,
            bcs_id = inner.descriptor.block_commit_sequence_id,
            "container closed"
        );
        Ok(())
    }

    /// `CLOSING -> QUASI_CLOSED`: the close taken when a quorum-certified
    /// close is not possible. Same flush discipline as [`Self::close`].
    pub async fn quasi_close(&self) -> Result<()> {
        self.flush_and_sync_store().await?;

        let mut inner = self.inner.write().await;
        let state = inner.descriptor.state;
        if !state.can_transition_to(ContainerState::QuasiClosed) {
            return Err(ContainerError::NotOpen { id: self.id, state });
        }
        self.flush_store_locked(&inner).await?;
        Self::update_descriptor(self.id, &mut inner, |d| {
            d.state = ContainerState::QuasiClosed
        })?;
        info!(
            container_id = self.id,
            bcs_id = inner.descriptor.block_commit_sequence_id,
            "container quasi-closed"
        );
        Ok(())
    }

    /// Merge metadata into the container. Permitted in `OPEN`; any other
    /// state requires `force`. The previous map is restored if the
    /// descriptor rewrite fails.
    pub async fn update(&self, metadata: BTreeMap<String, String>, force: bool) -> Result<()> {
        let mut inner = self.inner.write().await;
        let state = inner.descriptor.state;
        if !force && !state.is_open() {
            return Err(ContainerError::UnsupportedRequest(format!(
                "updating container {} in state {state} without force",
                self.id
            )));
        }

        let old_metadata = inner.descriptor.metadata.clone();
        for (key, value) in metadata {
            inner.descriptor.metadata.insert(key, value);
        }
        if let Err(e) = Self::write_descriptor(self.id, &inner) {
            inner.descriptor.metadata = old_metadata;
            return Err(e);
        }
        Ok(())
    }

    /// `CLOSED | QUASI_CLOSED | UNHEALTHY -> DELETED`. Removes the chunks
    /// directory, the metadata directory, and the container root; returns
    /// the committed space to the volume. Terminal.
    pub async fn delete(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        let state = inner.descriptor.state;
        if !state.can_transition_to(ContainerState::Deleted) {
            return Err(ContainerError::InvalidState { id: self.id, state });
        }
        self.store_cache.evict(self.id).await?;

        let paths = inner.paths()?.clone();
        let removed = (|| -> std::io::Result<()> {
            if paths.chunks_dir.exists() {
                std::fs::remove_dir_all(&paths.chunks_dir)?;
            }
            if paths.metadata_dir.exists() {
                std::fs::remove_dir_all(&paths.metadata_dir)?;
            }
            if paths.root.exists() {
                std::fs::remove_dir_all(&paths.root)?;
            }
            Ok(())
        })();
        if let Err(e) = removed {
            if let Some(volume) = &inner.volume {
                volume.on_failure();
            }
            return Err(e.into());
        }

        if let Some(volume) = &inner.volume {
            volume.release(inner.descriptor.max_size);
        }
        inner.descriptor.state = ContainerState::Deleted;
        info!(container_id = self.id, "container deleted");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Export / import
    // -----------------------------------------------------------------

    /// Stream the container as a single archive. Only legal in `CLOSED` or
    /// `QUASI_CLOSED`; fails before a single archive byte is written
    /// otherwise. The store is compacted and evicted under the write
    /// guard, then the guard is downgraded so concurrent readers may
    /// proceed while the archive streams.
    pub async fn export<W>(&self, packer: &TarContainerPacker, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let guard = self.inner.write().await;
        let state = guard.descriptor.state;
        if !matches!(
            state,
            ContainerState::Closed | ContainerState::QuasiClosed
        ) {
            return Err(ContainerError::InvalidState { id: self.id, state });
        }

        let store_dir = guard.paths()?.store_dir.clone();
        let volume = guard.volume.clone();
        {
            let handle = self
                .store_cache
                .acquire(self.id, &store_dir, false)
                .await?;
            if let Err(e) = handle.compact() {
                if let Some(volume) = &volume {
                    volume.on_failure();
                }
                return Err(e);
            }
        }
        // Zero outstanding handles while packing: evict the cache entry and
        // refuse new handles for the duration of the export.
        self.store_cache.begin_export(self.id).await?;

        let read_guard = guard.downgrade();
        let result = match read_guard.paths() {
            Ok(paths) => packer.pack(paths, out).await,
            Err(e) => Err(e),
        };
        drop(read_guard);
        self.store_cache.end_export(self.id).await;

        if result.is_ok() {
            debug!(container_id = self.id, "container exported");
        }
        result
    }

    /// Fill a freshly created container from an archive. Only legal while
    /// no descriptor exists yet. Any failure removes the metadata, chunks,
    /// and container-root directories.
    pub async fn import<R>(&self, packer: &TarContainerPacker, input: &mut R) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut inner = self.inner.write().await;
        let paths = inner.paths()?.clone();
        if paths.descriptor_file.exists() {
            return Err(ContainerError::AlreadyExists(self.id));
        }

        let result = self.import_locked(&mut inner, packer, &paths, input).await;
        if result.is_err() {
            let _ = self.store_cache.evict(self.id).await;
            let _ = std::fs::remove_dir_all(&paths.metadata_dir);
            let _ = std::fs::remove_dir_all(&paths.chunks_dir);
            let _ = std::fs::remove_dir_all(&paths.root);
        } else {
            info!(container_id = self.id, "container imported");
        }
        result
    }

    async fn import_locked<R>(
        &self,
        inner: &mut ContainerInner,
        packer: &TarContainerPacker,
        paths: &ContainerPaths,
        input: &mut R,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let descriptor_bytes = packer.unpack(paths, input).await?;
        let original = ContainerDescriptor::from_bytes(&descriptor_bytes)?;
        if original.container_id != self.id {
            return Err(ContainerError::Internal(format!(
                "archive holds container {}, expected {}",
                original.container_id, self.id
            )));
        }

        // Overlay the replicated attributes; the path-dependent fields stay
        // local and the rewrite below computes a fresh self-checksum.
        inner.descriptor.state = original.state;
        inner.descriptor.schema_version = original.schema_version;
        inner.descriptor.layout_version = original.layout_version;
        inner
            .descriptor
            .update_block_commit_sequence_id(original.block_commit_sequence_id);
        inner.descriptor.delete_transaction_id = original.delete_transaction_id;
        inner.descriptor.origin_node_id = original.origin_node_id;
        inner.descriptor.origin_pipeline_id = original.origin_pipeline_id;
        for (key, value) in original.metadata {
            inner.descriptor.metadata.insert(key, value);
        }
        Self::write_descriptor(self.id, inner)?;

        // Rebuild the in-memory counters by scanning the imported store.
        let handle = self
            .store_cache
            .acquire(self.id, &paths.store_dir, false)
            .await?;
        let totals = handle.scan_totals()?;
        inner.descriptor.key_count = totals.key_count;
        inner.descriptor.bytes_used = totals.bytes_used;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Counters and small mutations
    // -----------------------------------------------------------------

    /// Raise the block-commit sequence id (in memory; persisted with the
    /// next descriptor rewrite). Values below the current id are ignored.
    pub async fn update_block_commit_sequence_id(&self, bcs_id: u64) {
        let mut inner = self.inner.write().await;
        inner.descriptor.update_block_commit_sequence_id(bcs_id);
    }

    pub async fn update_delete_transaction_id(&self, txn_id: u64) {
        let mut inner = self.inner.write().await;
        inner.descriptor.delete_transaction_id = txn_id;
    }

    /// Record the time of the last successful data scan.
    pub async fn update_data_scan_timestamp(&self, millis: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        Self::update_descriptor(self.id, &mut inner, |d| {
            d.last_data_scan_timestamp = Some(millis)
        })
    }

    /// Record "now" as the last successful data scan.
    pub async fn touch_data_scan_timestamp(&self) -> Result<()> {
        self.update_data_scan_timestamp(chrono::Utc::now().timestamp_millis())
            .await
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    pub async fn state(&self) -> ContainerState {
        self.inner.read().await.descriptor.state
    }

    pub async fn block_commit_sequence_id(&self) -> u64 {
        self.inner.read().await.descriptor.block_commit_sequence_id
    }

    /// A snapshot of the full descriptor.
    pub async fn descriptor(&self) -> ContainerDescriptor {
        self.inner.read().await.descriptor.clone()
    }

    pub async fn paths(&self) -> Result<ContainerPaths> {
        Ok(self.inner.read().await.paths()?.clone())
    }

    /// Whether the background scanner should verify this container's data.
    pub async fn should_scan_data(&self) -> bool {
        matches!(
            self.state().await,
            ContainerState::Closed | ContainerState::QuasiClosed
        )
    }

    pub async fn report(&self) -> ContainerReport {
        let inner = self.inner.read().await;
        let d = &inner.descriptor;
        ContainerReport {
            container_id: d.container_id,
            state: d.state,
            bytes_used: d.bytes_used,
            key_count: d.key_count,
            read_count: d.read_count,
            write_count: d.write_count,
            read_bytes: d.read_bytes,
            write_bytes: d.write_bytes,
            block_commit_sequence_id: d.block_commit_sequence_id,
            delete_transaction_id: d.delete_transaction_id,
            origin_node_id: d.origin_node_id.clone(),
        }
    }

    /// Acquire a handle on the container's embedded store.
    pub async fn store(&self) -> Result<StoreHandle> {
        let store_dir = {
            let inner = self.inner.read().await;
            inner.paths()?.store_dir.clone()
        };
        self.store_cache.acquire(self.id, &store_dir, false).await
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// The mutation procedure: record old state, apply, rewrite the
    /// descriptor; on failure roll the state back unless the container is
    /// now `Unhealthy`.
    fn update_descriptor<F>(id: u64, inner: &mut ContainerInner, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut ContainerDescriptor),
    {
        let old_state = inner.descriptor.state;
        mutate(&mut inner.descriptor);
        match Self::write_descriptor(id, inner) {
            Ok(()) => Ok(()),
            Err(e) => {
                if inner.descriptor.state != ContainerState::Unhealthy {
                    inner.descriptor.state = old_state;
                }
                Err(e)
            }
        }
    }

    fn write_descriptor(id: u64, inner: &ContainerInner) -> Result<()> {
        let paths = inner.paths()?;
        match descriptor::write_atomic(&paths.descriptor_file, &inner.descriptor) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(container_id = id, error = %e, "descriptor rewrite failed");
                if let Some(volume) = &inner.volume {
                    volume.on_failure();
                }
                Err(e)
            }
        }
    }

    /// Flush-and-fsync outside the lock (the expensive phase).
    async fn flush_and_sync_store(&self) -> Result<()> {
        let (store_dir, volume) = {
            let inner = self.inner.read().await;
            (inner.paths()?.store_dir.clone(), inner.volume.clone())
        };
        self.flush_store(&store_dir, volume.as_deref()).await
    }

    /// The cheap second flush, run while holding the write guard.
    async fn flush_store_locked(&self, inner: &ContainerInner) -> Result<()> {
        self.flush_store(&inner.paths()?.store_dir, inner.volume.as_deref())
            .await
    }

    async fn flush_store(&self, store_dir: &Path, volume: Option<&Volume>) -> Result<()> {
        let handle = self.store_cache.acquire(self.id, store_dir, false).await?;
        match handle.flush_wal(true) {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Some(volume) = volume {
                    volume.on_failure();
                }
                Err(e)
            }
        }
    }
}
