//! Storage Volumes
//!
//! A volume is one storage location (disk or mount point) containers are
//! placed on. The engine tracks committed space per volume so creation can
//! refuse placements that would not fit, and flips a health flag when a
//! data-plane failure implicates the volume; the surrounding system owns
//! the actual disk checking and repair. Full volume *selection policy* is
//! out of scope here; [`VolumeSet::choose_volume`] implements the minimal
//! most-free-space pick container creation needs, under the set's read
//! lock.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{ContainerError, Result};

#[derive(Debug)]
pub struct Volume {
    root: PathBuf,
    cluster_id: String,
    capacity: u64,
    committed: AtomicU64,
    healthy: AtomicBool,
}

impl Volume {
    pub fn new(root: impl Into<PathBuf>, cluster_id: impl Into<String>, capacity: u64) -> Self {
        Self {
            root: root.into(),
            cluster_id: cluster_id.into(),
            capacity,
            committed: AtomicU64::new(0),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The id-level subdirectory containers of this cluster live under.
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn available(&self) -> u64 {
        self.capacity
            .saturating_sub(self.committed.load(Ordering::Acquire))
    }

    pub fn has_space(&self, bytes: u64) -> bool {
        self.available() >= bytes
    }

    /// Reserve space for a container. Returns false when the volume cannot
    /// fit the request.
    pub fn commit(&self, bytes: u64) -> bool {
        let mut current = self.committed.load(Ordering::Acquire);
        loop {
            if self.capacity.saturating_sub(current) < bytes {
                return false;
            }
            match self.committed.compare_exchange_weak(
                current,
                current + bytes,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Return previously committed space, e.g. after a container delete.
    pub fn release(&self, bytes: u64) {
        let mut current = self.committed.load(Ordering::Acquire);
        loop {
            let next = current.saturating_sub(bytes);
            match self.committed.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Record a data-plane failure on this volume. The surrounding system
    /// reads the flag and decides whether to take the volume out of
    /// service.
    pub fn on_failure(&self) {
        if self.healthy.swap(false, Ordering::AcqRel) {
            warn!(volume = %self.root.display(), "marking volume unhealthy after IO failure");
        }
    }
}

/// The set of volumes on one datanode, guarded by its own read/write lock:
/// container creation selects under the read lock, volume add/remove takes
/// the write lock.
pub struct VolumeSet {
    volumes: RwLock<Vec<Arc<Volume>>>,
}

impl VolumeSet {
    pub fn new(volumes: Vec<Arc<Volume>>) -> Self {
        Self {
            volumes: RwLock::new(volumes),
        }
    }

    pub async fn add_volume(&self, volume: Arc<Volume>) {
        self.volumes.write().await.push(volume);
    }

    pub async fn volumes(&self) -> Vec<Arc<Volume>> {
        self.volumes.read().await.clone()
    }

    /// Pick the healthy volume with the most free space that can fit
    /// `required` bytes. Holds the set's read lock for the duration of the
    /// selection.
    pub async fn choose_volume(&self, required: u64) -> Result<Arc<Volume>> {
        let volumes = self.volumes.read().await;
        volumes
            .iter()
            .filter(|v| v.is_healthy() && v.has_space(required))
            .max_by_key(|v| v.available())
            .cloned()
            .ok_or(ContainerError::DiskOutOfSpace {
                requested: required,
            })
    }
}
