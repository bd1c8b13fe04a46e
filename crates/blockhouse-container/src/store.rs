//! Embedded Block Store
//!
//! Each container owns one embedded RocksDB instance holding its block
//! records (the chunk lists served to readers by `GetBlock`) plus the
//! delete-transaction bookkeeping. The store directory lives inside the
//! container's metadata directory so the whole container stays one
//! self-contained subtree.
//!
//! ## Handle cache
//!
//! Opening RocksDB is expensive and at most one open handle may exist per
//! store directory, so handles are shared through [`StoreCache`]: a table
//! keyed by container id that serializes creation and hands out
//! reference-counted [`StoreHandle`]s. Dropping the last handle outside the
//! cache leaves the store open for the next reader; [`StoreCache::evict`]
//! closes it, and refuses while any handle is still out. Export relies on
//! that refusal: it evicts the entry and blocks new acquisitions for the
//! duration of the archive streaming so the packer never sees a mutating
//! database.

use std::collections::{HashMap, HashSet};
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use prost::Message;
use rocksdb::{IteratorMode, Options, DB};
use tokio::sync::Mutex;
use tracing::debug;

use blockhouse_proto::datanode::BlockDataProto;

use crate::error::{ContainerError, Result};

const BLOCK_KEY_PREFIX: &[u8] = b"b/";
const DELETE_TXN_KEY: &[u8] = b"m/delete-txn-id";

/// Totals rebuilt by scanning the block records, used after an import to
/// refresh the in-memory counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreTotals {
    pub key_count: u64,
    pub bytes_used: u64,
}

/// One container's embedded RocksDB store.
pub struct BlockStore {
    container_id: u64,
    db: DB,
}

impl BlockStore {
    pub fn open(container_id: u64, path: &Path, create: bool) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(create);
        let db = DB::open(&opts, path)?;
        Ok(Self { container_id, db })
    }

    pub fn container_id(&self) -> u64 {
        self.container_id
    }

    fn block_key(local_id: u64) -> Vec<u8> {
        let mut key = Vec::with_capacity(BLOCK_KEY_PREFIX.len() + 8);
        key.extend_from_slice(BLOCK_KEY_PREFIX);
        key.extend_from_slice(&local_id.to_be_bytes());
        key
    }

    /// Persist the block record a `GetBlock` will serve.
    pub fn put_block(&self, local_id: u64, block: &BlockDataProto) -> Result<()> {
        self.db
            .put(Self::block_key(local_id), block.encode_to_vec())?;
        Ok(())
    }

    pub fn get_block(&self, local_id: u64) -> Result<Option<BlockDataProto>> {
        match self.db.get(Self::block_key(local_id))? {
            Some(raw) => {
                let block = BlockDataProto::decode(&raw[..])
                    .map_err(|e| ContainerError::Store(e.to_string()))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    pub fn delete_block(&self, local_id: u64) -> Result<()> {
        self.db.delete(Self::block_key(local_id))?;
        Ok(())
    }

    pub fn put_delete_transaction_id(&self, txn_id: u64) -> Result<()> {
        self.db.put(DELETE_TXN_KEY, txn_id.to_be_bytes())?;
        Ok(())
    }

    /// Flush the write-ahead log, optionally fsyncing it. Failures map to
    /// `DbSyncError`; the caller marks the owning volume.
    pub fn flush_wal(&self, sync: bool) -> Result<()> {
        self.db.flush_wal(sync).map_err(|e| ContainerError::DbSync {
            id: self.container_id,
            message: e.to_string(),
        })
    }

    /// Compact the whole key range; run before packing so the archive does
    /// not carry memtable-only data or stale SST garbage.
    pub fn compact(&self) -> Result<()> {
        self.db.flush().map_err(|e| ContainerError::DbCompact {
            id: self.container_id,
            message: e.to_string(),
        })?;
        self.db.compact_range::<&[u8], &[u8]>(None, None);
        Ok(())
    }

    /// Rebuild counters by scanning every block record.
    pub fn scan_totals(&self) -> Result<StoreTotals> {
        let mut totals = StoreTotals::default();
        for entry in self.db.iterator(IteratorMode::Start) {
            let (key, value) = entry?;
            if !key.starts_with(BLOCK_KEY_PREFIX) {
                continue;
            }
            let block = BlockDataProto::decode(&value[..])
                .map_err(|e| ContainerError::Store(e.to_string()))?;
            totals.key_count += 1;
            totals.bytes_used += block.size.unwrap_or(0);
        }
        Ok(totals)
    }
}

/// A reference-counted handle to a cached [`BlockStore`]. Cloning is cheap;
/// the store stays open while any handle lives.
#[derive(Clone, Debug)]
pub struct StoreHandle {
    inner: Arc<BlockStore>,
}

impl Deref for StoreHandle {
    type Target = BlockStore;

    fn deref(&self) -> &BlockStore {
        &self.inner
    }
}

/// Shared table of open stores, keyed by container id.
#[derive(Default)]
pub struct StoreCache {
    entries: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    stores: HashMap<u64, Arc<BlockStore>>,
    exporting: HashSet<u64>,
}

impl StoreCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire a handle, opening (or creating) the store on first use.
    /// Creation is serialized by the cache lock, so two concurrent callers
    /// can never double-open one store directory.
    pub async fn acquire(&self, container_id: u64, path: &Path, create: bool) -> Result<StoreHandle> {
        let mut inner = self.entries.lock().await;
        if inner.exporting.contains(&container_id) {
            return Err(ContainerError::StoreBusy(container_id));
        }
        if let Some(store) = inner.stores.get(&container_id) {
            return Ok(StoreHandle {
                inner: Arc::clone(store),
            });
        }
        let store = Arc::new(BlockStore::open(container_id, path, create)?);
        inner.stores.insert(container_id, Arc::clone(&store));
        debug!(container_id, path = %path.display(), "opened container store");
        Ok(StoreHandle { inner: store })
    }

    /// Close a store by removing it from the cache. Fails with `StoreBusy`
    /// while handles are still outstanding, in which case the entry stays.
    pub async fn evict(&self, container_id: u64) -> Result<()> {
        let mut inner = self.entries.lock().await;
        match inner.stores.remove(&container_id) {
            None => Ok(()),
            Some(store) => {
                if Arc::strong_count(&store) > 1 {
                    inner.stores.insert(container_id, store);
                    Err(ContainerError::StoreBusy(container_id))
                } else {
                    debug!(container_id, "closed container store");
                    Ok(())
                }
            }
        }
    }

    /// Evict the store and refuse new handles until [`Self::end_export`].
    pub async fn begin_export(&self, container_id: u64) -> Result<()> {
        {
            let mut inner = self.entries.lock().await;
            if let Some(store) = inner.stores.remove(&container_id) {
                if Arc::strong_count(&store) > 1 {
                    inner.stores.insert(container_id, store);
                    return Err(ContainerError::StoreBusy(container_id));
                }
            }
            inner.exporting.insert(container_id);
        }
        Ok(())
    }

    pub async fn end_export(&self, container_id: u64) {
        self.entries.lock().await.exporting.remove(&container_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockhouse_core::BlockId;
    use blockhouse_proto::datanode::DatanodeBlockIdProto;

    fn block(container_id: u64, local_id: u64, size: u64) -> BlockDataProto {
        BlockDataProto {
            block_id: Some(DatanodeBlockIdProto::from(BlockId::new(
                container_id,
                local_id,
            ))),
            metadata: vec![],
            chunks: vec![],
            size: Some(size),
        }
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StoreCache::new();
        let handle = cache.acquire(1, dir.path(), true).await.unwrap();

        handle.put_block(7, &block(1, 7, 4096)).unwrap();
        let loaded = handle.get_block(7).unwrap().unwrap();
        assert_eq!(loaded.size, Some(4096));
        assert!(handle.get_block(8).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_totals() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StoreCache::new();
        let handle = cache.acquire(1, dir.path(), true).await.unwrap();

        for i in 0..5 {
            handle.put_block(i, &block(1, i, 100)).unwrap();
        }
        handle.put_delete_transaction_id(3).unwrap();

        let totals = handle.scan_totals().unwrap();
        assert_eq!(totals.key_count, 5);
        assert_eq!(totals.bytes_used, 500);
    }

    #[tokio::test]
    async fn test_acquire_shares_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StoreCache::new();
        let a = cache.acquire(1, dir.path(), true).await.unwrap();
        let b = cache.acquire(1, dir.path(), false).await.unwrap();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[tokio::test]
    async fn test_evict_refuses_with_outstanding_handle() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StoreCache::new();
        let handle = cache.acquire(1, dir.path(), true).await.unwrap();

        let err = cache.evict(1).await.unwrap_err();
        assert!(matches!(err, ContainerError::StoreBusy(1)));

        drop(handle);
        cache.evict(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_export_blocks_new_handles() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StoreCache::new();
        let handle = cache.acquire(1, dir.path(), true).await.unwrap();
        drop(handle);

        cache.begin_export(1).await.unwrap();
        let err = cache.acquire(1, dir.path(), false).await.unwrap_err();
        assert!(matches!(err, ContainerError::StoreBusy(1)));

        cache.end_export(1).await;
        cache.acquire(1, dir.path(), false).await.unwrap();
    }

    #[tokio::test]
    async fn test_flush_wal_and_compact() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StoreCache::new();
        let handle = cache.acquire(1, dir.path(), true).await.unwrap();
        handle.put_block(1, &block(1, 1, 10)).unwrap();
        handle.flush_wal(true).unwrap();
        handle.compact().unwrap();
    }
}
