//! Block Read Stream
//!
//! Reassembles one block from its chunks. The stream is created with the
//! block id, the declared length, the replica pipeline, and an opaque
//! token; everything else is fetched lazily:
//!
//! 1. The first read (or the first read after a pre-init seek) issues
//!    `GetBlock` over the current pipeline to fetch the ordered chunk
//!    list, retried per the [`RetryPolicy`]. A storage-container failure
//!    first attempts a *pipeline refresh* — asking the supplied callback
//!    for a replacement pipeline and adopting it only when it shares no
//!    datanodes with the current one — before anything counts against the
//!    retry budget.
//! 2. `chunk_offsets[i]` is the prefix sum of chunk lengths, so a seek
//!    binary-searches for the target chunk and delegates the remainder to
//!    that chunk stream. Chunk streams are lazy, so seeking past earlier
//!    chunks never opens them.
//! 3. Reads drain the current chunk stream and advance. A chunk handing
//!    back fewer bytes than it should still have is data corruption
//!    (`InconsistentChunkRead`), never EOF; EOF is only legal at the last
//!    chunk's final byte and is reported as `Ok(0)`.
//!
//! All operations take `&mut self`: a read session owns the stream
//! exclusively, which is the single-owner guarantee that lets close and
//! unbuffer sequence safely against an in-progress read.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{BufMut, Bytes};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use blockhouse_core::{BlockId, BlockToken, ChunkInfo, Pipeline};

use crate::calls;
use crate::chunk_stream::ChunkReadStream;
use crate::client_pool::{ClientFactory, ReplicaClient};
use crate::error::{ClientError, Result};
use crate::retry::RetryPolicy;

/// Asks the control plane for a fresh pipeline when the current one can no
/// longer serve a block. `None` means no better pipeline exists.
#[async_trait]
pub trait PipelineRefresher: Send + Sync {
    async fn refresh(&self, block_id: BlockId) -> Option<Pipeline>;
}

pub struct BlockReadStream {
    block_id: BlockId,
    length: u64,
    pipeline: Arc<Mutex<Pipeline>>,
    token: Option<BlockToken>,
    verify_checksum: bool,
    factory: Arc<dyn ClientFactory>,
    refresher: Option<Arc<dyn PipelineRefresher>>,
    retry_policy: RetryPolicy,
    retries: u32,
    client: Option<Arc<dyn ReplicaClient>>,
    initialized: bool,
    chunk_streams: Vec<ChunkReadStream>,
    /// `chunk_offsets[i]` is the offset of chunk `i`'s first byte within
    /// the block, i.e. the prefix sum of the chunk lengths.
    chunk_offsets: Vec<u64>,
    chunk_index: usize,
    /// Chunk index of the previous seek target, reset on the next seek.
    prev_chunk_index: usize,
    /// Position saved before initialization (or by unbuffer), replayed by
    /// the next read.
    block_position: u64,
    closed: bool,
}

impl BlockReadStream {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        block_id: BlockId,
        length: u64,
        pipeline: Pipeline,
        token: Option<BlockToken>,
        verify_checksum: bool,
        factory: Arc<dyn ClientFactory>,
        refresher: Option<Arc<dyn PipelineRefresher>>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            block_id,
            length,
            pipeline: Arc::new(Mutex::new(pipeline)),
            token,
            verify_checksum,
            factory,
            refresher,
            retry_policy,
            retries: 0,
            client: None,
            initialized: false,
            chunk_streams: Vec::new(),
            chunk_offsets: Vec::new(),
            chunk_index: 0,
            prev_chunk_index: 0,
            block_position: 0,
            closed: false,
        }
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    /// Declared block length.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Current position within the block.
    pub fn pos(&self) -> u64 {
        if self.length == 0 {
            return 0;
        }
        if !self.initialized {
            return self.block_position;
        }
        self.chunk_offsets[self.chunk_index] + self.chunk_streams[self.chunk_index].pos()
    }

    pub fn remaining(&self) -> u64 {
        self.length - self.pos()
    }

    // -----------------------------------------------------------------
    // Initialization
    // -----------------------------------------------------------------

    /// Fetch the block's chunk list and build one lazy chunk stream per
    /// chunk. Called at most once, from the first read. A seek issued
    /// before initialization is replayed once the chunk list is known.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let chunks = loop {
            match self.get_chunk_infos().await {
                Ok(chunks) => break chunks,
                Err(e) if e.is_security_fault() => return Err(e),
                Err(e) if e.is_storage_container() => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    // Refresh happens before anything counts against the
                    // retry budget; refusal to refresh propagates the
                    // original failure.
                    self.refresh_pipeline(e).await?;
                }
                Err(e) => {
                    self.retries += 1;
                    if self.retry_policy.should_retry(&e, self.retries) {
                        debug!(block = %self.block_id, error = %e, "retrying GetBlock");
                        self.retry_policy.wait().await;
                    } else {
                        return Err(e);
                    }
                }
            }
        };
        // A successful fetch resets the failure streak.
        self.retries = 0;

        let total: u64 = chunks.iter().map(|c| c.len).sum();
        if total != self.length {
            return Err(ClientError::EndOfStream {
                block: self.block_id,
                pos: total,
            });
        }

        let mut offset = 0;
        self.chunk_offsets = Vec::with_capacity(chunks.len());
        self.chunk_streams = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            self.chunk_offsets.push(offset);
            offset += chunk.len;
            self.chunk_streams.push(ChunkReadStream::new(
                chunk,
                self.block_id,
                Arc::clone(&self.pipeline),
                self.token.clone(),
                self.verify_checksum,
                Arc::clone(&self.factory),
            ));
        }
        self.chunk_index = 0;
        self.prev_chunk_index = 0;
        self.initialized = true;

        if self.block_position > 0 {
            // The stream was seeked before initialization; replay it now
            // that the chunk layout is known.
            let target = self.block_position;
            self.seek(target)?;
        }
        Ok(())
    }

    /// `GetBlock` over the current pipeline. Reads always go through the
    /// standalone variant, whatever the container was written with.
    async fn get_chunk_infos(&mut self) -> Result<Vec<ChunkInfo>> {
        {
            let mut pipeline = self.pipeline.lock().await;
            if !pipeline.replication.is_standalone() {
                *pipeline = pipeline.for_read();
            }
        }
        let client = self.acquire_client().await?;
        debug!(block = %self.block_id, "fetching chunk list");
        match calls::get_block(&*client, self.block_id, self.token.as_ref()).await {
            Ok(block_data) => Ok(block_data
                .chunks
                .iter()
                .map(|c| c.to_chunk_info())
                .collect()),
            Err(e) => {
                self.release_client(false).await;
                Err(e)
            }
        }
    }

    async fn refresh_pipeline(&mut self, cause: ClientError) -> Result<()> {
        let current = self.pipeline.lock().await.clone();
        info!(
            block = %self.block_id,
            pipeline = %current.id,
            error = %cause,
            "unable to read block from pipeline"
        );
        let Some(refresher) = &self.refresher else {
            return Err(cause);
        };
        match refresher.refresh(self.block_id).await {
            Some(fresh) if !fresh.same_datanodes(&current) => {
                debug!(block = %self.block_id, pipeline = %fresh.id, "adopting refreshed pipeline");
                *self.pipeline.lock().await = fresh;
                Ok(())
            }
            _ => {
                warn!(block = %self.block_id, "no new pipeline for block");
                Err(cause)
            }
        }
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Read into a slice. Returns the bytes read; `Ok(0)` is EOF.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut written = 0;
        let n = self
            .read_common(buf.len(), &mut |bytes: Bytes| {
                buf[written..written + bytes.len()].copy_from_slice(&bytes);
                written += bytes.len();
            })
            .await?;
        Ok(n)
    }

    /// Read up to `len` bytes into a buffer view.
    pub async fn read_buf<B: BufMut + Send>(&mut self, buf: &mut B, len: usize) -> Result<usize> {
        if len == 0 {
            return Ok(0);
        }
        self.read_common(len, &mut |bytes: Bytes| buf.put_slice(&bytes))
            .await
    }

    async fn read_common(
        &mut self,
        len: usize,
        sink: &mut (dyn FnMut(Bytes) + Send),
    ) -> Result<usize> {
        if self.closed {
            return Err(ClientError::StreamClosed);
        }
        if !self.initialized {
            self.initialize().await?;
        }

        let mut total_read = 0usize;
        while total_read < len {
            // At (or past) the last chunk with nothing remaining: EOF.
            if self.chunk_streams.is_empty()
                || (self.chunk_index + 1 >= self.chunk_streams.len()
                    && self.chunk_streams[self.chunk_index].remaining() == 0)
            {
                return Ok(total_read);
            }

            let want =
                ((len - total_read) as u64).min(self.chunk_streams[self.chunk_index].remaining());
            let result = self.chunk_streams[self.chunk_index].read_bytes(want).await;
            match result {
                Ok(bytes) => {
                    // A successful chunk read resets the failure streak.
                    self.retries = 0;
                    if bytes.len() as u64 != want {
                        return Err(ClientError::InconsistentChunkRead {
                            chunk: self.chunk_streams[self.chunk_index]
                                .chunk_name()
                                .to_string(),
                            requested: want,
                            got: bytes.len() as u64,
                        });
                    }
                    total_read += bytes.len();
                    sink(bytes);
                    if self.chunk_streams[self.chunk_index].remaining() == 0
                        && self.chunk_index + 1 < self.chunk_streams.len()
                    {
                        self.chunk_index += 1;
                    }
                }
                Err(e) if e.is_security_fault() => return Err(e),
                Err(e) if e.is_storage_container() => {
                    self.retries += 1;
                    if self.retry_policy.should_retry(&e, self.retries) {
                        self.handle_read_error(e).await?;
                        self.retry_policy.wait().await;
                    } else {
                        return Err(e);
                    }
                }
                Err(e) => {
                    // Transport-level failure: the replica may be down or
                    // the connection stale. Drop the chunk's client and
                    // retry against the same pipeline.
                    self.retries += 1;
                    if self.retry_policy.should_retry(&e, self.retries) {
                        debug!(block = %self.block_id, error = %e, "retrying chunk read");
                        self.chunk_streams[self.chunk_index]
                            .release_client(false)
                            .await;
                        self.retry_policy.wait().await;
                    } else {
                        return Err(e);
                    }
                }
            }
        }
        Ok(total_read)
    }

    /// Storage-container failure mid-read: release every client this
    /// stream holds, then move to a refreshed pipeline (propagating the
    /// original failure when no disjoint pipeline exists).
    async fn handle_read_error(&mut self, cause: ClientError) -> Result<()> {
        self.release_client(false).await;
        for stream in &mut self.chunk_streams {
            stream.release_client(false).await;
        }
        self.refresh_pipeline(cause).await
    }

    // -----------------------------------------------------------------
    // Seek
    // -----------------------------------------------------------------

    /// Seek to `pos` within the block. Before initialization the position
    /// is only saved; it is validated and applied when the chunk list
    /// arrives.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if self.closed {
            return Err(ClientError::StreamClosed);
        }
        if !self.initialized {
            self.block_position = pos;
            return Ok(());
        }
        if pos == 0 && self.length == 0 {
            return Ok(());
        }
        if pos >= self.length {
            return Err(ClientError::EndOfStream {
                block: self.block_id,
                pos,
            });
        }

        // Locate the target chunk, searching only the side of the current
        // index the position falls on.
        let index = if self.chunk_index >= self.chunk_streams.len() {
            Self::locate(&self.chunk_offsets, 0, self.chunk_streams.len(), pos)
        } else if pos < self.chunk_offsets[self.chunk_index] {
            Self::locate(&self.chunk_offsets, 0, self.chunk_index, pos)
        } else if pos
            >= self.chunk_offsets[self.chunk_index] + self.chunk_streams[self.chunk_index].len()
        {
            Self::locate(
                &self.chunk_offsets,
                self.chunk_index + 1,
                self.chunk_streams.len(),
                pos,
            )
        } else {
            self.chunk_index
        };

        // The previous seek target forgets its saved position, and every
        // stream above the new index rewinds so stale lazy state from
        // earlier reads cannot leak into a later pass.
        self.chunk_streams[self.prev_chunk_index].reset_position();
        for stream in self.chunk_streams.iter_mut().skip(index + 1) {
            stream.seek(0)?;
        }
        self.chunk_streams[index].seek(pos - self.chunk_offsets[index])?;
        self.chunk_index = index;
        self.prev_chunk_index = index;
        Ok(())
    }

    /// Greatest `i` in `[lo, hi)` with `offsets[i] <= pos`. A miss from
    /// the binary search returns the insertion point, whose predecessor is
    /// exactly that chunk.
    fn locate(offsets: &[u64], lo: usize, hi: usize, pos: u64) -> usize {
        match offsets[lo..hi].binary_search(&pos) {
            Ok(i) => lo + i,
            Err(insertion) => lo + insertion - 1,
        }
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Save the position, return every RPC client to the pool, and drop
    /// cached data so the connections can be reused elsewhere. The next
    /// read resumes transparently at the saved position.
    pub async fn unbuffer(&mut self) {
        self.block_position = self.pos();
        self.release_client(false).await;
        for stream in &mut self.chunk_streams {
            stream.unbuffer().await;
        }
    }

    /// Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.release_client(false).await;
        for stream in &mut self.chunk_streams {
            stream.close().await;
        }
        self.closed = true;
    }

    async fn acquire_client(&mut self) -> Result<Arc<dyn ReplicaClient>> {
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }
        let pipeline = self.pipeline.lock().await.clone();
        let client = self.factory.acquire_read_client(&pipeline).await?;
        self.client = Some(Arc::clone(&client));
        Ok(client)
    }

    async fn release_client(&mut self, invalidate: bool) {
        if let Some(client) = self.client.take() {
            self.factory.release_read_client(client, invalidate).await;
        }
    }

    // -----------------------------------------------------------------
    // Test visibility
    // -----------------------------------------------------------------

    /// Exposed for tests.
    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    /// Exposed for tests.
    pub fn saved_block_position(&self) -> u64 {
        self.block_position
    }

    /// Exposed for tests.
    pub fn retry_count(&self) -> u32 {
        self.retries
    }
}
