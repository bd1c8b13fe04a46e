//! Chunk Read Stream
//!
//! Reads one chunk of a block from the current replica pipeline. The
//! stream is lazy: constructing it costs nothing and no RPC happens until
//! the first read, so a seek that skips past earlier chunks never opens
//! them.
//!
//! Reads are fetched in checksum-aligned windows. When verification is on,
//! the requested byte range is widened to `bytes_per_checksum` boundaries,
//! every segment of the reply is checked against the chunk's recorded
//! checksum list, and only then is the window cached and served from. A
//! reply shorter than the window it was asked for is treated as data
//! corruption ([`ClientError::InconsistentChunkRead`]), never as EOF.
//!
//! [`ChunkReadStream::unbuffer`] persists the current position, drops the
//! cached window, and returns the RPC client to the pool; the next read
//! transparently re-acquires. All operations take `&mut self`: a read
//! session owns its stream exclusively, which is what makes an
//! unbuffer/close sequence safe against an in-progress read.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::sync::Mutex;
use tracing::trace;

use blockhouse_core::{BlockId, BlockToken, ChunkInfo, Pipeline};

use crate::calls;
use crate::client_pool::{ClientFactory, ReplicaClient};
use crate::error::{ClientError, Result};

/// A verified window of chunk data.
struct ChunkBuffer {
    /// Offset of `data[0]` within the chunk.
    offset: u64,
    data: Bytes,
    /// Bytes of `data` already consumed by reads.
    consumed: usize,
}

impl ChunkBuffer {
    fn covers(&self, pos: u64) -> bool {
        pos >= self.offset && pos < self.offset + self.data.len() as u64
    }

    fn position(&self) -> u64 {
        self.offset + self.consumed as u64
    }
}

pub struct ChunkReadStream {
    chunk: ChunkInfo,
    block_id: BlockId,
    token: Option<BlockToken>,
    verify_checksum: bool,
    /// Shared with the owning block stream so a pipeline refresh is
    /// visible to every chunk stream immediately.
    pipeline: Arc<Mutex<Pipeline>>,
    factory: Arc<dyn ClientFactory>,
    client: Option<Arc<dyn ReplicaClient>>,
    buffer: Option<ChunkBuffer>,
    /// Position saved by a seek or an unbuffer, applied on the next read.
    seek_position: Option<u64>,
    closed: bool,
}

impl ChunkReadStream {
    pub fn new(
        chunk: ChunkInfo,
        block_id: BlockId,
        pipeline: Arc<Mutex<Pipeline>>,
        token: Option<BlockToken>,
        verify_checksum: bool,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            chunk,
            block_id,
            token,
            verify_checksum,
            pipeline,
            factory,
            client: None,
            buffer: None,
            seek_position: None,
            closed: false,
        }
    }

    pub fn chunk_name(&self) -> &str {
        &self.chunk.chunk_name
    }

    /// Chunk length in bytes.
    pub fn len(&self) -> u64 {
        self.chunk.len
    }

    pub fn is_empty(&self) -> bool {
        self.chunk.len == 0
    }

    /// Current position within the chunk.
    pub fn pos(&self) -> u64 {
        if let Some(pos) = self.seek_position {
            pos
        } else if let Some(buffer) = &self.buffer {
            buffer.position()
        } else {
            0
        }
    }

    pub fn remaining(&self) -> u64 {
        self.chunk.len.saturating_sub(self.pos())
    }

    /// Seek within the chunk. A position at or past the chunk length fails
    /// `EndOfStream` (seeking an empty chunk to 0 is the one exception).
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if self.closed {
            return Err(ClientError::StreamClosed);
        }
        if pos >= self.chunk.len && !(pos == 0 && self.chunk.len == 0) {
            return Err(ClientError::EndOfStream {
                block: self.block_id,
                pos,
            });
        }
        if let Some(buffer) = &mut self.buffer {
            if buffer.covers(pos) {
                buffer.consumed = (pos - buffer.offset) as usize;
                self.seek_position = None;
                return Ok(());
            }
        }
        self.buffer = None;
        self.seek_position = Some(pos);
        Ok(())
    }

    /// Forget a pending seek so the next positional use starts from the
    /// stream's materialized position. Called by the block stream when it
    /// seeks away from this chunk.
    pub fn reset_position(&mut self) {
        self.seek_position = None;
    }

    /// Read exactly `min(len, remaining)` bytes from the current position.
    /// Anything shorter than that from the transport is corruption, not
    /// EOF.
    pub async fn read_bytes(&mut self, len: u64) -> Result<Bytes> {
        if self.closed {
            return Err(ClientError::StreamClosed);
        }
        let want = len.min(self.remaining()) as usize;
        if want == 0 {
            return Ok(Bytes::new());
        }

        let mut out = BytesMut::with_capacity(want);
        while out.len() < want {
            let pos = self.pos();
            let need = (want - out.len()) as u64;
            if !self.buffer.as_ref().map(|b| b.covers(pos)).unwrap_or(false) {
                self.fetch_at(pos, need).await?;
            }
            let buffer = self
                .buffer
                .as_mut()
                .ok_or_else(|| ClientError::Internal("chunk buffer missing after fetch".into()))?;
            let rel = (pos - buffer.offset) as usize;
            let n = (want - out.len()).min(buffer.data.len() - rel);
            out.extend_from_slice(&buffer.data[rel..rel + n]);
            buffer.consumed = rel + n;
            self.seek_position = None;
        }
        Ok(out.freeze())
    }

    /// Persist the position and release the client so the connection can
    /// be pooled; a subsequent read transparently re-acquires.
    pub async fn unbuffer(&mut self) {
        self.seek_position = Some(self.pos());
        self.buffer = None;
        self.release_client(false).await;
    }

    pub async fn release_client(&mut self, invalidate: bool) {
        if let Some(client) = self.client.take() {
            self.factory.release_read_client(client, invalidate).await;
        }
    }

    /// Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.release_client(false).await;
        self.buffer = None;
        self.closed = true;
    }

    // -----------------------------------------------------------------
    // Fetch and verification
    // -----------------------------------------------------------------

    /// The window actually requested for a read at `pos` of `need` bytes:
    /// widened to checksum boundaries when verification is on, clipped to
    /// the chunk length.
    fn window(&self, pos: u64, need: u64) -> (u64, u64) {
        let end = (pos + need).min(self.chunk.len);
        let bpc = self.chunk.checksum_data.bytes_per_checksum as u64;
        if self.verify_checksum && bpc > 0 {
            let start = pos - pos % bpc;
            let aligned_end = ((end + bpc - 1) / bpc * bpc).min(self.chunk.len);
            (start, aligned_end - start)
        } else {
            (pos, end - pos)
        }
    }

    async fn fetch_at(&mut self, pos: u64, need: u64) -> Result<()> {
        let (start, len) = self.window(pos, need);
        let client = self.acquire_client().await?;
        trace!(
            chunk = %self.chunk.chunk_name,
            start,
            len,
            "fetching chunk window"
        );
        let data = calls::read_chunk(
            &*client,
            self.block_id,
            &self.chunk,
            start,
            len,
            self.token.as_ref(),
        )
        .await?;

        if data.len() as u64 != len {
            return Err(ClientError::InconsistentChunkRead {
                chunk: self.chunk.chunk_name.clone(),
                requested: len,
                got: data.len() as u64,
            });
        }
        if self.verify_checksum {
            self.verify(start, &data)?;
        }

        self.buffer = Some(ChunkBuffer {
            offset: start,
            data,
            consumed: (pos - start) as usize,
        });
        self.seek_position = None;
        Ok(())
    }

    fn verify(&self, window_start: u64, data: &[u8]) -> Result<()> {
        let bpc = self.chunk.checksum_data.bytes_per_checksum as usize;
        if bpc == 0 {
            return Ok(());
        }
        let first_segment = (window_start / bpc as u64) as usize;
        for (i, segment) in data.chunks(bpc).enumerate() {
            if !self
                .chunk
                .checksum_data
                .verify_segment(first_segment + i, segment)
            {
                return Err(ClientError::ChecksumMismatch {
                    chunk: self.chunk.chunk_name.clone(),
                    segment: first_segment + i,
                });
            }
        }
        Ok(())
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
}
