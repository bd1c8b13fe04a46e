//! Block read path tests over a programmable in-memory transport: retry,
//! pipeline refresh, seek, checksum verification, unbuffer, and the
//! corruption-vs-EOF distinction.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use blockhouse_client::{
    BlockReadStream, ClientError, ClientFactory, PipelineRefresher, ReplicaClient, RetryPolicy,
};
use blockhouse_core::{
    BlockId, ChecksumAlgorithm, ChecksumData, ChunkInfo, DatanodeDetails, Pipeline, PipelineId,
    ReplicationConfig, ReplicationFactor,
};
use blockhouse_proto::datanode::{
    BlockDataProto, ChunkInfoProto, ContainerCommand, ContainerCommandRequest,
    ContainerCommandResponse, ContainerResult, DatanodeBlockIdProto, GetBlockResponseProto,
    ReadChunkResponseProto,
};

const BYTES_PER_CHECKSUM: u32 = 16;

// ---------------------------------------------------------------
// Mock transport
// ---------------------------------------------------------------

#[derive(Clone, Copy)]
enum Fail {
    /// Respond with this result code in the envelope.
    Storage(ContainerResult),
    /// Fail at the transport layer.
    Transport,
}

#[derive(Default)]
struct MockNet {
    /// Block record plus the full block bytes, keyed by block id.
    blocks: Mutex<HashMap<BlockId, (BlockDataProto, Bytes)>>,
    get_block_failures: Mutex<VecDeque<Fail>>,
    read_chunk_failures: Mutex<VecDeque<Fail>>,
    /// Serve this many bytes (at most) for the next chunk read.
    short_read_once: Mutex<Option<u64>>,
    get_block_calls: AtomicUsize,
    read_chunk_calls: AtomicUsize,
}

impl MockNet {
    fn put_block(&self, block_id: BlockId, data: Bytes, chunk_size: u64) {
        let mut chunks = Vec::new();
        let mut offset = 0;
        let mut index = 0;
        while offset < data.len() as u64 {
            let len = chunk_size.min(data.len() as u64 - offset);
            let slice = &data[offset as usize..(offset + len) as usize];
            let mut chunk = ChunkInfo::new(
                format!("{}_chunk_{}", block_id.local_id, index),
                offset,
                len,
            );
            chunk.checksum_data =
                ChecksumData::compute(ChecksumAlgorithm::Crc32c, BYTES_PER_CHECKSUM, slice);
            chunks.push(ChunkInfoProto::from(&chunk));
            offset += len;
            index += 1;
        }
        let record = BlockDataProto {
            block_id: Some(DatanodeBlockIdProto::from(block_id)),
            metadata: vec![],
            chunks,
            size: Some(data.len() as u64),
        };
        self.blocks.lock().unwrap().insert(block_id, (record, data));
    }
}

struct MockClient {
    address: String,
    net: Arc<MockNet>,
}

fn failure_response(cmd_type: i32, result: ContainerResult) -> ContainerCommandResponse {
    ContainerCommandResponse {
        cmd_type,
        trace_id: None,
        result: result as i32,
        message: Some("injected failure".to_string()),
        get_block: None,
        read_chunk: None,
    }
}

#[async_trait]
impl ReplicaClient for MockClient {
    async fn send(
        &self,
        request: ContainerCommandRequest,
    ) -> Result<ContainerCommandResponse, ClientError> {
        if request.cmd_type == ContainerCommand::GetBlock as i32 {
            self.net.get_block_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(fail) = self.net.get_block_failures.lock().unwrap().pop_front() {
                return match fail {
                    Fail::Transport => {
                        Err(ClientError::RpcTransport("connection refused".into()))
                    }
                    Fail::Storage(result) => Ok(failure_response(request.cmd_type, result)),
                };
            }
            let get_block = request
                .get_block
                .expect("GetBlock request without payload");
            let block_id = get_block.block_id.to_block_id();
            let blocks = self.net.blocks.lock().unwrap();
            let (record, _) = blocks.get(&block_id).expect("unknown block");
            return Ok(ContainerCommandResponse {
                cmd_type: request.cmd_type,
                trace_id: None,
                result: ContainerResult::Success as i32,
                message: None,
                get_block: Some(GetBlockResponseProto {
                    block_data: record.clone(),
                }),
                read_chunk: None,
            });
        }

        if request.cmd_type == ContainerCommand::ReadChunk as i32 {
            self.net.read_chunk_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(fail) = self.net.read_chunk_failures.lock().unwrap().pop_front() {
                return match fail {
                    Fail::Transport => Err(ClientError::RpcTransport("broken pipe".into())),
                    Fail::Storage(result) => Ok(failure_response(request.cmd_type, result)),
                };
            }
            let read_chunk = request
                .read_chunk
                .expect("ReadChunk request without payload");
            let block_id = read_chunk.block_id.to_block_id();
            let chunk = read_chunk.chunk_data;
            let read_offset = read_chunk.read_offset.unwrap_or(0);
            let mut read_len = read_chunk.read_len.unwrap_or(chunk.len);
            if let Some(cap) = self.net.short_read_once.lock().unwrap().take() {
                read_len = read_len.min(cap);
            }
            let blocks = self.net.blocks.lock().unwrap();
            let (_, data) = blocks.get(&block_id).expect("unknown block");
            let start = (chunk.offset + read_offset) as usize;
            let end = (start + read_len as usize).min(data.len());
            return Ok(ContainerCommandResponse {
                cmd_type: request.cmd_type,
                trace_id: None,
                result: ContainerResult::Success as i32,
                message: None,
                get_block: None,
                read_chunk: Some(ReadChunkResponseProto {
                    block_id: read_chunk.block_id,
                    chunk_data: chunk,
                    data: data.slice(start..end),
                }),
            });
        }

        Ok(failure_response(
            request.cmd_type,
            ContainerResult::UnsupportedRequest,
        ))
    }

    fn address(&self) -> &str {
        &self.address
    }
}

#[derive(Default)]
struct FactoryStats {
    acquires: AtomicUsize,
    releases: AtomicUsize,
    invalidations: AtomicUsize,
    non_standalone_acquires: AtomicUsize,
}

struct MockFactory {
    net: Arc<MockNet>,
    stats: FactoryStats,
}

impl MockFactory {
    fn new(net: Arc<MockNet>) -> Arc<Self> {
        Arc::new(Self {
            net,
            stats: FactoryStats::default(),
        })
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn acquire_read_client(
        &self,
        pipeline: &Pipeline,
    ) -> Result<Arc<dyn ReplicaClient>, ClientError> {
        self.stats.acquires.fetch_add(1, Ordering::SeqCst);
        if !pipeline.replication.is_standalone() {
            self.stats
                .non_standalone_acquires
                .fetch_add(1, Ordering::SeqCst);
        }
        let node = pipeline
            .first_node()
            .ok_or_else(|| ClientError::Internal("empty pipeline".into()))?;
        Ok(Arc::new(MockClient {
            address: node.address.clone(),
            net: Arc::clone(&self.net),
        }))
    }

    async fn release_read_client(&self, _client: Arc<dyn ReplicaClient>, invalidate: bool) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
        if invalidate {
            self.stats.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct FixedRefresher {
    pipeline: Mutex<Option<Pipeline>>,
    calls: AtomicUsize,
}

impl FixedRefresher {
    fn new(pipeline: Option<Pipeline>) -> Arc<Self> {
        Arc::new(Self {
            pipeline: Mutex::new(pipeline),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PipelineRefresher for FixedRefresher {
    async fn refresh(&self, _block_id: BlockId) -> Option<Pipeline> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pipeline.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------

fn pipeline_of(addresses: &[&str]) -> Pipeline {
    Pipeline::new(
        PipelineId::random(),
        ReplicationConfig::Replicated(ReplicationFactor::Three),
        addresses
            .iter()
            .map(|a| DatanodeDetails::new(Uuid::new_v4(), *a))
            .collect(),
    )
}

fn block_bytes(len: usize) -> Bytes {
    Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::ZERO)
}

struct Setup {
    net: Arc<MockNet>,
    factory: Arc<MockFactory>,
    stream: BlockReadStream,
    data: Bytes,
}

fn setup(len: usize, chunk_size: u64, verify: bool) -> Setup {
    let net = Arc::new(MockNet::default());
    let data = block_bytes(len);
    let block_id = BlockId::new(1, 100);
    net.put_block(block_id, data.clone(), chunk_size);
    let factory = MockFactory::new(Arc::clone(&net));
    let stream = BlockReadStream::new(
        block_id,
        len as u64,
        pipeline_of(&["dn1:9859", "dn2:9859", "dn3:9859"]),
        None,
        verify,
        factory.clone() as Arc<dyn ClientFactory>,
        None,
        fast_policy(),
    );
    Setup {
        net,
        factory,
        stream,
        data,
    }
}

async fn read_exact(stream: &mut BlockReadStream, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    let n = stream.read(&mut buf).await.unwrap();
    buf.truncate(n);
    buf
}

// ---------------------------------------------------------------
// Plain reads
// ---------------------------------------------------------------

#[tokio::test]
async fn read_whole_block() {
    let mut s = setup(100, 40, true);
    let out = read_exact(&mut s.stream, 100).await;
    assert_eq!(out, s.data.as_ref());
    assert_eq!(s.stream.pos(), 100);

    // EOF afterwards.
    let mut buf = [0u8; 10];
    assert_eq!(s.stream.read(&mut buf).await.unwrap(), 0);
}

#[tokio::test]
async fn read_with_arbitrary_buffer_sizes() {
    let mut s = setup(400, 40, true);
    let mut collected = Vec::new();
    for size in [1usize, 3, 7, 64, 39, 41, 100, 400] {
        let part = read_exact(&mut s.stream, size).await;
        if part.is_empty() {
            break;
        }
        collected.extend_from_slice(&part);
    }
    // Drain the rest.
    loop {
        let part = read_exact(&mut s.stream, 33).await;
        if part.is_empty() {
            break;
        }
        collected.extend_from_slice(&part);
    }
    assert_eq!(collected, s.data.as_ref());
}

#[tokio::test]
async fn read_buf_into_bytes_mut() {
    let mut s = setup(100, 40, true);
    let mut out = bytes::BytesMut::new();
    let n = s.stream.read_buf(&mut out, 100).await.unwrap();
    assert_eq!(n, 100);
    assert_eq!(out.freeze(), s.data);
}

#[tokio::test]
async fn empty_block_reads_eof() {
    let mut s = setup(0, 40, true);
    let mut buf = [0u8; 8];
    assert_eq!(s.stream.read(&mut buf).await.unwrap(), 0);
    assert_eq!(s.stream.pos(), 0);
}

#[tokio::test]
async fn construction_is_lazy() {
    let s = setup(100, 40, true);
    // No RPC before the first read.
    assert_eq!(s.net.get_block_calls.load(Ordering::SeqCst), 0);
    assert_eq!(s.net.read_chunk_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------
// Seek
// ---------------------------------------------------------------

#[tokio::test]
async fn seek_before_init_then_read() {
    let mut s = setup(400, 40, true);

    s.stream.seek(90).unwrap();
    assert_eq!(s.stream.pos(), 90);
    assert_eq!(s.net.get_block_calls.load(Ordering::SeqCst), 0);

    let out = read_exact(&mut s.stream, 10).await;
    assert_eq!(out, &s.data[90..100]);
    assert_eq!(s.stream.pos(), 100);
    // Offset 90 lives in chunk 2 (indices 80..120).
    assert_eq!(s.stream.chunk_index(), 2);
}

#[tokio::test]
async fn seek_pos_roundtrip_every_offset() {
    let mut s = setup(100, 40, true);
    // Initialize by reading one byte.
    read_exact(&mut s.stream, 1).await;
    for p in 0..100u64 {
        s.stream.seek(p).unwrap();
        assert_eq!(s.stream.pos(), p, "seek({p}) should move pos to {p}");
    }
}

#[tokio::test]
async fn seek_then_read_from_each_chunk() {
    let mut s = setup(120, 40, true);
    read_exact(&mut s.stream, 1).await;
    for &p in &[0u64, 39, 40, 79, 80, 119] {
        s.stream.seek(p).unwrap();
        let out = read_exact(&mut s.stream, 1).await;
        assert_eq!(out[0], s.data[p as usize], "byte at offset {p}");
    }
}

#[tokio::test]
async fn seek_backwards_after_reading() {
    let mut s = setup(200, 40, true);
    read_exact(&mut s.stream, 150).await;
    s.stream.seek(10).unwrap();
    let out = read_exact(&mut s.stream, 50).await;
    assert_eq!(out, &s.data[10..60]);
}

#[tokio::test]
async fn seek_past_end_fails() {
    let mut s = setup(100, 40, true);
    read_exact(&mut s.stream, 1).await;
    for p in [100u64, 101, 1 << 40] {
        let err = s.stream.seek(p).unwrap_err();
        assert!(matches!(err, ClientError::EndOfStream { .. }), "seek({p})");
    }
}

#[tokio::test]
async fn seek_zero_on_empty_block_is_ok() {
    let mut s = setup(0, 40, true);
    read_exact(&mut s.stream, 1).await; // initializes, EOF
    s.stream.seek(0).unwrap();
    assert_eq!(s.stream.pos(), 0);
}

// ---------------------------------------------------------------
// Retry and pipeline refresh
// ---------------------------------------------------------------

#[tokio::test]
async fn get_block_storage_failure_refreshes_pipeline() {
    let s = setup(100, 40, true);
    s.net
        .get_block_failures
        .lock()
        .unwrap()
        .push_back(Fail::Storage(ContainerResult::ContainerNotOpen));

    // Refresher offers a pipeline with entirely different datanodes.
    let refresher = FixedRefresher::new(Some(pipeline_of(&["dn7:9859", "dn8:9859", "dn9:9859"])));
    let net = Arc::clone(&s.net);
    let factory = MockFactory::new(net);
    let mut stream = BlockReadStream::new(
        BlockId::new(1, 100),
        100,
        pipeline_of(&["dn1:9859", "dn2:9859", "dn3:9859"]),
        None,
        true,
        factory.clone() as Arc<dyn ClientFactory>,
        Some(refresher.clone() as Arc<dyn PipelineRefresher>),
        fast_policy(),
    );

    let mut buf = vec![0u8; 100];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 100);
    assert_eq!(buf, s.data.as_ref());
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    // One failed GetBlock, one successful retry.
    assert_eq!(s.net.get_block_calls.load(Ordering::SeqCst), 2);
    assert_eq!(stream.retry_count(), 0);
}

#[tokio::test]
async fn refresh_with_same_datanodes_propagates() {
    let original = pipeline_of(&["dn1:9859"]);
    let s = setup(100, 40, true);
    s.net
        .get_block_failures
        .lock()
        .unwrap()
        .push_back(Fail::Storage(ContainerResult::ContainerNotOpen));

    // Same node set (even same pipeline) is not worth adopting.
    let refresher = FixedRefresher::new(Some(original.clone()));
    let factory = MockFactory::new(Arc::clone(&s.net));
    let mut stream = BlockReadStream::new(
        BlockId::new(1, 100),
        100,
        original,
        None,
        true,
        factory as Arc<dyn ClientFactory>,
        Some(refresher as Arc<dyn PipelineRefresher>),
        fast_policy(),
    );

    let mut buf = vec![0u8; 100];
    let err = stream.read(&mut buf).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::StorageContainer {
            result: ContainerResult::ContainerNotOpen,
            ..
        }
    ));
}

#[tokio::test]
async fn storage_failure_without_refresher_propagates() {
    let mut s = setup(100, 40, true);
    s.net
        .get_block_failures
        .lock()
        .unwrap()
        .push_back(Fail::Storage(ContainerResult::ContainerNotOpen));

    let mut buf = vec![0u8; 100];
    let err = s.stream.read(&mut buf).await.unwrap_err();
    assert!(err.is_storage_container());
    assert_eq!(s.net.get_block_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transport_errors_retry_within_budget() {
    let mut s = setup(100, 40, true);
    {
        let mut failures = s.net.get_block_failures.lock().unwrap();
        failures.push_back(Fail::Transport);
        failures.push_back(Fail::Transport);
    }

    let out = read_exact(&mut s.stream, 100).await;
    assert_eq!(out, s.data.as_ref());
    assert_eq!(s.net.get_block_calls.load(Ordering::SeqCst), 3);
    // A successful fetch resets the counter.
    assert_eq!(s.stream.retry_count(), 0);
}

#[tokio::test]
async fn transport_errors_exhaust_budget() {
    let mut s = setup(100, 40, true);
    {
        let mut failures = s.net.get_block_failures.lock().unwrap();
        for _ in 0..5 {
            failures.push_back(Fail::Transport);
        }
    }

    let mut buf = vec![0u8; 100];
    let err = s.stream.read(&mut buf).await.unwrap_err();
    assert!(matches!(err, ClientError::RpcTransport(_)));
    // Initial attempt plus max_retries.
    assert_eq!(s.net.get_block_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn security_fault_is_never_retried() {
    let mut s = setup(100, 40, true);
    s.net
        .get_block_failures
        .lock()
        .unwrap()
        .push_back(Fail::Storage(ContainerResult::BlockTokenVerificationFailed));

    let mut buf = vec![0u8; 100];
    let err = s.stream.read(&mut buf).await.unwrap_err();
    assert!(err.is_security_fault());
    assert_eq!(s.net.get_block_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_retriable_result_is_never_retried() {
    let mut s = setup(100, 40, true);
    s.net
        .get_block_failures
        .lock()
        .unwrap()
        .push_back(Fail::Storage(ContainerResult::NotRetriable));

    let mut buf = vec![0u8; 100];
    let err = s.stream.read(&mut buf).await.unwrap_err();
    assert!(!err.is_retryable());
    assert_eq!(s.net.get_block_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn chunk_read_storage_failure_refreshes_mid_read() {
    let s = setup(100, 40, true);
    s.net
        .read_chunk_failures
        .lock()
        .unwrap()
        .push_back(Fail::Storage(ContainerResult::ContainerNotOpen));

    let refresher = FixedRefresher::new(Some(pipeline_of(&["dn7:9859"])));
    let factory = MockFactory::new(Arc::clone(&s.net));
    let mut stream = BlockReadStream::new(
        BlockId::new(1, 100),
        100,
        pipeline_of(&["dn1:9859"]),
        None,
        true,
        factory.clone() as Arc<dyn ClientFactory>,
        Some(refresher.clone() as Arc<dyn PipelineRefresher>),
        fast_policy(),
    );

    let mut buf = vec![0u8; 100];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 100);
    assert_eq!(buf, s.data.as_ref());
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    // handle_read_error released the block client and the chunk clients.
    assert!(factory.stats.releases.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn chunk_transport_failure_retries_same_pipeline() {
    let mut s = setup(100, 40, true);
    s.net
        .read_chunk_failures
        .lock()
        .unwrap()
        .push_back(Fail::Transport);

    let out = read_exact(&mut s.stream, 100).await;
    assert_eq!(out, s.data.as_ref());
}

// ---------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------

#[tokio::test]
async fn short_read_is_corruption_not_eof() {
    let mut s = setup(100, 40, false);
    // Read the first chunk cleanly, then serve a 5-byte reply for a
    // request that should have 20 more bytes.
    read_exact(&mut s.stream, 40).await;
    *s.net.short_read_once.lock().unwrap() = Some(5);

    let mut buf = vec![0u8; 20];
    let err = s.stream.read(&mut buf).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::InconsistentChunkRead {
            requested: 20,
            got: 5,
            ..
        }
    ));
}

#[tokio::test]
async fn checksum_mismatch_detected() {
    let s = setup(100, 40, true);
    // Corrupt the stored bytes after the checksums were computed.
    {
        let mut blocks = s.net.blocks.lock().unwrap();
        let (record, data) = blocks.get_mut(&BlockId::new(1, 100)).unwrap();
        let mut corrupted = data.to_vec();
        corrupted[50] ^= 0xff;
        *data = Bytes::from(corrupted);
        let _ = record;
    }

    let factory = MockFactory::new(Arc::clone(&s.net));
    let mut stream = BlockReadStream::new(
        BlockId::new(1, 100),
        100,
        pipeline_of(&["dn1:9859"]),
        None,
        true,
        factory as Arc<dyn ClientFactory>,
        None,
        fast_policy(),
    );

    let mut buf = vec![0u8; 100];
    let err = stream.read(&mut buf).await.unwrap_err();
    assert!(matches!(err, ClientError::ChecksumMismatch { .. }));
}

#[tokio::test]
async fn verification_off_accepts_corrupt_data() {
    let s = setup(100, 40, false);
    {
        let mut blocks = s.net.blocks.lock().unwrap();
        let (_, data) = blocks.get_mut(&BlockId::new(1, 100)).unwrap();
        let mut corrupted = data.to_vec();
        corrupted[50] ^= 0xff;
        *data = Bytes::from(corrupted);
    }

    let factory = MockFactory::new(Arc::clone(&s.net));
    let mut stream = BlockReadStream::new(
        BlockId::new(1, 100),
        100,
        pipeline_of(&["dn1:9859"]),
        None,
        false,
        factory as Arc<dyn ClientFactory>,
        None,
        fast_policy(),
    );

    let mut buf = vec![0u8; 100];
    assert_eq!(stream.read(&mut buf).await.unwrap(), 100);
}

// ---------------------------------------------------------------
// Unbuffer and close
// ---------------------------------------------------------------

#[tokio::test]
async fn unbuffer_then_read_resumes_at_saved_position() {
    let mut s = setup(200, 40, true);
    read_exact(&mut s.stream, 70).await;
    assert_eq!(s.stream.pos(), 70);

    s.stream.unbuffer().await;
    assert_eq!(s.stream.saved_block_position(), 70);
    assert!(s.factory.stats.releases.load(Ordering::SeqCst) >= 1);

    // The next read picks up exactly where a fresh read at 70 would.
    let out = read_exact(&mut s.stream, 1).await;
    assert_eq!(out[0], s.data[70]);
    assert_eq!(s.stream.pos(), 71);
}

#[tokio::test]
async fn close_is_idempotent_and_final() {
    let mut s = setup(100, 40, true);
    read_exact(&mut s.stream, 10).await;

    s.stream.close().await;
    s.stream.close().await;

    let mut buf = [0u8; 4];
    let err = s.stream.read(&mut buf).await.unwrap_err();
    assert!(matches!(err, ClientError::StreamClosed));
    let err = s.stream.seek(0).unwrap_err();
    assert!(matches!(err, ClientError::StreamClosed));
}

// ---------------------------------------------------------------
// Standalone-for-read
// ---------------------------------------------------------------

#[tokio::test]
async fn reads_always_acquire_standalone_pipelines() {
    let mut s = setup(100, 40, true);
    read_exact(&mut s.stream, 100).await;
    assert!(s.factory.stats.acquires.load(Ordering::SeqCst) >= 1);
    assert_eq!(s.factory.stats.non_standalone_acquires.load(Ordering::SeqCst), 0);
}
