//! Replica Pipeline Client Pool
//!
//! [`ClientFactory`] hands out [`ReplicaClient`]s for a pipeline and takes
//! them back when a read session is done with them. The production
//! implementation, [`ClientPool`], keeps one gRPC channel per datanode
//! address and shares it across read sessions; releasing with
//! `invalidate = true` drops the pooled channel so the next acquisition
//! dials fresh (used after a failed in-flight RPC whose connection state is
//! suspect).
//!
//! Reads are always performed over the standalone variant of the pipeline
//! ([`Pipeline::for_read`]) regardless of the replication strength the
//! container was written with: immutable committed data needs no
//! coordination to read.
//!
//! ## Thread Safety
//!
//! `ClientPool` is `Send + Sync` and shared via `Arc`; the inner map is
//! behind a `tokio::sync::RwLock`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, warn};

use blockhouse_core::Pipeline;
use blockhouse_proto::datanode::{ContainerCommandRequest, ContainerCommandResponse};

use crate::error::{ClientError, Result};

/// One client connected to a replica, able to submit typed container
/// commands. Implementations must be cheap to clone behind an `Arc`.
#[async_trait]
pub trait ReplicaClient: Send + Sync {
    /// Submit a request and wait for the response.
    async fn send(&self, request: ContainerCommandRequest) -> Result<ContainerCommandResponse>;

    /// The datanode address this client talks to.
    fn address(&self) -> &str;
}

/// Acquires and releases replica clients for a pipeline.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Acquire a client suitable for reading from `pipeline`. The client
    /// targets the standalone read variant of the pipeline.
    async fn acquire_read_client(&self, pipeline: &Pipeline) -> Result<Arc<dyn ReplicaClient>>;

    /// Return a client. `invalidate` drops any pooled connection state so
    /// the next acquisition dials fresh.
    async fn release_read_client(&self, client: Arc<dyn ReplicaClient>, invalidate: bool);
}

// ---------------------------------------------------------------------------
// gRPC-backed implementation
// ---------------------------------------------------------------------------

/// A [`ReplicaClient`] over one tonic channel.
pub struct GrpcReplicaClient {
    address: String,
    channel: Channel,
}

impl GrpcReplicaClient {
    pub async fn connect(address: &str) -> Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{address}"))
            .map_err(|e| ClientError::RpcTransport(e.to_string()))?;
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientError::RpcTransport(e.to_string()))?;
        Ok(Self {
            address: address.to_string(),
            channel,
        })
    }
}

#[async_trait]
impl ReplicaClient for GrpcReplicaClient {
    async fn send(&self, request: ContainerCommandRequest) -> Result<ContainerCommandResponse> {
        let mut grpc = tonic::client::Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| ClientError::RpcTransport(e.to_string()))?;
        let codec: tonic::codec::ProstCodec<ContainerCommandRequest, ContainerCommandResponse> =
            tonic::codec::ProstCodec::default();
        let path = tonic::codegen::http::uri::PathAndQuery::from_static(
            "/blockhouse.datanode.ContainerService/Send",
        );
        let response = grpc
            .unary(tonic::Request::new(request), path, codec)
            .await
            .map_err(|status| ClientError::RpcTransport(status.to_string()))?;
        Ok(response.into_inner())
    }

    fn address(&self) -> &str {
        &self.address
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Pool of replica clients keyed by datanode address.
#[derive(Default)]
pub struct ClientPool {
    clients: tokio::sync::RwLock<HashMap<String, Arc<GrpcReplicaClient>>>,
}

impl ClientPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ClientFactory for ClientPool {
    async fn acquire_read_client(&self, pipeline: &Pipeline) -> Result<Arc<dyn ReplicaClient>> {
        let read_pipeline = pipeline.for_read();
        let node = read_pipeline.first_node().ok_or_else(|| {
            ClientError::Internal(format!("pipeline {} has no datanodes", read_pipeline.id))
        })?;

        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(&node.address) {
                return Ok(Arc::clone(client) as Arc<dyn ReplicaClient>);
            }
        }

        let mut clients = self.clients.write().await;
        // Double-checked: another task may have connected while we waited
        // for the write half.
        if let Some(client) = clients.get(&node.address) {
            return Ok(Arc::clone(client) as Arc<dyn ReplicaClient>);
        }
        debug!(address = %node.address, pipeline = %read_pipeline.id, "dialing replica");
        let client = Arc::new(GrpcReplicaClient::connect(&node.address).await?);
        clients.insert(node.address.clone(), Arc::clone(&client));
        Ok(client as Arc<dyn ReplicaClient>)
    }

    async fn release_read_client(&self, client: Arc<dyn ReplicaClient>, invalidate: bool) {
        if invalidate {
            let mut clients = self.clients.write().await;
            if clients.remove(client.address()).is_some() {
                warn!(address = %client.address(), "invalidated pooled replica client");
            }
        }
    }
}
