//! Typed Container Protocol Calls
//!
//! Thin helpers mapping typed operations onto the container command
//! envelope and the response results back onto typed errors: a non-SUCCESS
//! result becomes [`ClientError::StorageContainer`] (except token
//! verification failures, which are [`ClientError::SecurityFault`] and are
//! never retried).

use bytes::Bytes;

use blockhouse_core::{BlockId, BlockToken, ChunkInfo};
use blockhouse_proto::datanode::{
    BlockDataProto, ChunkInfoProto, ContainerCommand, ContainerCommandRequest,
    ContainerCommandResponse, ContainerResult, DatanodeBlockIdProto, GetBlockRequestProto,
    ReadChunkRequestProto,
};

use crate::client_pool::ReplicaClient;
use crate::error::{ClientError, Result};

fn check_response(response: ContainerCommandResponse) -> Result<ContainerCommandResponse> {
    let result = ContainerResult::try_from(response.result)
        .unwrap_or(ContainerResult::ContainerInternalError);
    if result == ContainerResult::Success {
        return Ok(response);
    }
    let message = response.message.clone().unwrap_or_default();
    if result == ContainerResult::BlockTokenVerificationFailed {
        return Err(ClientError::SecurityFault(message));
    }
    Err(ClientError::StorageContainer { result, message })
}

fn request_base(
    cmd_type: ContainerCommand,
    container_id: u64,
    datanode_uuid: String,
    token: Option<&BlockToken>,
) -> ContainerCommandRequest {
    ContainerCommandRequest {
        cmd_type: cmd_type as i32,
        container_id: container_id as i64,
        datanode_uuid,
        trace_id: None,
        encoded_token: token.map(|t| t.as_bytes().clone()),
        get_block: None,
        read_chunk: None,
    }
}

/// Fetch the block record (the ordered chunk list) for `block_id`.
pub async fn get_block(
    client: &dyn ReplicaClient,
    block_id: BlockId,
    token: Option<&BlockToken>,
) -> Result<BlockDataProto> {
    let mut request = request_base(
        ContainerCommand::GetBlock,
        block_id.container_id,
        client.address().to_string(),
        token,
    );
    request.get_block = Some(GetBlockRequestProto {
        block_id: DatanodeBlockIdProto::from(block_id),
    });

    let response = check_response(client.send(request).await?)?;
    response
        .get_block
        .map(|r| r.block_data)
        .ok_or_else(|| ClientError::Internal("GetBlock response carried no block data".into()))
}

/// Fetch `[offset, offset + len)` of one chunk.
pub async fn read_chunk(
    client: &dyn ReplicaClient,
    block_id: BlockId,
    chunk: &ChunkInfo,
    offset: u64,
    len: u64,
    token: Option<&BlockToken>,
) -> Result<Bytes> {
    let mut request = request_base(
        ContainerCommand::ReadChunk,
        block_id.container_id,
        client.address().to_string(),
        token,
    );
    request.read_chunk = Some(ReadChunkRequestProto {
        block_id: DatanodeBlockIdProto::from(block_id),
        chunk_data: ChunkInfoProto::from(chunk),
        read_offset: Some(offset),
        read_len: Some(len),
    });

    let response = check_response(client.send(request).await?)?;
    response
        .read_chunk
        .map(|r| r.data)
        .ok_or_else(|| ClientError::Internal("ReadChunk response carried no data".into()))
}
