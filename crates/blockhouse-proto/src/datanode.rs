//! Client <-> Datanode Container Protocol
//!
//! Every exchange is one `ContainerCommandRequest` / `ContainerCommandResponse`
//! pair. The request names a command type and carries at most one payload
//! matching it; the response echoes the command type and carries a result
//! code plus the matching payload. The read path only ever issues `GetBlock`
//! (fetch the chunk list of a block) and `ReadChunk` (fetch a byte range of
//! one chunk).

use blockhouse_core::{BlockId, ChecksumAlgorithm, ChecksumData, ChunkInfo};
use bytes::Bytes;

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ContainerCommand {
    CreateContainer = 1,
    ReadContainer = 2,
    UpdateContainer = 3,
    DeleteContainer = 4,
    ListContainer = 5,
    CloseContainer = 6,
    PutBlock = 7,
    GetBlock = 8,
    DeleteBlock = 9,
    ListBlock = 10,
    ReadChunk = 11,
    WriteChunk = 12,
    DeleteChunk = 13,
    ListChunk = 14,
    CompactChunk = 15,
    GetSmallFile = 16,
    PutSmallFile = 17,
    GetCommittedBlockLength = 18,
}

/// Result codes a datanode can return. `Success` is 1 to match the proto2
/// schema this protocol is compatible with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ContainerResult {
    Success = 1,
    UnsupportedRequest = 2,
    MalformedRequest = 3,
    ContainerInternalError = 4,
    InvalidConfig = 5,
    InvalidFileHashFound = 6,
    ContainerExists = 7,
    NoSuchAlgorithm = 8,
    ContainerNotFound = 9,
    IoException = 10,
    UnableToReadMetadataDb = 11,
    NoSuchBlock = 12,
    OverwriteFlagRequired = 13,
    UnableToFindDataDir = 14,
    InvalidWriteSize = 15,
    ChecksumMismatch = 16,
    UnableToFindChunk = 17,
    ErrorInCompactDb = 18,
    UnclosedContainerIo = 19,
    DeleteOnOpenContainer = 20,
    CloseContainerError = 21,
    ErrorInContainerChecksum = 22,
    UnknownContainerType = 23,
    ContainerNotOpen = 24,
    ContainerMissing = 25,
    BlockTokenVerificationFailed = 26,
    ErrorInDbSync = 27,
    ChunkFileInconsistency = 28,
    DeleteOnNonEmptyContainer = 29,
    ExportContainerError = 30,
    ImportContainerError = 31,
    BlockNotCommitted = 32,
    ContainerUnhealthy = 33,
    UnknownBcsId = 34,
    BcsIdMismatch = 35,
    ContainerNotOpenToWrite = 36,
    InvalidContainerState = 37,
    DiskOutOfSpace = 38,
    ContainerAlreadyExists = 39,
    ContainerFilesCreateError = 40,
    ContainerChecksumError = 41,
    UnknownContainerState = 42,
    NotRetriable = 43,
}

impl ContainerResult {
    /// Whether a client read may transparently retry after seeing this
    /// result. Token failures and explicitly non-retriable results must
    /// surface to the caller.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ContainerResult::NotRetriable | ContainerResult::BlockTokenVerificationFailed
        )
    }
}

// ---------------------------------------------------------------------------
// Block and chunk payloads
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DatanodeBlockIdProto {
    #[prost(int64, required, tag = "1")]
    pub container_id: i64,
    #[prost(int64, required, tag = "2")]
    pub local_id: i64,
    #[prost(uint64, optional, tag = "3")]
    pub block_commit_sequence_id: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChecksumDataProto {
    #[prost(enumeration = "ChecksumTypeProto", required, tag = "1")]
    pub r#type: i32,
    #[prost(uint32, required, tag = "2")]
    pub bytes_per_checksum: u32,
    #[prost(bytes = "bytes", repeated, tag = "3")]
    pub checksums: ::prost::alloc::vec::Vec<::prost::bytes::Bytes>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChecksumTypeProto {
    None = 1,
    Crc32c = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChunkInfoProto {
    #[prost(string, required, tag = "1")]
    pub chunk_name: ::prost::alloc::string::String,
    #[prost(uint64, required, tag = "2")]
    pub offset: u64,
    #[prost(uint64, required, tag = "3")]
    pub len: u64,
    #[prost(message, optional, tag = "4")]
    pub checksum_data: ::core::option::Option<ChecksumDataProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockDataProto {
    #[prost(message, optional, tag = "1")]
    pub block_id: ::core::option::Option<DatanodeBlockIdProto>,
    #[prost(message, repeated, tag = "2")]
    pub metadata: ::prost::alloc::vec::Vec<crate::common::KeyValue>,
    #[prost(message, repeated, tag = "3")]
    pub chunks: ::prost::alloc::vec::Vec<ChunkInfoProto>,
    /// Total block length, the sum of the chunk lengths.
    #[prost(uint64, optional, tag = "4")]
    pub size: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBlockRequestProto {
    #[prost(message, required, tag = "1")]
    pub block_id: DatanodeBlockIdProto,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBlockResponseProto {
    #[prost(message, required, tag = "1")]
    pub block_data: BlockDataProto,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadChunkRequestProto {
    #[prost(message, required, tag = "1")]
    pub block_id: DatanodeBlockIdProto,
    #[prost(message, required, tag = "2")]
    pub chunk_data: ChunkInfoProto,
    /// Byte range within the chunk; absent means the whole chunk.
    #[prost(uint64, optional, tag = "3")]
    pub read_offset: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "4")]
    pub read_len: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadChunkResponseProto {
    #[prost(message, required, tag = "1")]
    pub block_id: DatanodeBlockIdProto,
    #[prost(message, required, tag = "2")]
    pub chunk_data: ChunkInfoProto,
    #[prost(bytes = "bytes", required, tag = "3")]
    pub data: ::prost::bytes::Bytes,
}

// ---------------------------------------------------------------------------
// Command envelope
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContainerCommandRequest {
    #[prost(enumeration = "ContainerCommand", required, tag = "1")]
    pub cmd_type: i32,
    #[prost(int64, required, tag = "2")]
    pub container_id: i64,
    #[prost(string, required, tag = "3")]
    pub datanode_uuid: ::prost::alloc::string::String,
    #[prost(string, optional, tag = "4")]
    pub trace_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bytes = "bytes", optional, tag = "5")]
    pub encoded_token: ::core::option::Option<::prost::bytes::Bytes>,
    #[prost(message, optional, tag = "6")]
    pub get_block: ::core::option::Option<GetBlockRequestProto>,
    #[prost(message, optional, tag = "7")]
    pub read_chunk: ::core::option::Option<ReadChunkRequestProto>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContainerCommandResponse {
    #[prost(enumeration = "ContainerCommand", required, tag = "1")]
    pub cmd_type: i32,
    #[prost(string, optional, tag = "2")]
    pub trace_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(enumeration = "ContainerResult", required, tag = "3")]
    pub result: i32,
    #[prost(string, optional, tag = "4")]
    pub message: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "5")]
    pub get_block: ::core::option::Option<GetBlockResponseProto>,
    #[prost(message, optional, tag = "6")]
    pub read_chunk: ::core::option::Option<ReadChunkResponseProto>,
}

// ---------------------------------------------------------------------------
// Model conversions
// ---------------------------------------------------------------------------

impl From<BlockId> for DatanodeBlockIdProto {
    fn from(id: BlockId) -> Self {
        Self {
            container_id: id.container_id as i64,
            local_id: id.local_id as i64,
            block_commit_sequence_id: None,
        }
    }
}

impl DatanodeBlockIdProto {
    pub fn to_block_id(&self) -> BlockId {
        BlockId::new(self.container_id as u64, self.local_id as u64)
    }
}

impl From<&ChecksumData> for ChecksumDataProto {
    fn from(cd: &ChecksumData) -> Self {
        let r#type = match cd.algorithm {
            ChecksumAlgorithm::None => ChecksumTypeProto::None,
            ChecksumAlgorithm::Crc32c => ChecksumTypeProto::Crc32c,
        };
        Self {
            r#type: r#type as i32,
            bytes_per_checksum: cd.bytes_per_checksum,
            checksums: cd.checksums.clone(),
        }
    }
}

impl ChecksumDataProto {
    pub fn to_checksum_data(&self) -> ChecksumData {
        let algorithm = match ChecksumTypeProto::try_from(self.r#type) {
            Ok(ChecksumTypeProto::Crc32c) => ChecksumAlgorithm::Crc32c,
            _ => ChecksumAlgorithm::None,
        };
        ChecksumData {
            algorithm,
            bytes_per_checksum: self.bytes_per_checksum,
            checksums: self.checksums.iter().map(|b| Bytes::clone(b)).collect(),
        }
    }
}

impl From<&ChunkInfo> for ChunkInfoProto {
    fn from(c: &ChunkInfo) -> Self {
        Self {
            chunk_name: c.chunk_name.clone(),
            offset: c.offset,
            len: c.len,
            checksum_data: Some(ChecksumDataProto::from(&c.checksum_data)),
        }
    }
}

impl ChunkInfoProto {
    pub fn to_chunk_info(&self) -> ChunkInfo {
        ChunkInfo {
            chunk_name: self.chunk_name.clone(),
            offset: self.offset,
            len: self.len,
            checksum_data: self
                .checksum_data
                .as_ref()
                .map(|cd| cd.to_checksum_data())
                .unwrap_or_default(),
        }
    }
}
