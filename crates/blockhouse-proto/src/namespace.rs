//! Client <-> Namespace-Manager Wire Schema
//!
//! The namespace manager owns the volume/bucket/key namespace; this crate
//! only defines the wire messages the core must honor at that boundary (the
//! service itself lives elsewhere). Every exchange is one
//! [`NamespaceRequest`] / [`NamespaceResponse`] pair: the request names a
//! command type and carries at most one payload matching it, the response
//! echoes the type and carries a status code, an optional message, and the
//! matching payload.

use crate::common::{KeyValue, PipelineProto};
use crate::datanode::DatanodeBlockIdProto;

// ---------------------------------------------------------------------------
// Command and status enumerations
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CommandType {
    CreateVolume = 11,
    SetVolumeProperty = 12,
    CheckVolumeAccess = 13,
    InfoVolume = 14,
    DeleteVolume = 15,
    ListVolume = 16,

    CreateBucket = 21,
    InfoBucket = 22,
    SetBucketProperty = 23,
    DeleteBucket = 24,
    ListBuckets = 25,

    CreateKey = 31,
    LookupKey = 32,
    RenameKey = 33,
    DeleteKey = 34,
    ListKeys = 35,
    CommitKey = 36,
    AllocateBlock = 37,

    CreateDirectory = 41,
    CreateFile = 42,
    LookupFile = 43,
    ListStatus = 44,

    InitiateMultipartUpload = 51,
    CommitMultipartUploadPart = 52,
    CompleteMultipartUpload = 53,
    AbortMultipartUpload = 54,
    ListMultipartUploadParts = 55,
    ListMultipartUploads = 56,

    AddAcl = 61,
    RemoveAcl = 62,
    SetAcl = 63,
    GetAcl = 64,

    GetDelegationToken = 71,
    RenewDelegationToken = 72,
    CancelDelegationToken = 73,

    GetS3Secret = 81,
    RevokeS3Secret = 82,

    ServiceList = 91,
    DbUpdates = 92,

    Prepare = 101,
    CancelPrepare = 102,
    GetPrepareStatus = 103,
    FinalizeUpgrade = 104,
    FinalizeUpgradeProgress = 105,

    RecoverTrash = 111,
}

/// Status codes a namespace manager can return. `Ok` plus the error space
/// clients are expected to interpret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NamespaceStatus {
    Ok = 1,
    VolumeNotUnique = 2,
    VolumeNotFound = 3,
    VolumeNotEmpty = 4,
    VolumeAlreadyExists = 5,
    UserNotFound = 6,
    UserTooMany = 7,
    BucketNotFound = 8,
    BucketNotEmpty = 9,
    BucketAlreadyExists = 10,
    KeyAlreadyExists = 11,
    KeyNotFound = 12,
    InvalidKeyName = 13,
    AccessDenied = 14,
    InternalError = 15,
    KeyAllocationError = 16,
    KeyDeletionError = 17,
    KeyRenameError = 18,
    MetadataError = 19,
    NamespaceManagerNotInitialized = 20,
    StorageManagerVersionMismatch = 21,
    InitiateMultipartUploadError = 22,
    MultipartUploadPartfileError = 23,
    NoSuchMultipartUploadError = 24,
    MismatchMultipartList = 25,
    MissingUploadPartError = 26,
    EntityTooSmall = 27,
    AbortMultipartUploadFailed = 28,
    S3SecretNotFound = 29,
    InvalidAuthMethod = 30,
    InvalidToken = 31,
    TokenExpired = 32,
    TokenErrorOther = 33,
    ListMultipartUploadPartsFailed = 34,
    ScmInChillMode = 35,
    InvalidRequest = 36,
    BucketEncryptionKeyNotFound = 37,
    UnknownCipherSuite = 38,
    InvalidKmsProvider = 39,
    TokenCreationError = 40,
    FileNotFound = 41,
    DirectoryNotFound = 42,
    FileAlreadyExists = 43,
    NotAFile = 44,
    PermissionDenied = 45,
    Timeout = 46,
    PrefixNotFound = 47,
    DetectedLoopInBucketLinks = 48,
    CannotGetS3Secret = 49,
    QuotaExceeded = 50,
    DirectoryNotEmpty = 51,
    PersistDbFailed = 52,
    QuotaError = 53,
    FeatureNotEnabled = 54,
    NotSupportedOperation = 55,
    PartialRename = 56,
    RatisError = 57,
    InvalidPath = 58,
    InvalidPartOrder = 59,
    InvalidVolumeName = 60,
    InvalidBucketName = 61,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserInfo {
    #[prost(string, optional, tag = "1")]
    pub user_name: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "2")]
    pub remote_address: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "3")]
    pub host_name: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct S3Authentication {
    #[prost(string, required, tag = "1")]
    pub string_to_sign: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub signature: ::prost::alloc::string::String,
    #[prost(string, required, tag = "3")]
    pub access_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NamespaceRequest {
    #[prost(enumeration = "CommandType", required, tag = "1")]
    pub cmd_type: i32,
    #[prost(string, optional, tag = "2")]
    pub trace_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, required, tag = "3")]
    pub client_id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub user_info: ::core::option::Option<UserInfo>,
    #[prost(uint32, optional, tag = "5")]
    pub version: ::core::option::Option<u32>,
    #[prost(uint32, optional, tag = "6")]
    pub layout_version: ::core::option::Option<u32>,
    #[prost(message, optional, tag = "7")]
    pub s3_auth: ::core::option::Option<S3Authentication>,

    #[prost(message, optional, tag = "11")]
    pub create_volume: ::core::option::Option<CreateVolumeRequest>,
    #[prost(message, optional, tag = "14")]
    pub info_volume: ::core::option::Option<InfoVolumeRequest>,
    #[prost(message, optional, tag = "15")]
    pub delete_volume: ::core::option::Option<DeleteVolumeRequest>,
    #[prost(message, optional, tag = "21")]
    pub create_bucket: ::core::option::Option<CreateBucketRequest>,
    #[prost(message, optional, tag = "22")]
    pub info_bucket: ::core::option::Option<InfoBucketRequest>,
    #[prost(message, optional, tag = "31")]
    pub create_key: ::core::option::Option<CreateKeyRequest>,
    #[prost(message, optional, tag = "32")]
    pub lookup_key: ::core::option::Option<LookupKeyRequest>,
    #[prost(message, optional, tag = "36")]
    pub commit_key: ::core::option::Option<CommitKeyRequest>,
    #[prost(message, optional, tag = "37")]
    pub allocate_block: ::core::option::Option<AllocateBlockRequest>,
    #[prost(message, optional, tag = "51")]
    pub initiate_multipart_upload:
        ::core::option::Option<MultipartInfoInitiateRequest>,
    #[prost(message, optional, tag = "53")]
    pub complete_multipart_upload:
        ::core::option::Option<MultipartUploadCompleteRequest>,
    #[prost(message, optional, tag = "54")]
    pub abort_multipart_upload: ::core::option::Option<MultipartUploadAbortRequest>,
    #[prost(message, optional, tag = "61")]
    pub acl: ::core::option::Option<AclRequest>,
    #[prost(message, optional, tag = "71")]
    pub get_delegation_token: ::core::option::Option<GetDelegationTokenRequest>,
    #[prost(message, optional, tag = "81")]
    pub get_s3_secret: ::core::option::Option<GetS3SecretRequest>,
    #[prost(message, optional, tag = "91")]
    pub service_list: ::core::option::Option<ServiceListRequest>,
    #[prost(message, optional, tag = "92")]
    pub db_updates: ::core::option::Option<DbUpdatesRequest>,
    #[prost(message, optional, tag = "101")]
    pub prepare: ::core::option::Option<PrepareRequest>,
    #[prost(message, optional, tag = "111")]
    pub recover_trash: ::core::option::Option<RecoverTrashRequest>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NamespaceResponse {
    #[prost(enumeration = "CommandType", required, tag = "1")]
    pub cmd_type: i32,
    #[prost(string, optional, tag = "2")]
    pub trace_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "3", default = "true")]
    pub success: ::core::option::Option<bool>,
    #[prost(string, optional, tag = "4")]
    pub message: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(enumeration = "NamespaceStatus", required, tag = "5")]
    pub status: i32,
    #[prost(string, optional, tag = "6")]
    pub leader_node_id: ::core::option::Option<::prost::alloc::string::String>,

    #[prost(message, optional, tag = "14")]
    pub info_volume: ::core::option::Option<InfoVolumeResponse>,
    #[prost(message, optional, tag = "22")]
    pub info_bucket: ::core::option::Option<InfoBucketResponse>,
    #[prost(message, optional, tag = "31")]
    pub create_key: ::core::option::Option<CreateKeyResponse>,
    #[prost(message, optional, tag = "32")]
    pub lookup_key: ::core::option::Option<LookupKeyResponse>,
    #[prost(message, optional, tag = "37")]
    pub allocate_block: ::core::option::Option<AllocateBlockResponse>,
    #[prost(message, optional, tag = "51")]
    pub initiate_multipart_upload:
        ::core::option::Option<MultipartInfoInitiateResponse>,
    #[prost(message, optional, tag = "71")]
    pub get_delegation_token: ::core::option::Option<GetDelegationTokenResponse>,
    #[prost(message, optional, tag = "81")]
    pub get_s3_secret: ::core::option::Option<GetS3SecretResponse>,
    #[prost(message, optional, tag = "92")]
    pub db_updates: ::core::option::Option<DbUpdatesResponse>,
}

// ---------------------------------------------------------------------------
// Volume family
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VolumeInfo {
    #[prost(string, required, tag = "1")]
    pub admin_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub owner_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "3")]
    pub volume: ::prost::alloc::string::String,
    #[prost(uint64, optional, tag = "4")]
    pub quota_in_bytes: ::core::option::Option<u64>,
    #[prost(message, repeated, tag = "5")]
    pub metadata: ::prost::alloc::vec::Vec<KeyValue>,
    #[prost(uint64, optional, tag = "6")]
    pub creation_time: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "7")]
    pub modification_time: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateVolumeRequest {
    #[prost(message, required, tag = "1")]
    pub volume_info: VolumeInfo,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InfoVolumeRequest {
    #[prost(string, required, tag = "1")]
    pub volume_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InfoVolumeResponse {
    #[prost(message, optional, tag = "1")]
    pub volume_info: ::core::option::Option<VolumeInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteVolumeRequest {
    #[prost(string, required, tag = "1")]
    pub volume_name: ::prost::alloc::string::String,
}

// ---------------------------------------------------------------------------
// Bucket family
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BucketInfo {
    #[prost(string, required, tag = "1")]
    pub volume_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub bucket_name: ::prost::alloc::string::String,
    #[prost(bool, optional, tag = "3", default = "false")]
    pub is_version_enabled: ::core::option::Option<bool>,
    #[prost(message, repeated, tag = "4")]
    pub metadata: ::prost::alloc::vec::Vec<KeyValue>,
    #[prost(uint64, optional, tag = "5")]
    pub creation_time: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "6")]
    pub used_bytes: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateBucketRequest {
    #[prost(message, required, tag = "1")]
    pub bucket_info: BucketInfo,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InfoBucketRequest {
    #[prost(string, required, tag = "1")]
    pub volume_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub bucket_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InfoBucketResponse {
    #[prost(message, optional, tag = "1")]
    pub bucket_info: ::core::option::Option<BucketInfo>,
}

// ---------------------------------------------------------------------------
// Key family
// ---------------------------------------------------------------------------

/// Arguments naming a key plus the write/read parameters that travel with
/// every key operation.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyArgs {
    #[prost(string, required, tag = "1")]
    pub volume_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub bucket_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "3")]
    pub key_name: ::prost::alloc::string::String,
    #[prost(uint64, optional, tag = "4")]
    pub data_size: ::core::option::Option<u64>,
    #[prost(message, repeated, tag = "5")]
    pub key_locations: ::prost::alloc::vec::Vec<KeyLocation>,
    #[prost(bool, optional, tag = "6")]
    pub is_multipart_key: ::core::option::Option<bool>,
    #[prost(string, optional, tag = "7")]
    pub multipart_upload_id: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(uint32, optional, tag = "8")]
    pub multipart_upload_part_number: ::core::option::Option<u32>,
    #[prost(message, repeated, tag = "9")]
    pub metadata: ::prost::alloc::vec::Vec<KeyValue>,
}

/// One block of a key: where it lives and how to authenticate to read it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyLocation {
    #[prost(message, required, tag = "1")]
    pub block_id: DatanodeBlockIdProto,
    #[prost(message, required, tag = "2")]
    pub pipeline: PipelineProto,
    /// Offset of this block's data within the key.
    #[prost(uint64, required, tag = "3")]
    pub offset: u64,
    #[prost(uint64, required, tag = "4")]
    pub length: u64,
    #[prost(uint64, optional, tag = "5")]
    pub create_version: ::core::option::Option<u64>,
    /// Opaque bearer token for the block, when security is enabled.
    #[prost(bytes = "bytes", optional, tag = "6")]
    pub token: ::core::option::Option<::prost::bytes::Bytes>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyInfo {
    #[prost(string, required, tag = "1")]
    pub volume_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub bucket_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "3")]
    pub key_name: ::prost::alloc::string::String,
    #[prost(uint64, required, tag = "4")]
    pub data_size: u64,
    #[prost(message, repeated, tag = "5")]
    pub key_locations: ::prost::alloc::vec::Vec<KeyLocation>,
    #[prost(uint64, optional, tag = "6")]
    pub creation_time: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "7")]
    pub modification_time: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "8")]
    pub latest_version: ::core::option::Option<u64>,
    #[prost(message, repeated, tag = "9")]
    pub metadata: ::prost::alloc::vec::Vec<KeyValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateKeyRequest {
    #[prost(message, required, tag = "1")]
    pub key_args: KeyArgs,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateKeyResponse {
    #[prost(message, optional, tag = "1")]
    pub key_info: ::core::option::Option<KeyInfo>,
    /// Client id used for subsequent block allocations of this open key.
    #[prost(uint64, optional, tag = "2")]
    pub open_version: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupKeyRequest {
    #[prost(message, required, tag = "1")]
    pub key_args: KeyArgs,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LookupKeyResponse {
    #[prost(message, optional, tag = "1")]
    pub key_info: ::core::option::Option<KeyInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommitKeyRequest {
    #[prost(message, required, tag = "1")]
    pub key_args: KeyArgs,
    #[prost(uint64, required, tag = "2")]
    pub client_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AllocateBlockRequest {
    #[prost(message, required, tag = "1")]
    pub key_args: KeyArgs,
    #[prost(uint64, required, tag = "2")]
    pub client_id: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AllocateBlockResponse {
    #[prost(message, optional, tag = "1")]
    pub key_location: ::core::option::Option<KeyLocation>,
}

// ---------------------------------------------------------------------------
// Multipart family
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultipartInfoInitiateRequest {
    #[prost(message, required, tag = "1")]
    pub key_args: KeyArgs,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultipartInfoInitiateResponse {
    #[prost(string, required, tag = "1")]
    pub volume_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub bucket_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "3")]
    pub key_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "4")]
    pub multipart_upload_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultipartUploadCompleteRequest {
    #[prost(message, required, tag = "1")]
    pub key_args: KeyArgs,
    #[prost(message, repeated, tag = "2")]
    pub part_list: ::prost::alloc::vec::Vec<MultipartUploadPart>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultipartUploadPart {
    #[prost(uint32, required, tag = "1")]
    pub part_number: u32,
    #[prost(string, required, tag = "2")]
    pub part_name: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MultipartUploadAbortRequest {
    #[prost(message, required, tag = "1")]
    pub key_args: KeyArgs,
}

// ---------------------------------------------------------------------------
// ACL family
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AclRight {
    Read = 1,
    Write = 2,
    Create = 3,
    List = 4,
    Delete = 5,
    ReadAcl = 6,
    WriteAcl = 7,
    All = 8,
    None = 9,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AclInfo {
    #[prost(string, required, tag = "1")]
    pub acl_type: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "AclRight", repeated, tag = "3")]
    pub rights: ::prost::alloc::vec::Vec<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AclRequest {
    /// Path the ACL applies to (`/volume/bucket/key`).
    #[prost(string, required, tag = "1")]
    pub resource: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub acls: ::prost::alloc::vec::Vec<AclInfo>,
}

// ---------------------------------------------------------------------------
// Delegation token, S3 secret, service list, DB updates, prepare, trash
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDelegationTokenRequest {
    #[prost(string, required, tag = "1")]
    pub renewer: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDelegationTokenResponse {
    #[prost(bytes = "bytes", optional, tag = "1")]
    pub token: ::core::option::Option<::prost::bytes::Bytes>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetS3SecretRequest {
    #[prost(string, required, tag = "1")]
    pub kerberos_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetS3SecretResponse {
    #[prost(string, required, tag = "1")]
    pub kerberos_id: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub aws_secret: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServiceListRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DbUpdatesRequest {
    #[prost(uint64, required, tag = "1")]
    pub sequence_number: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DbUpdatesResponse {
    #[prost(uint64, required, tag = "1")]
    pub sequence_number: u64,
    #[prost(bytes = "bytes", repeated, tag = "2")]
    pub data: ::prost::alloc::vec::Vec<::prost::bytes::Bytes>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PrepareRequest {
    #[prost(uint64, optional, tag = "1")]
    pub txn_apply_wait_timeout_seconds: ::core::option::Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    pub txn_apply_check_interval_seconds: ::core::option::Option<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecoverTrashRequest {
    #[prost(string, required, tag = "1")]
    pub volume_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "2")]
    pub bucket_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "3")]
    pub key_name: ::prost::alloc::string::String,
    #[prost(string, required, tag = "4")]
    pub destination_bucket: ::prost::alloc::string::String,
}
