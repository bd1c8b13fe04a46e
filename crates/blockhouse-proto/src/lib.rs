//! Blockhouse Wire Message Definitions
//!
//! This crate contains the protobuf message types for communication between
//! Blockhouse components:
//!
//! - **common**: pipeline and datanode descriptions shared by both protocols
//! - **datanode**: the client <-> datanode container protocol
//!   (`GetBlock`, `ReadChunk`, the container command envelope and its
//!   result codes)
//! - **namespace**: the client <-> namespace-manager request/response
//!   envelope (volumes, buckets, keys, multipart uploads, ACLs, delegation
//!   tokens) honored at the system boundary
//!
//! The wire format is protocol-buffers v2 for compatibility with existing
//! deployments. The structs carry hand-written `prost` derives instead of a
//! `build.rs` codegen step, so building the workspace never needs `protoc`;
//! the encoded bytes are identical either way.

pub mod common;
pub mod datanode;
pub mod namespace;
