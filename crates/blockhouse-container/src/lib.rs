//! Datanode-Side Container Engine
//!
//! A *container* is the unit of replicated storage on a datanode: a
//! directory tree holding many blocks' chunk files, an embedded RocksDB
//! store with the block records, and a self-describing descriptor file.
//! Containers move through a persisted state machine
//! (OPEN -> CLOSING -> QUASI_CLOSED/CLOSED -> DELETED, with UNHEALTHY as a
//! sticky escape hatch), and every mutation rewrites the descriptor
//! atomically so a crash can never leave a half-written descriptor behind.
//!
//! Module map:
//! - [`layout`] computes every on-disk path from `(volume, id dir, id)`
//! - [`descriptor`] is the persisted attribute document with a CRC-32C
//!   self-checksum and the atomic temp-file-then-rename writer
//! - [`container`] is the state machine itself, one RwLock per container
//! - [`store`] wraps the embedded RocksDB store and its shared
//!   reference-counted handle cache
//! - [`volume`] tracks the storage volumes containers are placed on
//! - [`packer`] turns a closed container into a single archive stream and
//!   back

pub mod container;
pub mod descriptor;
pub mod error;
pub mod layout;
pub mod packer;
pub mod store;
pub mod volume;

pub use container::{ContainerReport, KeyValueContainer};
pub use descriptor::{ContainerDescriptor, ContainerState, SchemaVersion};
pub use error::{ContainerError, Result};
pub use packer::TarContainerPacker;
pub use store::{BlockStore, StoreCache, StoreHandle};
pub use volume::{Volume, VolumeSet};
