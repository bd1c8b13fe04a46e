//! On-Disk Container Layout
//!
//! Everything a container owns lives under one directory on one volume:
//!
//! ```text
//! <volume-root>/<cluster-or-scm-id>/<container-id>/
//!   metadata/
//!     <container-id>.container            # descriptor
//!     <container-id>-dn-container.db/     # embedded store
//!   chunks/
//!     <block-local-id>_chunk_<n>          # chunk files
//! ```
//!
//! These are pure path computations; nothing here touches the filesystem.
//! Temp files are always created next to their target so the final rename
//! stays on one filesystem and therefore atomic.

use std::path::{Path, PathBuf};

/// Extension of the descriptor file.
pub const DESCRIPTOR_EXTENSION: &str = ".container";

/// Suffix of the embedded store directory.
pub const STORE_DIR_SUFFIX: &str = "-dn-container.db";

pub const METADATA_DIR: &str = "metadata";
pub const CHUNKS_DIR: &str = "chunks";

pub fn container_root(volume_root: &Path, id_dir: &str, container_id: u64) -> PathBuf {
    volume_root.join(id_dir).join(container_id.to_string())
}

pub fn metadata_dir(volume_root: &Path, id_dir: &str, container_id: u64) -> PathBuf {
    container_root(volume_root, id_dir, container_id).join(METADATA_DIR)
}

pub fn chunks_dir(volume_root: &Path, id_dir: &str, container_id: u64) -> PathBuf {
    container_root(volume_root, id_dir, container_id).join(CHUNKS_DIR)
}

pub fn descriptor_file(metadata_dir: &Path, container_id: u64) -> PathBuf {
    metadata_dir.join(format!("{container_id}{DESCRIPTOR_EXTENSION}"))
}

pub fn store_dir(metadata_dir: &Path, container_id: u64) -> PathBuf {
    metadata_dir.join(format!("{container_id}{STORE_DIR_SUFFIX}"))
}

pub fn chunk_file(chunks_dir: &Path, block_local_id: u64, chunk_index: u32) -> PathBuf {
    chunks_dir.join(format!("{block_local_id}_chunk_{chunk_index}"))
}

/// The full set of paths one container occupies, computed once at
/// create/import time and carried with the container data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPaths {
    pub root: PathBuf,
    pub metadata_dir: PathBuf,
    pub chunks_dir: PathBuf,
    pub descriptor_file: PathBuf,
    pub store_dir: PathBuf,
}

impl ContainerPaths {
    pub fn build(volume_root: &Path, id_dir: &str, container_id: u64) -> Self {
        let root = container_root(volume_root, id_dir, container_id);
        let metadata = root.join(METADATA_DIR);
        Self {
            chunks_dir: root.join(CHUNKS_DIR),
            descriptor_file: descriptor_file(&metadata, container_id),
            store_dir: store_dir(&metadata, container_id),
            metadata_dir: metadata,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_one_root() {
        let paths = ContainerPaths::build(Path::new("/data/vol1"), "cluster-a", 42);
        assert_eq!(paths.root, Path::new("/data/vol1/cluster-a/42"));
        assert_eq!(paths.metadata_dir, Path::new("/data/vol1/cluster-a/42/metadata"));
        assert_eq!(paths.chunks_dir, Path::new("/data/vol1/cluster-a/42/chunks"));
        assert_eq!(
            paths.descriptor_file,
            Path::new("/data/vol1/cluster-a/42/metadata/42.container")
        );
        assert_eq!(
            paths.store_dir,
            Path::new("/data/vol1/cluster-a/42/metadata/42-dn-container.db")
        );
    }

    #[test]
    fn test_chunk_file_name() {
        let f = chunk_file(Path::new("/data/vol1/c/42/chunks"), 1001, 3);
        assert_eq!(f, Path::new("/data/vol1/c/42/chunks/1001_chunk_3"));
    }

    #[test]
    fn test_descriptor_next_to_store() {
        // The temp-and-rename discipline depends on descriptor and temp file
        // sharing a parent.
        let md = metadata_dir(Path::new("/v"), "c", 7);
        let desc = descriptor_file(&md, 7);
        assert_eq!(desc.parent().unwrap(), md.as_path());
    }
}
