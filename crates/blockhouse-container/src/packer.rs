//! Container Packer
//!
//! Turns a (quasi-)closed container into a single tar stream and back. The
//! archive layout is deterministic:
//!
//! ```text
//! chunks/...                 # chunk files
//! store/...                  # embedded store files
//! <container-id>.container   # descriptor, always last
//! ```
//!
//! `unpack` returns the descriptor bytes wherever they appear in the
//! stream rather than assuming a position, so archives produced by other
//! implementations (or older versions that ordered entries differently)
//! import cleanly. The descriptor is *not* written to disk during unpack;
//! the importing container rewrites a local descriptor with a fresh
//! self-checksum after overlaying its own paths.

use std::path::Path;

use bytes::Bytes;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_tar::{Archive, Builder};
use tracing::debug;

use crate::error::{ContainerError, Result};
use crate::layout::ContainerPaths;

const CHUNKS_ENTRY: &str = "chunks";
const STORE_ENTRY: &str = "store";

#[derive(Debug, Default)]
pub struct TarContainerPacker;

impl TarContainerPacker {
    pub fn new() -> Self {
        Self
    }

    fn descriptor_entry_name(paths: &ContainerPaths) -> Result<String> {
        paths
            .descriptor_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ContainerError::Internal("descriptor path has no file name".into()))
    }

    /// Stream the container's chunks, store, and descriptor into `out`.
    pub async fn pack<W>(&self, paths: &ContainerPaths, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut builder = Builder::new_non_terminated(out);
        builder
            .append_dir_all(CHUNKS_ENTRY, &paths.chunks_dir)
            .await?;
        builder.append_dir_all(STORE_ENTRY, &paths.store_dir).await?;
        builder
            .append_path_with_name(&paths.descriptor_file, Self::descriptor_entry_name(paths)?)
            .await?;
        builder.finish().await?;
        Ok(())
    }

    /// Extract chunks and store files into the container's local paths and
    /// return the descriptor bytes found in the stream.
    pub async fn unpack<R>(&self, paths: &ContainerPaths, input: &mut R) -> Result<Bytes>
    where
        R: AsyncRead + Unpin + Send,
    {
        tokio::fs::create_dir_all(&paths.chunks_dir).await?;
        tokio::fs::create_dir_all(&paths.store_dir).await?;

        let descriptor_name = Self::descriptor_entry_name(paths)?;
        let mut descriptor_bytes: Option<Bytes> = None;

        let mut archive = Archive::new(input);
        let mut entries = archive.entries()?;
        while let Some(entry) = entries.next().await {
            let mut entry = entry?;
            let path = entry.path()?.into_owned();
            if !is_safe_relative(&path) {
                return Err(ContainerError::Internal(format!(
                    "archive entry escapes the container tree: {}",
                    path.display()
                )));
            }

            if path.as_os_str() == descriptor_name.as_str() {
                let mut raw = Vec::new();
                entry.read_to_end(&mut raw).await?;
                descriptor_bytes = Some(Bytes::from(raw));
                continue;
            }

            let target = if let Ok(rest) = path.strip_prefix(CHUNKS_ENTRY) {
                paths.chunks_dir.join(rest)
            } else if let Ok(rest) = path.strip_prefix(STORE_ENTRY) {
                paths.store_dir.join(rest)
            } else {
                debug!(entry = %path.display(), "skipping unknown archive entry");
                continue;
            };

            if entry.header().entry_type().is_dir() {
                tokio::fs::create_dir_all(&target).await?;
                continue;
            }
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            entry.unpack(&target).await?;
        }

        descriptor_bytes.ok_or_else(|| {
            ContainerError::MissingDescriptor(container_id_of(paths).unwrap_or_default())
        })
    }
}

fn is_safe_relative(path: &Path) -> bool {
    use std::path::Component;
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn container_id_of(paths: &ContainerPaths) -> Option<u64> {
    paths
        .root
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.parse().ok())
}
