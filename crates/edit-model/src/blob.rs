//! Revocable blob handles.
//!
//! Sources and captured artifacts are referenced through opaque handles
//! issued by a [`BlobStore`]. A handle stays valid until it is revoked;
//! every path that replaces a source or an artifact revokes the predecessor.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vidtrim_common::error::{VidtrimError, VidtrimResult};

const HANDLE_SCHEME: &str = "blob:vidtrim/";
const DIGEST_HEX_LEN: usize = 16;

/// Opaque, content-addressed reference to bytes held by a [`BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobHandle(String);

impl BlobHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The content digest embedded in the handle.
    pub fn digest(&self) -> &str {
        self.0
            .strip_prefix(HANDLE_SCHEME)
            .and_then(|rest| rest.split('-').next())
            .unwrap_or_default()
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a blob handle points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobData {
    /// Bytes held in memory.
    Memory { bytes: Vec<u8>, mime_type: String },
    /// A file on local disk; the bytes stay where they are.
    File { path: PathBuf },
}

/// Registry of live blob handles.
#[derive(Debug, Default)]
pub struct BlobStore {
    entries: HashMap<BlobHandle, BlobData>,
    next_seq: u64,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register in-memory bytes and return a fresh handle.
    pub fn insert_bytes(&mut self, bytes: Vec<u8>, mime_type: impl Into<String>) -> BlobHandle {
        let digest = blake3::hash(&bytes).to_hex();
        let handle = self.issue(&digest[..DIGEST_HEX_LEN]);
        tracing::debug!(%handle, len = bytes.len(), "Registered in-memory blob");
        self.entries.insert(
            handle.clone(),
            BlobData::Memory {
                bytes,
                mime_type: mime_type.into(),
            },
        );
        handle
    }

    /// Register a local file and return a fresh handle.
    pub fn insert_file(&mut self, path: &Path) -> VidtrimResult<BlobHandle> {
        if !path.is_file() {
            return Err(VidtrimError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let digest = blake3::hash(path.to_string_lossy().as_bytes()).to_hex();
        let handle = self.issue(&digest[..DIGEST_HEX_LEN]);
        tracing::debug!(%handle, path = %path.display(), "Registered file blob");
        self.entries.insert(
            handle.clone(),
            BlobData::File {
                path: path.to_path_buf(),
            },
        );
        Ok(handle)
    }

    /// Bytes of an in-memory blob.
    pub fn bytes(&self, handle: &BlobHandle) -> VidtrimResult<&[u8]> {
        match self.entries.get(handle) {
            Some(BlobData::Memory { bytes, .. }) => Ok(bytes),
            Some(BlobData::File { path }) => Err(VidtrimError::render(format!(
                "Blob {handle} is file-backed ({})",
                path.display()
            ))),
            None => Err(VidtrimError::UnknownBlob {
                handle: handle.to_string(),
            }),
        }
    }

    /// Release a handle. Returns whether it was live.
    pub fn revoke(&mut self, handle: &BlobHandle) -> bool {
        let removed = self.entries.remove(handle).is_some();
        if removed {
            tracing::debug!(%handle, "Revoked blob");
        }
        removed
    }

    pub fn contains(&self, handle: &BlobHandle) -> bool {
        self.entries.contains_key(handle)
    }

    /// Number of handles not yet revoked.
    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    fn issue(&mut self, digest: &str) -> BlobHandle {
        self.next_seq += 1;
        BlobHandle(format!("{HANDLE_SCHEME}{digest}-{}", self.next_seq))
    }
}
