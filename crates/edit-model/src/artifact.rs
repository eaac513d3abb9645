//! Captured export artifacts.

use serde::{Deserialize, Serialize};

use crate::blob::{BlobHandle, BlobStore};
use crate::filter::FilterState;
use crate::window::TrimWindow;

/// Metadata of a finished export. The encoded bytes live in the
/// [`BlobStore`] under `handle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedArtifact {
    /// Handle of the encoded bytes.
    pub handle: BlobHandle,

    /// Container MIME type (e.g. `video/webm`).
    pub mime_type: String,

    /// Window that was requested.
    pub window: TrimWindow,

    /// Filters that were composited while recording.
    pub filter: FilterState,

    /// Play length actually recorded (seconds).
    pub recorded_secs: f64,

    /// Number of encoded chunks concatenated into the artifact.
    pub chunk_count: usize,

    /// Total encoded size in bytes.
    pub byte_len: usize,

    /// Completion timestamp (RFC 3339).
    pub created_at: String,
}

/// The single artifact slot of a session.
///
/// Replacing or clearing the slot revokes the previous artifact's blob.
#[derive(Debug, Default)]
pub struct ArtifactSlot {
    current: Option<CapturedArtifact>,
}

impl ArtifactSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&CapturedArtifact> {
        self.current.as_ref()
    }

    /// Store `artifact`, revoking whatever was there before.
    pub fn replace(&mut self, artifact: CapturedArtifact, blobs: &mut BlobStore) {
        if let Some(previous) = self.current.take() {
            blobs.revoke(&previous.handle);
            tracing::info!(handle = %previous.handle, "Released previous artifact");
        }
        self.current = Some(artifact);
    }

    /// Drop the current artifact and revoke its blob.
    pub fn clear(&mut self, blobs: &mut BlobStore) {
        if let Some(previous) = self.current.take() {
            blobs.revoke(&previous.handle);
        }
    }
}

impl CapturedArtifact {
    /// Build artifact metadata for bytes already registered under `handle`.
    pub fn new(
        handle: BlobHandle,
        mime_type: impl Into<String>,
        window: TrimWindow,
        filter: FilterState,
        recorded_secs: f64,
        chunk_count: usize,
        byte_len: usize,
    ) -> Self {
        Self {
            handle,
            mime_type: mime_type.into(),
            window,
            filter,
            recorded_secs,
            chunk_count,
            byte_len,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
