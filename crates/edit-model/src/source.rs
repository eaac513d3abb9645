//! Loaded video source.

use std::path::{Path, PathBuf};

use crate::blob::BlobHandle;

/// An opaque reference to decodable video content.
///
/// A source never changes once created. Selecting a new file creates a new
/// `Source` and the session revokes the old one's blob handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    handle: BlobHandle,
    path: PathBuf,
}

impl Source {
    pub fn new(handle: BlobHandle, path: impl Into<PathBuf>) -> Self {
        Self {
            handle,
            path: path.into(),
        }
    }

    pub fn handle(&self) -> &BlobHandle {
        &self.handle
    }

    /// Local file backing the byte stream.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short name for logs.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.handle.to_string())
    }
}
