//! Artifact download: persist a captured artifact to disk.

use std::path::{Path, PathBuf};

use vidtrim_common::error::{VidtrimError, VidtrimResult};
use vidtrim_edit_model::artifact::CapturedArtifact;
use vidtrim_edit_model::blob::BlobStore;

/// Where and how to persist an artifact.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    /// Target directory.
    pub output_dir: PathBuf,

    /// File name inside `output_dir`.
    pub filename: String,

    /// Also write a `<filename>.json` sidecar with the artifact metadata.
    pub write_metadata: bool,
}

impl SaveRequest {
    pub fn new(output_dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            filename: filename.into(),
            write_metadata: false,
        }
    }

    pub fn target_path(&self) -> PathBuf {
        self.output_dir.join(&self.filename)
    }
}

/// Write the artifact's bytes to `request.target_path()`.
///
/// The artifact must still be live in `blobs`; a revoked handle yields
/// `VidtrimError::UnknownBlob`.
pub async fn save_artifact(
    artifact: &CapturedArtifact,
    blobs: &BlobStore,
    request: &SaveRequest,
) -> VidtrimResult<PathBuf> {
    validate_filename(&request.filename)?;
    let bytes = blobs.bytes(&artifact.handle)?;
    let target = request.target_path();

    tracing::info!(
        handle = %artifact.handle,
        output = %target.display(),
        bytes = bytes.len(),
        "Saving artifact"
    );

    tokio::fs::create_dir_all(&request.output_dir).await?;
    tokio::fs::write(&target, bytes).await?;

    if request.write_metadata {
        let sidecar = sidecar_path(&target);
        let json = serde_json::to_string_pretty(artifact)?;
        tokio::fs::write(&sidecar, json).await?;
        tracing::debug!(sidecar = %sidecar.display(), "Wrote artifact metadata");
    }

    Ok(target)
}

fn validate_filename(filename: &str) -> VidtrimResult<()> {
    let path = Path::new(filename);
    let plain = path.components().count() == 1 && path.file_name().is_some();
    if filename.trim().is_empty() || !plain {
        return Err(VidtrimError::render(format!(
            "Invalid artifact filename: {filename:?}"
        )));
    }
    Ok(())
}

fn sidecar_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".json");
    target.with_file_name(name)
}
