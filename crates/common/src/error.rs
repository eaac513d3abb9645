//! Error types shared across vidtrim crates.

use std::path::PathBuf;

/// Top-level error type for vidtrim operations.
#[derive(Debug, thiserror::Error)]
pub enum VidtrimError {
    /// The host cannot open a live capture on the rendering surface.
    #[error("Capture unavailable: {message}")]
    CaptureUnavailable { message: String },

    #[error("Invalid trim window: start {start:.3}s, end {end:.3}s")]
    InvalidWindow { start: f64, end: f64 },

    #[error("An export is already in progress ({state})")]
    ExportBusy { state: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unknown blob handle: {handle}")]
    UnknownBlob { handle: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using VidtrimError.
pub type VidtrimResult<T> = Result<T, VidtrimError>;

impl VidtrimError {
    pub fn capture_unavailable(msg: impl Into<String>) -> Self {
        Self::CaptureUnavailable {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn busy(state: impl std::fmt::Debug) -> Self {
        Self::ExportBusy {
            state: format!("{state:?}"),
        }
    }

    /// Whether this error means the export attempt never left `Idle`.
    pub fn is_capture_unavailable(&self) -> bool {
        matches!(self, Self::CaptureUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_error_names_the_state() {
        #[derive(Debug)]
        #[allow(dead_code)]
        enum State {
            Recording,
        }
        let err = VidtrimError::busy(State::Recording);
        assert_eq!(
            err.to_string(),
            "An export is already in progress (Recording)"
        );
    }

    #[test]
    fn invalid_window_formats_bounds() {
        let err = VidtrimError::InvalidWindow {
            start: 5.0,
            end: 5.0,
        };
        assert!(err.to_string().contains("start 5.000s, end 5.000s"));
    }
}
