//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{VidtrimError, VidtrimResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Event-loop and scrubber timing.
    pub playback: PlaybackDefaults,

    /// Export defaults.
    pub export: ExportDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Timing parameters for the playback loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackDefaults {
    /// Interval between scrubber ticks (ms).
    pub tick_interval_ms: u64,

    /// Interval between boundary-watch evaluations (ms). Kept below 200ms.
    pub boundary_poll_interval_ms: u64,

    /// A pending drag is considered settled once the clock reports a time
    /// within this distance of the seek target (seconds).
    pub seek_settle_tolerance_secs: f64,

    /// Upper bound on tick samples suppressed after a drag.
    pub seek_settle_max_ticks: u32,
}

/// Export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Length of the window derived from a scrub position (seconds).
    pub default_window_secs: f64,

    /// Filename used when persisting an artifact.
    pub default_filename: String,

    /// MIME type of the capture container.
    pub mime_type: String,

    /// Target bitrate of the capture encoder (kbps).
    pub video_bitrate_kbps: u32,

    /// Polls to wait for the seek to the window start before an export is
    /// abandoned.
    pub cue_max_polls: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "vidtrim=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for PlaybackDefaults {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            boundary_poll_interval_ms: 100,
            seek_settle_tolerance_secs: 0.25,
            seek_settle_max_ticks: 5,
        }
    }
}

impl PlaybackDefaults {
    /// Boundary poll interval, capped at 199ms.
    pub fn boundary_poll_interval_ms(&self) -> u64 {
        self.boundary_poll_interval_ms.clamp(1, 199)
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            default_window_secs: 10.0,
            default_filename: "trimmed-video.webm".to_string(),
            mime_type: "video/webm".to_string(),
            video_bitrate_kbps: 2500,
            cue_max_polls: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Where [`AppConfig::load`] looks.
    pub fn path() -> PathBuf {
        config_file_path()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> VidtrimResult<()> {
        self.validate()?;
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;
        Ok(())
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> VidtrimResult<()> {
        if self.playback.tick_interval_ms == 0 {
            return Err(VidtrimError::config("playback.tick_interval_ms must be positive"));
        }
        if !self.playback.seek_settle_tolerance_secs.is_finite()
            || self.playback.seek_settle_tolerance_secs < 0.0
        {
            return Err(VidtrimError::config(
                "playback.seek_settle_tolerance_secs must be a non-negative number",
            ));
        }
        if !self.export.default_window_secs.is_finite() || self.export.default_window_secs <= 0.0 {
            return Err(VidtrimError::config(
                "export.default_window_secs must be a positive number",
            ));
        }
        if self.export.cue_max_polls == 0 {
            return Err(VidtrimError::config("export.cue_max_polls must be positive"));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("vidtrim").join("config.json")
}
