//! Edit session management.

use std::path::{Path, PathBuf};

use vidtrim_common::config::{AppConfig, ExportDefaults, PlaybackDefaults};
use vidtrim_common::error::VidtrimResult;
use vidtrim_edit_model::artifact::CapturedArtifact;
use vidtrim_edit_model::blob::BlobStore;
use vidtrim_edit_model::filter::{FilterParam, FilterState};
use vidtrim_edit_model::scrub::ScrubPosition;
use vidtrim_edit_model::source::Source;
use vidtrim_edit_model::window::TrimWindow;
use vidtrim_playback::{PlaybackClock, PreviewMirror, RenderSurface, ScrubberSync};
use vidtrim_render_engine::compositor::FilterDescriptor;
use vidtrim_render_engine::export::{save_artifact, SaveRequest};

use crate::exporter::{CaptureExporter, ExportEvent, ExportState, TriggerOutcome};

/// Configuration for an edit session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Transport and scrubber timing.
    pub playback: PlaybackDefaults,

    /// Default window length, encoding, and download name.
    pub export: ExportDefaults,
}

impl From<&AppConfig> for SessionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            playback: config.playback.clone(),
            export: config.export.clone(),
        }
    }
}

/// One editing session over a single loaded source.
///
/// Owns the blob store and every component; all state changes go through
/// this type so the primary and preview surfaces never disagree on the
/// filter, and every handle it issues is revoked when replaced or dropped.
pub struct EditSession {
    config: SessionConfig,
    blobs: BlobStore,
    source: Option<Source>,
    clock: PlaybackClock,
    preview: PreviewMirror,
    scrubber: ScrubberSync,
    exporter: CaptureExporter,
    window: TrimWindow,
    filter: FilterState,
    descriptor: FilterDescriptor,
}

impl EditSession {
    /// Create a session over a primary (played and captured) and a
    /// secondary (muted preview) surface.
    pub fn new(
        config: SessionConfig,
        primary: Box<dyn RenderSurface>,
        secondary: Box<dyn RenderSurface>,
    ) -> Self {
        let mut clock = PlaybackClock::new(primary, config.playback.boundary_poll_interval_ms());
        let mut preview = PreviewMirror::new(secondary);
        let filter = FilterState::default();
        let descriptor = FilterDescriptor::compose(&filter);
        clock.apply_filter(&descriptor);
        preview.apply_filter(&descriptor);

        Self {
            scrubber: ScrubberSync::new(&config.playback, config.export.default_window_secs),
            exporter: CaptureExporter::new(&config.export, &config.playback),
            window: initial_window(&config.export),
            config,
            blobs: BlobStore::new(),
            source: None,
            clock,
            preview,
            filter,
            descriptor,
        }
    }

    /// Register a file and bind it to both surfaces.
    pub fn load_file(&mut self, path: &Path) -> VidtrimResult<&Source> {
        let handle = self.blobs.insert_file(path)?;
        self.load_source(Source::new(handle, path))
    }

    /// Register in-memory media under `name` and bind it.
    pub fn load_bytes(
        &mut self,
        bytes: Vec<u8>,
        mime_type: &str,
        name: impl Into<PathBuf>,
    ) -> VidtrimResult<&Source> {
        let handle = self.blobs.insert_bytes(bytes, mime_type);
        self.load_source(Source::new(handle, name))
    }

    /// Bind `source` to both surfaces, replacing the current one.
    ///
    /// An export in flight is aborted. The previous source's handle is
    /// revoked; the last artifact is kept.
    pub fn load_source(&mut self, source: Source) -> VidtrimResult<&Source> {
        if self.exporter.is_busy() {
            tracing::warn!("Source replaced during export; aborting export");
            self.exporter.abort(&mut self.clock);
        }
        if let Some(previous) = self.source.take() {
            self.blobs.revoke(previous.handle());
            tracing::debug!(handle = %previous.handle(), "Revoked previous source");
        }

        let bound = self
            .clock
            .load(&source)
            .and_then(|()| self.preview.bind(&source));
        if let Err(e) = bound {
            self.clock.unload();
            self.preview.unbind();
            self.blobs.revoke(source.handle());
            return Err(e);
        }

        self.scrubber.reset();
        self.window = initial_window(&self.config.export);
        self.clock.apply_filter(&self.descriptor);
        self.preview.apply_filter(&self.descriptor);

        tracing::info!(
            source = %source.display_name(),
            handle = %source.handle(),
            "Source loaded"
        );
        Ok(self.source.insert(source))
    }

    /// Advance every component by one event-loop step.
    ///
    /// `now_ns` is a monotonic timestamp used to rate-limit the boundary
    /// poll. Returns export progress, if any happened during this step.
    pub fn tick(&mut self, now_ns: u64) -> VidtrimResult<Option<ExportEvent>> {
        if self.clock.poll_metadata() {
            self.scrubber.reset();
            self.window = self.window.fit_to(self.clock.duration());
            tracing::debug!(
                start = self.window.start(),
                end = self.window.end(),
                "Window fitted to duration"
            );
        }

        self.scrubber.tick(&self.clock);
        self.preview
            .sync(self.scrubber.position(), self.clock.duration());

        self.exporter
            .pump(&mut self.clock, now_ns, &mut self.blobs)
    }

    /// User-drag path of the scrubber. Returns the new window, or `None`
    /// when scrubbing is disabled or an export holds the surface.
    pub fn drag_scrubber(&mut self, position: f64) -> Option<TrimWindow> {
        if self.exporter.is_busy() {
            tracing::debug!("Scrubber drag ignored during export");
            return None;
        }
        let window = self.scrubber.drag(position, &mut self.clock)?;
        self.window = window;
        self.preview
            .sync(self.scrubber.position(), self.clock.duration());
        Some(window)
    }

    /// Set the window start, clamped to `[0, duration]`. No-op without a
    /// loaded source.
    pub fn set_start(&mut self, secs: f64) -> TrimWindow {
        if self.clock.has_metadata() && !self.exporter.is_busy() {
            self.window = self.window.with_start(secs, self.clock.duration());
        }
        self.window
    }

    /// Set the window end, clamped to `[0, duration]`. No-op without a
    /// loaded source.
    pub fn set_end(&mut self, secs: f64) -> TrimWindow {
        if self.clock.has_metadata() && !self.exporter.is_busy() {
            self.window = self.window.with_end(secs, self.clock.duration());
        }
        self.window
    }

    /// Replace all three adjustments at once.
    pub fn set_filter(&mut self, filter: FilterState) -> FilterState {
        if self.source.is_none() {
            return self.filter;
        }
        self.filter = filter;
        self.descriptor = FilterDescriptor::compose(&self.filter);
        self.clock.apply_filter(&self.descriptor);
        self.preview.apply_filter(&self.descriptor);
        tracing::debug!(css = %self.descriptor.css(), "Filter applied");
        self.filter
    }

    /// Change a single adjustment. Returns the clamped value.
    pub fn set_filter_param(&mut self, param: FilterParam, value: f64) -> f64 {
        let mut next = self.filter;
        next.set(param, value);
        self.set_filter(next).get(param)
    }

    pub fn set_brightness(&mut self, value: f64) -> f64 {
        self.set_filter_param(FilterParam::Brightness, value)
    }

    pub fn set_saturation(&mut self, value: f64) -> f64 {
        self.set_filter_param(FilterParam::Saturation, value)
    }

    pub fn set_contrast(&mut self, value: f64) -> f64 {
        self.set_filter_param(FilterParam::Contrast, value)
    }

    pub fn play(&mut self) {
        if !self.exporter.is_busy() {
            self.clock.play();
        }
    }

    pub fn pause(&mut self) {
        if !self.exporter.is_busy() {
            self.clock.pause();
        }
    }

    /// Export the current window with the current filter.
    pub fn trigger_export(&mut self) -> VidtrimResult<TriggerOutcome> {
        if self.source.is_none() {
            return Ok(TriggerOutcome::NoSource);
        }
        self.exporter
            .trigger(&mut self.clock, self.window, self.filter)
    }

    /// Cancel the export in flight.
    pub fn abort_export(&mut self) {
        self.exporter.abort(&mut self.clock);
    }

    /// Write the last artifact to `output_dir` under the configured default
    /// file name. Returns `None` when nothing has been exported yet.
    pub async fn save_artifact(&self, output_dir: &Path) -> VidtrimResult<Option<PathBuf>> {
        let request = SaveRequest::new(output_dir, &self.config.export.default_filename);
        self.save_artifact_as(&request).await
    }

    pub async fn save_artifact_as(&self, request: &SaveRequest) -> VidtrimResult<Option<PathBuf>> {
        let Some(artifact) = self.exporter.artifact() else {
            tracing::debug!("No artifact to save");
            return Ok(None);
        };
        save_artifact(artifact, &self.blobs, request).await.map(Some)
    }

    /// Release the source, the artifact, and both surfaces.
    pub fn close(&mut self) {
        self.exporter.abort(&mut self.clock);
        self.exporter.clear_artifact(&mut self.blobs);
        if let Some(source) = self.source.take() {
            self.blobs.revoke(source.handle());
        }
        self.clock.unload();
        self.preview.unbind();
        self.scrubber.reset();
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn window(&self) -> TrimWindow {
        self.window
    }

    pub fn filter(&self) -> FilterState {
        self.filter
    }

    pub fn descriptor(&self) -> &FilterDescriptor {
        &self.descriptor
    }

    pub fn scrub_position(&self) -> ScrubPosition {
        self.scrubber.position()
    }

    pub fn scrubber_enabled(&self) -> bool {
        self.scrubber.is_enabled(&self.clock)
    }

    /// Source duration; `0` until metadata has been decoded.
    pub fn duration(&self) -> f64 {
        self.clock.duration()
    }

    pub fn has_metadata(&self) -> bool {
        self.clock.has_metadata()
    }

    pub fn current_time(&self) -> Option<f64> {
        self.clock.current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn export_state(&self) -> ExportState {
        self.exporter.state()
    }

    pub fn exporter(&self) -> &CaptureExporter {
        &self.exporter
    }

    pub fn artifact(&self) -> Option<&CapturedArtifact> {
        self.exporter.artifact()
    }

    /// Encoded bytes of the last artifact.
    pub fn artifact_bytes(&self) -> Option<VidtrimResult<&[u8]>> {
        self.exporter
            .artifact()
            .map(|artifact| self.blobs.bytes(&artifact.handle))
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

/// `[0, default length]`, before any duration is known.
fn initial_window(export: &ExportDefaults) -> TrimWindow {
    let length = export.default_window_secs;
    TrimWindow::from_start(0.0, length, length)
}

impl Drop for EditSession {
    fn drop(&mut self) {
        self.close();
    }
}
