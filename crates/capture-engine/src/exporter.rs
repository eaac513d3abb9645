//! Windowed capture of the primary surface into a single artifact.
//!
//! An export plays the trim window once through the primary surface while a
//! capture stream records its composited output. Recording begins paused:
//! the surface is cued to the window start, and the capture only opens its
//! input and playback only resumes once that seek has landed.
//!
//! ```text
//! Idle ──trigger──► Recording ──boundary──► Finalizing ──Stopped──► Complete
//!   ▲                   │                        │                     │
//!   └──── abort / Failed / CaptureUnavailable ───┘       trigger ──────┘
//! ```

use serde::Serialize;

use vidtrim_common::clock::BoundaryOvershoot;
use vidtrim_common::config::{ExportDefaults, PlaybackDefaults};
use vidtrim_common::error::{VidtrimError, VidtrimResult};
use vidtrim_edit_model::artifact::{ArtifactSlot, CapturedArtifact};
use vidtrim_edit_model::blob::{BlobHandle, BlobStore};
use vidtrim_edit_model::filter::FilterState;
use vidtrim_edit_model::window::TrimWindow;
use vidtrim_playback::{CaptureEvent, CaptureFormat, CaptureStream, PlaybackClock, WatchId};

/// Overshoot past the window end above which a warning is logged.
const OVERSHOOT_WARN_MS: f64 = 250.0;

/// Lifecycle of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    /// No export running.
    Idle,
    /// Playing the window while the capture records.
    Recording,
    /// Boundary reached; waiting for the encoder to flush.
    Finalizing,
    /// The last export produced an artifact.
    Complete,
}

impl ExportState {
    /// Whether an export currently holds the primary surface.
    pub fn is_busy(self) -> bool {
        matches!(self, ExportState::Recording | ExportState::Finalizing)
    }
}

/// Result of a successful [`CaptureExporter::trigger`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriggerOutcome {
    /// Recording started for the (duration-fitted) window.
    Started { window: TrimWindow },
    /// Nothing is loaded, or its metadata has not arrived yet.
    NoSource,
}

/// Progress reported by [`CaptureExporter::pump`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    /// The boundary was reached and the capture was asked to stop.
    Finalizing { stop_position_secs: f64 },
    /// The artifact was assembled and stored.
    Completed(CapturedArtifact),
}

/// Paused seek to the window start that has not landed yet.
#[derive(Debug, Clone, Copy)]
struct Cue {
    polls_left: u32,
}

/// Drives one export at a time and owns the single artifact slot.
pub struct CaptureExporter {
    state: ExportState,
    format: CaptureFormat,
    settle_tolerance_secs: f64,
    cue_max_polls: u32,
    capture: Option<Box<dyn CaptureStream>>,
    chunks: Vec<Vec<u8>>,
    window: Option<TrimWindow>,
    filter: FilterState,
    cue: Option<Cue>,
    watch: Option<WatchId>,
    started_at_secs: Option<f64>,
    stop_position_secs: Option<f64>,
    slot: ArtifactSlot,
    transitions: Vec<ExportState>,
}

impl CaptureExporter {
    pub fn new(export: &ExportDefaults, playback: &PlaybackDefaults) -> Self {
        Self {
            state: ExportState::Idle,
            format: CaptureFormat {
                mime_type: export.mime_type.clone(),
                video_bitrate_kbps: export.video_bitrate_kbps,
            },
            settle_tolerance_secs: playback.seek_settle_tolerance_secs.max(0.0),
            cue_max_polls: export.cue_max_polls.max(1),
            capture: None,
            chunks: Vec::new(),
            window: None,
            filter: FilterState::default(),
            cue: None,
            watch: None,
            started_at_secs: None,
            stop_position_secs: None,
            slot: ArtifactSlot::new(),
            transitions: vec![ExportState::Idle],
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// Every state entered so far, starting with the initial `Idle`.
    pub fn transitions(&self) -> &[ExportState] {
        &self.transitions
    }

    /// The most recent artifact, if any export completed.
    pub fn artifact(&self) -> Option<&CapturedArtifact> {
        self.slot.current()
    }

    /// Start exporting `window` with `filter` burned in.
    ///
    /// Fails with `ExportBusy` while another export is running,
    /// `InvalidWindow` when the window is empty after fitting it to the
    /// duration, and `CaptureUnavailable` when the surface cannot record
    /// (which also returns the exporter to `Idle`). No failure leaves
    /// resources held.
    pub fn trigger(
        &mut self,
        clock: &mut PlaybackClock,
        window: TrimWindow,
        filter: FilterState,
    ) -> VidtrimResult<TriggerOutcome> {
        if self.state.is_busy() {
            return Err(VidtrimError::busy(self.state));
        }
        if !clock.has_metadata() {
            tracing::debug!("Export requested without a loaded source; ignoring");
            return Ok(TriggerOutcome::NoSource);
        }

        let window = window.fit_to(clock.duration());
        if window.is_empty() {
            return Err(VidtrimError::InvalidWindow {
                start: window.start(),
                end: window.end(),
            });
        }

        let capture = match clock.open_capture(&self.format) {
            Ok(capture) => capture,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot open capture on primary surface");
                self.return_to_idle();
                return Err(e);
            }
        };

        clock.pause();
        clock.seek(window.start());

        self.capture = Some(capture);
        self.chunks.clear();
        self.window = Some(window);
        self.filter = filter;
        self.cue = Some(Cue {
            polls_left: self.cue_max_polls,
        });
        self.watch = None;
        self.started_at_secs = None;
        self.stop_position_secs = None;
        self.enter(ExportState::Recording);

        tracing::info!(
            start = window.start(),
            end = window.end(),
            mime_type = %self.format.mime_type,
            "Export cued"
        );
        Ok(TriggerOutcome::Started { window })
    }

    /// Advance the export: collect chunks, watch the boundary, and assemble
    /// the artifact once the capture reports it has stopped.
    ///
    /// A capture failure aborts the export and is returned as an error.
    pub fn pump(
        &mut self,
        clock: &mut PlaybackClock,
        now_ns: u64,
        blobs: &mut BlobStore,
    ) -> VidtrimResult<Option<ExportEvent>> {
        if !self.state.is_busy() {
            return Ok(None);
        }

        let mut stopped = false;
        while let Some(event) = self.capture.as_mut().and_then(|c| c.poll_event()) {
            match event {
                CaptureEvent::Chunk(bytes) => {
                    // Anything delivered before the cue lands predates the window.
                    if self.cue.is_some() {
                        tracing::trace!(len = bytes.len(), "Dropped chunk recorded while cueing");
                    } else if !bytes.is_empty() {
                        self.chunks.push(bytes);
                    }
                }
                CaptureEvent::Stopped => {
                    stopped = true;
                    break;
                }
                CaptureEvent::Failed(message) => {
                    self.abort(clock);
                    return Err(VidtrimError::capture(message));
                }
            }
        }

        if stopped {
            if self.state == ExportState::Recording {
                self.abort(clock);
                return Err(VidtrimError::capture(
                    "Capture stopped before the window end was reached",
                ));
            }
            return self.finalize(blobs).map(|a| Some(ExportEvent::Completed(a)));
        }

        if self.state == ExportState::Recording {
            if self.cue.is_some() {
                return self.advance_cue(clock).map(|_| None);
            }
            if let Some(fired) = clock.poll_boundary(now_ns) {
                if Some(fired) == self.watch {
                    return self.begin_finalizing(clock).map(Some);
                }
            }
        }
        Ok(None)
    }

    /// Cancel the export in flight, discarding everything recorded so far.
    /// The previous artifact, if any, is kept.
    pub fn abort(&mut self, clock: &mut PlaybackClock) {
        if !self.state.is_busy() {
            return;
        }
        if let Some(mut capture) = self.capture.take() {
            capture.cancel();
        }
        if let Some(id) = self.watch.take() {
            clock.cancel_watch(id);
        }
        clock.pause();
        let discarded = self.chunks.len();
        self.reset_run();
        self.enter(ExportState::Idle);
        tracing::info!(discarded_chunks = discarded, "Export aborted");
    }

    /// Drop the stored artifact and revoke its blob.
    pub fn clear_artifact(&mut self, blobs: &mut BlobStore) {
        self.slot.clear(blobs);
    }

    /// Wait for the paused seek to the window start to land, then open the
    /// capture, resume playback, and register the boundary watch.
    ///
    /// The cue has landed once the surface has no seek in flight and reports
    /// a position within the settle tolerance of the window start. A cue that
    /// never lands aborts the export rather than recording from elsewhere.
    fn advance_cue(&mut self, clock: &mut PlaybackClock) -> VidtrimResult<()> {
        let (Some(mut cue), Some(window)) = (self.cue, self.window) else {
            return Ok(());
        };
        let position = clock.current_time();
        let landed = !clock.is_seeking()
            && position.is_some_and(|p| (p - window.start()).abs() <= self.settle_tolerance_secs);

        if !landed {
            if cue.polls_left > 1 {
                cue.polls_left -= 1;
                self.cue = Some(cue);
                return Ok(());
            }
            self.abort(clock);
            return Err(VidtrimError::playback(format!(
                "Seek to window start {:.3}s did not land (position {})",
                window.start(),
                position.map_or_else(|| "unknown".to_string(), |p| format!("{p:.3}s")),
            )));
        }

        self.cue = None;
        let started = self.capture.as_mut().map(|c| c.start());
        if let Some(Err(e)) = started {
            tracing::warn!(error = %e, "Capture refused to start");
            self.abort(clock);
            return Err(VidtrimError::capture_unavailable(e.to_string()));
        }
        clock.play();

        let started_at = position.unwrap_or_else(|| window.start());
        self.started_at_secs = Some(started_at);
        self.watch = clock.on_boundary_reached(window.end());
        tracing::info!(started_at, end = window.end(), "Recording window");
        Ok(())
    }

    fn begin_finalizing(&mut self, clock: &mut PlaybackClock) -> VidtrimResult<ExportEvent> {
        clock.pause();
        let stop_position_secs = clock.current_time().unwrap_or_default();
        self.watch = None;
        self.stop_position_secs = Some(stop_position_secs);

        let requested = self.capture.as_mut().map(|c| c.request_stop());
        if let Some(Err(e)) = requested {
            self.abort(clock);
            return Err(e);
        }

        self.enter(ExportState::Finalizing);
        self.log_boundary_overshoot(stop_position_secs);
        Ok(ExportEvent::Finalizing { stop_position_secs })
    }

    fn finalize(&mut self, blobs: &mut BlobStore) -> VidtrimResult<CapturedArtifact> {
        let mime_type = self
            .capture
            .take()
            .map(|c| c.mime_type().to_string())
            .unwrap_or_else(|| self.format.mime_type.clone());
        let window = self.window.unwrap_or_default();
        let chunks = std::mem::take(&mut self.chunks);

        if chunks.is_empty() {
            self.reset_run();
            self.enter(ExportState::Idle);
            return Err(VidtrimError::capture("Capture produced no data"));
        }

        let chunk_count = chunks.len();
        let bytes = chunks.concat();
        let byte_len = bytes.len();
        let started_at = self.started_at_secs.unwrap_or_else(|| window.start());
        let recorded_secs = self
            .stop_position_secs
            .map_or(window.length(), |stop| (stop - started_at).max(0.0));

        let handle: BlobHandle = blobs.insert_bytes(bytes, mime_type.clone());
        let artifact = CapturedArtifact::new(
            handle,
            mime_type,
            window,
            self.filter,
            recorded_secs,
            chunk_count,
            byte_len,
        );
        self.slot.replace(artifact.clone(), blobs);

        self.reset_run();
        self.enter(ExportState::Complete);
        tracing::info!(
            handle = %artifact.handle,
            chunk_count,
            byte_len,
            recorded_secs,
            "Export complete"
        );
        Ok(artifact)
    }

    fn log_boundary_overshoot(&self, observed_secs: f64) {
        let Some(window) = self.window else {
            return;
        };
        let overshoot = BoundaryOvershoot {
            requested_secs: window.end(),
            observed_secs,
        };
        if overshoot.exceeds_threshold_ms(OVERSHOOT_WARN_MS) {
            tracing::warn!(
                overshoot_ms = overshoot.overshoot_ms(),
                "Capture stopped well past the window end"
            );
        } else {
            tracing::debug!(
                overshoot_ms = overshoot.overshoot_ms(),
                "Boundary overshoot within threshold"
            );
        }
    }

    fn reset_run(&mut self) {
        self.capture = None;
        self.chunks.clear();
        self.cue = None;
        self.watch = None;
        self.started_at_secs = None;
        self.stop_position_secs = None;
    }

    fn return_to_idle(&mut self) {
        if self.state != ExportState::Idle {
            self.enter(ExportState::Idle);
        }
    }

    fn enter(&mut self, state: ExportState) {
        tracing::debug!(from = ?self.state, to = ?state, "Export state transition");
        self.state = state;
        self.transitions.push(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidtrim_edit_model::source::Source;
    use vidtrim_playback::sim::{
        decode_frames, recorded_secs, SimFrame, SimHandle, SimulatedMedia, SimulatedSurface,
    };

    const TICK_NS: u64 = 100_000_000;

    struct Rig {
        clock: PlaybackClock,
        handle: SimHandle,
        blobs: BlobStore,
        exporter: CaptureExporter,
        now_ns: u64,
    }

    impl Rig {
        fn new(duration: f64) -> Self {
            Self::with_export(duration, ExportDefaults::default())
        }

        fn with_export(duration: f64, export: ExportDefaults) -> Self {
            let surface = SimulatedSurface::new("primary", SimulatedMedia::new(duration));
            let handle = surface.handle();
            let mut clock = PlaybackClock::new(Box::new(surface), 100);
            let mut blobs = BlobStore::new();
            let source = Source::new(blobs.insert_bytes(vec![1], "video/webm"), "clip.webm");
            clock.load(&source).unwrap();
            handle.advance(0.1);
            assert!(clock.poll_metadata());
            let exporter = CaptureExporter::new(&export, &PlaybackDefaults::default());
            Self {
                clock,
                handle,
                blobs,
                exporter,
                now_ns: 0,
            }
        }

        fn step(&mut self) -> VidtrimResult<Option<ExportEvent>> {
            self.handle.advance(0.1);
            self.now_ns += TICK_NS;
            self.exporter
                .pump(&mut self.clock, self.now_ns, &mut self.blobs)
        }

        fn run_to_completion(&mut self) -> CapturedArtifact {
            for _ in 0..1000 {
                if let Some(ExportEvent::Completed(artifact)) = self.step().unwrap() {
                    return artifact;
                }
            }
            panic!("export never completed");
        }

        fn frames(&self, artifact: &CapturedArtifact) -> Vec<SimFrame> {
            decode_frames(self.blobs.bytes(&artifact.handle).unwrap())
        }
    }

    #[test]
    fn export_records_exactly_the_window() {
        let mut rig = Rig::new(30.0);
        let outcome = rig
            .exporter
            .trigger(&mut rig.clock, TrimWindow::clamped(5.0, 15.0, 30.0), FilterState::default())
            .unwrap();
        assert!(matches!(outcome, TriggerOutcome::Started { .. }));
        assert_eq!(rig.exporter.state(), ExportState::Recording);

        let artifact = rig.run_to_completion();
        assert_eq!(rig.exporter.state(), ExportState::Complete);
        assert!((artifact.recorded_secs - 10.0).abs() <= 0.25);
        assert!(!rig.clock.is_playing());

        let frames = decode_frames(rig.blobs.bytes(&artifact.handle).unwrap());
        assert!((frames[0].start_secs - 5.0).abs() < 1e-9);
        assert!(frames.last().unwrap().end_secs >= 15.0 - 1e-9);
        assert_eq!(frames.len(), artifact.chunk_count);
    }

    #[test]
    fn transitions_follow_the_lifecycle() {
        let mut rig = Rig::new(10.0);
        rig.exporter
            .trigger(&mut rig.clock, TrimWindow::clamped(0.0, 1.0, 10.0), FilterState::default())
            .unwrap();
        rig.run_to_completion();
        assert_eq!(
            rig.exporter.transitions(),
            &[
                ExportState::Idle,
                ExportState::Recording,
                ExportState::Finalizing,
                ExportState::Complete
            ]
        );
    }

    #[test]
    fn overlapping_trigger_is_rejected() {
        let mut rig = Rig::new(30.0);
        let window = TrimWindow::clamped(0.0, 5.0, 30.0);
        rig.exporter
            .trigger(&mut rig.clock, window, FilterState::default())
            .unwrap();
        let err = rig
            .exporter
            .trigger(&mut rig.clock, window, FilterState::default())
            .unwrap_err();
        assert!(matches!(err, VidtrimError::ExportBusy { .. }));
        assert_eq!(rig.exporter.state(), ExportState::Recording);
    }

    #[test]
    fn empty_window_is_rejected() {
        let mut rig = Rig::new(30.0);
        let err = rig
            .exporter
            .trigger(&mut rig.clock, TrimWindow::clamped(8.0, 8.0, 30.0), FilterState::default())
            .unwrap_err();
        assert!(matches!(err, VidtrimError::InvalidWindow { .. }));
        assert_eq!(rig.exporter.state(), ExportState::Idle);
        assert!(!rig.handle.capture_active());
    }

    #[test]
    fn capture_unavailable_reverts_to_idle() {
        let mut rig = Rig::new(30.0);
        rig.handle.set_capture_supported(false);
        let err = rig
            .exporter
            .trigger(&mut rig.clock, TrimWindow::default(), FilterState::default())
            .unwrap_err();
        assert!(err.is_capture_unavailable());
        assert_eq!(rig.exporter.state(), ExportState::Idle);
        assert!(!rig.clock.is_playing());
    }

    #[test]
    fn capture_failure_aborts_without_artifact() {
        let mut rig = Rig::new(30.0);
        rig.exporter
            .trigger(&mut rig.clock, TrimWindow::default(), FilterState::default())
            .unwrap();
        rig.step().unwrap();
        rig.handle.fail_capture("encoder crashed");

        let err = rig.step().unwrap_err();
        assert!(err.to_string().contains("encoder crashed"));
        assert_eq!(rig.exporter.state(), ExportState::Idle);
        assert!(rig.exporter.artifact().is_none());
        assert!(!rig.clock.is_playing());
    }

    #[test]
    fn second_export_revokes_first_artifact() {
        let mut rig = Rig::new(30.0);
        let window = TrimWindow::clamped(0.0, 1.0, 30.0);
        rig.exporter
            .trigger(&mut rig.clock, window, FilterState::default())
            .unwrap();
        let first = rig.run_to_completion();

        rig.exporter
            .trigger(&mut rig.clock, window, FilterState::new(0.5, 1.0, 1.0))
            .unwrap();
        let second = rig.run_to_completion();

        assert!(!rig.blobs.contains(&first.handle));
        assert!(rig.blobs.contains(&second.handle));
        assert_eq!(rig.exporter.artifact().unwrap().handle, second.handle);
    }

    #[test]
    fn abort_keeps_previous_artifact() {
        let mut rig = Rig::new(30.0);
        let window = TrimWindow::clamped(0.0, 1.0, 30.0);
        rig.exporter
            .trigger(&mut rig.clock, window, FilterState::default())
            .unwrap();
        let first = rig.run_to_completion();

        rig.exporter
            .trigger(&mut rig.clock, window, FilterState::default())
            .unwrap();
        rig.step().unwrap();
        rig.exporter.abort(&mut rig.clock);

        assert_eq!(rig.exporter.state(), ExportState::Idle);
        assert!(!rig.handle.capture_active());
        assert_eq!(rig.exporter.artifact().unwrap().handle, first.handle);
        assert!(rig.blobs.contains(&first.handle));
    }

    #[test]
    fn slow_seek_records_nothing_before_window_start() {
        let mut rig = Rig::new(30.0);
        rig.clock.seek(20.0);
        rig.clock.play();
        rig.handle.advance(0.0);
        rig.handle.set_seek_latency(3);

        rig.exporter
            .trigger(&mut rig.clock, TrimWindow::clamped(2.0, 4.0, 30.0), FilterState::default())
            .unwrap();
        let artifact = rig.run_to_completion();
        let frames = rig.frames(&artifact);

        assert!(frames.iter().all(|f| f.start_secs >= 2.0 - 1e-9));
        assert!(frames.iter().all(|f| f.end_secs <= 4.0 + 0.1 + 1e-9));
        assert!((frames[0].start_secs - 2.0).abs() < 1e-9);
        assert!((artifact.recorded_secs - recorded_secs(&frames)).abs() < 1e-6);
        assert!((artifact.recorded_secs - 2.0).abs() <= 0.15);
    }

    #[test]
    fn window_shorter_than_a_tick_stops_on_first_poll() {
        let mut rig = Rig::new(30.0);
        rig.exporter
            .trigger(&mut rig.clock, TrimWindow::clamped(5.0, 5.05, 30.0), FilterState::default())
            .unwrap();
        let artifact = rig.run_to_completion();
        let frames = rig.frames(&artifact);

        assert_eq!(frames.len(), 1);
        assert!((frames[0].start_secs - 5.0).abs() < 1e-9);
        assert!(frames[0].end_secs <= 5.1 + 1e-9);
        assert!(artifact.recorded_secs <= 0.1 + 1e-9);
        assert!(artifact.recorded_secs >= 0.05);
    }

    #[test]
    fn seek_that_never_lands_aborts_without_artifact() {
        let mut rig = Rig::with_export(
            30.0,
            ExportDefaults {
                cue_max_polls: 4,
                ..ExportDefaults::default()
            },
        );
        rig.handle.set_seek_latency(50);
        rig.exporter
            .trigger(&mut rig.clock, TrimWindow::clamped(10.0, 12.0, 30.0), FilterState::default())
            .unwrap();

        for _ in 0..3 {
            assert_eq!(rig.step().unwrap(), None);
        }
        let err = rig.step().unwrap_err();
        assert!(err.to_string().contains("did not land"));
        assert_eq!(rig.exporter.state(), ExportState::Idle);
        assert!(!rig.handle.capture_active());
        assert!(!rig.clock.is_playing());
        assert!(rig.exporter.artifact().is_none());
    }

    #[test]
    fn unavailable_capture_after_complete_returns_to_idle() {
        let mut rig = Rig::new(30.0);
        let window = TrimWindow::clamped(0.0, 1.0, 30.0);
        rig.exporter
            .trigger(&mut rig.clock, window, FilterState::default())
            .unwrap();
        let first = rig.run_to_completion();
        assert_eq!(rig.exporter.state(), ExportState::Complete);

        rig.handle.set_capture_supported(false);
        let err = rig
            .exporter
            .trigger(&mut rig.clock, window, FilterState::default())
            .unwrap_err();
        assert!(err.is_capture_unavailable());
        assert_eq!(rig.exporter.state(), ExportState::Idle);
        assert_eq!(rig.exporter.artifact().unwrap().handle, first.handle);
    }
}
