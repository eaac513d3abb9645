use proptest::prelude::*;
use vidtrim_capture_engine::{EditSession, ExportEvent, ExportState, SessionConfig, TriggerOutcome};
use vidtrim_common::error::VidtrimError;
use vidtrim_edit_model::artifact::CapturedArtifact;
use vidtrim_edit_model::filter::FilterState;
use vidtrim_edit_model::window::TrimWindow;
use vidtrim_render_engine::compositor::FilterDescriptor;
use vidtrim_playback::sim::{decode_frames, SimFrame, SimHandle, SimulatedMedia, SimulatedSurface};

const STEP_SECS: f64 = 0.1;
const STEP_NS: u64 = 100_000_000;

struct Harness {
    session: EditSession,
    primary: SimHandle,
    secondary: SimHandle,
    now_ns: u64,
}

impl Harness {
    fn new(media: SimulatedMedia) -> Self {
        let primary = SimulatedSurface::new("primary", media.clone());
        let secondary = SimulatedSurface::new("preview", media);
        let (p, s) = (primary.handle(), secondary.handle());
        Self {
            session: EditSession::new(
                SessionConfig::default(),
                Box::new(primary),
                Box::new(secondary),
            ),
            primary: p,
            secondary: s,
            now_ns: 0,
        }
    }

    fn loaded(duration: f64) -> Self {
        let mut harness = Self::new(SimulatedMedia::new(duration));
        harness.load("clip.webm");
        harness
    }

    fn load(&mut self, name: &str) {
        self.session
            .load_bytes(vec![0xAB; 32], "video/webm", name)
            .unwrap();
        self.step().unwrap();
        assert!(self.session.has_metadata());
    }

    fn step(&mut self) -> Result<Option<ExportEvent>, VidtrimError> {
        self.primary.advance(STEP_SECS);
        self.secondary.advance(STEP_SECS);
        self.now_ns += STEP_NS;
        self.session.tick(self.now_ns)
    }

    fn export(&mut self) -> CapturedArtifact {
        let outcome = self.session.trigger_export().unwrap();
        assert!(matches!(outcome, TriggerOutcome::Started { .. }));
        for _ in 0..2_000 {
            if let Some(ExportEvent::Completed(artifact)) = self.step().unwrap() {
                return artifact;
            }
        }
        panic!("export did not complete");
    }

    fn frames(&self, artifact: &CapturedArtifact) -> Vec<SimFrame> {
        decode_frames(self.session.blobs().bytes(&artifact.handle).unwrap())
    }
}

#[test]
fn exports_window_of_thirty_second_source() {
    let mut h = Harness::loaded(30.0);
    h.session.set_start(5.0);
    h.session.set_end(15.0);

    let artifact = h.export();
    assert_eq!(h.session.export_state(), ExportState::Complete);
    assert_eq!(artifact.window, TrimWindow::clamped(5.0, 15.0, 30.0));
    assert!((artifact.recorded_secs - 10.0).abs() <= 0.25);
    assert_eq!(artifact.mime_type, "video/webm");

    let frames = h.frames(&artifact);
    assert!((frames[0].start_secs - 5.0).abs() < 1e-9);
    let covered: f64 = frames.iter().map(|f| f.end_secs - f.start_secs).sum();
    assert!((covered - 10.0).abs() <= 0.25);
    assert!(!h.session.is_playing());
}

#[test]
fn slow_seek_keeps_artifact_inside_window() {
    let mut h = Harness::loaded(30.0);
    h.session.play();
    for _ in 0..30 {
        h.step().unwrap();
    }
    h.session.pause();
    assert!(h.session.current_time().unwrap() < 5.0);

    h.primary.set_seek_latency(3);
    h.session.set_start(5.0);
    h.session.set_end(8.0);

    let artifact = h.export();
    let frames = h.frames(&artifact);
    assert!(frames
        .iter()
        .all(|f| f.start_secs >= 5.0 - 1e-9 && f.end_secs <= 8.0 + STEP_SECS + 1e-9));
    let covered: f64 = frames.iter().map(|f| f.end_secs - f.start_secs).sum();
    assert!((artifact.recorded_secs - covered).abs() < 1e-6);
}

#[test]
fn drag_to_midpoint_seeks_and_derives_window() {
    let mut h = Harness::loaded(30.0);
    let window = h.session.drag_scrubber(50.0).unwrap();
    assert_eq!(window, TrimWindow::clamped(15.0, 25.0, 30.0));

    h.step().unwrap();
    assert_eq!(h.session.current_time(), Some(15.0));
    assert!((h.secondary.position() - 15.0).abs() < 1e-9);
    assert!(h.secondary.is_muted());
}

#[test]
fn zero_brightness_exports_black_frames() {
    let mut h = Harness::new(SimulatedMedia::new(20.0).with_color([250, 30, 90]));
    h.load("clip.webm");
    assert_eq!(h.session.set_brightness(0.0), 0.0);
    h.session.set_end(2.0);

    let artifact = h.export();
    let frames = h.frames(&artifact);
    assert!(!frames.is_empty());
    assert!(frames.iter().all(|f| f.rgb == [0, 0, 0]));
    assert_eq!(artifact.filter.brightness(), 0.0);
}

#[test]
fn both_surfaces_receive_identical_filter() {
    let mut h = Harness::loaded(10.0);
    h.session.set_saturation(1.4);
    h.session.set_contrast(0.6);
    assert_eq!(h.primary.filter(), h.secondary.filter());
    assert_eq!(h.primary.filter(), *h.session.descriptor());
    assert_eq!(
        h.session.descriptor().css(),
        "brightness(1) saturate(1.4) contrast(0.6)"
    );
}

#[test]
fn export_without_source_is_noop() {
    let mut h = Harness::new(SimulatedMedia::new(10.0));
    assert_eq!(h.session.trigger_export().unwrap(), TriggerOutcome::NoSource);
    assert_eq!(h.session.export_state(), ExportState::Idle);
    assert!(h.session.artifact().is_none());
}

#[test]
fn second_export_replaces_and_revokes_first() {
    let mut h = Harness::loaded(10.0);
    h.session.set_end(1.0);
    let first = h.export();
    let second = h.export();

    assert_ne!(first.handle, second.handle);
    assert!(!h.session.blobs().contains(&first.handle));
    assert_eq!(h.session.artifact().unwrap().handle, second.handle);
}

#[test]
fn overlapping_export_is_rejected() {
    let mut h = Harness::loaded(10.0);
    h.session.trigger_export().unwrap();
    h.step().unwrap();
    let err = h.session.trigger_export().unwrap_err();
    assert!(matches!(err, VidtrimError::ExportBusy { .. }));
}

#[test]
fn empty_window_is_rejected() {
    let mut h = Harness::loaded(10.0);
    h.session.set_start(4.0);
    h.session.set_end(4.0);
    let err = h.session.trigger_export().unwrap_err();
    assert!(matches!(err, VidtrimError::InvalidWindow { .. }));
    assert_eq!(h.session.export_state(), ExportState::Idle);
}

#[test]
fn unsupported_capture_surfaces_error_and_stays_idle() {
    let mut h = Harness::loaded(10.0);
    h.primary.set_capture_supported(false);
    let err = h.session.trigger_export().unwrap_err();
    assert!(err.is_capture_unavailable());
    assert_eq!(h.session.export_state(), ExportState::Idle);
}

#[test]
fn swapping_source_mid_export_aborts() {
    let mut h = Harness::loaded(10.0);
    h.session.set_end(1.0);
    let kept = h.export();

    h.session.set_end(5.0);
    h.session.trigger_export().unwrap();
    h.step().unwrap();
    h.session
        .load_bytes(vec![1; 8], "video/webm", "other.webm")
        .unwrap();

    assert_eq!(h.session.export_state(), ExportState::Idle);
    assert!(!h.primary.capture_active());
    assert_eq!(h.session.artifact().unwrap().handle, kept.handle);
    assert_eq!(h.session.duration(), 0.0);
}

#[test]
fn scrubber_and_export_controls_are_locked_during_export() {
    let mut h = Harness::loaded(10.0);
    h.session.trigger_export().unwrap();
    let window = h.session.window();
    assert_eq!(h.session.drag_scrubber(90.0), None);
    assert_eq!(h.session.set_start(7.0), window);
    h.session.pause();
    h.step().unwrap();
    assert!(h.session.is_playing());
}

#[test]
fn closing_session_releases_every_handle() {
    let mut h = Harness::loaded(10.0);
    h.session.set_end(1.0);
    h.export();
    assert_eq!(h.session.blobs().live_count(), 2);
    h.session.close();
    assert_eq!(h.session.blobs().live_count(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn surfaces_never_disagree_on_filter(
        brightness in 0.0f64..=2.0,
        saturation in 0.0f64..=2.0,
        contrast in 0.0f64..=2.0,
    ) {
        let mut h = Harness::loaded(10.0);
        let applied = h.session.set_filter(FilterState::new(brightness, saturation, contrast));
        prop_assert_eq!(applied, FilterState::new(brightness, saturation, contrast));
        prop_assert_eq!(h.primary.filter(), h.secondary.filter());
        prop_assert_eq!(h.primary.filter(), FilterDescriptor::compose(&applied));
    }

    #[test]
    fn recorded_length_tracks_window(start in 0.0f64..20.0, length in 0.5f64..8.0) {
        let mut h = Harness::loaded(30.0);
        h.session.set_start(start);
        h.session.set_end(start + length);
        let window = h.session.window();

        let artifact = h.export();
        prop_assert!((artifact.recorded_secs - window.length()).abs() <= 0.25);
        prop_assert!(artifact.recorded_secs + 1e-9 >= window.length());
    }
}
