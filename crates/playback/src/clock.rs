//! Playback clock over the primary rendering surface.

use vidtrim_common::clock::{MonotonicClock, RateController};
use vidtrim_common::error::{VidtrimError, VidtrimResult};
use vidtrim_edit_model::source::Source;
use vidtrim_render_engine::compositor::FilterDescriptor;

use crate::surface::{CaptureFormat, CaptureStream, RenderSurface};

/// Identifier of a registered boundary watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

#[derive(Debug, Clone, Copy)]
struct BoundaryWatch {
    id: WatchId,
    threshold_secs: f64,
}

/// Owns the primary surface and reports its position in the source's time
/// domain.
///
/// The duration is `0` until the surface has decoded metadata; until then
/// every time-based operation is a no-op.
pub struct PlaybackClock {
    surface: Box<dyn RenderSurface>,
    bound: bool,
    metadata_ready: bool,
    duration_secs: f64,
    watch: Option<BoundaryWatch>,
    next_watch_id: u64,
    boundary_poll: RateController,
}

impl PlaybackClock {
    /// Wrap `surface`; boundary watches are evaluated at most every
    /// `boundary_poll_interval_ms`.
    pub fn new(surface: Box<dyn RenderSurface>, boundary_poll_interval_ms: u64) -> Self {
        Self {
            surface,
            bound: false,
            metadata_ready: false,
            duration_secs: 0.0,
            watch: None,
            next_watch_id: 0,
            boundary_poll: RateController::with_interval_ns(MonotonicClock::ms_to_ns(
                boundary_poll_interval_ms,
            )),
        }
    }

    /// Bind new content. Cancels any pending boundary watch. On failure the
    /// clock is left unbound.
    pub fn load(&mut self, source: &Source) -> VidtrimResult<()> {
        self.watch = None;
        self.surface.pause();
        self.bound = false;
        self.metadata_ready = false;
        self.duration_secs = 0.0;
        self.surface.bind(source)?;
        self.bound = true;
        tracing::info!(surface = self.surface.name(), source = %source.display_name(), "Source bound");
        Ok(())
    }

    /// Release the bound content.
    pub fn unload(&mut self) {
        if self.bound {
            self.surface.unbind();
        }
        self.watch = None;
        self.bound = false;
        self.metadata_ready = false;
        self.duration_secs = 0.0;
    }

    /// Check whether decoded metadata has arrived. Returns `true` exactly
    /// once per load, at which point the duration is known and the position
    /// has been reset to 0.
    pub fn poll_metadata(&mut self) -> bool {
        if !self.bound || self.metadata_ready {
            return false;
        }
        let Some(duration) = self.surface.duration() else {
            return false;
        };
        self.duration_secs = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        self.metadata_ready = true;
        self.surface.seek(0.0);
        tracing::info!(duration_secs = self.duration_secs, "Metadata decoded");
        true
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata_ready
    }

    /// Content length in seconds; `0` when nothing is loaded yet.
    pub fn duration(&self) -> f64 {
        self.duration_secs
    }

    /// Seek to `secs`, clamped to `[0, duration]`. Returns the clamped
    /// target, or `None` when nothing is loaded.
    pub fn seek(&mut self, secs: f64) -> Option<f64> {
        if !self.metadata_ready {
            return None;
        }
        let target = if secs.is_finite() {
            secs.clamp(0.0, self.duration_secs)
        } else {
            0.0
        };
        self.surface.seek(target);
        Some(target)
    }

    /// Whether a requested seek has yet to land on the surface.
    pub fn is_seeking(&self) -> bool {
        self.bound && self.surface.is_seeking()
    }

    pub fn play(&mut self) {
        if self.bound {
            self.surface.play();
        }
    }

    pub fn pause(&mut self) {
        if self.bound {
            self.surface.pause();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.bound && self.surface.is_playing()
    }

    /// Current position, available once metadata has been decoded.
    pub fn current_time(&self) -> Option<f64> {
        self.metadata_ready
            .then(|| self.surface.position().clamp(0.0, self.duration_secs))
    }

    /// Register a one-shot watch that fires once the position reaches
    /// `threshold_secs`. Replaces any earlier watch.
    pub fn on_boundary_reached(&mut self, threshold_secs: f64) -> Option<WatchId> {
        if !self.metadata_ready {
            return None;
        }
        self.next_watch_id += 1;
        let id = WatchId(self.next_watch_id);
        if let Some(previous) = self.watch.replace(BoundaryWatch { id, threshold_secs }) {
            tracing::debug!(?previous.id, "Boundary watch superseded");
        }
        self.boundary_poll.reset();
        Some(id)
    }

    /// Cancel a watch. Returns whether it was still pending.
    pub fn cancel_watch(&mut self, id: WatchId) -> bool {
        match self.watch {
            Some(watch) if watch.id == id => {
                self.watch = None;
                true
            }
            _ => false,
        }
    }

    /// Evaluate the pending watch, at most once per poll interval. Returns
    /// the watch id the single time it fires.
    pub fn poll_boundary(&mut self, now_ns: u64) -> Option<WatchId> {
        let watch = self.watch?;
        if !self.boundary_poll.should_tick(now_ns) {
            return None;
        }
        let position = self.current_time()?;
        if position + f64::EPSILON < watch.threshold_secs {
            return None;
        }
        self.watch = None;
        tracing::debug!(position, threshold = watch.threshold_secs, "Boundary reached");
        Some(watch.id)
    }

    pub fn apply_filter(&mut self, filter: &FilterDescriptor) {
        self.surface.apply_filter(filter);
    }

    /// Open a capture on the surface's composited output.
    pub fn open_capture(&mut self, format: &CaptureFormat) -> VidtrimResult<Box<dyn CaptureStream>> {
        if !self.bound {
            return Err(VidtrimError::capture_unavailable("No source bound"));
        }
        self.surface.open_capture(format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedMedia, SimulatedSurface};
    use vidtrim_edit_model::blob::BlobStore;

    fn source(blobs: &mut BlobStore) -> Source {
        let handle = blobs.insert_bytes(vec![0], "video/webm");
        Source::new(handle, "clip.webm")
    }

    fn loaded_clock(duration: f64) -> (PlaybackClock, crate::sim::SimHandle) {
        let surface = SimulatedSurface::new("primary", SimulatedMedia::new(duration));
        let handle = surface.handle();
        let mut clock = PlaybackClock::new(Box::new(surface), 100);
        let mut blobs = BlobStore::new();
        clock.load(&source(&mut blobs)).unwrap();
        (clock, handle)
    }

    #[test]
    fn unbound_clock_ignores_everything() {
        let surface = SimulatedSurface::new("primary", SimulatedMedia::new(30.0));
        let handle = surface.handle();
        let mut clock = PlaybackClock::new(Box::new(surface), 100);

        assert_eq!(clock.seek(4.0), None);
        clock.play();
        assert!(!handle.is_playing());
        assert_eq!(clock.current_time(), None);
        assert_eq!(clock.on_boundary_reached(1.0), None);
        assert!(!clock.poll_metadata());
        assert_eq!(clock.duration(), 0.0);
    }

    #[test]
    fn metadata_arrives_asynchronously_once() {
        let (mut clock, handle) = loaded_clock(30.0);
        assert!(!clock.poll_metadata());
        assert_eq!(clock.current_time(), None);

        handle.advance(0.1);
        assert!(clock.poll_metadata());
        assert!(!clock.poll_metadata());
        assert_eq!(clock.duration(), 30.0);
        assert_eq!(clock.current_time(), Some(0.0));
    }

    #[test]
    fn seek_clamps_to_duration() {
        let (mut clock, handle) = loaded_clock(30.0);
        handle.advance(0.1);
        clock.poll_metadata();

        assert_eq!(clock.seek(45.0), Some(30.0));
        assert_eq!(clock.seek(-2.0), Some(0.0));
        handle.advance(0.0);
        assert_eq!(clock.current_time(), Some(0.0));
    }

    #[test]
    fn boundary_fires_once_at_poll_granularity() {
        let (mut clock, handle) = loaded_clock(30.0);
        handle.advance(0.1);
        clock.poll_metadata();

        let id = clock.on_boundary_reached(1.0).unwrap();
        clock.play();

        let mut now_ns = 0u64;
        let mut fired = Vec::new();
        for _ in 0..20 {
            handle.advance(0.1);
            now_ns += 100_000_000;
            if let Some(hit) = clock.poll_boundary(now_ns) {
                fired.push((hit, clock.current_time().unwrap()));
            }
        }

        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, id);
        assert!(fired[0].1 >= 1.0 - 1e-9);
        assert!(fired[0].1 < 1.2);
    }

    #[test]
    fn failed_load_leaves_clock_unbound() {
        let (mut clock, handle) = loaded_clock(30.0);
        handle.advance(0.1);
        assert!(clock.poll_metadata());
        clock.on_boundary_reached(5.0).unwrap();

        handle.fail_next_bind("unsupported codec");
        let mut blobs = BlobStore::new();
        let err = clock.load(&source(&mut blobs)).unwrap_err();
        assert!(err.to_string().contains("unsupported codec"));

        assert!(!clock.is_bound());
        assert!(!clock.has_metadata());
        assert_eq!(clock.duration(), 0.0);
        assert_eq!(clock.current_time(), None);
        assert_eq!(clock.poll_boundary(1_000_000_000), None);
        handle.advance(0.1);
        assert!(!clock.poll_metadata());
    }

    #[test]
    fn new_watch_and_load_cancel_previous() {
        let (mut clock, handle) = loaded_clock(30.0);
        handle.advance(0.1);
        clock.poll_metadata();

        let first = clock.on_boundary_reached(0.0).unwrap();
        let second = clock.on_boundary_reached(0.0).unwrap();
        assert_ne!(first, second);
        assert!(!clock.cancel_watch(first));
        assert_eq!(clock.poll_boundary(0), Some(second));

        clock.on_boundary_reached(0.0).unwrap();
        let mut blobs = BlobStore::new();
        clock.load(&source(&mut blobs)).unwrap();
        handle.advance(0.1);
        clock.poll_metadata();
        assert_eq!(clock.poll_boundary(1_000_000_000), None);
    }
}
