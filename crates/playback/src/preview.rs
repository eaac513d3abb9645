//! Secondary, muted surface that mirrors the scrub position.

use vidtrim_common::error::VidtrimResult;
use vidtrim_edit_model::scrub::ScrubPosition;
use vidtrim_edit_model::source::Source;
use vidtrim_render_engine::compositor::FilterDescriptor;

use crate::surface::RenderSurface;

/// Purely reactive preview: it has no transport of its own and only seeks
/// when the scrub position or the duration changes.
pub struct PreviewMirror {
    surface: Box<dyn RenderSurface>,
    bound: bool,
    last_synced: Option<(ScrubPosition, f64)>,
}

impl PreviewMirror {
    pub fn new(mut surface: Box<dyn RenderSurface>) -> Self {
        surface.set_muted(true);
        Self {
            surface,
            bound: false,
            last_synced: None,
        }
    }

    pub fn bind(&mut self, source: &Source) -> VidtrimResult<()> {
        self.surface.bind(source)?;
        self.surface.set_muted(true);
        self.bound = true;
        self.last_synced = None;
        Ok(())
    }

    pub fn unbind(&mut self) {
        if self.bound {
            self.surface.unbind();
        }
        self.bound = false;
        self.last_synced = None;
    }

    pub fn apply_filter(&mut self, filter: &FilterDescriptor) {
        self.surface.apply_filter(filter);
    }

    /// Seek the preview to `position` of `duration`. Returns the seek time
    /// when a seek was issued; idle while unbound or while the duration is 0.
    pub fn sync(&mut self, position: ScrubPosition, duration_secs: f64) -> Option<f64> {
        if !self.bound || duration_secs <= 0.0 {
            return None;
        }
        if self.last_synced == Some((position, duration_secs)) {
            return None;
        }
        let time = position.to_time(duration_secs);
        self.surface.seek(time);
        self.last_synced = Some((position, duration_secs));
        Some(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedMedia, SimulatedSurface};
    use vidtrim_edit_model::blob::BlobStore;

    fn bound_mirror() -> (PreviewMirror, crate::sim::SimHandle) {
        let surface = SimulatedSurface::new("preview", SimulatedMedia::new(30.0));
        let handle = surface.handle();
        let mut mirror = PreviewMirror::new(Box::new(surface));
        let mut blobs = BlobStore::new();
        let source = Source::new(blobs.insert_bytes(vec![0], "video/webm"), "clip.webm");
        mirror.bind(&source).unwrap();
        (mirror, handle)
    }

    #[test]
    fn mirror_is_muted_and_idle_without_duration() {
        let (mut mirror, handle) = bound_mirror();
        assert!(handle.is_muted());
        assert_eq!(mirror.sync(ScrubPosition::new(40.0), 0.0), None);
        assert_eq!(handle.seek_count(), 0);
    }

    #[test]
    fn mirror_seeks_only_on_change() {
        let (mut mirror, handle) = bound_mirror();
        assert_eq!(mirror.sync(ScrubPosition::new(50.0), 30.0), Some(15.0));
        assert_eq!(mirror.sync(ScrubPosition::new(50.0), 30.0), None);
        assert_eq!(mirror.sync(ScrubPosition::new(50.0), 20.0), Some(10.0));
        assert_eq!(handle.seek_count(), 2);
        assert!(!handle.is_playing());
    }

    #[test]
    fn unbound_mirror_does_nothing() {
        let surface = SimulatedSurface::new("preview", SimulatedMedia::new(30.0));
        let handle = surface.handle();
        let mut mirror = PreviewMirror::new(Box::new(surface));
        assert_eq!(mirror.sync(ScrubPosition::new(10.0), 30.0), None);
        assert_eq!(handle.seek_count(), 0);
    }
}
