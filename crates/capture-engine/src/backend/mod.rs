//! Surface backends an edit session can run on.

use vidtrim_common::error::VidtrimResult;
use vidtrim_playback::sim::{SimHandle, SimulatedMedia, SimulatedSurface};
use vidtrim_playback::RenderSurface;

use crate::pipeline::PipelineRole;

pub mod gst;

pub use self::gst::{GstCaptureStream, GstSurface};

/// Which implementation renders the two surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// Real decoding and encoding through GStreamer.
    #[default]
    Gstreamer,
    /// Deterministic in-memory media; needs explicit advancing.
    Simulated,
}

/// Options for [`build_surfaces`].
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// Launch fragment for the primary display sink (GStreamer only).
    pub video_sink: Option<String>,

    /// Media played by simulated surfaces.
    pub simulated_media: SimulatedMedia,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            video_sink: None,
            simulated_media: SimulatedMedia::new(30.0),
        }
    }
}

/// The primary and secondary surfaces of one session.
pub struct SurfacePair {
    pub primary: Box<dyn RenderSurface>,
    pub secondary: Box<dyn RenderSurface>,
    /// Control handles when the surfaces are simulated.
    pub simulated: Option<(SimHandle, SimHandle)>,
}

/// Build both surfaces for `kind`.
pub fn build_surfaces(kind: BackendKind, options: &BackendOptions) -> VidtrimResult<SurfacePair> {
    match kind {
        BackendKind::Gstreamer => {
            let mut primary = GstSurface::new("primary", PipelineRole::Primary)?;
            if let Some(sink) = options.video_sink.as_deref() {
                primary = primary.with_video_sink(sink);
            }
            let secondary = GstSurface::new("preview", PipelineRole::Preview)?;
            tracing::info!("Using GStreamer surfaces");
            Ok(SurfacePair {
                primary: Box::new(primary),
                secondary: Box::new(secondary),
                simulated: None,
            })
        }
        BackendKind::Simulated => {
            let primary = SimulatedSurface::new("primary", options.simulated_media.clone());
            let secondary = SimulatedSurface::new("preview", options.simulated_media.clone());
            let handles = (primary.handle(), secondary.handle());
            tracing::info!(
                duration_secs = options.simulated_media.duration_secs,
                "Using simulated surfaces"
            );
            Ok(SurfacePair {
                primary: Box::new(primary),
                secondary: Box::new(secondary),
                simulated: Some(handles),
            })
        }
    }
}
