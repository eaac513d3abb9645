//! Rendering surface and capture stream contracts.

use vidtrim_common::error::VidtrimResult;
use vidtrim_edit_model::source::Source;
use vidtrim_render_engine::compositor::FilterDescriptor;

/// Anything that can decode and display a [`Source`].
///
/// Seeks are asynchronous: `position()` may keep reporting the old time
/// until the surface has buffered around the new one. Transport calls on an
/// unbound surface are ignored.
pub trait RenderSurface {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Bind new content. Position resets to 0 and the duration is unknown
    /// until decoded metadata arrives.
    fn bind(&mut self, source: &Source) -> VidtrimResult<()>;

    /// Release the bound content.
    fn unbind(&mut self);

    /// Decoded duration in seconds, `None` until metadata is available.
    fn duration(&self) -> Option<f64>;

    /// Current playback position in seconds.
    fn position(&self) -> f64;

    /// Request a seek.
    fn seek(&mut self, secs: f64);

    /// Whether the last requested seek has yet to land. While this is
    /// `true`, `position()` may still report the pre-seek time.
    fn is_seeking(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    /// Style every subsequently rendered frame with `filter`.
    fn apply_filter(&mut self, filter: &FilterDescriptor);

    fn set_muted(&mut self, muted: bool);

    /// Open a live capture of the composited output (filters included).
    ///
    /// Fails with `VidtrimError::CaptureUnavailable` when the host cannot
    /// encode in the requested format.
    fn open_capture(&mut self, format: &CaptureFormat) -> VidtrimResult<Box<dyn CaptureStream>>;
}

/// Encoding parameters for a capture.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureFormat {
    /// Container MIME type.
    pub mime_type: String,

    /// Target video bitrate (kbps).
    pub video_bitrate_kbps: u32,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            mime_type: "video/webm".to_string(),
            video_bitrate_kbps: 2500,
        }
    }
}

/// Notification delivered by a running capture.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// An encoded chunk. Chunks must be concatenated in delivery order.
    Chunk(Vec<u8>),

    /// The encoder has flushed; no more chunks follow.
    Stopped,

    /// The capture broke down; no more chunks follow.
    Failed(String),
}

/// A live recording of a surface's composited output.
pub trait CaptureStream {
    /// Begin recording.
    fn start(&mut self) -> VidtrimResult<()>;

    /// Ask the encoder to stop. Teardown completes asynchronously and is
    /// reported through [`CaptureEvent::Stopped`].
    fn request_stop(&mut self) -> VidtrimResult<()>;

    /// Next pending event, if any.
    fn poll_event(&mut self) -> Option<CaptureEvent>;

    /// Tear down immediately without waiting for a flush.
    fn cancel(&mut self);

    fn mime_type(&self) -> &str;
}
