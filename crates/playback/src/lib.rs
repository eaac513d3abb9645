//! vidtrim Playback
//!
//! Everything that keeps the rendering surfaces and the scrubber in step:
//!
//! ```text
//!                 drag(position)                tick()
//!   ScrubberSync ───────────────► PlaybackClock ◄──────── ScrubberSync
//!        │                           │  seek / play / pause
//!        │ position                  ▼
//!        ▼                     primary RenderSurface ──► CaptureStream
//!   PreviewMirror ──► secondary RenderSurface (muted)
//! ```
//!
//! All types are single-threaded and advanced by explicit calls from one
//! event loop. Surfaces are trait objects so the same logic drives GStreamer
//! pipelines and the deterministic [`sim::SimulatedSurface`].

pub mod clock;
pub mod preview;
pub mod scrubber;
pub mod sim;
pub mod surface;

pub use clock::{PlaybackClock, WatchId};
pub use preview::PreviewMirror;
pub use scrubber::ScrubberSync;
pub use surface::{CaptureEvent, CaptureFormat, CaptureStream, RenderSurface};
