//! vidtrim Render Engine
//!
//! Turns edit state into things a rendering surface or a disk can consume:
//!
//! ```text
//! FilterState ──► FilterDescriptor ──┬── css()                  (style string)
//!                                    ├── video_balance_chain()  (one videobalance per stage)
//!                                    └── apply_rgb()            (software surfaces)
//!
//! CapturedArtifact ──► save_artifact() ──► <dir>/trimmed-video.webm
//! ```

pub mod compositor;
pub mod export;

pub use compositor::*;
pub use export::*;
