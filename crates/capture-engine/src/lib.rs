//! vidtrim Capture Engine
//!
//! Turns a loaded source, a trim window, and a filter into one encoded
//! artifact. An edit session owns the playback clock, the scrubber, the
//! preview mirror, and the exporter, and advances them from a single
//! event loop.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  EditSession                   │
//! │  ┌──────────┐ ┌──────────┐ ┌────────────────┐ │
//! │  │ Scrubber │ │ Preview  │ │ CaptureExporter│ │
//! │  │ Sync     │ │ Mirror   │ │                │ │
//! │  └─────┬────┘ └─────┬────┘ └───────┬────────┘ │
//! │        │            │              │          │
//! │        ▼            ▼              ▼          │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │    PlaybackClock ─► primary surface     │  │
//! │  │    balance ─► tee ─► display / capture  │  │
//! │  └─────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod driver;
pub mod exporter;
pub mod pipeline;
pub mod session;

pub use driver::{DriverConfig, Pace, SessionDriver};
pub use exporter::{CaptureExporter, ExportEvent, ExportState, TriggerOutcome};
pub use session::*;
