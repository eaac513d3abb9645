//! vidtrim Edit Model
//!
//! Defines the data contracts of an editing session:
//! - **Source:** the loaded video, referenced through a revocable blob handle
//! - **TrimWindow:** the `[start, end]` range selected for export
//! - **FilterState:** brightness, saturation, and contrast multipliers
//! - **ScrubPosition:** the normalized `[0, 100]` scrubber handle
//! - **CapturedArtifact:** the encoded result of an export
//!
//! All values clamp at the point of mutation; nothing in this crate rejects
//! out-of-range input.

pub mod artifact;
pub mod blob;
pub mod filter;
pub mod scrub;
pub mod source;
pub mod window;

pub use artifact::*;
pub use blob::*;
pub use filter::*;
pub use scrub::*;
pub use source::*;
pub use window::*;
