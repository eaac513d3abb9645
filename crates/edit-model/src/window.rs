//! Trim window selection.

use serde::{Deserialize, Serialize};

/// Default length of a window derived from a start position (seconds).
pub const DEFAULT_WINDOW_SECS: f64 = 10.0;

/// The `[start, end]` range selected for export, in seconds.
///
/// Invariant: `0 <= start <= end`, and both lie within the content duration
/// whenever the window was built through one of the clamping constructors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    start: f64,
    end: f64,
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: DEFAULT_WINDOW_SECS,
        }
    }
}

impl TrimWindow {
    /// Build a window clamped to `[0, duration]` with `start <= end`.
    pub fn clamped(start: f64, end: f64, duration: f64) -> Self {
        let duration = sanitize(duration);
        let start = sanitize(start).min(duration);
        let end = sanitize(end).clamp(start, duration);
        Self { start, end }
    }

    /// A window of `length` seconds beginning at `start`, cut at `duration`.
    pub fn from_start(start: f64, length: f64, duration: f64) -> Self {
        let start = sanitize(start);
        Self::clamped(start, start + sanitize(length), duration)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the window covers no time at all.
    pub fn is_empty(&self) -> bool {
        self.length() <= 0.0
    }

    /// Replace the start, pulling `end` along if it would fall behind.
    pub fn with_start(self, start: f64, duration: f64) -> Self {
        let duration = sanitize(duration);
        let start = sanitize(start).min(duration);
        Self {
            start,
            end: self.end.clamp(start, duration.max(start)),
        }
    }

    /// Replace the end, never letting it precede `start`.
    pub fn with_end(self, end: f64, duration: f64) -> Self {
        let duration = sanitize(duration);
        let start = self.start.min(duration);
        Self {
            start,
            end: sanitize(end).clamp(start, duration),
        }
    }

    /// Re-clamp to a (possibly new) duration.
    pub fn fit_to(self, duration: f64) -> Self {
        Self::clamped(self.start, self.end, duration)
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_start_cuts_at_duration() {
        let window = TrimWindow::from_start(15.0, DEFAULT_WINDOW_SECS, 30.0);
        assert_eq!(window, TrimWindow::clamped(15.0, 25.0, 30.0));

        let tail = TrimWindow::from_start(25.0, DEFAULT_WINDOW_SECS, 30.0);
        assert_eq!(tail.start(), 25.0);
        assert_eq!(tail.end(), 30.0);
    }

    #[test]
    fn end_before_start_collapses() {
        let window = TrimWindow::clamped(12.0, 4.0, 30.0);
        assert_eq!(window.start(), 12.0);
        assert_eq!(window.end(), 12.0);
        assert!(window.is_empty());
    }

    #[test]
    fn with_start_pushes_end_forward() {
        let window = TrimWindow::clamped(5.0, 15.0, 30.0).with_start(20.0, 30.0);
        assert_eq!(window.start(), 20.0);
        assert_eq!(window.end(), 20.0);
    }

    #[test]
    fn with_end_clamps_to_duration() {
        let window = TrimWindow::clamped(5.0, 15.0, 30.0).with_end(99.0, 30.0);
        assert_eq!(window.end(), 30.0);
    }

    #[test]
    fn default_window_fits_short_content() {
        let window = TrimWindow::default().fit_to(4.0);
        assert_eq!(window.start(), 0.0);
        assert_eq!(window.end(), 4.0);
    }

    proptest! {
        #[test]
        fn clamped_window_respects_bounds(
            start in -50.0f64..200.0,
            end in -50.0f64..200.0,
            duration in 0.0f64..120.0,
        ) {
            let window = TrimWindow::clamped(start, end, duration);
            prop_assert!(window.start() >= 0.0);
            prop_assert!(window.start() <= window.end());
            prop_assert!(window.end() <= duration);
        }
    }
}
