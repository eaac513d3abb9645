//! Normalized scrubber position.

use serde::{Deserialize, Serialize};

/// Scrubber handle position in `[0, 100]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct ScrubPosition(f64);

impl ScrubPosition {
    pub const MIN: ScrubPosition = ScrubPosition(0.0);
    pub const MAX: ScrubPosition = ScrubPosition(100.0);

    /// Clamp into `[0, 100]`; non-finite input maps to 0.
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            Self(value.clamp(0.0, 100.0))
        } else {
            Self::MIN
        }
    }

    /// Project a playback time onto the scrubber. `None` when `duration` is 0.
    pub fn from_time(time_secs: f64, duration_secs: f64) -> Option<Self> {
        if !has_duration(duration_secs) {
            return None;
        }
        Some(Self::new(time_secs / duration_secs * 100.0))
    }

    /// Time corresponding to this position for the given duration.
    pub fn to_time(self, duration_secs: f64) -> f64 {
        if !has_duration(duration_secs) {
            return 0.0;
        }
        self.0 / 100.0 * duration_secs
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

fn has_duration(duration_secs: f64) -> bool {
    duration_secs.is_finite() && duration_secs > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_duration_has_no_projection() {
        assert_eq!(ScrubPosition::from_time(3.0, 0.0), None);
        assert_eq!(ScrubPosition::new(50.0).to_time(0.0), 0.0);
    }

    #[test]
    fn midpoint_of_thirty_seconds() {
        assert!((ScrubPosition::new(50.0).to_time(30.0) - 15.0).abs() < 1e-9);
        assert_eq!(ScrubPosition::from_time(15.0, 30.0), Some(ScrubPosition::new(50.0)));
    }

    #[test]
    fn out_of_range_clamps() {
        assert_eq!(ScrubPosition::new(140.0), ScrubPosition::MAX);
        assert_eq!(ScrubPosition::new(-3.0), ScrubPosition::MIN);
        assert_eq!(ScrubPosition::new(f64::INFINITY), ScrubPosition::MIN);
    }

    proptest! {
        #[test]
        fn time_projection_round_trips(position in 0.0f64..=100.0, duration in 0.1f64..7200.0) {
            let time = ScrubPosition::new(position).to_time(duration);
            prop_assert!((time - position / 100.0 * duration).abs() < 1e-9);
            let back = ScrubPosition::from_time(time, duration).unwrap();
            prop_assert!((back.value() - position).abs() < 1e-6);
        }
    }
}
