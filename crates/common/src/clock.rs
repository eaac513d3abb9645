//! Clock and timing utilities for the playback event loop.
//!
//! The core components are sans-IO: they are advanced by explicit calls that
//! carry a monotonic timestamp in nanoseconds. This module provides:
//! - A monotonic clock anchored at session start
//! - Conversions between seconds and nanoseconds
//! - A rate controller for bounded-interval polling
//! - Overshoot measurement between a requested and an observed stop time

use std::time::Instant;

/// A monotonic clock that provides timestamps relative to a fixed epoch
/// (the moment the session started).
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// The instant the clock started.
    epoch: Instant,
}

impl MonotonicClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Get nanoseconds elapsed since the epoch.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Convert a nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }

    /// Convert seconds to nanoseconds. Negative input saturates to zero.
    pub fn secs_to_ns(secs: f64) -> u64 {
        (secs.max(0.0) * 1_000_000_000.0) as u64
    }

    /// Convert milliseconds to nanoseconds.
    pub fn ms_to_ns(ms: u64) -> u64 {
        ms.saturating_mul(1_000_000)
    }
}

/// How far past a requested boundary an observed stop landed.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryOvershoot {
    /// Requested stop position (seconds).
    pub requested_secs: f64,
    /// Position at which the stop was observed (seconds).
    pub observed_secs: f64,
}

impl BoundaryOvershoot {
    /// Overshoot in seconds (negative = stopped early).
    pub fn overshoot_secs(&self) -> f64 {
        self.observed_secs - self.requested_secs
    }

    /// Overshoot in milliseconds.
    pub fn overshoot_ms(&self) -> f64 {
        self.overshoot_secs() * 1000.0
    }

    /// Whether the overshoot exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.overshoot_ms().abs() > threshold_ms
    }
}

/// Rate controller for bounded-interval polling.
#[derive(Debug, Clone)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self::with_interval_ns(1_000_000_000 / target_hz.max(1) as u64)
    }

    /// Create a controller with an explicit interval.
    pub fn with_interval_ns(interval_ns: u64) -> Self {
        Self {
            target_interval_ns: interval_ns,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Forget the last tick so the next call fires immediately.
    pub fn reset(&mut self) {
        self.last_tick_ns = None;
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = MonotonicClock::start();
        assert!(clock.elapsed_ns() < 1_000_000_000);
    }

    #[test]
    fn test_ns_to_secs_conversion() {
        assert!((MonotonicClock::ns_to_secs(1_500_000_000) - 1.5).abs() < 1e-9);
        assert_eq!(MonotonicClock::secs_to_ns(2.0), 2_000_000_000);
        assert_eq!(MonotonicClock::secs_to_ns(-1.0), 0);
        assert_eq!(MonotonicClock::ms_to_ns(100), 100_000_000);
    }

    #[test]
    fn test_boundary_overshoot() {
        let overshoot = BoundaryOvershoot {
            requested_secs: 15.0,
            observed_secs: 15.05,
        };
        assert!((overshoot.overshoot_ms() - 50.0).abs() < 1e-6);
        assert!(overshoot.exceeds_threshold_ms(10.0));
        assert!(!overshoot.exceeds_threshold_ms(100.0));
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(10);
        assert!(ctrl.should_tick(0));
        assert!(!ctrl.should_tick(50_000_000));
        assert!(ctrl.should_tick(100_000_000));
        ctrl.reset();
        assert!(ctrl.should_tick(100_000_001));
    }
}
