//! Two-way binding between the scrubber and the playback clock.
//!
//! Two paths write the scrub position:
//! - **drag:** the user moves the handle; the clock seeks to match.
//! - **tick:** while playing, the clock's time is projected back onto the
//!   handle.
//!
//! Seeks settle asynchronously, so a tick right after a drag would read the
//! pre-seek time and snap the handle back. A drag therefore leaves a pending
//! target behind, and ticks are suppressed until the clock reports a time
//! near that target or the settle budget runs out.

use vidtrim_common::config::PlaybackDefaults;
use vidtrim_edit_model::scrub::ScrubPosition;
use vidtrim_edit_model::window::TrimWindow;

use crate::clock::PlaybackClock;

#[derive(Debug, Clone, Copy)]
struct PendingSeek {
    target_secs: f64,
    ticks_left: u32,
}

/// Keeps [`ScrubPosition`] and [`PlaybackClock::current_time`] consistent.
#[derive(Debug, Clone)]
pub struct ScrubberSync {
    position: ScrubPosition,
    window_secs: f64,
    settle_tolerance_secs: f64,
    settle_max_ticks: u32,
    pending: Option<PendingSeek>,
}

impl ScrubberSync {
    pub fn new(defaults: &PlaybackDefaults, window_secs: f64) -> Self {
        Self {
            position: ScrubPosition::MIN,
            window_secs,
            settle_tolerance_secs: defaults.seek_settle_tolerance_secs.max(0.0),
            settle_max_ticks: defaults.seek_settle_max_ticks,
            pending: None,
        }
    }

    pub fn position(&self) -> ScrubPosition {
        self.position
    }

    /// Scrubbing is disabled while the duration is unknown or zero.
    pub fn is_enabled(&self, clock: &PlaybackClock) -> bool {
        clock.duration() > 0.0
    }

    /// Whether a drag is still waiting for its seek to settle.
    pub fn has_pending_seek(&self) -> bool {
        self.pending.is_some()
    }

    /// User-drag path: move the handle, seek the clock, and derive the
    /// default trim window starting at the new time.
    ///
    /// Returns `None` (and leaves the handle at its current value) when
    /// scrubbing is disabled.
    pub fn drag(&mut self, position: f64, clock: &mut PlaybackClock) -> Option<TrimWindow> {
        if !self.is_enabled(clock) {
            return None;
        }
        let duration = clock.duration();
        self.position = ScrubPosition::new(position);
        let time = self.position.to_time(duration);
        let target = clock.seek(time)?;

        self.pending = Some(PendingSeek {
            target_secs: target,
            ticks_left: self.settle_max_ticks,
        });

        tracing::debug!(position = self.position.value(), time = target, "Scrubber dragged");
        Some(TrimWindow::from_start(target, self.window_secs, duration))
    }

    /// Playback-tick path: project the clock's time onto the handle.
    ///
    /// Returns the new position when it was overwritten.
    pub fn tick(&mut self, clock: &PlaybackClock) -> Option<ScrubPosition> {
        if !self.is_enabled(clock) {
            return None;
        }
        let current = clock.current_time()?;

        if let Some(pending) = self.pending.as_mut() {
            let settled = (current - pending.target_secs).abs() <= self.settle_tolerance_secs;
            if !settled && pending.ticks_left > 0 {
                pending.ticks_left -= 1;
                return None;
            }
            if !settled {
                tracing::debug!(
                    target = pending.target_secs,
                    current,
                    "Seek did not settle within budget; resuming tick sync"
                );
            }
            self.pending = None;
        }

        self.position = ScrubPosition::from_time(current, clock.duration())?;
        Some(self.position)
    }

    /// Back to the start; used when a new source is loaded or metadata
    /// arrives.
    pub fn reset(&mut self) {
        self.position = ScrubPosition::MIN;
        self.pending = None;
    }
}
