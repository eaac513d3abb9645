//! Async event loop that advances an [`EditSession`] on a fixed cadence.

use std::time::Duration;

use vidtrim_common::clock::MonotonicClock;
use vidtrim_common::config::PlaybackDefaults;
use vidtrim_common::error::{VidtrimError, VidtrimResult};
use vidtrim_edit_model::artifact::CapturedArtifact;

use crate::exporter::{ExportEvent, TriggerOutcome};
use crate::session::EditSession;

/// How the driver measures time.
#[derive(Debug, Clone, Copy)]
pub enum Pace {
    /// Sleep between ticks and read a monotonic clock.
    RealTime,
    /// Advance a virtual clock by `step` per tick without sleeping.
    Simulated { step: Duration },
}

/// Loop parameters.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub tick_interval: Duration,
    pub metadata_timeout: Duration,
    /// Upper bound on an export, on top of the window length.
    pub export_grace: Duration,
}

impl From<&PlaybackDefaults> for DriverConfig {
    fn from(defaults: &PlaybackDefaults) -> Self {
        Self {
            tick_interval: Duration::from_millis(defaults.tick_interval_ms.max(1)),
            metadata_timeout: Duration::from_secs(10),
            export_grace: Duration::from_secs(10),
        }
    }
}

type TickHook = Box<dyn FnMut(f64)>;

/// Drives a session from a tokio task.
pub struct SessionDriver {
    config: DriverConfig,
    pace: Pace,
    clock: MonotonicClock,
    virtual_ns: u64,
    last_ns: u64,
    hooks: Vec<TickHook>,
}

impl SessionDriver {
    pub fn new(config: DriverConfig, pace: Pace) -> Self {
        Self {
            config,
            pace,
            clock: MonotonicClock::start(),
            virtual_ns: 0,
            last_ns: 0,
            hooks: Vec::new(),
        }
    }

    /// Run `hook` before every session tick with the elapsed seconds since
    /// the previous tick.
    pub fn on_tick(mut self, hook: impl FnMut(f64) + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Tick until the source's metadata is decoded. Returns the duration.
    pub async fn wait_for_metadata(&mut self, session: &mut EditSession) -> VidtrimResult<f64> {
        if session.source().is_none() {
            return Err(VidtrimError::playback("No source loaded"));
        }
        let deadline = self.now_ns() + duration_ns(self.config.metadata_timeout);
        let mut interval = tokio::time::interval(self.config.tick_interval);

        while !session.has_metadata() {
            let now_ns = self.next_tick(&mut interval).await;
            session.tick(now_ns)?;
            if now_ns >= deadline && !session.has_metadata() {
                return Err(VidtrimError::playback(format!(
                    "Metadata not available after {:?}",
                    self.config.metadata_timeout
                )));
            }
        }
        Ok(session.duration())
    }

    /// Trigger an export and tick until it completes.
    ///
    /// Returns `Ok(None)` when nothing is loaded. The export is aborted if it
    /// exceeds the window length plus the configured grace period.
    pub async fn run_export(
        &mut self,
        session: &mut EditSession,
    ) -> VidtrimResult<Option<CapturedArtifact>> {
        let window = match session.trigger_export()? {
            TriggerOutcome::Started { window } => window,
            TriggerOutcome::NoSource => return Ok(None),
        };

        let budget = Duration::from_secs_f64(window.length()) + self.config.export_grace;
        let deadline = self.now_ns() + duration_ns(budget);
        let mut interval = tokio::time::interval(self.config.tick_interval);

        loop {
            let now_ns = self.next_tick(&mut interval).await;
            match session.tick(now_ns)? {
                Some(ExportEvent::Completed(artifact)) => return Ok(Some(artifact)),
                Some(ExportEvent::Finalizing { stop_position_secs }) => {
                    tracing::info!(stop_position_secs, "Window recorded; finalizing");
                }
                None => {}
            }
            if now_ns >= deadline {
                session.abort_export();
                return Err(VidtrimError::capture(format!(
                    "Export did not finish within {budget:?}"
                )));
            }
        }
    }

    fn now_ns(&self) -> u64 {
        match self.pace {
            Pace::RealTime => self.clock.elapsed_ns(),
            Pace::Simulated { .. } => self.virtual_ns,
        }
    }

    async fn next_tick(&mut self, interval: &mut tokio::time::Interval) -> u64 {
        match self.pace {
            Pace::RealTime => {
                interval.tick().await;
            }
            Pace::Simulated { step } => {
                tokio::task::yield_now().await;
                self.virtual_ns = self.virtual_ns.saturating_add(duration_ns(step));
            }
        }

        let now_ns = self.now_ns();
        let dt = MonotonicClock::ns_to_secs(now_ns.saturating_sub(self.last_ns));
        self.last_ns = now_ns;
        for hook in &mut self.hooks {
            hook(dt);
        }
        now_ns
    }
}

fn duration_ns(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
