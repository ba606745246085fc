//! Fixed-period tick scheduler for Cryptkeep.
//!
//! Every game runs several independent periodic tasks (position broadcast,
//! stats broadcast, monster AI, object ticking), each at its own period.
//! Each task owns one [`TickScheduler`] and loops on
//! [`TickScheduler::wait_for_tick`]:
//!
//! ```ignore
//! let mut ticks = TickScheduler::new(TickConfig::every("ai", Duration::from_millis(200)));
//! loop {
//!     ticks.wait_for_tick().await;
//!     if game.is_ended().await {
//!         break;
//!     }
//!     game.run_ai().await;
//!     ticks.record_tick_end();
//! }
//! ```
//!
//! Overruns (waking up late because the runtime was busy) are handled by a
//! [`TickPolicy`]; slow tick bodies are reported against the period budget.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one a full period
    /// from now. Broadcast tasks want this: a burst of stale snapshots is
    /// worse than a gap.
    #[default]
    Skip,
    /// Keep the original cadence; the next tick fires at its planned time
    /// (possibly immediately).
    Drop,
}

/// Configuration for one periodic task.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Name used in log fields (`"positions"`, `"ai"`, ...).
    pub label: &'static str,
    /// Time between ticks. Clamped to at least [`TickConfig::MIN_PERIOD`].
    pub period: Duration,
    pub policy: TickPolicy,
    /// Fraction of the period (0.0–1.0) a tick body may use before a
    /// warning is logged.
    pub budget_warn_threshold: f64,
    /// Upper bound of a random delay added to the first tick so tasks
    /// created together do not fire in lockstep.
    pub initial_jitter: Duration,
}

impl TickConfig {
    pub const MIN_PERIOD: Duration = Duration::from_millis(1);

    /// A task firing every `period` with default settings.
    pub fn every(label: &'static str, period: Duration) -> Self {
        Self {
            label,
            period,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.8,
            initial_jitter: Duration::from_millis(2),
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.initial_jitter = jitter;
        self
    }

    pub fn with_policy(mut self, policy: TickPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                label = self.label,
                period_us = self.period.as_micros() as u64,
                "tick period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info and metrics
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, Copy)]
pub struct TickInfo {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// The configured period.
    pub period: Duration,
    /// The tick woke up more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods skipped because of the overrun.
    pub ticks_skipped: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Longest tick body reported through `record_tick_end`.
    pub max_tick_time: Duration,
    /// Last tick body time as a fraction of the period.
    pub budget_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Drives one periodic task.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    next_tick: TokioInstant,
    /// Wall-clock start of the current tick body, consumed by
    /// `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_us = config.initial_jitter.as_micros() as u64;
            Duration::from_micros(rand::rng().random_range(0..=max_us))
        };

        debug!(
            label = config.label,
            period_ms = config.period.as_secs_f64() * 1000.0,
            jitter_us = jitter.as_micros() as u64,
            policy = ?config.policy,
            "tick scheduler created"
        );

        Self {
            next_tick: TokioInstant::now() + config.period + jitter,
            config,
            tick_count: 0,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Sleeps until the next tick is due.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let scheduled = self.next_tick;
        let period = self.config.period;
        time::sleep_until(scheduled).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(scheduled);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            label = self.config.label,
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                now + period
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        label = self.config.label,
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "tick overrun, keeping cadence"
                    );
                }
                scheduled + period
            }
        };

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(label = self.config.label, tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            period,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the current tick body and checks it against the
    /// period budget. A no-op if no tick is in progress.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / self.config.period.as_secs_f64();
        self.metrics.budget_utilization = utilization;
        self.metrics.max_tick_time = self.metrics.max_tick_time.max(elapsed);

        if utilization >= 1.0 {
            warn!(
                label = self.config.label,
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "tick exceeded its period"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                label = self.config.label,
                tick = self.tick_count,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "tick approaching budget limit"
            );
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    pub fn label(&self) -> &'static str {
        self.config.label
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
