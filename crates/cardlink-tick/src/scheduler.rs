//! Fixed-rate consumer tick.
//!
//! The client's consumer loop wakes once per tick, drains its dispatch
//! queues, and advances the match engine's timeline by a fixed `dt`. Using
//! a fixed step (rather than measured wall-clock time) keeps board delays
//! reproducible in tests.

use std::time::{Duration, Instant};

use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when the consumer wakes up late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one from now.
    #[default]
    Skip,
    /// Keep the original cadence; the next tick fires at its planned time
    /// (possibly immediately).
    Drop,
}

/// Configuration for [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Ticks per second, `1..=240`.
    pub tick_rate_hz: u32,
    pub policy: TickPolicy,
    /// Warn when a tick's work uses more than this fraction of its budget.
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: Self::DEFAULT_TICK_RATE_HZ,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
        }
    }
}

impl TickConfig {
    pub const DEFAULT_TICK_RATE_HZ: u32 = 60;
    pub const MIN_TICK_RATE_HZ: u32 = 1;
    pub const MAX_TICK_RATE_HZ: u32 = 240;

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self {
            tick_rate_hz,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values, logging a warning for each one fixed.
    ///
    /// [`TickScheduler::new`] calls this, so a scheduler never runs with
    /// a zero rate or a nonsensical threshold.
    pub fn validated(mut self) -> Self {
        let clamped = self
            .tick_rate_hz
            .clamp(Self::MIN_TICK_RATE_HZ, Self::MAX_TICK_RATE_HZ);
        if clamped != self.tick_rate_hz {
            warn!(
                requested = self.tick_rate_hz,
                used = clamped,
                "tick_rate_hz out of range, clamping"
            );
            self.tick_rate_hz = clamped;
        }
        if !(0.0..=1.0).contains(&self.budget_warn_threshold) {
            warn!(
                requested = self.budget_warn_threshold,
                "budget_warn_threshold out of range, clamping"
            );
            self.budget_warn_threshold = if self.budget_warn_threshold.is_nan() {
                0.80
            } else {
                self.budget_warn_threshold.clamp(0.0, 1.0)
            };
        }
        self
    }

    /// Length of one tick. Assumes a validated (non-zero) rate.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz.max(1) as f64)
    }
}

// ---------------------------------------------------------------------------
// Per-tick info and counters
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Starts at 1.
    pub tick: u64,
    /// Fixed step to advance timers by. Always `1 / tick_rate_hz`.
    pub dt: Duration,
    /// The tick fired more than 10% of a step late.
    pub overrun: bool,
    /// Whole ticks lost to the overrun (always 0 under [`TickPolicy::Drop`]).
    pub ticks_skipped: u64,
}

/// Running totals since the scheduler was created.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickStats {
    pub overruns: u64,
    pub skipped: u64,
    /// Last tick's work divided by the tick budget.
    pub last_utilization: f64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Paces the consumer loop.
pub struct TickScheduler {
    config: TickConfig,
    tick_duration: Duration,
    tick_count: u64,
    next_tick: TokioInstant,
    /// Set when a tick fires, taken by [`record_tick_end`](Self::record_tick_end).
    work_started: Option<Instant>,
    paused: bool,
    stats: TickStats,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        let tick_duration = config.tick_duration();

        debug!(
            rate_hz = config.tick_rate_hz,
            budget_ms = tick_duration.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "consumer tick created"
        );

        Self {
            config,
            tick_duration,
            tick_count: 0,
            next_tick: TokioInstant::now() + tick_duration,
            work_started: None,
            paused: false,
            stats: TickStats::default(),
        }
    }

    pub fn with_rate(tick_rate_hz: u32) -> Self {
        Self::new(TickConfig::with_rate(tick_rate_hz))
    }

    /// Sleeps until the next tick is due. Never resolves while paused.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }
        let due = self.next_tick;
        let step = self.tick_duration;
        time::sleep_until(due).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.work_started = Some(Instant::now());

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > step / 10;
        let mut ticks_skipped = 0;

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / step.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "consumer fell behind, skipping ticks"
                        );
                    }
                }
                now + step
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick_count,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "consumer tick late"
                    );
                }
                due + step
            }
        };

        self.stats.skipped += ticks_skipped;
        if overrun {
            self.stats.overruns += 1;
        }

        trace!(tick = self.tick_count, overrun, "tick");

        TickInfo {
            tick: self.tick_count,
            dt: step,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the consumer's work for the current tick.
    ///
    /// Warns past `budget_warn_threshold`. A call without a preceding
    /// [`wait_for_tick`](Self::wait_for_tick) does nothing.
    pub fn record_tick_end(&mut self) {
        let Some(started) = self.work_started.take() else {
            return;
        };
        let elapsed = started.elapsed();
        let utilization = elapsed.as_secs_f64() / self.tick_duration.as_secs_f64();
        self.stats.last_utilization = utilization;

        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                budget_ms = self.tick_duration.as_secs_f64() * 1000.0,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "consumer tick near or over budget"
            );
        }
    }

    /// Stops ticking until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if !self.paused {
            debug!(tick = self.tick_count, "consumer tick paused");
        }
        self.paused = true;
    }

    /// The next tick is one step from now; time spent paused is not late.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_tick = TokioInstant::now() + self.tick_duration;
            debug!(tick = self.tick_count, "consumer tick resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.config.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}
