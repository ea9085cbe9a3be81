//! Emission scheduling for periodic metric snapshots.
//!
//! A pure decision function over the stream of message timestamps. The
//! cursor is `(last emitted instant, last emitted calendar date)`; it only
//! advances when an emission fires, so the elapsed-interval rule measures
//! from the previous emission, not the previous message.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::time;

/// Default emission interval in minutes.
pub const DEFAULT_INTERVAL_MINUTES: i64 = 30;

/// Configuration for the emission scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Elapsed-time threshold between emissions; also the trailing-window
    /// length handed to level aggregation.
    pub interval_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_INTERVAL_MINUTES,
        }
    }
}

impl SchedulerConfig {
    /// Set the interval in minutes.
    pub fn with_interval_minutes(mut self, minutes: i64) -> Self {
        self.interval_minutes = minutes;
        self
    }
}

/// Why an emission fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionReason {
    /// First message ever observed.
    FirstMessage,

    /// The calendar date (source-local) differs from the last emission's.
    DayRollover,

    /// At least the configured interval elapsed since the last emission.
    IntervalElapsed,
}

/// A decision to emit, with the trailing-window cutoff for the level query.
///
/// The cutoff is always `triggered_at - interval`, independent of which
/// rule fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Instant of the triggering message.
    pub triggered_at: NaiveDateTime,

    /// Earliest timestamp still inside the trailing window.
    pub cutoff: NaiveDateTime,

    /// The rule that fired.
    pub reason: EmissionReason,
}

/// Decides when to snapshot metrics from the message timestamp stream.
#[derive(Debug, Clone)]
pub struct EmissionScheduler {
    config: SchedulerConfig,
    last_instant: Option<NaiveDateTime>,
    last_date: Option<NaiveDate>,
    emissions: u64,
}

impl Default for EmissionScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl EmissionScheduler {
    /// Create a scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            last_instant: None,
            last_date: None,
            emissions: 0,
        }
    }

    /// Observe one message instant; returns `Some(Emission)` when a
    /// snapshot should be taken, advancing the cursor.
    pub fn observe(&mut self, instant: NaiveDateTime) -> Option<Emission> {
        let date = time::calendar_date(instant);

        let reason = match (self.last_instant, self.last_date) {
            (None, _) => EmissionReason::FirstMessage,
            (Some(_), Some(last_date)) if date != last_date => EmissionReason::DayRollover,
            (Some(last_instant), _)
                if instant - last_instant >= Duration::minutes(self.config.interval_minutes) =>
            {
                EmissionReason::IntervalElapsed
            }
            _ => return None,
        };

        self.last_instant = Some(instant);
        self.last_date = Some(date);
        self.emissions += 1;

        Some(Emission {
            triggered_at: instant,
            cutoff: time::window_cutoff(instant, self.config.interval_minutes),
            reason,
        })
    }

    /// Instant of the last emission, if any.
    pub fn last_emitted(&self) -> Option<NaiveDateTime> {
        self.last_instant
    }

    /// Total emissions so far.
    pub fn emissions(&self) -> u64 {
        self.emissions
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.last_instant = None;
        self.last_date = None;
        self.emissions = 0;
    }
}
