//! The replay session: one sequential pass over a feed.
//!
//! Wires the pieces together exactly as the data flows: raw record →
//! normalize → `BookState::apply` → `EmissionScheduler::observe` → on
//! emission, `MetricsEngine::snapshot` → sink. Strictly single-threaded and
//! message-at-a-time; nothing here can fail mid-stream. Defective rows are
//! counted, warned about, and skipped.

use crate::book::{
    BookState, EmissionScheduler, MetricsConfig, MetricsEngine, MetricsSnapshot, SchedulerConfig,
};
use crate::error::Result;
use crate::feed::{normalize_record, FeedSource, RecordOutcome};
use crate::time;
use crate::warnings::{WarningCategory, WarningTracker};

/// Configuration for a replay session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Metric snapshot settings.
    pub metrics: MetricsConfig,

    /// Emission cadence settings.
    pub scheduler: SchedulerConfig,
}

impl SessionConfig {
    /// Set the per-side level count for snapshots.
    pub fn with_top_levels(mut self, n: usize) -> Self {
        self.metrics.top_levels = n;
        self
    }

    /// Set the emission interval in minutes.
    pub fn with_interval_minutes(mut self, minutes: i64) -> Self {
        self.scheduler.interval_minutes = minutes;
        self
    }
}

/// Counters for one session pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Raw records seen (including headers and defective rows).
    pub records: u64,

    /// Header rows skipped.
    pub headers_skipped: u64,

    /// Rows with too few fields.
    pub short_rows: u64,

    /// Rows with an unrecognized message-type token.
    pub unknown_kinds: u64,

    /// Records the CSV layer failed to decode.
    pub read_errors: u64,

    /// Messages applied to the book whose timestamp could not drive the
    /// scheduler.
    pub undated_messages: u64,

    /// Snapshots emitted.
    pub emissions: u64,
}

/// Drives a feed through the book and emits metric snapshots.
pub struct ReplaySession {
    book: BookState,
    scheduler: EmissionScheduler,
    engine: MetricsEngine,
    warnings: WarningTracker,
    stats: SessionStats,
}

impl Default for ReplaySession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl ReplaySession {
    /// Create a session with the given configuration.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            book: BookState::new(),
            scheduler: EmissionScheduler::new(config.scheduler),
            engine: MetricsEngine::new(config.metrics),
            warnings: WarningTracker::new(),
            stats: SessionStats::default(),
        }
    }

    /// Replace the warning tracker (e.g. to silence immediate logging).
    pub fn with_warning_tracker(mut self, warnings: WarningTracker) -> Self {
        self.warnings = warnings;
        self
    }

    /// Process one raw record; returns a snapshot when the scheduler fires.
    pub fn process_record(&mut self, fields: &[String]) -> Option<MetricsSnapshot> {
        self.stats.records += 1;

        let msg = match normalize_record(fields) {
            RecordOutcome::Message(msg) => msg,
            RecordOutcome::Header => {
                self.stats.headers_skipped += 1;
                return None;
            }
            RecordOutcome::Short { fields } => {
                self.stats.short_rows += 1;
                self.warnings.record(
                    WarningCategory::MalformedRow,
                    format!("record #{} has {} fields", self.stats.records, fields),
                    None,
                    None,
                );
                return None;
            }
            RecordOutcome::UnknownKind(token) => {
                self.stats.unknown_kinds += 1;
                self.warnings.record(
                    WarningCategory::UnknownKind,
                    format!("record #{}: unknown message type {token:?}", self.stats.records),
                    None,
                    None,
                );
                return None;
            }
        };

        self.book.apply(&msg);

        let instant = match time::parse_timestamp(&msg.timestamp) {
            Ok(instant) => instant,
            Err(err) => {
                // The message already mutated the book; it just cannot
                // drive the emission cadence.
                self.stats.undated_messages += 1;
                self.warnings.record(
                    WarningCategory::UnknownTimestamp,
                    format!("record #{}: {err}", self.stats.records),
                    Some(&msg.reference),
                    Some(&msg.timestamp),
                );
                return None;
            }
        };

        self.scheduler.observe(instant).map(|emission| {
            self.stats.emissions += 1;
            log::debug!(
                "emitting snapshot at {} ({:?})",
                msg.timestamp,
                emission.reason
            );
            self.engine
                .snapshot(&self.book, &msg.timestamp, Some(&emission.cutoff))
        })
    }

    /// Run the whole feed, handing each snapshot to `sink` as it is
    /// emitted. Per-record read errors are recorded and skipped.
    pub fn run<S, F>(&mut self, source: S, mut sink: F) -> Result<()>
    where
        S: FeedSource,
        F: FnMut(&MetricsSnapshot),
    {
        for record in source.records()? {
            match record {
                Ok(fields) => {
                    if let Some(snapshot) = self.process_record(&fields) {
                        sink(&snapshot);
                    }
                }
                Err(err) => {
                    self.stats.records += 1;
                    self.stats.read_errors += 1;
                    self.warnings.record(
                        WarningCategory::ReadError,
                        format!("record #{}: {err}", self.stats.records),
                        None,
                        None,
                    );
                }
            }
        }
        Ok(())
    }

    /// Run the whole feed and collect every emitted snapshot.
    pub fn run_collect<S: FeedSource>(&mut self, source: S) -> Result<Vec<MetricsSnapshot>> {
        let mut snapshots = Vec::new();
        self.run(source, |snapshot| snapshots.push(snapshot.clone()))?;
        Ok(snapshots)
    }

    /// The reconstructed book.
    pub fn book(&self) -> &BookState {
        &self.book
    }

    /// Session counters.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Recorded anomalies.
    pub fn warnings(&self) -> &WarningTracker {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::VecFeed;

    fn row(exchtime: &str, msgtype: &str, price: &str, size: &str, side: &str, r: &str) -> Vec<String> {
        vec![
            "lt".to_string(),
            exchtime.to_string(),
            msgtype.to_string(),
            "ACME".to_string(),
            "XNAS".to_string(),
            price.to_string(),
            size.to_string(),
            side.to_string(),
            r.to_string(),
            String::new(),
            String::new(),
            String::new(),
            "P1".to_string(),
        ]
    }

    fn quiet_session() -> ReplaySession {
        ReplaySession::default()
            .with_warning_tracker(WarningTracker::new().with_immediate_logging(false))
    }

    #[test]
    fn test_first_message_emits_snapshot() {
        let mut session = quiet_session();
        let snapshot = session
            .process_record(&row(
                "2023-01-11 09:30:00.000000000",
                "add",
                "10.50",
                "100",
                "B",
                "1",
            ))
            .expect("first message should emit");

        assert_eq!(snapshot.label, "2023-01-11 09:30:00.000000000");
        assert_eq!(snapshot.buy_levels.len(), 1);
        assert_eq!(session.stats().emissions, 1);
    }

    #[test]
    fn test_header_row_skipped_without_processing() {
        let mut session = quiet_session();
        let header = row("exchtime", "msgtype", "price", "size", "side", "ref");
        assert!(session.process_record(&header).is_none());
        assert_eq!(session.stats().headers_skipped, 1);
        assert_eq!(session.book().stats().messages_applied, 0);
    }

    #[test]
    fn test_short_row_counted() {
        let mut session = quiet_session();
        assert!(session
            .process_record(&["just".to_string(), "three".to_string(), "fields".to_string()])
            .is_none());
        assert_eq!(session.stats().short_rows, 1);
        assert_eq!(session.warnings().count(WarningCategory::MalformedRow), 1);
    }

    #[test]
    fn test_unparseable_timestamp_applies_but_does_not_schedule() {
        let mut session = quiet_session();
        assert!(session
            .process_record(&row("garbage", "add", "10.50", "100", "B", "1"))
            .is_none());

        assert_eq!(session.book().bid_count(), 1);
        assert_eq!(session.stats().undated_messages, 1);
        assert_eq!(session.stats().emissions, 0);
    }

    #[test]
    fn test_run_collect_cadence() {
        let rows = vec![
            row("exchtime", "msgtype", "price", "size", "side", "ref"),
            row("2023-01-11 09:30:00.000000000", "add", "10.50", "100", "B", "1"),
            row("2023-01-11 09:45:00.000000000", "add", "10.60", "50", "B", "2"),
            row("2023-01-11 10:00:00.000000000", "add", "10.70", "25", "B", "3"),
        ];

        let mut session = quiet_session();
        let snapshots = session.run_collect(VecFeed::new(rows)).unwrap();

        // First message and the 30-minute mark emit; 09:45 does not.
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].label, "2023-01-11 09:30:00.000000000");
        assert_eq!(snapshots[1].label, "2023-01-11 10:00:00.000000000");
        assert_eq!(session.stats().records, 4);
        assert_eq!(session.stats().headers_skipped, 1);
    }

    #[test]
    fn test_snapshot_windowing_uses_trailing_cutoff() {
        let rows = vec![
            row("2023-01-11 09:00:00.000000000", "add", "10.00", "100", "B", "1"),
            row("2023-01-11 10:00:00.000000000", "add", "10.50", "50", "B", "2"),
        ];

        let mut session = quiet_session();
        let snapshots = session.run_collect(VecFeed::new(rows)).unwrap();

        assert_eq!(snapshots.len(), 2);
        // Second snapshot windows at 09:30; the 09:00 order is outside it.
        assert_eq!(snapshots[1].buy_levels.len(), 1);
        assert_eq!(snapshots[1].buy_levels[0].size, 50);
    }
}
