//! Advisory anomaly tracking for feed replay.
//!
//! Replay never halts on dirty data; it absorbs the row and moves on. This
//! module keeps the record of what was absorbed: categorized, counted, and
//! exportable for offline analysis. Recording a warning is strictly
//! advisory and never changes processing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Category of anomaly, mirroring the replay error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// Message payload failed to parse (size or price text).
    MalformedMessage,

    /// A row did not have enough fields to be a message.
    MalformedRow,

    /// The message-type token was not one of add/remove/trade/replace.
    UnknownKind,

    /// A timestamp string failed to parse (aggregation skip or a message
    /// that could not drive the emission scheduler).
    UnknownTimestamp,

    /// A replace whose old reference was not resting on either side; the
    /// replacement was dropped.
    ReplaceDropped,

    /// The CSV layer failed to decode a record.
    ReadError,

    /// Other/uncategorized anomaly.
    Other,
}

impl WarningCategory {
    /// Stable name for summaries and exports.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::MalformedMessage => "MALFORMED_MESSAGE",
            WarningCategory::MalformedRow => "MALFORMED_ROW",
            WarningCategory::UnknownKind => "UNKNOWN_KIND",
            WarningCategory::UnknownTimestamp => "UNKNOWN_TIMESTAMP",
            WarningCategory::ReplaceDropped => "REPLACE_DROPPED",
            WarningCategory::ReadError => "READ_ERROR",
            WarningCategory::Other => "OTHER",
        }
    }
}

/// A single recorded anomaly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// Auto-incremented id, in recording order.
    pub id: u64,

    /// Anomaly category.
    pub category: WarningCategory,

    /// Human-readable description.
    pub message: String,

    /// Order reference involved, if any.
    pub reference: Option<String>,

    /// Raw feed timestamp text of the offending row, if known.
    pub timestamp: Option<String>,
}

/// Summary counts over all recorded warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total warnings recorded.
    pub total: u64,

    /// Count per category name.
    pub by_category: HashMap<String, u64>,
}

/// Collects anomalies during a replay session.
///
/// Stores up to `max_stored` full records (counts keep accumulating past
/// that) and optionally mirrors each record to the `log` facade as it
/// arrives.
#[derive(Debug)]
pub struct WarningTracker {
    warnings: Vec<Warning>,
    category_counts: HashMap<&'static str, u64>,
    total: u64,
    max_stored: usize,
    log_immediately: bool,
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl WarningTracker {
    /// Create a tracker with default limits (10k stored records, immediate
    /// logging on).
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            category_counts: HashMap::new(),
            total: 0,
            max_stored: 10_000,
            log_immediately: true,
        }
    }

    /// Cap the number of full warning records kept in memory.
    pub fn with_max_stored(mut self, max: usize) -> Self {
        self.max_stored = max;
        self
    }

    /// Enable/disable mirroring each warning to `log::warn!`.
    pub fn with_immediate_logging(mut self, log: bool) -> Self {
        self.log_immediately = log;
        self
    }

    /// Record an anomaly.
    pub fn record(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        reference: Option<&str>,
        timestamp: Option<&str>,
    ) {
        let message = message.into();
        self.total += 1;
        *self.category_counts.entry(category.name()).or_insert(0) += 1;

        if self.log_immediately {
            log::warn!("[{}] {}", category.name(), message);
        }

        if self.warnings.len() < self.max_stored {
            self.warnings.push(Warning {
                id: self.total,
                category,
                message,
                reference: reference.map(str::to_string),
                timestamp: timestamp.map(str::to_string),
            });
        }
    }

    /// All stored warning records.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Total warnings recorded (including those beyond the storage cap).
    pub fn total(&self) -> u64 {
        self.total
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Count for one category.
    pub fn count(&self, category: WarningCategory) -> u64 {
        self.category_counts
            .get(category.name())
            .copied()
            .unwrap_or(0)
    }

    /// Build summary counts.
    pub fn summary(&self) -> WarningSummary {
        WarningSummary {
            total: self.total,
            by_category: self
                .category_counts
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
        }
    }

    /// Export stored warnings (plus the summary) as JSON for offline
    /// analysis.
    pub fn export_to_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        #[derive(Serialize)]
        struct Export<'a> {
            summary: WarningSummary,
            warnings: &'a [Warning],
        }

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let export = Export {
            summary: self.summary(),
            warnings: &self.warnings,
        };
        serde_json::to_writer_pretty(&mut writer, &export)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        writer.flush()
    }

    /// Drop all recorded warnings and counts.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.total = 0;
    }
}
