//! Derived metrics over a reconstructed book.
//!
//! All computations here are read-only traversals of `BookState`. Price
//! levels are grouped through a `BTreeMap` so ordering falls out of the
//! sorted keys (ask side takes the smallest prices ascending, bid side the
//! largest descending) and truncation to the top N is a plain `take`.
//!
//! Two aggregation rules are deliberate reproductions of the upstream
//! implementation rather than obvious choices:
//!
//! 1. An order whose reference is in the removed set is excluded, which
//!    means a partially filled order (still resting, but marked) vanishes
//!    from the levels. See DESIGN.md for the recorded decision.
//! 2. `total_trade_volume` and `vwap` always cover the entire trade log,
//!    even when the level query in the same report is windowed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::book::state::BookState;
use crate::time;
use crate::types::{Price, Side};

/// Default number of price levels per side in a snapshot.
pub const DEFAULT_TOP_LEVELS: usize = 5;

/// Configuration for metric snapshots.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Number of aggregated price levels per side.
    pub top_levels: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            top_levels: DEFAULT_TOP_LEVELS,
        }
    }
}

impl MetricsConfig {
    /// Set the per-side level count.
    pub fn with_top_levels(mut self, n: usize) -> Self {
        self.top_levels = n;
        self
    }
}

/// Aggregated resting size at a single price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub size: u64,
}

/// One emitted report: top levels per side, total traded volume, VWAP,
/// labeled with the triggering timestamp text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Raw feed timestamp of the message that triggered the emission.
    pub label: String,

    /// Best bid levels, highest price first.
    pub buy_levels: Vec<PriceLevel>,

    /// Best ask levels, lowest price first.
    pub sell_levels: Vec<PriceLevel>,

    /// Total traded volume over the whole session (never windowed).
    pub total_volume: u64,

    /// Volume-weighted average price over the whole session; `0.0` when no
    /// trades have printed.
    pub vwap: f64,
}

/// Computes metrics from a `BookState` without mutating it.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: MetricsConfig,
}

impl MetricsEngine {
    /// Create an engine with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// The configured per-side level count.
    pub fn top_levels(&self) -> usize {
        self.config.top_levels
    }

    /// Top `n` aggregated price levels on one side.
    ///
    /// Ask side: the `n` numerically smallest prices, ascending. Bid side:
    /// the `n` numerically largest, descending. Fewer than `n` groups
    /// returns them all.
    ///
    /// Orders whose reference has been retired are excluded. Every order's
    /// timestamp is parsed; a parse failure skips that order for this pass
    /// only (logged, never fatal). With a `cutoff`, orders strictly earlier
    /// than it are excluded as well.
    pub fn top_price_levels(
        &self,
        book: &BookState,
        side: Side,
        n: usize,
        cutoff: Option<&NaiveDateTime>,
    ) -> Vec<PriceLevel> {
        let mut groups: BTreeMap<Price, u64> = BTreeMap::new();

        for (reference, order) in book.side(side) {
            let instant = match time::parse_timestamp(&order.timestamp) {
                Ok(instant) => instant,
                Err(err) => {
                    log::warn!("skipping {side} order {reference} in aggregation: {err}");
                    continue;
                }
            };
            if book.is_removed(reference) {
                continue;
            }
            if let Some(cutoff) = cutoff {
                if instant < *cutoff {
                    continue;
                }
            }
            *groups.entry(order.price).or_insert(0) += order.size;
        }

        let level = |(&price, &size): (&Price, &u64)| PriceLevel { price, size };
        match side {
            Side::Ask => groups.iter().take(n).map(level).collect(),
            Side::Bid => groups.iter().rev().take(n).map(level).collect(),
        }
    }

    /// Sum of sizes over the entire trade log. Intentionally not windowed,
    /// even when level queries in the same report are.
    pub fn total_trade_volume(&self, book: &BookState) -> u64 {
        book.trades().iter().map(|t| t.size).sum()
    }

    /// Volume-weighted average price over the entire trade log. Returns
    /// `0.0` on an empty log (guard, not an error).
    pub fn vwap(&self, book: &BookState) -> f64 {
        let total_volume = self.total_trade_volume(book);
        if total_volume == 0 {
            return 0.0;
        }
        let total_value: f64 = book
            .trades()
            .iter()
            .map(|t| t.price.to_f64() * t.size as f64)
            .sum();
        total_value / total_volume as f64
    }

    /// Assemble a full snapshot for one emission.
    pub fn snapshot(
        &self,
        book: &BookState,
        label: &str,
        cutoff: Option<&NaiveDateTime>,
    ) -> MetricsSnapshot {
        let n = self.config.top_levels;
        MetricsSnapshot {
            label: label.to_string(),
            buy_levels: self.top_price_levels(book, Side::Bid, n, cutoff),
            sell_levels: self.top_price_levels(book, Side::Ask, n, cutoff),
            total_volume: self.total_trade_volume(book),
            vwap: self.vwap(book),
        }
    }
}
