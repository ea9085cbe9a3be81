//! Console rendering of emitted snapshots.

use std::fmt;

use crate::book::{MetricsSnapshot, PriceLevel};

fn write_levels(f: &mut fmt::Formatter<'_>, levels: &[PriceLevel]) -> fmt::Result {
    if levels.is_empty() {
        return writeln!(f, "  (none)");
    }
    for level in levels {
        writeln!(f, "  {} x {}", level.price, level.size)?;
    }
    Ok(())
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Metrics for the period ending at {}", self.label)?;
        writeln!(f, "Buy Qty:")?;
        write_levels(f, &self.buy_levels)?;
        writeln!(f, "Sell Qty:")?;
        write_levels(f, &self.sell_levels)?;
        writeln!(f, "Total Trade Volume:")?;
        writeln!(f, "  {}", self.total_volume)?;
        writeln!(f, "VWAP:")?;
        write!(f, "  {:.4}", self.vwap)
    }
}
