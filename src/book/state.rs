//! Two-sided book state driven by feed messages.
//!
//! `BookState` owns the resting-order maps for both sides, the
//! removed-reference set, and the append-only trade log. `apply` is the
//! single mutation point: one message in, one state transition out, no
//! errors raised. Malformed payloads discard the whole message; references
//! that cannot be found degrade to no-ops. The caller owns the value; there
//! is no process-wide book.

use ahash::AHashSet;
use indexmap::IndexMap;

use crate::types::{FeedMessage, MessageKind, Order, Price, Side, TradeRecord};

/// Counters for monitoring a replay (what was applied, what was absorbed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookStats {
    /// Messages that produced a state transition (including tolerated
    /// no-ops like duplicate cancels).
    pub messages_applied: u64,

    /// Messages discarded whole because size or price text failed to parse.
    pub malformed_discarded: u64,

    /// Adds ignored because the side token was missing or unrecognized.
    pub sideless_adds: u64,

    /// Trades that reduced a resting order without consuming it.
    pub partial_fills: u64,

    /// Trades that consumed a resting order entirely.
    pub full_fills: u64,

    /// Removes/trades whose reference was not resting on the stated side.
    pub missing_references: u64,

    /// Replaces dropped because the old reference was not resting on
    /// either side. The replacement order is NOT inserted.
    pub replaces_dropped: u64,
}

/// A reconstructed two-sided limit order book.
///
/// Side maps preserve arrival order (the upstream feed semantics); the
/// removed set grows monotonically and marks every reference the feed has
/// retired, whether or not the order is still physically present (see
/// `apply_trade` for the partial-fill case).
#[derive(Debug, Clone, Default)]
pub struct BookState {
    /// Resting bid orders by reference.
    bids: IndexMap<String, Order>,

    /// Resting ask orders by reference.
    asks: IndexMap<String, Order>,

    /// Every reference retired by cancel, trade, or replace. Never blocks
    /// a later add under the same id.
    removed: AHashSet<String>,

    /// Trade prints in feed order, never re-sorted.
    trades: Vec<TradeRecord>,

    stats: BookStats,
}

impl BookState {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one feed message.
    ///
    /// This is a pure state transition: no side effects beyond mutation,
    /// no errors. A message whose size (or price, for the kinds that carry
    /// one) fails to parse is discarded with no state change at all.
    pub fn apply(&mut self, msg: &FeedMessage) {
        let Ok(size) = msg.size.trim().parse::<u64>() else {
            self.stats.malformed_discarded += 1;
            log::debug!(
                "discarding {} message ref={}: unparseable size {:?}",
                msg.kind,
                msg.reference,
                msg.size
            );
            return;
        };

        match msg.kind {
            MessageKind::Add => {
                let Some(price) = Price::from_text(&msg.price) else {
                    return self.discard_bad_price(msg);
                };
                self.apply_add(msg, price, size);
            }
            MessageKind::Remove => self.apply_remove(msg),
            MessageKind::Trade => {
                let Some(price) = Price::from_text(&msg.price) else {
                    return self.discard_bad_price(msg);
                };
                self.apply_trade(msg, price, size);
            }
            MessageKind::Replace => {
                let Some(price) = Price::from_text(&msg.price) else {
                    return self.discard_bad_price(msg);
                };
                self.apply_replace(msg, price, size);
            }
        }

        self.stats.messages_applied += 1;
    }

    fn discard_bad_price(&mut self, msg: &FeedMessage) {
        self.stats.malformed_discarded += 1;
        log::debug!(
            "discarding {} message ref={}: unparseable price {:?}",
            msg.kind,
            msg.reference,
            msg.price
        );
    }

    /// Insert a resting order, overwriting any prior live order under the
    /// same reference on that side.
    fn apply_add(&mut self, msg: &FeedMessage, price: Price, size: u64) {
        let order = Order {
            reference: msg.reference.clone(),
            price,
            size,
            timestamp: msg.timestamp.clone(),
        };
        match msg.side {
            Some(Side::Bid) => {
                self.bids.insert(msg.reference.clone(), order);
            }
            Some(Side::Ask) => {
                self.asks.insert(msg.reference.clone(), order);
            }
            None => {
                self.stats.sideless_adds += 1;
                log::debug!("add ref={} has no usable side; ignored", msg.reference);
            }
        }
    }

    /// Mark the reference removed and delete it from the stated side if
    /// present. Duplicate and late cancels are tolerated no-ops.
    fn apply_remove(&mut self, msg: &FeedMessage) {
        self.removed.insert(msg.reference.clone());
        let deleted = match msg.side {
            Some(Side::Bid) => self.bids.shift_remove(&msg.reference).is_some(),
            Some(Side::Ask) => self.asks.shift_remove(&msg.reference).is_some(),
            None => false,
        };
        if !deleted {
            self.stats.missing_references += 1;
        }
    }

    /// Record the trade print and work the fill into the resting order.
    ///
    /// The print is appended unconditionally: trade messages are
    /// authoritative even when the referenced order was never visible in
    /// the book. The reference is marked removed in every case. A partial
    /// fill decrements the resting size and leaves the order in the side
    /// map, with its reference in the removed set. That combination is the
    /// upstream feed's own bookkeeping and is preserved verbatim; the
    /// aggregation layer decides what it means (see `metrics`).
    fn apply_trade(&mut self, msg: &FeedMessage, price: Price, size: u64) {
        self.trades.push(TradeRecord {
            timestamp: msg.timestamp.clone(),
            price,
            size,
        });
        self.removed.insert(msg.reference.clone());

        let side_map = match msg.side {
            Some(Side::Bid) => &mut self.bids,
            Some(Side::Ask) => &mut self.asks,
            None => return,
        };

        match side_map.get_mut(&msg.reference) {
            Some(resting) if size >= resting.size => {
                side_map.shift_remove(&msg.reference);
                self.stats.full_fills += 1;
            }
            Some(resting) => {
                resting.size -= size;
                self.stats.partial_fills += 1;
            }
            None => {
                self.stats.missing_references += 1;
            }
        }
    }

    /// Retire the old reference and insert the replacement on whichever
    /// side the old reference was resting (bid side checked first). If the
    /// old reference is not resting anywhere, the replacement is dropped:
    /// no new order is inserted. That is the upstream behavior, preserved
    /// deliberately and counted so it can be audited.
    fn apply_replace(&mut self, msg: &FeedMessage, price: Price, size: u64) {
        self.removed.insert(msg.old_reference.clone());

        let replacement = Order {
            reference: msg.reference.clone(),
            price,
            size,
            timestamp: msg.timestamp.clone(),
        };

        if self.bids.shift_remove(&msg.old_reference).is_some() {
            self.bids.insert(msg.reference.clone(), replacement);
        } else if self.asks.shift_remove(&msg.old_reference).is_some() {
            self.asks.insert(msg.reference.clone(), replacement);
        } else {
            self.stats.replaces_dropped += 1;
            log::warn!(
                "replace {} -> {}: old reference not resting; replacement dropped",
                msg.old_reference,
                msg.reference
            );
        }
    }

    /// Resting orders on one side, in arrival order.
    pub fn side(&self, side: Side) -> &IndexMap<String, Order> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// The trade log, in feed order.
    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// True if the feed has retired this reference.
    pub fn is_removed(&self, reference: &str) -> bool {
        self.removed.contains(reference)
    }

    /// Number of resting bid orders.
    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    /// Number of resting ask orders.
    pub fn ask_count(&self) -> usize {
        self.asks.len()
    }

    /// Monitoring counters.
    pub fn stats(&self) -> &BookStats {
        &self.stats
    }

    /// Reset to an empty book.
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.removed.clear();
        self.trades.clear();
        self.stats = BookStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: &str = "2023-01-11 09:30:00.000000000";

    fn add(reference: &str, side: Side, price: &str, size: &str) -> FeedMessage {
        FeedMessage::new(MessageKind::Add, reference)
            .with_side(side)
            .with_price(price)
            .with_size(size)
            .with_timestamp(T0)
    }

    #[test]
    fn test_add_order() {
        let mut book = BookState::new();
        book.apply(&add("1", Side::Bid, "10.50", "100"));

        assert_eq!(book.bid_count(), 1);
        assert_eq!(book.ask_count(), 0);
        let order = &book.side(Side::Bid)["1"];
        assert_eq!(order.price, Price::from_text("10.50").unwrap());
        assert_eq!(order.size, 100);
        assert_eq!(order.timestamp, T0);
    }

    #[test]
    fn test_add_overwrites_same_reference() {
        let mut book = BookState::new();
        book.apply(&add("1", Side::Bid, "10.50", "100"));
        book.apply(&add("1", Side::Bid, "10.60", "80"));

        assert_eq!(book.bid_count(), 1);
        let order = &book.side(Side::Bid)["1"];
        assert_eq!(order.price, Price::from_text("10.60").unwrap());
        assert_eq!(order.size, 80);
    }

    #[test]
    fn test_add_without_side_is_ignored() {
        let mut book = BookState::new();
        let msg = FeedMessage::new(MessageKind::Add, "1")
            .with_price("10.50")
            .with_size("100");
        book.apply(&msg);

        assert_eq!(book.bid_count(), 0);
        assert_eq!(book.ask_count(), 0);
        assert_eq!(book.stats().sideless_adds, 1);
        // Still an applied message, not a malformed one.
        assert_eq!(book.stats().messages_applied, 1);
    }

    #[test]
    fn test_malformed_size_discards_whole_message() {
        let mut book = BookState::new();
        book.apply(&add("1", Side::Bid, "10.50", "lots"));

        assert_eq!(book.bid_count(), 0);
        assert_eq!(book.stats().malformed_discarded, 1);
        assert_eq!(book.stats().messages_applied, 0);
    }

    #[test]
    fn test_negative_size_is_malformed() {
        let mut book = BookState::new();
        book.apply(&add("1", Side::Bid, "10.50", "-5"));
        assert_eq!(book.stats().malformed_discarded, 1);
        assert_eq!(book.bid_count(), 0);
    }

    #[test]
    fn test_malformed_trade_price_leaves_no_partial_effects() {
        let mut book = BookState::new();
        let msg = FeedMessage::new(MessageKind::Trade, "9")
            .with_side(Side::Bid)
            .with_price("n/a")
            .with_size("10")
            .with_timestamp(T0);
        book.apply(&msg);

        assert!(book.trades().is_empty());
        assert!(!book.is_removed("9"));
        assert_eq!(book.stats().malformed_discarded, 1);
    }

    #[test]
    fn test_remove_deletes_and_marks() {
        let mut book = BookState::new();
        book.apply(&add("1", Side::Bid, "10.50", "100"));
        book.apply(
            &FeedMessage::new(MessageKind::Remove, "1")
                .with_side(Side::Bid)
                .with_size("0"),
        );

        assert_eq!(book.bid_count(), 0);
        assert!(book.is_removed("1"));
    }

    #[test]
    fn test_duplicate_remove_is_tolerated() {
        let mut book = BookState::new();
        let cancel = FeedMessage::new(MessageKind::Remove, "1")
            .with_side(Side::Bid)
            .with_size("0");
        book.apply(&cancel);
        book.apply(&cancel);

        assert!(book.is_removed("1"));
        assert_eq!(book.stats().missing_references, 2);
        assert_eq!(book.stats().messages_applied, 2);
    }

    #[test]
    fn test_remove_wrong_side_leaves_order_resting() {
        let mut book = BookState::new();
        book.apply(&add("1", Side::Bid, "10.50", "100"));
        book.apply(
            &FeedMessage::new(MessageKind::Remove, "1")
                .with_side(Side::Ask)
                .with_size("0"),
        );

        // Marker set, but the bid is untouched.
        assert!(book.is_removed("1"));
        assert_eq!(book.bid_count(), 1);
    }

    #[test]
    fn test_trade_full_fill() {
        let mut book = BookState::new();
        book.apply(&add("2", Side::Ask, "9.00", "50"));
        book.apply(
            &FeedMessage::new(MessageKind::Trade, "2")
                .with_side(Side::Ask)
                .with_price("9.00")
                .with_size("50")
                .with_timestamp(T0),
        );

        assert_eq!(book.ask_count(), 0);
        assert!(book.is_removed("2"));
        assert_eq!(book.trades().len(), 1);
        assert_eq!(book.trades()[0].size, 50);
        assert_eq!(book.stats().full_fills, 1);
    }

    #[test]
    fn test_trade_oversized_fill_deletes() {
        let mut book = BookState::new();
        book.apply(&add("2", Side::Ask, "9.00", "50"));
        book.apply(
            &FeedMessage::new(MessageKind::Trade, "2")
                .with_side(Side::Ask)
                .with_price("9.00")
                .with_size("80")
                .with_timestamp(T0),
        );

        assert_eq!(book.ask_count(), 0);
        assert_eq!(book.stats().full_fills, 1);
    }

    #[test]
    fn test_trade_partial_fill_stays_resting_but_marked() {
        let mut book = BookState::new();
        book.apply(&add("2", Side::Ask, "9.00", "50"));
        book.apply(
            &FeedMessage::new(MessageKind::Trade, "2")
                .with_side(Side::Ask)
                .with_price("9.00")
                .with_size("20")
                .with_timestamp(T0),
        );

        // Literal upstream behavior: still in the map, size reduced, and
        // the reference is in the removed set.
        assert_eq!(book.ask_count(), 1);
        assert_eq!(book.side(Side::Ask)["2"].size, 30);
        assert!(book.is_removed("2"));
        assert_eq!(book.stats().partial_fills, 1);
    }

    #[test]
    fn test_trade_unknown_reference_still_logged() {
        let mut book = BookState::new();
        book.apply(
            &FeedMessage::new(MessageKind::Trade, "99")
                .with_side(Side::Bid)
                .with_price("10.00")
                .with_size("25")
                .with_timestamp(T0),
        );

        assert_eq!(book.trades().len(), 1);
        assert!(book.is_removed("99"));
        assert_eq!(book.stats().missing_references, 1);
    }

    #[test]
    fn test_replace_moves_reference() {
        let mut book = BookState::new();
        book.apply(&add("2", Side::Ask, "9.00", "50"));
        book.apply(
            &FeedMessage::new(MessageKind::Replace, "4")
                .with_old_reference("2")
                .with_price("9.20")
                .with_size("40")
                .with_timestamp(T0),
        );

        assert!(book.is_removed("2"));
        assert!(book.side(Side::Ask).get("2").is_none());
        let order = &book.side(Side::Ask)["4"];
        assert_eq!(order.price, Price::from_text("9.20").unwrap());
        assert_eq!(order.size, 40);
    }

    #[test]
    fn test_replace_checks_bid_side_first() {
        let mut book = BookState::new();
        book.apply(&add("1", Side::Bid, "10.00", "100"));
        book.apply(
            &FeedMessage::new(MessageKind::Replace, "5")
                .with_old_reference("1")
                .with_price("10.10")
                .with_size("60")
                .with_timestamp(T0),
        );

        assert!(book.side(Side::Bid).get("5").is_some());
        assert_eq!(book.ask_count(), 0);
    }

    #[test]
    fn test_replace_unknown_old_reference_drops_replacement() {
        let mut book = BookState::new();
        book.apply(
            &FeedMessage::new(MessageKind::Replace, "4")
                .with_old_reference("2")
                .with_price("9.20")
                .with_size("40")
                .with_timestamp(T0),
        );

        assert_eq!(book.bid_count(), 0);
        assert_eq!(book.ask_count(), 0);
        assert!(book.is_removed("2"));
        assert_eq!(book.stats().replaces_dropped, 1);
    }

    #[test]
    fn test_removed_set_does_not_block_fresh_add() {
        let mut book = BookState::new();
        book.apply(&add("1", Side::Bid, "10.50", "100"));
        book.apply(
            &FeedMessage::new(MessageKind::Remove, "1")
                .with_side(Side::Bid)
                .with_size("0"),
        );
        book.apply(&add("1", Side::Bid, "10.40", "70"));

        // The add lands; the historical marker stays set.
        assert_eq!(book.bid_count(), 1);
        assert_eq!(book.side(Side::Bid)["1"].size, 70);
        assert!(book.is_removed("1"));
    }

    #[test]
    fn test_reset() {
        let mut book = BookState::new();
        book.apply(&add("1", Side::Bid, "10.50", "100"));
        book.apply(
            &FeedMessage::new(MessageKind::Trade, "1")
                .with_side(Side::Bid)
                .with_price("10.50")
                .with_size("100")
                .with_timestamp(T0),
        );
        book.reset();

        assert_eq!(book.bid_count(), 0);
        assert!(book.trades().is_empty());
        assert!(!book.is_removed("1"));
        assert_eq!(book.stats(), &BookStats::default());
    }
}
