//! Core data types for feed messages and book state.
//!
//! Prices use a fixed-point representation (1e-9 dollar units) so that
//! exact-price grouping and ordering are integer operations. Payload fields
//! that the book parses itself (price, size) and the timestamp text travel
//! as raw strings: the book decides what is malformed, and timestamps are
//! parsed lazily during aggregation, never at ingestion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Feed message kind (what happened to the order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Add a new resting order to the book.
    Add,
    /// Cancel/remove a resting order.
    Remove,
    /// Trade execution against a resting order (full or partial fill).
    Trade,
    /// Retire one order and insert a fresh one under a new reference.
    Replace,
}

impl MessageKind {
    /// Parse the feed's message-type token. Matching is exact; anything
    /// else is an unknown kind and the row is skipped upstream.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "add" => Some(MessageKind::Add),
            "remove" => Some(MessageKind::Remove),
            "trade" => Some(MessageKind::Trade),
            "replace" => Some(MessageKind::Replace),
            _ => None,
        }
    }

    /// The feed token for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Add => "add",
            MessageKind::Remove => "remove",
            MessageKind::Trade => "trade",
            MessageKind::Replace => "replace",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order side (bid or ask).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy order. Feed token `B`.
    Bid,
    /// Sell order. Feed token `S`.
    Ask,
}

impl Side {
    /// Parse the feed's side token (`B` / `S`).
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "B" => Some(Side::Bid),
            "S" => Some(Side::Ask),
            _ => None,
        }
    }

    #[inline]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    #[inline]
    pub fn is_ask(self) -> bool {
        matches!(self, Side::Ask)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("bid"),
            Side::Ask => f.write_str("ask"),
        }
    }
}

/// Scale factor for fixed-point prices: 1e-9 dollar units.
pub const PRICE_SCALE: i64 = 1_000_000_000;

/// Fixed-point price.
///
/// Stored as `i64` in 1e-9 dollar units so that prices group and sort
/// exactly. Parsed from the feed's decimal text; fractions beyond nine
/// digits are truncated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// Construct from raw 1e-9 units.
    pub const fn from_raw(units: i64) -> Self {
        Price(units)
    }

    /// The raw 1e-9 unit value.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Parse decimal text (`"10.50"`, `"9"`, `"-0.25"`) into a fixed-point
    /// price. Returns `None` for anything that is not a plain decimal
    /// number or that overflows the representation.
    pub fn from_text(text: &str) -> Option<Self> {
        let text = text.trim();
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let whole: i64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };

        // Pad or truncate the fraction to exactly nine digits.
        let mut frac: i64 = 0;
        for (i, b) in frac_part.bytes().take(9).enumerate() {
            frac += i64::from(b - b'0') * 10i64.pow(8 - i as u32);
        }

        let units = whole.checked_mul(PRICE_SCALE)?.checked_add(frac)?;
        Some(Price(if negative { -units } else { units }))
    }

    /// Convert to floating-point dollars (display and VWAP arithmetic).
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / PRICE_SCALE as f64
    }
}

impl fmt::Display for Price {
    /// Render as decimal text with trailing zeros trimmed (`10.5`, `9`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self.0;
        if units < 0 {
            f.write_str("-")?;
        }
        let abs = units.unsigned_abs();
        let whole = abs / PRICE_SCALE as u64;
        let frac = abs % PRICE_SCALE as u64;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            let digits = format!("{frac:09}");
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

/// A normalized feed message.
///
/// One message per feed row. `price`, `size`, and `timestamp` stay raw:
/// size/price parsing is the book's responsibility (a failure there discards
/// the whole message), and timestamps are parsed per-order during
/// aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMessage {
    /// What happened.
    pub kind: MessageKind,

    /// Which side of the book, when the feed supplied a recognizable token.
    pub side: Option<Side>,

    /// Feed-assigned order reference.
    pub reference: String,

    /// Reference being retired by a replace. Empty for other kinds.
    pub old_reference: String,

    /// Raw price text.
    pub price: String,

    /// Raw size text. Must parse to a non-negative integer or the message
    /// is discarded.
    pub size: String,

    /// Raw exchange timestamp text (`YYYY-MM-DD HH:mm:ss` + 9-digit
    /// fraction).
    pub timestamp: String,

    /// Instrument symbol, for diagnostics.
    pub symbol: String,
}

impl FeedMessage {
    /// Create a message with the given kind and reference; remaining fields
    /// start empty (or `"0"` for price/size) and are filled via the
    /// builders.
    pub fn new(kind: MessageKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            side: None,
            reference: reference.into(),
            old_reference: String::new(),
            price: "0".to_string(),
            size: "0".to_string(),
            timestamp: String::new(),
            symbol: String::new(),
        }
    }

    /// Set the side.
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = Some(side);
        self
    }

    /// Set the raw price text.
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = price.into();
        self
    }

    /// Set the raw size text.
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Set the raw timestamp text.
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Set the retired reference (replace messages).
    pub fn with_old_reference(mut self, old_reference: impl Into<String>) -> Self {
        self.old_reference = old_reference.into();
        self
    }

    /// Set the symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }
}

/// A resting order tracked in the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Feed-assigned reference.
    pub reference: String,

    /// Fixed-point price.
    pub price: Price,

    /// Remaining size in shares/contracts.
    pub size: u64,

    /// Raw exchange timestamp text from the message that created the order.
    /// Parsed lazily when a windowed aggregation needs it.
    pub timestamp: String,
}

/// One entry in the append-only trade log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Raw exchange timestamp text of the trade print.
    pub timestamp: String,

    /// Execution price.
    pub price: Price,

    /// Executed size.
    pub size: u64,
}
