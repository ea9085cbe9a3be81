//! # lob-replay
//!
//! Replay a delimited market-data feed into a two-sided limit order book
//! and periodically emit derived trading metrics: top price levels per
//! side, total traded volume, and VWAP.
//!
//! The engine tracks resting orders across four message kinds (add, remove,
//! trade, replace), handles partial fills, and aggregates price levels over
//! a trailing 30-minute window with deterministic ordering. Snapshots fire
//! on the first message, on calendar-day rollover, and every 30 minutes of
//! feed time. Dirty input never halts a replay: malformed rows are
//! absorbed, counted, and reported through the warning tracker.
//!
//! ## Quick start
//!
//! ```rust
//! use lob_replay::{BookState, FeedMessage, MessageKind, MetricsEngine, Side};
//!
//! let mut book = BookState::new();
//! book.apply(
//!     &FeedMessage::new(MessageKind::Add, "1")
//!         .with_side(Side::Bid)
//!         .with_price("10.50")
//!         .with_size("100")
//!         .with_timestamp("2023-01-11 09:30:00.000000000"),
//! );
//!
//! let engine = MetricsEngine::default();
//! let levels = engine.top_price_levels(&book, Side::Bid, 5, None);
//! assert_eq!(levels.len(), 1);
//! assert_eq!(levels[0].size, 100);
//! ```
//!
//! ## Replaying a feed file
//!
//! ```ignore
//! use lob_replay::{CsvFeed, ReplaySession, SessionConfig};
//!
//! let feed = CsvFeed::new("data/feed.csv")?;
//! let mut session = ReplaySession::new(SessionConfig::default());
//! session.run(feed, |snapshot| println!("{snapshot}\n"))?;
//! ```
//!
//! ## Module overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Message/side enums, fixed-point [`Price`], orders and trades |
//! | [`book`] | [`BookState`], [`MetricsEngine`], [`EmissionScheduler`] |
//! | [`feed`] | [`FeedSource`] trait, [`CsvFeed`], [`VecFeed`], normalization |
//! | [`session`] | [`ReplaySession`], the sequential replay loop |
//! | [`report`] | Console rendering of snapshots |
//! | [`time`] | Feed timestamp parsing and window arithmetic |
//! | [`warnings`] | Advisory anomaly tracking |

pub mod book;
pub mod error;
pub mod feed;
pub mod report;
pub mod session;
pub mod time;
pub mod types;
pub mod warnings;

// Re-exports - core types
pub use error::{ReplayError, Result};
pub use types::{FeedMessage, MessageKind, Order, Price, Side, TradeRecord, PRICE_SCALE};

// Re-exports - book reconstruction and metrics
pub use book::{
    BookState, BookStats, Emission, EmissionReason, EmissionScheduler, MetricsConfig,
    MetricsEngine, MetricsSnapshot, PriceLevel, SchedulerConfig,
};

// Re-exports - feed ingestion
pub use feed::{CsvFeed, FeedMetadata, FeedSource, RawRecord, RecordOutcome, VecFeed};

// Re-exports - session driver
pub use session::{ReplaySession, SessionConfig, SessionStats};

// Re-exports - diagnostics
pub use warnings::{Warning, WarningCategory, WarningSummary, WarningTracker};
