//! Feed ingestion: delimited records in, normalized messages out.
//!
//! The feed is a comma-delimited stream of 13-field records. This module
//! owns the source abstraction (`FeedSource`), the CSV-backed and in-memory
//! implementations, and the normalization of a raw record into a
//! `FeedMessage`. Header rows are detected by content (the exchange-time
//! field carrying the literal header label), so the CSV reader runs in
//! non-header mode.
//!
//! Normalization is explicit about defects instead of failing: a short row
//! or an unknown message-type token comes back as its own `RecordOutcome`
//! variant for the session to count and skip.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{FeedMessage, MessageKind, Side};

/// One raw feed record: the row's fields, in feed order.
pub type RawRecord = Vec<String>;

/// Expected number of fields per record.
pub const FIELD_COUNT: usize = 13;

/// Literal contents of the exchange-time field on a header row.
pub const HEADER_LABEL: &str = "exchtime";

// Field positions within a record:
// localtime, exchtime, msgtype, symbol, exch, price, size, side, ref,
// oldref, mpid, esd, platform
const EXCHANGE_TIME: usize = 1;
const MESSAGE_TYPE: usize = 2;
const SYMBOL: usize = 3;
const PRICE: usize = 5;
const SIZE: usize = 6;
const SIDE: usize = 7;
const REFERENCE: usize = 8;
const OLD_REFERENCE: usize = 9;

/// Result of normalizing one raw record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A well-formed message ready for the book.
    Message(FeedMessage),

    /// A header row; skipped without processing.
    Header,

    /// Fewer fields than a record needs.
    Short { fields: usize },

    /// Unrecognized message-type token.
    UnknownKind(String),
}

/// Normalize a raw record into a message (or classify its defect).
pub fn normalize_record(fields: &[String]) -> RecordOutcome {
    if fields.len() < FIELD_COUNT {
        // A header row is still recognizable when truncated.
        if fields.len() > EXCHANGE_TIME && fields[EXCHANGE_TIME] == HEADER_LABEL {
            return RecordOutcome::Header;
        }
        return RecordOutcome::Short {
            fields: fields.len(),
        };
    }

    if fields[EXCHANGE_TIME] == HEADER_LABEL {
        return RecordOutcome::Header;
    }

    let Some(kind) = MessageKind::parse(&fields[MESSAGE_TYPE]) else {
        return RecordOutcome::UnknownKind(fields[MESSAGE_TYPE].clone());
    };

    RecordOutcome::Message(FeedMessage {
        kind,
        side: Side::parse(&fields[SIDE]),
        reference: fields[REFERENCE].clone(),
        old_reference: fields[OLD_REFERENCE].clone(),
        price: fields[PRICE].clone(),
        size: fields[SIZE].clone(),
        timestamp: fields[EXCHANGE_TIME].clone(),
        symbol: fields[SYMBOL].clone(),
    })
}

/// Metadata about a feed source, for logging and reports.
#[derive(Debug, Clone, Default)]
pub struct FeedMetadata {
    /// Original file path, if the feed came from disk.
    pub file_path: Option<PathBuf>,

    /// Source kind (e.g. "csv", "memory").
    pub provider: Option<String>,

    /// File size in bytes, if applicable.
    pub file_size: Option<u64>,

    /// Known record count, if applicable.
    pub record_count: Option<u64>,
}

impl FeedMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file path.
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the provider name.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the record count.
    pub fn with_record_count(mut self, count: u64) -> Self {
        self.record_count = Some(count);
        self
    }
}

/// A source of raw feed records.
///
/// `records()` consumes the source for single-pass iteration; per-record
/// read errors travel inside the iterator so one bad row never kills the
/// stream.
pub trait FeedSource {
    /// Iterator over raw records.
    type RecordIter: Iterator<Item = Result<RawRecord>>;

    /// Consume the source and stream its records.
    fn records(self) -> Result<Self::RecordIter>;

    /// Metadata about this source.
    fn metadata(&self) -> &FeedMetadata;
}

// ============================================================================
// CSV feed
// ============================================================================

/// Delimited-file feed source.
pub struct CsvFeed {
    path: PathBuf,
    metadata: FeedMetadata,
}

impl CsvFeed {
    /// Create a feed over a CSV file. Fails if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut metadata = FeedMetadata::new()
            .with_file_path(&path)
            .with_provider("csv");
        metadata.file_size = Some(std::fs::metadata(&path)?.len());

        Ok(Self { path, metadata })
    }

    /// The file path this feed reads.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Streaming record iterator over a CSV file.
pub struct CsvRecordIter {
    inner: csv::StringRecordsIntoIter<File>,
}

impl Iterator for CsvRecordIter {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|row| {
            let record = row?;
            Ok(record.iter().map(str::to_string).collect())
        })
    }
}

impl FeedSource for CsvFeed {
    type RecordIter = CsvRecordIter;

    fn records(self) -> Result<Self::RecordIter> {
        // Header detection is content-based (see normalize_record), and
        // real feeds vary row widths, so the reader is flexible and
        // headerless.
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;
        Ok(CsvRecordIter {
            inner: reader.into_records(),
        })
    }

    fn metadata(&self) -> &FeedMetadata {
        &self.metadata
    }
}

// ============================================================================
// In-memory feed (tests, simulations)
// ============================================================================

/// In-memory feed source.
pub struct VecFeed {
    records: Vec<RawRecord>,
    metadata: FeedMetadata,
}

impl VecFeed {
    /// Create a feed over in-memory records.
    pub fn new(records: Vec<RawRecord>) -> Self {
        let metadata = FeedMetadata::new()
            .with_provider("memory")
            .with_record_count(records.len() as u64);
        Self { records, metadata }
    }
}

/// Iterator over in-memory records.
pub struct VecRecordIter {
    inner: std::vec::IntoIter<RawRecord>,
}

impl Iterator for VecRecordIter {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Ok)
    }
}

impl FeedSource for VecFeed {
    type RecordIter = VecRecordIter;

    fn records(self) -> Result<Self::RecordIter> {
        Ok(VecRecordIter {
            inner: self.records.into_iter(),
        })
    }

    fn metadata(&self) -> &FeedMetadata {
        &self.metadata
    }
}
