//! CLI for replaying a market-data feed into book metrics.
//!
//! # Usage
//!
//! ```bash
//! # Replay a feed and print each emitted report
//! cargo run --release --bin replay -- --input data/feed.csv
//!
//! # Deeper books, tighter cadence
//! cargo run --release --bin replay -- \
//!     --input data/feed.csv \
//!     --levels 10 \
//!     --interval-minutes 15
//!
//! # Keep a machine-readable record of every absorbed anomaly
//! cargo run --release --bin replay -- \
//!     --input data/feed.csv \
//!     --warnings-out warnings.json
//! ```

use std::env;
use std::path::PathBuf;
use std::process;

use lob_replay::{CsvFeed, FeedSource, ReplaySession, Result, SessionConfig};

/// Command-line arguments.
struct Args {
    /// Input feed file.
    input: PathBuf,
    /// Price levels per side in each report.
    levels: usize,
    /// Emission interval (and trailing window) in minutes.
    interval_minutes: i64,
    /// Optional JSON export path for recorded anomalies.
    warnings_out: Option<PathBuf>,
    /// Suppress report printing (stats and warnings only).
    quiet: bool,
}

fn parse_args() -> std::result::Result<Args, String> {
    let args: Vec<String> = env::args().collect();

    let mut input: Option<PathBuf> = None;
    let mut levels = 5usize;
    let mut interval_minutes = 30i64;
    let mut warnings_out: Option<PathBuf> = None;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" | "-i" => {
                i += 1;
                if i >= args.len() {
                    return Err("--input requires a path".to_string());
                }
                input = Some(PathBuf::from(&args[i]));
            }
            "--levels" | "-n" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| "--levels requires a number".to_string())?;
                levels = value
                    .parse()
                    .map_err(|_| format!("invalid --levels value: {value}"))?;
            }
            "--interval-minutes" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| "--interval-minutes requires a number".to_string())?;
                interval_minutes = value
                    .parse()
                    .map_err(|_| format!("invalid --interval-minutes value: {value}"))?;
            }
            "--warnings-out" => {
                i += 1;
                if i >= args.len() {
                    return Err("--warnings-out requires a path".to_string());
                }
                warnings_out = Some(PathBuf::from(&args[i]));
            }
            "--quiet" | "-q" => quiet = true,
            "--help" | "-h" => {
                print_usage();
                process::exit(0);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let input = input.ok_or_else(|| "--input is required".to_string())?;

    Ok(Args {
        input,
        levels,
        interval_minutes,
        warnings_out,
        quiet,
    })
}

fn print_usage() {
    println!("replay - reconstruct a limit order book from a feed and report metrics");
    println!();
    println!("USAGE:");
    println!("    replay --input <FILE> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -i, --input <FILE>            Feed file to replay (CSV)");
    println!("    -n, --levels <N>              Price levels per side [default: 5]");
    println!("        --interval-minutes <N>    Emission interval and window [default: 30]");
    println!("        --warnings-out <FILE>     Export recorded anomalies as JSON");
    println!("    -q, --quiet                   Do not print reports");
    println!("    -h, --help                    Show this help");
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("error: {msg}");
            eprintln!();
            print_usage();
            process::exit(2);
        }
    };

    let feed = CsvFeed::new(&args.input)?;
    if let Some(size) = feed.metadata().file_size {
        log::info!("replaying {} ({} bytes)", args.input.display(), size);
    }

    let config = SessionConfig::default()
        .with_top_levels(args.levels)
        .with_interval_minutes(args.interval_minutes);
    let mut session = ReplaySession::new(config);

    let quiet = args.quiet;
    session.run(feed, |snapshot| {
        if !quiet {
            println!("{snapshot}");
            println!();
        }
    })?;

    let stats = session.stats();
    log::info!(
        "done: {} records, {} headers skipped, {} emissions",
        stats.records,
        stats.headers_skipped,
        stats.emissions
    );

    let book_stats = session.book().stats();
    log::info!(
        "book: {} applied, {} malformed discarded, {} partial fills, {} full fills, {} replaces dropped",
        book_stats.messages_applied,
        book_stats.malformed_discarded,
        book_stats.partial_fills,
        book_stats.full_fills,
        book_stats.replaces_dropped
    );

    if !session.warnings().is_empty() {
        log::warn!("{} anomalies recorded", session.warnings().total());
        for (category, count) in &session.warnings().summary().by_category {
            log::warn!("  {category}: {count}");
        }
    }

    if let Some(path) = &args.warnings_out {
        session.warnings().export_to_json(path)?;
        log::info!("warnings exported to {}", path.display());
    }

    Ok(())
}
