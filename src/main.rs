use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tracing::info;

use gapcast::categories::build_categories;
use gapcast::config::PredictorConfig;
use gapcast::fake_feed::synthetic_records;
use gapcast::gaps::summarize;
use gapcast::logging::init_tracing;
use gapcast::parser::{parse_records, split_records};
use gapcast::predictor::{Trend, generate_category_list, generate_predictions};
use gapcast::request::RangeRequest;

const USAGE: &str = "usage: gapcast <records-file> <from> <to> [min-confidence]\n       gapcast --demo <count> <from> <to> [min-confidence]";

enum Source {
    File(PathBuf),
    Demo(usize),
}

struct Args {
    source: Source,
    from: i64,
    to: i64,
    min_confidence: Option<u8>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let first = args.next().context(USAGE)?;
    let source = if first == "--demo" {
        let count = args.next().context(USAGE)?;
        Source::Demo(count.parse().with_context(|| format!("bad demo count {count:?}"))?)
    } else {
        Source::File(PathBuf::from(first))
    };
    let from: i64 = args
        .next()
        .context(USAGE)?
        .parse()
        .context("from must be an integer")?;
    let to: i64 = args
        .next()
        .context(USAGE)?
        .parse()
        .context("to must be an integer")?;
    let min_confidence = match args.next() {
        Some(raw) => Some(
            raw.parse::<u8>()
                .with_context(|| format!("bad min confidence {raw:?}"))?,
        ),
        None => None,
    };
    if args.next().is_some() {
        bail!(USAGE);
    }
    Ok(Args {
        source,
        from,
        to,
        min_confidence,
    })
}

fn trend_arrow(trend: Trend) -> &'static str {
    match trend {
        Trend::Rising => "↑",
        Trend::Steady => "→",
        Trend::Falling => "↓",
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = parse_args(std::env::args().skip(1))?;
    let cfg = PredictorConfig::from_env()?;

    let records = match &args.source {
        Source::File(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("read records {}", path.display()))?;
            split_records(&raw)
        }
        Source::Demo(count) => synthetic_records(*count, 1, 0x5eed),
    };
    let rounds = parse_records(&records);
    info!(records = records.len(), rounds = rounds.len(), "parsed records");
    if rounds.is_empty() {
        bail!("no parsable rounds in input");
    }

    let req = RangeRequest::normalize(args.from, args.to, args.min_confidence, &cfg)?;
    let latest = rounds.last().map(|r| r.number).unwrap_or(0);

    println!(
        "Rounds: {} (#{}..#{})",
        rounds.len(),
        rounds[0].number,
        latest
    );
    println!();
    println!("{:<24} {:>6} {:>8}", "Category", "Count", "Max gap");
    let map = build_categories(&rounds, cfg.include_face_suits);
    for row in summarize(&map) {
        println!("{:<24} {:>6} {:>8}", row.label, row.count, row.max_gap);
    }

    println!();
    println!(
        "Predictions #{}..#{} (min confidence {}%)",
        req.from, req.to, req.min_confidence
    );
    let list = generate_category_list(&rounds, req.from, req.to, req.min_confidence, &cfg);
    if list.is_empty() {
        println!("  none above threshold");
    }
    for pred in &list {
        let numbers: Vec<String> = pred.numbers.iter().map(|n| n.to_string()).collect();
        println!(
            "  {:<6} {:<24} {:>5.1}%  {}",
            pred.notation,
            pred.label,
            pred.average_confidence,
            numbers.join(", ")
        );
    }

    let next = latest.saturating_add(1);
    let forecast = generate_predictions(&rounds, next, next, cfg.forecast_top_n, &cfg);
    if let Some(round) = forecast.first() {
        println!();
        println!("Next round #{}", round.number);
        for entry in &round.predictions {
            println!(
                "  {:<24} {:>3}% {}  gap {} / avg {:.1}",
                entry.category.label(),
                entry.confidence,
                trend_arrow(entry.trend),
                entry.gap_now,
                entry.average_gap
            );
        }
    }

    Ok(())
}
