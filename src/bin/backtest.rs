use std::fs;
use std::path::PathBuf;

use anyhow::Context;

use gapcast::backtest::{confidence_bins, walk_forward};
use gapcast::config::PredictorConfig;
use gapcast::logging::init_tracing;
use gapcast::parser::{parse_records, split_records};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/records.txt"));
    let window: u32 = args
        .next()
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);
    let warmup: usize = std::env::var("GAPCAST_BACKTEST_WARMUP")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);

    let cfg = PredictorConfig::from_env()?;
    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let rounds = parse_records(split_records(&raw));

    let report = walk_forward(&rounds, warmup, window, cfg.default_min_confidence, &cfg);

    println!("Rounds: {}", rounds.len());
    println!(
        "Windows: {} ({} numbering jumps)",
        report.windows, report.numbering_jumps
    );
    println!(
        "Overall: {} predicted, {} resolved, {} hits ({:.1}%)",
        report.overall.predicted,
        report.overall.resolved,
        report.overall.hits,
        report.overall.hit_rate() * 100.0
    );
    for (category, m) in &report.per_category {
        println!(
            "  {:<6} {:<24} {:>4}/{:<4} {:>5.1}%",
            category.notation(),
            category.label(),
            m.hits,
            m.resolved,
            m.hit_rate() * 100.0
        );
    }
    println!("Calibration:");
    for bin in confidence_bins(&report.outcomes, 10.0) {
        println!(
            "  {:>3.0}-{:<3.0} n={:<5} conf {:>5.1}%  actual {:>5.1}%",
            bin.bucket_start,
            bin.bucket_end,
            bin.count,
            bin.avg_confidence,
            bin.actual_rate * 100.0
        );
    }

    Ok(())
}
