use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::categories::Category;
use crate::config::PredictorConfig;
use crate::predictor::{CategoryPrediction, generate_category_list};
use crate::round::Round;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HitMetrics {
    pub predicted: usize,
    // Predicted rounds that were actually observed.
    pub resolved: usize,
    pub hits: usize,
}

impl HitMetrics {
    pub fn hit_rate(&self) -> f64 {
        if self.resolved == 0 {
            0.0
        } else {
            self.hits as f64 / self.resolved as f64
        }
    }

    fn add(&mut self, other: HitMetrics) {
        self.predicted += other.predicted;
        self.resolved += other.resolved;
        self.hits += other.hits;
    }
}

/// One resolved prediction: the confidence it was issued with and whether it came true.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Outcome {
    pub category: Category,
    pub confidence: f64,
    pub hit: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_confidence: f64,
    pub actual_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BacktestReport {
    pub windows: usize,
    pub overall: HitMetrics,
    pub per_category: BTreeMap<Category, HitMetrics>,
    pub outcomes: Vec<Outcome>,
    // Windows skipped because the numbering jumped past them.
    pub numbering_jumps: usize,
}

/// Scores a generated list against the rounds that were actually played.
pub fn evaluate_list(list: &[CategoryPrediction], actual: &[Round]) -> BacktestReport {
    let by_number: HashMap<u32, &Round> = actual.iter().map(|r| (r.number, r)).collect();
    let mut report = BacktestReport {
        windows: 1,
        ..BacktestReport::default()
    };
    for pred in list {
        let mut m = HitMetrics {
            predicted: pred.numbers.len(),
            ..HitMetrics::default()
        };
        for n in &pred.numbers {
            let Some(round) = by_number.get(n) else {
                continue;
            };
            m.resolved += 1;
            let hit = pred.category.holds(round);
            if hit {
                m.hits += 1;
            }
            report.outcomes.push(Outcome {
                category: pred.category,
                confidence: pred.average_confidence,
                hit,
            });
        }
        report.overall.add(m);
        report.per_category.entry(pred.category).or_default().add(m);
    }
    report
}

/// Walk-forward evaluation: after `warmup` rounds, repeatedly predict the next `window`
/// round numbers from everything seen so far, then score against what followed. When the
/// numbering jumps past a window, the round after the jump joins the history and the next
/// window is anchored on it.
pub fn walk_forward(
    rounds: &[Round],
    warmup: usize,
    window: u32,
    min_confidence: u8,
    cfg: &PredictorConfig,
) -> BacktestReport {
    let mut sorted: Vec<Round> = rounds.to_vec();
    sorted.sort_by_key(|r| r.number);

    let mut report = BacktestReport::default();
    let window = window.max(1);
    let mut idx = warmup.max(2);
    while idx < sorted.len() {
        let history = &sorted[..idx];
        let latest = history[history.len() - 1].number;
        let from = latest.saturating_add(1);
        let to = latest.saturating_add(window);
        let end = sorted[idx..]
            .iter()
            .position(|r| r.number > to)
            .map(|p| idx + p)
            .unwrap_or(sorted.len());
        if end == idx {
            debug!(from, to, next = sorted[idx].number, "numbering jump, re-anchoring");
            report.numbering_jumps += 1;
            idx += 1;
            continue;
        }
        let actual = &sorted[idx..end];

        let list = generate_category_list(history, from, to, min_confidence, cfg);
        let step = evaluate_list(&list, actual);
        debug!(
            from,
            to,
            predicted = step.overall.predicted,
            hits = step.overall.hits,
            "backtest window"
        );

        report.windows += 1;
        report.overall.add(step.overall);
        for (cat, m) in step.per_category {
            report.per_category.entry(cat).or_default().add(m);
        }
        report.outcomes.extend(step.outcomes);
        idx = end;
    }
    report
}

/// Groups resolved predictions by issued confidence (0..100 in `width`-point buckets).
pub fn confidence_bins(outcomes: &[Outcome], width: f64) -> Vec<ConfidenceBin> {
    let width = width.clamp(1.0, 100.0);
    let buckets = (100.0 / width).ceil() as usize;
    let mut sums = vec![(0usize, 0.0_f64, 0usize); buckets];
    for o in outcomes {
        let idx = ((o.confidence / width).floor() as usize).min(buckets - 1);
        let slot = &mut sums[idx];
        slot.0 += 1;
        slot.1 += o.confidence;
        if o.hit {
            slot.2 += 1;
        }
    }
    sums.into_iter()
        .enumerate()
        .filter(|(_, (count, _, _))| *count > 0)
        .map(|(i, (count, conf_sum, hits))| ConfidenceBin {
            bucket_start: i as f64 * width,
            bucket_end: ((i + 1) as f64 * width).min(100.0),
            count,
            avg_confidence: conf_sum / count as f64,
            actual_rate: hits as f64 / count as f64,
        })
        .collect()
}
