use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::categories::{Category, build_categories};
use crate::config::PredictorConfig;
use crate::gaps::{GapStats, MAX_CONFIDENCE, compute_gap_stats, confidence};
use crate::round::Round;

#[derive(Debug, Clone, Serialize)]
pub struct CategoryProfile {
    pub category: Category,
    pub numbers: Vec<u32>,
    pub stats: GapStats,
    pub frequency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictData {
    pub latest_known: u32,
    pub total_rounds: usize,
    pub profiles: Vec<CategoryProfile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub round: u32,
    pub category: Category,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryPrediction {
    pub category: Category,
    pub label: String,
    pub notation: String,
    pub numbers: Vec<u32>,
    pub average_confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Rising,
    Steady,
    Falling,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub category: Category,
    pub confidence: u8,
    pub trend: Trend,
    pub gap_now: u32,
    pub average_gap: f64,
    pub last_position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundForecast {
    pub number: u32,
    pub predictions: Vec<ForecastEntry>,
}

/// Per-category occurrence lists, frequencies and gap statistics for a round collection.
/// `None` when there are no rounds.
pub fn build_predict_data(rounds: &[Round], cfg: &PredictorConfig) -> Option<PredictData> {
    let latest_known = rounds.iter().map(|r| r.number).max()?;
    let total_rounds = rounds.len();
    let profiles = build_categories(rounds, cfg.include_face_suits)
        .into_iter()
        .map(|(category, numbers)| {
            let frequency = numbers.len() as f64 / total_rounds as f64;
            let stats = compute_gap_stats(&numbers, latest_known);
            CategoryProfile {
                category,
                numbers,
                stats,
                frequency,
            }
        })
        .collect();
    Some(PredictData {
        latest_known,
        total_rounds,
        profiles,
    })
}

/// Steps 1-3 of list generation for one category: project historical gaps and the blended
/// gap into `range`, price each projection, then enforce spacing and the per-category cap.
pub fn category_candidates(
    profile: &CategoryProfile,
    range: &RangeInclusive<u32>,
    min_confidence: u8,
    cfg: &PredictorConfig,
) -> Vec<Candidate> {
    let stats = &profile.stats;
    if profile.frequency <= 0.0 || stats.occurrences < 2 || stats.gaps.is_empty() {
        return Vec::new();
    }

    let gaps = &stats.gaps;
    let avg_gap = if stats.average_gap > 0.0 { stats.average_gap } else { 1.0 };
    let max_gap = if stats.max_gap > 0 {
        stats.max_gap as f64
    } else {
        avg_gap
    };
    let last = stats.last_position as f64;
    let current = stats.current_gap as f64;
    let base = profile.frequency * 100.0;

    let overdue_ratio = current / avg_gap;
    let overdue_bonus = whole((overdue_ratio - 1.0).max(0.0) * cfg.overdue_bonus_per_ratio)
        .min(cfg.overdue_bonus_cap as f64);
    let extreme_bonus = if current > max_gap {
        whole((current - max_gap) * cfg.extreme_bonus_per_round)
            .min(cfg.extreme_bonus_cap as f64)
    } else {
        0.0
    };
    let bonus = overdue_bonus + extreme_bonus;

    let n_recent = (gaps.len() / cfg.recent_fraction_divisor).max(1).min(gaps.len());
    let (older, recent) = gaps.split_at(gaps.len() - n_recent);
    let recent_avg = recent.iter().map(|g| *g as f64).sum::<f64>() / recent.len() as f64;
    let blended = if profile.category.is_rare() {
        whole(max_gap)
    } else {
        whole(avg_gap * cfg.historical_blend + recent_avg * cfg.recent_blend)
    }
    .max(1.0);

    let floor_ratio = if profile.frequency < cfg.rare_frequency_threshold {
        cfg.rare_floor_ratio
    } else {
        cfg.common_floor_ratio
    };
    let conf_floor = whole(base * floor_ratio);

    // Recent gaps count several times over when weighting how often a gap length recurs.
    let mut gap_weights: BTreeMap<u32, usize> = BTreeMap::new();
    for g in older {
        *gap_weights.entry(*g).or_insert(0) += 1;
    }
    for g in recent {
        *gap_weights.entry(*g).or_insert(0) += cfg.recent_gap_multiplicity;
    }
    let total_weight = older.len() + recent.len() * cfg.recent_gap_multiplicity;

    let price = |raw: f64| -> Option<u8> {
        let conf = whole(raw).max(conf_floor).clamp(0.0, MAX_CONFIDENCE as f64) as u8;
        (conf >= min_confidence).then_some(conf)
    };

    let mut projected: HashMap<u32, u8> = HashMap::new();
    let mut offer = |round: f64, conf: u8| {
        let round = round as u32;
        let slot = projected.entry(round).or_insert(0);
        *slot = (*slot).max(conf);
    };

    for (gap, weight) in &gap_weights {
        let gap_share = *weight as f64 / total_weight as f64;
        for cycle in 1..=cfg.gap_projection_cycles {
            let round = last + *gap as f64 + (cycle - 1) as f64 * blended;
            if !in_range(range, round) {
                continue;
            }
            let decay = cfg.gap_cycle_decay.powi(cycle as i32 - 1);
            let raw = base * gap_share * cfg.gap_weight_scale * decay + base * cfg.base_share + bonus;
            if let Some(conf) = price(raw) {
                offer(round, conf);
            }
        }
    }

    for mult in 1..=cfg.cycle_projection_multiples {
        let round = last + mult as f64 * blended;
        if !in_range(range, round) {
            continue;
        }
        let decay = cfg.pure_cycle_decay.powi(mult as i32 - 1);
        let raw = base * decay * overdue_ratio.min(cfg.overdue_ratio_cap) + bonus;
        if let Some(conf) = price(raw) {
            offer(round, conf);
        }
    }

    let mut ranked: Vec<(u32, u8)> = projected.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut kept: Vec<Candidate> = Vec::new();
    for (round, conf) in ranked {
        if kept.len() >= cfg.candidates_per_category {
            break;
        }
        if kept.iter().any(|k| k.round.abs_diff(round) <= 1) {
            continue;
        }
        kept.push(Candidate {
            round,
            category: profile.category,
            confidence: conf,
        });
    }
    kept
}

// Integer truncation that tolerates representation error, so 3*0.7 + 3*0.3 counts as 3.
fn whole(x: f64) -> f64 {
    (x + 1e-9).trunc()
}

// Half-to-even, so 42.25 reports as 42.2.
fn one_decimal(x: f64) -> f64 {
    (x * 10.0).round_ties_even() / 10.0
}

fn in_range(range: &RangeInclusive<u32>, round: f64) -> bool {
    round >= *range.start() as f64 && round <= *range.end() as f64
}

/// Step 4: every round number goes to the most confident category that still has room.
pub fn resolve_exclusive(
    mut candidates: Vec<Candidate>,
    max_per_category: usize,
) -> BTreeMap<u32, (Category, u8)> {
    candidates.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then(a.round.cmp(&b.round))
            .then(a.category.cmp(&b.category))
    });

    let mut assignments: BTreeMap<u32, (Category, u8)> = BTreeMap::new();
    let mut per_category: HashMap<Category, usize> = HashMap::new();
    for cand in candidates {
        if assignments.contains_key(&cand.round) {
            continue;
        }
        let count = per_category.entry(cand.category).or_insert(0);
        if *count >= max_per_category {
            continue;
        }
        *count += 1;
        assignments.insert(cand.round, (cand.category, cand.confidence));
    }
    assignments
}

/// Predicted round numbers per category for `from..=to`. Each round number is owned by at
/// most one category; categories are ordered by average confidence, highest first.
pub fn generate_category_list(
    rounds: &[Round],
    from: u32,
    to: u32,
    min_confidence: u8,
    cfg: &PredictorConfig,
) -> Vec<CategoryPrediction> {
    let Some(data) = build_predict_data(rounds, cfg) else {
        return Vec::new();
    };
    if from > to {
        return Vec::new();
    }
    let range = from..=to;

    let per_category: Vec<Vec<Candidate>> = data
        .profiles
        .par_iter()
        .filter(|p| !(cfg.exclude_neutral_bands && p.category.is_neutral_band()))
        .map(|p| category_candidates(p, &range, min_confidence, cfg))
        .collect();
    let candidates: Vec<Candidate> = per_category.into_iter().flatten().collect();
    debug!(
        candidates = candidates.len(),
        from, to, min_confidence, "collected category candidates"
    );

    let assignments = resolve_exclusive(candidates, cfg.max_per_category);

    let mut groups: BTreeMap<Category, Vec<(u32, u8)>> = BTreeMap::new();
    for (round, (category, conf)) in &assignments {
        groups.entry(*category).or_default().push((*round, *conf));
    }

    let mut out: Vec<CategoryPrediction> = groups
        .into_iter()
        .map(|(category, picks)| {
            let avg = picks.iter().map(|(_, c)| *c as f64).sum::<f64>() / picks.len() as f64;
            CategoryPrediction {
                category,
                label: category.label(),
                notation: category.notation(),
                numbers: picks.iter().map(|(n, _)| *n).collect(),
                average_confidence: one_decimal(avg),
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.average_confidence
            .total_cmp(&a.average_confidence)
            .then(a.category.cmp(&b.category))
    });

    info!(
        categories = out.len(),
        assigned = assignments.len(),
        latest_known = data.latest_known,
        "generated category list"
    );
    out
}

/// Per-round view: for each target round, the `top_n` categories by confidence.
pub fn generate_predictions(
    rounds: &[Round],
    from: u32,
    to: u32,
    top_n: usize,
    cfg: &PredictorConfig,
) -> Vec<RoundForecast> {
    let Some(data) = build_predict_data(rounds, cfg) else {
        return Vec::new();
    };
    if from > to {
        return Vec::new();
    }

    (from..=to)
        .map(|target| {
            let delta = target.saturating_sub(data.latest_known);
            let mut predictions: Vec<ForecastEntry> = data
                .profiles
                .iter()
                .filter(|p| p.frequency > 0.0 && p.stats.occurrences > 0)
                .map(|p| {
                    let conf = confidence(&p.stats, p.frequency, delta);
                    let now = confidence(&p.stats, p.frequency, 0);
                    let trend = if conf as i32 > now as i32 + cfg.trend_margin as i32 {
                        Trend::Rising
                    } else if (conf as i32) < now as i32 - cfg.trend_margin as i32 {
                        Trend::Falling
                    } else {
                        Trend::Steady
                    };
                    ForecastEntry {
                        category: p.category,
                        confidence: conf,
                        trend,
                        gap_now: p.stats.current_gap + delta,
                        average_gap: one_decimal(p.stats.average_gap),
                        last_position: p.stats.last_position,
                    }
                })
                .collect();
            predictions.sort_by(|a, b| {
                b.confidence
                    .cmp(&a.confidence)
                    .then(a.category.cmp(&b.category))
            });
            predictions.truncate(top_n);
            RoundForecast {
                number: target,
                predictions,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::{Parity, Winner};

    fn profile(category: Category, numbers: &[u32], latest: u32, total: usize) -> CategoryProfile {
        CategoryProfile {
            category,
            numbers: numbers.to_vec(),
            stats: compute_gap_stats(numbers, latest),
            frequency: numbers.len() as f64 / total as f64,
        }
    }

    #[test]
    fn steady_rhythm_projects_next_occurrence() {
        let nums: Vec<u32> = (1..=33).map(|k| k * 3).collect();
        let p = profile(Category::Parity(Parity::Even), &nums, 100, 100);
        let cands = category_candidates(&p, &(101..=110), 35, &PredictorConfig::default());
        let rounds: Vec<u32> = cands.iter().map(|c| c.round).collect();
        assert_eq!(rounds, vec![102, 105, 108]);
        assert_eq!(cands[0].confidence, 90);
        assert_eq!(cands[1].confidence, 82);
        assert_eq!(cands[2].confidence, 75);
    }

    fn picks(cands: &[Candidate]) -> Vec<(u32, u8)> {
        cands.iter().map(|c| (c.round, c.confidence)).collect()
    }

    // Gaps 10, 10, 20, 10: average 12.5, max 20, blended 11.
    const UNEVEN: [u32; 5] = [10, 20, 30, 50, 60];

    #[test]
    fn overdue_bonus_lifts_every_projection() {
        // Current gap 20: ratio 1.6 adds 7, still within the max gap so no extreme bonus.
        let p = profile(Category::Parity(Parity::Even), &UNEVEN, 80, 100);
        let cands = category_candidates(&p, &(81..=110), 0, &PredictorConfig::default());
        assert_eq!(picks(&cands), vec![(81, 17), (92, 16), (104, 11), (102, 10)]);
    }

    #[test]
    fn extreme_bonus_past_max_gap() {
        // Current gap 30: overdue adds 16, ten rounds past the max gap add 30.
        let p = profile(Category::Parity(Parity::Even), &UNEVEN, 90, 100);
        let cands = category_candidates(&p, &(91..=120), 0, &PredictorConfig::default());
        assert_eq!(picks(&cands), vec![(92, 55), (104, 52), (115, 51), (102, 49)]);
    }

    #[test]
    fn overdue_bonuses_are_capped() {
        // Current gap 40: overdue 26 caps at 25, extreme 60 caps at 35.
        let p = profile(Category::Parity(Parity::Even), &UNEVEN, 100, 100);
        let cands = category_candidates(&p, &(101..=130), 0, &PredictorConfig::default());
        assert_eq!(picks(&cands), vec![(104, 66), (115, 65), (102, 63)]);
    }

    #[test]
    fn averages_round_half_to_even() {
        assert_eq!(one_decimal(42.25), 42.2);
        assert_eq!(one_decimal(41.75), 41.8);
        assert_eq!(one_decimal(247.0 / 3.0), 82.3);
    }

    #[test]
    fn single_occurrence_yields_nothing() {
        let p = profile(Category::Victory(Winner::Tie), &[40], 100, 100);
        assert!(category_candidates(&p, &(101..=200), 0, &PredictorConfig::default()).is_empty());
    }

    #[test]
    fn spacing_rejects_neighbours() {
        let nums: Vec<u32> = (1..=100).collect();
        let p = profile(Category::Victory(Winner::Player), &nums, 100, 100);
        let cands = category_candidates(&p, &(101..=110), 0, &PredictorConfig::default());
        let mut rounds: Vec<u32> = cands.iter().map(|c| c.round).collect();
        rounds.sort_unstable();
        for w in rounds.windows(2) {
            assert!(w[1] - w[0] >= 2, "{rounds:?}");
        }
        assert_eq!(rounds, vec![101, 103, 105]);
    }

    #[test]
    fn candidate_cap_applies() {
        let nums: Vec<u32> = (1..=20).map(|k| k * 2).collect();
        let p = profile(Category::Parity(Parity::Even), &nums, 40, 40);
        let cfg = PredictorConfig {
            candidates_per_category: 2,
            ..PredictorConfig::default()
        };
        let cands = category_candidates(&p, &(41..=60), 0, &cfg);
        assert_eq!(cands.len(), 2);
    }

    #[test]
    fn rare_category_uses_max_gap() {
        // Gaps 5, 5, 20: blended would be ~10, the rare rule uses 20.
        let p = profile(Category::Victory(Winner::Tie), &[10, 15, 20, 40], 45, 45);
        let cands = category_candidates(&p, &(41..=100), 0, &PredictorConfig::default());
        assert!(cands.iter().any(|c| c.round == 80));
        assert!(!cands.iter().any(|c| c.round == 53));
    }

    #[test]
    fn resolution_prefers_confidence_and_caps() {
        let a = Category::Parity(Parity::Even);
        let b = Category::Parity(Parity::Odd);
        let cands = vec![
            Candidate { round: 5, category: a, confidence: 50 },
            Candidate { round: 5, category: b, confidence: 60 },
            Candidate { round: 7, category: a, confidence: 40 },
            Candidate { round: 9, category: b, confidence: 30 },
            Candidate { round: 11, category: b, confidence: 20 },
        ];
        let out = resolve_exclusive(cands, 2);
        assert_eq!(out[&5], (b, 60));
        assert_eq!(out[&7], (a, 40));
        assert_eq!(out[&9], (b, 30));
        assert!(!out.contains_key(&11));
    }

    #[test]
    fn empty_history_is_empty_result() {
        let cfg = PredictorConfig::default();
        assert!(generate_category_list(&[], 1, 10, 0, &cfg).is_empty());
        assert!(generate_predictions(&[], 1, 10, 3, &cfg).is_empty());
    }
}
