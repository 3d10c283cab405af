use serde::Serialize;

use crate::categories::{Category, CategoryMap};

pub const MIN_CONFIDENCE: u8 = 3;
pub const MAX_CONFIDENCE: u8 = 95;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapStats {
    pub occurrences: usize,
    pub last_position: u32,
    pub average_gap: f64,
    pub max_gap: u32,
    pub current_gap: u32,
    // Oldest first.
    pub gaps: Vec<u32>,
}

impl GapStats {
    pub fn empty() -> Self {
        Self {
            occurrences: 0,
            last_position: 0,
            average_gap: 0.0,
            max_gap: 0,
            current_gap: 0,
            gaps: Vec::new(),
        }
    }
}

pub fn compute_gap_stats(positions: &[u32], latest_known: u32) -> GapStats {
    if positions.is_empty() {
        return GapStats::empty();
    }
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    let occurrences = sorted.len();

    let (gaps, average_gap, max_gap) = if occurrences >= 2 {
        let gaps: Vec<u32> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
        let avg = gaps.iter().map(|g| *g as f64).sum::<f64>() / gaps.len() as f64;
        let max = gaps.iter().copied().max().unwrap_or(0);
        (gaps, avg, max)
    } else {
        // Single sighting: spread the whole observed span over it.
        let avg = latest_known as f64 / occurrences as f64;
        (Vec::new(), avg, avg as u32)
    };

    let last_position = sorted[occurrences - 1];
    GapStats {
        occurrences,
        last_position,
        average_gap,
        max_gap,
        current_gap: latest_known.saturating_sub(last_position),
        gaps,
    }
}

/// Confidence (0..=95) that the category shows up again `delta` rounds after the latest
/// known round. Zero only when the category was never seen.
pub fn confidence(stats: &GapStats, frequency: f64, delta: u32) -> u8 {
    if stats.occurrences == 0 || frequency <= 0.0 {
        return 0;
    }
    let base = frequency * 100.0;
    let gap_now = stats.current_gap as f64 + delta as f64;
    let avg = stats.average_gap;
    if avg <= 0.0 {
        return clamp_confidence(base);
    }

    let ratio = gap_now / avg;
    let mut conf = if ratio >= 2.5 {
        base + 45.0
    } else if ratio >= 2.0 {
        base + 35.0 + (ratio - 2.0) * 20.0
    } else if ratio >= 1.5 {
        base + 20.0 + (ratio - 1.5) * 30.0
    } else if ratio >= 1.0 {
        base + (ratio - 1.0) * 40.0
    } else if ratio >= 0.6 {
        base * (0.6 + ratio * 0.7)
    } else {
        base * ratio * 0.5
    };

    // Longer than ever observed: near-certain, never absolute.
    if stats.max_gap > 0 && gap_now > stats.max_gap as f64 {
        conf = conf.min(MAX_CONFIDENCE as f64);
    }
    clamp_confidence(conf)
}

fn clamp_confidence(raw: f64) -> u8 {
    (raw.trunc() as i64).clamp(MIN_CONFIDENCE as i64, MAX_CONFIDENCE as i64) as u8
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub label: String,
    pub numbers: Vec<u32>,
    pub gaps: Vec<u32>,
    pub max_gap: u32,
    pub count: usize,
}

/// Per-category occurrence lists with their gaps, for statistics display.
pub fn summarize(map: &CategoryMap) -> Vec<CategorySummary> {
    map.iter()
        .map(|(category, numbers)| {
            let mut numbers = numbers.clone();
            numbers.sort_unstable();
            let gaps: Vec<u32> = numbers.windows(2).map(|w| w[1] - w[0]).collect();
            CategorySummary {
                category: *category,
                label: category.label(),
                max_gap: gaps.iter().copied().max().unwrap_or(0),
                count: numbers.len(),
                numbers,
                gaps,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_stats_basic() {
        let s = compute_gap_stats(&[20, 10, 35], 50);
        assert_eq!(s.occurrences, 3);
        assert_eq!(s.gaps, vec![10, 15]);
        assert!((s.average_gap - 12.5).abs() < 1e-9);
        assert_eq!(s.max_gap, 15);
        assert_eq!(s.last_position, 35);
        assert_eq!(s.current_gap, 15);
    }

    #[test]
    fn single_occurrence_falls_back_to_span() {
        let s = compute_gap_stats(&[12], 40);
        assert!(s.gaps.is_empty());
        assert!((s.average_gap - 40.0).abs() < 1e-9);
        assert_eq!(s.max_gap, 40);
        assert_eq!(s.current_gap, 28);
    }

    #[test]
    fn empty_positions() {
        let s = compute_gap_stats(&[], 40);
        assert_eq!(s, GapStats::empty());
        assert_eq!(confidence(&s, 0.5, 3), 0);
    }

    #[test]
    fn zero_frequency_is_zero() {
        let s = compute_gap_stats(&[1, 5], 10);
        assert_eq!(confidence(&s, 0.0, 0), 0);
    }

    #[test]
    fn overdue_raises_confidence() {
        let s = compute_gap_stats(&[10, 20, 30, 40], 42);
        let early = confidence(&s, 0.2, 0);
        let due = confidence(&s, 0.2, 8);
        let late = confidence(&s, 0.2, 20);
        assert!(early < due, "{early} < {due}");
        assert!(due < late, "{due} < {late}");
        assert_eq!(due, 20);
    }

    #[test]
    fn confidence_bands_exact() {
        // Average and max gap 8, base 25, last seen at the latest round.
        let s = compute_gap_stats(&[8, 16, 24, 32], 32);
        let at = |gap_now: u32| confidence(&s, 0.25, gap_now);
        assert_eq!(at(4), 6); // ratio 0.5
        assert_eq!(at(6), 28); // 0.75
        assert_eq!(at(8), 25); // 1.0
        assert_eq!(at(10), 35); // 1.25
        assert_eq!(at(12), 45); // 1.5
        assert_eq!(at(14), 52); // 1.75
        assert_eq!(at(16), 60); // 2.0
        assert_eq!(at(18), 65); // 2.25
        assert_eq!(at(20), 70); // 2.5
        assert_eq!(at(40), 70); // 5.0
    }

    #[test]
    fn confidence_stays_in_bounds() {
        let s = compute_gap_stats(&[1, 2], 2);
        assert_eq!(confidence(&s, 1.0, 500), MAX_CONFIDENCE);
        let s = compute_gap_stats(&[1, 90], 90);
        assert_eq!(confidence(&s, 0.01, 0), MIN_CONFIDENCE);
    }

    #[test]
    fn summarize_reports_gaps() {
        let mut map = CategoryMap::new();
        map.insert(
            Category::Parity(crate::round::Parity::Even),
            vec![3, 9, 4],
        );
        let rows = summarize(&map);
        assert_eq!(rows[0].numbers, vec![3, 4, 9]);
        assert_eq!(rows[0].gaps, vec![1, 5]);
        assert_eq!(rows[0].max_gap, 5);
        assert_eq!(rows[0].count, 3);
    }
}
