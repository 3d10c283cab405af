use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const CONFIG_PATH_ENV: &str = "GAPCAST_CONFIG";

/// Tuning knobs for list generation and the caller-side request guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Candidates kept per category after spacing, before cross-category resolution.
    pub candidates_per_category: usize,
    /// Round numbers a category may own in the final list.
    pub max_per_category: usize,
    /// Repeating cycles each historical gap is re-projected over.
    pub gap_projection_cycles: u32,
    /// Multiples of the blended gap projected forward.
    pub cycle_projection_multiples: u32,
    /// Per-cycle decay for historical gap projections.
    pub gap_cycle_decay: f64,
    /// Per-multiple decay for blended-gap projections.
    pub pure_cycle_decay: f64,
    /// Weight of the long-run average gap in the blended gap.
    pub historical_blend: f64,
    /// Weight of the recent average gap in the blended gap.
    pub recent_blend: f64,
    /// The most recent `len / recent_fraction_divisor` gaps (at least one) count as recent.
    pub recent_fraction_divisor: usize,
    /// How many times a recent gap is counted when weighting gap frequencies.
    pub recent_gap_multiplicity: usize,
    /// Scale applied to a gap's weighted frequency.
    pub gap_weight_scale: f64,
    /// Share of the base frequency every gap projection receives.
    pub base_share: f64,
    /// Bonus points per unit of overdue ratio beyond 1.0.
    pub overdue_bonus_per_ratio: f64,
    pub overdue_bonus_cap: u32,
    /// Bonus points per round beyond the historical maximum gap.
    pub extreme_bonus_per_round: f64,
    pub extreme_bonus_cap: u32,
    /// Categories below this frequency use `rare_floor_ratio`, others `common_floor_ratio`.
    pub rare_frequency_threshold: f64,
    pub rare_floor_ratio: f64,
    pub common_floor_ratio: f64,
    /// Upper bound on the overdue ratio used by blended-gap projections.
    pub overdue_ratio_cap: f64,
    /// Skip the neutral score bands during list generation.
    pub exclude_neutral_bands: bool,
    /// Aggregate the face×suit facet as well.
    pub include_face_suits: bool,
    /// Entries per round in the per-round forecast.
    pub forecast_top_n: usize,
    /// Points a confidence must move before it counts as a trend.
    pub trend_margin: u8,
    /// Widest round range a request may cover.
    pub max_range: u32,
    /// Lowest minimum-confidence a request may ask for.
    pub min_confidence_floor: u8,
    /// Minimum confidence used when a request does not name one.
    pub default_min_confidence: u8,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            candidates_per_category: 15,
            max_per_category: 4,
            gap_projection_cycles: 3,
            cycle_projection_multiples: 5,
            gap_cycle_decay: 0.9,
            pure_cycle_decay: 0.85,
            historical_blend: 0.7,
            recent_blend: 0.3,
            recent_fraction_divisor: 3,
            recent_gap_multiplicity: 2,
            gap_weight_scale: 2.5,
            base_share: 0.25,
            overdue_bonus_per_ratio: 12.0,
            overdue_bonus_cap: 25,
            extreme_bonus_per_round: 3.0,
            extreme_bonus_cap: 35,
            rare_frequency_threshold: 0.25,
            rare_floor_ratio: 0.72,
            common_floor_ratio: 0.55,
            overdue_ratio_cap: 2.0,
            exclude_neutral_bands: true,
            include_face_suits: false,
            forecast_top_n: 6,
            trend_margin: 5,
            max_range: 500,
            min_confidence_floor: 20,
            default_min_confidence: 38,
        }
    }
}

impl PredictorConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.candidates_per_category > 0, "candidates_per_category must be positive");
        ensure!(self.max_per_category > 0, "max_per_category must be positive");
        ensure!(self.recent_fraction_divisor > 0, "recent_fraction_divisor must be positive");
        ensure!(self.recent_gap_multiplicity > 0, "recent_gap_multiplicity must be positive");
        for (name, decay) in [
            ("gap_cycle_decay", self.gap_cycle_decay),
            ("pure_cycle_decay", self.pure_cycle_decay),
        ] {
            ensure!(decay > 0.0 && decay <= 1.0, "{name} must be in (0, 1], got {decay}");
        }
        ensure!(
            self.historical_blend >= 0.0 && self.recent_blend >= 0.0,
            "blend weights must be non-negative"
        );
        ensure!(
            (self.historical_blend + self.recent_blend - 1.0).abs() < 1e-6,
            "blend weights must sum to 1"
        );
        ensure!(self.max_range > 0, "max_range must be positive");
        ensure!(self.min_confidence_floor <= 95, "min_confidence_floor above 95");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&raw).context("parse predictor config")?;
        cfg.validate()?;
        info!(path = %path.display(), "loaded predictor config");
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("serialize predictor config")?;
        fs::write(&tmp, json).context("write predictor config")?;
        fs::rename(&tmp, path).context("swap predictor config")?;
        Ok(())
    }

    /// Loads the file named by `GAPCAST_CONFIG` (defaults otherwise), then applies env
    /// overrides.
    pub fn from_env() -> Result<Self> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        let cfg = base.with_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Applies `GAPCAST_*` overrides from `lookup`. Unparseable values keep the current one.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        override_value(&lookup, "GAPCAST_MAX_PER_CATEGORY", &mut self.max_per_category);
        override_value(
            &lookup,
            "GAPCAST_CANDIDATES_PER_CATEGORY",
            &mut self.candidates_per_category,
        );
        override_value(&lookup, "GAPCAST_MIN_CONFIDENCE", &mut self.default_min_confidence);
        override_value(
            &lookup,
            "GAPCAST_MIN_CONFIDENCE_FLOOR",
            &mut self.min_confidence_floor,
        );
        override_value(&lookup, "GAPCAST_MAX_RANGE", &mut self.max_range);
        override_value(&lookup, "GAPCAST_FACE_SUITS", &mut self.include_face_suits);
        override_value(
            &lookup,
            "GAPCAST_EXCLUDE_NEUTRAL",
            &mut self.exclude_neutral_bands,
        );
        override_value(&lookup, "GAPCAST_TOP_N", &mut self.forecast_top_n);
        self
    }
}

fn override_value<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(val) => *slot = val,
        Err(_) => warn!(key, value = %raw, "ignoring unparseable override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        PredictorConfig::default().validate().unwrap();
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GAPCAST_MAX_PER_CATEGORY", "6"),
            ("GAPCAST_FACE_SUITS", "true"),
            ("GAPCAST_MAX_RANGE", "lots"),
        ]);
        let cfg = PredictorConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.max_per_category, 6);
        assert!(cfg.include_face_suits);
        assert_eq!(cfg.max_range, 500);
    }

    #[test]
    fn validate_rejects_bad_blend() {
        let cfg = PredictorConfig {
            recent_blend: 0.5,
            ..PredictorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PredictorConfig = serde_json::from_str(r#"{"max_per_category": 2}"#).unwrap();
        assert_eq!(cfg.max_per_category, 2);
        assert_eq!(cfg.candidates_per_category, 15);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("gapcast-cfg-{}", std::process::id()));
        let path = dir.join("predictor.json");
        let cfg = PredictorConfig {
            max_range: 120,
            ..PredictorConfig::default()
        };
        cfg.save(&path).unwrap();
        let loaded = PredictorConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
        let _ = std::fs::remove_dir_all(dir);
    }
}
