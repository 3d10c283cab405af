use anyhow::{Result, bail};

use crate::config::PredictorConfig;

/// A round range and threshold that passed the caller-side checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    pub from: u32,
    pub to: u32,
    pub min_confidence: u8,
}

impl RangeRequest {
    /// Swaps reversed bounds, lifts non-positive bounds to 1, rejects ranges wider than
    /// `max_range` and raises the threshold to the configured floor.
    pub fn normalize(
        from: i64,
        to: i64,
        min_confidence: Option<u8>,
        cfg: &PredictorConfig,
    ) -> Result<Self> {
        let (lo, hi) = if from > to { (to, from) } else { (from, to) };
        let lo = lo.max(1);
        let hi = hi.max(1);
        if hi > u32::MAX as i64 {
            bail!("round {hi} is out of range");
        }
        let width = hi - lo + 1;
        if width > cfg.max_range as i64 {
            bail!(
                "range #{lo}..#{hi} covers {width} rounds, the limit is {}",
                cfg.max_range
            );
        }
        let min_confidence = min_confidence
            .unwrap_or(cfg.default_min_confidence)
            .max(cfg.min_confidence_floor);
        Ok(Self {
            from: lo as u32,
            to: hi as u32,
            min_confidence,
        })
    }

    pub fn len(&self) -> u32 {
        self.to - self.from + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_and_floors() {
        let cfg = PredictorConfig::default();
        let req = RangeRequest::normalize(50, -3, Some(5), &cfg).unwrap();
        assert_eq!(req.from, 1);
        assert_eq!(req.to, 50);
        assert_eq!(req.min_confidence, cfg.min_confidence_floor);
        assert_eq!(req.len(), 50);
    }

    #[test]
    fn default_threshold_when_missing() {
        let cfg = PredictorConfig::default();
        let req = RangeRequest::normalize(10, 20, None, &cfg).unwrap();
        assert_eq!(req.min_confidence, 38);
    }

    #[test]
    fn rejects_wide_ranges() {
        let cfg = PredictorConfig {
            max_range: 10,
            ..PredictorConfig::default()
        };
        assert!(RangeRequest::normalize(1, 10, None, &cfg).is_ok());
        let err = RangeRequest::normalize(1, 11, None, &cfg).unwrap_err();
        assert!(err.to_string().contains("limit is 10"));
    }
}
