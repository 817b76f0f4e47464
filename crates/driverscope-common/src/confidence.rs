//! Confidence logic: record-level confidence for a single statistical test
//! and the tier classification of an integrated causal score.

use serde::{Deserialize, Serialize};

use crate::entities::ConfidenceLevel;
use crate::error::{AnalysisError, Result};

/// Floor applied to p-values before taking -log10.
pub const MIN_P_VALUE: f64 = 1e-10;

/// Confidence of one test result from its p-value and effect magnitude.
/// Returns the mean of the significance confidence (-log10 p / 10, capped at 1)
/// and the effect confidence (|effect| / threshold, capped at 1).
pub fn record_confidence(p_value: f64, effect_size: f64, effect_size_threshold: f64) -> f64 {
    let p_confidence = (-(p_value.max(MIN_P_VALUE)).log10() / 10.0).min(1.0);
    let effect_confidence = if effect_size_threshold > 0.0 {
        (effect_size.abs() / effect_size_threshold).min(1.0)
    } else {
        0.0
    };
    ((p_confidence + effect_confidence) / 2.0).clamp(0.0, 1.0)
}

// ── Tier classification ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceThresholds {
    /// Minimum causal score for the High tier.
    #[serde(default = "default_high")]
    pub high: f64,
    /// Minimum causal score for the Medium tier.
    #[serde(default = "default_medium")]
    pub medium: f64,
    /// Minimum number of contributing evidence types for the High tier.
    #[serde(default = "default_min_high_evidence")]
    pub min_high_evidence: usize,
}

fn default_high() -> f64 { 0.7 }
fn default_medium() -> f64 { 0.4 }
fn default_min_high_evidence() -> usize { 3 }

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: default_high(),
            medium: default_medium(),
            min_high_evidence: default_min_high_evidence(),
        }
    }
}

impl ConfidenceThresholds {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("high", self.high), ("medium", self.medium)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(AnalysisError::Config(format!(
                    "confidence.{name} must be in [0, 1], got {v}"
                )));
            }
        }
        if self.medium > self.high {
            return Err(AnalysisError::Config(format!(
                "confidence.medium ({}) must not exceed confidence.high ({})",
                self.medium, self.high
            )));
        }
        Ok(())
    }
}

/// Maps (causal score, evidence type count) to a [`ConfidenceLevel`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfidenceClassifier {
    thresholds: ConfidenceThresholds,
}

impl ConfidenceClassifier {
    pub fn new(thresholds: ConfidenceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ConfidenceThresholds {
        &self.thresholds
    }

    pub fn classify(&self, causal_score: f64, evidence_type_count: usize) -> ConfidenceLevel {
        let t = &self.thresholds;
        let strong = causal_score >= t.high;
        if strong && evidence_type_count >= t.min_high_evidence {
            ConfidenceLevel::High
        } else if causal_score >= t.medium || strong {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let c = ConfidenceClassifier::default();
        assert_eq!(c.classify(0.85, 4), ConfidenceLevel::High);
        assert_eq!(c.classify(0.70, 3), ConfidenceLevel::High);
        assert_eq!(c.classify(0.85, 2), ConfidenceLevel::Medium);
        assert_eq!(c.classify(0.55, 5), ConfidenceLevel::Medium);
        assert_eq!(c.classify(0.40, 1), ConfidenceLevel::Medium);
        assert_eq!(c.classify(0.39, 5), ConfidenceLevel::Low);
    }

    #[test]
    fn test_thresholds_are_overridable() {
        let c = ConfidenceClassifier::new(ConfidenceThresholds {
            high: 0.9,
            medium: 0.2,
            min_high_evidence: 2,
        });
        assert_eq!(c.classify(0.85, 5), ConfidenceLevel::Medium);
        assert_eq!(c.classify(0.91, 2), ConfidenceLevel::High);
        assert_eq!(c.classify(0.25, 1), ConfidenceLevel::Medium);
    }

    #[test]
    fn test_tier_monotone_in_score() {
        let c = ConfidenceClassifier::default();
        for count in 0..=5 {
            let mut prev = ConfidenceLevel::Low;
            for step in 0..=1000 {
                let level = c.classify(step as f64 / 1000.0, count);
                assert!(level >= prev, "score {} count {count}", step as f64 / 1000.0);
                prev = level;
            }
        }
    }

    #[test]
    fn test_medium_above_high_rejected() {
        let t = ConfidenceThresholds { high: 0.5, medium: 0.6, min_high_evidence: 3 };
        assert!(t.validate().is_err());
        assert!(ConfidenceThresholds::default().validate().is_ok());
    }

    #[test]
    fn test_record_confidence() {
        // p = 1e-5 → 0.5; effect 0.15 / 0.3 → 0.5
        let c = record_confidence(1e-5, 0.15, 0.3);
        assert!((c - 0.5).abs() < 1e-12);
        // Floors and caps
        assert!((record_confidence(0.0, 10.0, 0.3) - 1.0).abs() < 1e-12);
        assert!((record_confidence(1.0, 0.0, 0.3)).abs() < 1e-12);
    }
}
