//! Score normalisation and the shared evidence scoring rules.

use driverscope_common::confidence::{record_confidence, MIN_P_VALUE};

/// Average 1-based ranks in ascending order; ties share the mean rank.
/// Returns ranks in the same order as input.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && indexed[j + 1].1 == indexed[i].1 {
            j += 1;
        }
        let avg_rank = (i + 1 + j + 1) as f64 / 2.0;
        for item in &indexed[i..=j] {
            ranks[item.0] = avg_rank;
        }
        i = j + 1;
    }
    ranks
}

const MIN_SPREAD: f64 = 1e-10;

/// Min-max normalisation within a given range [min_val, max_val].
/// An empty range maps everything to 0.
pub fn minmax_normalise(value: f64, min_val: f64, max_val: f64) -> f64 {
    if !(max_val - min_val >= MIN_SPREAD) {
        return 0.0;
    }
    ((value - min_val) / (max_val - min_val)).clamp(0.0, 1.0)
}

fn finite_range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Min-max normalise `values`, or return `absolute` when the population has
/// no spread (a single gene, or all values tied). `absolute` holds the same
/// component on a fixed scale, one entry per value.
pub fn minmax_population_or(values: &[f64], absolute: &[f64]) -> Vec<f64> {
    let (lo, hi) = finite_range(values);
    if hi - lo >= MIN_SPREAD {
        values.iter().map(|&v| minmax_normalise(v, lo, hi)).collect()
    } else {
        absolute.to_vec()
    }
}

/// −log10 p with the shared floor.
pub fn neg_log10_p(p_value: f64) -> f64 {
    -(p_value.max(MIN_P_VALUE)).log10()
}

/// `min(−log10 p / 10, 1)` when significant at `p_value_threshold`, else 0.
pub fn significance_component(p_value: f64, p_value_threshold: f64) -> f64 {
    if p_value < p_value_threshold {
        (neg_log10_p(p_value) / 10.0).min(1.0)
    } else {
        0.0
    }
}

/// `min(|effect| / threshold, 1)`.
pub fn effect_component(effect: f64, effect_size_threshold: f64) -> f64 {
    if effect_size_threshold <= 0.0 || !effect.is_finite() {
        return 0.0;
    }
    (effect.abs() / effect_size_threshold).min(1.0)
}

/// Evidence score and record confidence of one test result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub score: f64,
    pub confidence: f64,
}

/// `0.4·significance + 0.4·effect + 0.2·confidence`.
pub fn blended_score(
    p_value: f64,
    effect: f64,
    p_value_threshold: f64,
    effect_size_threshold: f64,
) -> Scored {
    let confidence = record_confidence(p_value, effect, effect_size_threshold);
    let sig = significance_component(p_value, p_value_threshold);
    let eff = effect_component(effect, effect_size_threshold);
    Scored {
        score: (0.4 * sig + 0.4 * eff + 0.2 * confidence).clamp(0.0, 1.0),
        confidence,
    }
}

/// Blended score whose significance and effect terms are zeroed when the
/// test is not significant. Used for the correlation-driven evidence.
pub fn gated_score(
    p_value: f64,
    directional_effect: f64,
    p_value_threshold: f64,
    effect_size_threshold: f64,
) -> Scored {
    let confidence = record_confidence(p_value, directional_effect, effect_size_threshold);
    if p_value >= p_value_threshold {
        return Scored {
            score: 0.2 * confidence,
            confidence,
        };
    }
    let sig = significance_component(p_value, p_value_threshold);
    let eff = effect_component(directional_effect, effect_size_threshold);
    Scored {
        score: (0.4 * sig + 0.4 * eff + 0.2 * confidence).clamp(0.0, 1.0),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_ranks_ties() {
        let ranks = average_ranks(&[30.0, 10.0, 20.0, 10.0]);
        assert_eq!(ranks, vec![4.0, 1.5, 3.0, 1.5]);
        assert!(average_ranks(&[]).is_empty());
    }

    #[test]
    fn test_minmax_population() {
        let n = minmax_population_or(&[2.0, 4.0, 3.0], &[0.0; 3]);
        assert_eq!(n, vec![0.0, 1.0, 0.5]);
        assert_eq!(minmax_normalise(7.0, 7.0, 7.0), 0.0);
        assert!(minmax_population_or(&[], &[]).is_empty());
    }

    #[test]
    fn test_minmax_falls_back_without_spread() {
        assert_eq!(minmax_population_or(&[1.0, 3.0], &[0.9, 0.9]), vec![0.0, 1.0]);
        assert_eq!(minmax_population_or(&[4.0], &[0.3]), vec![0.3]);
        assert_eq!(minmax_population_or(&[2.0, 2.0], &[0.1, 0.7]), vec![0.1, 0.7]);
    }

    #[test]
    fn test_significance_gate() {
        assert_eq!(significance_component(0.2, 0.05), 0.0);
        assert!((significance_component(1e-5, 0.05) - 0.5).abs() < 1e-12);
        assert_eq!(significance_component(1e-30, 0.05), 1.0);
    }

    #[test]
    fn test_blended_score_formula() {
        // sig 0.5, effect 0.5, confidence 0.5 → 0.5
        let s = blended_score(1e-5, 0.15, 0.05, 0.3);
        assert!((s.score - 0.5).abs() < 1e-12);
        assert!((s.confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_gated_score_suppresses_nonsignificant() {
        let strong = gated_score(1e-6, 0.8, 0.05, 0.3);
        let weak = gated_score(0.3, 0.8, 0.05, 0.3);
        assert!(strong.score > weak.score);
        assert!((weak.score - 0.2 * weak.confidence).abs() < 1e-12);
    }
}
