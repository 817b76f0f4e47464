//! Causal score aggregation.
//!
//! causal(g) = Σ_{i∈S} wᵢ·sᵢ / Σ_{i∈S} wᵢ
//!
//! where S is the set of evidence types present for gene g with a positive
//! weight. Weights are renormalised per gene, so missing evidence neither
//! counts as zero nor inflates other genes. A gene with no weighted evidence
//! gets no causal score at all.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use driverscope_common::{
    AnalysisConfig, BiologicalContext, CausalGene, ConfidenceClassifier, EvidenceMatrix,
    EvidenceRow, EvidenceType, EvidenceWeights, Result,
};

/// Weighted blend of one gene's evidence.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneScore {
    pub gene_id: String,
    pub causal_score: f64,
    /// Contributing types, largest score × weight first.
    pub evidence_chain: Vec<EvidenceType>,
}

#[derive(Debug, Clone)]
pub struct EvidenceAggregator {
    weights: EvidenceWeights,
    classifier: ConfidenceClassifier,
    configured_types: usize,
}

impl EvidenceAggregator {
    /// Fails with `InvalidWeightConfig` when any weight is negative or
    /// non-finite, or all weights are zero.
    pub fn new(weights: EvidenceWeights, classifier: ConfidenceClassifier) -> Result<Self> {
        weights.validate()?;
        let configured_types = weights.active_types().len();
        Ok(Self {
            weights,
            classifier,
            configured_types,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        let mut agg = Self::new(
            config.evidence_weights.clone(),
            ConfidenceClassifier::new(config.confidence.clone()),
        )?;
        agg.configured_types = config
            .collectors
            .enabled
            .iter()
            .filter(|t| config.evidence_weights.get(**t) > 0.0)
            .count()
            .max(1);
        Ok(agg)
    }

    pub fn weights(&self) -> &EvidenceWeights {
        &self.weights
    }

    /// Score one evidence row. `None` when no present type carries weight.
    pub fn score_row(&self, gene_id: &str, row: &EvidenceRow) -> Option<GeneScore> {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        let mut contributions: Vec<(EvidenceType, f64)> = Vec::with_capacity(EvidenceType::COUNT);
        for record in row.iter() {
            let w = self.weights.get(record.evidence_type);
            if w <= 0.0 {
                continue;
            }
            weighted_sum += record.score * w;
            weight_sum += w;
            contributions.push((record.evidence_type, record.score * w));
        }
        if weight_sum <= 0.0 {
            return None;
        }
        // Stable sort keeps canonical type order among equal contributions.
        contributions.sort_by(|a, b| b.1.total_cmp(&a.1));
        Some(GeneScore {
            gene_id: gene_id.to_string(),
            causal_score: (weighted_sum / weight_sum).clamp(0.0, 1.0),
            evidence_chain: contributions.into_iter().map(|(t, _)| t).collect(),
        })
    }

    /// Scores for every gene with weighted evidence, in ranking order.
    pub fn score_all(&self, matrix: &EvidenceMatrix) -> Vec<GeneScore> {
        let mut scores: Vec<GeneScore> = matrix
            .iter()
            .filter_map(|(gene, row)| self.score_row(gene, row))
            .collect();
        scores.sort_by(|a, b| {
            ranking_order(
                (a.causal_score, a.evidence_chain.len(), &a.gene_id),
                (b.causal_score, b.evidence_chain.len(), &b.gene_id),
            )
        });
        scores
    }

    /// Gene ids in ranking order, the cheap path used under resampling.
    pub fn ranking(&self, matrix: &EvidenceMatrix) -> Vec<String> {
        self.score_all(matrix).into_iter().map(|s| s.gene_id).collect()
    }

    /// Full causal gene records in ranking order.
    pub fn aggregate(&self, matrix: &EvidenceMatrix) -> Vec<CausalGene> {
        self.aggregate_annotated(matrix, None)
    }

    /// As [`aggregate`](Self::aggregate), attaching caller annotations to
    /// each gene's biological context.
    pub fn aggregate_annotated(
        &self,
        matrix: &EvidenceMatrix,
        annotations: Option<&BTreeMap<String, Value>>,
    ) -> Vec<CausalGene> {
        self.score_all(matrix)
            .into_iter()
            .filter_map(|score| {
                let row = matrix.get(&score.gene_id)?;
                let evidence_scores: BTreeMap<EvidenceType, f64> =
                    row.iter().map(|r| (r.evidence_type, r.score)).collect();
                let contributing: Vec<_> = score
                    .evidence_chain
                    .iter()
                    .filter_map(|t| row.get(*t))
                    .collect();
                let n = contributing.len() as f64;
                let biological_context = BiologicalContext {
                    mean_p_value: contributing.iter().map(|r| r.p_value).sum::<f64>() / n,
                    mean_effect_size: contributing.iter().map(|r| r.effect_size.abs()).sum::<f64>() / n,
                    evidence_consistency: (n / self.configured_types as f64).min(1.0),
                    annotations: annotations.and_then(|a| a.get(&score.gene_id)).cloned(),
                };
                Some(CausalGene {
                    confidence_level: self
                        .classifier
                        .classify(score.causal_score, score.evidence_chain.len()),
                    gene_id: score.gene_id,
                    causal_score: score.causal_score,
                    evidence_scores,
                    evidence_chain: score.evidence_chain,
                    biological_context,
                })
            })
            .collect()
    }
}

/// Causal score descending, then evidence type count descending, then gene id.
pub fn ranking_order(a: (f64, usize, &str), b: (f64, usize, &str)) -> Ordering {
    b.0.total_cmp(&a.0)
        .then_with(|| b.1.cmp(&a.1))
        .then_with(|| a.2.cmp(b.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use driverscope_common::{AnalysisError, ConfidenceLevel, EvidenceRecord};
    use pretty_assertions::assert_eq;

    fn rec(gene: &str, t: EvidenceType, score: f64) -> EvidenceRecord {
        EvidenceRecord::new(gene, t, score, 0.01, 0.5, 0.5)
    }

    fn aggregator(weights: EvidenceWeights) -> EvidenceAggregator {
        EvidenceAggregator::new(weights, ConfidenceClassifier::default()).unwrap()
    }

    fn two_type_weights() -> EvidenceWeights {
        EvidenceWeights::uniform(0.0)
            .with(EvidenceType::DifferentialExpression, 0.5)
            .with(EvidenceType::SurvivalAssociation, 0.5)
    }

    #[test]
    fn test_five_gene_blend_by_literal_arithmetic() {
        let de = [0.9, 0.1, 0.5, 0.8, 0.3];
        let surv = [0.8, 0.2, 0.5, 0.1, 0.9];
        let mut m = EvidenceMatrix::new();
        for i in 0..5 {
            let g = format!("g{}", i + 1);
            m.insert(rec(&g, EvidenceType::DifferentialExpression, de[i])).unwrap();
            m.insert(rec(&g, EvidenceType::SurvivalAssociation, surv[i])).unwrap();
        }
        let scores = aggregator(two_type_weights()).score_all(&m);
        let got: Vec<(&str, f64)> = scores.iter().map(|s| (s.gene_id.as_str(), s.causal_score)).collect();
        // (0.9+0.8)/2, (0.3+0.9)/2, (0.5+0.5)/2, (0.8+0.1)/2, (0.1+0.2)/2
        let expected = [("g1", 0.85), ("g5", 0.6), ("g3", 0.5), ("g4", 0.45), ("g2", 0.15)];
        assert_eq!(got.len(), 5);
        for ((g, s), (eg, es)) in got.iter().zip(expected) {
            assert_eq!(*g, eg);
            assert!((s - es).abs() < 1e-9, "{g}: {s} vs {es}");
        }
    }

    #[test]
    fn test_missing_methylation_renormalises_four_weights() {
        let w = EvidenceWeights::default();
        let mut m = EvidenceMatrix::new();
        let scores = [
            (EvidenceType::DifferentialExpression, 0.9),
            (EvidenceType::SurvivalAssociation, 0.6),
            (EvidenceType::CnvDriver, 0.3),
            (EvidenceType::MutationFrequency, 0.8),
        ];
        for (t, s) in scores {
            m.insert(rec("HNF1A", t, s)).unwrap();
        }
        let g = aggregator(w.clone()).score_all(&m).remove(0);
        let expected = (0.9 * 0.25 + 0.6 * 0.25 + 0.3 * 0.20 + 0.8 * 0.10) / (0.25 + 0.25 + 0.20 + 0.10);
        assert!((g.causal_score - expected).abs() < 1e-9);
        assert!(!g.evidence_chain.contains(&EvidenceType::MethylationRegulation));
    }

    #[test]
    fn test_gene_without_weighted_evidence_is_excluded() {
        let mut m = EvidenceMatrix::new();
        m.insert(rec("A", EvidenceType::DifferentialExpression, 0.7)).unwrap();
        m.insert(rec("B", EvidenceType::CnvDriver, 0.9)).unwrap();
        let genes = aggregator(two_type_weights()).aggregate(&m);
        assert_eq!(genes.len(), 1);
        assert_eq!(genes[0].gene_id, "A");
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let err = EvidenceAggregator::new(EvidenceWeights::uniform(0.0), ConfidenceClassifier::default())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidWeightConfig(_)));
    }

    #[test]
    fn test_chain_ordered_by_weighted_contribution() {
        let mut m = EvidenceMatrix::new();
        m.insert(rec("G", EvidenceType::DifferentialExpression, 0.4)).unwrap(); // 0.10
        m.insert(rec("G", EvidenceType::CnvDriver, 0.9)).unwrap(); // 0.18
        m.insert(rec("G", EvidenceType::MutationFrequency, 1.0)).unwrap(); // 0.10
        let g = aggregator(EvidenceWeights::default()).aggregate(&m).remove(0);
        assert_eq!(
            g.evidence_chain,
            vec![EvidenceType::CnvDriver, EvidenceType::DifferentialExpression, EvidenceType::MutationFrequency]
        );
        assert_eq!(g.evidence_type_count(), 3);
    }

    #[test]
    fn test_tie_break_count_then_id() {
        let mut m = EvidenceMatrix::new();
        m.insert(rec("B", EvidenceType::DifferentialExpression, 0.5)).unwrap();
        m.insert(rec("A", EvidenceType::DifferentialExpression, 0.5)).unwrap();
        m.insert(rec("C", EvidenceType::DifferentialExpression, 0.5)).unwrap();
        m.insert(rec("C", EvidenceType::SurvivalAssociation, 0.5)).unwrap();
        let agg = aggregator(two_type_weights());
        assert_eq!(agg.ranking(&m), vec!["C", "A", "B"]);
        // Idempotent
        assert_eq!(agg.aggregate(&m), agg.aggregate(&m));
    }

    #[test]
    fn test_raising_weight_never_demotes_gene_above_its_blend() {
        // Gene X: DE 0.9 > its blend; raising the DE weight must not lower its rank.
        let mut m = EvidenceMatrix::new();
        m.insert(rec("X", EvidenceType::DifferentialExpression, 0.9)).unwrap();
        m.insert(rec("X", EvidenceType::SurvivalAssociation, 0.2)).unwrap();
        m.insert(rec("Y", EvidenceType::DifferentialExpression, 0.3)).unwrap();
        m.insert(rec("Y", EvidenceType::SurvivalAssociation, 0.7)).unwrap();
        m.insert(rec("Z", EvidenceType::SurvivalAssociation, 0.6)).unwrap();

        let mut prev_rank = usize::MAX;
        for step in 1..=10 {
            let w = two_type_weights().with(EvidenceType::DifferentialExpression, step as f64 * 0.2);
            let ranking = aggregator(w).ranking(&m);
            let rank = ranking.iter().position(|g| g == "X").unwrap();
            assert!(rank <= prev_rank, "step {step}: rank {rank} > {prev_rank}");
            prev_rank = rank;
        }
    }

    #[test]
    fn test_confidence_and_context() {
        let mut m = EvidenceMatrix::new();
        for t in [EvidenceType::DifferentialExpression, EvidenceType::SurvivalAssociation, EvidenceType::CnvDriver] {
            m.insert(rec("TP53", t, 0.9)).unwrap();
        }
        let mut notes = BTreeMap::new();
        notes.insert("TP53".to_string(), serde_json::json!({"role": "tumour suppressor"}));
        let g = aggregator(EvidenceWeights::default())
            .aggregate_annotated(&m, Some(&notes))
            .remove(0);
        assert_eq!(g.confidence_level, ConfidenceLevel::High);
        assert!((g.biological_context.evidence_consistency - 0.6).abs() < 1e-12);
        assert!((g.biological_context.mean_p_value - 0.01).abs() < 1e-12);
        assert_eq!(g.biological_context.annotations.as_ref().unwrap()["role"], "tumour suppressor");
        assert_eq!(g.evidence_scores.len(), 3);
    }
}
