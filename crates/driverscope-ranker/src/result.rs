//! Output of one analysis run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use driverscope_common::{CausalGene, ConfidenceLevel, EvidenceMatrix, EvidenceType};
use driverscope_kg::{EvidenceNetwork, NetworkMetrics, PathwayAnalysis};

use crate::collectors::AbsentEvidence;
use crate::validation::ValidationReport;

/// Run-level summary statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmStats {
    pub total_genes_scored: usize,
    pub causal_genes_identified: usize,
    pub causal_gene_ratio: f64,
    /// Over the reported causal genes.
    pub mean_causal_score: f64,
    /// Genes carrying each evidence type.
    pub evidence_coverage: BTreeMap<EvidenceType, usize>,
    /// Over the reported causal genes.
    pub confidence_distribution: BTreeMap<ConfidenceLevel, usize>,
    /// Evidence types that could not be computed on the full data.
    pub absent_evidence_types: Vec<EvidenceType>,
}

impl AlgorithmStats {
    pub fn compute(
        matrix: &EvidenceMatrix,
        scored: &[CausalGene],
        causal: &[CausalGene],
        absent: &[AbsentEvidence],
    ) -> Self {
        let total = scored.len();
        let mut confidence_distribution = BTreeMap::new();
        for g in causal {
            *confidence_distribution.entry(g.confidence_level).or_insert(0) += 1;
        }
        Self {
            total_genes_scored: total,
            causal_genes_identified: causal.len(),
            causal_gene_ratio: if total > 0 { causal.len() as f64 / total as f64 } else { 0.0 },
            mean_causal_score: if causal.is_empty() {
                0.0
            } else {
                causal.iter().map(|g| g.causal_score).sum::<f64>() / causal.len() as f64
            },
            evidence_coverage: EvidenceType::ALL
                .iter()
                .map(|t| (*t, matrix.coverage(*t)))
                .collect(),
            confidence_distribution,
            absent_evidence_types: absent.iter().map(|a| a.evidence_type).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Genes at or above the causal score threshold, in ranking order.
    pub causal_genes: Vec<CausalGene>,
    pub evidence_network: EvidenceNetwork,
    pub network_metrics: NetworkMetrics,
    /// `None` when validation is disabled.
    pub validation: Option<ValidationReport>,
    pub pathway_analysis: Option<PathwayAnalysis>,
    pub stats: AlgorithmStats,
    pub warnings: Vec<String>,
}

impl AnalysisResult {
    pub fn gene(&self, gene_id: &str) -> Option<&CausalGene> {
        self.causal_genes.iter().find(|g| g.gene_id == gene_id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::EvidenceAggregator;
    use driverscope_common::{AnalysisConfig, EvidenceRecord};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stats_over_scored_and_causal() {
        let mut matrix = EvidenceMatrix::new();
        for (gene, de, cnv) in [("A", 0.9, Some(0.9)), ("B", 0.8, None), ("C", 0.1, Some(0.2))] {
            matrix
                .insert(EvidenceRecord::new(gene, EvidenceType::DifferentialExpression, de, 0.01, 1.0, 0.8))
                .unwrap();
            if let Some(s) = cnv {
                matrix
                    .insert(EvidenceRecord::new(gene, EvidenceType::CnvDriver, s, 0.01, 0.6, 0.8))
                    .unwrap();
            }
        }
        let scored = EvidenceAggregator::from_config(&AnalysisConfig::default())
            .unwrap()
            .aggregate(&matrix);
        let causal: Vec<CausalGene> = scored.iter().filter(|g| g.causal_score >= 0.7).cloned().collect();
        let absent = vec![AbsentEvidence {
            evidence_type: EvidenceType::MethylationRegulation,
            reason: "no methylation table".to_string(),
        }];

        let stats = AlgorithmStats::compute(&matrix, &scored, &causal, &absent);
        assert_eq!(stats.total_genes_scored, 3);
        assert_eq!(stats.causal_genes_identified, 2);
        assert!((stats.causal_gene_ratio - 2.0 / 3.0).abs() < 1e-12);
        // A (0.9) and B (0.8); C stays below the threshold
        assert!((stats.mean_causal_score - 0.85).abs() < 1e-12);
        assert_eq!(stats.evidence_coverage[&EvidenceType::DifferentialExpression], 3);
        assert_eq!(stats.evidence_coverage[&EvidenceType::CnvDriver], 2);
        assert_eq!(stats.evidence_coverage[&EvidenceType::SurvivalAssociation], 0);
        assert_eq!(stats.confidence_distribution.values().sum::<usize>(), 2);
        assert_eq!(stats.absent_evidence_types, vec![EvidenceType::MethylationRegulation]);
    }

    #[test]
    fn test_empty_run_has_zero_ratios() {
        let stats = AlgorithmStats::compute(&EvidenceMatrix::new(), &[], &[], &[]);
        assert_eq!(stats.causal_gene_ratio, 0.0);
        assert_eq!(stats.mean_causal_score, 0.0);
        assert!(stats.confidence_distribution.is_empty());
    }
}
