//! Shared engine for the layer-vs-expression correlation collectors.

use rayon::prelude::*;

use driverscope_common::{
    AnalysisError, CollectorConfig, CorrelationMethod, EvidenceRecord, EvidenceSlice,
    EvidenceType, Result,
};
use driverscope_omics::{Cohort, NumericMatrix};

use crate::normalise::gated_score;
use crate::stats;

/// Which sign of the correlation counts as regulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Copy-number gain raises expression.
    Positive,
    /// Methylation silences expression.
    Negative,
}

impl Direction {
    fn directional(self, r: f64) -> f64 {
        match self {
            Direction::Positive => r.max(0.0),
            Direction::Negative => (-r).max(0.0),
        }
    }
}

/// Correlate each gene's `layer` row with its expression row over the
/// cohort's paired samples. Genes without a layer row, or with fewer than
/// `min_paired_samples` finite pairs, produce no record.
pub fn correlate_layer<F>(
    cohort: &Cohort<'_>,
    config: &CollectorConfig,
    evidence_type: EvidenceType,
    layer: &NumericMatrix,
    direction: Direction,
    is_altered: F,
) -> Result<EvidenceSlice>
where
    F: Fn(f64) -> bool + Sync,
{
    let min_pairs = config.min_paired_samples;
    if cohort.len() < min_pairs {
        return Err(AnalysisError::insufficient(
            evidence_type,
            min_pairs,
            cohort.len(),
            "paired samples",
        ));
    }

    let expr = &cohort.dataset().expression;
    let records: Vec<EvidenceRecord> = (0..expr.n_genes())
        .into_par_iter()
        .filter_map(|g| {
            let gene = &expr.genes()[g];
            let layer_row = layer.row_by_gene(gene)?;
            let (lx, ex) = cohort.paired_values(layer_row, expr.row(g));
            let n = lx.len();
            if n < min_pairs {
                return None;
            }
            let r = match config.correlation_method {
                CorrelationMethod::Pearson => stats::pearson(&lx, &ex),
                CorrelationMethod::Spearman => stats::spearman(&lx, &ex),
            }?;
            let p = stats::correlation_p_value(r, n);
            let scored = gated_score(
                p,
                direction.directional(r),
                config.p_value_threshold,
                config.effect_size_threshold,
            );
            let altered = lx.iter().filter(|v| is_altered(**v)).count() as f64 / n as f64;
            Some(
                EvidenceRecord::new(gene.clone(), evidence_type, scored.score, p, r, scored.confidence)
                    .with_metadata("correlation", r)
                    .with_metadata("n_pairs", n as f64)
                    .with_metadata("alteration_frequency", altered),
            )
        })
        .collect();

    let mut slice = EvidenceSlice::new(evidence_type);
    for r in records {
        slice.push(r);
    }
    Ok(slice)
}
