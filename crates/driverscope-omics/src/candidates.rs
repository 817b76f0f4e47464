//! Candidate gene pre-selection.
//!
//! Large expression tables are narrowed to the most variable genes plus any
//! gene that is frequently copy-number altered or frequently mutated.

use std::collections::BTreeSet;
use tracing::info;

use crate::dataset::AlignedDataset;

/// Fraction of samples that must be CNV-altered for a gene to be kept.
pub const FREQUENT_CNV_FRACTION: f64 = 0.10;
/// Fraction of samples that must carry a mutation for a gene to be kept.
pub const FREQUENT_MUTATION_FRACTION: f64 = 0.05;

pub fn select_candidate_genes(
    data: &AlignedDataset,
    variance_limit: usize,
    cnv_alteration_cutoff: f64,
) -> BTreeSet<String> {
    let n_samples = data.n_samples() as f64;

    let mut variances: Vec<(&String, f64)> = data
        .expression
        .genes()
        .iter()
        .enumerate()
        .map(|(i, g)| (g, sample_variance(data.expression.row(i))))
        .filter(|(_, v)| v.is_finite())
        .collect();
    variances.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut candidates: BTreeSet<String> = variances
        .iter()
        .take(variance_limit)
        .map(|(g, _)| (*g).clone())
        .collect();
    let n_variable = candidates.len();

    let mut n_cnv = 0;
    if let Some(cnv) = &data.cnv {
        for (i, gene) in cnv.genes().iter().enumerate() {
            let altered = cnv
                .row(i)
                .iter()
                .filter(|v| v.is_finite() && v.abs() > cnv_alteration_cutoff)
                .count();
            if altered as f64 > n_samples * FREQUENT_CNV_FRACTION && candidates.insert(gene.clone()) {
                n_cnv += 1;
            }
        }
    }

    let mut n_mut = 0;
    if let Some(mutations) = &data.mutations {
        for gene in mutations.genes() {
            let mutated = mutations.mutated_positions(gene, |_| true).len();
            if mutated as f64 > n_samples * FREQUENT_MUTATION_FRACTION
                && candidates.insert(gene.to_string())
            {
                n_mut += 1;
            }
        }
    }

    info!(
        n_candidates = candidates.len(),
        n_variable,
        added_cnv = n_cnv,
        added_mutation = n_mut,
        "Selected candidate genes"
    );
    candidates
}

/// Unbiased variance over finite values; NaN with fewer than two.
fn sample_variance(row: &[f64]) -> f64 {
    let vals: Vec<f64> = row.iter().copied().filter(|v| v.is_finite()).collect();
    if vals.len() < 2 {
        return f64::NAN;
    }
    let mean = vals.iter().sum::<f64>() / vals.len() as f64;
    vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (vals.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::NumericMatrix;
    use crate::mutation::{MutationCall, MutationTable};
    use crate::OmicsDataset;

    #[test]
    fn test_variance_top_n_plus_altered_genes() {
        let samples: Vec<String> = (1..=10).map(|i| format!("S{i}")).collect();
        let expr = NumericMatrix::from_rows(
            samples.clone(),
            vec![
                ("FLAT".into(), vec![1.0; 10]),
                ("WIDE".into(), (0..10).map(|i| i as f64 * 3.0).collect()),
                ("MID".into(), (0..10).map(|i| i as f64).collect()),
            ],
        )
        .unwrap();
        let cnv = NumericMatrix::from_rows(
            samples.clone(),
            vec![("AMP".into(), vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0])],
        )
        .unwrap();
        let muts = MutationTable::new(vec![MutationCall::new("KRAS", "S1", "Missense_Mutation")]);
        let ds = OmicsDataset::new(expr)
            .with_cnv(cnv)
            .with_mutations(muts)
            .align()
            .unwrap();

        let picked = select_candidate_genes(&ds, 1, 0.5);
        let picked: Vec<&str> = picked.iter().map(|s| s.as_str()).collect();
        // 2/10 altered > 10%; 1/10 mutated > 5%
        assert_eq!(picked, vec!["AMP", "KRAS", "WIDE"]);
    }
}
