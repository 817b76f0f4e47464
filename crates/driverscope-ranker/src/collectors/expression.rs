//! Tumour vs normal differential expression.

use rayon::prelude::*;

use driverscope_common::confidence::record_confidence;
use driverscope_common::{
    AnalysisError, CollectorConfig, EvidenceRecord, EvidenceSlice, EvidenceType, Result,
    TwoSampleTest,
};
use driverscope_omics::{AlignedDataset, Cohort, SampleGroup};

use crate::normalise::{effect_component, minmax_population_or, neg_log10_p, significance_component};
use crate::stats::{self, TTest};

pub struct DifferentialExpressionCollector;

struct GeneTest {
    gene: String,
    test: TTest,
    log2_fold_change: f64,
    tumor_mean: f64,
    normal_mean: f64,
    tumor_n: usize,
    normal_n: usize,
}

impl super::EvidenceCollector for DifferentialExpressionCollector {
    fn evidence_type(&self) -> EvidenceType {
        EvidenceType::DifferentialExpression
    }

    fn is_available(&self, _data: &AlignedDataset) -> bool {
        true
    }

    fn collect(&self, cohort: &Cohort<'_>, config: &CollectorConfig) -> Result<EvidenceSlice> {
        let min = config.min_samples_per_group;
        let tumor = cohort.group_positions(SampleGroup::Tumor);
        let normal = cohort.group_positions(SampleGroup::Normal);
        if tumor.len() < min || normal.len() < min {
            return Err(AnalysisError::insufficient(
                EvidenceType::DifferentialExpression,
                min,
                tumor.len().min(normal.len()),
                format!("{} tumor / {} normal samples", tumor.len(), normal.len()),
            ));
        }

        let expr = &cohort.dataset().expression;
        let tests: Vec<GeneTest> = (0..expr.n_genes())
            .into_par_iter()
            .filter_map(|g| {
                let row = expr.row(g);
                let t = Cohort::values_at(row, &tumor);
                let n = Cohort::values_at(row, &normal);
                if t.len() < min || n.len() < min {
                    return None;
                }
                let test = match config.de_test {
                    TwoSampleTest::Welch => stats::welch_t_test(&t, &n),
                    TwoSampleTest::Student => stats::student_t_test(&t, &n),
                }?;
                let (tumor_mean, normal_mean) = (stats::mean(&t), stats::mean(&n));
                let log2_fold_change = if config.expression_is_log2 {
                    tumor_mean - normal_mean
                } else {
                    ((tumor_mean + 1.0) / (normal_mean + 1.0)).log2()
                };
                log2_fold_change.is_finite().then(|| GeneTest {
                    gene: expr.genes()[g].clone(),
                    test,
                    log2_fold_change,
                    tumor_mean,
                    normal_mean,
                    tumor_n: t.len(),
                    normal_n: n.len(),
                })
            })
            .collect();

        // Both components are min-max scaled across the tested genes. With a
        // single gene or a fully tied population they fall back to the
        // fixed-scale components.
        let sig = minmax_population_or(
            &tests.iter().map(|t| neg_log10_p(t.test.p_value)).collect::<Vec<_>>(),
            &tests
                .iter()
                .map(|t| significance_component(t.test.p_value, config.p_value_threshold))
                .collect::<Vec<_>>(),
        );
        let eff = minmax_population_or(
            &tests.iter().map(|t| t.log2_fold_change.abs()).collect::<Vec<_>>(),
            &tests
                .iter()
                .map(|t| effect_component(t.log2_fold_change, config.effect_size_threshold))
                .collect::<Vec<_>>(),
        );

        let mut slice = EvidenceSlice::new(EvidenceType::DifferentialExpression);
        for ((t, s), e) in tests.into_iter().zip(sig).zip(eff) {
            let confidence = record_confidence(t.test.p_value, t.log2_fold_change, config.effect_size_threshold);
            let record = EvidenceRecord::new(
                t.gene,
                EvidenceType::DifferentialExpression,
                0.5 * s + 0.5 * e,
                t.test.p_value,
                t.log2_fold_change,
                confidence,
            )
            .with_metadata("t_statistic", t.test.statistic)
            .with_metadata("degrees_of_freedom", t.test.df)
            .with_metadata("tumor_mean", t.tumor_mean)
            .with_metadata("normal_mean", t.normal_mean)
            .with_metadata("tumor_n", t.tumor_n as f64)
            .with_metadata("normal_n", t.normal_n as f64);
            slice.push(record);
        }
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::test_support::small_dataset;
    use crate::collectors::EvidenceCollector;

    #[test]
    fn test_overexpressed_gene_scores_highest() {
        let ds = small_dataset();
        let slice = DifferentialExpressionCollector
            .collect(&Cohort::full(&ds), &CollectorConfig::default())
            .unwrap();
        let up = slice.records.iter().find(|r| r.gene_id == "UP").unwrap();
        assert!(up.p_value < 1e-4);
        assert!(up.effect_size > 7.0);
        assert_eq!(up.score, 1.0);
        for r in &slice.records {
            assert!(r.score <= up.score);
            assert!((0.0..=1.0).contains(&r.score));
        }
    }

    #[test]
    fn test_constant_gene_has_no_record() {
        let ds = small_dataset();
        let slice = DifferentialExpressionCollector
            .collect(&Cohort::full(&ds), &CollectorConfig::default())
            .unwrap();
        assert!(slice.records.iter().all(|r| r.gene_id != "FLAT"));
    }

    #[test]
    fn test_too_few_normals_is_insufficient() {
        let ds = small_dataset();
        // T1..T6 plus N1, N2
        let cohort = Cohort::from_positions(&ds, (0..8).collect());
        let err = DifferentialExpressionCollector
            .collect(&cohort, &CollectorConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InsufficientSamples { evidence_type: EvidenceType::DifferentialExpression, observed: 2, .. }
        ));
    }

    #[test]
    fn test_single_gene_scored_on_fixed_scale() {
        let full = small_dataset();
        let config = CollectorConfig::default();
        let only = |gene: &str| full.restricted_to(&[gene.to_string()].into_iter().collect());

        let noise = only("NOISE");
        let slice = DifferentialExpressionCollector.collect(&Cohort::full(&noise), &config).unwrap();
        assert_eq!(slice.len(), 1);
        // Equal group means: nothing to report however the population is scaled
        assert!(slice.records[0].p_value > 0.99);
        assert_eq!(slice.records[0].score, 0.0);

        let up = only("UP");
        let slice = DifferentialExpressionCollector.collect(&Cohort::full(&up), &config).unwrap();
        let r = &slice.records[0];
        let expected = 0.5 * significance_component(r.p_value, config.p_value_threshold)
            + 0.5 * effect_component(r.effect_size, config.effect_size_threshold);
        assert!((r.score - expected).abs() < 1e-12);
        assert!(r.score > 0.5);
    }

    #[test]
    fn test_linear_scale_fold_change() {
        let ds = small_dataset();
        let config = CollectorConfig {
            expression_is_log2: false,
            ..Default::default()
        };
        let slice = DifferentialExpressionCollector.collect(&Cohort::full(&ds), &config).unwrap();
        let up = slice.records.iter().find(|r| r.gene_id == "UP").unwrap();
        let expected = ((10.25f64 + 1.0) / (2.425 + 1.0)).log2();
        assert!((up.effect_size - expected).abs() < 1e-9);
    }
}
