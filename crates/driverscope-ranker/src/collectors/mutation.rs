//! Mutation recurrence against a background rate.

use rayon::prelude::*;

use driverscope_common::{
    AnalysisError, CollectorConfig, EvidenceRecord, EvidenceSlice, EvidenceType, MutationTest,
    Result,
};
use driverscope_omics::{AlignedDataset, Cohort};

use crate::normalise::blended_score;
use crate::stats;

pub struct MutationFrequencyCollector;

impl super::EvidenceCollector for MutationFrequencyCollector {
    fn evidence_type(&self) -> EvidenceType {
        EvidenceType::MutationFrequency
    }

    fn is_available(&self, data: &AlignedDataset) -> bool {
        data.mutations.is_some()
    }

    fn collect(&self, cohort: &Cohort<'_>, config: &CollectorConfig) -> Result<EvidenceSlice> {
        let Some(index) = cohort.dataset().mutations.as_ref() else {
            return Ok(EvidenceSlice::new(EvidenceType::MutationFrequency));
        };
        let n = cohort.len();
        if n < config.min_samples_per_group {
            return Err(AnalysisError::insufficient(
                EvidenceType::MutationFrequency,
                config.min_samples_per_group,
                n,
                "cohort samples",
            ));
        }

        // Bootstrap repeats count once per draw.
        let multiplicity = cohort.multiplicity();
        let background = config.background_mutation_rate;
        let genes: Vec<&str> = index.genes().collect();

        let records: Vec<EvidenceRecord> = genes
            .par_iter()
            .filter_map(|gene| {
                let mutated = index.mutated_positions(gene, |t| config.counts_mutation_type(t));
                let k: u64 = mutated.iter().map(|&p| multiplicity[p] as u64).sum();
                if k == 0 {
                    return None;
                }
                let frequency = k as f64 / n as f64;
                let p = match config.mutation_test {
                    MutationTest::Binomial => stats::binomial_sf(k, n as u64, background),
                    MutationTest::Poisson => stats::poisson_sf(k, n as f64 * background),
                };
                let scored = blended_score(p, frequency, config.p_value_threshold, config.effect_size_threshold);
                Some(
                    EvidenceRecord::new(*gene, EvidenceType::MutationFrequency, scored.score, p, frequency, scored.confidence)
                        .with_metadata("mutated_samples", k as f64)
                        .with_metadata("cohort_size", n as f64)
                        .with_metadata("expected_mutated", n as f64 * background)
                        .with_metadata("fold_enrichment", frequency / background),
                )
            })
            .collect();

        let mut slice = EvidenceSlice::new(EvidenceType::MutationFrequency);
        for r in records {
            slice.push(r);
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
    fn test_recurrent_gene_is_significant() {
        let ds = small_dataset();
        let slice = MutationFrequencyCollector
            .collect(&Cohort::full(&ds), &CollectorConfig::default())
            .unwrap();
        let up = slice.records.iter().find(|r| r.gene_id == "UP").unwrap();
        assert!((up.effect_size - 0.5).abs() < 1e-12);
        assert!(up.p_value < 1e-6);
        assert!(up.score > 0.8);
    }

    #[test]
    fn test_silent_only_gene_has_no_record() {
        let ds = small_dataset();
        let slice = MutationFrequencyCollector
            .collect(&Cohort::full(&ds), &CollectorConfig::default())
            .unwrap();
        assert!(slice.records.iter().all(|r| r.gene_id != "NOISE"));

        let keep_all = CollectorConfig {
            excluded_mutation_types: vec![],
            ..Default::default()
        };
        let slice = MutationFrequencyCollector.collect(&Cohort::full(&ds), &keep_all).unwrap();
        assert!(slice.records.iter().any(|r| r.gene_id == "NOISE"));
    }

    #[test]
    fn test_bootstrap_repeats_count() {
        let ds = small_dataset();
        // T1 drawn four times plus three normals
        let cohort = Cohort::from_positions(&ds, vec![0, 0, 0, 0, 6, 7, 8]);
        let slice = MutationFrequencyCollector.collect(&cohort, &CollectorConfig::default()).unwrap();
        let up = &slice.records[0];
        assert_eq!(up.metadata["mutated_samples"], 4.0);
        assert!((up.effect_size - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_poisson_variant() {
        let ds = small_dataset();
        let config = CollectorConfig {
            mutation_test: MutationTest::Poisson,
            ..Default::default()
        };
        let slice = MutationFrequencyCollector.collect(&Cohort::full(&ds), &config).unwrap();
        assert!(slice.records[0].p_value < 1e-6);
    }
}
