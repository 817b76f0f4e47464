//! Evidence collectors: one per evidence type.
//!
//! Each collector reads the shared, immutable cohort and produces a disjoint
//! [`EvidenceSlice`]. Collectors never see each other's output, so they run
//! as independent rayon tasks and the aggregator is the join point.

pub mod expression;
pub mod survival;
pub mod correlation;
pub mod cnv;
pub mod methylation;
pub mod mutation;

use rayon::prelude::*;
use tracing::{debug, warn};

use driverscope_common::{AnalysisError, CollectorConfig, EvidenceSlice, EvidenceType, Result};
use driverscope_omics::{AlignedDataset, Cohort};

pub use cnv::CnvDriverCollector;
pub use expression::DifferentialExpressionCollector;
pub use methylation::MethylationRegulationCollector;
pub use mutation::MutationFrequencyCollector;
pub use survival::SurvivalAssociationCollector;

/// Turns one omics layer of a cohort into per-gene evidence records.
pub trait EvidenceCollector: Send + Sync {
    fn evidence_type(&self) -> EvidenceType;

    /// Whether the dataset carries the table this collector reads.
    fn is_available(&self, data: &AlignedDataset) -> bool;

    /// Compute evidence for every gene the cohort supports.
    ///
    /// Fails with `InsufficientSamples` when the cohort cannot support this
    /// evidence type at all; genes that individually lack data are simply
    /// left out of the slice.
    fn collect(&self, cohort: &Cohort<'_>, config: &CollectorConfig) -> Result<EvidenceSlice>;
}

/// Collectors for the enabled evidence types, in canonical order.
pub fn default_collectors(config: &CollectorConfig) -> Vec<Box<dyn EvidenceCollector>> {
    let all: Vec<Box<dyn EvidenceCollector>> = vec![
        Box::new(DifferentialExpressionCollector),
        Box::new(SurvivalAssociationCollector),
        Box::new(CnvDriverCollector),
        Box::new(MethylationRegulationCollector),
        Box::new(MutationFrequencyCollector),
    ];
    all.into_iter()
        .filter(|c| config.is_enabled(c.evidence_type()))
        .collect()
}

/// An evidence type that produced no slice, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct AbsentEvidence {
    pub evidence_type: EvidenceType,
    pub reason: String,
}

/// Fan-in result of running a set of collectors on one cohort.
#[derive(Debug, Clone, Default)]
pub struct Collected {
    pub slices: Vec<EvidenceSlice>,
    pub absent: Vec<AbsentEvidence>,
}

/// Run every available collector in parallel on `cohort`.
///
/// `InsufficientSamples` turns the type into an absent entry; any other
/// error aborts the whole collection.
pub fn collect_all(
    collectors: &[Box<dyn EvidenceCollector>],
    cohort: &Cohort<'_>,
    config: &CollectorConfig,
) -> Result<Collected> {
    let data = cohort.dataset();
    let outcomes: Vec<(EvidenceType, Result<EvidenceSlice>)> = collectors
        .par_iter()
        .filter(|c| c.is_available(data))
        .map(|c| (c.evidence_type(), c.collect(cohort, config)))
        .collect();

    let mut collected = Collected::default();
    for (evidence_type, outcome) in outcomes {
        match outcome {
            Ok(slice) => {
                debug!(%evidence_type, n_records = slice.len(), "Collected evidence");
                collected.slices.push(slice);
            }
            Err(err @ AnalysisError::InsufficientSamples { .. }) => {
                collected.absent.push(AbsentEvidence {
                    evidence_type,
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }
    for c in collectors.iter().filter(|c| !c.is_available(data)) {
        collected.absent.push(AbsentEvidence {
            evidence_type: c.evidence_type(),
            reason: "input table not supplied".to_string(),
        });
    }
    collected.absent.sort_by_key(|a| a.evidence_type);
    Ok(collected)
}

/// Log absent evidence for the full-data run.
pub(crate) fn log_absent(absent: &[AbsentEvidence]) {
    for a in absent {
        warn!(evidence_type = %a.evidence_type, reason = %a.reason, "Evidence type absent");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use driverscope_omics::{
        AlignedDataset, ClinicalRecord, ClinicalTable, MutationCall, MutationTable, NumericMatrix,
        OmicsDataset, SampleGroup, SampleGroups,
    };

    /// Six tumour and four normal samples, every layer present.
    ///
    /// - `UP`: strongly over-expressed in tumour, CNV tracks expression,
    ///   high expression means early death
    /// - `SILENCED`: methylation anti-correlates with expression
    /// - `FLAT`: constant expression
    /// - `NOISE`: no signal
    pub fn small_dataset() -> AlignedDataset {
        let samples: Vec<String> = ["T1", "T2", "T3", "T4", "T5", "T6", "N1", "N2", "N3", "N4"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let up = vec![9.0, 9.5, 10.0, 10.5, 11.0, 11.5, 2.0, 2.5, 3.0, 2.2];
        let silenced = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let noise = vec![5.0, 4.0, 6.0, 5.0, 4.5, 5.5, 5.2, 4.8, 5.1, 4.9];
        let expr = NumericMatrix::from_rows(
            samples.clone(),
            vec![
                ("UP".into(), up.clone()),
                ("SILENCED".into(), silenced.clone()),
                ("FLAT".into(), vec![3.0; 10]),
                ("NOISE".into(), noise),
            ],
        )
        .unwrap();
        let cnv = NumericMatrix::from_rows(
            samples.clone(),
            vec![("UP".into(), up.iter().map(|v| (v - 6.0) / 5.0).collect())],
        )
        .unwrap();
        let methylation = NumericMatrix::from_rows(
            samples.clone(),
            vec![("SILENCED".into(), silenced.iter().map(|v| 1.0 - v / 11.0).collect())],
        )
        .unwrap();

        let groups: SampleGroups = samples
            .iter()
            .map(|s| {
                let g = if s.starts_with('T') { SampleGroup::Tumor } else { SampleGroup::Normal };
                (s.clone(), g)
            })
            .collect();

        // Survival inversely tracks UP expression
        let clinical: ClinicalTable = samples
            .iter()
            .zip(&up)
            .enumerate()
            .map(|(i, (s, u))| {
                let time = 200.0 - 15.0 * u + (i % 3) as f64 * 12.0;
                (s.clone(), ClinicalRecord::new(time, i != 4))
            })
            .collect();

        let mutations = MutationTable::new(
            ["T1", "T2", "T3", "T4", "T5"]
                .iter()
                .map(|s| MutationCall::new("UP", *s, "Missense_Mutation"))
                .chain(std::iter::once(MutationCall::new("NOISE", "T1", "Silent")))
                .collect(),
        );

        OmicsDataset::new(expr)
            .with_sample_groups(groups)
            .with_clinical(clinical)
            .with_cnv(cnv)
            .with_methylation(methylation)
            .with_mutations(mutations)
            .align()
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driverscope_omics::OmicsDataset;

    #[test]
    fn test_enabled_filter() {
        let mut config = CollectorConfig::default();
        config.enabled = vec![EvidenceType::MutationFrequency, EvidenceType::DifferentialExpression];
        let types: Vec<EvidenceType> = default_collectors(&config).iter().map(|c| c.evidence_type()).collect();
        assert_eq!(types, vec![EvidenceType::DifferentialExpression, EvidenceType::MutationFrequency]);
    }

    #[test]
    fn test_collect_all_full_dataset() {
        let ds = test_support::small_dataset();
        let cohort = Cohort::full(&ds);
        let config = CollectorConfig::default();
        let collected = collect_all(&default_collectors(&config), &cohort, &config).unwrap();
        assert_eq!(collected.slices.len(), 5);
        assert!(collected.absent.is_empty());
    }

    #[test]
    fn test_missing_tables_and_small_groups_become_absent() {
        let full = test_support::small_dataset();
        // Expression only, one normal sample: DE cannot run, the rest have no table
        let positions: Vec<usize> = (0..7).collect();
        let ds = OmicsDataset::new(full.expression.clone()).align().unwrap();
        let ds = driverscope_omics::AlignedDataset { groups: full.groups.clone(), ..ds };
        let cohort = Cohort::from_positions(&ds, positions);
        let config = CollectorConfig::default();
        let collected = collect_all(&default_collectors(&config), &cohort, &config).unwrap();
        assert!(collected.slices.is_empty());
        let absent: Vec<EvidenceType> = collected.absent.iter().map(|a| a.evidence_type).collect();
        assert_eq!(absent, EvidenceType::ALL.to_vec());
        assert!(collected.absent[0].reason.contains("Insufficient"));
    }
}
