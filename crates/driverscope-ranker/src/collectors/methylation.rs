//! Methylation silencing of expression.

use driverscope_common::{CollectorConfig, EvidenceSlice, EvidenceType, Result};
use driverscope_omics::{AlignedDataset, Cohort};

use super::correlation::{correlate_layer, Direction};

pub struct MethylationRegulationCollector;

impl super::EvidenceCollector for MethylationRegulationCollector {
    fn evidence_type(&self) -> EvidenceType {
        EvidenceType::MethylationRegulation
    }

    fn is_available(&self, data: &AlignedDataset) -> bool {
        data.methylation.is_some()
    }

    fn collect(&self, cohort: &Cohort<'_>, config: &CollectorConfig) -> Result<EvidenceSlice> {
        let Some(methylation) = cohort.dataset().methylation.as_ref() else {
            return Ok(EvidenceSlice::new(EvidenceType::MethylationRegulation));
        };
        let (hyper, hypo) = (config.hypermethylation_cutoff, config.hypomethylation_cutoff);
        correlate_layer(
            cohort,
            config,
            EvidenceType::MethylationRegulation,
            methylation,
            Direction::Negative,
            |beta| beta > hyper || beta < hypo,
        )
    }
}
