//! Copy-number dosage driving expression.

use driverscope_common::{CollectorConfig, EvidenceSlice, EvidenceType, Result};
use driverscope_omics::{AlignedDataset, Cohort};

use super::correlation::{correlate_layer, Direction};

pub struct CnvDriverCollector;

impl super::EvidenceCollector for CnvDriverCollector {
    fn evidence_type(&self) -> EvidenceType {
        EvidenceType::CnvDriver
    }

    fn is_available(&self, data: &AlignedDataset) -> bool {
        data.cnv.is_some()
    }

    fn collect(&self, cohort: &Cohort<'_>, config: &CollectorConfig) -> Result<EvidenceSlice> {
        let Some(cnv) = cohort.dataset().cnv.as_ref() else {
            return Ok(EvidenceSlice::new(EvidenceType::CnvDriver));
        };
        let cutoff = config.cnv_alteration_cutoff;
        correlate_layer(
            cohort,
            config,
            EvidenceType::CnvDriver,
            cnv,
            Direction::Positive,
            |v| v.abs() > cutoff,
        )
    }
}
