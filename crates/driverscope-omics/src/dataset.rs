//! Raw input bundle and its sample-aligned form.
//!
//! Alignment fixes the analysis sample set once per run. Every table is
//! re-indexed onto that sample order so collectors can address all omics
//! layers with the same column position.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use driverscope_common::{AnalysisError, Result};

use crate::matrix::NumericMatrix;
use crate::mutation::{MutationIndex, MutationTable};
use crate::samples::{ClinicalRecord, ClinicalTable, SampleGroup, SampleGroups};

/// Input tables as supplied by the caller.
#[derive(Debug, Clone)]
pub struct OmicsDataset {
    /// Gene × sample expression. Required.
    pub expression: NumericMatrix,
    /// Explicit tumour/normal labels. TCGA barcodes are used when absent.
    pub sample_groups: Option<SampleGroups>,
    pub clinical: Option<ClinicalTable>,
    /// Gene × sample copy-number log-ratios.
    pub cnv: Option<NumericMatrix>,
    /// Gene × sample methylation beta values in [0, 1].
    pub methylation: Option<NumericMatrix>,
    pub mutations: Option<MutationTable>,
}

impl OmicsDataset {
    pub fn new(expression: NumericMatrix) -> Self {
        Self {
            expression,
            sample_groups: None,
            clinical: None,
            cnv: None,
            methylation: None,
            mutations: None,
        }
    }

    pub fn with_sample_groups(mut self, groups: SampleGroups) -> Self {
        self.sample_groups = Some(groups);
        self
    }

    pub fn with_clinical(mut self, clinical: ClinicalTable) -> Self {
        self.clinical = Some(clinical);
        self
    }

    pub fn with_cnv(mut self, cnv: NumericMatrix) -> Self {
        self.cnv = Some(cnv);
        self
    }

    pub fn with_methylation(mut self, methylation: NumericMatrix) -> Self {
        self.methylation = Some(methylation);
        self
    }

    pub fn with_mutations(mut self, mutations: MutationTable) -> Self {
        self.mutations = Some(mutations);
        self
    }

    /// Fix the analysis sample set and re-index every table onto it.
    ///
    /// The sample set is the expression samples, intersected with the
    /// clinical samples when a clinical table is supplied. Fails with
    /// `NoCommonSamples` when that set is empty or when a supplied omics
    /// table shares no sample with it.
    pub fn align(&self) -> Result<AlignedDataset> {
        if self.expression.n_samples() == 0 || self.expression.n_genes() == 0 {
            return Err(AnalysisError::InvalidInput(
                "expression table has no genes or no samples".to_string(),
            ));
        }

        let samples: Vec<String> = match &self.clinical {
            Some(clinical) => self
                .expression
                .samples()
                .iter()
                .filter(|s| clinical.contains(s))
                .cloned()
                .collect(),
            None => self.expression.samples().to_vec(),
        };
        if samples.is_empty() {
            return Err(AnalysisError::NoCommonSamples {
                left: "expression".to_string(),
                right: "clinical".to_string(),
            });
        }
        let dropped = self.expression.n_samples() - samples.len();
        if dropped > 0 {
            warn!(dropped, "Expression samples without clinical records excluded");
        }

        let (expression, _) = self.expression.aligned_to(&samples);

        let groups: Vec<Option<SampleGroup>> = samples
            .iter()
            .map(|s| match &self.sample_groups {
                Some(g) => g.resolve(s),
                None => SampleGroup::from_tcga_barcode(s),
            })
            .collect();

        let clinical: Vec<Option<ClinicalRecord>> = samples
            .iter()
            .map(|s| self.clinical.as_ref().and_then(|c| c.get(s)).cloned())
            .collect();

        let cnv = match &self.cnv {
            Some(m) => Some(align_layer(m, &samples, "cnv")?),
            None => None,
        };
        let methylation = match &self.methylation {
            Some(m) => {
                m.check_range("methylation", 0.0, 1.0)?;
                Some(align_layer(m, &samples, "methylation")?)
            }
            None => None,
        };
        let mutations = match &self.mutations {
            Some(table) => Some(index_mutations(table, &samples)?),
            None => None,
        };

        let n_tumor = groups.iter().filter(|g| **g == Some(SampleGroup::Tumor)).count();
        let n_normal = groups.iter().filter(|g| **g == Some(SampleGroup::Normal)).count();
        info!(
            n_samples = samples.len(),
            n_genes = expression.n_genes(),
            n_tumor,
            n_normal,
            has_clinical = self.clinical.is_some(),
            has_cnv = cnv.is_some(),
            has_methylation = methylation.is_some(),
            has_mutations = mutations.is_some(),
            "Aligned omics dataset"
        );

        Ok(AlignedDataset {
            samples,
            expression,
            groups,
            clinical,
            cnv,
            methylation,
            mutations,
        })
    }
}

fn align_layer(matrix: &NumericMatrix, samples: &[String], name: &str) -> Result<NumericMatrix> {
    let (aligned, found) = matrix.aligned_to(samples);
    if found == 0 {
        return Err(AnalysisError::NoCommonSamples {
            left: "expression".to_string(),
            right: name.to_string(),
        });
    }
    debug!(layer = name, n_genes = aligned.n_genes(), shared_samples = found, "Aligned omics layer");
    Ok(aligned)
}

fn index_mutations(table: &MutationTable, samples: &[String]) -> Result<MutationIndex> {
    let position: HashMap<&str, usize> = samples
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_str(), i))
        .collect();
    let mut index = MutationIndex::default();
    let mut kept = 0usize;
    for call in &table.calls {
        if let Some(&pos) = position.get(call.sample_id.as_str()) {
            index.insert(&call.gene_id, pos, &call.mutation_type);
            kept += 1;
        }
    }
    if !table.is_empty() && kept == 0 {
        return Err(AnalysisError::NoCommonSamples {
            left: "expression".to_string(),
            right: "mutation".to_string(),
        });
    }
    debug!(calls = table.len(), kept, n_genes = index.len(), "Indexed mutation calls");
    Ok(index)
}

/// All omics layers re-indexed onto one analysis sample order.
/// Read-only for the duration of a run.
#[derive(Debug, Clone)]
pub struct AlignedDataset {
    pub samples: Vec<String>,
    pub expression: NumericMatrix,
    pub groups: Vec<Option<SampleGroup>>,
    pub clinical: Vec<Option<ClinicalRecord>>,
    pub cnv: Option<NumericMatrix>,
    pub methylation: Option<NumericMatrix>,
    pub mutations: Option<MutationIndex>,
}

impl AlignedDataset {
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn genes(&self) -> &[String] {
        self.expression.genes()
    }

    pub fn has_clinical(&self) -> bool {
        self.clinical.iter().any(|c| c.is_some())
    }

    /// Copy restricted to the given genes in every gene-indexed layer.
    pub fn restricted_to(&self, genes: &BTreeSet<String>) -> Self {
        Self {
            samples: self.samples.clone(),
            expression: self.expression.retain_genes(genes),
            groups: self.groups.clone(),
            clinical: self.clinical.clone(),
            cnv: self.cnv.as_ref().map(|m| m.retain_genes(genes)),
            methylation: self.methylation.as_ref().map(|m| m.retain_genes(genes)),
            mutations: self.mutations.as_ref().map(|m| m.retain_genes(genes)),
        }
    }
}
