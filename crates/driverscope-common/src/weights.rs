//! Evidence weight vector for causal score aggregation.

use serde::{Deserialize, Serialize};

use crate::entities::EvidenceType;
use crate::error::{AnalysisError, Result};

/// Non-negative weight per evidence type.
/// Weights need not sum to 1: the aggregator renormalises per gene over the
/// evidence that is actually present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceWeights {
    /// Tumour vs normal differential expression
    #[serde(default = "default_de")]
    pub differential_expression: f64,
    /// Expression-stratified survival association
    #[serde(default = "default_survival")]
    pub survival_association: f64,
    /// Copy-number dosage driving expression
    #[serde(default = "default_cnv")]
    pub cnv_driver: f64,
    /// Methylation silencing of expression
    #[serde(default = "default_methylation")]
    pub methylation_regulation: f64,
    /// Mutation recurrence over background
    #[serde(default = "default_mutation")]
    pub mutation_frequency: f64,
}

fn default_de() -> f64 { 0.25 }
fn default_survival() -> f64 { 0.25 }
fn default_cnv() -> f64 { 0.20 }
fn default_methylation() -> f64 { 0.20 }
fn default_mutation() -> f64 { 0.10 }

impl Default for EvidenceWeights {
    fn default() -> Self {
        Self {
            differential_expression: default_de(),
            survival_association:    default_survival(),
            cnv_driver:              default_cnv(),
            methylation_regulation:  default_methylation(),
            mutation_frequency:      default_mutation(),
        }
    }
}

impl EvidenceWeights {
    /// Same weight for every evidence type.
    pub fn uniform(weight: f64) -> Self {
        Self::from_array([weight; EvidenceType::COUNT])
    }

    /// Weights in canonical evidence-type order.
    pub fn from_array(w: [f64; EvidenceType::COUNT]) -> Self {
        Self {
            differential_expression: w[0],
            survival_association:    w[1],
            cnv_driver:              w[2],
            methylation_regulation:  w[3],
            mutation_frequency:      w[4],
        }
    }

    /// Convert to array for iteration.
    pub fn as_array(&self) -> [f64; EvidenceType::COUNT] {
        [
            self.differential_expression,
            self.survival_association,
            self.cnv_driver,
            self.methylation_regulation,
            self.mutation_frequency,
        ]
    }

    pub fn get(&self, evidence_type: EvidenceType) -> f64 {
        self.as_array()[evidence_type.index()]
    }

    /// Copy with one weight replaced.
    pub fn with(&self, evidence_type: EvidenceType, weight: f64) -> Self {
        let mut w = self.as_array();
        w[evidence_type.index()] = weight;
        Self::from_array(w)
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Evidence types that can contribute to a score.
    pub fn active_types(&self) -> Vec<EvidenceType> {
        EvidenceType::ALL
            .into_iter()
            .filter(|t| self.get(*t) > 0.0)
            .collect()
    }

    /// Reject negative or non-finite weights and an all-zero vector.
    pub fn validate(&self) -> Result<()> {
        for t in EvidenceType::ALL {
            let w = self.get(t);
            if !w.is_finite() {
                return Err(AnalysisError::InvalidWeightConfig(format!(
                    "weight for {t} is not finite"
                )));
            }
            if w < 0.0 {
                return Err(AnalysisError::InvalidWeightConfig(format!(
                    "weight for {t} is negative ({w})"
                )));
            }
        }
        if self.total() <= 0.0 {
            return Err(AnalysisError::InvalidWeightConfig(
                "all evidence weights are zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Renormalise weights so they sum to 1.0
    pub fn normalised(&self) -> Self {
        let sum = self.total();
        if sum > 0.0 {
            Self::from_array(self.as_array().map(|w| w / sum))
        } else {
            self.clone()
        }
    }
}
