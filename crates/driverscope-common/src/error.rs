use thiserror::Error;

use crate::entities::EvidenceType;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// An evidence type cannot be computed for the current sample set.
    /// Absorbed by the pipeline: the type is recorded as absent.
    #[error("Insufficient samples for {evidence_type}: {observed} available, {required} required ({detail})")]
    InsufficientSamples {
        evidence_type: EvidenceType,
        required: usize,
        observed: usize,
        detail: String,
    },

    #[error("Invalid weight configuration: {0}")]
    InvalidWeightConfig(String),

    #[error("Pathway enrichment requires a non-empty set of top genes")]
    EmptyGeneSet,

    #[error("No common samples between {left} and {right} tables")]
    NoCommonSamples { left: String, right: String },

    #[error("Duplicate {evidence_type} evidence for gene {gene_id}")]
    DuplicateEvidence {
        gene_id: String,
        evidence_type: EvidenceType,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analysis cancelled after {completed} of {total} iterations")]
    Cancelled { completed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Whether this error must abort the whole run.
    ///
    /// `InsufficientSamples` only removes one evidence type and `EmptyGeneSet`
    /// only invalidates the enrichment stage; everything else is fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AnalysisError::InsufficientSamples { .. } | AnalysisError::EmptyGeneSet
        )
    }

    pub fn insufficient(
        evidence_type: EvidenceType,
        required: usize,
        observed: usize,
        detail: impl Into<String>,
    ) -> Self {
        AnalysisError::InsufficientSamples {
            evidence_type,
            required,
            observed,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
