//! driverscope-common: Core types and configuration shared by the driverscope crates.

pub mod error;
pub mod entities;
pub mod confidence;
pub mod weights;
pub mod analysis_config;

// Re-export commonly used types
pub use analysis_config::{
    AnalysisConfig, CollectorConfig, CorrelationMethod, EnrichmentConfig, MutationTest,
    NetworkConfig, SurvivalTest, TwoSampleTest, ValidationConfig,
};
pub use confidence::{ConfidenceClassifier, ConfidenceThresholds};
pub use entities::{
    BiologicalContext, CausalGene, ConfidenceLevel, EvidenceMatrix, EvidenceRecord, EvidenceRow,
    EvidenceSlice, EvidenceType,
};
pub use error::{AnalysisError, Result};
pub use weights::EvidenceWeights;
