//! driverscope-ranker: Evidence collection, causal scoring and stability validation.
//!
//! The [`pipeline::AnalysisPipeline`] ties the stages together; each stage is
//! also usable on its own.

pub mod stats;
pub mod normalise;
pub mod collectors;
pub mod aggregator;
pub mod cancel;
pub mod validation;
pub mod result;
pub mod pipeline;

pub use aggregator::{EvidenceAggregator, GeneScore};
pub use cancel::CancellationToken;
pub use collectors::{
    collect_all, default_collectors, AbsentEvidence, CnvDriverCollector, Collected,
    DifferentialExpressionCollector, EvidenceCollector, MethylationRegulationCollector,
    MutationFrequencyCollector, SurvivalAssociationCollector,
};
pub use pipeline::{AnalysisInput, AnalysisPipeline};
pub use result::{AlgorithmStats, AnalysisResult};
pub use validation::{ranking_correlation, StabilityValidator, ValidationReport};
