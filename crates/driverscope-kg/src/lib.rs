//! driverscope-kg: Gene evidence network, topology metrics and pathway enrichment.

pub mod network;
pub mod metrics;
pub mod enrichment;

pub use enrichment::{PathwayAnalysis, PathwayEnrichment, PathwayEnrichmentRow};
pub use metrics::{NetworkMetrics, NodeMetrics};
pub use network::{evidence_similarity, EvidenceNetwork, EvidenceNetworkBuilder, NetworkEdge, NetworkNode};
