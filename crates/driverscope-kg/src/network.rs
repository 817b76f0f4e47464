//! Evidence-similarity network over causal genes.
//!
//! Two genes are linked when their evidence profiles agree: similarity is the
//! mean over shared evidence types of `1 − |a − b|`. Genes without a shared
//! type are never linked, however similar the rest of their profile.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use driverscope_common::{CausalGene, ConfidenceLevel, EvidenceType, NetworkConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub gene_id: String,
    pub causal_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub evidence_types: Vec<EvidenceType>,
}

/// Undirected edge; `source < target` lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub similarity: f64,
    pub shared_types: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceNetwork {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
    pub similarity_threshold: f64,
    /// Causal genes left out by the node cap.
    pub truncated_genes: usize,
}

impl EvidenceNetwork {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, gene_id: &str) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.gene_id == gene_id)
    }

    /// Neighbours of `gene_id` with the linking similarity.
    pub fn neighbours<'a>(&'a self, gene_id: &'a str) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.edges.iter().filter_map(move |e| {
            if e.source == gene_id {
                Some((e.target.as_str(), e.similarity))
            } else if e.target == gene_id {
                Some((e.source.as_str(), e.similarity))
            } else {
                None
            }
        })
    }
}

/// Mean `1 − |a − b|` over the evidence types both profiles carry.
pub fn evidence_similarity(
    a: &BTreeMap<EvidenceType, f64>,
    b: &BTreeMap<EvidenceType, f64>,
) -> Option<(f64, usize)> {
    let mut sum = 0.0;
    let mut shared = 0usize;
    for (t, sa) in a {
        if let Some(sb) = b.get(t) {
            sum += 1.0 - (sa - sb).abs();
            shared += 1;
        }
    }
    (shared > 0).then(|| (sum / shared as f64, shared))
}

#[derive(Debug, Clone)]
pub struct EvidenceNetworkBuilder {
    pub similarity_threshold: f64,
    pub max_genes: usize,
}

impl Default for EvidenceNetworkBuilder {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}

impl EvidenceNetworkBuilder {
    pub fn new(similarity_threshold: f64, max_genes: usize) -> Self {
        Self {
            similarity_threshold,
            max_genes,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Self {
        Self::new(config.similarity_threshold, config.max_network_genes)
    }

    /// Build the network over `genes`, which should already be filtered to
    /// the causal threshold. Genes beyond the cap are dropped lowest-ranked
    /// first.
    pub fn build(&self, genes: &[CausalGene]) -> EvidenceNetwork {
        let mut ordered: Vec<&CausalGene> = genes.iter().collect();
        ordered.sort_by(|a, b| {
            b.causal_score
                .total_cmp(&a.causal_score)
                .then_with(|| b.evidence_type_count().cmp(&a.evidence_type_count()))
                .then_with(|| a.gene_id.cmp(&b.gene_id))
        });
        let truncated_genes = ordered.len().saturating_sub(self.max_genes);
        if truncated_genes > 0 {
            warn!(
                kept = self.max_genes,
                dropped = truncated_genes,
                "Network gene cap reached, dropping lowest-ranked genes"
            );
            ordered.truncate(self.max_genes);
        }

        let threshold = self.similarity_threshold;
        let pool: &[&CausalGene] = &ordered;
        let mut edges: Vec<NetworkEdge> = (0..pool.len())
            .into_par_iter()
            .flat_map_iter(move |i| {
                let a = pool[i];
                pool[i + 1..].iter().filter_map(move |b| {
                    let (similarity, shared_types) =
                        evidence_similarity(&a.evidence_scores, &b.evidence_scores)?;
                    if similarity < threshold {
                        return None;
                    }
                    let (source, target) = if a.gene_id <= b.gene_id {
                        (&a.gene_id, &b.gene_id)
                    } else {
                        (&b.gene_id, &a.gene_id)
                    };
                    Some(NetworkEdge {
                        source: source.clone(),
                        target: target.clone(),
                        similarity,
                        shared_types,
                    })
                })
            })
            .collect();
        edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

        let nodes: Vec<NetworkNode> = ordered
            .iter()
            .map(|g| NetworkNode {
                gene_id: g.gene_id.clone(),
                causal_score: g.causal_score,
                confidence_level: g.confidence_level,
                evidence_types: g.evidence_chain.clone(),
            })
            .collect();

        info!(nodes = nodes.len(), edges = edges.len(), threshold, "Evidence network built");
        EvidenceNetwork {
            nodes,
            edges,
            similarity_threshold: threshold,
            truncated_genes,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use driverscope_common::BiologicalContext;
    use pretty_assertions::assert_eq;

    pub(crate) fn gene(id: &str, score: f64, scores: &[(EvidenceType, f64)]) -> CausalGene {
        CausalGene {
            gene_id: id.to_string(),
            causal_score: score,
            evidence_scores: scores.iter().copied().collect(),
            confidence_level: ConfidenceLevel::Medium,
            evidence_chain: scores.iter().map(|(t, _)| *t).collect(),
            biological_context: BiologicalContext::default(),
        }
    }

    use EvidenceType::*;

    #[test]
    fn test_similarity_over_shared_types() {
        let a: BTreeMap<_, _> = [(DifferentialExpression, 0.9), (CnvDriver, 0.4)].into_iter().collect();
        let b: BTreeMap<_, _> = [(DifferentialExpression, 0.7), (SurvivalAssociation, 0.1)].into_iter().collect();
        let (s, shared) = evidence_similarity(&a, &b).unwrap();
        assert!((s - 0.8).abs() < 1e-12);
        assert_eq!(shared, 1);

        let c: BTreeMap<_, _> = [(MutationFrequency, 0.9)].into_iter().collect();
        assert_eq!(evidence_similarity(&a, &c), None);
    }

    #[test]
    fn test_edges_respect_threshold_and_have_no_self_loops() {
        let genes = vec![
            gene("KRAS", 0.9, &[(DifferentialExpression, 0.9), (CnvDriver, 0.8)]),
            gene("EGFR", 0.85, &[(DifferentialExpression, 0.8), (CnvDriver, 0.9)]),
            gene("TP53", 0.8, &[(DifferentialExpression, 0.1)]),
            gene("MYC", 0.75, &[(MutationFrequency, 0.9)]),
        ];
        let net = EvidenceNetworkBuilder::new(0.5, 500).build(&genes);
        assert_eq!(net.node_count(), 4);
        let pairs: Vec<(&str, &str)> = net.edges.iter().map(|e| (e.source.as_str(), e.target.as_str())).collect();
        // KRAS–TP53 is 0.2, EGFR–TP53 is 0.3; MYC shares nothing
        assert_eq!(pairs, vec![("EGFR", "KRAS")]);
        assert!((net.edges[0].similarity - 0.9).abs() < 1e-12);
        assert!(net.edges.iter().all(|e| e.source != e.target));
    }

    #[test]
    fn test_similarity_symmetric_and_order_free() {
        let genes = vec![
            gene("A", 0.9, &[(DifferentialExpression, 0.9), (SurvivalAssociation, 0.6)]),
            gene("B", 0.8, &[(DifferentialExpression, 0.7), (SurvivalAssociation, 0.5)]),
            gene("C", 0.7, &[(SurvivalAssociation, 0.4), (CnvDriver, 0.2)]),
        ];
        for x in &genes {
            for y in &genes {
                assert_eq!(
                    evidence_similarity(&x.evidence_scores, &y.evidence_scores),
                    evidence_similarity(&y.evidence_scores, &x.evidence_scores)
                );
            }
        }
        let builder = EvidenceNetworkBuilder::new(0.5, 500);
        let mut reversed = genes.clone();
        reversed.reverse();
        assert_eq!(builder.build(&genes), builder.build(&reversed));
    }

    #[test]
    fn test_cap_keeps_top_ranked() {
        let genes: Vec<CausalGene> = (0..10)
            .map(|i| gene(&format!("G{i}"), 0.7 + i as f64 * 0.01, &[(DifferentialExpression, 0.8)]))
            .collect();
        let net = EvidenceNetworkBuilder::new(0.5, 3).build(&genes);
        assert_eq!(net.truncated_genes, 7);
        let ids: Vec<&str> = net.nodes.iter().map(|n| n.gene_id.as_str()).collect();
        assert_eq!(ids, vec!["G9", "G8", "G7"]);
        assert_eq!(net.edge_count(), 3);
    }

    #[test]
    fn test_neighbours_both_directions() {
        let genes = vec![
            gene("A", 0.9, &[(CnvDriver, 0.9)]),
            gene("B", 0.8, &[(CnvDriver, 0.9)]),
            gene("C", 0.8, &[(CnvDriver, 0.85)]),
        ];
        let net = EvidenceNetworkBuilder::default().build(&genes);
        let mut n: Vec<&str> = net.neighbours("B").map(|(g, _)| g).collect();
        n.sort();
        assert_eq!(n, vec!["A", "C"]);
    }

    #[test]
    fn test_empty_input() {
        let net = EvidenceNetworkBuilder::default().build(&[]);
        assert_eq!(net, EvidenceNetwork { similarity_threshold: 0.5, ..Default::default() });
    }
}
