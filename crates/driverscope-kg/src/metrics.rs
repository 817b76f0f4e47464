//! Topology summary of an evidence network.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::network::EvidenceNetwork;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub gene_id: String,
    pub degree: usize,
    /// degree / (n − 1)
    pub degree_centrality: f64,
    /// Sum of incident edge similarities.
    pub strength: f64,
    pub clustering: f64,
    /// Reachable-set closeness (Wasserman–Faust), 0 for isolated nodes.
    pub closeness: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub connected_components: usize,
    pub largest_component_size: usize,
    pub mean_clustering: f64,
    /// Per node, in network node order.
    pub nodes: Vec<NodeMetrics>,
}

impl NetworkMetrics {
    pub fn compute(network: &EvidenceNetwork) -> Self {
        let n = network.nodes.len();
        if n == 0 {
            return Self::default();
        }
        let index: HashMap<&str, usize> = network
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.gene_id.as_str(), i))
            .collect();
        let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        let mut strength = vec![0.0; n];
        for e in &network.edges {
            let (Some(&a), Some(&b)) = (index.get(e.source.as_str()), index.get(e.target.as_str())) else {
                continue;
            };
            if a == b {
                continue;
            }
            if adjacency[a].insert(b) {
                adjacency[b].insert(a);
                strength[a] += e.similarity;
                strength[b] += e.similarity;
            }
        }

        let components = components(&adjacency);
        let edge_count: usize = adjacency.iter().map(BTreeSet::len).sum::<usize>() / 2;
        let pairs = n * (n - 1) / 2;

        let nodes: Vec<NodeMetrics> = network
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let degree = adjacency[i].len();
                NodeMetrics {
                    gene_id: node.gene_id.clone(),
                    degree,
                    degree_centrality: if n > 1 { degree as f64 / (n - 1) as f64 } else { 0.0 },
                    strength: strength[i],
                    clustering: local_clustering(&adjacency, i),
                    closeness: closeness(&adjacency, i),
                }
            })
            .collect();

        Self {
            node_count: n,
            edge_count,
            density: if pairs > 0 { edge_count as f64 / pairs as f64 } else { 0.0 },
            connected_components: components.len(),
            largest_component_size: components.iter().map(Vec::len).max().unwrap_or(0),
            mean_clustering: nodes.iter().map(|m| m.clustering).sum::<f64>() / n as f64,
            nodes,
        }
    }

    /// The `k` best-connected genes: degree desc, then strength desc, then id.
    pub fn hubs(&self, k: usize) -> Vec<&NodeMetrics> {
        let mut ranked: Vec<&NodeMetrics> = self.nodes.iter().collect();
        ranked.sort_by(|a, b| {
            b.degree
                .cmp(&a.degree)
                .then_with(|| b.strength.total_cmp(&a.strength))
                .then_with(|| a.gene_id.cmp(&b.gene_id))
        });
        ranked.truncate(k);
        ranked
    }
}

fn components(adjacency: &[BTreeSet<usize>]) -> Vec<Vec<usize>> {
    let mut seen = vec![false; adjacency.len()];
    let mut out = Vec::new();
    for start in 0..adjacency.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut stack = vec![start];
        let mut members = Vec::new();
        while let Some(v) = stack.pop() {
            members.push(v);
            for &w in &adjacency[v] {
                if !seen[w] {
                    seen[w] = true;
                    stack.push(w);
                }
            }
        }
        out.push(members);
    }
    out
}

fn local_clustering(adjacency: &[BTreeSet<usize>], v: usize) -> f64 {
    let neighbours: Vec<usize> = adjacency[v].iter().copied().collect();
    let k = neighbours.len();
    if k < 2 {
        return 0.0;
    }
    let mut links = 0usize;
    for (i, &a) in neighbours.iter().enumerate() {
        for &b in &neighbours[i + 1..] {
            if adjacency[a].contains(&b) {
                links += 1;
            }
        }
    }
    2.0 * links as f64 / (k * (k - 1)) as f64
}

fn closeness(adjacency: &[BTreeSet<usize>], v: usize) -> f64 {
    let n = adjacency.len();
    if n < 2 {
        return 0.0;
    }
    let mut dist = vec![usize::MAX; n];
    dist[v] = 0;
    let mut queue = VecDeque::from([v]);
    let (mut reached, mut total) = (0usize, 0usize);
    while let Some(u) = queue.pop_front() {
        for &w in &adjacency[u] {
            if dist[w] == usize::MAX {
                dist[w] = dist[u] + 1;
                reached += 1;
                total += dist[w];
                queue.push_back(w);
            }
        }
    }
    if total == 0 {
        return 0.0;
    }
    let r = reached as f64;
    (r / total as f64) * (r / (n - 1) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::tests::gene;
    use crate::network::EvidenceNetworkBuilder;
    use driverscope_common::EvidenceType::*;

    #[test]
    fn test_triangle_plus_isolate() {
        let genes = vec![
            gene("A", 0.9, &[(CnvDriver, 0.9)]),
            gene("B", 0.9, &[(CnvDriver, 0.8)]),
            gene("C", 0.9, &[(CnvDriver, 0.85)]),
            gene("D", 0.9, &[(MutationFrequency, 0.9)]),
        ];
        let net = EvidenceNetworkBuilder::default().build(&genes);
        let m = NetworkMetrics::compute(&net);
        assert_eq!(m.node_count, 4);
        assert_eq!(m.edge_count, 3);
        assert!((m.density - 0.5).abs() < 1e-12);
        assert_eq!(m.connected_components, 2);
        assert_eq!(m.largest_component_size, 3);
        assert!((m.mean_clustering - 0.75).abs() < 1e-12);

        let a = m.nodes.iter().find(|n| n.gene_id == "A").unwrap();
        assert_eq!(a.degree, 2);
        assert!((a.degree_centrality - 2.0 / 3.0).abs() < 1e-12);
        // reached 2 of 3 others at distance 1
        assert!((a.closeness - 2.0 / 3.0).abs() < 1e-12);
        let d = m.nodes.iter().find(|n| n.gene_id == "D").unwrap();
        assert_eq!(d.closeness, 0.0);
        assert_eq!(d.strength, 0.0);
    }

    #[test]
    fn test_hubs_order() {
        let genes = vec![
            gene("A", 0.9, &[(CnvDriver, 0.9)]),
            gene("B", 0.9, &[(CnvDriver, 0.55)]),
            gene("C", 0.9, &[(CnvDriver, 0.7)]),
        ];
        // A–C 0.8, B–C 0.85; A–B 0.65 falls below the threshold
        let net = EvidenceNetworkBuilder::new(0.7, 10).build(&genes);
        let m = NetworkMetrics::compute(&net);
        let hubs: Vec<&str> = m.hubs(2).iter().map(|h| h.gene_id.as_str()).collect();
        assert_eq!(hubs, vec!["C", "B"]);
    }

    #[test]
    fn test_empty_network() {
        assert_eq!(NetworkMetrics::compute(&EvidenceNetwork::default()), NetworkMetrics::default());
    }
}
