//! Somatic mutation calls.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One row of a mutation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationCall {
    pub gene_id: String,
    pub sample_id: String,
    /// Variant classification, e.g. `Missense_Mutation` or `Silent`.
    pub mutation_type: String,
}

impl MutationCall {
    pub fn new(gene_id: impl Into<String>, sample_id: impl Into<String>, mutation_type: impl Into<String>) -> Self {
        Self {
            gene_id: gene_id.into(),
            sample_id: sample_id.into(),
            mutation_type: mutation_type.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationTable {
    pub calls: Vec<MutationCall>,
}

impl MutationTable {
    pub fn new(calls: Vec<MutationCall>) -> Self {
        Self { calls }
    }

    pub fn sample_ids(&self) -> BTreeSet<&str> {
        self.calls.iter().map(|c| c.sample_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Mutation calls keyed by gene, with samples replaced by their position in
/// the aligned sample list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationIndex {
    by_gene: BTreeMap<String, Vec<(usize, String)>>,
}

impl MutationIndex {
    pub fn insert(&mut self, gene_id: &str, sample_pos: usize, mutation_type: &str) {
        self.by_gene
            .entry(gene_id.to_string())
            .or_default()
            .push((sample_pos, mutation_type.to_string()));
    }

    pub fn genes(&self) -> impl Iterator<Item = &str> {
        self.by_gene.keys().map(|g| g.as_str())
    }

    /// Distinct sample positions carrying at least one call accepted by `counts`.
    pub fn mutated_positions<F>(&self, gene_id: &str, counts: F) -> BTreeSet<usize>
    where
        F: Fn(&str) -> bool,
    {
        self.by_gene
            .get(gene_id)
            .map(|calls| {
                calls
                    .iter()
                    .filter(|(_, t)| counts(t))
                    .map(|(pos, _)| *pos)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn retain_genes(&self, keep: &BTreeSet<String>) -> Self {
        Self {
            by_gene: self
                .by_gene
                .iter()
                .filter(|(g, _)| keep.contains(*g))
                .map(|(g, c)| (g.clone(), c.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_gene.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_gene.is_empty()
    }
}
