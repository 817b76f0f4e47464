//! Over-representation of top-ranked genes in curated gene sets.
//!
//! For each pathway, `P(X ≥ overlap)` under the hypergeometric distribution
//! with population = background size, successes = pathway size and draws =
//! number of top genes. Benjamini–Hochberg adjustment is over every pathway
//! tested, including those not reported.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use driverscope_common::{AnalysisError, EnrichmentConfig, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayEnrichmentRow {
    pub pathway_id: String,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub overlap_count: usize,
    pub pathway_size: usize,
    pub overlap_genes: Vec<String>,
    pub fold_enrichment: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathwayAnalysis {
    /// Ranked by p-value ascending, overlap descending, id ascending.
    pub enrichments: Vec<PathwayEnrichmentRow>,
    pub total_genes_analyzed: usize,
    pub background_size: usize,
    pub pathways_tested: usize,
    /// Fraction of top genes in at least one significant pathway.
    pub pathway_coverage: f64,
}

impl PathwayAnalysis {
    pub fn significant(&self, alpha: f64) -> impl Iterator<Item = &PathwayEnrichmentRow> {
        self.enrichments.iter().filter(move |r| r.p_value < alpha)
    }
}

#[derive(Debug, Clone)]
pub struct PathwayEnrichment {
    pub min_overlap: usize,
    /// Cut-off used for `pathway_coverage`.
    pub significance: f64,
}

impl Default for PathwayEnrichment {
    fn default() -> Self {
        Self::from_config(&EnrichmentConfig::default())
    }
}

impl PathwayEnrichment {
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self {
            min_overlap: config.min_overlap.max(1),
            significance: 0.05,
        }
    }

    /// Test `top_genes` against every gene set.
    ///
    /// When `universe` is given, top genes and pathway members outside it
    /// are ignored. Fails with `EmptyGeneSet` for an empty top list and
    /// `InvalidInput` when the background is smaller than the top list.
    pub fn enrich<'a, I>(
        &self,
        top_genes: &[String],
        gene_sets: I,
        background_size: usize,
        universe: Option<&BTreeSet<String>>,
    ) -> Result<PathwayAnalysis>
    where
        I: IntoIterator<Item = (&'a str, &'a BTreeSet<String>)>,
    {
        let in_universe = |g: &String| universe.map_or(true, |u| u.contains(g));
        let top: BTreeSet<&String> = top_genes.iter().filter(|g| in_universe(*g)).collect();
        if top.is_empty() {
            return Err(AnalysisError::EmptyGeneSet);
        }
        let n_draws = top.len();
        if background_size < n_draws {
            return Err(AnalysisError::InvalidInput(format!(
                "background size {background_size} is smaller than the {n_draws} top genes"
            )));
        }

        let ln_fact = ln_factorials(background_size);
        let mut tested: Vec<PathwayEnrichmentRow> = Vec::new();
        for (pathway_id, members) in gene_sets {
            let size = members
                .iter()
                .filter(|g| in_universe(*g))
                .count()
                .min(background_size);
            if size == 0 {
                continue;
            }
            let overlap_genes: Vec<String> = members
                .iter()
                .filter(|g| top.contains(g))
                .cloned()
                .collect();
            let k = overlap_genes.len();
            let p_value = hypergeometric_sf(k, background_size, size, n_draws, &ln_fact);
            tested.push(PathwayEnrichmentRow {
                pathway_id: pathway_id.to_string(),
                p_value,
                adjusted_p_value: p_value,
                overlap_count: k,
                pathway_size: size,
                overlap_genes,
                fold_enrichment: (k as f64 / n_draws as f64) / (size as f64 / background_size as f64),
            });
        }
        let pathways_tested = tested.len();
        benjamini_hochberg(&mut tested);

        let mut enrichments: Vec<PathwayEnrichmentRow> = tested
            .into_iter()
            .filter(|r| r.overlap_count >= self.min_overlap)
            .collect();
        enrichments.sort_by(|a, b| {
            a.p_value
                .total_cmp(&b.p_value)
                .then_with(|| b.overlap_count.cmp(&a.overlap_count))
                .then_with(|| a.pathway_id.cmp(&b.pathway_id))
        });

        let covered: BTreeSet<&str> = enrichments
            .iter()
            .filter(|r| r.p_value < self.significance)
            .flat_map(|r| r.overlap_genes.iter().map(String::as_str))
            .collect();
        debug!(pathways_tested, reported = enrichments.len(), "Hypergeometric tests done");

        let analysis = PathwayAnalysis {
            pathway_coverage: covered.len() as f64 / n_draws as f64,
            enrichments,
            total_genes_analyzed: n_draws,
            background_size,
            pathways_tested,
        };
        info!(
            top_genes = n_draws,
            pathways_tested,
            significant = analysis.significant(self.significance).count(),
            "Pathway enrichment complete"
        );
        Ok(analysis)
    }
}

// ── Hypergeometric kernel ───────────────────────────────────────────────────

fn ln_factorials(n: usize) -> Vec<f64> {
    let mut table = Vec::with_capacity(n + 1);
    table.push(0.0);
    for i in 1..=n {
        table.push(table[i - 1] + (i as f64).ln());
    }
    table
}

fn ln_choose(n: usize, k: usize, ln_fact: &[f64]) -> f64 {
    ln_fact[n] - ln_fact[k] - ln_fact[n - k]
}

/// `P(X ≥ k)` for X ~ Hypergeometric(population, successes, draws).
fn hypergeometric_sf(k: usize, population: usize, successes: usize, draws: usize, ln_fact: &[f64]) -> f64 {
    let lo = k.max(draws.saturating_sub(population - successes));
    let hi = successes.min(draws);
    if lo > hi {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    let denom = ln_choose(population, draws, ln_fact);
    let p: f64 = (lo..=hi)
        .map(|i| {
            (ln_choose(successes, i, ln_fact) + ln_choose(population - successes, draws - i, ln_fact) - denom).exp()
        })
        .sum();
    p.clamp(0.0, 1.0)
}

/// Step-up BH adjustment in place.
fn benjamini_hochberg(rows: &mut [PathwayEnrichmentRow]) {
    let m = rows.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| rows[a].p_value.total_cmp(&rows[b].p_value));
    let mut running = 1.0_f64;
    for (rank, &i) in order.iter().enumerate().rev() {
        let adjusted = rows[i].p_value * m as f64 / (rank + 1) as f64;
        running = running.min(adjusted);
        rows[i].adjusted_p_value = running.min(1.0);
    }
}
