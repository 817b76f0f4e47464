//! Ranking stability under resampling.
//!
//! Two estimates, both against the full-data reference ranking:
//!   - k-fold cross-validation: each fold's training samples are re-scored
//!   - bootstrap: samples drawn with replacement, B iterations
//!
//! Every iteration recomputes all evidence from scratch and owns its RNG
//! (seed = base + iteration index), so the report does not depend on how
//! rayon schedules the iterations.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

use driverscope_common::{
    AnalysisError, CollectorConfig, EvidenceMatrix, EvidenceType, Result, ValidationConfig,
};
use driverscope_omics::{AlignedDataset, Cohort};

use crate::aggregator::EvidenceAggregator;
use crate::cancel::CancellationToken;
use crate::collectors::{collect_all, EvidenceCollector};
use crate::stats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Mean fold-vs-reference rank correlation, floored at 0.
    pub cross_validation_score: f64,
    /// Mean bootstrap-vs-reference rank correlation, floored at 0.
    pub bootstrap_stability: f64,
    /// Population variance of each gene's 1-based bootstrap rank.
    pub per_gene_rank_variance: BTreeMap<String, f64>,
    pub folds_evaluated: usize,
    pub bootstrap_iterations: usize,
    /// Iterations with fewer than two genes in common with the reference.
    pub degenerate_iterations: usize,
    /// Per evidence type, how many iterations lost it to insufficient samples.
    pub absent_evidence: BTreeMap<EvidenceType, usize>,
}

/// One resampled re-scoring.
#[derive(Debug, Clone)]
struct IterationOutcome {
    ranking: Vec<String>,
    absent: Vec<EvidenceType>,
}

#[derive(Debug, Clone)]
pub struct StabilityValidator {
    pub folds: usize,
    pub iterations: usize,
    pub seed: u64,
}

impl Default for StabilityValidator {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

impl StabilityValidator {
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            folds: config.cross_validation_folds,
            iterations: config.bootstrap_iterations,
            seed: config.seed,
        }
    }

    /// Re-run `collectors` + `aggregator` on resampled cohorts of `data` and
    /// compare each ranking to `reference`.
    ///
    /// Returns `Cancelled` if `token` fires before every iteration finished.
    pub fn validate(
        &self,
        data: &AlignedDataset,
        collectors: &[Box<dyn EvidenceCollector>],
        collector_config: &CollectorConfig,
        aggregator: &EvidenceAggregator,
        reference: &[String],
        token: &CancellationToken,
    ) -> Result<ValidationReport> {
        let n = data.n_samples();
        let mut folds = self.folds;
        if folds > n {
            warn!(requested = folds, n_samples = n, "More folds than samples, clamping");
            folds = n;
        }
        if folds < 2 {
            warn!(folds, "Cross-validation needs at least two folds, skipping");
            folds = 0;
        }
        let total = folds + self.iterations;
        info!(folds, bootstrap_iterations = self.iterations, n_samples = n, "Stability validation started");

        let completed = AtomicUsize::new(0);
        let run = |positions: Vec<usize>| -> Result<IterationOutcome> {
            if token.is_cancelled() {
                return Err(AnalysisError::Cancelled {
                    completed: completed.load(Ordering::SeqCst),
                    total,
                });
            }
            let cohort = Cohort::from_positions(data, positions);
            let collected = collect_all(collectors, &cohort, collector_config)?;
            let matrix = EvidenceMatrix::from_slices(collected.slices)?;
            let outcome = IterationOutcome {
                ranking: aggregator.ranking(&matrix),
                absent: collected.absent.iter().map(|a| a.evidence_type).collect(),
            };
            completed.fetch_add(1, Ordering::SeqCst);
            Ok(outcome)
        };

        let fold_outcomes: Vec<IterationOutcome> = if folds > 0 {
            let assignment = fold_assignment(n, self.seed);
            (0..folds)
                .into_par_iter()
                .map(|fold| {
                    let training = assignment
                        .iter()
                        .enumerate()
                        .filter(|(slot, _)| slot % folds != fold)
                        .map(|(_, &p)| p)
                        .collect();
                    run(training)
                })
                .collect::<Result<_>>()?
        } else {
            Vec::new()
        };

        let boot_outcomes: Vec<IterationOutcome> = (0..self.iterations)
            .into_par_iter()
            .map(|b| run(bootstrap_positions(n, self.seed.wrapping_add(b as u64))))
            .collect::<Result<_>>()?;

        // A late cancel must not leak a partial report.
        if token.is_cancelled() {
            return Err(AnalysisError::Cancelled {
                completed: completed.load(Ordering::SeqCst),
                total,
            });
        }

        let mut degenerate = 0usize;
        let cv = mean_correlation(&fold_outcomes, reference, &mut degenerate);
        let boot = mean_correlation(&boot_outcomes, reference, &mut degenerate);

        let mut absent_evidence: BTreeMap<EvidenceType, usize> = BTreeMap::new();
        for outcome in fold_outcomes.iter().chain(&boot_outcomes) {
            for t in &outcome.absent {
                *absent_evidence.entry(*t).or_default() += 1;
            }
        }

        let report = ValidationReport {
            cross_validation_score: cv,
            bootstrap_stability: boot,
            per_gene_rank_variance: rank_variance(&boot_outcomes),
            folds_evaluated: fold_outcomes.len(),
            bootstrap_iterations: boot_outcomes.len(),
            degenerate_iterations: degenerate,
            absent_evidence,
        };
        info!(
            cross_validation_score = report.cross_validation_score,
            bootstrap_stability = report.bootstrap_stability,
            degenerate = report.degenerate_iterations,
            "Stability validation finished"
        );
        Ok(report)
    }
}

// ── Resampling ──────────────────────────────────────────────────────────────

/// Seeded permutation of `0..n`; slot `j` belongs to fold `j mod k`.
fn fold_assignment(n: usize, seed: u64) -> Vec<usize> {
    let mut positions: Vec<usize> = (0..n).collect();
    positions.shuffle(&mut StdRng::seed_from_u64(seed));
    positions
}

fn bootstrap_positions(n: usize, seed: u64) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

// ── Rank comparison ─────────────────────────────────────────────────────────

/// Spearman correlation of two rankings over the genes they share.
/// `None` when fewer than two genes are shared.
pub fn ranking_correlation(reference: &[String], other: &[String]) -> Option<f64> {
    let other_rank: HashMap<&str, usize> = other
        .iter()
        .enumerate()
        .map(|(i, g)| (g.as_str(), i))
        .collect();
    let common: Vec<usize> = reference
        .iter()
        .filter_map(|g| other_rank.get(g.as_str()).copied())
        .collect();
    let m = common.len();
    if m < 2 {
        return None;
    }
    // Re-rank the other positions within the common set. Reference ranks
    // are 0..m by construction.
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by_key(|&i| common[i]);
    let mut d2 = 0.0;
    for (other_rank, &ref_rank) in order.iter().enumerate() {
        let d = ref_rank as f64 - other_rank as f64;
        d2 += d * d;
    }
    let m = m as f64;
    Some(1.0 - 6.0 * d2 / (m * (m * m - 1.0)))
}

fn mean_correlation(outcomes: &[IterationOutcome], reference: &[String], degenerate: &mut usize) -> f64 {
    let correlations: Vec<f64> = outcomes
        .iter()
        .filter_map(|o| {
            let r = ranking_correlation(reference, &o.ranking);
            if r.is_none() {
                *degenerate += 1;
            }
            r
        })
        .collect();
    if correlations.is_empty() {
        return 0.0;
    }
    stats::mean(&correlations).max(0.0)
}

fn rank_variance(outcomes: &[IterationOutcome]) -> BTreeMap<String, f64> {
    let mut ranks: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for outcome in outcomes {
        for (i, gene) in outcome.ranking.iter().enumerate() {
            ranks.entry(gene.clone()).or_default().push((i + 1) as f64);
        }
    }
    ranks
        .into_iter()
        .map(|(gene, r)| {
            let mu = stats::mean(&r);
            let var = r.iter().map(|x| (x - mu).powi(2)).sum::<f64>() / r.len() as f64;
            (gene, var)
        })
        .collect()
}
