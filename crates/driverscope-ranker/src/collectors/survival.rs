//! Expression-stratified survival association.
//!
//! Samples are split at the gene's median expression (high = strictly above
//! the median). The log-rank test compares the two strata directly; the Cox
//! variant fits a univariate proportional-hazards model on standardised
//! expression. Either way `effect_size` is a signed log hazard ratio, so a
//! positive value means high expression goes with worse survival.

use rayon::prelude::*;

use driverscope_common::{
    AnalysisError, CollectorConfig, EvidenceRecord, EvidenceSlice, EvidenceType, Result,
    SurvivalTest,
};
use driverscope_omics::{AlignedDataset, Cohort};

use crate::normalise::blended_score;
use crate::stats;

pub struct SurvivalAssociationCollector;

impl super::EvidenceCollector for SurvivalAssociationCollector {
    fn evidence_type(&self) -> EvidenceType {
        EvidenceType::SurvivalAssociation
    }

    fn is_available(&self, data: &AlignedDataset) -> bool {
        data.has_clinical()
    }

    fn collect(&self, cohort: &Cohort<'_>, config: &CollectorConfig) -> Result<EvidenceSlice> {
        let min = config.min_samples_per_group;
        let required = 2 * min;
        let obs = cohort.survival();
        if obs.len() < required {
            return Err(AnalysisError::insufficient(
                EvidenceType::SurvivalAssociation,
                required,
                obs.len(),
                "samples with clinical follow-up",
            ));
        }
        let n_events = obs.iter().filter(|o| o.event).count();
        if n_events == 0 {
            return Err(AnalysisError::insufficient(
                EvidenceType::SurvivalAssociation,
                1,
                0,
                "observed events",
            ));
        }

        let expr = &cohort.dataset().expression;
        let records: Vec<EvidenceRecord> = (0..expr.n_genes())
            .into_par_iter()
            .filter_map(|g| {
                let row = expr.row(g);
                let mut times = Vec::with_capacity(obs.len());
                let mut events = Vec::with_capacity(obs.len());
                let mut x = Vec::with_capacity(obs.len());
                for o in &obs {
                    let v = row[o.position];
                    if v.is_finite() {
                        times.push(o.time);
                        events.push(o.event);
                        x.push(v);
                    }
                }
                if x.len() < required || x.iter().all(|v| *v == x[0]) {
                    return None;
                }
                let cut = stats::median(&x);
                let high: Vec<bool> = x.iter().map(|v| *v > cut).collect();
                let n_high = high.iter().filter(|h| **h).count();
                let n_low = high.len() - n_high;
                if n_high < min || n_low < min {
                    return None;
                }

                let gene = expr.genes()[g].clone();
                let record = match config.survival_test {
                    SurvivalTest::LogRank => {
                        let lr = stats::log_rank(&times, &events, &high)?;
                        let effect = lr.hazard_ratio.ln();
                        if !effect.is_finite() {
                            return None;
                        }
                        let scored = blended_score(lr.p_value, effect, config.p_value_threshold, config.effect_size_threshold);
                        EvidenceRecord::new(gene, EvidenceType::SurvivalAssociation, scored.score, lr.p_value, effect, scored.confidence)
                            .with_metadata("logrank_statistic", lr.chi2)
                            .with_metadata("hazard_ratio", lr.hazard_ratio)
                            .with_metadata("observed_high", lr.observed_group)
                            .with_metadata("expected_high", lr.expected_group)
                    }
                    SurvivalTest::Cox => {
                        let (m, sd) = (stats::mean(&x), stats::variance(&x).sqrt());
                        let z: Vec<f64> = x.iter().map(|v| (v - m) / sd).collect();
                        let fit = stats::cox_univariate(&times, &events, &z)?;
                        let scored = blended_score(fit.p_value, fit.beta, config.p_value_threshold, config.effect_size_threshold);
                        EvidenceRecord::new(gene, EvidenceType::SurvivalAssociation, scored.score, fit.p_value, fit.beta, scored.confidence)
                            .with_metadata("cox_z", fit.z)
                            .with_metadata("cox_std_error", fit.std_error)
                            .with_metadata("hazard_ratio", fit.beta.exp())
                            .with_metadata("cox_converged", if fit.converged { 1.0 } else { 0.0 })
                    }
                };
                Some(
                    record
                        .with_metadata("high_group_size", n_high as f64)
                        .with_metadata("low_group_size", n_low as f64)
                        .with_metadata("median_expression", cut),
                )
            })
            .collect();

        let mut slice = EvidenceSlice::new(EvidenceType::SurvivalAssociation);
        for r in records {
            slice.push(r);
        }
        Ok(slice)
    }
}
