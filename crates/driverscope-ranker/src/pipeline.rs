//! End-to-end analysis: align → collect → aggregate → network + validation
//! → enrichment.
//!
//! A run either returns a complete [`AnalysisResult`] or one fatal error.
//! Non-fatal conditions (absent evidence types, an enrichment stage with no
//! top genes, network truncation) are logged and listed in `warnings`.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};
use uuid::Uuid;

use driverscope_common::{
    AnalysisConfig, AnalysisError, CausalGene, CollectorConfig, EvidenceMatrix, Result,
};
use driverscope_kg::{EvidenceNetworkBuilder, NetworkMetrics, PathwayAnalysis, PathwayEnrichment};
use driverscope_omics::{select_candidate_genes, Cohort, GeneSetCollection, OmicsDataset};

use crate::aggregator::EvidenceAggregator;
use crate::cancel::CancellationToken;
use crate::collectors::{collect_all, default_collectors, log_absent, EvidenceCollector};
use crate::result::{AlgorithmStats, AnalysisResult};
use crate::validation::StabilityValidator;

/// Everything a run reads.
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub dataset: OmicsDataset,
    pub gene_sets: Option<GeneSetCollection>,
    /// Per-gene JSON passed through to `biological_context.annotations`.
    pub annotations: BTreeMap<String, Value>,
}

impl AnalysisInput {
    pub fn new(dataset: OmicsDataset) -> Self {
        Self {
            dataset,
            gene_sets: None,
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_gene_sets(mut self, gene_sets: GeneSetCollection) -> Self {
        self.gene_sets = Some(gene_sets);
        self
    }

    pub fn with_annotations(mut self, annotations: BTreeMap<String, Value>) -> Self {
        self.annotations = annotations;
        self
    }
}

pub struct AnalysisPipeline {
    config: AnalysisConfig,
    collector_config: CollectorConfig,
    collectors: Vec<Box<dyn EvidenceCollector>>,
    aggregator: EvidenceAggregator,
}

impl AnalysisPipeline {
    /// Validates `config` before anything is computed.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        let collectors = default_collectors(&config.collector_view());
        Self::with_collectors(config, collectors)
    }

    /// Use a custom collector set in place of the built-in five.
    pub fn with_collectors(
        config: AnalysisConfig,
        collectors: Vec<Box<dyn EvidenceCollector>>,
    ) -> Result<Self> {
        config.validate()?;
        let aggregator = EvidenceAggregator::from_config(&config)?;
        Ok(Self {
            collector_config: config.collector_view(),
            config,
            collectors,
            aggregator,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self, input: &AnalysisInput, token: &CancellationToken) -> Result<AnalysisResult> {
        let mut warnings: Vec<String> = Vec::new();
        check_cancelled(token)?;

        // ── Alignment ──
        let mut data = input.dataset.align()?;
        info!(
            n_samples = data.n_samples(),
            n_genes = data.genes().len(),
            "Samples aligned"
        );
        if let Some(limit) = self.config.candidate_gene_limit {
            let keep = select_candidate_genes(&data, limit, self.collector_config.cnv_alteration_cutoff);
            data = data.restricted_to(&keep);
        }

        // ── Full-data evidence ──
        let collected = collect_all(&self.collectors, &Cohort::full(&data), &self.collector_config)?;
        log_absent(&collected.absent);
        for a in &collected.absent {
            warnings.push(format!("{} evidence absent: {}", a.evidence_type, a.reason));
        }
        if collected.slices.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "no evidence type could be computed for the supplied data".to_string(),
            ));
        }
        let matrix = EvidenceMatrix::from_slices(collected.slices.clone())?;
        check_cancelled(token)?;

        // ── Aggregation ──
        let annotations = (!input.annotations.is_empty()).then_some(&input.annotations);
        let scored = self.aggregator.aggregate_annotated(&matrix, annotations);
        let reference: Vec<String> = scored.iter().map(|g| g.gene_id.clone()).collect();
        let causal: Vec<CausalGene> = scored
            .iter()
            .filter(|g| g.causal_score >= self.config.causal_score_threshold)
            .cloned()
            .collect();
        info!(
            genes_scored = scored.len(),
            causal_genes = causal.len(),
            threshold = self.config.causal_score_threshold,
            "Evidence aggregated"
        );

        // ── Network and validation ──
        let builder = EvidenceNetworkBuilder::from_config(&self.config.network);
        let ((network, metrics), validation) = rayon::join(
            || {
                let network = builder.build(&causal);
                let metrics = NetworkMetrics::compute(&network);
                (network, metrics)
            },
            || {
                if !self.config.validation.enabled {
                    return Ok(None);
                }
                StabilityValidator::from_config(&self.config.validation)
                    .validate(
                        &data,
                        &self.collectors,
                        &self.collector_config,
                        &self.aggregator,
                        &reference,
                        token,
                    )
                    .map(Some)
            },
        );
        let validation = validation?;
        if network.truncated_genes > 0 {
            warnings.push(format!(
                "evidence network capped at {} genes, {} dropped",
                self.config.network.max_network_genes, network.truncated_genes
            ));
        }
        check_cancelled(token)?;

        // ── Enrichment ──
        let pathway_analysis = match &input.gene_sets {
            Some(sets) => match self.enrich(&causal, &reference, sets) {
                Ok(analysis) => Some(analysis),
                Err(AnalysisError::EmptyGeneSet) => {
                    warn!("No causal genes to test for pathway enrichment, skipping");
                    warnings.push("pathway enrichment skipped: no causal genes".to_string());
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        let stats = AlgorithmStats::compute(&matrix, &scored, &causal, &collected.absent);
        info!(
            causal_genes = stats.causal_genes_identified,
            mean_causal_score = stats.mean_causal_score,
            warnings = warnings.len(),
            "Analysis complete"
        );

        Ok(AnalysisResult {
            run_id: Uuid::new_v4(),
            generated_at: chrono::Utc::now(),
            causal_genes: causal,
            evidence_network: network,
            network_metrics: metrics,
            validation,
            pathway_analysis,
            stats,
            warnings,
        })
    }

    fn enrich(
        &self,
        causal: &[CausalGene],
        scored_genes: &[String],
        sets: &GeneSetCollection,
    ) -> Result<PathwayAnalysis> {
        let top: Vec<String> = causal.iter().map(|g| g.gene_id.clone()).collect();
        let enrichment = PathwayEnrichment::from_config(&self.config.enrichment);
        match self.config.enrichment.background_size {
            Some(background) => enrichment.enrich(&top, sets.iter(), background, None),
            None => {
                let universe: BTreeSet<String> = scored_genes.iter().cloned().collect();
                enrichment.enrich(&top, sets.iter(), universe.len(), Some(&universe))
            }
        }
    }
}

fn check_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(AnalysisError::Cancelled { completed: 0, total: 0 });
    }
    Ok(())
}
