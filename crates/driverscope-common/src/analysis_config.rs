//! Analysis configuration for one evidence-integration run.
//!
//! Loaded once from TOML/YAML/JSON, optionally overridden from the
//! environment, then validated before any computation starts. The pipeline
//! only ever sees an immutable, validated copy.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::confidence::ConfidenceThresholds;
use crate::entities::EvidenceType;
use crate::error::{AnalysisError, Result};
use crate::weights::EvidenceWeights;

/// Complete configuration surface of the evidence integration engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Weight per evidence type
    #[serde(default)]
    pub evidence_weights: EvidenceWeights,

    /// Minimum causal score for a gene to be reported as causal
    #[serde(default = "default_causal_threshold")]
    pub causal_score_threshold: f64,

    /// Significance cut-off used inside the collectors
    #[serde(default = "default_p_threshold")]
    pub p_value_threshold: f64,

    /// Effect magnitude at which the effect component saturates
    #[serde(default = "default_effect_threshold")]
    pub effect_size_threshold: f64,

    /// Confidence tier thresholds
    #[serde(default)]
    pub confidence: ConfidenceThresholds,

    /// Per-collector statistical options
    #[serde(default)]
    pub collectors: CollectorConfig,

    /// Evidence network options
    #[serde(default)]
    pub network: NetworkConfig,

    /// Stability validation options
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Pathway enrichment options
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    /// Restrict scoring to this many high-variance candidate genes
    /// (plus frequently altered ones). `None` scores every gene.
    #[serde(default)]
    pub candidate_gene_limit: Option<usize>,
}

fn default_causal_threshold() -> f64 { 0.7 }
fn default_p_threshold() -> f64 { 0.05 }
fn default_effect_threshold() -> f64 { 0.3 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            evidence_weights: EvidenceWeights::default(),
            causal_score_threshold: default_causal_threshold(),
            p_value_threshold: default_p_threshold(),
            effect_size_threshold: default_effect_threshold(),
            confidence: ConfidenceThresholds::default(),
            collectors: CollectorConfig::default(),
            network: NetworkConfig::default(),
            validation: ValidationConfig::default(),
            enrichment: EnrichmentConfig::default(),
            candidate_gene_limit: None,
        }
    }
}

// ── Collector options ───────────────────────────────────────────────────────

/// Two-sample test used for differential expression.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TwoSampleTest {
    #[default]
    Welch,
    Student,
}

/// Survival test family.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SurvivalTest {
    #[default]
    LogRank,
    Cox,
}

/// Correlation family used by the CNV and methylation collectors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    Spearman,
}

/// Recurrence test against the background mutation rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MutationTest {
    #[default]
    Binomial,
    Poisson,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectorConfig {
    /// Evidence types to compute
    #[serde(default = "default_enabled")]
    pub enabled: Vec<EvidenceType>,

    /// Minimum samples per comparison group (tumour/normal, high/low)
    #[serde(default = "default_min_group")]
    pub min_samples_per_group: usize,

    /// Minimum paired samples for CNV/methylation correlation
    #[serde(default = "default_min_paired")]
    pub min_paired_samples: usize,

    #[serde(default)]
    pub de_test: TwoSampleTest,

    /// Expression values are already log2-scaled
    #[serde(default = "default_true")]
    pub expression_is_log2: bool,

    #[serde(default)]
    pub survival_test: SurvivalTest,

    #[serde(default)]
    pub correlation_method: CorrelationMethod,

    /// |log-ratio| above which a sample counts as copy-number altered
    #[serde(default = "default_cnv_cutoff")]
    pub cnv_alteration_cutoff: f64,

    /// Beta value above which a sample counts as hypermethylated
    #[serde(default = "default_hyper")]
    pub hypermethylation_cutoff: f64,

    /// Beta value below which a sample counts as hypomethylated
    #[serde(default = "default_hypo")]
    pub hypomethylation_cutoff: f64,

    /// Per-sample background probability of a gene carrying a mutation
    #[serde(default = "default_background_rate")]
    pub background_mutation_rate: f64,

    #[serde(default)]
    pub mutation_test: MutationTest,

    /// Mutation classes ignored when counting recurrence (case-insensitive)
    #[serde(default = "default_excluded_mutations")]
    pub excluded_mutation_types: Vec<String>,

    /// Copied from the top-level config by [`AnalysisConfig::collector_view`].
    #[serde(skip)]
    pub p_value_threshold: f64,

    /// Copied from the top-level config by [`AnalysisConfig::collector_view`].
    #[serde(skip)]
    pub effect_size_threshold: f64,
}

fn default_enabled() -> Vec<EvidenceType> { EvidenceType::ALL.to_vec() }
fn default_min_group() -> usize { 3 }
fn default_min_paired() -> usize { 3 }
fn default_true() -> bool { true }
fn default_cnv_cutoff() -> f64 { 0.5 }
fn default_hyper() -> f64 { 0.7 }
fn default_hypo() -> f64 { 0.3 }
fn default_background_rate() -> f64 { 0.01 }
fn default_excluded_mutations() -> Vec<String> { vec!["Silent".to_string()] }

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            min_samples_per_group: default_min_group(),
            min_paired_samples: default_min_paired(),
            de_test: TwoSampleTest::default(),
            expression_is_log2: true,
            survival_test: SurvivalTest::default(),
            correlation_method: CorrelationMethod::default(),
            cnv_alteration_cutoff: default_cnv_cutoff(),
            hypermethylation_cutoff: default_hyper(),
            hypomethylation_cutoff: default_hypo(),
            background_mutation_rate: default_background_rate(),
            mutation_test: MutationTest::default(),
            excluded_mutation_types: default_excluded_mutations(),
            p_value_threshold: default_p_threshold(),
            effect_size_threshold: default_effect_threshold(),
        }
    }
}

impl CollectorConfig {
    pub fn is_enabled(&self, evidence_type: EvidenceType) -> bool {
        self.enabled.contains(&evidence_type)
    }

    pub fn counts_mutation_type(&self, mutation_type: &str) -> bool {
        !self
            .excluded_mutation_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mutation_type))
    }
}

// ── Network options ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Minimum evidence similarity for an edge
    #[serde(default = "default_similarity")]
    pub similarity_threshold: f64,

    /// Candidate cap; the top genes by causal score are kept
    #[serde(default = "default_max_network_genes")]
    pub max_network_genes: usize,
}

fn default_similarity() -> f64 { 0.5 }
fn default_max_network_genes() -> usize { 500 }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity(),
            max_network_genes: default_max_network_genes(),
        }
    }
}

// ── Validation options ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Bootstrap resamples; the dominant cost of a run
    #[serde(default = "default_bootstrap")]
    pub bootstrap_iterations: usize,

    #[serde(default = "default_folds")]
    pub cross_validation_folds: usize,

    /// Base seed for fold assignment and resampling
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_bootstrap() -> usize { 100 }
fn default_folds() -> usize { 5 }
fn default_seed() -> u64 { 42 }

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bootstrap_iterations: default_bootstrap(),
            cross_validation_folds: default_folds(),
            seed: default_seed(),
        }
    }
}

// ── Enrichment options ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichmentConfig {
    /// Pathways overlapping fewer top genes are not reported
    #[serde(default = "default_min_overlap")]
    pub min_overlap: usize,

    /// Background universe size; defaults to the number of scored genes
    #[serde(default)]
    pub background_size: Option<usize>,
}

fn default_min_overlap() -> usize { 1 }

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            min_overlap: default_min_overlap(),
            background_size: None,
        }
    }
}

// ── Loading, overrides, validation ──────────────────────────────────────────

impl AnalysisConfig {
    /// Load from a TOML, YAML or JSON file, chosen by extension.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("toml")
            .to_ascii_lowercase();
        let config: Self = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        Ok(config)
    }

    /// Save to YAML file
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `DRIVERSCOPE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_override(&lookup, "DRIVERSCOPE_P_VALUE_THRESHOLD")? {
            self.p_value_threshold = v;
        }
        if let Some(v) = parse_override(&lookup, "DRIVERSCOPE_CAUSAL_SCORE_THRESHOLD")? {
            self.causal_score_threshold = v;
        }
        if let Some(v) = parse_override(&lookup, "DRIVERSCOPE_BOOTSTRAP_ITERATIONS")? {
            self.validation.bootstrap_iterations = v;
        }
        if let Some(v) = parse_override(&lookup, "DRIVERSCOPE_CV_FOLDS")? {
            self.validation.cross_validation_folds = v;
        }
        if let Some(v) = parse_override(&lookup, "DRIVERSCOPE_SIMILARITY_THRESHOLD")? {
            self.network.similarity_threshold = v;
        }
        if let Some(v) = parse_override(&lookup, "DRIVERSCOPE_MAX_NETWORK_GENES")? {
            self.network.max_network_genes = v;
        }
        Ok(())
    }

    /// Check every contract of the configuration surface.
    pub fn validate(&self) -> Result<()> {
        self.evidence_weights.validate()?;
        self.confidence.validate()?;

        unit("causal_score_threshold", self.causal_score_threshold)?;
        unit("network.similarity_threshold", self.network.similarity_threshold)?;
        if !(self.p_value_threshold > 0.0 && self.p_value_threshold < 1.0) {
            return Err(AnalysisError::Config(format!(
                "p_value_threshold must be in (0, 1), got {}",
                self.p_value_threshold
            )));
        }
        if !(self.effect_size_threshold > 0.0 && self.effect_size_threshold.is_finite()) {
            return Err(AnalysisError::Config(format!(
                "effect_size_threshold must be positive, got {}",
                self.effect_size_threshold
            )));
        }

        let c = &self.collectors;
        if c.enabled.is_empty() {
            return Err(AnalysisError::Config(
                "at least one evidence type must be enabled".to_string(),
            ));
        }
        if !c.enabled.iter().any(|t| self.evidence_weights.get(*t) > 0.0) {
            return Err(AnalysisError::InvalidWeightConfig(
                "every enabled evidence type has zero weight".to_string(),
            ));
        }
        if c.min_samples_per_group < 2 {
            return Err(AnalysisError::Config(
                "collectors.min_samples_per_group must be at least 2".to_string(),
            ));
        }
        if c.min_paired_samples < 3 {
            return Err(AnalysisError::Config(
                "collectors.min_paired_samples must be at least 3".to_string(),
            ));
        }
        if !(c.background_mutation_rate > 0.0 && c.background_mutation_rate < 1.0) {
            return Err(AnalysisError::Config(format!(
                "collectors.background_mutation_rate must be in (0, 1), got {}",
                c.background_mutation_rate
            )));
        }
        unit("collectors.hypermethylation_cutoff", c.hypermethylation_cutoff)?;
        unit("collectors.hypomethylation_cutoff", c.hypomethylation_cutoff)?;
        if c.hypomethylation_cutoff > c.hypermethylation_cutoff {
            return Err(AnalysisError::Config(
                "collectors.hypomethylation_cutoff exceeds hypermethylation_cutoff".to_string(),
            ));
        }
        if !(c.cnv_alteration_cutoff >= 0.0 && c.cnv_alteration_cutoff.is_finite()) {
            return Err(AnalysisError::Config(
                "collectors.cnv_alteration_cutoff must be non-negative".to_string(),
            ));
        }

        if self.network.max_network_genes == 0 {
            return Err(AnalysisError::Config(
                "network.max_network_genes must be at least 1".to_string(),
            ));
        }
        if self.validation.enabled {
            if self.validation.bootstrap_iterations == 0 {
                return Err(AnalysisError::Config(
                    "validation.bootstrap_iterations must be at least 1".to_string(),
                ));
            }
            if self.validation.cross_validation_folds < 2 {
                return Err(AnalysisError::Config(
                    "validation.cross_validation_folds must be at least 2".to_string(),
                ));
            }
        }
        if self.enrichment.min_overlap == 0 {
            return Err(AnalysisError::Config(
                "enrichment.min_overlap must be at least 1".to_string(),
            ));
        }
        if self.candidate_gene_limit == Some(0) {
            return Err(AnalysisError::Config(
                "candidate_gene_limit must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Collector options with the shared thresholds filled in.
    pub fn collector_view(&self) -> CollectorConfig {
        CollectorConfig {
            p_value_threshold: self.p_value_threshold,
            effect_size_threshold: self.effect_size_threshold,
            ..self.collectors.clone()
        }
    }
}

fn unit(name: &str, v: f64) -> Result<()> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(AnalysisError::Config(format!("{name} must be in [0, 1], got {v}")))
    }
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => {
            let value = raw
                .trim()
                .parse::<T>()
                .map_err(|_| AnalysisError::Config(format!("{key}: cannot parse {raw:?}")))?;
            debug!(key, value = raw.trim(), "Config override from environment");
            Ok(Some(value))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
