//! Core entity types shared by the evidence collectors, the aggregator,
//! the network builder and the validator.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Evidence type
// ---------------------------------------------------------------------------

/// The five independent statistical signals a causal score is built from.
///
/// The declaration order is the canonical slot order of an [`EvidenceRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    DifferentialExpression,
    SurvivalAssociation,
    CnvDriver,
    MethylationRegulation,
    MutationFrequency,
}

impl EvidenceType {
    pub const COUNT: usize = 5;

    pub const ALL: [EvidenceType; EvidenceType::COUNT] = [
        EvidenceType::DifferentialExpression,
        EvidenceType::SurvivalAssociation,
        EvidenceType::CnvDriver,
        EvidenceType::MethylationRegulation,
        EvidenceType::MutationFrequency,
    ];

    /// Slot position inside an [`EvidenceRow`].
    pub fn index(self) -> usize {
        match self {
            EvidenceType::DifferentialExpression => 0,
            EvidenceType::SurvivalAssociation => 1,
            EvidenceType::CnvDriver => 2,
            EvidenceType::MethylationRegulation => 3,
            EvidenceType::MutationFrequency => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EvidenceType::DifferentialExpression => "differential_expression",
            EvidenceType::SurvivalAssociation => "survival_association",
            EvidenceType::CnvDriver => "cnv_driver",
            EvidenceType::MethylationRegulation => "methylation_regulation",
            EvidenceType::MutationFrequency => "mutation_frequency",
        }
    }
}

impl fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Evidence record
// ---------------------------------------------------------------------------

/// One gene's result for one evidence type in one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub gene_id: String,
    pub evidence_type: EvidenceType,
    /// Evidence strength in [0, 1].
    pub score: f64,
    /// Test p-value in (0, 1].
    pub p_value: f64,
    /// Signed effect (log2 fold change, ln hazard ratio, correlation, frequency).
    pub effect_size: f64,
    /// Record-level confidence in [0, 1].
    pub confidence: f64,
    /// Test statistics and group sizes backing the record.
    #[serde(default)]
    pub metadata: BTreeMap<String, f64>,
}

impl EvidenceRecord {
    /// Build a record, clamping score and confidence into [0, 1] and the
    /// p-value into (0, 1]. Non-finite scores become 0, non-finite p-values 1.
    pub fn new(
        gene_id: impl Into<String>,
        evidence_type: EvidenceType,
        score: f64,
        p_value: f64,
        effect_size: f64,
        confidence: f64,
    ) -> Self {
        Self {
            gene_id: gene_id.into(),
            evidence_type,
            score: unit_interval(score),
            p_value: probability(p_value),
            effect_size: if effect_size.is_finite() { effect_size } else { 0.0 },
            confidence: unit_interval(confidence),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: f64) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

fn unit_interval(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn probability(p: f64) -> f64 {
    if p.is_nan() {
        1.0
    } else {
        p.clamp(f64::MIN_POSITIVE, 1.0)
    }
}

/// All records one collector produced for one evidence type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSlice {
    pub evidence_type: EvidenceType,
    pub records: Vec<EvidenceRecord>,
}

impl EvidenceSlice {
    pub fn new(evidence_type: EvidenceType) -> Self {
        Self {
            evidence_type,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: EvidenceRecord) {
        debug_assert_eq!(record.evidence_type, self.evidence_type);
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Evidence matrix
// ---------------------------------------------------------------------------

/// Fixed-order evidence slots for one gene. `None` means the evidence type
/// produced no signal for the gene, which is distinct from a zero score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRow {
    slots: [Option<EvidenceRecord>; EvidenceType::COUNT],
}

impl EvidenceRow {
    pub fn get(&self, evidence_type: EvidenceType) -> Option<&EvidenceRecord> {
        self.slots[evidence_type.index()].as_ref()
    }

    /// Present records in canonical evidence-type order.
    pub fn iter(&self) -> impl Iterator<Item = &EvidenceRecord> {
        self.slots.iter().flatten()
    }

    pub fn present_types(&self) -> Vec<EvidenceType> {
        self.iter().map(|r| r.evidence_type).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// gene_id → evidence row. Rows are keyed in sorted order so every traversal
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMatrix {
    rows: BTreeMap<String, EvidenceRow>,
}

impl EvidenceMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matrix from collector outputs.
    pub fn from_slices<I>(slices: I) -> Result<Self>
    where
        I: IntoIterator<Item = EvidenceSlice>,
    {
        let mut matrix = Self::new();
        for slice in slices {
            matrix.insert_slice(slice)?;
        }
        Ok(matrix)
    }

    /// Place a record in the slot of its own evidence type.
    pub fn insert(&mut self, record: EvidenceRecord) -> Result<()> {
        let row = self.rows.entry(record.gene_id.clone()).or_default();
        let slot = &mut row.slots[record.evidence_type.index()];
        if slot.is_some() {
            return Err(AnalysisError::DuplicateEvidence {
                gene_id: record.gene_id,
                evidence_type: record.evidence_type,
            });
        }
        *slot = Some(record);
        Ok(())
    }

    pub fn insert_slice(&mut self, slice: EvidenceSlice) -> Result<usize> {
        let n = slice.records.len();
        for record in slice.records {
            self.insert(record)?;
        }
        Ok(n)
    }

    pub fn get(&self, gene_id: &str) -> Option<&EvidenceRow> {
        self.rows.get(gene_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EvidenceRow)> {
        self.rows.iter().map(|(g, r)| (g.as_str(), r))
    }

    pub fn genes(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(|g| g.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of genes carrying a record of the given type.
    pub fn coverage(&self, evidence_type: EvidenceType) -> usize {
        self.rows
            .values()
            .filter(|r| r.get(evidence_type).is_some())
            .count()
    }

    /// New matrix restricted to the given genes.
    pub fn restricted_to(&self, genes: &BTreeSet<String>) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|(g, _)| genes.contains(*g))
                .map(|(g, r)| (g.clone(), r.clone()))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Causal gene
// ---------------------------------------------------------------------------

/// Discrete confidence tier. Ordered Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// Summary statistics over a gene's evidence plus caller-supplied annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiologicalContext {
    pub mean_p_value: f64,
    pub mean_effect_size: f64,
    /// Present evidence types / configured evidence types.
    pub evidence_consistency: f64,
    /// Opaque metadata passed through from the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<serde_json::Value>,
}

/// A gene with its integrated causal score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalGene {
    pub gene_id: String,
    pub causal_score: f64,
    pub evidence_scores: BTreeMap<EvidenceType, f64>,
    pub confidence_level: ConfidenceLevel,
    /// Contributing evidence types, largest score × weight first.
    pub evidence_chain: Vec<EvidenceType>,
    pub biological_context: BiologicalContext,
}

impl CausalGene {
    /// Number of evidence types that contributed to the causal score.
    pub fn evidence_type_count(&self) -> usize {
        self.evidence_chain.len()
    }
}
