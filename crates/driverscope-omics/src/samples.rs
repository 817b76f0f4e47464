//! Sample annotations: tumour/normal labels and clinical follow-up.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Tumour or adjacent-normal label of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleGroup {
    Tumor,
    Normal,
}

impl SampleGroup {
    /// Infer the group from a TCGA barcode's sample-type code
    /// (`TCGA-XX-XXXX-01A`): 01–09 tumour, 10–19 normal.
    pub fn from_tcga_barcode(barcode: &str) -> Option<Self> {
        let field = barcode.split('-').nth(3)?;
        let code: u32 = field.get(..2)?.parse().ok()?;
        match code {
            1..=9 => Some(SampleGroup::Tumor),
            10..=19 => Some(SampleGroup::Normal),
            _ => None,
        }
    }
}

impl FromStr for SampleGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tumor" | "tumour" | "t" | "cancer" | "primary" => Ok(SampleGroup::Tumor),
            "normal" | "n" | "control" | "adjacent" => Ok(SampleGroup::Normal),
            other => Err(format!("unknown sample group {other:?}")),
        }
    }
}

impl fmt::Display for SampleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleGroup::Tumor => f.write_str("tumor"),
            SampleGroup::Normal => f.write_str("normal"),
        }
    }
}

/// Explicit sample → group labels supplied with the expression table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleGroups {
    labels: HashMap<String, SampleGroup>,
}

impl SampleGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sample_id: impl Into<String>, group: SampleGroup) {
        self.labels.insert(sample_id.into(), group);
    }

    pub fn get(&self, sample_id: &str) -> Option<SampleGroup> {
        self.labels.get(sample_id).copied()
    }

    /// Explicit label first, TCGA barcode inference as fallback.
    pub fn resolve(&self, sample_id: &str) -> Option<SampleGroup> {
        self.get(sample_id)
            .or_else(|| SampleGroup::from_tcga_barcode(sample_id))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl FromIterator<(String, SampleGroup)> for SampleGroups {
    fn from_iter<I: IntoIterator<Item = (String, SampleGroup)>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

/// Follow-up for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRecord {
    /// Time to event or censoring, in the table's unit.
    pub survival_time: f64,
    /// `true` = event observed, `false` = censored.
    pub survival_status: bool,
    #[serde(default)]
    pub covariates: BTreeMap<String, f64>,
}

impl ClinicalRecord {
    pub fn new(survival_time: f64, survival_status: bool) -> Self {
        Self {
            survival_time,
            survival_status,
            covariates: BTreeMap::new(),
        }
    }
}

/// sample_id → clinical record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClinicalTable {
    records: BTreeMap<String, ClinicalRecord>,
}

impl ClinicalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sample_id: impl Into<String>, record: ClinicalRecord) {
        self.records.insert(sample_id.into(), record);
    }

    pub fn get(&self, sample_id: &str) -> Option<&ClinicalRecord> {
        self.records.get(sample_id)
    }

    pub fn contains(&self, sample_id: &str) -> bool {
        self.records.contains_key(sample_id)
    }

    pub fn sample_ids(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<(String, ClinicalRecord)> for ClinicalTable {
    fn from_iter<I: IntoIterator<Item = (String, ClinicalRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// Parse an event indicator as written by common clinical exports.
pub fn parse_survival_status(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "dead" | "deceased" | "event" | "yes" => Some(true),
        "0" | "0.0" | "false" | "alive" | "living" | "censored" | "no" => Some(false),
        _ => None,
    }
}
