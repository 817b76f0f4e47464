//! CSV/TSV/GMT loaders for the input tables.
//!
//! The delimiter is chosen from the file extension: `.tsv`, `.txt` and
//! `.maf` are tab-separated, everything else is comma-separated.
//!
//! Conventional file names inside a data directory:
//! - `expression.{tsv,csv}` (required): gene rows, sample columns
//! - `sample_groups.{tsv,csv}`: `sample_id, group`
//! - `clinical.{tsv,csv}`: `sample_id, survival_time, survival_status, covariates...`
//! - `cnv.{tsv,csv}`, `methylation.{tsv,csv}`: gene rows, sample columns
//! - `mutations.{tsv,csv,maf}`: `gene_id, sample_id, mutation_type`
//! - `gene_sets.{gmt,tsv,csv}`

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dataset::OmicsDataset;
use crate::gene_sets::GeneSetCollection;
use crate::matrix::NumericMatrix;
use crate::mutation::{MutationCall, MutationTable};
use crate::samples::{parse_survival_status, ClinicalRecord, ClinicalTable, SampleGroup, SampleGroups};

const TABLE_EXTENSIONS: [&str; 2] = ["tsv", "csv"];

/// Paths of the input tables for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFiles {
    pub expression: PathBuf,
    #[serde(default)]
    pub sample_groups: Option<PathBuf>,
    #[serde(default)]
    pub clinical: Option<PathBuf>,
    #[serde(default)]
    pub cnv: Option<PathBuf>,
    #[serde(default)]
    pub methylation: Option<PathBuf>,
    #[serde(default)]
    pub mutations: Option<PathBuf>,
    #[serde(default)]
    pub gene_sets: Option<PathBuf>,
}

impl InputFiles {
    /// Find tables by conventional name in `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let expression = find(dir, "expression", &TABLE_EXTENSIONS).with_context(|| {
            format!("no expression.tsv or expression.csv found in {}", dir.display())
        })?;
        Ok(Self {
            expression,
            sample_groups: find(dir, "sample_groups", &TABLE_EXTENSIONS),
            clinical: find(dir, "clinical", &TABLE_EXTENSIONS),
            cnv: find(dir, "cnv", &TABLE_EXTENSIONS),
            methylation: find(dir, "methylation", &TABLE_EXTENSIONS),
            mutations: find(dir, "mutations", &["tsv", "csv", "maf"]),
            gene_sets: find(dir, "gene_sets", &["gmt", "tsv", "csv"]),
        })
    }

    /// Read every listed table.
    pub fn load(&self) -> Result<(OmicsDataset, Option<GeneSetCollection>)> {
        info!(expression = %self.expression.display(), "Loading omics tables");

        let mut dataset = OmicsDataset::new(load_matrix(&self.expression)?);
        if let Some(p) = &self.sample_groups {
            dataset = dataset.with_sample_groups(load_sample_groups(p)?);
        }
        if let Some(p) = &self.clinical {
            dataset = dataset.with_clinical(load_clinical(p)?);
        }
        if let Some(p) = &self.cnv {
            dataset = dataset.with_cnv(load_matrix(p)?);
        }
        if let Some(p) = &self.methylation {
            dataset = dataset.with_methylation(load_methylation(p)?);
        }
        if let Some(p) = &self.mutations {
            dataset = dataset.with_mutations(load_mutations(p)?);
        }
        let gene_sets = match &self.gene_sets {
            Some(p) => Some(load_gene_sets(p)?),
            None => None,
        };
        Ok((dataset, gene_sets))
    }
}

impl OmicsDataset {
    /// Load all tables found in `dir` by conventional name.
    pub fn load_from_dir(dir: &Path) -> Result<(Self, Option<GeneSetCollection>)> {
        InputFiles::discover(dir)?.load()
    }
}

fn find(dir: &Path, stem: &str, extensions: &[&str]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.exists())
}

fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("txt") | Some("maf") => b'\t',
        _ => b',',
    }
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .comment(Some(b'#'))
        .flexible(false)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))
}

fn parse_cell(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("na") || t.eq_ignore_ascii_case("nan") || t.eq_ignore_ascii_case("null") {
        return Some(f64::NAN);
    }
    t.parse::<f64>().ok()
}

fn read_rows(path: &Path) -> Result<(Vec<String>, Vec<(String, Vec<f64>)>)> {
    let mut rdr = reader(path)?;
    let header = rdr
        .headers()
        .with_context(|| format!("{} has no header row", path.display()))?
        .clone();
    if header.len() < 2 {
        bail!("{} must have a gene column and at least one sample column", path.display());
    }
    let samples: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("{}: malformed row {}", path.display(), line + 2))?;
        let gene = record.get(0).unwrap_or_default().trim().to_string();
        if gene.is_empty() {
            continue;
        }
        let mut values = Vec::with_capacity(samples.len());
        for (j, cell) in record.iter().skip(1).enumerate() {
            let v = parse_cell(cell).with_context(|| {
                format!(
                    "{}: row {} column {}: cannot parse {:?} as a number",
                    path.display(),
                    line + 2,
                    samples[j],
                    cell
                )
            })?;
            values.push(v);
        }
        rows.push((gene, values));
    }
    debug!(path = %path.display(), n_rows = rows.len(), n_samples = samples.len(), "Read matrix rows");
    Ok((samples, rows))
}

/// Gene × sample numeric table (expression, CNV).
pub fn load_matrix(path: &Path) -> Result<NumericMatrix> {
    let (samples, rows) = read_rows(path)?;
    NumericMatrix::from_rows(samples, rows).with_context(|| format!("Invalid matrix in {}", path.display()))
}

/// Methylation table; probes sharing a gene id are averaged.
pub fn load_methylation(path: &Path) -> Result<NumericMatrix> {
    let (samples, rows) = read_rows(path)?;
    NumericMatrix::from_rows_collapsing(samples, rows)
        .with_context(|| format!("Invalid methylation table in {}", path.display()))
}

fn column(header: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    header.iter().position(|h| {
        let h = h.trim();
        names.iter().any(|n| h.eq_ignore_ascii_case(n))
    })
}

pub fn load_sample_groups(path: &Path) -> Result<SampleGroups> {
    let mut rdr = reader(path)?;
    let header = rdr.headers()?.clone();
    let sample_idx = column(&header, &["sample_id", "sample", "barcode"]).unwrap_or(0);
    let group_idx = column(&header, &["group", "sample_type", "label", "condition"]).unwrap_or(1);

    let mut groups = SampleGroups::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let (Some(sample), Some(label)) = (record.get(sample_idx), record.get(group_idx)) else {
            bail!("{}: row {} is missing sample or group", path.display(), line + 2);
        };
        let group: SampleGroup = label
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{}: row {}: {}", path.display(), line + 2, e))?;
        groups.insert(sample.trim(), group);
    }
    info!(n_samples = groups.len(), "Loaded sample groups");
    Ok(groups)
}

pub fn load_clinical(path: &Path) -> Result<ClinicalTable> {
    let mut rdr = reader(path)?;
    let header = rdr.headers()?.clone();
    let sample_idx = column(&header, &["sample_id", "sample", "barcode"]).unwrap_or(0);
    let time_idx = column(&header, &["survival_time", "os_time", "os.time", "time", "days"])
        .with_context(|| format!("{} has no survival_time column", path.display()))?;
    let status_idx = column(&header, &["survival_status", "os_status", "os", "status", "event", "vital_status"])
        .with_context(|| format!("{} has no survival_status column", path.display()))?;

    let mut table = ClinicalTable::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let sample = record.get(sample_idx).unwrap_or_default().trim();
        if sample.is_empty() {
            continue;
        }
        let time = parse_cell(record.get(time_idx).unwrap_or_default())
            .with_context(|| format!("{}: row {}: bad survival_time", path.display(), line + 2))?;
        let raw_status = record.get(status_idx).unwrap_or_default();
        let status = parse_survival_status(raw_status).with_context(|| {
            format!("{}: row {}: bad survival_status {:?}", path.display(), line + 2, raw_status)
        })?;

        let mut covariates = BTreeMap::new();
        for (j, name) in header.iter().enumerate() {
            if j == sample_idx || j == time_idx || j == status_idx {
                continue;
            }
            if let Some(v) = record.get(j).and_then(parse_cell).filter(|v| v.is_finite()) {
                covariates.insert(name.trim().to_string(), v);
            }
        }
        table.insert(
            sample,
            ClinicalRecord {
                survival_time: time,
                survival_status: status,
                covariates,
            },
        );
    }
    info!(n_samples = table.len(), "Loaded clinical table");
    Ok(table)
}

/// Mutation calls; MAF column names (`Hugo_Symbol`, `Tumor_Sample_Barcode`,
/// `Variant_Classification`) are accepted.
pub fn load_mutations(path: &Path) -> Result<MutationTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter_for(path))
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let header = rdr.headers()?.clone();
    let gene_idx = column(&header, &["gene_id", "gene", "hugo_symbol", "symbol"])
        .with_context(|| format!("{} has no gene_id column", path.display()))?;
    let sample_idx = column(&header, &["sample_id", "sample", "tumor_sample_barcode", "barcode"])
        .with_context(|| format!("{} has no sample_id column", path.display()))?;
    let type_idx = column(&header, &["mutation_type", "variant_classification", "type", "consequence"]);

    let mut calls = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let gene = record.get(gene_idx).unwrap_or_default().trim();
        let sample = record.get(sample_idx).unwrap_or_default().trim();
        if gene.is_empty() || sample.is_empty() {
            continue;
        }
        let mutation_type = type_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Unknown");
        calls.push(MutationCall::new(gene, sample, mutation_type));
    }
    info!(n_calls = calls.len(), "Loaded mutation table");
    Ok(MutationTable::new(calls))
}

/// GMT, or a two-column `pathway_id, gene_id` table.
pub fn load_gene_sets(path: &Path) -> Result<GeneSetCollection> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read gene sets {}", path.display()))?;
    let source = path.display().to_string();
    let is_gmt = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gmt"));
    let sets = if is_gmt {
        GeneSetCollection::parse_gmt(&content, &source)?
    } else {
        GeneSetCollection::parse_pairs(&content, delimiter_for(path), &source)?
    };
    info!(n_pathways = sets.len(), "Loaded gene sets");
    Ok(sets)
}
