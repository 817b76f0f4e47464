//! Dense gene × sample matrices (expression, copy number, methylation).
//!
//! Cells are stored row-major so a gene's values across samples are one
//! contiguous slice. Non-finite cells are allowed and mean "not measured".

use std::collections::{BTreeSet, HashMap};

use driverscope_common::{AnalysisError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct NumericMatrix {
    genes: Vec<String>,
    samples: Vec<String>,
    values: Vec<f64>,
    gene_index: HashMap<String, usize>,
}

impl NumericMatrix {
    /// Build from row-major values. Gene and sample identifiers must be unique.
    pub fn new(genes: Vec<String>, samples: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if values.len() != genes.len() * samples.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "matrix has {} cells, expected {} genes × {} samples",
                values.len(),
                genes.len(),
                samples.len()
            )));
        }
        let mut seen = BTreeSet::new();
        if let Some(dup) = samples.iter().find(|s| !seen.insert(s.as_str())) {
            return Err(AnalysisError::InvalidInput(format!("duplicate sample id {dup}")));
        }
        let mut gene_index = HashMap::with_capacity(genes.len());
        for (i, g) in genes.iter().enumerate() {
            if gene_index.insert(g.clone(), i).is_some() {
                return Err(AnalysisError::InvalidInput(format!("duplicate gene id {g}")));
            }
        }
        Ok(Self {
            genes,
            samples,
            values,
            gene_index,
        })
    }

    /// Build from `(gene, row)` pairs sharing one sample header.
    pub fn from_rows(samples: Vec<String>, rows: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let mut genes = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len() * samples.len());
        for (gene, row) in rows {
            if row.len() != samples.len() {
                return Err(AnalysisError::InvalidInput(format!(
                    "row {gene} has {} values, header has {} samples",
                    row.len(),
                    samples.len()
                )));
            }
            genes.push(gene);
            values.extend(row);
        }
        Self::new(genes, samples, values)
    }

    /// Like [`from_rows`](Self::from_rows) but rows sharing a gene id
    /// (several probes on one gene) are merged by averaging finite cells.
    pub fn from_rows_collapsing(samples: Vec<String>, rows: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let width = samples.len();
        let mut order: Vec<String> = Vec::new();
        let mut sums: HashMap<String, (Vec<f64>, Vec<u32>)> = HashMap::new();
        for (gene, row) in rows {
            if row.len() != width {
                return Err(AnalysisError::InvalidInput(format!(
                    "row {gene} has {} values, header has {width} samples",
                    row.len()
                )));
            }
            let entry = sums.entry(gene.clone()).or_insert_with(|| {
                order.push(gene);
                (vec![0.0; width], vec![0; width])
            });
            for (j, v) in row.into_iter().enumerate() {
                if v.is_finite() {
                    entry.0[j] += v;
                    entry.1[j] += 1;
                }
            }
        }
        let rows = order
            .into_iter()
            .filter_map(|gene| {
                let (sum, count) = sums.remove(&gene)?;
                let row = sum
                    .into_iter()
                    .zip(count)
                    .map(|(s, c)| if c == 0 { f64::NAN } else { s / c as f64 })
                    .collect();
                Some((gene, row))
            })
            .collect();
        Self::from_rows(samples, rows)
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn gene_position(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    pub fn row(&self, gene_pos: usize) -> &[f64] {
        let w = self.samples.len();
        &self.values[gene_pos * w..(gene_pos + 1) * w]
    }

    pub fn row_by_gene(&self, gene: &str) -> Option<&[f64]> {
        self.gene_position(gene).map(|i| self.row(i))
    }

    pub fn value(&self, gene_pos: usize, sample_pos: usize) -> f64 {
        self.values[gene_pos * self.samples.len() + sample_pos]
    }

    /// Reorder columns to `target` sample ids. Samples absent from this
    /// matrix become NaN columns. Returns the new matrix and how many target
    /// samples were found.
    pub fn aligned_to(&self, target: &[String]) -> (Self, usize) {
        let own: HashMap<&str, usize> = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.as_str(), i))
            .collect();
        let mapping: Vec<Option<usize>> = target.iter().map(|s| own.get(s.as_str()).copied()).collect();
        let found = mapping.iter().filter(|m| m.is_some()).count();

        let mut values = Vec::with_capacity(self.genes.len() * target.len());
        for g in 0..self.genes.len() {
            let row = self.row(g);
            values.extend(mapping.iter().map(|m| m.map_or(f64::NAN, |j| row[j])));
        }
        let aligned = Self {
            genes: self.genes.clone(),
            samples: target.to_vec(),
            values,
            gene_index: self.gene_index.clone(),
        };
        (aligned, found)
    }

    /// Keep only the listed genes, preserving row order.
    pub fn retain_genes(&self, keep: &BTreeSet<String>) -> Self {
        let w = self.samples.len();
        let mut genes = Vec::new();
        let mut values = Vec::new();
        for (i, g) in self.genes.iter().enumerate() {
            if keep.contains(g) {
                genes.push(g.clone());
                values.extend_from_slice(&self.values[i * w..(i + 1) * w]);
            }
        }
        let gene_index = genes.iter().enumerate().map(|(i, g)| (g.clone(), i)).collect();
        Self {
            genes,
            samples: self.samples.clone(),
            values,
            gene_index,
        }
    }

    /// Fail when a finite cell lies outside `[lo, hi]`.
    pub fn check_range(&self, name: &str, lo: f64, hi: f64) -> Result<()> {
        let w = self.samples.len().max(1);
        for (k, v) in self.values.iter().enumerate() {
            if v.is_finite() && !(lo..=hi).contains(v) {
                return Err(AnalysisError::InvalidInput(format!(
                    "{name} value {v} for gene {} sample {} outside [{lo}, {hi}]",
                    self.genes[k / w],
                    self.samples[k % w]
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn small() -> NumericMatrix {
        NumericMatrix::from_rows(
            ids(&["S1", "S2", "S3"]),
            vec![
                ("TP53".into(), vec![1.0, 2.0, 3.0]),
                ("MYC".into(), vec![4.0, 5.0, 6.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_row_access() {
        let m = small();
        assert_eq!(m.row_by_gene("MYC").unwrap(), &[4.0, 5.0, 6.0]);
        assert_eq!(m.value(0, 2), 3.0);
        assert!(m.row_by_gene("KRAS").is_none());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = NumericMatrix::from_rows(ids(&["S1", "S2"]), vec![("A".into(), vec![1.0])]);
        assert!(matches!(err, Err(AnalysisError::InvalidInput(_))));
        let err = NumericMatrix::from_rows(
            ids(&["S1"]),
            vec![("A".into(), vec![1.0]), ("A".into(), vec![2.0])],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_aligned_to_fills_missing_with_nan() {
        let (m, found) = small().aligned_to(&ids(&["S3", "S9", "S1"]));
        assert_eq!(found, 2);
        let row = m.row_by_gene("TP53").unwrap();
        assert_eq!(row[0], 3.0);
        assert!(row[1].is_nan());
        assert_eq!(row[2], 1.0);
    }

    #[test]
    fn test_collapsing_averages_probes() {
        let m = NumericMatrix::from_rows_collapsing(
            ids(&["S1", "S2"]),
            vec![
                ("CDKN2A".into(), vec![0.2, f64::NAN]),
                ("MLH1".into(), vec![0.9, 0.8]),
                ("CDKN2A".into(), vec![0.4, f64::NAN]),
            ],
        )
        .unwrap();
        assert_eq!(m.genes(), &ids(&["CDKN2A", "MLH1"])[..]);
        let row = m.row_by_gene("CDKN2A").unwrap();
        assert!((row[0] - 0.3).abs() < 1e-12);
        assert!(row[1].is_nan());
    }

    #[test]
    fn test_check_range() {
        let m = small();
        assert!(m.check_range("methylation", 0.0, 1.0).is_err());
        assert!(m.check_range("expression", 0.0, 10.0).is_ok());
    }

    #[test]
    fn test_retain_genes() {
        let keep: BTreeSet<String> = ["MYC".to_string()].into_iter().collect();
        let m = small().retain_genes(&keep);
        assert_eq!(m.n_genes(), 1);
        assert_eq!(m.gene_position("MYC"), Some(0));
        assert_eq!(m.row(0), &[4.0, 5.0, 6.0]);
    }
}
