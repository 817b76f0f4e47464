//! Sample subsets of an aligned dataset.
//!
//! A cohort is a list of positions into [`AlignedDataset::samples`]. The
//! full-data run uses every position once; cross-validation drops a fold;
//! bootstrap draws positions with replacement, so repeats are allowed and
//! each repeat counts as its own observation.

use crate::dataset::AlignedDataset;
use crate::samples::SampleGroup;

/// One sample's follow-up inside a cohort.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurvivalObservation {
    /// Position into the aligned sample list.
    pub position: usize,
    pub time: f64,
    pub event: bool,
}

#[derive(Debug, Clone)]
pub struct Cohort<'a> {
    data: &'a AlignedDataset,
    positions: Vec<usize>,
}

impl<'a> Cohort<'a> {
    /// Every aligned sample once, in aligned order.
    pub fn full(data: &'a AlignedDataset) -> Self {
        Self {
            data,
            positions: (0..data.n_samples()).collect(),
        }
    }

    /// Positions out of range are dropped.
    pub fn from_positions(data: &'a AlignedDataset, positions: Vec<usize>) -> Self {
        let n = data.n_samples();
        Self {
            data,
            positions: positions.into_iter().filter(|&p| p < n).collect(),
        }
    }

    pub fn dataset(&self) -> &'a AlignedDataset {
        self.data
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Cohort positions labelled with `group`, repeats preserved.
    pub fn group_positions(&self, group: SampleGroup) -> Vec<usize> {
        self.positions
            .iter()
            .copied()
            .filter(|&p| self.data.groups[p] == Some(group))
            .collect()
    }

    /// Follow-up for cohort samples with a usable clinical record.
    pub fn survival(&self) -> Vec<SurvivalObservation> {
        self.positions
            .iter()
            .filter_map(|&p| {
                let rec = self.data.clinical[p].as_ref()?;
                if !rec.survival_time.is_finite() || rec.survival_time < 0.0 {
                    return None;
                }
                Some(SurvivalObservation {
                    position: p,
                    time: rec.survival_time,
                    event: rec.survival_status,
                })
            })
            .collect()
    }

    /// How often each aligned sample occurs in this cohort.
    pub fn multiplicity(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.data.n_samples()];
        for &p in &self.positions {
            counts[p] += 1;
        }
        counts
    }

    /// `(x, y)` pairs over cohort positions where both rows are finite.
    pub fn paired_values(&self, x: &[f64], y: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let mut xs = Vec::with_capacity(self.positions.len());
        let mut ys = Vec::with_capacity(self.positions.len());
        for &p in &self.positions {
            let (a, b) = (x[p], y[p]);
            if a.is_finite() && b.is_finite() {
                xs.push(a);
                ys.push(b);
            }
        }
        (xs, ys)
    }

    /// Finite values of `row` at the given positions.
    pub fn values_at(row: &[f64], positions: &[usize]) -> Vec<f64> {
        positions
            .iter()
            .map(|&p| row[p])
            .filter(|v| v.is_finite())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::NumericMatrix;
    use crate::samples::{ClinicalRecord, SampleGroups};
    use crate::OmicsDataset;

    fn dataset() -> AlignedDataset {
        let samples: Vec<String> = ["T1", "T2", "N1", "N2"].iter().map(|s| s.to_string()).collect();
        let expr = NumericMatrix::from_rows(
            samples.clone(),
            vec![("EGFR".into(), vec![5.0, 6.0, 1.0, f64::NAN])],
        )
        .unwrap();
        let groups: SampleGroups = [
            ("T1".to_string(), SampleGroup::Tumor),
            ("T2".to_string(), SampleGroup::Tumor),
            ("N1".to_string(), SampleGroup::Normal),
            ("N2".to_string(), SampleGroup::Normal),
        ]
        .into_iter()
        .collect();
        let clinical = samples
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), ClinicalRecord::new(10.0 * (i + 1) as f64, i % 2 == 0)))
            .collect();
        OmicsDataset::new(expr)
            .with_sample_groups(groups)
            .with_clinical(clinical)
            .align()
            .unwrap()
    }

    #[test]
    fn test_bootstrap_repeats_are_kept() {
        let ds = dataset();
        let cohort = Cohort::from_positions(&ds, vec![0, 0, 2, 9]);
        assert_eq!(cohort.len(), 3);
        assert_eq!(cohort.group_positions(SampleGroup::Tumor), vec![0, 0]);
        assert_eq!(cohort.multiplicity(), vec![2, 0, 1, 0]);
        assert_eq!(cohort.survival().len(), 3);
    }

    #[test]
    fn test_values_skip_missing() {
        let ds = dataset();
        let cohort = Cohort::full(&ds);
        let row = ds.expression.row(0);
        let normal = Cohort::values_at(row, &cohort.group_positions(SampleGroup::Normal));
        assert_eq!(normal, vec![1.0]);
        let (x, y) = cohort.paired_values(row, row);
        assert_eq!(x.len(), 3);
        assert_eq!(x, y);
    }
}
