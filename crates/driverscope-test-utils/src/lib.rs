//! driverscope-test-utils: Deterministic synthetic multi-omics cohorts.
//!
//! Background genes carry noise only. Planted drivers are over-expressed in
//! tumours and can additionally be copy-number driven, methylation silenced,
//! tied to poor survival and recurrently mutated. Everything is drawn from a
//! seeded `StdRng`, so the same builder always yields the same tables.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

use driverscope_omics::{
    ClinicalRecord, ClinicalTable, GeneSetCollection, MutationCall, MutationTable, NumericMatrix,
    OmicsDataset,
};

/// Which signals a planted driver carries.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantedDriver {
    pub gene_id: String,
    /// Tumour-minus-normal shift on the log2 expression scale.
    pub expression_shift: f64,
    pub cnv_driven: bool,
    pub methylation_silenced: bool,
    pub survival_linked: bool,
    /// Fraction of tumours carrying a missense call.
    pub mutation_rate: f64,
}

impl PlantedDriver {
    /// Every signal switched on.
    pub fn strong(gene_id: &str) -> Self {
        Self {
            gene_id: gene_id.to_string(),
            expression_shift: 3.0,
            cnv_driven: true,
            methylation_silenced: true,
            survival_linked: true,
            mutation_rate: 0.4,
        }
    }

    /// Over-expressed only.
    pub fn expression_only(gene_id: &str) -> Self {
        Self {
            gene_id: gene_id.to_string(),
            expression_shift: 3.0,
            cnv_driven: false,
            methylation_silenced: false,
            survival_linked: false,
            mutation_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticCohort {
    pub seed: u64,
    pub n_tumor: usize,
    pub n_normal: usize,
    pub n_background: usize,
    pub drivers: Vec<PlantedDriver>,
}

impl Default for SyntheticCohort {
    fn default() -> Self {
        Self {
            seed: 42,
            n_tumor: 30,
            n_normal: 10,
            n_background: 40,
            drivers: vec![
                PlantedDriver::strong("KRAS"),
                PlantedDriver::strong("EGFR"),
                PlantedDriver {
                    methylation_silenced: false,
                    mutation_rate: 0.0,
                    ..PlantedDriver::strong("MYC")
                },
            ],
        }
    }
}

const BASE_EXPRESSION: f64 = 6.0;

impl SyntheticCohort {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    pub fn with_samples(mut self, n_tumor: usize, n_normal: usize) -> Self {
        self.n_tumor = n_tumor;
        self.n_normal = n_normal;
        self
    }

    pub fn with_background_genes(mut self, n: usize) -> Self {
        self.n_background = n;
        self
    }

    pub fn with_drivers(mut self, drivers: Vec<PlantedDriver>) -> Self {
        self.drivers = drivers;
        self
    }

    /// TCGA-style barcodes: tumours `-01A`, normals `-11A`.
    pub fn sample_ids(&self) -> Vec<String> {
        (0..self.n_tumor)
            .map(|i| format!("TCGA-SY-{:04}-01A", i + 1))
            .chain((0..self.n_normal).map(|i| format!("TCGA-SY-{:04}-11A", i + 1)))
            .collect()
    }

    pub fn driver_ids(&self) -> Vec<String> {
        self.drivers.iter().map(|d| d.gene_id.clone()).collect()
    }

    pub fn background_ids(&self) -> Vec<String> {
        (0..self.n_background).map(|i| format!("BG{:03}", i + 1)).collect()
    }

    /// One pathway holding every driver plus two background genes, and two
    /// background-only pathways.
    pub fn gene_sets(&self) -> GeneSetCollection {
        let bg = self.background_ids();
        let mut sets = GeneSetCollection::new();
        sets.insert(
            "PLANTED_DRIVERS",
            self.driver_ids().into_iter().chain(bg.iter().take(2).cloned()),
        );
        sets.insert("BACKGROUND_A", bg.iter().skip(2).take(10).cloned());
        sets.insert("BACKGROUND_B", bg.iter().skip(12).take(10).cloned());
        sets
    }

    pub fn build(&self) -> OmicsDataset {
        let tables = self.tables();
        OmicsDataset::new(tables.expression)
            .with_clinical(tables.clinical)
            .with_cnv(tables.cnv)
            .with_methylation(tables.methylation)
            .with_mutations(tables.mutations)
    }

    /// Write the cohort as conventional CSV files, readable by
    /// `OmicsDataset::load_from_dir`.
    pub fn write_to_dir(&self, dir: &Path) -> Result<(), csv::Error> {
        let tables = self.tables();
        write_matrix(&dir.join("expression.csv"), &tables.expression)?;
        write_matrix(&dir.join("cnv.csv"), &tables.cnv)?;
        write_matrix(&dir.join("methylation.csv"), &tables.methylation)?;

        let mut w = csv::Writer::from_path(dir.join("clinical.csv"))?;
        w.write_record(["sample_id", "survival_time", "survival_status"])?;
        for sample in tables.expression.samples() {
            if let Some(rec) = tables.clinical.get(sample) {
                let status = if rec.survival_status { "1" } else { "0" };
                let time = rec.survival_time.to_string();
                w.write_record([sample.as_str(), time.as_str(), status])?;
            }
        }
        w.flush()?;

        let mut w = csv::Writer::from_path(dir.join("mutations.csv"))?;
        w.write_record(["gene_id", "sample_id", "mutation_type"])?;
        for call in &tables.mutations.calls {
            w.write_record([&call.gene_id, &call.sample_id, &call.mutation_type])?;
        }
        w.flush()?;

        let mut w = csv::Writer::from_path(dir.join("gene_sets.csv"))?;
        w.write_record(["pathway_id", "gene_id"])?;
        for (pathway, genes) in self.gene_sets().iter() {
            for g in genes {
                w.write_record([pathway, g.as_str()])?;
            }
        }
        w.flush()?;
        Ok(())
    }

    fn tables(&self) -> Tables {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let samples = self.sample_ids();
        let n = samples.len();
        let is_tumor = |j: usize| j < self.n_tumor;

        let mut expression = Vec::new();
        let mut cnv = Vec::new();
        let mut methylation = Vec::new();
        let mut calls = Vec::new();
        // Per-sample log hazard accumulated over survival-linked drivers.
        let mut log_hazard = vec![0.0; n];

        for driver in &self.drivers {
            let copy: Vec<f64> = (0..n)
                .map(|j| {
                    let sd = if is_tumor(j) && driver.cnv_driven { 0.6 } else { 0.1 };
                    gaussian(&mut rng) * sd
                })
                .collect();
            let expr: Vec<f64> = (0..n)
                .map(|j| {
                    let shift = if is_tumor(j) { driver.expression_shift } else { 0.0 };
                    let dosage = if driver.cnv_driven { 1.2 * copy[j] } else { 0.0 };
                    BASE_EXPRESSION + shift + dosage + 0.4 * gaussian(&mut rng)
                })
                .collect();
            let beta: Vec<f64> = expr
                .iter()
                .map(|e| {
                    let v = if driver.methylation_silenced {
                        0.6 - 0.1 * (e - BASE_EXPRESSION) + 0.03 * gaussian(&mut rng)
                    } else {
                        rng.gen_range(0.3..0.7)
                    };
                    v.clamp(0.01, 0.99)
                })
                .collect();
            if driver.survival_linked {
                for (h, e) in log_hazard.iter_mut().zip(&expr) {
                    *h += 0.8 * (e - BASE_EXPRESSION);
                }
            }
            for sample in samples.iter().take(self.n_tumor) {
                if rng.gen::<f64>() < driver.mutation_rate {
                    calls.push(MutationCall::new(driver.gene_id.as_str(), sample.as_str(), "Missense_Mutation"));
                }
            }
            expression.push((driver.gene_id.clone(), expr));
            cnv.push((driver.gene_id.clone(), copy));
            methylation.push((driver.gene_id.clone(), beta));
        }

        for gene in self.background_ids() {
            let base = rng.gen_range(3.0..9.0);
            expression.push((gene.clone(), (0..n).map(|_| base + 0.5 * gaussian(&mut rng)).collect()));
            cnv.push((gene.clone(), (0..n).map(|_| 0.15 * gaussian(&mut rng)).collect()));
            methylation.push((gene.clone(), (0..n).map(|_| rng.gen_range(0.3..0.7)).collect()));
            for sample in samples.iter().take(self.n_tumor) {
                if rng.gen::<f64>() < 0.01 {
                    let kind = if rng.gen::<bool>() { "Silent" } else { "Missense_Mutation" };
                    calls.push(MutationCall::new(gene.as_str(), sample.as_str(), kind));
                }
            }
        }

        let clinical: ClinicalTable = samples
            .iter()
            .zip(&log_hazard)
            .map(|(s, h)| {
                let u: f64 = rng.gen_range(f64::EPSILON..1.0);
                let time = 2000.0 * (-h).exp() * -u.ln();
                let event = rng.gen::<f64>() < 0.85;
                (s.clone(), ClinicalRecord::new(time, event))
            })
            .collect();

        Tables {
            expression: matrix(&samples, expression),
            cnv: matrix(&samples, cnv),
            methylation: matrix(&samples, methylation),
            clinical,
            mutations: MutationTable::new(calls),
        }
    }
}

struct Tables {
    expression: NumericMatrix,
    cnv: NumericMatrix,
    methylation: NumericMatrix,
    clinical: ClinicalTable,
    mutations: MutationTable,
}

fn matrix(samples: &[String], rows: Vec<(String, Vec<f64>)>) -> NumericMatrix {
    NumericMatrix::from_rows(samples.to_vec(), rows).expect("synthetic rows match the sample count")
}

fn write_matrix(path: &Path, m: &NumericMatrix) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_path(path)?;
    let header: Vec<&str> = std::iter::once("gene_id")
        .chain(m.samples().iter().map(String::as_str))
        .collect();
    w.write_record(&header)?;
    for (i, gene) in m.genes().iter().enumerate() {
        let row: Vec<String> = std::iter::once(gene.clone())
            .chain(m.row(i).iter().map(|v| v.to_string()))
            .collect();
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// Standard normal draw (Box–Muller).
pub fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
