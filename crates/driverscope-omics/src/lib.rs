//! driverscope-omics: Input tables, loaders, sample alignment and cohort views.

pub mod matrix;
pub mod samples;
pub mod mutation;
pub mod gene_sets;
pub mod dataset;
pub mod cohort;
pub mod candidates;
pub mod loader;

pub use candidates::select_candidate_genes;
pub use cohort::{Cohort, SurvivalObservation};
pub use dataset::{AlignedDataset, OmicsDataset};
pub use gene_sets::GeneSetCollection;
pub use loader::InputFiles;
pub use matrix::NumericMatrix;
pub use mutation::{MutationCall, MutationIndex, MutationTable};
pub use samples::{ClinicalRecord, ClinicalTable, SampleGroup, SampleGroups};
