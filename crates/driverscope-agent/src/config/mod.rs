//! Configuration loading for driverscope.
//! Reads driverscope.toml from the current directory or the path in DRIVERSCOPE_CONFIG.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use driverscope_common::AnalysisConfig;
use driverscope_omics::InputFiles;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory searched for tables by conventional name.
    pub data_dir: Option<PathBuf>,
    /// Explicit table paths; take precedence over `data_dir`.
    pub files: Option<InputFiles>,
    /// JSON object of gene id → annotation, copied into each causal gene.
    pub annotations: Option<PathBuf>,
}

impl InputConfig {
    pub fn resolve(&self) -> anyhow::Result<InputFiles> {
        if let Some(files) = &self.files {
            return Ok(files.clone());
        }
        match &self.data_dir {
            Some(dir) => InputFiles::discover(dir),
            None => anyhow::bail!("no input configured: set [input].data_dir or pass --data-dir"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "bool_true")]
    pub pretty: bool,
}

fn default_output_path() -> PathBuf { PathBuf::from("driverscope_result.json") }
fn bool_true()           -> bool    { true }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            pretty: bool_true(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Worker threads for the analysis pool; rayon's default when unset.
    pub threads: Option<usize>,
    /// Cancel the run after this many seconds.
    pub timeout_secs: Option<u64>,
}

mod tests;

impl Config {
    /// Load configuration from `path`, then apply DRIVERSCOPE_* overrides
    /// and validate the analysis section.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy driverscope.example.toml to driverscope.toml and edit it.",
                path.display()
            );
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        config.analysis.apply_env_overrides()?;
        config.analysis.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
