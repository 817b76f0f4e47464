//! driverscope: Cancer driver gene evidence integration.
//! Entry point for the analysis binary.

mod config;
mod runner;

use clap::Parser;
use driverscope_common::AnalysisConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "driverscope", version, about = "Rank cancer driver genes from multi-omics evidence")]
struct Cli {
    /// Path to driverscope.toml
    #[arg(long, env = "DRIVERSCOPE_CONFIG", default_value = "driverscope.toml")]
    config: PathBuf,

    /// Data directory; overrides [input].data_dir
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Output JSON path; overrides [output].path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Analysis settings file (TOML, YAML or JSON); replaces [analysis]
    #[arg(long)]
    analysis: Option<PathBuf>,

    /// Write the effective analysis configuration as YAML and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("driverscope=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    info!("driverscope {}", env!("CARGO_PKG_VERSION"));

    let mut config = config::Config::load(&cli.config)?;
    if let Some(path) = &cli.analysis {
        config.analysis = AnalysisConfig::from_path(path)?;
        config.analysis.apply_env_overrides()?;
        config.analysis.validate()?;
    }
    if let Some(dir) = cli.data_dir {
        config.input.data_dir = Some(dir);
        config.input.files = None;
    }
    if let Some(out) = cli.output {
        config.output.path = out;
    }
    if let Some(path) = &cli.dump_config {
        config.analysis.to_yaml(path)?;
        info!(path = %path.display(), "Analysis configuration written");
        return Ok(());
    }

    info!(
        causal_score_threshold = config.analysis.causal_score_threshold,
        bootstrap_iterations = config.analysis.validation.bootstrap_iterations,
        "Configuration loaded"
    );

    let result = runner::run_analysis(&config).await?;
    for (rank, gene) in result.causal_genes.iter().take(10).enumerate() {
        info!(
            rank = rank + 1,
            gene = %gene.gene_id,
            score = gene.causal_score,
            confidence = %gene.confidence_level,
            evidence = gene.evidence_type_count(),
            "Causal gene"
        );
    }
    for w in &result.warnings {
        tracing::warn!("{w}");
    }
    runner::write_result(&result, &config.output.path, config.output.pretty).await?;
    Ok(())
}
