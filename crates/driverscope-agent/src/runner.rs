//! Hosts the blocking analysis pipeline inside the async runtime.

use anyhow::Context;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use driverscope_omics::InputFiles;
use driverscope_ranker::{AnalysisInput, AnalysisPipeline, AnalysisResult, CancellationToken};

use crate::config::Config;

/// Load the inputs, run the pipeline on a dedicated rayon pool and return
/// the complete result. Ctrl-C or the configured timeout cancels the run.
pub async fn run_analysis(config: &Config) -> anyhow::Result<AnalysisResult> {
    // Fail on a bad analysis config before touching any input file.
    let pipeline = AnalysisPipeline::new(config.analysis.clone())?;

    let files = config.input.resolve()?;
    let annotations_path = config.input.annotations.clone();
    let input = tokio::task::spawn_blocking(move || load_input(&files, annotations_path.as_deref()))
        .await
        .context("input loading task panicked")??;

    let mut pool = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = config.runtime.threads {
        pool = pool.num_threads(threads);
    }
    let pool = pool.build().context("Failed to build analysis thread pool")?;
    info!(threads = pool.current_num_threads(), "Analysis pool ready");

    let token = CancellationToken::new();
    let worker_token = token.clone();
    let mut handle = tokio::task::spawn_blocking(move || {
        pool.install(|| pipeline.run(&input, &worker_token))
    });

    let timeout = config.runtime.timeout_secs.map(Duration::from_secs);
    let outcome = tokio::select! {
        res = &mut handle => res,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, cancelling analysis");
            token.cancel();
            handle.await
        }
        _ = sleep_or_forever(timeout) => {
            warn!(timeout_secs = ?config.runtime.timeout_secs, "Analysis timed out, cancelling");
            token.cancel();
            handle.await
        }
    };
    let result = outcome.context("analysis task panicked")??;
    Ok(result)
}

async fn sleep_or_forever(timeout: Option<Duration>) {
    match timeout {
        Some(t) => tokio::time::sleep(t).await,
        None => std::future::pending().await,
    }
}

fn load_input(files: &InputFiles, annotations: Option<&Path>) -> anyhow::Result<AnalysisInput> {
    let (dataset, gene_sets) = files.load()?;
    let mut input = AnalysisInput::new(dataset);
    if let Some(sets) = gene_sets {
        input = input.with_gene_sets(sets);
    }
    if let Some(path) = annotations {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read annotations {}", path.display()))?;
        let parsed: BTreeMap<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("{} must be a JSON object keyed by gene id", path.display()))?;
        input = input.with_annotations(parsed);
    }
    Ok(input)
}

/// Serialise `result` to the configured output path.
pub async fn write_result(result: &AnalysisResult, path: &Path, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Result written");
    Ok(())
}
