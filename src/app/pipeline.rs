//! Shared batch logic used by the `extract` and `compare` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! discovery -> load + extract (parallel, per sample) -> aggregate -> compare
//!
//! The command handlers can then focus on presentation (printing vs exports).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::domain::{ExtractConfig, IsolateAggregate, ParameterSet};
use crate::error::{AppError, ExtractError};
use crate::extract::{Extraction, extract_parameters};
use crate::io::ingest::{SampleSource, discover_sources, load_sample};
use crate::io::manifest::ManifestEntry;
use crate::io::summary::{FailureRecord, RunSummary};
use crate::stats::{ComparisonTable, aggregate, aggregate_means, by_isolate, comparison_table};

/// Where to look and how to extract.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub data_root: PathBuf,
    /// Empty means every condition directory under `data_root`.
    pub conditions: Vec<String>,
    pub extract: ExtractConfig,
    /// Control isolate listed first in reports.
    pub reference: Option<String>,
}

/// A sample that produced no parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFailure {
    pub source: SampleSource,
    pub error: ExtractError,
}

impl SampleFailure {
    pub fn record(&self) -> FailureRecord {
        FailureRecord {
            path: self.source.path.clone(),
            id: self.source.id.clone(),
            error: self.error.to_string(),
        }
    }
}

/// All computed outputs of a single batch run.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub discovered: usize,
    /// In discovery order.
    pub extractions: Vec<Extraction>,
    pub failures: Vec<SampleFailure>,
    pub aggregates: BTreeMap<String, IsolateAggregate>,
}

impl BatchOutput {
    pub fn parameter_sets(&self) -> Vec<ParameterSet> {
        self.extractions.iter().map(|x| x.params.clone()).collect()
    }

    pub fn summary(&self, config: ExtractConfig) -> RunSummary {
        RunSummary::new(
            config,
            &self.extractions,
            self.failures.iter().map(SampleFailure::record).collect(),
            &self.aggregates,
        )
    }
}

/// Outputs of `compare`: the full batch plus the best-vs-averaged table.
#[derive(Debug, Clone)]
pub struct ComparisonOutput {
    pub batch: BatchOutput,
    pub best: Vec<Extraction>,
    pub best_failures: Vec<SampleFailure>,
    pub table: ComparisonTable,
}

/// Load and extract every source in parallel.
///
/// Results keep the order of `sources`. A failing sample never affects its
/// siblings. When `cancel` is set, samples that have not started yet are
/// reported as [`ExtractError::Cancelled`].
pub fn extract_sources(
    sources: &[SampleSource],
    config: &ExtractConfig,
    cancel: Option<&AtomicBool>,
) -> (Vec<Extraction>, Vec<SampleFailure>) {
    let outcomes: Vec<Result<Extraction, SampleFailure>> = sources
        .par_iter()
        .map(|source| {
            let fail = |error| SampleFailure {
                source: source.clone(),
                error,
            };
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return Err(fail(ExtractError::Cancelled));
            }
            let sample = load_sample(source).map_err(fail)?;
            extract_parameters(&sample, config).map_err(fail)
        })
        .collect();

    let mut extractions = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(x) => extractions.push(x),
            Err(f) => {
                log::warn!("{}: {}", f.source.path.display(), f.error);
                failures.push(f);
            }
        }
    }
    (extractions, failures)
}

/// Discover, extract and aggregate everything under the configured data root.
pub fn run_batch(config: &RunConfig) -> Result<BatchOutput, AppError> {
    run_batch_with_cancel(config, None)
}

pub fn run_batch_with_cancel(config: &RunConfig, cancel: Option<&AtomicBool>) -> Result<BatchOutput, AppError> {
    let sources = discover_sources(&config.data_root, &config.conditions)?;
    if sources.is_empty() {
        return Err(AppError::new(
            3,
            format!("No CSV files found under '{}'.", config.data_root.display()),
        ));
    }

    let (extractions, failures) = extract_sources(&sources, &config.extract, cancel);
    if extractions.is_empty() {
        return Err(AppError::new(
            3,
            format!("No sample could be extracted ({} failed).", failures.len()),
        ));
    }

    let sets: Vec<ParameterSet> = extractions.iter().map(|x| x.params.clone()).collect();
    let aggregates = aggregate(&sets);
    log::info!(
        "Extracted {} of {} samples ({} isolates, {} failed)",
        extractions.len(),
        sources.len(),
        aggregates.len(),
        failures.len()
    );

    Ok(BatchOutput {
        discovered: sources.len(),
        extractions,
        failures,
        aggregates,
    })
}

/// Batch run plus the manifest's best samples compared against per-isolate means.
pub fn run_comparison(config: &RunConfig, manifest: &[ManifestEntry]) -> Result<ComparisonOutput, AppError> {
    let batch = run_batch(config)?;

    let best_sources: Vec<SampleSource> = manifest.iter().map(|e| e.source(&config.data_root)).collect();
    let (best, best_failures) = extract_sources(&best_sources, &config.extract, None);
    let best_sets: Vec<ParameterSet> = best.iter().map(|x| x.params.clone()).collect();

    let table = comparison_table(&by_isolate(&best_sets), &aggregate_means(&batch.aggregates));
    if table.difference.is_empty() {
        log::warn!("No isolate is present in both the manifest and the batch");
    }
    log::info!(
        "Compared {} isolates ({} best samples failed)",
        table.difference.len(),
        best_failures.len()
    );

    Ok(ComparisonOutput {
        batch,
        best,
        best_failures,
        table,
    })
}
