//! Read/write run summary JSON files.
//!
//! The run summary is the "portable" record of one batch:
//! - the extraction config it ran with
//! - one row per extracted sample (values, baseline source, flags)
//! - one row per failed sample
//! - per-isolate aggregates
//!
//! Undefined values are written as `null`. `rheo show` reloads the file
//! without touching the original tables.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

use crate::domain::{ExtractConfig, FeatureValues, Features, IsolateAggregate, ParameterSet, SampleId};
use crate::error::AppError;
use crate::extract::{BaselineSource, ExtractFlag, Extraction};

pub const TOOL_NAME: &str = "rheo";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    #[serde(flatten)]
    pub id: SampleId,
    pub values: Features<Option<f64>>,
    pub baseline_source: BaselineSource,
    pub skipped: usize,
    pub points: usize,
    pub flags: Vec<ExtractFlag>,
}

impl From<&Extraction> for SampleRecord {
    fn from(x: &Extraction) -> Self {
        Self {
            id: x.params.id.clone(),
            values: x.params.values.defined(),
            baseline_source: x.baseline.source,
            skipped: x.skipped,
            points: x.points,
            flags: x.flags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub path: PathBuf,
    #[serde(flatten)]
    pub id: SampleId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub tool: String,
    pub generated: DateTime<FixedOffset>,
    pub config: ExtractConfig,
    pub samples: Vec<SampleRecord>,
    pub failures: Vec<FailureRecord>,
    pub aggregates: Vec<IsolateAggregate>,
}

impl RunSummary {
    pub fn new(
        config: ExtractConfig,
        extractions: &[Extraction],
        failures: Vec<FailureRecord>,
        aggregates: &BTreeMap<String, IsolateAggregate>,
    ) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            generated: DateTime::<FixedOffset>::from(Local::now()),
            config,
            samples: extractions.iter().map(SampleRecord::from).collect(),
            failures,
            aggregates: aggregates.values().cloned().collect(),
        }
    }

    pub fn parameter_sets(&self) -> Vec<ParameterSet> {
        self.samples
            .iter()
            .map(|s| ParameterSet {
                id: s.id.clone(),
                values: FeatureValues::from(s.values),
            })
            .collect()
    }

    pub fn aggregate_map(&self) -> BTreeMap<String, IsolateAggregate> {
        self.aggregates
            .iter()
            .map(|a| (a.isolate.clone(), a.clone()))
            .collect()
    }
}

/// Write a run summary JSON file.
pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    log::info!("Wrote run summary to {}", path.display());
    Ok(())
}

/// Read a run summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<RunSummary, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    let summary: RunSummary =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))?;
    if summary.tool != TOOL_NAME {
        log::warn!("Summary was written by '{}', not '{TOOL_NAME}'", summary.tool);
    }
    Ok(summary)
}
