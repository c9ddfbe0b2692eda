//! Command-line parsing for the strain-sweep parameter extractor.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the extraction/statistics code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{BaselineKind, CrossoverBasis, DEFAULT_BASELINE_WINDOW, SkipFraction, StrainRange};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rheo", version, about = "Strain-sweep rheology parameter extraction")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract parameters from every sweep under the data root and aggregate per isolate.
    Extract(ExtractArgs),
    /// Compare curated best samples (from a manifest) against per-isolate averages.
    Compare(CompareArgs),
    /// Print a previously written run summary JSON.
    Show(ShowArgs),
    /// Write a synthetic dataset in the rheometer export layout.
    Simulate(SimulateArgs),
}

/// Engine and discovery options shared by `extract` and `compare`.
#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Root directory holding one sub-directory per condition (week).
    #[arg(short = 'd', long, default_value = "data")]
    pub data: PathBuf,

    /// Condition sub-directory to scan; repeat for several (default: all, sorted).
    #[arg(short = 'c', long = "condition")]
    pub conditions: Vec<String>,

    /// Leading fraction of each sweep to drop, as `a/b` or a decimal (`0` keeps the raw series).
    #[arg(long, default_value = "1/3")]
    pub skip: SkipFraction,

    /// Plateau baseline estimator.
    #[arg(long, value_enum, default_value_t = BaselineKind::Adaptive)]
    pub baseline: BaselineKind,

    /// Points averaged by the fixed window (also the adaptive fallback).
    #[arg(long, default_value_t = DEFAULT_BASELINE_WINDOW)]
    pub window: usize,

    /// First trimmed point of the fixed window.
    #[arg(long, default_value_t = 0)]
    pub window_start: usize,

    /// Lower strain bound [%] of the plateau range.
    #[arg(long, default_value_t = StrainRange::LINEAR_REGIME.low)]
    pub plateau_low: f64,

    /// Upper strain bound [%] of the plateau range.
    #[arg(long, default_value_t = StrainRange::LINEAR_REGIME.high)]
    pub plateau_high: f64,

    /// Normalised G' below this value marks the yield strain.
    #[arg(long, default_value_t = 0.95)]
    pub yield_threshold: f64,

    /// Series the crossover scan runs on.
    #[arg(long, value_enum, default_value_t = CrossoverBasis::Normalized)]
    pub crossover_basis: CrossoverBasis,

    /// Control isolate listed first in tables and exports.
    #[arg(long)]
    pub reference: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Export per-sample parameters to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export per-isolate statistics to CSV.
    #[arg(long = "export-aggregate")]
    pub export_aggregate: Option<PathBuf>,

    /// Export master curves (strain / gamma_f) to CSV.
    #[arg(long = "export-master")]
    pub export_master: Option<PathBuf>,

    /// Write the run summary (config, samples, failures, aggregates) to JSON.
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Skip the per-sample table and print aggregates only.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Manifest CSV (`isolate,condition,file`) naming one best sample per isolate.
    #[arg(long, value_name = "CSV")]
    pub best: PathBuf,

    /// Directory for `best.csv`, `averaged.csv`, `difference.csv` and `best_samples.csv`.
    #[arg(long = "out-dir")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Run summary JSON produced by `rheo extract --summary`.
    #[arg(value_name = "JSON")]
    pub summary: PathBuf,

    /// Control isolate listed first.
    #[arg(long)]
    pub reference: Option<String>,

    /// Also print the per-sample table.
    #[arg(long)]
    pub samples: bool,

    /// Re-export the stored per-sample parameters to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Output root; one sub-directory per condition is created.
    #[arg(short = 'o', long)]
    pub out: PathBuf,

    /// Isolate ids (comma separated).
    #[arg(long, value_delimiter = ',', default_values = ["3610", "2103", "2106", "2107", "2109"])]
    pub isolates: Vec<String>,

    /// Condition names (comma separated).
    #[arg(long, value_delimiter = ',', default_values = ["week3", "week4"])]
    pub conditions: Vec<String>,

    /// Replicates per isolate and condition.
    #[arg(long, default_value_t = 3)]
    pub replicates: usize,

    /// Points per sweep.
    #[arg(long, default_value_t = 40)]
    pub points: usize,

    /// Standard deviation of the multiplicative log-noise.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    /// Random seed (combined with each isolate id).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_defaults() {
        let cli = Cli::try_parse_from(["rheo", "extract"]).unwrap();
        let Command::Extract(args) = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(args.engine.skip, SkipFraction::ONE_THIRD);
        assert_eq!(args.engine.baseline, BaselineKind::Adaptive);
        assert_eq!(args.engine.window, 5);
        assert_eq!(args.engine.plateau_low, 0.01);
        assert!(args.engine.conditions.is_empty());
    }

    #[test]
    fn repeated_conditions_and_engine_flags() {
        let cli = Cli::try_parse_from([
            "rheo", "compare", "--best", "best.csv", "-c", "week3", "-c", "week4", "--skip", "0",
            "--baseline", "fixed", "--crossover-basis", "raw",
        ])
        .unwrap();
        let Command::Compare(args) = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(args.engine.conditions, vec!["week3", "week4"]);
        assert!(args.engine.skip.is_zero());
        assert_eq!(args.engine.baseline, BaselineKind::Fixed);
        assert_eq!(args.engine.crossover_basis, CrossoverBasis::Raw);
        assert_eq!(args.best, PathBuf::from("best.csv"));
    }

    #[test]
    fn bad_skip_is_rejected() {
        assert!(Cli::try_parse_from(["rheo", "extract", "--skip", "3/2"]).is_err());
    }

    #[test]
    fn show_takes_summary_and_export_path() {
        let cli = Cli::try_parse_from(["rheo", "show", "run.json", "--samples", "--export", "samples.csv"]).unwrap();
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.summary, PathBuf::from("run.json"));
        assert!(args.samples);
        assert_eq!(args.export, Some(PathBuf::from("samples.csv")));
    }

    #[test]
    fn simulate_splits_lists() {
        let cli = Cli::try_parse_from(["rheo", "simulate", "-o", "out", "--isolates", "A,B"]).unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.isolates, vec!["A", "B"]);
        assert_eq!(args.conditions, vec!["week3", "week4"]);
    }
}
