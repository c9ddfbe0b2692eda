//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initialises logging
//! - parses CLI arguments
//! - runs extraction / comparison batches
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, CompareArgs, EngineArgs, ExtractArgs, ShowArgs, SimulateArgs};
use crate::data::{SimulationConfig, write_dataset};
use crate::domain::{BaselineKind, BaselinePolicy, ExtractConfig, SkipPolicy, StrainRange};
use crate::error::AppError;
use crate::io::{
    read_manifest, read_summary_json, write_aggregates_csv, write_differences_csv, write_feature_table_csv,
    write_master_csv, write_samples_csv, write_summary_json,
};
use crate::report::{format_aggregates, format_comparison, format_failures, format_run_summary, format_samples};

pub mod pipeline;

pub use pipeline::RunConfig;

/// Entry point for the `rheo` binary.
pub fn run() -> Result<(), AppError> {
    // `RUST_LOG` may come from `.env`.
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Extract(args) => handle_extract(args),
        Command::Compare(args) => handle_compare(args),
        Command::Show(args) => handle_show(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_extract(args: ExtractArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.engine)?;
    let batch = pipeline::run_batch(&config)?;
    let summary = batch.summary(config.extract);
    let reference = config.reference.as_deref();

    println!(
        "{}",
        format_run_summary(&config.extract, batch.discovered, batch.extractions.len(), batch.failures.len())
    );
    if !args.quiet {
        println!("{}", format_samples(&summary.samples));
    }
    println!("{}", format_aggregates(&batch.aggregates, reference));
    print_failures(&format_failures(&summary.failures));

    // Optional exports.
    if let Some(path) = &args.export {
        write_samples_csv(path, &batch.parameter_sets())?;
    }
    if let Some(path) = &args.export_aggregate {
        write_aggregates_csv(path, &batch.aggregates, reference)?;
    }
    if let Some(path) = &args.export_master {
        write_master_csv(path, &batch.extractions)?;
    }
    if let Some(path) = &args.summary {
        write_summary_json(path, &summary)?;
    }

    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.engine)?;
    let manifest = read_manifest(&args.best)?;
    let out = pipeline::run_comparison(&config, &manifest)?;
    let reference = config.reference.as_deref();

    println!(
        "{}",
        format_run_summary(
            &config.extract,
            out.batch.discovered,
            out.batch.extractions.len(),
            out.batch.failures.len()
        )
    );
    println!("{}", format_comparison(&out.table, reference));

    let failures: Vec<_> = out
        .batch
        .failures
        .iter()
        .chain(&out.best_failures)
        .map(pipeline::SampleFailure::record)
        .collect();
    print_failures(&format_failures(&failures));

    if let Some(dir) = &args.out_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;
        write_feature_table_csv(&dir.join("best.csv"), &out.table.left, reference)?;
        write_feature_table_csv(&dir.join("averaged.csv"), &out.table.right, reference)?;
        write_differences_csv(&dir.join("difference.csv"), &out.table.difference, reference)?;
        let best: Vec<_> = out.best.iter().map(|x| x.params.clone()).collect();
        write_samples_csv(&dir.join("best_samples.csv"), &best)?;
    }

    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let summary = read_summary_json(&args.summary)?;
    let reference = args.reference.as_deref();

    println!("Run generated: {}", summary.generated.to_rfc3339());
    println!(
        "{}",
        format_run_summary(
            &summary.config,
            summary.samples.len() + summary.failures.len(),
            summary.samples.len(),
            summary.failures.len()
        )
    );
    if args.samples {
        println!("{}", format_samples(&summary.samples));
    }
    println!("{}", format_aggregates(&summary.aggregate_map(), reference));
    print_failures(&format_failures(&summary.failures));

    if let Some(path) = &args.export {
        write_samples_csv(path, &summary.parameter_sets())?;
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = SimulationConfig {
        isolates: args.isolates,
        conditions: args.conditions,
        replicates: args.replicates,
        points: args.points,
        noise: args.noise,
        seed: args.seed,
        ..SimulationConfig::default()
    };
    let paths = write_dataset(&args.out, &config)?;
    println!("Wrote {} sweeps under {}", paths.len(), args.out.display());
    Ok(())
}

fn print_failures(text: &str) {
    if !text.is_empty() {
        println!("{text}");
    }
}

/// Build and validate the run configuration from the shared engine flags.
pub fn run_config_from_args(args: &EngineArgs) -> Result<RunConfig, AppError> {
    let baseline = match args.baseline {
        BaselineKind::Fixed => BaselinePolicy::FixedWindow {
            start: args.window_start,
            count: args.window,
        },
        BaselineKind::Adaptive => BaselinePolicy::AdaptiveMask {
            range: StrainRange {
                low: args.plateau_low,
                high: args.plateau_high,
            },
            fallback_count: args.window,
        },
    };

    let extract = ExtractConfig {
        skip: SkipPolicy::from(args.skip),
        baseline,
        yield_threshold: args.yield_threshold,
        crossover_basis: args.crossover_basis,
    };
    extract.validate().map_err(|e| AppError::new(2, e))?;

    if args.reference.as_deref().is_some_and(str::is_empty) {
        return Err(AppError::new(2, "Reference isolate must not be empty."));
    }

    Ok(RunConfig {
        data_root: args.data.clone(),
        conditions: args.conditions.clone(),
        extract,
        reference: args.reference.clone(),
    })
}
