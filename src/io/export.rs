//! Export results to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream
//! scripts. Undefined values are written as empty cells.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{ComparisonRow, Feature, FeatureValues, IsolateAggregate, ParameterSet, Sample};
use crate::error::AppError;
use crate::extract::Extraction;
use crate::stats::isolate_order;

/// Shortest round-trip representation, or an empty cell when undefined.
pub fn format_cell(value: f64) -> String {
    if value.is_finite() { format!("{value}") } else { String::new() }
}

fn write_err(what: &str) -> impl Fn(csv::Error) -> AppError + '_ {
    move |e| AppError::new(2, format!("Failed to write {what} CSV: {e}"))
}

fn value_cells(values: &FeatureValues) -> impl Iterator<Item = String> + '_ {
    Feature::ALL.into_iter().map(move |f| format_cell(*values.get(f)))
}

/// One row per sample: `Isolate,G0_prime,...,WSO,Week`.
pub fn write_parameter_sets<W: Write>(writer: W, sets: &[ParameterSet]) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    let mut header = vec!["Isolate"];
    header.extend(Feature::ALL.iter().map(|f| f.column()));
    header.push("Week");
    w.write_record(&header)?;

    for set in sets {
        let mut row = vec![set.id.isolate.clone()];
        row.extend(value_cells(&set.values));
        row.push(set.id.condition.clone());
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// `Isolate` then `<field>_mean,_std,_count,_sem` per feature.
pub fn write_aggregates<W: Write>(
    writer: W,
    aggregates: &BTreeMap<String, IsolateAggregate>,
    reference: Option<&str>,
) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    let mut header = vec!["Isolate".to_string()];
    for f in Feature::ALL {
        for suffix in ["mean", "std", "count", "sem"] {
            header.push(format!("{}_{suffix}", f.column()));
        }
    }
    w.write_record(&header)?;

    for isolate in isolate_order(aggregates.keys().map(String::as_str), reference) {
        let agg = &aggregates[isolate];
        let mut row = vec![isolate.to_string()];
        for f in Feature::ALL {
            let s = agg.fields.get(f);
            row.push(format_cell(s.mean));
            row.push(format_cell(s.std));
            row.push(s.count.to_string());
            row.push(format_cell(s.sem));
        }
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

/// `Isolate,G0_prime,...,WSO`, one row per isolate.
pub fn write_feature_table<W: Write>(
    writer: W,
    table: &BTreeMap<String, FeatureValues>,
    reference: Option<&str>,
) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    let mut header = vec!["Isolate"];
    header.extend(Feature::ALL.iter().map(|f| f.column()));
    w.write_record(&header)?;

    for isolate in isolate_order(table.keys().map(String::as_str), reference) {
        let mut row = vec![isolate.to_string()];
        row.extend(value_cells(&table[isolate]));
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_differences<W: Write>(
    writer: W,
    rows: &[ComparisonRow],
    reference: Option<&str>,
) -> Result<(), csv::Error> {
    let table: BTreeMap<String, FeatureValues> =
        rows.iter().map(|r| (r.isolate.clone(), r.difference)).collect();
    write_feature_table(writer, &table, reference)
}

/// Long format: one row per point of every available master curve.
pub fn write_master_curves<W: Write>(writer: W, extractions: &[Extraction]) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(["Isolate", "Week", "Replicate", "strain_ratio", "storage_ratio", "loss_ratio"])?;

    for x in extractions {
        let Some(curve) = &x.master else { continue };
        let id = &x.params.id;
        for i in 0..curve.strain_ratio.len() {
            w.write_record([
                id.isolate.clone(),
                id.condition.clone(),
                id.replicate.clone(),
                format_cell(curve.strain_ratio[i]),
                format_cell(curve.storage_ratio[i]),
                format_cell(curve.loss_ratio[i]),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

/// The rheometer export layout the loader reads (G', G'', strain in columns 2-4).
pub fn write_sample_table<W: Write>(writer: W, sample: &Sample) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record([
        "Point No.",
        "Time [s]",
        "Storage Modulus [Pa]",
        "Loss Modulus [Pa]",
        "Shear Strain [%]",
    ])?;
    for i in 0..sample.len() {
        w.write_record([
            (i + 1).to_string(),
            (10 * (i + 1)).to_string(),
            format!("{}", sample.storage()[i]),
            format!("{}", sample.loss()[i]),
            format!("{}", sample.strain()[i]),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_samples_csv(path: &Path, sets: &[ParameterSet]) -> Result<(), AppError> {
    let file = create_file(path, "sample")?;
    write_parameter_sets(file, sets).map_err(write_err("sample"))?;
    log::info!("Wrote {} sample rows to {}", sets.len(), path.display());
    Ok(())
}

pub fn write_aggregates_csv(
    path: &Path,
    aggregates: &BTreeMap<String, IsolateAggregate>,
    reference: Option<&str>,
) -> Result<(), AppError> {
    let file = create_file(path, "aggregate")?;
    write_aggregates(file, aggregates, reference).map_err(write_err("aggregate"))?;
    log::info!("Wrote {} isolate rows to {}", aggregates.len(), path.display());
    Ok(())
}

pub fn write_feature_table_csv(
    path: &Path,
    table: &BTreeMap<String, FeatureValues>,
    reference: Option<&str>,
) -> Result<(), AppError> {
    let file = create_file(path, "comparison")?;
    write_feature_table(file, table, reference).map_err(write_err("comparison"))?;
    log::info!("Wrote {} isolate rows to {}", table.len(), path.display());
    Ok(())
}

pub fn write_differences_csv(path: &Path, rows: &[ComparisonRow], reference: Option<&str>) -> Result<(), AppError> {
    let file = create_file(path, "difference")?;
    write_differences(file, rows, reference).map_err(write_err("difference"))?;
    log::info!("Wrote {} difference rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_master_csv(path: &Path, extractions: &[Extraction]) -> Result<(), AppError> {
    let file = create_file(path, "master-curve")?;
    write_master_curves(file, extractions).map_err(write_err("master-curve"))?;
    let curves = extractions.iter().filter(|x| x.master.is_some()).count();
    log::info!("Wrote {curves} master curves to {}", path.display());
    Ok(())
}

pub fn write_sample_table_csv(path: &Path, sample: &Sample) -> Result<(), AppError> {
    let file = create_file(path, "sample table")?;
    write_sample_table(file, sample).map_err(write_err("sample table"))
}

fn create_file(path: &Path, what: &str) -> Result<File, AppError> {
    File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create {what} CSV '{}': {e}", path.display())))
}
