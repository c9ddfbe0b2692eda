//! Measurement-table discovery and loading.
//!
//! This module is responsible for turning rheometer exports into `Sample`s:
//!
//! - **Discovery**: `<root>/<condition>/*.csv`, one directory per session/week
//! - **Identity**: isolate id is the file name up to the first `_`
//! - **Positional schema**: G' / G'' / strain live in columns 2 / 3 / 4; the
//!   header row is skipped and no unit conversion is done
//!
//! Loading failures are per-sample (`ExtractError`); only discovery problems
//! are run-level (`AppError`).

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{Sample, SampleId};
use crate::error::{AppError, ExtractError};

pub const STORAGE_COLUMN: usize = 2;
pub const LOSS_COLUMN: usize = 3;
pub const STRAIN_COLUMN: usize = 4;

/// A measurement table found on disk, not yet loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSource {
    pub path: PathBuf,
    pub id: SampleId,
}

impl SampleSource {
    /// Identity derived from `<condition>/<isolate>_<rest>.csv`.
    pub fn from_path(path: &Path, condition: &str) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        Some(Self {
            path: path.to_path_buf(),
            id: SampleId::new(isolate_from_stem(stem), condition, stem),
        })
    }
}

/// `2103` for `2103_30C_1`; the whole stem when there is no `_`.
pub fn isolate_from_stem(stem: &str) -> &str {
    stem.split_once('_').map_or(stem, |(isolate, _)| isolate)
}

/// Find every table under the given condition directories.
///
/// An empty `conditions` list means every sub-directory of `root`, sorted by
/// name. Files within a condition are sorted by name so runs are deterministic.
pub fn discover_sources(root: &Path, conditions: &[String]) -> Result<Vec<SampleSource>, AppError> {
    if !root.is_dir() {
        return Err(AppError::new(
            2,
            format!("Data directory '{}' does not exist.", root.display()),
        ));
    }

    let conditions = if conditions.is_empty() {
        list_condition_dirs(root)?
    } else {
        conditions.to_vec()
    };

    let mut sources = Vec::new();
    for condition in &conditions {
        let dir = root.join(condition);
        if !dir.is_dir() {
            log::warn!("Skipping {condition}: '{}' is not a directory.", dir.display());
            continue;
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_csv_extension(p))
            .collect();
        files.sort();

        if files.is_empty() {
            log::warn!("Skipping {condition}: no CSV files found.");
            continue;
        }

        sources.extend(files.iter().filter_map(|p| SampleSource::from_path(p, condition)));
    }

    Ok(sources)
}

fn list_condition_dirs(root: &Path) -> Result<Vec<String>, AppError> {
    let mut dirs: Vec<String> = fs::read_dir(root)
        .map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", root.display())))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Load one table from disk.
pub fn load_sample(source: &SampleSource) -> Result<Sample, ExtractError> {
    let file = File::open(&source.path).map_err(|e| ExtractError::Io {
        path: source.path.clone(),
        message: e.to_string(),
    })?;
    read_sample(file, source.id.clone())
}

/// Parse a table from any reader. Any malformed row rejects the whole sample.
pub fn read_sample<R: Read>(reader: R, id: SampleId) -> Result<Sample, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut strain = Vec::new();
    let mut storage = Vec::new();
    let mut loss = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| ExtractError::Parse {
            line,
            message: format!("CSV parse error: {e}"),
        })?;

        storage.push(parse_column(&record, STORAGE_COLUMN, "G'", line)?);
        loss.push(parse_column(&record, LOSS_COLUMN, "G''", line)?);
        strain.push(parse_column(&record, STRAIN_COLUMN, "strain", line)?);
    }

    Sample::new(id, strain, storage, loss)
}

fn parse_column(record: &StringRecord, idx: usize, name: &str, line: usize) -> Result<f64, ExtractError> {
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ExtractError::Parse {
            line,
            message: format!("Missing {name} value (column {idx})."),
        })?;
    let value = raw.parse::<f64>().map_err(|e| ExtractError::Parse {
        line,
        message: format!("Invalid {name} value '{raw}': {e}"),
    })?;
    if !value.is_finite() {
        return Err(ExtractError::Parse {
            line,
            message: format!("Non-finite {name} value '{raw}'."),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Point,Time [s],Storage Modulus [Pa],Loss Modulus [Pa],Shear Strain [%]
1,10,120.5,12.0,0.01
2,20,118.0,13.5,0.1
3,30,60.0,40.0,1.0
";

    fn id() -> SampleId {
        SampleId::new("2103", "week4", "2103_30C_1")
    }

    #[test]
    fn reads_positional_columns_and_skips_header() {
        let s = read_sample(TABLE.as_bytes(), id()).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.strain(), &[0.01, 0.1, 1.0]);
        assert_eq!(s.storage(), &[120.5, 118.0, 60.0]);
        assert_eq!(s.loss(), &[12.0, 13.5, 40.0]);
        assert_eq!(s.id(), &id());
    }

    #[test]
    fn non_numeric_cell_is_a_parse_error_with_line() {
        let table = "a,b,c,d,e\n1,1,100,10,0.01\n2,2,oops,10,0.1\n";
        let err = read_sample(table.as_bytes(), id()).unwrap_err();
        match err {
            ExtractError::Parse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("oops"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_row_is_a_parse_error() {
        let table = "a,b,c,d,e\n1,1,100,10\n";
        let err = read_sample(table.as_bytes(), id()).unwrap_err();
        assert!(matches!(err, ExtractError::Parse { line: 2, .. }));
    }

    #[test]
    fn nan_cell_is_rejected() {
        let table = "a,b,c,d,e\n1,1,NaN,10,0.01\n";
        assert!(matches!(
            read_sample(table.as_bytes(), id()),
            Err(ExtractError::Parse { .. })
        ));
    }

    #[test]
    fn header_only_table_is_an_empty_sample() {
        let s = read_sample("a,b,c,d,e\n".as_bytes(), id()).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn isolate_is_prefix_before_first_underscore() {
        assert_eq!(isolate_from_stem("2103_30C_1"), "2103");
        assert_eq!(isolate_from_stem("3610"), "3610");
        assert_eq!(isolate_from_stem("_x"), "");
    }

    #[test]
    fn discovers_sorted_tables_per_condition() {
        let dir = tempfile::tempdir().unwrap();
        for (week, name) in [
            ("week4", "2106_30C_1.csv"),
            ("week3", "3610_30C_2.csv"),
            ("week3", "2103_30C_1.csv"),
            ("week3", "notes.txt"),
        ] {
            fs::create_dir_all(dir.path().join(week)).unwrap();
            fs::write(dir.path().join(week).join(name), TABLE).unwrap();
        }

        let all = discover_sources(dir.path(), &[]).unwrap();
        let ids: Vec<(&str, &str)> = all
            .iter()
            .map(|s| (s.id.condition.as_str(), s.id.replicate.as_str()))
            .collect();
        assert_eq!(
            ids,
            vec![("week3", "2103_30C_1"), ("week3", "3610_30C_2"), ("week4", "2106_30C_1")]
        );
        assert_eq!(all[0].id.isolate, "2103");

        let only = discover_sources(dir.path(), &["week4".to_string(), "missing".to_string()]).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id.isolate, "2106");

        let sample = load_sample(&all[1]).unwrap();
        assert_eq!(sample.id().isolate, "3610");
    }

    #[test]
    fn missing_root_is_a_run_error() {
        let err = discover_sources(Path::new("/definitely/not/here"), &[]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn unreadable_file_is_a_sample_error() {
        let source = SampleSource {
            path: PathBuf::from("/definitely/not/here.csv"),
            id: id(),
        };
        assert!(matches!(load_sample(&source), Err(ExtractError::Io { .. })));
    }
}
