//! Curated "best sample" manifests.
//!
//! A manifest names one representative table per isolate:
//!
//! ```text
//! isolate,condition,file
//! 3610,week3,3610_30C_2.csv
//! 2103,week4,2103_30C_2.csv
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::domain::SampleId;
use crate::error::AppError;
use crate::io::ingest::SampleSource;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestEntry {
    pub isolate: String,
    pub condition: String,
    pub file: String,
}

impl ManifestEntry {
    /// `<root>/<condition>/<file>`, identified by the manifest's isolate.
    pub fn source(&self, root: &Path) -> SampleSource {
        let path = root.join(&self.condition).join(&self.file);
        let replicate = Path::new(&self.file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.file)
            .to_string();
        SampleSource {
            path,
            id: SampleId::new(&self.isolate, &self.condition, replicate),
        }
    }
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open manifest '{}': {e}", path.display())))?;
    parse_manifest(file)
        .map_err(|e| AppError::new(2, format!("Invalid manifest '{}': {e}", path.display())))
}

fn parse_manifest<R: std::io::Read>(reader: R) -> Result<Vec<ManifestEntry>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    for (idx, result) in reader.deserialize::<ManifestEntry>().enumerate() {
        let line = idx + 2;
        let entry = result.map_err(|e| format!("line {line}: {e}"))?;
        if !seen.insert(entry.isolate.clone()) {
            return Err(format!("line {line}: duplicate isolate `{}`", entry.isolate));
        }
        entries.push(entry);
    }

    if entries.is_empty() {
        return Err("no entries".to_string());
    }
    Ok(entries)
}
