//! Input/output helpers.
//!
//! - measurement-table discovery + loading (`ingest`)
//! - best-sample manifests (`manifest`)
//! - result exports (CSV) (`export`)
//! - run summary JSON read/write (`summary`)

pub mod export;
pub mod ingest;
pub mod manifest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use manifest::*;
pub use summary::*;
