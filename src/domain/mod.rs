//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - measurement samples and their identity (`Sample`, `SampleId`)
//! - engine configuration (`SkipPolicy`, `BaselinePolicy`, `ExtractConfig`)
//! - extraction and aggregation outputs (`ParameterSet`, `IsolateAggregate`, `ComparisonRow`)

pub mod types;

pub use types::*;
