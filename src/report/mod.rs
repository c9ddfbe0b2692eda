//! Terminal reports for extraction runs and comparisons.

pub mod format;

pub use format::*;
