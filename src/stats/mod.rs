//! Cross-sample statistics: per-isolate aggregation and table comparison.

pub mod aggregate;
pub mod compare;

pub use aggregate::*;
pub use compare::*;
