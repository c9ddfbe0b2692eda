//! `rheo-params` library crate.
//!
//! The binary (`rheo`) is a thin wrapper around this library so that:
//!
//! - the extraction engine is testable without spawning processes
//! - modules are reusable (e.g., notebooks, other front-ends)
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod extract;
pub mod io;
pub mod report;
pub mod stats;
