//! The parameter-extraction engine.
//!
//! Responsibilities, in pipeline order:
//!
//! - drop the startup transient (`trim`)
//! - estimate plateau moduli (`baseline`)
//! - rescale by `G'0` (`normalize`)
//! - scan for crossover / yield / overshoot (`features`)
//! - tie the stages together per sample (`engine`)

pub mod baseline;
pub mod engine;
pub mod features;
pub mod normalize;
pub mod trim;

pub use baseline::*;
pub use engine::*;
pub use features::*;
pub use normalize::*;
pub use trim::*;
