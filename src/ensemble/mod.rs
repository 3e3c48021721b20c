//! Ensemble methods module
//!
//! - [`Ensembler`]: fit several classifiers on shared data and stack their
//!   positive-class probabilities
//! - [`aggregate`]: caller-side reduction of the stacked matrix (mean,
//!   median, weighted mean)

mod aggregate;
mod ensembler;

pub use aggregate::{aggregate, Aggregation};
pub use ensembler::{EnsembleConfig, Ensembler, ModelEntry, MIN_MODELS};
