//! foldwise - cross-validation fold feeding and probability ensembling
//!
//! This crate provides two small building blocks for tabular ML experiments:
//! - A stratified (optionally group-aware) K-fold generator that loads a
//!   training and a test table and yields `(train, validation, test)` data
//!   for each fold
//! - An ensembler that fits several heterogeneous classifiers on the same data
//!   and returns their stacked positive-class probabilities
//!
//! # Modules
//!
//! - [`training`] - Cross-validation, fold generation, classifier trait and
//!   built-in models
//! - [`ensemble`] - Ensembler and probability aggregation
//! - [`utils`] - Table loading and saving
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use foldwise::prelude::*;
//!
//! # fn main() -> foldwise::Result<()> {
//! let folds = FoldGenerator::new(
//!     "train.csv",
//!     "test.csv",
//!     FoldConfig::new("target").with_n_splits(5).with_exclude_cols(["id"]),
//! )?;
//!
//! let registry = ModelRegistry::builtin();
//! for fold in &folds {
//!     let ((x_train, y_train), _validation, x_test) = fold.into_parts();
//!     let mut ensembler = Ensembler::new(
//!         vec![
//!             registry.get("logistic_regression")?.clone(),
//!             registry.get("gaussian_nb")?.clone(),
//!         ],
//!         vec![ModelParams::new(), ModelParams::new()],
//!         None,
//!     )?;
//!     ensembler.fit(&x_train, &y_train)?;
//!     let probabilities = ensembler.predict_proba(x_test)?;
//!     let _mean = aggregate(&probabilities, &Aggregation::Mean)?;
//! }
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

pub mod ensemble;
pub mod training;
pub mod utils;

// Services
pub mod cli;

pub use error::{FoldwiseError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{FoldwiseError, Result};

    // Folds
    pub use crate::training::{
        CVResults, CVSplit, CVStrategy, CrossValidator, Fold, FoldConfig, FoldGenerator, Split,
    };

    // Models
    pub use crate::training::{
        Classifier, DummyClassifier, FromParams, GaussianNaiveBayes, LogisticRegression,
        ModelFactory, ModelMetrics, ModelParams, ModelRegistry,
    };

    // Ensemble
    pub use crate::ensemble::{aggregate, Aggregation, EnsembleConfig, Ensembler};

    // Data loading
    pub use crate::utils::{DataLoader, DataSaver, TableSource};
}
