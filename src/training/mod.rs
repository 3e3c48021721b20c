//! Model training module
//!
//! Provides:
//! - Stratified and group-aware stratified cross-validation splitters
//! - The [`FoldGenerator`] that feeds train/validation/test data per fold
//! - The [`Classifier`] capability and typed model factories
//! - Built-in classifiers: logistic regression, Gaussian Naive Bayes and a
//!   dummy baseline

mod models;
mod registry;
pub mod cross_validation;
pub mod dummy;
pub mod folds;
pub mod linear_models;
pub mod naive_bayes;

pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
pub use dummy::{DummyClassifier, DummyConfig};
pub use folds::{Fold, FoldConfig, FoldGenerator, Folds, Split, XY};
pub use linear_models::{LogisticRegression, LogisticRegressionConfig};
pub use models::{Classifier, FromParams, ModelFactory, ModelMetrics, ModelParams};
pub use naive_bayes::{GaussianNaiveBayes, GaussianNaiveBayesConfig};
pub use registry::ModelRegistry;
