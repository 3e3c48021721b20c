//! Fit several heterogeneous classifiers on the same data and stack their
//! positive-class probabilities.

use crate::error::{FoldwiseError, Result};
use crate::training::{Classifier, ModelFactory, ModelParams, ModelRegistry};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ensembling needs at least this many base learners
pub const MIN_MODELS: usize = 2;

/// One model in an [`EnsembleConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Registry name of the model
    pub model: String,
    /// Settings passed to the model's factory
    #[serde(default)]
    pub params: ModelParams,
}

/// Ensemble description as read from a configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub models: Vec<ModelEntry>,
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

impl EnsembleConfig {
    /// Read a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Ordered collection of independently constructed classifiers
pub struct Ensembler {
    names: Vec<String>,
    models: Vec<Box<dyn Classifier>>,
    save_path: Option<PathBuf>,
}

impl Ensembler {
    /// Build one model per `(factory, params)` pair, in order.
    ///
    /// Fails with [`FoldwiseError::ArityMismatch`] before building anything
    /// when the two lists differ in length, and with a configuration error
    /// when fewer than two models are given.
    pub fn new(
        factories: Vec<ModelFactory>,
        params: Vec<ModelParams>,
        save_path: Option<PathBuf>,
    ) -> Result<Self> {
        if factories.len() != params.len() {
            return Err(FoldwiseError::ArityMismatch {
                models: factories.len(),
                params: params.len(),
            });
        }
        if factories.len() < MIN_MODELS {
            return Err(FoldwiseError::ConfigError(format!(
                "ensembling requires at least {} models, got {}",
                MIN_MODELS,
                factories.len()
            )));
        }

        let models = factories
            .iter()
            .zip(params.iter())
            .map(|(factory, params)| factory.build(params))
            .collect::<Result<Vec<_>>>()?;
        let names = factories.iter().map(|f| f.name().to_string()).collect();

        // Persistence is not implemented; the path is only recorded
        debug!(save_path = ?save_path, "Currently, no model is saved.");

        Ok(Self {
            names,
            models,
            save_path,
        })
    }

    /// Resolve model names through `registry` and build the ensemble
    pub fn from_config(config: &EnsembleConfig, registry: &ModelRegistry) -> Result<Self> {
        let factories = config
            .models
            .iter()
            .map(|entry| registry.get(&entry.model).cloned())
            .collect::<Result<Vec<_>>>()?;
        let params = config.models.iter().map(|entry| entry.params.clone()).collect();

        Self::new(factories, params, config.save_path.clone())
    }

    /// Fit every model, in order, on the same data.
    ///
    /// The first failing model aborts the remaining fits.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        for (name, model) in self.names.iter().zip(self.models.iter_mut()) {
            debug!(model = %name, n_rows = x.nrows(), "fitting");
            model.fit(x, y)?;
        }
        Ok(())
    }

    /// Positive-class probabilities, one row per model and one column per
    /// input row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let mut preds = Array2::zeros((self.models.len(), x.nrows()));

        for (i, model) in self.models.iter().enumerate() {
            let positive = model.predict_positive_proba(x)?;
            if positive.len() != x.nrows() {
                return Err(FoldwiseError::ShapeError {
                    expected: format!("{} predictions from model '{}'", x.nrows(), self.names[i]),
                    actual: format!("{} predictions", positive.len()),
                });
            }
            preds.row_mut(i).assign(&positive);
        }

        Ok(preds)
    }

    /// Number of models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Factory names in construction order
    pub fn model_names(&self) -> &[String] {
        &self.names
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }
}

impl std::fmt::Debug for Ensembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ensembler")
            .field("models", &self.names)
            .field("save_path", &self.save_path)
            .finish()
    }
}
