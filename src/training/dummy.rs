//! Baseline classifier that ignores the features

use crate::error::{FoldwiseError, Result};
use crate::training::models::{binary_proba, binary_targets, Classifier, FromParams};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Settings for [`DummyClassifier`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DummyConfig {
    /// Fixed positive-class probability; the training positive rate when unset
    pub constant: Option<f64>,
}

/// Predicts the same positive-class probability for every row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DummyClassifier {
    constant: Option<f64>,
    positive_rate: Option<f64>,
}

impl DummyClassifier {
    /// Predict the positive rate seen during `fit`
    pub fn prior() -> Self {
        Self::default()
    }

    /// Always predict `probability`
    pub fn constant(probability: f64) -> Self {
        Self {
            constant: Some(probability),
            positive_rate: None,
        }
    }
}

impl Classifier for DummyClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(FoldwiseError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        let targets = binary_targets(y)?;
        self.positive_rate = Some(targets.mean().unwrap_or(0.0));
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let p = match (self.constant, self.positive_rate) {
            (Some(c), _) => c,
            (None, Some(rate)) => rate,
            (None, None) => return Err(FoldwiseError::ModelNotFitted),
        };
        Ok(binary_proba(&Array1::from_elem(x.nrows(), p)))
    }
}

impl FromParams for DummyClassifier {
    type Config = DummyConfig;

    fn from_config(config: DummyConfig) -> Result<Self> {
        match config.constant {
            Some(c) if !(0.0..=1.0).contains(&c) => Err(FoldwiseError::InvalidParameter {
                name: "constant".to_string(),
                value: c.to_string(),
                reason: "must be a probability in [0, 1]".to_string(),
            }),
            Some(c) => Ok(Self::constant(c)),
            None => Ok(Self::prior()),
        }
    }
}
