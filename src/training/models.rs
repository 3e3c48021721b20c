//! Model traits, factories and evaluation metrics

use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, Array2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Keyword-style parameter map as it appears in configuration files
pub type ModelParams = serde_json::Map<String, Value>;

/// Trait for binary probabilistic classifiers
pub trait Classifier: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Class probabilities, one row per sample: (negative, positive)
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Probability of the positive class for each row
    fn predict_positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        if proba.ncols() != 2 {
            return Err(FoldwiseError::ShapeError {
                expected: "2 probability columns".to_string(),
                actual: format!("{} columns", proba.ncols()),
            });
        }
        Ok(proba.column(1).to_owned())
    }
}

/// Models that can be built from a typed settings record.
///
/// `Config` is deserialized from a [`ModelParams`] map, so unknown keys or
/// ill-typed values are rejected before the model exists.
pub trait FromParams: Sized {
    type Config: DeserializeOwned + Default;

    fn from_config(config: Self::Config) -> Result<Self>;

    fn from_params(params: &ModelParams) -> Result<Self> {
        let config: Self::Config = serde_json::from_value(Value::Object(params.clone()))
            .map_err(|e| FoldwiseError::ConfigError(format!("invalid model parameters: {}", e)))?;
        Self::from_config(config)
    }
}

type BuildFn = dyn Fn(&ModelParams) -> Result<Box<dyn Classifier>> + Send + Sync;

/// Named constructor for a [`Classifier`]
#[derive(Clone)]
pub struct ModelFactory {
    name: String,
    build: Arc<BuildFn>,
}

impl ModelFactory {
    /// Wrap an arbitrary constructor closure
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&ModelParams) -> Result<Box<dyn Classifier>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            build: Arc::new(build),
        }
    }

    /// Factory for a model type that knows how to read its own settings
    pub fn of<M>(name: impl Into<String>) -> Self
    where
        M: Classifier + FromParams + 'static,
    {
        Self::new(name, |params| {
            let model: Box<dyn Classifier> = Box::new(M::from_params(params)?);
            Ok(model)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build a fresh model instance
    pub fn build(&self, params: &ModelParams) -> Result<Box<dyn Classifier>> {
        (self.build)(params)
    }
}

impl fmt::Debug for ModelFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelFactory").field("name", &self.name).finish()
    }
}

/// Stack a positive-class probability vector into (1 - p, p) columns
pub(crate) fn binary_proba(positive: &Array1<f64>) -> Array2<f64> {
    let mut proba = Array2::zeros((positive.len(), 2));
    proba.column_mut(0).assign(&positive.mapv(|p| 1.0 - p));
    proba.column_mut(1).assign(positive);
    proba
}

/// Recode binary labels as 0/1 with the larger of the two labels as the
/// positive class. A lone label is positive unless it is 0; a third distinct
/// label is an error.
pub(crate) fn binary_targets(y: &Array1<f64>) -> Result<Array1<f64>> {
    let mut classes: Vec<f64> = Vec::with_capacity(2);
    for &value in y.iter() {
        if !value.is_finite() {
            return Err(FoldwiseError::DataError(format!(
                "labels must be finite, found {}",
                value
            )));
        }
        if !classes.contains(&value) {
            if classes.len() == 2 {
                return Err(FoldwiseError::DataError(format!(
                    "binary classifiers accept two distinct labels, found {}, {} and {}",
                    classes[0], classes[1], value
                )));
            }
            classes.push(value);
        }
    }

    let positive = match classes.as_slice() {
        [a, b] => a.max(*b),
        [only] if *only == 0.0 => return Ok(Array1::zeros(y.len())),
        _ => return Ok(Array1::ones(y.len())),
    };
    Ok(y.mapv(|v| if v == positive { 1.0 } else { 0.0 }))
}

/// Metrics for binary classification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy at a 0.5 threshold
    pub accuracy: Option<f64>,
    /// Precision
    pub precision: Option<f64>,
    /// Recall
    pub recall: Option<f64>,
    /// F1 score
    pub f1_score: Option<f64>,
    /// Log loss of the probabilities
    pub log_loss: Option<f64>,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute classification metrics from positive-class probabilities
    pub fn compute_classification(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_prob.len() {
            return Err(FoldwiseError::ShapeError {
                expected: format!("{} probabilities", y_true.len()),
                actual: format!("{} probabilities", y_prob.len()),
            });
        }

        let mut metrics = Self::new();
        metrics.n_samples = y_true.len();
        if y_true.is_empty() {
            return Ok(metrics);
        }

        let y_true = &binary_targets(y_true)?;
        let n = y_true.len() as f64;
        let (tp, fp, tn, fn_) = Self::confusion_counts(y_true, y_prob);

        metrics.accuracy = Some((tp + tn) as f64 / n);
        metrics.precision = Some(if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 });
        metrics.recall = Some(if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 });

        if let (Some(p), Some(r)) = (metrics.precision, metrics.recall) {
            metrics.f1_score = Some(if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 });
        }

        let eps = 1e-15;
        let loss: f64 = y_true
            .iter()
            .zip(y_prob.iter())
            .map(|(&t, &p)| {
                let p = p.clamp(eps, 1.0 - eps);
                if t > 0.5 { -p.ln() } else { -(1.0 - p).ln() }
            })
            .sum();
        metrics.log_loss = Some(loss / n);

        Ok(metrics)
    }

    fn confusion_counts(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> (usize, usize, usize, usize) {
        let mut tp = 0;
        let mut fp = 0;
        let mut tn = 0;
        let mut fn_ = 0;

        for (t, p) in y_true.iter().zip(y_prob.iter()) {
            match (*t > 0.5, *p >= 0.5) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }

        (tp, fp, tn, fn_)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct Fixed(Array2<f64>);

    impl Classifier for Fixed {
        fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
            Ok(())
        }

        fn predict_proba(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_positive_column_extracted() {
        let model = Fixed(array![[0.9, 0.1], [0.3, 0.7]]);
        let p = model.predict_positive_proba(&Array2::zeros((2, 1))).unwrap();
        assert_eq!(p, array![0.1, 0.7]);
    }

    #[test]
    fn test_multiclass_output_rejected() {
        let model = Fixed(array![[0.2, 0.3, 0.5]]);
        let result = model.predict_positive_proba(&Array2::zeros((1, 1)));
        assert!(matches!(result, Err(FoldwiseError::ShapeError { .. })));
    }

    #[test]
    fn test_binary_proba() {
        let proba = binary_proba(&array![0.25, 1.0]);
        assert_eq!(proba, array![[0.75, 0.25], [0.0, 1.0]]);
    }

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_prob = array![0.9, 0.1, 0.8, 0.4, 0.2, 0.7, 0.6, 0.3];

        let metrics = ModelMetrics::compute_classification(&y_true, &y_prob).unwrap();

        assert_eq!(metrics.n_samples, 8);
        assert!((metrics.accuracy.unwrap() - 0.75).abs() < 1e-12);
        assert!(metrics.log_loss.unwrap() > 0.0);
    }

    #[test]
    fn test_binary_targets_larger_label_positive() {
        assert_eq!(binary_targets(&array![1.0, 2.0, 2.0, 1.0]).unwrap(), array![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(binary_targets(&array![3.0, -1.0]).unwrap(), array![1.0, 0.0]);
        assert_eq!(binary_targets(&array![0.0, 0.0]).unwrap(), array![0.0, 0.0]);
        assert_eq!(binary_targets(&array![2.0, 2.0]).unwrap(), array![1.0, 1.0]);
    }

    #[test]
    fn test_binary_targets_three_labels_rejected() {
        let result = binary_targets(&array![0.0, 1.0, 2.0]);
        assert!(matches!(result, Err(FoldwiseError::DataError(_))));
    }

    #[test]
    fn test_metrics_with_one_two_labels() {
        let y_true = array![1.0, 1.0, 2.0, 2.0];
        let y_prob = array![0.1, 0.2, 0.9, 0.8];

        let metrics = ModelMetrics::compute_classification(&y_true, &y_prob).unwrap();
        assert_eq!(metrics.accuracy, Some(1.0));
        assert_eq!(metrics.recall, Some(1.0));
    }

    #[test]
    fn test_metrics_length_mismatch() {
        let result = ModelMetrics::compute_classification(&array![1.0, 0.0], &array![0.5]);
        assert!(result.is_err());
    }
}
