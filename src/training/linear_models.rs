//! Linear classifiers

use crate::error::{FoldwiseError, Result};
use crate::training::models::{binary_proba, binary_targets, Classifier, FromParams};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Settings for [`LogisticRegression`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogisticRegressionConfig {
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            fit_intercept: true,
        }
    }
}

/// Logistic regression trained by batch gradient descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticRegressionConfig,
    /// Fitted coefficients
    coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    intercept: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            config: LogisticRegressionConfig::default(),
            coefficients: None,
            intercept: 0.0,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.config.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.config.learning_rate = lr;
        self
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Probability of the positive class
    fn positive_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(FoldwiseError::ModelNotFitted)?;

        if x.ncols() != coefficients.len() {
            return Err(FoldwiseError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(Self::sigmoid(&(x.dot(coefficients) + self.intercept)))
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(FoldwiseError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(FoldwiseError::DataError("cannot fit on an empty table".to_string()));
        }

        let targets = binary_targets(y)?;
        let mut weights = Array1::zeros(n_features);
        let mut bias = 0.0;

        let lr = self.config.learning_rate;
        let alpha = self.config.alpha;

        for _iter in 0..self.config.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - &targets;
            let dw = (x.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
            let db = if self.config.fit_intercept {
                errors.mean().unwrap_or(0.0)
            } else {
                0.0
            };

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.config.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        self.coefficients = Some(weights);
        self.intercept = bias;

        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(binary_proba(&self.positive_proba(x)?))
    }
}

impl FromParams for LogisticRegression {
    type Config = LogisticRegressionConfig;

    fn from_config(config: LogisticRegressionConfig) -> Result<Self> {
        if !(config.learning_rate > 0.0) {
            return Err(FoldwiseError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: config.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(config.alpha >= 0.0) {
            return Err(FoldwiseError::InvalidParameter {
                name: "alpha".to_string(),
                value: config.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }

        Ok(Self {
            config,
            coefficients: None,
            intercept: 0.0,
        })
    }
}
