//! Naive Bayes classifiers
//!
//! Implements Gaussian Naive Bayes for continuous features.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{FoldwiseError, Result};
use crate::training::models::{binary_targets, Classifier, FromParams};

/// Settings for [`GaussianNaiveBayes`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GaussianNaiveBayesConfig {
    /// Share of the largest feature variance added to every per-class variance
    pub var_smoothing: f64,
}

impl Default for GaussianNaiveBayesConfig {
    fn default() -> Self {
        Self { var_smoothing: 1e-9 }
    }
}

/// Per-class sufficient statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassStats {
    prior: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

/// Gaussian Naive Bayes classifier for a binary target.
///
/// The larger of the two labels forms the positive class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    var_smoothing: f64,
    /// (negative, positive)
    stats: Option<[ClassStats; 2]>,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            var_smoothing: 1e-9,
            stats: None,
        }
    }

    /// Set variance smoothing parameter
    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    /// Class priors as (negative, positive)
    pub fn class_priors(&self) -> Option<(f64, f64)> {
        self.stats.as_ref().map(|[neg, pos]| (neg.prior, pos.prior))
    }

    /// Variance floor: `var_smoothing` times the largest feature variance,
    /// or `var_smoothing` itself when every feature is constant
    fn epsilon(&self, x: &Array2<f64>) -> f64 {
        let max_var = x
            .columns()
            .into_iter()
            .map(|col| col.var(0.0))
            .fold(0.0f64, f64::max);
        let epsilon = self.var_smoothing * max_var;
        if epsilon > 0.0 {
            epsilon
        } else {
            self.var_smoothing
        }
    }

    fn class_stats(&self, x: &Array2<f64>, rows: &[usize], n_samples: usize, epsilon: f64) -> ClassStats {
        let n_features = x.ncols();

        // Single-pass Welford's algorithm for mean and variance
        let mut means = vec![0.0; n_features];
        let mut m2 = vec![0.0; n_features];
        for (count, &idx) in rows.iter().enumerate() {
            let count = (count + 1) as f64;
            for (j, &val) in x.row(idx).iter().enumerate() {
                let delta = val - means[j];
                means[j] += delta / count;
                m2[j] += delta * (val - means[j]);
            }
        }
        let variances = m2
            .iter()
            .map(|&m| m / rows.len() as f64 + epsilon)
            .collect();

        ClassStats {
            prior: rows.len() as f64 / n_samples as f64,
            means,
            variances,
        }
    }

    fn joint_log_likelihood(stats: &ClassStats, row: ArrayView1<f64>) -> f64 {
        let log_likelihood: f64 = row
            .iter()
            .zip(stats.means.iter())
            .zip(stats.variances.iter())
            .map(|((&xi, &mean), &var)| -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln()))
            .sum();
        stats.prior.ln() + log_likelihood
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(FoldwiseError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let targets = binary_targets(y)?;
        let (positive, negative): (Vec<usize>, Vec<usize>) =
            (0..n_samples).partition(|&i| targets[i] == 1.0);

        if positive.is_empty() || negative.is_empty() {
            return Err(FoldwiseError::DataError(
                "GaussianNaiveBayes needs both classes in the training data".to_string(),
            ));
        }

        let epsilon = self.epsilon(x);
        self.stats = Some([
            self.class_stats(x, &negative, n_samples, epsilon),
            self.class_stats(x, &positive, n_samples, epsilon),
        ]);

        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let stats = self.stats.as_ref().ok_or(FoldwiseError::ModelNotFitted)?;

        if x.ncols() != stats[0].means.len() {
            return Err(FoldwiseError::ShapeError {
                expected: format!("{} features", stats[0].means.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut proba = Array2::zeros((x.nrows(), 2));

        for (i, row) in x.rows().into_iter().enumerate() {
            let neg = Self::joint_log_likelihood(&stats[0], row);
            let pos = Self::joint_log_likelihood(&stats[1], row);

            // Normalize (log-sum-exp trick)
            let max_val = neg.max(pos);
            let log_sum = ((neg - max_val).exp() + (pos - max_val).exp()).ln();
            proba[[i, 0]] = (neg - max_val - log_sum).exp();
            proba[[i, 1]] = (pos - max_val - log_sum).exp();
        }

        Ok(proba)
    }
}

impl FromParams for GaussianNaiveBayes {
    type Config = GaussianNaiveBayesConfig;

    fn from_config(config: GaussianNaiveBayesConfig) -> Result<Self> {
        if !(config.var_smoothing > 0.0) {
            return Err(FoldwiseError::InvalidParameter {
                name: "var_smoothing".to_string(),
                value: config.var_smoothing.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(Self::new().with_var_smoothing(config.var_smoothing))
    }
}
