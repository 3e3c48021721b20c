//! Combine a stacked (models × rows) probability matrix into one vector

use crate::error::{FoldwiseError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Aggregation method across models
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Plain mean
    #[default]
    Mean,
    /// Median (robust to a single outlying model)
    Median,
    /// Weighted mean; weights are normalized to sum to one
    Weighted(Vec<f64>),
}

/// Collapse the rows of `preds` (one per model) into one value per column
pub fn aggregate(preds: &Array2<f64>, method: &Aggregation) -> Result<Array1<f64>> {
    let n_models = preds.nrows();
    if n_models == 0 {
        return Err(FoldwiseError::ShapeError {
            expected: "at least one model row".to_string(),
            actual: "0 rows".to_string(),
        });
    }

    match method {
        Aggregation::Mean => Ok(preds.sum_axis(Axis(0)) / n_models as f64),
        Aggregation::Median => Ok(preds.map_axis(Axis(0), |column| {
            let mut values = column.to_vec();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = values.len() / 2;
            if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / 2.0
            } else {
                values[mid]
            }
        })),
        Aggregation::Weighted(weights) => {
            if weights.len() != n_models {
                return Err(FoldwiseError::ArityMismatch {
                    models: n_models,
                    params: weights.len(),
                });
            }
            let weight_sum: f64 = weights.iter().sum();
            if !(weight_sum > 0.0) {
                return Err(FoldwiseError::InvalidParameter {
                    name: "weights".to_string(),
                    value: format!("{:?}", weights),
                    reason: "must sum to a positive value".to_string(),
                });
            }
            let w = Array1::from_iter(weights.iter().map(|w| w / weight_sum));
            Ok(preds.t().dot(&w))
        }
    }
}
