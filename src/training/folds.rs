//! Cross-validation fold feeding for a train/test table pair
//!
//! [`FoldGenerator`] loads both tables once, drops the target, group and any
//! excluded columns from the features, computes the stratified partition and
//! then hands out `(train, validation, test)` triples. Each call to
//! [`FoldGenerator::iter`] starts a fresh pass with its own cursor, so passes
//! never interfere and always yield the same K folds in the same order.

use crate::error::{FoldwiseError, Result};
use crate::training::cross_validation::{CVSplit, CVStrategy, CrossValidator};
use crate::utils::data_loader::{DataLoader, TableSource};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::iter::FusedIterator;
use std::path::Path;
use tracing::{debug, info};

fn default_n_splits() -> usize {
    5
}

/// Fold generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldConfig {
    /// Name of the label column
    pub target_col: String,
    /// Number of folds (K)
    #[serde(default = "default_n_splits")]
    pub n_splits: usize,
    /// Rows sharing a value in this column always land in the same fold
    #[serde(default)]
    pub group_col: Option<String>,
    /// Extra columns kept out of the feature matrix
    #[serde(default)]
    pub exclude_cols: Vec<String>,
    /// Shuffle fold assignment before partitioning
    #[serde(default)]
    pub shuffle: bool,
    /// Seed for the shuffle
    #[serde(default)]
    pub random_state: Option<u64>,
}

impl FoldConfig {
    pub fn new(target_col: impl Into<String>) -> Self {
        Self {
            target_col: target_col.into(),
            n_splits: default_n_splits(),
            group_col: None,
            exclude_cols: Vec::new(),
            shuffle: false,
            random_state: None,
        }
    }

    pub fn with_n_splits(mut self, n_splits: usize) -> Self {
        self.n_splits = n_splits;
        self
    }

    pub fn with_group_col(mut self, group_col: impl Into<String>) -> Self {
        self.group_col = Some(group_col.into());
        self
    }

    pub fn with_exclude_cols<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_cols = cols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Read a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Target, group and caller exclusions as one set
    pub fn excluded_columns(&self) -> HashSet<&str> {
        std::iter::once(self.target_col.as_str())
            .chain(self.group_col.as_deref())
            .chain(self.exclude_cols.iter().map(String::as_str))
            .collect()
    }

    fn strategy(&self) -> CVStrategy {
        match self.group_col {
            Some(_) => CVStrategy::StratifiedGroupKFold {
                n_splits: self.n_splits,
                shuffle: self.shuffle,
            },
            None => CVStrategy::StratifiedKFold {
                n_splits: self.n_splits,
                shuffle: self.shuffle,
            },
        }
    }
}

/// Features and labels for one side of a fold
#[derive(Debug, Clone)]
pub struct Split {
    /// Row positions in the training table
    pub indices: Vec<usize>,
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

impl Split {
    fn take(features: &Array2<f64>, target: &Array1<f64>, indices: &[usize]) -> Self {
        Self {
            indices: indices.to_vec(),
            x: features.select(Axis(0), indices),
            y: target.select(Axis(0), indices),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Share of rows labelled `label`
    pub fn label_rate(&self, label: f64) -> f64 {
        if self.y.is_empty() {
            return 0.0;
        }
        self.y.iter().filter(|&&v| v == label).count() as f64 / self.y.len() as f64
    }
}

/// Feature matrix and target vector
pub type XY = (Array2<f64>, Array1<f64>);

/// One cross-validation fold
#[derive(Debug, Clone)]
pub struct Fold<'a> {
    pub index: usize,
    pub train: Split,
    pub validation: Split,
    /// The full test feature matrix, identical for every fold
    pub test: &'a Array2<f64>,
}

impl<'a> Fold<'a> {
    /// `((x_train, y_train), (x_val, y_val), x_test)`
    pub fn into_parts(self) -> (XY, XY, &'a Array2<f64>) {
        (
            (self.train.x, self.train.y),
            (self.validation.x, self.validation.y),
            self.test,
        )
    }
}

/// Stratified (optionally group-aware) fold generator over a train/test pair
#[derive(Debug, Clone)]
pub struct FoldGenerator {
    config: FoldConfig,
    feature_names: Vec<String>,
    features: Array2<f64>,
    target: Array1<f64>,
    class_labels: Option<Vec<String>>,
    groups: Option<Vec<String>>,
    test_features: Array2<f64>,
    splits: Vec<CVSplit>,
}

impl FoldGenerator {
    /// Load both tables and compute the fold partition
    pub fn new(
        train: impl Into<TableSource>,
        test: impl Into<TableSource>,
        config: FoldConfig,
    ) -> Result<Self> {
        Self::with_loader(train, test, config, &DataLoader::new())
    }

    /// Same as [`FoldGenerator::new`] with custom loading options
    pub fn with_loader(
        train: impl Into<TableSource>,
        test: impl Into<TableSource>,
        config: FoldConfig,
        loader: &DataLoader,
    ) -> Result<Self> {
        let train_df = train.into().load(loader)?;
        let train_columns = column_names(&train_df);

        for required in std::iter::once(&config.target_col).chain(config.group_col.as_ref()) {
            if !train_columns.contains(required) {
                return Err(FoldwiseError::FeatureNotFound(required.clone()));
            }
        }

        let excluded = config.excluded_columns();
        let feature_names: Vec<String> = train_columns
            .iter()
            .filter(|c| !excluded.contains(c.as_str()))
            .cloned()
            .collect();

        if feature_names.is_empty() {
            return Err(FoldwiseError::DataError(
                "no feature columns remain after exclusions".to_string(),
            ));
        }

        let test_df = test.into().load(loader)?;
        let test_columns = column_names(&test_df);
        let found: Vec<String> = feature_names
            .iter()
            .filter(|c| test_columns.contains(c))
            .cloned()
            .collect();
        if found != feature_names {
            return Err(FoldwiseError::SchemaMismatch {
                expected: feature_names,
                found,
            });
        }

        let features = feature_matrix(&train_df, &feature_names)?;
        let test_features = feature_matrix(&test_df, &feature_names)?;
        let (target, class_labels) = target_vector(&train_df, &config.target_col)?;
        let groups = match &config.group_col {
            Some(name) => Some(group_vector(&train_df, name)?),
            None => None,
        };

        let mut cv = CrossValidator::new(config.strategy());
        if let Some(seed) = config.random_state {
            cv = cv.with_random_state(seed);
        }
        let splits = cv.split(&target, groups.as_deref())?;

        info!(
            n_rows = features.nrows(),
            n_features = feature_names.len(),
            n_test_rows = test_features.nrows(),
            n_splits = splits.len(),
            grouped = groups.is_some(),
            "fold partition computed"
        );
        for split in &splits {
            debug!(
                fold = split.fold_idx,
                train = split.train_indices.len(),
                validation = split.test_indices.len(),
                "fold sizes"
            );
        }

        Ok(Self {
            config,
            feature_names,
            features,
            target,
            class_labels,
            groups,
            test_features,
            splits,
        })
    }

    /// Number of folds (K)
    pub fn len(&self) -> usize {
        self.splits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    pub fn n_splits(&self) -> usize {
        self.len()
    }

    /// A fresh pass over all folds
    pub fn iter(&self) -> Folds<'_> {
        Folds {
            generator: self,
            cursor: 0,
        }
    }

    /// Materialize fold `index`, if it exists
    pub fn fold(&self, index: usize) -> Option<Fold<'_>> {
        let split = self.splits.get(index)?;
        Some(Fold {
            index,
            train: Split::take(&self.features, &self.target, &split.train_indices),
            validation: Split::take(&self.features, &self.target, &split.test_indices),
            test: &self.test_features,
        })
    }

    pub fn config(&self) -> &FoldConfig {
        &self.config
    }

    /// Feature column names in training-table order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// Labels as f64; text labels are replaced by their index in
    /// [`FoldGenerator::class_labels`]
    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    /// Largest label, the positive class of a binary target
    pub fn positive_label(&self) -> f64 {
        self.target.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Sorted distinct labels of a text target column, `None` for numeric targets
    pub fn class_labels(&self) -> Option<&[String]> {
        self.class_labels.as_deref()
    }

    pub fn groups(&self) -> Option<&[String]> {
        self.groups.as_deref()
    }

    pub fn test_features(&self) -> &Array2<f64> {
        &self.test_features
    }

    /// Row indices of every fold
    pub fn splits(&self) -> &[CVSplit] {
        &self.splits
    }
}

impl<'a> IntoIterator for &'a FoldGenerator {
    type Item = Fold<'a>;
    type IntoIter = Folds<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over the folds of a [`FoldGenerator`]
#[derive(Debug, Clone)]
pub struct Folds<'a> {
    generator: &'a FoldGenerator,
    cursor: usize,
}

impl<'a> Iterator for Folds<'a> {
    type Item = Fold<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let fold = self.generator.fold(self.cursor)?;
        self.cursor += 1;
        Some(fold)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.generator.len().saturating_sub(self.cursor);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Folds<'_> {}

impl FusedIterator for Folds<'_> {}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .map_err(|_| FoldwiseError::FeatureNotFound(name.to_string()))?
        .as_materialized_series();
    let values = series
        .strict_cast(&DataType::Float64)
        .map_err(|e| FoldwiseError::DataError(format!("column '{}' is not numeric: {}", name, e)))?;
    Ok(values.f64()?.into_iter().collect())
}

/// Features as f64; missing values become NaN
fn feature_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut x = Array2::zeros((df.height(), columns.len()));
    for (j, name) in columns.iter().enumerate() {
        for (i, value) in numeric_column(df, name)?.into_iter().enumerate() {
            x[[i, j]] = value.unwrap_or(f64::NAN);
        }
    }
    Ok(x)
}

/// Numeric targets are used as-is. Text targets are encoded by the position
/// of each label among the sorted distinct labels.
fn target_vector(df: &DataFrame, name: &str) -> Result<(Array1<f64>, Option<Vec<String>>)> {
    let series = df
        .column(name)
        .map_err(|_| FoldwiseError::FeatureNotFound(name.to_string()))?
        .as_materialized_series();

    if series.dtype() == &DataType::String {
        let labels: Vec<&str> = series
            .str()?
            .into_iter()
            .map(|v| {
                v.ok_or_else(|| {
                    FoldwiseError::DataError(format!("target column '{}' contains missing labels", name))
                })
            })
            .collect::<Result<_>>()?;

        let mut classes: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        classes.sort();
        classes.dedup();

        let codes = labels
            .iter()
            .map(|label| {
                classes
                    .binary_search_by(|c| c.as_str().cmp(label))
                    .map(|code| code as f64)
                    .map_err(|_| FoldwiseError::DataError(format!("unknown label '{}'", label)))
            })
            .collect::<Result<Array1<f64>>>()?;
        return Ok((codes, Some(classes)));
    }

    let values = numeric_column(df, name)?
        .into_iter()
        .map(|v| match v {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(FoldwiseError::DataError(format!(
                "target column '{}' contains missing or non-finite labels",
                name
            ))),
        })
        .collect::<Result<Array1<f64>>>()?;
    Ok((values, None))
}

fn group_vector(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = df
        .column(name)
        .map_err(|_| FoldwiseError::FeatureNotFound(name.to_string()))?
        .as_materialized_series()
        .cast(&DataType::String)?;
    series
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::to_string).ok_or_else(|| {
                FoldwiseError::DataError(format!("group column '{}' contains nulls", name))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_from_json() {
        let config: FoldConfig = serde_json::from_str(r#"{"target_col": "label"}"#).unwrap();
        assert_eq!(config, FoldConfig::new("label"));
        assert_eq!(config.n_splits, 5);
    }

    #[test]
    fn test_excluded_columns() {
        let exclude = vec!["id".to_string()];
        let config = FoldConfig::new("y")
            .with_group_col("g")
            .with_exclude_cols(exclude.clone());

        let excluded = config.excluded_columns();
        assert_eq!(excluded, HashSet::from(["y", "g", "id"]));
        // caller's list is untouched
        assert_eq!(exclude, vec!["id".to_string()]);
        assert_eq!(config.exclude_cols, vec!["id".to_string()]);
    }

    #[test]
    fn test_strategy_follows_group_col() {
        let plain = FoldConfig::new("y").with_n_splits(3);
        assert_eq!(plain.strategy(), CVStrategy::StratifiedKFold { n_splits: 3, shuffle: false });

        let grouped = plain.with_group_col("g");
        assert_eq!(
            grouped.strategy(),
            CVStrategy::StratifiedGroupKFold { n_splits: 3, shuffle: false }
        );
    }

    #[test]
    fn test_target_with_nulls_rejected() {
        let df = df!("y" => &[Some(1.0), None, Some(0.0)]).unwrap();
        assert!(matches!(target_vector(&df, "y"), Err(FoldwiseError::DataError(_))));
    }

    #[test]
    fn test_text_target_encoded_by_sorted_label() {
        let df = df!("y" => &["dog", "cat", "dog", "bird"]).unwrap();
        let (codes, labels) = target_vector(&df, "y").unwrap();
        assert_eq!(codes.to_vec(), vec![2.0, 1.0, 2.0, 0.0]);
        assert_eq!(labels.unwrap(), vec!["bird", "cat", "dog"]);
    }

    #[test]
    fn test_text_target_with_nulls_rejected() {
        let df = df!("y" => &[Some("a"), None]).unwrap();
        assert!(matches!(target_vector(&df, "y"), Err(FoldwiseError::DataError(_))));
    }

    #[test]
    fn test_label_rate() {
        let split = Split::take(
            &Array2::zeros((4, 1)),
            &Array1::from(vec![1.0, 2.0, 2.0, 2.0]),
            &[0, 1, 2, 3],
        );
        assert_eq!(split.label_rate(2.0), 0.75);
        assert_eq!(split.label_rate(5.0), 0.0);
    }

    #[test]
    fn test_text_feature_rejected() {
        let df = df!("f" => &["a", "b"]).unwrap();
        let result = feature_matrix(&df, &["f".to_string()]);
        assert!(matches!(result, Err(FoldwiseError::DataError(_))));
    }

    #[test]
    fn test_feature_nulls_become_nan() {
        let df = df!("a" => &[Some(1.0), None]).unwrap();
        let x = feature_matrix(&df, &["a".to_string()]).unwrap();
        assert_eq!(x[[0, 0]], 1.0);
        assert!(x[[1, 0]].is_nan());
    }

    #[test]
    fn test_integer_groups_as_strings() {
        let df = df!("g" => &[3i64, 3, 7]).unwrap();
        assert_eq!(group_vector(&df, "g").unwrap(), vec!["3", "3", "7"]);
    }
}
