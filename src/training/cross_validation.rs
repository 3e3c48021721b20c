//! Cross-validation splitters
//!
//! Both strategies assign every row to exactly one validation fold and use the
//! complement as that fold's training set. Class proportions in each fold
//! approximate the proportions of the whole target vector.

use crate::error::{FoldwiseError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Cross-validation strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CVStrategy {
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold over groups (a group never spans two folds)
    StratifiedGroupKFold { n_splits: usize, shuffle: bool },
}

impl CVStrategy {
    /// Number of folds the strategy produces
    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::StratifiedKFold { n_splits, .. }
            | CVStrategy::StratifiedGroupKFold { n_splits, .. } => *n_splits,
        }
    }
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 5, shuffle: false }
    }
}

/// A single train/validation split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn strategy(&self) -> CVStrategy {
        self.strategy
    }

    pub fn n_splits(&self) -> usize {
        self.strategy.n_splits()
    }

    /// Generate train/validation splits
    pub fn split(&self, y: &Array1<f64>, groups: Option<&[String]>) -> Result<Vec<CVSplit>> {
        let labels = EncodedLabels::from_target(y)?;

        match self.strategy {
            CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                self.stratified_k_fold_split(&labels, n_splits, shuffle)
            }
            CVStrategy::StratifiedGroupKFold { n_splits, shuffle } => {
                let groups = groups.ok_or_else(|| {
                    FoldwiseError::ConfigError(
                        "StratifiedGroupKFold requires a groups array".to_string(),
                    )
                })?;
                if groups.len() != y.len() {
                    return Err(FoldwiseError::ShapeError {
                        expected: format!("{} group labels", y.len()),
                        actual: format!("{} group labels", groups.len()),
                    });
                }
                self.stratified_group_k_fold_split(&labels, groups, n_splits, shuffle)
            }
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn stratified_k_fold_split(
        &self,
        labels: &EncodedLabels,
        n_splits: usize,
        shuffle: bool,
    ) -> Result<Vec<CVSplit>> {
        let n_samples = labels.codes.len();
        validate_n_splits(n_splits, n_samples)?;
        labels.check_min_members(n_splits)?;

        // Deal the sorted labels round-robin to get each fold's quota per class
        let mut sorted = labels.codes.clone();
        sorted.sort_unstable();
        let mut allocation = vec![vec![0usize; labels.n_classes()]; n_splits];
        for (i, &code) in sorted.iter().enumerate() {
            allocation[i % n_splits][code] += 1;
        }

        let mut rng = shuffle.then(|| self.rng());
        let mut test_folds = vec![0usize; n_samples];

        for class in 0..labels.n_classes() {
            let mut folds_for_class: Vec<usize> = (0..n_splits)
                .flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class]))
                .collect();
            if let Some(rng) = rng.as_mut() {
                folds_for_class.shuffle(rng);
            }

            let rows = labels
                .codes
                .iter()
                .enumerate()
                .filter(|(_, &code)| code == class)
                .map(|(row, _)| row);
            for (row, fold) in rows.zip(folds_for_class) {
                test_folds[row] = fold;
            }
        }

        Ok(splits_from_assignment(&test_folds, n_splits))
    }

    fn stratified_group_k_fold_split(
        &self,
        labels: &EncodedLabels,
        groups: &[String],
        n_splits: usize,
        shuffle: bool,
    ) -> Result<Vec<CVSplit>> {
        let n_samples = labels.codes.len();
        validate_n_splits(n_splits, n_samples)?;
        labels.check_min_members(n_splits)?;

        let mut group_index: HashMap<&str, usize> = HashMap::new();
        let group_codes: Vec<usize> = groups
            .iter()
            .map(|g| {
                let next = group_index.len();
                *group_index.entry(g.as_str()).or_insert(next)
            })
            .collect();
        let n_groups = group_index.len();

        if n_groups < n_splits {
            return Err(FoldwiseError::ConfigError(format!(
                "Number of groups ({}) must be >= n_splits ({})",
                n_groups, n_splits
            )));
        }

        let n_classes = labels.n_classes();
        let mut counts_per_group = vec![vec![0.0f64; n_classes]; n_groups];
        for (&group, &class) in group_codes.iter().zip(&labels.codes) {
            counts_per_group[group][class] += 1.0;
        }
        let class_totals: Vec<f64> = labels.class_counts().iter().map(|&c| c as f64).collect();

        let mut order: Vec<usize> = (0..n_groups).collect();
        if shuffle {
            order.shuffle(&mut self.rng());
        }
        // Place the most class-skewed groups first; sort_by is stable
        let spread: Vec<f64> = counts_per_group.iter().map(|c| std_dev(c)).collect();
        order.sort_by(|&a, &b| spread[b].partial_cmp(&spread[a]).unwrap_or(Ordering::Equal));

        let mut counts_per_fold = vec![vec![0.0f64; n_classes]; n_splits];
        let mut group_to_fold = vec![0usize; n_groups];

        for &group in &order {
            let best = find_best_fold(&counts_per_fold, &class_totals, &counts_per_group[group]);
            for (acc, &count) in counts_per_fold[best].iter_mut().zip(&counts_per_group[group]) {
                *acc += count;
            }
            group_to_fold[group] = best;
        }

        let test_folds: Vec<usize> = group_codes.iter().map(|&g| group_to_fold[g]).collect();
        Ok(splits_from_assignment(&test_folds, n_splits))
    }
}

/// Target labels encoded as dense class codes in order of first appearance
struct EncodedLabels {
    codes: Vec<usize>,
    classes: Vec<f64>,
}

impl EncodedLabels {
    fn from_target(y: &Array1<f64>) -> Result<Self> {
        let mut index: HashMap<u64, usize> = HashMap::new();
        let mut classes = Vec::new();
        let mut codes = Vec::with_capacity(y.len());

        for &value in y.iter() {
            if !value.is_finite() {
                return Err(FoldwiseError::DataError(format!(
                    "target contains a non-finite label ({})",
                    value
                )));
            }
            // -0.0 and 0.0 are the same class
            let key = if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() };
            let code = *index.entry(key).or_insert_with(|| {
                classes.push(value);
                classes.len() - 1
            });
            codes.push(code);
        }

        Ok(Self { codes, classes })
    }

    fn n_classes(&self) -> usize {
        self.classes.len()
    }

    fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes()];
        for &code in &self.codes {
            counts[code] += 1;
        }
        counts
    }

    fn check_min_members(&self, n_splits: usize) -> Result<()> {
        for (class, &count) in self.classes.iter().zip(self.class_counts().iter()) {
            if count < n_splits {
                return Err(FoldwiseError::ConfigError(format!(
                    "n_splits ({}) cannot be greater than the number of members in class {} ({})",
                    n_splits, class, count
                )));
            }
        }
        Ok(())
    }
}

fn validate_n_splits(n_splits: usize, n_samples: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(FoldwiseError::ConfigError(
            "n_splits must be at least 2".to_string(),
        ));
    }
    if n_samples < n_splits {
        return Err(FoldwiseError::ConfigError(format!(
            "n_samples ({}) must be >= n_splits ({})",
            n_samples, n_splits
        )));
    }
    Ok(())
}

/// Turn a row -> validation fold assignment into K splits with sorted indices
fn splits_from_assignment(test_folds: &[usize], n_splits: usize) -> Vec<CVSplit> {
    (0..n_splits)
        .map(|fold_idx| {
            let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                (0..test_folds.len()).partition(|&row| test_folds[row] == fold_idx);
            CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            }
        })
        .collect()
}

/// Fold whose class shares stay most even after taking `group_counts`.
/// Ties go to the fold with fewer samples.
fn find_best_fold(counts_per_fold: &[Vec<f64>], class_totals: &[f64], group_counts: &[f64]) -> usize {
    let mut best_fold = 0;
    let mut min_eval = f64::INFINITY;
    let mut min_samples = f64::INFINITY;

    for candidate in 0..counts_per_fold.len() {
        let fold_eval = class_totals
            .iter()
            .enumerate()
            .map(|(class, &total)| {
                let shares: Vec<f64> = counts_per_fold
                    .iter()
                    .enumerate()
                    .map(|(fold, counts)| {
                        let extra = if fold == candidate { group_counts[class] } else { 0.0 };
                        (counts[class] + extra) / total
                    })
                    .collect();
                std_dev(&shares)
            })
            .sum::<f64>()
            / class_totals.len() as f64;

        let samples_in_fold: f64 = counts_per_fold[candidate].iter().sum();

        if fold_eval < min_eval || (is_close(fold_eval, min_eval) && samples_in_fold < min_samples) {
            best_fold = candidate;
            min_eval = fold_eval;
            min_samples = samples_in_fold;
        }
    }

    best_fold
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

fn is_close(a: f64, b: f64) -> bool {
    if !a.is_finite() || !b.is_finite() {
        return a == b;
    }
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let mean_score = if n_folds > 0 {
            scores.iter().sum::<f64>() / n_folds as f64
        } else {
            0.0
        };
        let std_score = std_dev(&scores);

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }
}
