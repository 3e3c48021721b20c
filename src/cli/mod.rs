//! foldwise CLI module
//!
//! Thin command-line wrapper: inspect a fold partition, or run an ensemble
//! over every fold and write the fold-averaged test probabilities.

use clap::{Args, Parser, Subcommand};
use colored::*;
use ndarray::Array1;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::ensemble::{aggregate, Aggregation, EnsembleConfig, Ensembler, ModelEntry};
use crate::training::{CVResults, FoldConfig, FoldGenerator, ModelMetrics, ModelParams, ModelRegistry};
use crate::utils::DataSaver;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "foldwise")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Stratified cross-validation folds and probability ensembling for tabular data")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the fold partition of a train/test pair
    Folds {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Fit an ensemble on every fold and average its test probabilities
    Ensemble {
        #[command(flatten)]
        data: DataArgs,

        /// Ensemble description (JSON); logistic regression + Gaussian NB when omitted
        #[arg(short, long)]
        models: Option<PathBuf>,

        /// How model probabilities are combined (mean, median)
        #[arg(long, default_value = "mean")]
        aggregation: String,

        /// Output CSV for the test probabilities
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Table and fold options shared by all commands
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Training table (CSV, TSV or Parquet)
    #[arg(long)]
    pub train: PathBuf,

    /// Test table with the same feature columns
    #[arg(long)]
    pub test: PathBuf,

    /// Target column name
    #[arg(short, long)]
    pub target: Option<String>,

    /// Number of folds
    #[arg(short = 'k', long)]
    pub folds: Option<usize>,

    /// Group column; rows of one group never straddle train and validation
    #[arg(short, long)]
    pub group: Option<String>,

    /// Columns to leave out of the features (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Shuffle fold assignment
    #[arg(long)]
    pub shuffle: bool,

    /// Seed for --shuffle
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fold configuration (JSON); command-line flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl DataArgs {
    /// Merge the optional config file with the command-line flags
    pub fn fold_config(&self) -> anyhow::Result<FoldConfig> {
        let mut config = match (&self.config, &self.target) {
            (Some(path), _) => FoldConfig::from_json_file(path)?,
            (None, Some(target)) => FoldConfig::new(target.as_str()),
            (None, None) => anyhow::bail!("either --target or --config is required"),
        };

        if let Some(target) = &self.target {
            config.target_col = target.clone();
        }
        if let Some(k) = self.folds {
            config.n_splits = k;
        }
        if let Some(group) = &self.group {
            config.group_col = Some(group.clone());
        }
        if !self.exclude.is_empty() {
            config.exclude_cols.extend(self.exclude.iter().cloned());
        }
        if self.shuffle {
            config.shuffle = true;
        }
        if let Some(seed) = self.seed {
            config.random_state = Some(seed);
        }

        Ok(config)
    }
}

fn parse_aggregation(name: &str) -> anyhow::Result<Aggregation> {
    match name {
        "mean" => Ok(Aggregation::Mean),
        "median" => Ok(Aggregation::Median),
        _ => anyhow::bail!("Invalid aggregation: {} (expected mean or median)", name),
    }
}

fn default_ensemble() -> EnsembleConfig {
    EnsembleConfig {
        models: vec![
            ModelEntry {
                model: "logistic_regression".to_string(),
                params: ModelParams::new(),
            },
            ModelEntry {
                model: "gaussian_nb".to_string(),
                params: ModelParams::new(),
            },
        ],
        save_path: None,
    }
}

fn load_folds(data: &DataArgs) -> anyhow::Result<FoldGenerator> {
    let config = data.fold_config()?;

    step_run("Loading tables");
    let generator = FoldGenerator::new(&data.train, &data.test, config)?;
    step_done(&format!(
        "{} train rows, {} test rows, {} features",
        generator.features().nrows(),
        generator.test_features().nrows(),
        generator.feature_names().len()
    ));

    Ok(generator)
}

// ─── Folds ─────────────────────────────────────────────────────────────────────

pub fn cmd_folds(data: &DataArgs) -> anyhow::Result<()> {
    section("Folds");

    let generator = load_folds(data)?;
    let config = generator.config();

    println!("  {:<12} {}", muted("Target"), config.target_col);
    println!("  {:<12} {}", muted("Group"), config.group_col.as_deref().unwrap_or("-"));
    if let Some(labels) = generator.class_labels() {
        println!("  {:<12} {}", muted("Classes"), labels.join(", "));
    }
    println!("  {:<12} {}", muted("Features"), generator.feature_names().join(", "));
    println!();

    println!(
        "  {:<6} {:>8} {:>8} {:>10} {:>10}",
        muted("Fold"),
        muted("Train"),
        muted("Valid"),
        muted("Train +"),
        muted("Valid +")
    );
    println!("  {}", dim(&"─".repeat(46)));

    let positive = generator.positive_label();
    for fold in &generator {
        println!(
            "  {:<6} {:>8} {:>8} {:>10.3} {:>10.3}",
            fold.index,
            fold.train.len(),
            fold.validation.len(),
            fold.train.label_rate(positive),
            fold.validation.label_rate(positive)
        );
    }

    println!();
    Ok(())
}

// ─── Ensemble ──────────────────────────────────────────────────────────────────

pub fn cmd_ensemble(
    data: &DataArgs,
    models: Option<&Path>,
    aggregation: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Ensemble");

    let method = parse_aggregation(aggregation)?;
    let ensemble_config = match models {
        Some(path) => EnsembleConfig::from_json_file(path)?,
        None => default_ensemble(),
    };
    let registry = ModelRegistry::builtin();

    let generator = load_folds(data)?;

    println!();
    println!(
        "  {:<6} {:>10} {:>10} {:>10}",
        muted("Fold"),
        muted("Accuracy"),
        muted("Log loss"),
        muted("Time")
    );
    println!("  {}", dim(&"─".repeat(40)));

    let mut accuracies = Vec::with_capacity(generator.len());
    let mut test_sum = Array1::<f64>::zeros(generator.test_features().nrows());

    for fold in &generator {
        let start = Instant::now();
        let ((x_train, y_train), (x_val, y_val), x_test) = fold.into_parts();

        let mut ensembler = Ensembler::from_config(&ensemble_config, &registry)?;
        ensembler.fit(&x_train, &y_train)?;

        let val_proba = aggregate(&ensembler.predict_proba(&x_val)?, &method)?;
        let metrics = ModelMetrics::compute_classification(&y_val, &val_proba)?;
        test_sum += &aggregate(&ensembler.predict_proba(x_test)?, &method)?;

        let accuracy = metrics.accuracy.unwrap_or(0.0);
        accuracies.push(accuracy);

        println!(
            "  {:<6} {:>10.4} {:>10.4} {:>10.2?}",
            accuracies.len() - 1,
            accuracy,
            metrics.log_loss.unwrap_or(f64::NAN),
            start.elapsed()
        );
    }

    println!("  {}", dim(&"─".repeat(40)));

    let results = CVResults::from_scores(accuracies);
    println!(
        "  {} {} {:.4} ± {:.4}",
        ok("cv"),
        muted("accuracy:"),
        results.mean_score,
        results.std_score
    );

    if let Some(path) = output {
        let test_proba = test_sum / generator.len() as f64;
        let mut df = df!("probability" => test_proba.to_vec())?;
        DataSaver::save_csv(&mut df, path)?;
        step_ok(&format!("Test probabilities written to {}", path.display()));
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DataArgs {
        DataArgs {
            train: PathBuf::from("train.csv"),
            test: PathBuf::from("test.csv"),
            target: Some("y".to_string()),
            folds: Some(3),
            group: None,
            exclude: vec!["id".to_string()],
            shuffle: false,
            seed: None,
            config: None,
        }
    }

    #[test]
    fn test_fold_config_from_flags() {
        let config = args().fold_config().unwrap();
        assert_eq!(config.target_col, "y");
        assert_eq!(config.n_splits, 3);
        assert_eq!(config.exclude_cols, vec!["id".to_string()]);
    }

    #[test]
    fn test_fold_config_requires_target() {
        let mut args = args();
        args.target = None;
        assert!(args.fold_config().is_err());
    }

    #[test]
    fn test_cli_parses_ensemble() {
        let cli = Cli::try_parse_from([
            "foldwise", "ensemble", "--train", "a.csv", "--test", "b.csv", "-t", "label",
            "--exclude", "id,ts", "--aggregation", "median",
        ])
        .unwrap();

        match cli.command {
            Commands::Ensemble { data, aggregation, .. } => {
                assert_eq!(data.exclude, vec!["id".to_string(), "ts".to_string()]);
                assert_eq!(aggregation, "median");
            }
            Commands::Folds { .. } => panic!("expected ensemble command"),
        }
    }

    #[test]
    fn test_parse_aggregation() {
        assert_eq!(parse_aggregation("mean").unwrap(), Aggregation::Mean);
        assert!(parse_aggregation("vote").is_err());
    }
}
