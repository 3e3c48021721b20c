//! Integration test: ensembling over cross-validation folds

use foldwise::prelude::*;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn separable_df(n_rows: usize) -> DataFrame {
    labelled_df(n_rows, 0.0, 1.0)
}

/// Separable features with `negative` / `positive` as the target labels
fn labelled_df(n_rows: usize, negative: f64, positive: f64) -> DataFrame {
    let target: Vec<f64> = (0..n_rows).map(|i| (i % 2) as f64).collect();
    let x1: Vec<f64> = target
        .iter()
        .enumerate()
        .map(|(i, &y)| y * 4.0 + (i % 5) as f64 * 0.1)
        .collect();
    let x2: Vec<f64> = target
        .iter()
        .enumerate()
        .map(|(i, &y)| -y * 2.0 + (i % 3) as f64 * 0.2)
        .collect();
    let labels: Vec<f64> = target
        .iter()
        .map(|&y| if y == 1.0 { positive } else { negative })
        .collect();
    df!("x1" => x1, "x2" => x2, "target" => labels).unwrap()
}

fn default_factories() -> Vec<ModelFactory> {
    let registry = ModelRegistry::builtin();
    vec![
        registry.get("logistic_regression").unwrap().clone(),
        registry.get("gaussian_nb").unwrap().clone(),
    ]
}

/// Fails on fit; counts how often it was asked to
struct FailingClassifier {
    fits: Arc<AtomicUsize>,
}

impl Classifier for FailingClassifier {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> foldwise::Result<()> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        Err(FoldwiseError::ModelError("does not converge".to_string()))
    }

    fn predict_proba(&self, _x: &Array2<f64>) -> foldwise::Result<Array2<f64>> {
        Err(FoldwiseError::ModelNotFitted)
    }
}

/// Constant classifier that counts its fits
struct CountingClassifier {
    fits: Arc<AtomicUsize>,
}

impl Classifier for CountingClassifier {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> foldwise::Result<()> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> foldwise::Result<Array2<f64>> {
        Ok(Array2::from_elem((x.nrows(), 2), 0.5))
    }
}

#[test]
fn test_arity_mismatch() {
    let registry = ModelRegistry::builtin();
    let factories = vec![
        registry.get("logistic_regression").unwrap().clone(),
        registry.get("gaussian_nb").unwrap().clone(),
        registry.get("dummy").unwrap().clone(),
    ];
    let result = Ensembler::new(factories, vec![ModelParams::new(), ModelParams::new()], None);

    let err = result.unwrap_err();
    assert!(matches!(err, FoldwiseError::ArityMismatch { models: 3, params: 2 }));
    assert!(err.to_string().contains("3 models but 2 parameter sets"));
}

#[test]
fn test_single_model_rejected() {
    let registry = ModelRegistry::builtin();
    let result = Ensembler::new(
        vec![registry.get("dummy").unwrap().clone()],
        vec![ModelParams::new()],
        None,
    );
    assert!(matches!(result, Err(FoldwiseError::ConfigError(_))));
}

#[test]
fn test_constant_predictions_matrix() {
    let config: EnsembleConfig = serde_json::from_str(
        r#"{
            "models": [
                {"model": "dummy", "params": {"constant": 0.25}},
                {"model": "dummy", "params": {"constant": 0.75}}
            ],
            "save_path": "out/models"
        }"#,
    )
    .unwrap();
    let mut ensembler = Ensembler::from_config(&config, &ModelRegistry::builtin()).unwrap();

    let x = Array2::from_elem((4, 3), 1.0);
    ensembler.fit(&x, &Array1::from(vec![0.0, 1.0, 1.0, 0.0])).unwrap();

    let preds = ensembler.predict_proba(&x).unwrap();
    assert_eq!(preds.dim(), (2, 4));
    assert!(preds.row(0).iter().all(|&p| (p - 0.25).abs() < 1e-12));
    assert!(preds.row(1).iter().all(|&p| (p - 0.75).abs() < 1e-12));

    let mean = aggregate(&preds, &Aggregation::Mean).unwrap();
    assert!(mean.iter().all(|&p| (p - 0.5).abs() < 1e-12));
}

#[test]
fn test_fit_failure_stops_remaining_models() {
    let failing_fits = Arc::new(AtomicUsize::new(0));
    let later_fits = Arc::new(AtomicUsize::new(0));

    let failing = {
        let fits = failing_fits.clone();
        ModelFactory::new("failing", move |_| {
            let model: Box<dyn Classifier> = Box::new(FailingClassifier { fits: fits.clone() });
            Ok(model)
        })
    };
    let counting = {
        let fits = later_fits.clone();
        ModelFactory::new("counting", move |_| {
            let model: Box<dyn Classifier> = Box::new(CountingClassifier { fits: fits.clone() });
            Ok(model)
        })
    };

    let mut ensembler = Ensembler::new(
        vec![failing, counting],
        vec![ModelParams::new(), ModelParams::new()],
        None,
    )
    .unwrap();

    let x = Array2::zeros((4, 2));
    let result = ensembler.fit(&x, &Array1::from(vec![0.0, 1.0, 0.0, 1.0]));

    assert!(matches!(result, Err(FoldwiseError::ModelError(_))));
    assert_eq!(failing_fits.load(Ordering::SeqCst), 1);
    assert_eq!(later_fits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_predict_before_fit_fails() {
    let ensembler = Ensembler::new(
        default_factories(),
        vec![ModelParams::new(), ModelParams::new()],
        None,
    )
    .unwrap();
    let result = ensembler.predict_proba(&Array2::zeros((3, 2)));
    assert!(matches!(result, Err(FoldwiseError::ModelNotFitted)));
}

#[test]
fn test_ensemble_over_folds() {
    let train = separable_df(60);
    let test = separable_df(12).drop("target").unwrap();
    let folds = FoldGenerator::new(train, test, FoldConfig::new("target").with_n_splits(3)).unwrap();

    let mut test_sum = Array1::<f64>::zeros(12);
    let mut accuracies = Vec::new();

    for fold in &folds {
        let ((x_train, y_train), (x_val, y_val), x_test) = fold.into_parts();

        let mut ensembler = Ensembler::new(
            default_factories(),
            vec![ModelParams::new(), ModelParams::new()],
            None,
        )
        .unwrap();
        ensembler.fit(&x_train, &y_train).unwrap();

        let val = ensembler.predict_proba(&x_val).unwrap();
        assert_eq!(val.dim(), (2, x_val.nrows()));
        assert!(val.iter().all(|&p| (0.0..=1.0).contains(&p)));

        let combined = aggregate(&val, &Aggregation::Mean).unwrap();
        let metrics = ModelMetrics::compute_classification(&y_val, &combined).unwrap();
        accuracies.push(metrics.accuracy.unwrap());

        test_sum += &aggregate(&ensembler.predict_proba(x_test).unwrap(), &Aggregation::Mean).unwrap();
    }

    let results = CVResults::from_scores(accuracies);
    assert!(results.mean_score > 0.9, "mean accuracy {}", results.mean_score);

    let test_proba = test_sum / folds.len() as f64;
    assert_eq!(test_proba.len(), 12);
    assert!(test_proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
}

#[test]
fn test_one_two_labels_over_folds() {
    let train = labelled_df(40, 1.0, 2.0);
    let test = separable_df(4).drop("target").unwrap();

    let folds = FoldGenerator::new(train, test, FoldConfig::new("target").with_n_splits(2)).unwrap();

    for fold in &folds {
        let ((x_train, y_train), (x_val, y_val), _) = fold.into_parts();
        let mut ensembler = Ensembler::new(
            default_factories(),
            vec![ModelParams::new(), ModelParams::new()],
            None,
        )
        .unwrap();
        ensembler.fit(&x_train, &y_train).unwrap();

        let combined = aggregate(&ensembler.predict_proba(&x_val).unwrap(), &Aggregation::Mean).unwrap();
        for (p, label) in combined.iter().zip(y_val.iter()) {
            if *label == 2.0 {
                assert!(*p > 0.5, "label 2 scored {}", p);
            } else {
                assert!(*p < 0.5, "label 1 scored {}", p);
            }
        }
    }
}
