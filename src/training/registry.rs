//! Name -> factory lookup for models referenced from configuration

use crate::error::{FoldwiseError, Result};
use crate::training::dummy::DummyClassifier;
use crate::training::linear_models::LogisticRegression;
use crate::training::models::ModelFactory;
use crate::training::naive_bayes::GaussianNaiveBayes;
use std::collections::BTreeMap;

/// Registry of model factories keyed by name
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    factories: BTreeMap<String, ModelFactory>,
}

impl ModelRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the models shipped in this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ModelFactory::of::<LogisticRegression>("logistic_regression"));
        registry.register(ModelFactory::of::<GaussianNaiveBayes>("gaussian_nb"));
        registry.register(ModelFactory::of::<DummyClassifier>("dummy"));
        registry
    }

    /// Add or replace a factory under its own name
    pub fn register(&mut self, factory: ModelFactory) -> &mut Self {
        self.factories.insert(factory.name().to_string(), factory);
        self
    }

    pub fn get(&self, name: &str) -> Result<&ModelFactory> {
        self.factories.get(name).ok_or_else(|| {
            FoldwiseError::ConfigError(format!(
                "unknown model '{}' (available: {})",
                name,
                self.names().join(", ")
            ))
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}
