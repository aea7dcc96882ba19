use std::path::PathBuf;
use std::sync::Arc;
use log::info;

use super::categories::Categories;
use super::dispatcher::Classifier;
use super::error::ClassifierError;
use crate::config::ClassifierConfig;
use crate::model_manager::{ModelManager, ModelSource};
use crate::runtime::RuntimeConfig;
use crate::session::{OnnxSessionProvider, SessionCache};

/// Classifier backed by ONNX Runtime
pub type OnnxClassifier = Classifier<OnnxSessionProvider>;

/// A builder for constructing an [`OnnxClassifier`] with a fluent interface.
///
/// Building does not load the model; that happens on the first
/// classification (or an explicit [`Classifier::warm_up`]).
#[derive(Debug, Default)]
pub struct ClassifierBuilder {
    model: Option<ModelSource>,
    cache_dir: Option<PathBuf>,
    runtime_config: RuntimeConfig,
    categories: Option<Categories>,
}

impl ClassifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a loaded configuration
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            model: Some(config.model.clone()),
            cache_dir: config.cache_dir.clone(),
            runtime_config: config.runtime,
            categories: None,
        }
    }

    /// Sets the model to load: a local path, a `file://` URL or an
    /// `http(s)://` URL
    pub fn with_model(mut self, url: impl Into<String>) -> Self {
        let sha256 = self.model.take().and_then(|m| m.sha256);
        self.model = Some(ModelSource { url: url.into(), sha256 });
        self
    }

    /// Requires the model artifact to hash to `sha256`
    ///
    /// # Errors
    /// - `ModelLoad` if no model has been set yet
    pub fn with_checksum(mut self, sha256: impl Into<String>) -> Result<Self, ClassifierError> {
        let model = self.model.take()
            .ok_or_else(|| ClassifierError::ModelLoad("Set a model before its checksum".into()))?;
        self.model = Some(model.with_sha256(sha256));
        Ok(self)
    }

    /// Directory remote models are downloaded into
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Sets the runtime configuration for ONNX model execution
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Replaces the builtin category table
    pub fn with_categories(mut self, categories: Categories) -> Self {
        self.categories = Some(categories);
        self
    }

    /// Builds the classifier.
    ///
    /// # Errors
    /// - `ModelLoad` if no model was set or the cache directory cannot be created
    pub fn build(self) -> Result<OnnxClassifier, ClassifierError> {
        let model = self.model
            .ok_or_else(|| ClassifierError::ModelLoad("Model URL must be set".into()))?;
        if model.url.is_empty() {
            return Err(ClassifierError::ModelLoad("Model URL cannot be empty".into()));
        }

        let manager = match self.cache_dir {
            Some(dir) => ModelManager::new(dir),
            None => ModelManager::new_default(),
        }
        .map_err(|e| ClassifierError::ModelLoad(format!("Failed to create model cache: {}", e)))?;
        info!("Model cache directory: {:?}", manager.models_dir());

        let provider = OnnxSessionProvider::new(manager, self.runtime_config).with_source(&model);
        let cache = Arc::new(SessionCache::new(provider));
        let classifier = Classifier::new(cache, model.url);

        Ok(match self.categories {
            Some(categories) => classifier.with_categories(categories),
            None => classifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join("incident-classifier-tests").join(name)
    }

    #[test]
    fn test_build_requires_model() {
        let result = ClassifierBuilder::new().with_cache_dir(scratch_dir("builder")).build();
        assert!(matches!(result, Err(ClassifierError::ModelLoad(_))));

        let result = ClassifierBuilder::new()
            .with_model("")
            .with_cache_dir(scratch_dir("builder"))
            .build();
        assert!(matches!(result, Err(ClassifierError::ModelLoad(_))));
    }

    #[test]
    fn test_checksum_requires_model() {
        assert!(ClassifierBuilder::new().with_checksum("abcd").is_err());
    }

    #[test]
    fn test_build_is_lazy() -> Result<(), ClassifierError> {
        // The file does not exist; nothing is loaded until classification.
        let classifier = ClassifierBuilder::new()
            .with_model("/nonexistent/model.onnx")
            .with_checksum("abcd")?
            .with_cache_dir(scratch_dir("builder-lazy"))
            .with_categories(Categories::from_pairs([(1, "Theft")]))
            .build()?;
        assert_eq!(classifier.model_url(), "/nonexistent/model.onnx");
        assert_eq!(classifier.categories().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_model_fails_on_classify() -> Result<(), ClassifierError> {
        let classifier = ClassifierBuilder::new()
            .with_model("/nonexistent/model.onnx")
            .with_cache_dir(scratch_dir("builder-missing"))
            .build()?;
        assert!(matches!(
            classifier.classify("title", "content").await,
            Err(ClassifierError::ModelLoad(_))
        ));
        assert!(classifier.cache().is_empty().await);
        Ok(())
    }
}
