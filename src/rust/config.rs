use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use log::warn;

use crate::model_manager::{ModelSource, CACHE_ENV};
use crate::runtime::RuntimeConfig;

pub const MODEL_URL_ENV: &str = "INCIDENT_CLASSIFIER_MODEL_URL";
pub const MODEL_SHA256_ENV: &str = "INCIDENT_CLASSIFIER_MODEL_SHA256";
pub const INTRA_THREADS_ENV: &str = "INCIDENT_CLASSIFIER_INTRA_THREADS";
pub const INTER_THREADS_ENV: &str = "INCIDENT_CLASSIFIER_INTER_THREADS";
pub const OPT_LEVEL_ENV: &str = "INCIDENT_CLASSIFIER_OPT_LEVEL";

/// Model used when nothing else is configured
pub const DEFAULT_MODEL_URL: &str = "model.onnx";

/// Everything needed to build a classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub model: ModelSource,
    /// `None` means [`ModelManager::get_default_models_dir`](crate::ModelManager::get_default_models_dir)
    pub cache_dir: Option<PathBuf>,
    pub runtime: RuntimeConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: ModelSource::new(DEFAULT_MODEL_URL),
            cache_dir: None,
            runtime: RuntimeConfig::default(),
        }
    }
}

impl ClassifierConfig {
    /// Reads the configuration from `INCIDENT_CLASSIFIER_*` environment
    /// variables, falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut model = ModelSource::new(
            env::var(MODEL_URL_ENV).unwrap_or_else(|_| DEFAULT_MODEL_URL.to_string()),
        );
        if let Ok(sha256) = env::var(MODEL_SHA256_ENV) {
            model = model.with_sha256(sha256);
        }

        let cache_dir = env::var(CACHE_ENV).ok().map(|dir| PathBuf::from(dir).join("models"));

        let mut runtime = RuntimeConfig::default();
        if let Some(threads) = parsed_var(INTRA_THREADS_ENV) {
            runtime.intra_threads = threads;
        }
        if let Some(threads) = parsed_var(INTER_THREADS_ENV) {
            runtime.inter_threads = threads;
        }
        if let Some(level) = parsed_var(OPT_LEVEL_ENV) {
            runtime.optimization_level = level;
        }

        Self {
            model,
            cache_dir,
            runtime,
        }
    }
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", name, value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::OptimizationLevel;

    // One test touches the environment so parallel tests cannot race on it.
    #[test]
    fn test_from_env() {
        env::remove_var(MODEL_URL_ENV);
        env::remove_var(MODEL_SHA256_ENV);
        env::remove_var(INTRA_THREADS_ENV);
        env::remove_var(INTER_THREADS_ENV);
        env::remove_var(OPT_LEVEL_ENV);
        let config = ClassifierConfig::from_env();
        assert_eq!(config.model, ModelSource::new(DEFAULT_MODEL_URL));
        assert_eq!(config.runtime, RuntimeConfig::default());

        env::set_var(MODEL_URL_ENV, "https://example.com/model.onnx");
        env::set_var(MODEL_SHA256_ENV, "ABC123");
        env::set_var(INTRA_THREADS_ENV, "4");
        env::set_var(INTER_THREADS_ENV, "2");
        env::set_var(OPT_LEVEL_ENV, "basic");
        let config = ClassifierConfig::from_env();
        assert_eq!(config.model.url, "https://example.com/model.onnx");
        assert_eq!(config.model.sha256.as_deref(), Some("abc123"));
        assert_eq!(config.runtime.intra_threads, 4);
        assert_eq!(config.runtime.inter_threads, 2);
        assert_eq!(config.runtime.optimization_level, OptimizationLevel::Basic);

        env::set_var(INTRA_THREADS_ENV, "many");
        env::set_var(OPT_LEVEL_ENV, "fastest");
        let config = ClassifierConfig::from_env();
        assert_eq!(config.runtime.intra_threads, 0);
        assert_eq!(config.runtime.optimization_level, OptimizationLevel::All);

        env::remove_var(MODEL_URL_ENV);
        env::remove_var(MODEL_SHA256_ENV);
        env::remove_var(INTRA_THREADS_ENV);
        env::remove_var(INTER_THREADS_ENV);
        env::remove_var(OPT_LEVEL_ENV);
    }
}
