//! ONNX Runtime backed sessions.
//!
//! Session construction and execution are blocking calls into ONNX Runtime,
//! so both run on tokio's blocking pool.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use ort::session::Session;
use ort::value::{DynValue, Tensor};
use tokio::task;

use super::{InferenceResult, InferenceSession, LabelOutput, SessionProvider, LABEL_OUTPUT};
use crate::classifier::{CategoryId, ClassifierError, FeedSet};
use crate::model_manager::{ModelManager, ModelSource};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Builds [`OnnxSession`]s from model URLs.
#[derive(Debug, Clone)]
pub struct OnnxSessionProvider {
    manager: ModelManager,
    runtime: RuntimeConfig,
    checksums: HashMap<String, String>,
}

impl OnnxSessionProvider {
    pub fn new(manager: ModelManager, runtime: RuntimeConfig) -> Self {
        Self {
            manager,
            runtime,
            checksums: HashMap::new(),
        }
    }

    /// Requires the artifact behind `url` to hash to `sha256`
    pub fn with_checksum(mut self, url: impl Into<String>, sha256: impl Into<String>) -> Self {
        self.checksums.insert(url.into(), sha256.into());
        self
    }

    /// Registers the checksum of `source`, if it has one
    pub fn with_source(self, source: &ModelSource) -> Self {
        match &source.sha256 {
            Some(sha256) => self.with_checksum(source.url.clone(), sha256.clone()),
            None => self,
        }
    }

    pub fn manager(&self) -> &ModelManager {
        &self.manager
    }

    fn source_for(&self, url: &str) -> ModelSource {
        ModelSource {
            url: url.to_owned(),
            sha256: self.checksums.get(url).cloned(),
        }
    }
}

#[async_trait]
impl SessionProvider for OnnxSessionProvider {
    async fn create(&self, url: &str) -> Result<Arc<dyn InferenceSession>, ClassifierError> {
        let path = self.manager.resolve(&self.source_for(url)).await?;
        let runtime = self.runtime;

        let session = task::spawn_blocking(move || load_session(path, &runtime))
            .await
            .map_err(|e| ClassifierError::ModelLoad(format!("session task failed: {}", e)))??;

        info!("Model loaded from {}", url);
        Ok(Arc::new(OnnxSession {
            session: Arc::new(session),
        }))
    }
}

fn load_session(path: PathBuf, runtime: &RuntimeConfig) -> Result<Session, ClassifierError> {
    let session = create_session_builder(runtime)?.commit_from_file(&path)?;
    validate_model(&session)?;
    Ok(session)
}

/// Checks the model declares the `CleanTitle`/`CleanReport` inputs and the
/// `label` output.
fn validate_model(session: &Session) -> Result<(), ClassifierError> {
    let inputs: Vec<&str> = session.inputs.iter().map(|input| input.name.as_str()).collect();
    let outputs: Vec<&str> = session.outputs.iter().map(|output| output.name.as_str()).collect();
    check_signature(&inputs, &outputs)
}

fn check_signature(inputs: &[&str], outputs: &[&str]) -> Result<(), ClassifierError> {
    if let Some(missing) = FeedSet::names().into_iter().find(|name| !inputs.contains(name)) {
        return Err(ClassifierError::ModelLoad(format!("Model has no '{}' input", missing)));
    }
    if !outputs.contains(&LABEL_OUTPUT) {
        return Err(ClassifierError::ModelLoad(format!("Model has no '{}' output", LABEL_OUTPUT)));
    }
    Ok(())
}

/// A loaded ONNX model.
#[derive(Debug)]
pub struct OnnxSession {
    session: Arc<Session>,
}

#[async_trait]
impl InferenceSession for OnnxSession {
    async fn run(&self, feeds: &FeedSet) -> Result<InferenceResult, ClassifierError> {
        let session = Arc::clone(&self.session);
        let feeds = feeds.clone();
        task::spawn_blocking(move || run_blocking(&session, &feeds))
            .await
            .map_err(|e| ClassifierError::Execution(format!("inference task failed: {}", e)))?
    }
}

fn run_blocking(session: &Session, feeds: &FeedSet) -> Result<InferenceResult, ClassifierError> {
    let mut input_tensors = HashMap::new();
    for (name, tensor) in feeds.iter() {
        let value = Tensor::from_string_array(&tensor.as_array()).map_err(|e| {
            ClassifierError::Execution(format!("Failed to create '{}' tensor: {}", name, e))
        })?;
        input_tensors.insert(name, value);
    }

    let outputs = session
        .run(input_tensors)
        .map_err(|e| ClassifierError::Execution(format!("Failed to run model: {}", e)))?;

    let label = match outputs.get(LABEL_OUTPUT) {
        Some(value) => Some(LabelOutput {
            data: extract_label_data(value)?,
        }),
        None => None,
    };
    Ok(InferenceResult { label })
}

/// Reads the `label` output as category ids. Classifiers exported from
/// scikit-learn emit int64; int32 and integral float32 are accepted too.
fn extract_label_data(value: &DynValue) -> Result<Vec<CategoryId>, ClassifierError> {
    if let Ok(data) = value.try_extract_tensor::<i64>() {
        return Ok(data.iter().copied().collect());
    }
    if let Ok(data) = value.try_extract_tensor::<i32>() {
        return Ok(data.iter().map(|&v| CategoryId::from(v)).collect());
    }
    let data = value.try_extract_tensor::<f32>().map_err(|e| {
        ClassifierError::MalformedResult(format!("'{}' output is not numeric: {}", LABEL_OUTPUT, e))
    })?;
    data.iter()
        .map(|&v| {
            if v.fract() == 0.0 {
                Ok(v as CategoryId)
            } else {
                Err(ClassifierError::MalformedResult(format!(
                    "'{}' output holds non-integral value {}",
                    LABEL_OUTPUT, v
                )))
            }
        })
        .collect()
}
