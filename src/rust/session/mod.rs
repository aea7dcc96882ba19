//! Inference sessions and the per-URL session cache.
//!
//! A session is anything that can execute a [`FeedSet`] and hand back an
//! [`InferenceResult`]. The production implementation lives in [`onnx`];
//! tests plug in their own [`SessionProvider`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::classifier::{CategoryId, ClassifierError, FeedSet};

mod cache;
pub mod onnx;

pub use cache::SessionCache;
pub use onnx::OnnxSessionProvider;

/// Name of the model output carrying the predicted category id
pub const LABEL_OUTPUT: &str = "label";

/// A loaded, ready-to-execute model.
#[async_trait]
pub trait InferenceSession: Send + Sync {
    /// Executes the model once against `feeds`.
    async fn run(&self, feeds: &FeedSet) -> Result<InferenceResult, ClassifierError>;
}

/// Builds sessions for model URLs. Called at most once per URL by
/// [`SessionCache`] unless a previous construction failed.
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
    async fn create(&self, url: &str) -> Result<Arc<dyn InferenceSession>, ClassifierError>;
}

/// Data of the model's `label` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelOutput {
    pub data: Vec<CategoryId>,
}

/// Typed view of one model execution's outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceResult {
    pub label: Option<LabelOutput>,
}

impl InferenceResult {
    pub fn with_label(id: CategoryId) -> Self {
        Self {
            label: Some(LabelOutput { data: vec![id] }),
        }
    }

    /// Reads `label -> data[0]`.
    ///
    /// # Errors
    /// - `MalformedResult` if the output is missing or holds no elements
    pub fn label_id(&self) -> Result<CategoryId, ClassifierError> {
        let label = self.label.as_ref().ok_or_else(|| {
            ClassifierError::MalformedResult(format!("missing '{}' output", LABEL_OUTPUT))
        })?;
        label.data.first().copied().ok_or_else(|| {
            ClassifierError::MalformedResult(format!("'{}' output is empty", LABEL_OUTPUT))
        })
    }
}
