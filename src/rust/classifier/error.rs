use ort::Error as OrtError;

use crate::classifier::CategoryId;
use crate::model_manager::ModelError;

/// Represents the different ways a single classification can fail.
///
/// The type is `Clone` because one session construction failure is handed to
/// every caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    /// The inference session could not be constructed (bad URL, corrupt
    /// artifact, unsupported format, missing inputs/outputs)
    #[error("Model load error: {0}")]
    ModelLoad(String),
    /// The model was loaded but running it failed
    #[error("Execution error: {0}")]
    Execution(String),
    /// The model ran but its output did not contain `label -> data[0]`
    #[error("Malformed result: {0}")]
    MalformedResult(String),
    /// The model produced a category id that has no registry entry
    #[error("Unknown category: {0}")]
    UnknownCategory(CategoryId),
}

impl From<ModelError> for ClassifierError {
    fn from(err: ModelError) -> Self {
        ClassifierError::ModelLoad(err.to_string())
    }
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelLoad(err.to_string())
    }
}
