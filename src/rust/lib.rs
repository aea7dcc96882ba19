//! In-process classification of incident reports with a pre-trained ONNX
//! model, plus batch evaluation against a labelled reference dataset.
//!
//! # Basic Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use incident_classifier::Classifier;
//!
//! let classifier = Classifier::builder()
//!     .with_model("assets/model.onnx")
//!     .build()?;
//!
//! match classifier.classify("Protest at city hall", "Hundreds gathered...").await {
//!     Ok(category) => println!("I think this is in the {} category", category),
//!     Err(e) => println!("Classification unavailable: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Batch Evaluation
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use incident_classifier::{load_records, Classifier, Evaluator};
//! use std::path::Path;
//!
//! let classifier = Classifier::builder().with_model("assets/model.onnx").build()?;
//! let records = load_records(Path::new("assets/data.json"))?;
//! let summary = Evaluator::new(&classifier).evaluate(&records).await?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```
//!
//! Sessions are cached per model URL inside [`SessionCache`]; the model is
//! loaded once no matter how many reports are classified.

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod model_manager;
mod runtime;
pub mod session;

pub use classifier::{
    encode, Categories, CategoryId, Classifier, ClassifierBuilder, ClassifierError, Classify,
    FeedSet, InputTensor, OnnxClassifier, ReportInput,
};
pub use config::ClassifierConfig;
pub use dataset::{load_records, parse_records, DatasetError, EvaluationRecord};
pub use evaluation::{EvaluationError, EvaluationSummary, Evaluator, FailurePolicy};
pub use model_manager::{ModelError, ModelManager, ModelSource};
pub use runtime::{create_session_builder, OptimizationLevel, RuntimeConfig};
pub use session::{
    InferenceResult, InferenceSession, LabelOutput, OnnxSessionProvider, SessionCache,
    SessionProvider,
};

pub fn init_logger() {
    env_logger::init();
}
