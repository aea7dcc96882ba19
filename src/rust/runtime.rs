use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;

use crate::classifier::ClassifierError;

static ENVIRONMENT: OnceLock<Result<(), String>> = OnceLock::new();

/// Graph optimization applied when a model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    Disable,
    Basic,
    Extended,
    #[default]
    All,
}

impl OptimizationLevel {
    fn to_ort(self) -> GraphOptimizationLevel {
        match self {
            OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
            OptimizationLevel::Basic => GraphOptimizationLevel::Level1,
            OptimizationLevel::Extended => GraphOptimizationLevel::Level2,
            OptimizationLevel::All => GraphOptimizationLevel::Level3,
        }
    }
}

impl FromStr for OptimizationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disable" | "none" | "0" => Ok(OptimizationLevel::Disable),
            "basic" | "1" => Ok(OptimizationLevel::Basic),
            "extended" | "2" => Ok(OptimizationLevel::Extended),
            "all" | "3" => Ok(OptimizationLevel::All),
            other => Err(format!("unknown optimization level '{}'", other)),
        }
    }
}

impl fmt::Display for OptimizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizationLevel::Disable => "disable",
            OptimizationLevel::Basic => "basic",
            OptimizationLevel::Extended => "extended",
            OptimizationLevel::All => "all",
        };
        f.write_str(name)
    }
}

/// ONNX Runtime settings for every session a provider builds. A thread
/// count of 0 leaves the choice to ONNX Runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: OptimizationLevel,
}

/// Commits the process-wide ONNX Runtime environment on first use. The
/// outcome of that first attempt is kept and reported on every later call.
fn ensure_environment() -> Result<(), ClassifierError> {
    ENVIRONMENT
        .get_or_init(|| {
            ort::init()
                .with_name("incident-classifier")
                .commit()
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .clone()
        .map_err(|e| ClassifierError::ModelLoad(format!("ONNX Runtime environment unavailable: {}", e)))
}

/// Session builder carrying the threading and optimization settings of
/// `config`.
pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_environment()?;
    let mut builder = Session::builder()?;
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    Ok(builder.with_optimization_level(config.optimization_level.to_ort())?)
}
