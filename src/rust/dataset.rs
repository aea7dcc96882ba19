use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

use crate::classifier::CategoryId;

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One row of the reference dataset: the report text, the category the
/// reference pipeline predicted, and the ground-truth category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EvaluationRecord {
    pub clean_title: String,
    pub clean_report: String,
    pub prediction: CategoryId,
    pub label: CategoryId,
}

impl EvaluationRecord {
    pub fn new(
        clean_title: impl Into<String>,
        clean_report: impl Into<String>,
        prediction: CategoryId,
        label: CategoryId,
    ) -> Self {
        Self {
            clean_title: clean_title.into(),
            clean_report: clean_report.into(),
            prediction,
            label,
        }
    }
}

/// Parses a JSON array of records. Unknown fields are ignored.
pub fn parse_records(raw: &str) -> Result<Vec<EvaluationRecord>, DatasetError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn load_records(path: &Path) -> Result<Vec<EvaluationRecord>, DatasetError> {
    let raw = fs::read_to_string(path)?;
    let records = parse_records(&raw)?;
    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}
