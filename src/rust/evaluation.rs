//! Batch accuracy evaluation against a labelled reference dataset.
//!
//! Every record is classified in input order, one at a time, and the result
//! is compared with two references: the ground-truth `Label` (accuracy) and
//! the reference pipeline's `Prediction` (similarity).

use std::fmt;

use log::{debug, info};
use serde::Serialize;

use crate::classifier::{Categories, CategoryId, ClassifierError, Classify};
use crate::dataset::EvaluationRecord;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("dataset is empty")]
    EmptyDataset,
    #[error("record {index}: reference category {id} is not known")]
    UnknownCategory { index: usize, id: CategoryId },
    #[error("record {index}: classification failed: {source}")]
    BatchExecutionFailure {
        index: usize,
        #[source]
        source: ClassifierError,
    },
}

/// What to do when a record cannot be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure and report it instead of a summary
    #[default]
    Abort,
    /// Count the record as matching neither reference and carry on
    CountAsMismatch,
}

/// Agreement figures for one evaluation run. Percentages are rounded to two
/// decimal places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub total: usize,
    pub correct: usize,
    pub same: usize,
    pub failed: usize,
    pub accuracy: f64,
    pub similarity: f64,
}

impl fmt::Display for EvaluationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Overall accuracy: {}%", self.accuracy)?;
        write!(f, "Similarity to reference: {}%", self.similarity)?;
        if self.failed > 0 {
            write!(f, "\nFailed classifications: {} of {}", self.failed, self.total)?;
        }
        Ok(())
    }
}

/// Runs a classifier over a dataset and scores it.
pub struct Evaluator<C> {
    classifier: C,
    categories: Categories,
    policy: FailurePolicy,
}

impl<C: Classify> Evaluator<C> {
    /// Resolves reference ids against the classifier's own category table,
    /// or the builtin one when the classifier does not expose a table.
    pub fn new(classifier: C) -> Self {
        let categories = classifier
            .categories()
            .cloned()
            .unwrap_or_else(Categories::builtin);
        Self {
            classifier,
            categories,
            policy: FailurePolicy::default(),
        }
    }

    /// Overrides the table used to resolve the records' reference ids
    pub fn with_categories(mut self, categories: Categories) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Classifies every record sequentially and computes accuracy and
    /// similarity.
    ///
    /// # Errors
    /// - `EmptyDataset` if `records` is empty
    /// - `UnknownCategory` if a record's `Label` or `Prediction` is not in the
    ///   category table
    /// - `BatchExecutionFailure` on the first classification failure, under
    ///   [`FailurePolicy::Abort`]
    pub async fn evaluate(&self, records: &[EvaluationRecord]) -> Result<EvaluationSummary, EvaluationError> {
        if records.is_empty() {
            return Err(EvaluationError::EmptyDataset);
        }
        info!("Got {} records to test", records.len());

        let mut correct = 0usize;
        let mut same = 0usize;
        let mut failed = 0usize;

        for (index, record) in records.iter().enumerate() {
            let expected = self.resolve(index, record.label)?;
            let reference = self.resolve(index, record.prediction)?;

            let predicted = match self.classifier.classify(&record.clean_title, &record.clean_report).await {
                Ok(label) => label,
                Err(source) => match self.policy {
                    FailurePolicy::Abort => {
                        return Err(EvaluationError::BatchExecutionFailure { index, source });
                    }
                    FailurePolicy::CountAsMismatch => {
                        debug!("Record {}: classification failed, counted as mismatch: {}", index, source);
                        failed += 1;
                        continue;
                    }
                },
            };

            debug!("Record {}: predicted {}, label {}, reference {}", index, predicted, expected, reference);
            if predicted == expected {
                correct += 1;
            }
            if predicted == reference {
                same += 1;
            }
        }

        let summary = summarize(records.len(), correct, same, failed);
        info!(
            "Evaluation finished: accuracy {}%, similarity {}%",
            summary.accuracy, summary.similarity
        );
        Ok(summary)
    }

    fn resolve(&self, index: usize, id: CategoryId) -> Result<&str, EvaluationError> {
        self.categories
            .label_for(id)
            .map_err(|_| EvaluationError::UnknownCategory { index, id })
    }
}

fn summarize(total: usize, correct: usize, same: usize, failed: usize) -> EvaluationSummary {
    EvaluationSummary {
        total,
        correct,
        same,
        failed,
        accuracy: percentage(correct, total),
        similarity: percentage(same, total),
    }
}

/// `count / total` as a percentage rounded to two decimals; `total` is
/// never zero here.
fn percentage(count: usize, total: usize) -> f64 {
    (count as f64 / total as f64 * 1e4).round() / 1e2
}
