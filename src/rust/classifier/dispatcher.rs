use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};

use super::categories::Categories;
use super::error::ClassifierError;
use super::tensor::FeedSet;
use crate::session::{InferenceSession, SessionCache, SessionProvider};

/// One incident report as typed by the user. No normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportInput {
    pub title: String,
    pub content: String,
}

impl ReportInput {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Anything that can turn a report into a category label.
///
/// Implemented by [`Classifier`]; the batch evaluator is written against this
/// trait so it can be driven by other classifiers as well.
#[async_trait]
pub trait Classify: Send + Sync {
    async fn classify(&self, title: &str, content: &str) -> Result<String, ClassifierError>;

    /// Category table the returned labels come from, when the classifier
    /// has one
    fn categories(&self) -> Option<&Categories> {
        None
    }
}

/// Classifies incident reports with a model loaded through a [`SessionCache`].
///
/// Each call executes the model at most once; there are no retries and no
/// timeout. Failures are returned to the caller, who decides how to degrade.
pub struct Classifier<P: SessionProvider> {
    cache: Arc<SessionCache<P>>,
    model_url: String,
    categories: Arc<Categories>,
}

impl<P: SessionProvider> Classifier<P> {
    /// Classifier for `model_url` using the builtin category table
    pub fn new(cache: Arc<SessionCache<P>>, model_url: impl Into<String>) -> Self {
        Self {
            cache,
            model_url: model_url.into(),
            categories: Arc::new(Categories::builtin()),
        }
    }

    /// Replaces the category table; it must match the model's label ids
    pub fn with_categories(mut self, categories: Categories) -> Self {
        self.categories = Arc::new(categories);
        self
    }

    pub fn model_url(&self) -> &str {
        &self.model_url
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn cache(&self) -> &SessionCache<P> {
        &self.cache
    }

    /// Loads the model ahead of the first classification
    pub async fn warm_up(&self) -> Result<(), ClassifierError> {
        self.session().await.map(|_| ())
    }

    /// Predicts the category of a report.
    ///
    /// # Errors
    /// - `ModelLoad` if the session could not be constructed
    /// - `Execution` if running the model failed
    /// - `MalformedResult` if the output has no `label -> data[0]`
    /// - `UnknownCategory` if the predicted id is not in the category table
    pub async fn classify(&self, title: &str, content: &str) -> Result<String, ClassifierError> {
        match self.run_inference(title, content).await {
            Ok(label) => Ok(label),
            Err(e) => {
                warn!("failed to run ONNX model: {}", e);
                Err(e)
            }
        }
    }

    pub async fn classify_report(&self, report: &ReportInput) -> Result<String, ClassifierError> {
        self.classify(&report.title, &report.content).await
    }

    async fn session(&self) -> Result<Arc<dyn InferenceSession>, ClassifierError> {
        self.cache.get_session(&self.model_url).await
    }

    async fn run_inference(&self, title: &str, content: &str) -> Result<String, ClassifierError> {
        let session = self.session().await?;
        let feeds = FeedSet::from_report(title, content);
        let result = session.run(&feeds).await?;
        let id = result.label_id()?;
        let label = self.categories.label_for(id)?;
        debug!("Model predicted category {} ({})", id, label);
        Ok(label.to_owned())
    }
}

#[async_trait]
impl<P: SessionProvider> Classify for Classifier<P> {
    async fn classify(&self, title: &str, content: &str) -> Result<String, ClassifierError> {
        Classifier::classify(self, title, content).await
    }

    fn categories(&self) -> Option<&Categories> {
        Some(Classifier::categories(self))
    }
}

#[async_trait]
impl<T: Classify + ?Sized> Classify for &T {
    async fn classify(&self, title: &str, content: &str) -> Result<String, ClassifierError> {
        (**self).classify(title, content).await
    }

    fn categories(&self) -> Option<&Categories> {
        (**self).categories()
    }
}

#[async_trait]
impl<T: Classify + ?Sized> Classify for Arc<T> {
    async fn classify(&self, title: &str, content: &str) -> Result<String, ClassifierError> {
        (**self).classify(title, content).await
    }

    fn categories(&self) -> Option<&Categories> {
        (**self).categories()
    }
}
