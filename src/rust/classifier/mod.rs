mod builder;
mod categories;
mod dispatcher;
mod error;
mod tensor;

pub use builder::{ClassifierBuilder, OnnxClassifier};
pub use categories::{Categories, CategoryId, BUILTIN_CATEGORIES};
pub use dispatcher::{Classifier, Classify, ReportInput};
pub use error::ClassifierError;
pub use tensor::{encode, FeedSet, InputTensor, CLEAN_REPORT, CLEAN_TITLE, STRING_ELEMENT_TYPE};

impl Classifier<crate::session::OnnxSessionProvider> {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::new()
    }
}
