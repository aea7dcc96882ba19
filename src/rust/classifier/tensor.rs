use ndarray::{Array2, CowArray, IxDyn};

/// Model input name for the report title
pub const CLEAN_TITLE: &str = "CleanTitle";
/// Model input name for the report body
pub const CLEAN_REPORT: &str = "CleanReport";

/// Element type of every tensor the model accepts.
pub const STRING_ELEMENT_TYPE: &str = "string";

/// A `[1, 1]` string tensor holding one raw text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTensor {
    values: Array2<String>,
}

impl InputTensor {
    /// Element type name as understood by the model
    pub fn element_type(&self) -> &'static str {
        STRING_ELEMENT_TYPE
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Number of elements (always 1)
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The single string element
    pub fn value(&self) -> &str {
        self.values[[0, 0]].as_str()
    }

    /// Dynamic-rank, standard-layout view suitable for handing to a runtime
    pub fn as_array(&self) -> CowArray<'_, String, IxDyn> {
        CowArray::from(self.values.view().into_dyn())
    }
}

/// Wraps `text` into the tensor shape the model expects.
///
/// Never fails: empty strings are valid and no normalization is applied.
pub fn encode(text: &str) -> InputTensor {
    InputTensor {
        values: Array2::from_elem((1, 1), text.to_owned()),
    }
}

/// The named inputs for one model execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSet {
    title: InputTensor,
    report: InputTensor,
}

impl FeedSet {
    pub fn new(title: InputTensor, report: InputTensor) -> Self {
        Self { title, report }
    }

    /// Encodes both report fields and binds them to the model's input names
    pub fn from_report(title: &str, content: &str) -> Self {
        Self::new(encode(title), encode(content))
    }

    /// Looks up a tensor by its exact, case-sensitive input name
    pub fn get(&self, name: &str) -> Option<&InputTensor> {
        match name {
            CLEAN_TITLE => Some(&self.title),
            CLEAN_REPORT => Some(&self.report),
            _ => None,
        }
    }

    /// Entries in model input order: `CleanTitle`, then `CleanReport`
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &InputTensor)> {
        [(CLEAN_TITLE, &self.title), (CLEAN_REPORT, &self.report)].into_iter()
    }

    /// Input names the model must declare
    pub fn names() -> [&'static str; 2] {
        [CLEAN_TITLE, CLEAN_REPORT]
    }
}
