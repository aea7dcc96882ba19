use std::collections::BTreeMap;

use super::error::ClassifierError;

/// Numeric category code as emitted by the model's `label` output.
pub type CategoryId = i64;

/// The categories the bundled model was trained on.
pub const BUILTIN_CATEGORIES: [(CategoryId, &str); 4] = [
    (9, "Narcotics"),
    (10, "Protests"),
    (11, "Organized Crime"),
    (12, "Corruption"),
];

/// Immutable mapping from category ids to human-readable labels.
///
/// Extending the category set means retraining the model, so a registry is
/// built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categories {
    labels: BTreeMap<CategoryId, String>,
}

impl Default for Categories {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Categories {
    /// Registry matching the bundled incident report model
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_CATEGORIES)
    }

    /// Builds a registry from arbitrary `(id, label)` pairs. A later pair
    /// replaces an earlier one with the same id.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (CategoryId, S)>,
        S: Into<String>,
    {
        Self {
            labels: pairs.into_iter().map(|(id, label)| (id, label.into())).collect(),
        }
    }

    /// Looks up the label for `id`.
    ///
    /// # Errors
    /// - `UnknownCategory` if `id` has no entry
    pub fn label_for(&self, id: CategoryId) -> Result<&str, ClassifierError> {
        self.labels
            .get(&id)
            .map(String::as_str)
            .ok_or(ClassifierError::UnknownCategory(id))
    }

    /// Category ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.labels.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_labels() {
        let categories = Categories::builtin();
        assert_eq!(categories.label_for(9), Ok("Narcotics"));
        assert_eq!(categories.label_for(10), Ok("Protests"));
        assert_eq!(categories.label_for(11), Ok("Organized Crime"));
        assert_eq!(categories.label_for(12), Ok("Corruption"));
        assert_eq!(categories.len(), 4);
    }

    #[test]
    fn test_unknown_ids_fail_explicitly() {
        let categories = Categories::builtin();
        for id in [-1, 0, 8, 13, 42] {
            assert_eq!(
                categories.label_for(id),
                Err(ClassifierError::UnknownCategory(id))
            );
        }
    }

    #[test]
    fn test_custom_registry() {
        let categories = Categories::from_pairs(vec![(2, "Fraud"), (1, "Theft")]);
        assert_eq!(categories.ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(categories.label_for(2), Ok("Fraud"));
        assert!(categories.label_for(9).is_err());
    }
}
