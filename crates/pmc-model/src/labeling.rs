//! Assignment of atomic propositions (labels) to states

use std::{
    collections::{BTreeMap, BTreeSet},
    error, fmt,
};

use pmc_display_utils::join_quoted;

/// Label assigned to the initial states of a model
pub const INITIAL_LABEL: &str = "init";

/// Label that marks states whose missing outgoing transitions were fixed
pub const DEADLOCK_LABEL: &str = "deadlock";

/// Labeling of states with a set of declared labels
///
/// Labels have to be declared before they can be assigned to a state. States
/// are not bounded by the labeling itself, the model owning the labeling is
/// responsible for checking that every labeled state exists.
///
/// # Example
///
/// ```
/// use pmc_model::labeling::StateLabeling;
///
/// let mut labeling = StateLabeling::new();
/// labeling.declare_label("init").unwrap();
/// labeling.declare_label("done").unwrap();
///
/// labeling.add_label_to_state("init", 0).unwrap();
/// labeling.add_label_to_state("done", 7).unwrap();
///
/// assert!(labeling.state_has_label(7, "done"));
/// assert_eq!(labeling.highest_labeled_state(), Some(7));
/// assert!(labeling.add_label_to_state("two", 1).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateLabeling {
    /// Declared labels and the states carrying them
    labels: BTreeMap<String, BTreeSet<usize>>,
}

impl StateLabeling {
    /// Create an empty labeling without any declared label
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a new label
    pub fn declare_label(&mut self, label: impl ToString) -> Result<(), LabelingError> {
        let label = label.to_string();
        if self.labels.contains_key(&label) {
            return Err(LabelingError::DuplicateLabel(label));
        }
        self.labels.insert(label, BTreeSet::new());
        Ok(())
    }

    /// Check whether the label has been declared
    pub fn contains_label(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    /// Assign a declared label to a state
    ///
    /// Assigning the same label twice to a state has no effect.
    pub fn add_label_to_state(&mut self, label: &str, state: usize) -> Result<(), LabelingError> {
        let states = self
            .labels
            .get_mut(label)
            .ok_or_else(|| LabelingError::UnknownLabel(label.to_string()))?;
        states.insert(state);
        Ok(())
    }

    /// Iterate over all declared labels in lexicographic order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Number of declared labels
    pub fn nr_labels(&self) -> usize {
        self.labels.len()
    }

    /// Labels assigned to the given state
    pub fn labels_of_state(&self, state: usize) -> BTreeSet<&str> {
        self.labels
            .iter()
            .filter(|(_, states)| states.contains(&state))
            .map(|(label, _)| label.as_str())
            .collect()
    }

    /// States carrying the label, `None` if the label is not declared
    pub fn states_with_label(&self, label: &str) -> Option<&BTreeSet<usize>> {
        self.labels.get(label)
    }

    /// Check whether the state carries the label
    pub fn state_has_label(&self, state: usize, label: &str) -> bool {
        self.labels
            .get(label)
            .is_some_and(|states| states.contains(&state))
    }

    /// Highest state index that carries any label
    pub fn highest_labeled_state(&self) -> Option<usize> {
        self.labels
            .values()
            .filter_map(|states| states.last().copied())
            .max()
    }
}

impl fmt::Display for StateLabeling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", join_quoted(self.labels(), ", "))
    }
}

/// Error raised when a labeling is modified inconsistently
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelingError {
    /// The label has been declared before
    DuplicateLabel(String),
    /// The label was used without being declared
    UnknownLabel(String),
}

impl error::Error for LabelingError {}

impl fmt::Display for LabelingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelingError::DuplicateLabel(l) => write!(f, "Label \"{l}\" declared twice"),
            LabelingError::UnknownLabel(l) => write!(f, "Label \"{l}\" has not been declared"),
        }
    }
}
