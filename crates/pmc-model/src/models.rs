//! Sparse DTMC and MDP representations
//!
//! A [`Model`] is either a [`SparseDtmc`] or a [`SparseMdp`]. Both share the
//! same components, a row grouped [`SparseMatrix`] with a [`StateLabeling`]
//! and an optional [`RewardModel`], and expose them through the
//! [`SparseModel`] trait. The variant of a model is selected once, when the
//! model is constructed from its components, and cannot change afterwards.

use std::{
    collections::BTreeSet,
    fmt::{self, Display},
};

use crate::{
    expressions::Identifier,
    labeling::{INITIAL_LABEL, StateLabeling},
    sparse_matrix::{MatrixEntry, SparseMatrix},
};

/// Type of a sparse model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelType {
    /// Discrete-time Markov chain, every state has exactly one choice
    Dtmc,
    /// Markov decision process, states may have multiple choices
    Mdp,
}

impl Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Dtmc => write!(f, "DTMC"),
            ModelType::Mdp => write!(f, "MDP"),
        }
    }
}

/// Rewards attached to states and transitions of a model
///
/// Transition rewards are indexed like the entries of the transition matrix.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RewardModel {
    state_rewards: Option<Vec<f64>>,
    transition_rewards: Option<Vec<f64>>,
}

impl RewardModel {
    /// Create a new reward model
    pub fn new(state_rewards: Option<Vec<f64>>, transition_rewards: Option<Vec<f64>>) -> Self {
        Self {
            state_rewards,
            transition_rewards,
        }
    }

    /// Reward of every state, if state rewards were given
    pub fn state_rewards(&self) -> Option<&[f64]> {
        self.state_rewards.as_deref()
    }

    /// Reward of every matrix entry, if transition rewards were given
    pub fn transition_rewards(&self) -> Option<&[f64]> {
        self.transition_rewards.as_deref()
    }

    /// Check whether the reward model carries neither state nor transition
    /// rewards
    pub fn is_empty(&self) -> bool {
        self.state_rewards.is_none() && self.transition_rewards.is_none()
    }
}

/// Components shared by all sparse models
#[derive(Debug, Clone, PartialEq)]
pub struct ModelComponents {
    pub(crate) transition_matrix: SparseMatrix,
    pub(crate) labeling: StateLabeling,
    pub(crate) reward_model: Option<RewardModel>,
}

impl ModelComponents {
    /// Assemble the components of a model
    pub fn new(
        transition_matrix: SparseMatrix,
        labeling: StateLabeling,
        reward_model: Option<RewardModel>,
    ) -> Self {
        Self {
            transition_matrix,
            labeling,
            reward_model,
        }
    }
}

/// Common interface of sparse models
///
/// Implementors only provide access to their components and their type, all
/// other queries are derived from them.
pub trait SparseModel: Display {
    /// Components the model consists of
    fn components(&self) -> &ModelComponents;

    /// Type of the model
    fn model_type(&self) -> ModelType;

    /// Number of states
    fn nr_states(&self) -> usize {
        self.components().transition_matrix.nr_row_groups()
    }

    /// Number of transitions, i.e., non-zero entries of the transition matrix
    fn nr_transitions(&self) -> usize {
        self.components().transition_matrix.nr_entries()
    }

    /// Number of choices over all states
    fn nr_choices(&self) -> usize {
        self.components().transition_matrix.nr_rows()
    }

    /// Check whether the transition probabilities are stored as expressions
    /// over parameters instead of concrete numbers
    fn supports_parameters(&self) -> bool {
        self.components()
            .transition_matrix
            .iter_entries()
            .any(|(_, _, e)| !e.value().is_constant())
    }

    /// Check whether any transition probability depends on a parameter
    fn has_parameters(&self) -> bool {
        !self.probability_parameters().is_empty()
    }

    /// Parameters occurring in transition probabilities
    fn probability_parameters(&self) -> BTreeSet<Identifier> {
        self.components()
            .transition_matrix
            .iter_entries()
            .flat_map(|(_, _, e)| e.value().parameters())
            .collect()
    }

    /// Labeling of the states
    fn labeling(&self) -> &StateLabeling {
        &self.components().labeling
    }

    /// Declared labels
    fn labels(&self) -> BTreeSet<&str> {
        self.labeling().labels().collect()
    }

    /// Labels of a single state
    fn labels_of_state(&self, state: usize) -> BTreeSet<&str> {
        self.labeling().labels_of_state(state)
    }

    /// States carrying the `init` label
    fn initial_states(&self) -> BTreeSet<usize> {
        self.labeling()
            .states_with_label(INITIAL_LABEL)
            .cloned()
            .unwrap_or_default()
    }

    /// Read only view on the transition matrix
    fn transition_matrix(&self) -> &SparseMatrix {
        &self.components().transition_matrix
    }

    /// Rewards of the model, if any were given
    fn reward_model(&self) -> Option<&RewardModel> {
        self.components().reward_model.as_ref()
    }
}

/// Display shared by the model variants
fn display_model<M: SparseModel + ?Sized>(model: &M, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
        f,
        "{} (states: {}, transitions: {}, choices: {}, labels: {}",
        model.model_type(),
        model.nr_states(),
        model.nr_transitions(),
        model.nr_choices(),
        model.labeling()
    )?;
    if model.supports_parameters() {
        let params = model
            .probability_parameters()
            .into_iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>();
        write!(f, ", parameters: [{}]", params.join(", "))?;
    }
    if model.reward_model().is_some() {
        write!(f, ", rewards")?;
    }
    write!(f, ")")
}

/// Sparse discrete-time Markov chain
#[derive(Debug, Clone, PartialEq)]
pub struct SparseDtmc {
    components: ModelComponents,
}

impl SparseModel for SparseDtmc {
    fn components(&self) -> &ModelComponents {
        &self.components
    }

    fn model_type(&self) -> ModelType {
        ModelType::Dtmc
    }
}

impl SparseDtmc {
    /// Successors of a state together with their probabilities
    pub fn successors(&self, state: usize) -> &[MatrixEntry] {
        let rows = self.components.transition_matrix.row_group(state);
        self.components.transition_matrix.row(rows.start)
    }
}

impl Display for SparseDtmc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_model(self, f)
    }
}

/// Sparse Markov decision process
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMdp {
    components: ModelComponents,
}

impl SparseModel for SparseMdp {
    fn components(&self) -> &ModelComponents {
        &self.components
    }

    fn model_type(&self) -> ModelType {
        ModelType::Mdp
    }
}

impl SparseMdp {
    /// Number of choices available in a state
    pub fn nr_choices_of_state(&self, state: usize) -> usize {
        self.components.transition_matrix.row_group(state).len()
    }
}

impl Display for SparseMdp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_model(self, f)
    }
}

/// Sparse model of any supported type
#[derive(Debug, Clone, PartialEq)]
pub enum Model {
    /// The model is a DTMC
    Dtmc(SparseDtmc),
    /// The model is an MDP
    Mdp(SparseMdp),
}

impl Model {
    /// Select the representation matching the given model type
    ///
    /// The caller is responsible for only requesting a DTMC if every state
    /// has exactly one choice.
    pub(crate) fn from_components(model_type: ModelType, components: ModelComponents) -> Self {
        debug_assert!(
            model_type == ModelType::Mdp || components.transition_matrix.has_trivial_row_grouping(),
            "DTMC with nondeterministic choices"
        );
        match model_type {
            ModelType::Dtmc => Model::Dtmc(SparseDtmc { components }),
            ModelType::Mdp => Model::Mdp(SparseMdp { components }),
        }
    }

    /// Get the model as DTMC, `None` if the model is an MDP
    pub fn as_dtmc(&self) -> Option<&SparseDtmc> {
        match self {
            Model::Dtmc(dtmc) => Some(dtmc),
            Model::Mdp(_) => None,
        }
    }

    /// Get the model as MDP, `None` if the model is a DTMC
    pub fn as_mdp(&self) -> Option<&SparseMdp> {
        match self {
            Model::Mdp(mdp) => Some(mdp),
            Model::Dtmc(_) => None,
        }
    }

    /// Convert into a DTMC, returning the model unchanged if it is an MDP
    pub fn into_dtmc(self) -> Result<SparseDtmc, Self> {
        match self {
            Model::Dtmc(dtmc) => Ok(dtmc),
            m => Err(m),
        }
    }

    /// Convert into an MDP, returning the model unchanged if it is a DTMC
    pub fn into_mdp(self) -> Result<SparseMdp, Self> {
        match self {
            Model::Mdp(mdp) => Ok(mdp),
            m => Err(m),
        }
    }
}

impl SparseModel for Model {
    fn components(&self) -> &ModelComponents {
        match self {
            Model::Dtmc(dtmc) => dtmc.components(),
            Model::Mdp(mdp) => mdp.components(),
        }
    }

    fn model_type(&self) -> ModelType {
        match self {
            Model::Dtmc(dtmc) => dtmc.model_type(),
            Model::Mdp(mdp) => mdp.model_type(),
        }
    }
}

impl Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Dtmc(dtmc) => Display::fmt(dtmc, f),
            Model::Mdp(mdp) => Display::fmt(mdp, f),
        }
    }
}
