//! Factory methods for building a valid sparse [`Model`]
//!
//! The [`ModelBuilder`] collects raw transitions, a labeling and optional
//! rewards. On [`ModelBuilder::build`] it groups the transitions by state and
//! choice, validates that every choice is a probability distribution and
//! selects the matching model representation: a [`ModelType::Dtmc`] if every
//! state has exactly one choice and a [`ModelType::Mdp`] otherwise.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{self, Display},
};

use log::{debug, warn};
#[cfg(feature = "config_deserialize")]
use serde::Deserialize;

use crate::{
    expressions::{Identifier, Valuation, Value},
    labeling::{DEADLOCK_LABEL, LabelingError, StateLabeling},
    models::{Model, ModelComponents, ModelType, RewardModel},
    probability::Probability,
    sparse_matrix::{SparseMatrix, SparseMatrixBuilder},
};

/// Maximal deviation of the probability mass of a choice from 1
pub const DEFAULT_PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Values parameters are instantiated with when validating the probability
/// mass of symbolic choices
const PARAMETER_SAMPLE_POINTS: [f64; 3] = [0.25, 0.5, 0.75];

/// Options influencing the construction of a model
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config_deserialize", derive(Deserialize))]
pub struct BuilderOptions {
    /// Tolerance for the probability mass of a choice
    /// Default value: `DEFAULT_PROBABILITY_TOLERANCE`
    #[cfg_attr(feature = "config_deserialize", serde(default = "default_tolerance"))]
    pub tolerance: f64,
    /// Accept models without any state
    /// Default value: false
    #[cfg_attr(feature = "config_deserialize", serde(default))]
    pub allow_empty: bool,
    /// Add a self loop to states without outgoing transitions instead of
    /// rejecting the model
    /// Default value: false
    #[cfg_attr(feature = "config_deserialize", serde(default))]
    pub fix_deadlocks: bool,
}

/// Function to get the default tolerance
#[cfg(feature = "config_deserialize")]
fn default_tolerance() -> f64 {
    DEFAULT_PROBABILITY_TOLERANCE
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_PROBABILITY_TOLERANCE,
            allow_empty: false,
            fix_deadlocks: false,
        }
    }
}

/// Transition as it appears in an explicit model description
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransition {
    /// State the transition leaves
    pub source: usize,
    /// Choice of the source state the transition belongs to
    pub choice: usize,
    /// State the transition enters
    pub target: usize,
    /// Probability of the transition
    pub probability: Probability,
}

impl RawTransition {
    /// Create a new raw transition
    pub fn new(
        source: usize,
        choice: usize,
        target: usize,
        probability: impl Into<Probability>,
    ) -> Self {
        Self {
            source,
            choice,
            target,
            probability: probability.into(),
        }
    }
}

impl Display for RawTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.source, self.choice, self.target, self.probability
        )
    }
}

/// Reward of a single transition
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransitionReward {
    /// State the transition leaves
    pub source: usize,
    /// Choice of the source state
    pub choice: usize,
    /// State the transition enters
    pub target: usize,
    /// Reward collected when taking the transition
    pub reward: f64,
}

impl RawTransitionReward {
    /// Create a new transition reward
    pub fn new(source: usize, choice: usize, target: usize, reward: f64) -> Self {
        Self {
            source,
            choice,
            target,
            reward,
        }
    }
}

/// Builder for a sparse [`Model`]
///
/// # Example
///
/// ```
/// use pmc_model::builder::*;
/// use pmc_model::labeling::StateLabeling;
/// use pmc_model::models::{ModelType, SparseModel};
///
/// let mut labeling = StateLabeling::new();
/// labeling.declare_label("init").unwrap();
/// labeling.add_label_to_state("init", 0).unwrap();
///
/// let model = ModelBuilder::new(BuilderOptions::default())
///     .with_transitions(vec![
///         RawTransition::new(0, 0, 1, 0.5),
///         RawTransition::new(0, 0, 2, 0.5),
///         RawTransition::new(1, 0, 1, 1.0),
///         RawTransition::new(2, 0, 2, 1.0),
///     ])
///     .unwrap()
///     .with_labeling(labeling)
///     .build()
///     .unwrap();
///
/// assert_eq!(model.nr_states(), 3);
/// assert_eq!(model.nr_transitions(), 4);
/// assert_eq!(model.model_type(), ModelType::Dtmc);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBuilder {
    options: BuilderOptions,
    /// Distributions indexed by source state and choice
    transitions: BTreeMap<(usize, usize), BTreeMap<usize, Probability>>,
    labeling: StateLabeling,
    declared_states: Option<usize>,
    model_type_hint: Option<ModelType>,
    state_rewards: Option<BTreeMap<usize, f64>>,
    transition_rewards: Option<Vec<RawTransitionReward>>,
}

impl ModelBuilder {
    /// Create a new builder without any transitions
    pub fn new(options: BuilderOptions) -> Self {
        Self {
            options,
            transitions: BTreeMap::new(),
            labeling: StateLabeling::new(),
            declared_states: None,
            model_type_hint: None,
            state_rewards: None,
            transition_rewards: None,
        }
    }

    /// Fix the number of states of the model
    ///
    /// Transitions and labels referring to states beyond the declared number
    /// are rejected. Without a declaration the highest state index appearing
    /// in a transition determines the number of states.
    pub fn with_declared_states(mut self, nr_states: usize) -> Self {
        self.declared_states = Some(nr_states);
        self
    }

    /// Record the model type the input claims to describe
    ///
    /// The type of the built model is always derived from the number of
    /// choices per state, a hint that does not match is only reported.
    pub fn with_model_type_hint(mut self, model_type: ModelType) -> Self {
        self.model_type_hint = Some(model_type);
        self
    }

    /// Check whether a state lies outside of the declared state space
    fn check_declared(&self, state: usize) -> Result<(), BuilderError> {
        match self.declared_states {
            Some(nr_states) if state >= nr_states => {
                Err(BuilderError::DanglingReference { state, nr_states })
            }
            _ => Ok(()),
        }
    }

    /// Adds a transition to the model
    ///
    /// Returns an error if a concrete probability does not lie in (0, 1], if
    /// the same transition was added before or if a state exceeds the
    /// declared number of states. A state index must leave room for counting
    /// the states, so `usize::MAX` is rejected.
    pub fn with_transition(mut self, transition: RawTransition) -> Result<Self, BuilderError> {
        let RawTransition {
            source,
            choice,
            target,
            probability,
        } = transition;

        if !probability.is_in_range() {
            return Err(BuilderError::ProbabilityOutOfRange {
                source,
                choice,
                target,
                value: probability.constant_value().unwrap_or(f64::NAN),
            });
        }
        for state in [source, target] {
            if state.checked_add(1).is_none() {
                return Err(BuilderError::StateIndexOverflow(state));
            }
            self.check_declared(state)?;
        }

        let distribution = self.transitions.entry((source, choice)).or_default();
        if distribution.contains_key(&target) {
            return Err(BuilderError::DuplicateTransition {
                source,
                choice,
                target,
            });
        }
        distribution.insert(target, probability);

        Ok(self)
    }

    /// Adds multiple transitions to the model
    pub fn with_transitions(
        self,
        transitions: impl IntoIterator<Item = RawTransition>,
    ) -> Result<Self, BuilderError> {
        let mut res = self;
        for transition in transitions {
            res = res.with_transition(transition)?;
        }
        Ok(res)
    }

    /// Sets the labeling of the model
    pub fn with_labeling(mut self, labeling: StateLabeling) -> Self {
        self.labeling = labeling;
        self
    }

    /// Sets the state rewards of the model
    ///
    /// States without a reward receive reward 0.
    pub fn with_state_rewards(
        mut self,
        rewards: impl IntoIterator<Item = (usize, f64)>,
    ) -> Result<Self, BuilderError> {
        let mut state_rewards = BTreeMap::new();
        for (state, reward) in rewards {
            check_reward(reward)?;
            if state_rewards.insert(state, reward).is_some() {
                return Err(BuilderError::MalformedReward(format!(
                    "state {state} has multiple rewards"
                )));
            }
        }
        self.state_rewards = Some(state_rewards);
        Ok(self)
    }

    /// Sets the transition rewards of the model
    ///
    /// Every reward must belong to a transition of the model, this is
    /// checked when the model is built.
    pub fn with_transition_rewards(
        mut self,
        rewards: impl IntoIterator<Item = RawTransitionReward>,
    ) -> Result<Self, BuilderError> {
        let rewards = rewards.into_iter().collect::<Vec<_>>();
        for r in rewards.iter() {
            check_reward(r.reward)?;
        }
        self.transition_rewards = Some(rewards);
        Ok(self)
    }

    /// Number of states of the model under construction
    pub fn nr_states(&self) -> usize {
        self.declared_states.unwrap_or_else(|| {
            self.transitions
                .iter()
                .flat_map(|((source, _), dist)| {
                    std::iter::once(*source).chain(dist.keys().copied())
                })
                .max()
                .map_or(0, |max| max + 1)
        })
    }

    /// Number of transitions added so far
    pub fn nr_transitions(&self) -> usize {
        self.transitions.values().map(BTreeMap::len).sum()
    }

    /// Complete the construction of the model
    ///
    /// Validates the transitions and selects the representation matching the
    /// number of choices per state.
    pub fn build(self) -> Result<Model, BuilderError> {
        let tolerance = self.options.tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(BuilderError::InvalidTolerance(tolerance));
        }

        let nr_states = self.nr_states();
        if nr_states == 0 && !self.options.allow_empty {
            return Err(BuilderError::EmptyModel);
        }

        if let Some(state) = self.labeling.highest_labeled_state()
            && state >= nr_states
        {
            return Err(BuilderError::DanglingReference { state, nr_states });
        }

        let mut labeling = self.labeling;
        let mut matrix_builder = SparseMatrixBuilder::new();
        let mut nondeterministic = false;

        for state in 0..nr_states {
            matrix_builder.new_row_group();

            let mut nr_choices = 0;
            for ((_, choice), distribution) in self.transitions.range((state, 0)..(state + 1, 0)) {
                if *choice != nr_choices {
                    return Err(BuilderError::NonContiguousChoices {
                        state,
                        choice: *choice,
                    });
                }
                check_probability_mass(state, *choice, distribution, self.options.tolerance)?;

                matrix_builder.new_row();
                for (target, p) in distribution.iter() {
                    matrix_builder.add_entry(*target, p.clone());
                }
                nr_choices += 1;
            }

            if nr_choices == 0 {
                if !self.options.fix_deadlocks {
                    return Err(BuilderError::DeadlockState(state));
                }
                debug!("Fixing deadlock in state {state} with a self loop");
                matrix_builder.new_row();
                matrix_builder.add_entry(state, Probability::Constant(1.0));
                if labeling.contains_label(DEADLOCK_LABEL) {
                    labeling.add_label_to_state(DEADLOCK_LABEL, state)?;
                }
            }

            nondeterministic |= nr_choices > 1;
        }

        let matrix = matrix_builder.build();

        let model_type = if nondeterministic {
            ModelType::Mdp
        } else {
            ModelType::Dtmc
        };
        debug!(
            "Classified model with {nr_states} states and {} choices as {model_type}",
            matrix.nr_rows()
        );
        if let Some(hint) = self.model_type_hint
            && hint != model_type
        {
            warn!("Model was declared as {hint} but its choices make it a {model_type}");
        }

        let reward_model = build_reward_model(
            &matrix,
            self.state_rewards,
            self.transition_rewards,
            nr_states,
        )?;

        Ok(Model::from_components(
            model_type,
            ModelComponents::new(matrix, labeling, reward_model),
        ))
    }
}

/// Check that a reward value is a non-negative number
fn check_reward(reward: f64) -> Result<(), BuilderError> {
    if reward.is_nan() || reward < 0.0 {
        return Err(BuilderError::MalformedReward(format!(
            "reward {reward} is not a non-negative number"
        )));
    }
    Ok(())
}

/// Check that the probabilities of a choice sum up to 1
///
/// Symbolic distributions are checked by instantiating their parameters with
/// a few sample values. If the sum cannot be evaluated at a sample point, the
/// distribution is accepted.
fn check_probability_mass(
    state: usize,
    choice: usize,
    distribution: &BTreeMap<usize, Probability>,
    tolerance: f64,
) -> Result<(), BuilderError> {
    let parameters = distribution
        .values()
        .flat_map(Probability::parameters)
        .collect::<BTreeSet<_>>();

    let valuations = sample_valuations(&parameters);
    for valuation in valuations.iter() {
        let sum = distribution
            .values()
            .map(|p| p.evaluate(valuation))
            .sum::<Result<f64, _>>();

        match sum {
            Ok(sum) if (sum - 1.0).abs() > tolerance || sum.is_nan() => {
                return Err(BuilderError::ProbabilityMass { state, choice, sum });
            }
            Ok(_) => {}
            Err(err) => {
                debug!(
                    "Could not evaluate probability mass of choice {choice} of state {state}: {err}"
                );
                return Ok(());
            }
        }
    }

    Ok(())
}

/// Valuations used to validate symbolic distributions
///
/// Without parameters this is a single empty valuation.
fn sample_valuations(parameters: &BTreeSet<Identifier>) -> Vec<Valuation> {
    if parameters.is_empty() {
        return vec![Valuation::new()];
    }

    (0..PARAMETER_SAMPLE_POINTS.len())
        .map(|offset| {
            parameters
                .iter()
                .enumerate()
                .map(|(i, param)| {
                    let point =
                        PARAMETER_SAMPLE_POINTS[(offset + i) % PARAMETER_SAMPLE_POINTS.len()];
                    (param.clone(), Value::Double(point))
                })
                .collect()
        })
        .collect()
}

/// Assemble the reward model from the collected rewards
fn build_reward_model(
    matrix: &SparseMatrix,
    state_rewards: Option<BTreeMap<usize, f64>>,
    transition_rewards: Option<Vec<RawTransitionReward>>,
    nr_states: usize,
) -> Result<Option<RewardModel>, BuilderError> {
    let state_rewards = state_rewards
        .map(|rewards| {
            let mut res = vec![0.0; nr_states];
            for (state, reward) in rewards {
                if state >= nr_states {
                    return Err(BuilderError::DanglingReference { state, nr_states });
                }
                res[state] = reward;
            }
            Ok(res)
        })
        .transpose()?;

    let transition_rewards = transition_rewards
        .map(|rewards| -> Result<Vec<f64>, BuilderError> {
            let mut res = vec![0.0; matrix.nr_entries()];
            for r in rewards {
                let index = matrix
                    .entry_index(r.source, r.choice, r.target)
                    .ok_or(BuilderError::UnknownTransitionReward {
                        source: r.source,
                        choice: r.choice,
                        target: r.target,
                    })?;
                res[index] = r.reward;
            }
            Ok(res)
        })
        .transpose()?;

    let reward_model = RewardModel::new(state_rewards, transition_rewards);
    if reward_model.is_empty() {
        return Ok(None);
    }
    Ok(Some(reward_model))
}

/// Custom error type to indicate an error when building a [`Model`]
#[derive(Debug, Clone, PartialEq)]
pub enum BuilderError {
    /// A concrete probability does not lie in (0, 1]
    ProbabilityOutOfRange {
        /// Source state of the transition
        source: usize,
        /// Choice of the transition
        choice: usize,
        /// Target state of the transition
        target: usize,
        /// Value of the probability
        value: f64,
    },
    /// The probabilities of a choice do not sum up to 1
    ProbabilityMass {
        /// State of the choice
        state: usize,
        /// Index of the choice
        choice: usize,
        /// Sum of the probabilities
        sum: f64,
    },
    /// A state is referenced that does not exist in the model
    DanglingReference {
        /// Referenced state
        state: usize,
        /// Number of states of the model
        nr_states: usize,
    },
    /// The model does not have any state
    EmptyModel,
    /// The same transition was added multiple times
    DuplicateTransition {
        /// Source state of the transition
        source: usize,
        /// Choice of the transition
        choice: usize,
        /// Target state of the transition
        target: usize,
    },
    /// A state does not have any outgoing transition
    DeadlockState(usize),
    /// The choices of a state are not numbered 0, 1, 2, ...
    NonContiguousChoices {
        /// State of the choice
        state: usize,
        /// First choice index out of order
        choice: usize,
    },
    /// A label was used without being declared
    UnknownLabel(String),
    /// A label was declared multiple times
    DuplicateLabel(String),
    /// A reward was given for a transition that does not exist
    UnknownTransitionReward {
        /// Source state of the transition
        source: usize,
        /// Choice of the transition
        choice: usize,
        /// Target state of the transition
        target: usize,
    },
    /// A reward is malformed
    MalformedReward(String),
    /// A state index is too large to determine the number of states
    StateIndexOverflow(usize),
    /// The probability tolerance is negative or not a finite number
    InvalidTolerance(f64),
}

impl std::error::Error for BuilderError {}

impl Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderError::ProbabilityOutOfRange {
                source,
                choice,
                target,
                value,
            } => write!(
                f,
                "Probability {value} of transition {source} -[{choice}]-> {target} is not in (0, 1]"
            ),
            BuilderError::ProbabilityMass { state, choice, sum } => write!(
                f,
                "Probabilities of choice {choice} of state {state} sum up to {sum} instead of 1"
            ),
            BuilderError::DanglingReference { state, nr_states } => write!(
                f,
                "State {state} is referenced but the model only has {nr_states} states"
            ),
            BuilderError::EmptyModel => write!(f, "Model does not contain any state"),
            BuilderError::DuplicateTransition {
                source,
                choice,
                target,
            } => write!(
                f,
                "Duplicate transition {source} -[{choice}]-> {target}"
            ),
            BuilderError::DeadlockState(state) => write!(
                f,
                "State {state} does not have any outgoing transition"
            ),
            BuilderError::NonContiguousChoices { state, choice } => write!(
                f,
                "Choices of state {state} are not contiguous, found choice {choice} out of order"
            ),
            BuilderError::UnknownLabel(l) => write!(f, "Unknown label: {l}"),
            BuilderError::DuplicateLabel(l) => write!(f, "Duplicate label: {l}"),
            BuilderError::UnknownTransitionReward {
                source,
                choice,
                target,
            } => write!(
                f,
                "Reward given for transition {source} -[{choice}]-> {target} which does not exist"
            ),
            BuilderError::MalformedReward(msg) => write!(f, "Malformed reward: {msg}"),
            BuilderError::StateIndexOverflow(state) => {
                write!(f, "State index {state} exceeds the supported number of states")
            }
            BuilderError::InvalidTolerance(tolerance) => write!(
                f,
                "Probability tolerance {tolerance} is not a finite non-negative number"
            ),
        }
    }
}

impl From<LabelingError> for BuilderError {
    fn from(value: LabelingError) -> Self {
        match value {
            LabelingError::DuplicateLabel(l) => BuilderError::DuplicateLabel(l),
            LabelingError::UnknownLabel(l) => BuilderError::UnknownLabel(l),
        }
    }
}
