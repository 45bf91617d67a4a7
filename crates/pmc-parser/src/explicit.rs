//! Parser for explicit models
//!
//! An explicit model consists of a transition file (`.tra`) and a label file
//! (`.lab`), optionally accompanied by state rewards (`.srew`) and transition
//! rewards (`.trew`).
//!
//! A transition file starts with an optional model type hint (`dtmc` or
//! `mdp`), optional `STATES n` and `TRANSITIONS m` headers and one
//! transition per line. Rows either have the form `source target value` or
//! `source choice target value`. Values are numbers, fractions like `1/3`, or
//! expressions over parameters:
//!
//! ```text
//! dtmc
//! STATES 3
//! TRANSITIONS 4
//! 0 1 0.5
//! 0 2 1/2
//! 1 1 1
//! 2 2 1
//! ```
//!
//! A label file declares all labels and then lists the labels of each state:
//!
//! ```text
//! #DECLARATION
//! init done
//! #END
//! 0 init
//! 1 done
//! ```
//!
//! Lines starting with `#` are comments, apart from the declaration markers
//! of label files.

use std::{error, fmt};

use anyhow::{Context, Error};
use log::{debug, info};
use pmc_model::{
    Model, ModelType,
    builder::{BuilderOptions, ModelBuilder, RawTransition, RawTransitionReward},
    expressions::Valuation,
    labeling::StateLabeling,
    probability::Probability,
};

use crate::{ParseExplicitModel, grammar::expressions::parse_expression_str};

/// Marker opening the label declaration of a label file
const DECLARATION_START: &str = "#DECLARATION";
/// Marker closing the label declaration of a label file
const DECLARATION_END: &str = "#END";
/// Header declaring the number of states
const STATES_HEADER: &str = "STATES";
/// Header declaring the number of transitions
const TRANSITIONS_HEADER: &str = "TRANSITIONS";

/// Parser for models given as explicit transition and label files
///
/// # Example
///
/// ```
/// use pmc_model::{ModelType, SparseModel};
/// use pmc_parser::{ParseExplicitModel, explicit::ExplicitParser};
///
/// let tra = "dtmc\n0 1 0.5\n0 0 0.5\n1 1 1\n";
/// let lab = "#DECLARATION\ninit done\n#END\n0 init\n1 done\n";
///
/// let model = ExplicitParser::new().parse_model(tra, lab).unwrap();
/// assert_eq!(model.model_type(), ModelType::Dtmc);
/// assert_eq!(model.nr_states(), 2);
/// assert_eq!(model.nr_transitions(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExplicitParser {
    options: BuilderOptions,
}

impl ParseExplicitModel for ExplicitParser {
    fn parse_model(&self, transitions: &str, labels: &str) -> Result<Model, Error> {
        self.parse_model_with_rewards(transitions, labels, None, None)
    }
}

impl ExplicitParser {
    /// Create a new parser using the default builder options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new parser passing `options` to the model builder
    pub fn with_options(options: BuilderOptions) -> Self {
        Self { options }
    }

    /// Parse a model together with optional state and transition rewards
    pub fn parse_model_with_rewards(
        &self,
        transitions: &str,
        labels: &str,
        state_rewards: Option<&str>,
        transition_rewards: Option<&str>,
    ) -> Result<Model, Error> {
        let TransitionFile {
            hint,
            nr_states,
            layout,
            transitions,
        } = read_transitions(transitions).with_context(|| "Failed to read transitions: ")?;
        debug!("Read {} transitions ({layout} layout)", transitions.len());

        let mut builder = ModelBuilder::new(self.options.clone());
        if let Some(nr_states) = nr_states {
            builder = builder.with_declared_states(nr_states);
        }
        if let Some(hint) = hint {
            builder = builder.with_model_type_hint(hint);
        }
        let builder = builder
            .with_transitions(transitions)
            .with_context(|| "Invalid transition: ")?;

        let labeling =
            read_labeling(labels, builder.nr_states()).with_context(|| "Failed to read labels: ")?;
        let mut builder = builder.with_labeling(labeling);

        if let Some(input) = state_rewards {
            let rewards =
                read_state_rewards(input).with_context(|| "Failed to read state rewards: ")?;
            builder = builder
                .with_state_rewards(rewards)
                .with_context(|| "Invalid state rewards: ")?;
        }
        if let Some(input) = transition_rewards {
            let rewards = read_transition_rewards(input, layout)
                .with_context(|| "Failed to read transition rewards: ")?;
            builder = builder
                .with_transition_rewards(rewards)
                .with_context(|| "Invalid transition rewards: ")?;
        }

        let model = builder
            .build()
            .with_context(|| "Failed to build the model: ")?;
        info!("Parsed explicit model: {model}");

        Ok(model)
    }
}

/// Column layout of transition and transition reward rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `source target value`
    Deterministic,
    /// `source choice target value`
    Nondeterministic,
}

impl Layout {
    /// Number of leading columns holding state or choice indices
    fn nr_indices(&self) -> usize {
        match self {
            Layout::Deterministic => 2,
            Layout::Nondeterministic => 3,
        }
    }

    /// Split a row into source, choice, target and the remaining value text
    fn split_row(
        &self,
        line: usize,
        content: &str,
    ) -> Result<(usize, usize, usize, String), ExplicitFormatError> {
        let tokens = content.split_whitespace().collect::<Vec<_>>();
        if tokens.len() <= self.nr_indices() {
            return Err(ExplicitFormatError::MalformedInput {
                line,
                msg: format!(
                    "expected {} columns, got '{content}'",
                    self.nr_indices() + 1
                ),
            });
        }

        let indices = tokens[..self.nr_indices()]
            .iter()
            .map(|t| parse_index(line, t))
            .collect::<Result<Vec<_>, _>>()?;
        let value = tokens[self.nr_indices()..].join(" ");

        match self {
            Layout::Deterministic => Ok((indices[0], 0, indices[1], value)),
            Layout::Nondeterministic => Ok((indices[0], indices[1], indices[2], value)),
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Deterministic => write!(f, "deterministic"),
            Layout::Nondeterministic => write!(f, "nondeterministic"),
        }
    }
}

/// Content of a transition file
struct TransitionFile {
    hint: Option<ModelType>,
    nr_states: Option<usize>,
    layout: Layout,
    transitions: Vec<RawTransition>,
}

/// Iterate over the non-empty lines of the input that are not comments,
/// together with their line number
fn significant_lines(input: &str) -> impl Iterator<Item = (usize, &str)> {
    input
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

fn parse_index(line: usize, token: &str) -> Result<usize, ExplicitFormatError> {
    token
        .parse::<usize>()
        .map_err(|_| ExplicitFormatError::MalformedInput {
            line,
            msg: format!("invalid index '{token}'"),
        })
}

/// Parse the value column of a transition
///
/// Values without parameters are evaluated, everything else is kept as a
/// symbolic probability.
fn parse_probability(value: &str) -> Result<Probability, String> {
    if let Ok(value) = value.parse::<f64>() {
        return Ok(Probability::Constant(value));
    }

    let expr = parse_expression_str(value).map_err(|err| format!("invalid value '{value}': {err}"))?;
    if !expr.is_constant() {
        return Ok(Probability::Symbolic(expr));
    }

    expr.evaluate(&Valuation::new())
        .ok()
        .and_then(|v| v.as_f64())
        .map(Probability::Constant)
        .ok_or_else(|| format!("value '{value}' is not a number"))
}

/// Parse a header of the form `<keyword> n`
fn parse_header(line: usize, content: &str) -> Result<usize, ExplicitFormatError> {
    let mut tokens = content.split_whitespace();
    let keyword = tokens.next().unwrap_or_default();

    match (tokens.next(), tokens.next()) {
        (Some(n), None) => parse_index(line, n),
        _ => Err(ExplicitFormatError::MalformedInput {
            line,
            msg: format!("expected '{keyword} <number>', got '{content}'"),
        }),
    }
}

/// Derive the row layout from the first transition of a file without a
/// model type hint
fn infer_layout(line: usize, content: &str) -> Result<Layout, ExplicitFormatError> {
    match content.split_whitespace().count() {
        3 => Ok(Layout::Deterministic),
        4 => Ok(Layout::Nondeterministic),
        n => Err(ExplicitFormatError::MalformedInput {
            line,
            msg: format!(
                "cannot tell the row layout from {n} columns in '{content}', \
                 start the file with a 'dtmc' or 'mdp' line"
            ),
        }),
    }
}

fn read_transitions(input: &str) -> Result<TransitionFile, ExplicitFormatError> {
    let mut lines = significant_lines(input).peekable();

    let mut hint = None;
    if let Some((line, content)) = lines.peek().copied()
        && content.starts_with(|c: char| c.is_ascii_alphabetic())
        && content.split_whitespace().count() == 1
    {
        hint = match content.to_ascii_lowercase().as_str() {
            "dtmc" => Some(ModelType::Dtmc),
            "mdp" => Some(ModelType::Mdp),
            _ => {
                return Err(ExplicitFormatError::MalformedInput {
                    line,
                    msg: format!("unsupported model type '{content}'"),
                });
            }
        };
        lines.next();
    }

    let mut nr_states = None;
    let mut nr_transitions = None;
    while let Some((line, content)) = lines.peek().copied() {
        if content.starts_with(STATES_HEADER) {
            nr_states = Some(parse_header(line, content)?);
        } else if content.starts_with(TRANSITIONS_HEADER) {
            nr_transitions = Some((line, parse_header(line, content)?));
        } else {
            break;
        }
        lines.next();
    }

    let mut layout = hint.map(|h| match h {
        ModelType::Dtmc => Layout::Deterministic,
        ModelType::Mdp => Layout::Nondeterministic,
    });

    let mut transitions = Vec::new();
    for (line, content) in lines {
        let row_layout = match layout {
            Some(layout) => layout,
            None => {
                let inferred = infer_layout(line, content)?;
                layout = Some(inferred);
                inferred
            }
        };

        let (source, choice, target, value) = row_layout.split_row(line, content)?;
        let probability = parse_probability(&value)
            .map_err(|msg| ExplicitFormatError::MalformedInput { line, msg })?;

        if !probability.is_in_range() {
            return Err(ExplicitFormatError::ProbabilityOutOfRange {
                line,
                value: probability.constant_value().unwrap_or(f64::NAN),
            });
        }
        for state in [source, target] {
            if state.checked_add(1).is_none() {
                return Err(ExplicitFormatError::MalformedInput {
                    line,
                    msg: format!("state index {state} is too large"),
                });
            }
        }
        if let Some(nr_states) = nr_states {
            for state in [source, target] {
                if state >= nr_states {
                    return Err(ExplicitFormatError::DanglingReference {
                        line,
                        state,
                        nr_states,
                    });
                }
            }
        }

        transitions.push(RawTransition::new(source, choice, target, probability));
    }

    if let Some((line, expected)) = nr_transitions
        && expected != transitions.len()
    {
        return Err(ExplicitFormatError::MalformedInput {
            line,
            msg: format!(
                "declared {expected} transitions, but found {}",
                transitions.len()
            ),
        });
    }

    Ok(TransitionFile {
        hint,
        nr_states,
        layout: layout.unwrap_or(Layout::Deterministic),
        transitions,
    })
}

fn read_labeling(input: &str, nr_states: usize) -> Result<StateLabeling, ExplicitFormatError> {
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    match lines.next() {
        Some((_, DECLARATION_START)) => {}
        Some((line, content)) => {
            return Err(ExplicitFormatError::MalformedInput {
                line,
                msg: format!("expected '{DECLARATION_START}', got '{content}'"),
            });
        }
        None => {
            return Err(ExplicitFormatError::MalformedInput {
                line: 0,
                msg: format!("missing '{DECLARATION_START}'"),
            });
        }
    }

    let mut labeling = StateLabeling::new();
    let mut closed = false;
    let mut last_line = 1;
    for (line, content) in lines.by_ref() {
        last_line = line;
        if content == DECLARATION_END {
            closed = true;
            break;
        }
        for label in content.split_whitespace() {
            labeling
                .declare_label(label)
                .map_err(|err| ExplicitFormatError::MalformedInput {
                    line,
                    msg: err.to_string(),
                })?;
        }
    }
    if !closed {
        return Err(ExplicitFormatError::MalformedInput {
            line: last_line,
            msg: format!("missing '{DECLARATION_END}'"),
        });
    }

    for (line, content) in lines.filter(|(_, l)| !l.starts_with('#')) {
        let mut tokens = content.split_whitespace();
        let state = parse_index(line, tokens.next().unwrap_or_default())?;
        if state >= nr_states {
            return Err(ExplicitFormatError::DanglingReference {
                line,
                state,
                nr_states,
            });
        }

        for label in tokens {
            labeling
                .add_label_to_state(label, state)
                .map_err(|err| ExplicitFormatError::MalformedInput {
                    line,
                    msg: err.to_string(),
                })?;
        }
    }

    debug!("Read {} labels", labeling.nr_labels());
    Ok(labeling)
}

fn parse_reward(line: usize, token: &str) -> Result<f64, ExplicitFormatError> {
    token
        .parse::<f64>()
        .map_err(|_| ExplicitFormatError::MalformedInput {
            line,
            msg: format!("invalid reward '{token}'"),
        })
}

fn read_state_rewards(input: &str) -> Result<Vec<(usize, f64)>, ExplicitFormatError> {
    significant_lines(input)
        .map(|(line, content)| {
            let tokens = content.split_whitespace().collect::<Vec<_>>();
            let [state, reward] = tokens[..] else {
                return Err(ExplicitFormatError::MalformedInput {
                    line,
                    msg: format!("expected 'state reward', got '{content}'"),
                });
            };
            Ok((parse_index(line, state)?, parse_reward(line, reward)?))
        })
        .collect()
}

fn read_transition_rewards(
    input: &str,
    layout: Layout,
) -> Result<Vec<RawTransitionReward>, ExplicitFormatError> {
    significant_lines(input)
        .map(|(line, content)| {
            let (source, choice, target, reward) = layout.split_row(line, content)?;
            let reward = parse_reward(line, &reward)?;
            Ok(RawTransitionReward::new(source, choice, target, reward))
        })
        .collect()
}

/// Error raised when an explicit input file does not follow the format
#[derive(Debug, Clone, PartialEq)]
pub enum ExplicitFormatError {
    /// A line does not follow the expected format
    MalformedInput {
        /// Line the error occurred in (starting from 1)
        line: usize,
        /// Description of the problem
        msg: String,
    },
    /// A transition has a probability outside of (0, 1]
    ProbabilityOutOfRange {
        /// Line the error occurred in
        line: usize,
        /// Offending probability
        value: f64,
    },
    /// A state index exceeds the number of states
    DanglingReference {
        /// Line the error occurred in
        line: usize,
        /// Referenced state
        state: usize,
        /// Number of states of the model
        nr_states: usize,
    },
}

impl error::Error for ExplicitFormatError {}

impl fmt::Display for ExplicitFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplicitFormatError::MalformedInput { line, msg } => {
                write!(f, "Malformed input in line {line}: {msg}")
            }
            ExplicitFormatError::ProbabilityOutOfRange { line, value } => write!(
                f,
                "Probability {value} in line {line} does not lie in the interval (0, 1]"
            ),
            ExplicitFormatError::DanglingReference {
                line,
                state,
                nr_states,
            } => write!(
                f,
                "State {state} referenced in line {line} does not exist, the model has {nr_states} states"
            ),
        }
    }
}
