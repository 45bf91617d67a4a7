//! Parsers for probabilistic models and their properties
//!
//! This crate contains the parsers of the supported input formats together
//! with the traits they implement:
//! - [`ParseExplicitModel`], implemented by [`explicit::ExplicitParser`] for
//!   explicit transition (`.tra`) and label (`.lab`) files,
//! - [`ParseProgram`], implemented by [`prism::PrismParser`] for PRISM
//!   programs,
//! - [`ParseProperties`], implemented by [`pctl::PctlParser`] for PCTL
//!   properties.
//!
//! For convenience, the functions [`parse_explicit_model`],
//! [`parse_prism_program`] and [`parse_properties`] read and parse inputs
//! with the default settings.

use std::{fs, path::Path};

use anyhow::{Context, Error};
use pmc_logic::Property;
use pmc_model::{Model, program::Program};

pub mod explicit;
pub mod pctl;
pub mod prism;

// The pest derive generates errors as the doc comments are missing
#[allow(missing_docs)]
mod grammar;

/// Parse an explicit model from the content of its transition and label
/// file.
///
/// Parsers for explicit models should implement this trait.
pub trait ParseExplicitModel {
    /// Try to parse the model from the content of a transition and a label
    /// file
    fn parse_model(&self, transitions: &str, labels: &str) -> Result<Model, Error>;
}

/// Parse a PRISM program from a string.
///
/// Parsers for PRISM programs should implement this trait.
pub trait ParseProgram {
    /// Try to parse the program from a string.
    fn parse_program(&self, input: &str) -> Result<Program, Error>;
}

/// Parse a list of properties from a string.
///
/// Parsers for property languages should implement this trait.
pub trait ParseProperties {
    /// Try to parse all properties contained in the string.
    fn parse_properties(&self, input: &str) -> Result<Vec<Property>, Error>;
}

fn read_file(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).with_context(|| format!("Failed to read file {}", path.display()))
}

/// Parse the explicit model stored in the transition file `tra` and the label
/// file `lab`
pub fn parse_explicit_model(tra: impl AsRef<Path>, lab: impl AsRef<Path>) -> Result<Model, Error> {
    let transitions = read_file(tra.as_ref())?;
    let labels = read_file(lab.as_ref())?;

    explicit::ExplicitParser::new()
        .parse_model(&transitions, &labels)
        .with_context(|| format!("Failed to parse model {}", tra.as_ref().display()))
}

/// Parse the explicit model stored in the transition file `tra` and the label
/// file `lab` together with optional state (`.srew`) and transition rewards
/// (`.trew`)
pub fn parse_explicit_model_with_rewards(
    tra: impl AsRef<Path>,
    lab: impl AsRef<Path>,
    srew: Option<&Path>,
    trew: Option<&Path>,
) -> Result<Model, Error> {
    let transitions = read_file(tra.as_ref())?;
    let labels = read_file(lab.as_ref())?;
    let state_rewards = srew.map(read_file).transpose()?;
    let transition_rewards = trew.map(read_file).transpose()?;

    explicit::ExplicitParser::new()
        .parse_model_with_rewards(
            &transitions,
            &labels,
            state_rewards.as_deref(),
            transition_rewards.as_deref(),
        )
        .with_context(|| format!("Failed to parse model {}", tra.as_ref().display()))
}

/// Parse a list of PCTL properties
pub fn parse_properties(input: &str) -> Result<Vec<Property>, Error> {
    pctl::PctlParser::new().parse_properties(input)
}

/// Parse the PRISM program stored in the file at `path`
pub fn parse_prism_program(path: impl AsRef<Path>) -> Result<Program, Error> {
    let input = read_file(path.as_ref())?;

    prism::PrismParser::new()
        .parse_program(&input)
        .with_context(|| format!("Failed to parse PRISM program {}", path.as_ref().display()))
}
