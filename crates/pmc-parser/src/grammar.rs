//! Grammar shared by all textual formats
//!
//! The PRISM language, the property language and the symbolic values of
//! explicit transition files share a single expression grammar. All pest
//! grammars are therefore compiled into a single parser with a common
//! [`Rule`] type.

use pest::{Span, error, iterators::Pair};
use pest_derive::Parser;
use pmc_model::expressions::Identifier;

pub(crate) mod expressions;

// Location of the grammar files and generation of parser
#[allow(missing_docs)]
#[derive(Parser)]
#[grammar = "./expression.pest"]
#[grammar = "./prism.pest"]
#[grammar = "./pctl.pest"]
pub(crate) struct PestPmcParser;

/// Create a new parsing error with the given message at the given span
pub(crate) fn new_parsing_error<S: Into<String>>(
    message: S,
    span: Span<'_>,
) -> Box<pest::error::Error<()>> {
    Box::new(error::Error::new_from_span(
        error::ErrorVariant::CustomError {
            message: message.into(),
        },
        span,
    ))
}

/// Parse an identifier
#[inline(always)]
pub(crate) fn parse_identifier(pair: &Pair<'_, Rule>) -> Identifier {
    debug_assert!(
        pair.as_rule() == Rule::identifier,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    Identifier::new(pair.as_str())
}

/// Parse the content of a quoted name like `"done"`
pub(crate) fn parse_quoted_name(pair: Pair<'_, Rule>) -> String {
    debug_assert!(
        pair.as_rule() == Rule::quoted_name,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    pair.into_inner()
        .next()
        .map(|content| content.as_str().to_string())
        .unwrap_or_default()
}

/// Parse a non-negative integer literal
pub(crate) fn parse_natural(pair: &Pair<'_, Rule>) -> Result<u64, Box<pest::error::Error<()>>> {
    debug_assert!(
        pair.as_rule() == Rule::integer,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    pair.as_str()
        .parse::<u64>()
        .map_err(|err| new_parsing_error(format!("Invalid natural number: {err}"), pair.as_span()))
}
