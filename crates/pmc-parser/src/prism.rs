//! Parser for PRISM programs
//!
//! This module implements the parser for the PRISM modeling language. A
//! program starts with its model type (`dtmc`, `mdp` or `ctmc`), followed by
//! constants, global variables, formulas, modules, renamed modules, labels,
//! reward structures and an optional `init ... endinit` block, in any order.
//!
//! Modules defined by renaming must appear after the module they rename.

use std::collections::HashMap;

use anyhow::{Context, Error, anyhow};
use log::{debug, info};
use pest::{Parser, iterators::Pair};
use pmc_model::{
    expressions::{Expression, Identifier, Valuation, Value},
    program::{
        Assignment, Command, Constant, ConstantType, Label, Module, NamedFormula, Program,
        ProgramBuilder, ProgramModelType, RewardItem, RewardStructure, Update, Variable,
        VariableType,
    },
};

use crate::{
    ParseProgram,
    grammar::{
        PestPmcParser, Rule, expressions::parse_expression, new_parsing_error, parse_identifier,
        parse_quoted_name,
    },
};

type ParseResult<T> = Result<T, Box<pest::error::Error<()>>>;

/// Parser for PRISM programs
///
/// # Example
///
/// ```
/// use pmc_model::program::ProgramModelType;
/// use pmc_parser::{ParseProgram, prism::PrismParser};
///
/// let input = "
/// dtmc
///
/// const double p;
///
/// module coin
///     s : [0..2] init 0;
///
///     [] s=0 -> p : (s'=1) + 1-p : (s'=2);
///     [] s>0 -> true;
/// endmodule
/// ";
///
/// let program = PrismParser::new().parse_program(input).unwrap();
/// assert_eq!(program.model_type(), ProgramModelType::Dtmc);
/// assert_eq!(program.nr_modules(), 1);
/// assert!(program.has_undefined_constants());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrismParser {}

impl Default for PrismParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseProgram for PrismParser {
    fn parse_program(&self, input: &str) -> Result<Program, Error> {
        let mut pairs = PestPmcParser::parse(Rule::program, input)?;
        let mut pairs = pairs.next().expect("Missing: program").into_inner();

        let model_type = parse_model_type(pairs.next().expect("Missing: model type"));
        debug!("Parsing PRISM program of type {model_type}");

        let mut builder = ProgramBuilder::new(model_type);
        for pair in pairs {
            builder = Self::parse_program_element(pair, builder)?;
        }

        let program = builder
            .build()
            .with_context(|| "Program failed validation: ")?;
        info!(
            "Parsed PRISM program with {} modules and {} undefined constants",
            program.nr_modules(),
            program.undefined_constants().count()
        );

        Ok(program)
    }
}

impl PrismParser {
    /// Create a new parser for PRISM programs
    pub fn new() -> Self {
        PrismParser {}
    }

    /// Add a single top-level declaration to the program under construction
    fn parse_program_element(
        pair: Pair<'_, Rule>,
        builder: ProgramBuilder,
    ) -> Result<ProgramBuilder, Error> {
        let line = pair.line_col().0;
        let builder = match pair.as_rule() {
            Rule::constant_declaration => builder.with_constant(parse_constant(pair)?),
            Rule::global_declaration => {
                let variable = pair.into_inner().next().expect("Missing: variable");
                builder.with_global_variable(parse_variable(variable)?)
            }
            Rule::formula_declaration => builder.with_formula(parse_formula(pair)?),
            Rule::label_declaration => builder.with_label(parse_label(pair)?),
            Rule::module_declaration => builder.with_module(parse_module(pair)?),
            Rule::renamed_module => {
                let (name, base, renaming) = parse_renamed_module(pair);
                builder.with_renamed_module(name, &base, renaming)
            }
            Rule::rewards_declaration => builder.with_reward_structure(parse_rewards(pair)?),
            Rule::init_declaration => {
                let init = pair.into_inner().next().expect("Missing: initial states");
                Ok(builder.with_initial_states(parse_expression(init)?))
            }
            Rule::EOI => Ok(builder),
            _ => unreachable!(
                "Unknown rule for program element {:?}: {}",
                pair.as_rule(),
                pair.as_str()
            ),
        };

        builder.with_context(|| format!("Invalid declaration in line {line}: "))
    }
}

fn parse_model_type(pair: Pair<'_, Rule>) -> ProgramModelType {
    debug_assert!(
        pair.as_rule() == Rule::model_type,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    let kw = pair.into_inner().next().expect("Missing: model type keyword");
    match kw.as_rule() {
        Rule::dtmc_kw => ProgramModelType::Dtmc,
        Rule::mdp_kw => ProgramModelType::Mdp,
        Rule::ctmc_kw => ProgramModelType::Ctmc,
        _ => unreachable!(
            "Unknown rule for model type {:?}: {}",
            kw.as_rule(),
            kw.as_str()
        ),
    }
}

fn parse_constant_type(pair: Pair<'_, Rule>) -> ConstantType {
    let kw = pair.into_inner().next().expect("Missing: type keyword");
    match kw.as_rule() {
        Rule::int_kw => ConstantType::Int,
        Rule::double_kw => ConstantType::Double,
        Rule::bool_kw => ConstantType::Bool,
        _ => unreachable!(
            "Unknown rule for constant type {:?}: {}",
            kw.as_rule(),
            kw.as_str()
        ),
    }
}

/// Parse a constant declaration like `const double p = 0.5;`
///
/// Constants without a type are integers.
fn parse_constant(pair: Pair<'_, Rule>) -> ParseResult<Constant> {
    debug_assert!(
        pair.as_rule() == Rule::constant_declaration,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    let mut pairs = pair.into_inner().peekable();

    let mut ty = ConstantType::Int;
    if let Some(p) = pairs.next_if(|p| p.as_rule() == Rule::constant_type) {
        ty = parse_constant_type(p);
    }

    let name = parse_identifier(&pairs.next().expect("Missing: constant name"));
    let value = pairs.next().map(parse_expression).transpose()?;

    Ok(Constant::new(name, ty, value))
}

/// Parse a variable declaration like `s : [0..7] init 0;`
fn parse_variable(pair: Pair<'_, Rule>) -> ParseResult<Variable> {
    debug_assert!(
        pair.as_rule() == Rule::variable_declaration,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    let mut pairs = pair.into_inner();
    let name = parse_identifier(&pairs.next().expect("Missing: variable name"));

    let ty = pairs
        .next()
        .expect("Missing: variable type")
        .into_inner()
        .next()
        .expect("Missing: variable type");
    let ty = match ty.as_rule() {
        Rule::range_type => {
            let mut bounds = ty.into_inner();
            let lower = parse_expression(bounds.next().expect("Missing: lower bound"))?;
            let upper = parse_expression(bounds.next().expect("Missing: upper bound"))?;
            VariableType::Bounded { lower, upper }
        }
        Rule::bool_kw => VariableType::Bool,
        _ => unreachable!(
            "Unknown rule for variable type {:?}: {}",
            ty.as_rule(),
            ty.as_str()
        ),
    };

    let init = pairs.next().map(parse_expression).transpose()?;

    Ok(Variable::new(name, ty, init))
}

fn parse_formula(pair: Pair<'_, Rule>) -> ParseResult<NamedFormula> {
    let mut pairs = pair.into_inner();
    let name = parse_identifier(&pairs.next().expect("Missing: formula name"));
    let expr = parse_expression(pairs.next().expect("Missing: formula"))?;

    Ok(NamedFormula::new(name, expr))
}

fn parse_label(pair: Pair<'_, Rule>) -> ParseResult<Label> {
    let mut pairs = pair.into_inner();
    let name = parse_quoted_name(pairs.next().expect("Missing: label name"));
    let expr = parse_expression(pairs.next().expect("Missing: label expression"))?;

    Ok(Label::new(name, expr))
}

/// Parse an action `[a]`, returning `None` for the empty action `[]`
fn parse_action(pair: Pair<'_, Rule>) -> Option<Identifier> {
    debug_assert!(
        pair.as_rule() == Rule::action,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    pair.into_inner().next().map(|id| parse_identifier(&id))
}

fn parse_module(pair: Pair<'_, Rule>) -> ParseResult<Module> {
    debug_assert!(
        pair.as_rule() == Rule::module_declaration,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    let mut pairs = pair.into_inner();
    let name = parse_identifier(&pairs.next().expect("Missing: module name"));

    let mut variables = Vec::new();
    let mut commands = Vec::new();
    for pair in pairs {
        match pair.as_rule() {
            Rule::variable_declaration => variables.push(parse_variable(pair)?),
            Rule::command => commands.push(parse_command(pair)?),
            _ => unreachable!(
                "Unknown rule in module {:?}: {}",
                pair.as_rule(),
                pair.as_str()
            ),
        }
    }

    Ok(Module::new(name, variables, commands))
}

/// Parse a command like `[a] s=0 -> 0.5 : (s'=1) + 0.5 : (s'=2);`
fn parse_command(pair: Pair<'_, Rule>) -> ParseResult<Command> {
    let mut pairs = pair.into_inner();

    let action = parse_action(pairs.next().expect("Missing: action"));
    let guard = parse_expression(pairs.next().expect("Missing: guard"))?;
    let updates = pairs.map(parse_update).collect::<Result<Vec<_>, _>>()?;

    Ok(Command::new(action, guard, updates))
}

fn parse_update(pair: Pair<'_, Rule>) -> ParseResult<Update> {
    debug_assert!(
        pair.as_rule() == Rule::update,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    let mut pairs = pair.into_inner().peekable();
    let probability = pairs
        .next_if(|p| p.as_rule() == Rule::expression)
        .map(parse_expression)
        .transpose()?;

    let assignments = pairs
        .next()
        .expect("Missing: assignments")
        .into_inner()
        .filter(|p| p.as_rule() == Rule::assignment)
        .map(|p| {
            let mut pairs = p.into_inner();
            let variable = parse_identifier(&pairs.next().expect("Missing: assigned variable"));
            let value = parse_expression(pairs.next().expect("Missing: assigned value"))?;
            Ok(Assignment::new(variable, value))
        })
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(Update::new(probability, assignments))
}

/// Parse `module name = base [a=b, ...] endmodule` into the name of the new
/// module, the name of the base module and the renaming
fn parse_renamed_module(pair: Pair<'_, Rule>) -> (Identifier, Identifier, Vec<(Identifier, Identifier)>) {
    let mut pairs = pair.into_inner();
    let name = parse_identifier(&pairs.next().expect("Missing: module name"));
    let base = parse_identifier(&pairs.next().expect("Missing: renamed module"));

    let renaming = pairs
        .map(|p| {
            let mut ids = p.into_inner();
            let from = parse_identifier(&ids.next().expect("Missing: renamed identifier"));
            let to = parse_identifier(&ids.next().expect("Missing: new identifier"));
            (from, to)
        })
        .collect();

    (name, base, renaming)
}

fn parse_rewards(pair: Pair<'_, Rule>) -> ParseResult<RewardStructure> {
    let mut pairs = pair.into_inner().peekable();

    let name = pairs
        .next_if(|p| p.as_rule() == Rule::quoted_name)
        .map(parse_quoted_name);

    let items = pairs
        .map(|item| {
            let rule = item.as_rule();
            let mut pairs = item.into_inner();

            let action = if rule == Rule::transition_reward {
                Some(parse_action(pairs.next().expect("Missing: action")))
            } else {
                None
            };
            let guard = parse_expression(pairs.next().expect("Missing: reward guard"))?;
            let value = parse_expression(pairs.next().expect("Missing: reward value"))?;

            Ok(match action {
                Some(action) => RewardItem::Transition {
                    action,
                    guard,
                    value,
                },
                None => RewardItem::State { guard, value },
            })
        })
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(RewardStructure::new(name, items))
}

/// Parse constant definitions of the form `N=16,pL=0.1`
///
/// Values must not refer to other constants.
///
/// # Example
///
/// ```
/// use pmc_model::expressions::{Identifier, Value};
/// use pmc_parser::prism::parse_constant_definitions;
///
/// let definitions = parse_constant_definitions("N=16, pL=0.1").unwrap();
/// assert_eq!(definitions[&Identifier::new("N")], Value::Int(16));
/// assert_eq!(definitions[&Identifier::new("pL")], Value::Double(0.1));
/// ```
pub fn parse_constant_definitions(input: &str) -> Result<HashMap<Identifier, Value>, Error> {
    let mut pairs = PestPmcParser::parse(Rule::constant_definitions, input)?;
    let pairs = pairs
        .next()
        .expect("Missing: constant definitions")
        .into_inner();

    let mut definitions = HashMap::new();
    for pair in pairs.filter(|p| p.as_rule() == Rule::constant_definition) {
        let span = pair.as_span();
        let mut inner = pair.into_inner();
        let name = parse_identifier(&inner.next().expect("Missing: constant name"));
        let value: Expression = parse_expression(inner.next().expect("Missing: constant value"))?;

        let value = value.evaluate(&Valuation::new()).map_err(|err| {
            new_parsing_error(format!("Cannot evaluate value of {name}: {err}"), span)
        })?;
        if definitions.insert(name.clone(), value).is_some() {
            return Err(anyhow!("Constant {name} is defined multiple times"));
        }
    }

    Ok(definitions)
}
