//! Parser for properties in probabilistic computation tree logic
//!
//! Properties are separated by `;` or line breaks, text after `//` is a
//! comment. Each property may be prefixed with a name, e.g.
//!
//! ```text
//! "one": P=? [F "one"];
//! Pmax>=0.5 [ "safe" U<=10 "goal" ]
//! R{"coin_flips"}=? [F "done"]
//! ```
//!
//! The text of every property is kept, such that a parsed property displays
//! exactly as it was written.

use std::iter::Peekable;

use anyhow::{Context, Error};
use log::debug;
use pest::{
    Parser,
    iterators::{Pair, Pairs},
    pratt_parser::{Assoc, PrattParser},
};
use pmc_logic::{
    Bound, ComparisonOp, Formula, OptimizationDirection, PathFormula, Property,
    RewardPathFormula,
};
use pmc_model::expressions::Expression;

use crate::{
    ParseProperties,
    grammar::{
        PestPmcParser, Rule, expressions::parse_expression, new_parsing_error, parse_natural,
        parse_quoted_name,
    },
};

type ParseResult<T> = Result<T, Box<pest::error::Error<()>>>;

// Pratt parser for the boolean connectives of state formulas
lazy_static::lazy_static! {
   static ref FORMULA_PRATT_PARSER: PrattParser<Rule> = {
        use pest::pratt_parser::{Op};

        // Precedence is defined lowest to highest
        PrattParser::new()
            .op(Op::infix(Rule::f_implies, Assoc::Right))
            .op(Op::infix(Rule::f_or, Assoc::Left))
            .op(Op::infix(Rule::f_and, Assoc::Left))
            .op(Op::prefix(Rule::f_not))
    };
}

/// Parser for lists of PCTL properties
///
/// # Example
///
/// ```
/// use pmc_parser::{ParseProperties, pctl::PctlParser};
///
/// let properties = PctlParser::new().parse_properties("P=? [F \"one\"]").unwrap();
/// assert_eq!(properties.len(), 1);
/// assert_eq!(properties[0].to_string(), "P=? [F \"one\"]");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PctlParser {}

impl Default for PctlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ParseProperties for PctlParser {
    fn parse_properties(&self, input: &str) -> Result<Vec<Property>, Error> {
        let properties = split_properties(input)
            .into_iter()
            .map(|text| self.parse_property(text))
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Parsed {} properties", properties.len());
        Ok(properties)
    }
}

impl PctlParser {
    /// Create a new parser for PCTL properties
    pub fn new() -> Self {
        PctlParser {}
    }

    /// Parse a single property
    pub fn parse_property(&self, text: &str) -> Result<Property, Error> {
        let mut pairs = PestPmcParser::parse(Rule::property, text)
            .with_context(|| format!("Failed to parse property '{text}': "))?;
        let mut pairs = pairs
            .next()
            .expect("Missing: property")
            .into_inner()
            .peekable();

        let name = pairs
            .next_if(|p| p.as_rule() == Rule::property_name)
            .map(|p| parse_quoted_name(p.into_inner().next().expect("Missing: property name")));

        let formula = parse_state_formula(pairs.next().expect("Missing: state formula"))
            .with_context(|| format!("Invalid property '{text}': "))?;

        Ok(Property::new(name, text, formula))
    }
}

/// Split the input into the texts of the single properties
///
/// Properties are separated by `;` or line breaks, `//` starts a comment.
/// Both are ignored inside quoted names.
fn split_properties(input: &str) -> Vec<&str> {
    let mut properties = Vec::new();

    for line in input.lines() {
        let mut start = 0;
        let mut end = line.len();
        let mut quoted = false;

        for (i, c) in line.char_indices() {
            match c {
                '"' => quoted = !quoted,
                ';' if !quoted => {
                    properties.push(&line[start..i]);
                    start = i + 1;
                }
                '/' if !quoted && line[i + 1..].starts_with('/') => {
                    end = i;
                    break;
                }
                _ => {}
            }
        }
        properties.push(&line[start..end]);
    }

    properties
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_state_formula(pair: Pair<'_, Rule>) -> ParseResult<Formula> {
    debug_assert!(
        pair.as_rule() == Rule::state_formula,
        "Expected a state formula, got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    FORMULA_PRATT_PARSER
        .map_primary(parse_formula_primary)
        .map_infix(|lhs, op, rhs| {
            let (lhs, rhs) = (Box::new(lhs?), Box::new(rhs?));

            Ok(match op.as_rule() {
                Rule::f_and => Formula::And(lhs, rhs),
                Rule::f_or => Formula::Or(lhs, rhs),
                Rule::f_implies => Formula::Implies(lhs, rhs),
                _ => unreachable!(
                    "Unknown rule for binary formula operator {:?}: {}",
                    op.as_rule(),
                    op.as_str()
                ),
            })
        })
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::f_not => Ok(Formula::Not(Box::new(rhs?))),
            _ => unreachable!(
                "Unknown rule for unary formula operator {:?}: {}",
                op.as_rule(),
                op.as_str()
            ),
        })
        .parse(pair.into_inner())
}

fn parse_formula_primary(pair: Pair<'_, Rule>) -> ParseResult<Formula> {
    match pair.as_rule() {
        Rule::probability_operator => parse_probability_operator(pair),
        Rule::reward_operator => parse_reward_operator(pair),
        Rule::long_run_operator => parse_long_run_operator(pair),
        Rule::quoted_name => Ok(Formula::Label(parse_quoted_name(pair))),
        Rule::expression => Ok(match parse_expression(pair)? {
            Expression::Bool(true) => Formula::True,
            Expression::Bool(false) => Formula::False,
            expr => Formula::Atomic(expr),
        }),
        Rule::state_formula => parse_state_formula(pair),
        _ => unreachable!(
            "Unknown rule for state formula {:?}: {}",
            pair.as_rule(),
            pair.as_str()
        ),
    }
}

fn parse_direction(pair: Pair<'_, Rule>) -> OptimizationDirection {
    let dir = pair.into_inner().next().expect("Missing: direction");
    match dir.as_rule() {
        Rule::min_kw => OptimizationDirection::Minimize,
        Rule::max_kw => OptimizationDirection::Maximize,
        _ => unreachable!(
            "Unknown rule for optimization direction {:?}: {}",
            dir.as_rule(),
            dir.as_str()
        ),
    }
}

/// Parse a bound like `=?` or `>=0.5`
///
/// Thresholds of probability operators have to lie in [0, 1].
fn parse_bound(pair: Pair<'_, Rule>, is_probability: bool) -> ParseResult<Bound> {
    debug_assert!(
        pair.as_rule() == Rule::bound,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    let first = pairs.next().expect("Missing: bound");
    if first.as_rule() == Rule::query {
        return Ok(Bound::Query);
    }

    let op = first.into_inner().next().expect("Missing: comparison operator");
    let op = match op.as_rule() {
        Rule::geq => ComparisonOp::Geq,
        Rule::gt => ComparisonOp::Gt,
        Rule::leq => ComparisonOp::Leq,
        Rule::lt => ComparisonOp::Lt,
        _ => unreachable!(
            "Unknown rule for comparison operator {:?}: {}",
            op.as_rule(),
            op.as_str()
        ),
    };

    let threshold = pairs.next().expect("Missing: threshold");
    let threshold = threshold
        .as_str()
        .parse::<f64>()
        .map_err(|err| new_parsing_error(format!("Invalid threshold: {err}"), threshold.as_span()))?;

    if is_probability && !(0.0..=1.0).contains(&threshold) {
        return Err(new_parsing_error(
            format!("Probability threshold {threshold} does not lie in [0, 1]"),
            span,
        ));
    }

    Ok(Bound::Compare(op, threshold))
}

/// Parse the optional direction and the bound of an operator
fn parse_operator_head(
    pairs: &mut Peekable<Pairs<'_, Rule>>,
    is_probability: bool,
) -> ParseResult<(Option<OptimizationDirection>, Bound)> {
    let direction = pairs
        .next_if(|p| p.as_rule() == Rule::optimization_direction)
        .map(parse_direction);
    let bound = parse_bound(pairs.next().expect("Missing: bound"), is_probability)?;

    Ok((direction, bound))
}

fn parse_step_bound(pair: Option<Pair<'_, Rule>>) -> ParseResult<Option<u64>> {
    pair.map(|p| parse_natural(&p.into_inner().next().expect("Missing: step bound")))
        .transpose()
}

/// Split a temporal operator into its optional step bound and its operands,
/// skipping the operator keyword
fn temporal_operands(pair: Pair<'_, Rule>) -> ParseResult<(Option<u64>, Vec<Formula>)> {
    let mut step_bound = None;
    let mut operands = Vec::new();
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::step_bound => step_bound = parse_step_bound(Some(p))?,
            Rule::state_formula => operands.push(parse_state_formula(p)?),
            _ => {}
        }
    }

    Ok((step_bound, operands))
}

fn parse_path_formula(pair: Pair<'_, Rule>) -> ParseResult<PathFormula> {
    debug_assert!(
        pair.as_rule() == Rule::path_formula,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    let pair = pair.into_inner().next().expect("Missing: path formula");
    let rule = pair.as_rule();
    let (step_bound, mut operands) = temporal_operands(pair)?;
    let mut operand = || Box::new(operands.remove(0));

    Ok(match rule {
        Rule::next => PathFormula::Next(operand()),
        Rule::eventually => PathFormula::Eventually(step_bound, operand()),
        Rule::globally => PathFormula::Globally(step_bound, operand()),
        Rule::until => {
            let lhs = operand();
            PathFormula::Until(lhs, step_bound, operand())
        }
        _ => unreachable!("Unknown rule for path formula {rule:?}"),
    })
}

fn parse_probability_operator(pair: Pair<'_, Rule>) -> ParseResult<Formula> {
    let mut pairs = pair.into_inner().peekable();
    let (direction, bound) = parse_operator_head(&mut pairs, true)?;
    let path = parse_path_formula(pairs.next().expect("Missing: path formula"))?;

    Ok(Formula::Probability {
        direction,
        bound,
        path,
    })
}

fn parse_reward_operator(pair: Pair<'_, Rule>) -> ParseResult<Formula> {
    let mut pairs = pair.into_inner().peekable();

    let reward_model = pairs
        .next_if(|p| p.as_rule() == Rule::reward_model_name)
        .map(|p| parse_quoted_name(p.into_inner().next().expect("Missing: reward model")));
    let (direction, bound) = parse_operator_head(&mut pairs, false)?;

    let path = pairs
        .next()
        .expect("Missing: reward path formula")
        .into_inner()
        .next()
        .expect("Missing: reward path formula");
    let path = match path.as_rule() {
        Rule::cumulative | Rule::instantaneous => {
            let rule = path.as_rule();
            let steps = parse_natural(&path.into_inner().next().expect("Missing: steps"))?;
            if rule == Rule::cumulative {
                RewardPathFormula::Cumulative(steps)
            } else {
                RewardPathFormula::Instantaneous(steps)
            }
        }
        Rule::eventually => {
            let span = path.as_span();
            let (step_bound, mut operands) = temporal_operands(path)?;
            if step_bound.is_some() {
                return Err(new_parsing_error(
                    "Step bounded reachability rewards are not supported",
                    span,
                ));
            }
            RewardPathFormula::Reachability(Box::new(operands.remove(0)))
        }
        _ => unreachable!(
            "Unknown rule for reward path formula {:?}: {}",
            path.as_rule(),
            path.as_str()
        ),
    };

    Ok(Formula::Reward {
        reward_model,
        direction,
        bound,
        path,
    })
}

fn parse_long_run_operator(pair: Pair<'_, Rule>) -> ParseResult<Formula> {
    let mut pairs = pair.into_inner().peekable();
    let (direction, bound) = parse_operator_head(&mut pairs, true)?;
    let formula = parse_state_formula(pairs.next().expect("Missing: state formula"))?;

    Ok(Formula::LongRunAverage {
        direction,
        bound,
        formula: Box::new(formula),
    })
}

#[cfg(test)]
mod tests {
    use pmc_model::expressions::BinaryOp;

    use super::*;

    fn parse(input: &str) -> Vec<Property> {
        PctlParser::new().parse_properties(input).unwrap()
    }

    fn parse_formula(input: &str) -> Formula {
        PctlParser::new()
            .parse_property(input)
            .unwrap()
            .raw_formula()
            .clone()
    }

    fn label(l: &str) -> Box<Formula> {
        Box::new(Formula::Label(l.to_string()))
    }

    #[test]
    fn test_eventually_round_trip() {
        let properties = parse("P=? [F \"one\"]");

        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].to_string(), "P=? [F \"one\"]");
        assert_eq!(
            properties[0].raw_formula(),
            &Formula::Probability {
                direction: None,
                bound: Bound::Query,
                path: PathFormula::Eventually(None, label("one")),
            }
        );
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let input = "P=? [F \"one\"]";
        assert_eq!(parse(input), parse(input));
        assert_eq!(parse(&parse(input)[0].to_string()), parse(input));
    }

    #[test]
    fn test_multiple_properties_and_comments() {
        let properties = parse(
            "// properties of the die
P=? [F \"one\"]; P=? [F \"two\"]
\"six\": P>=0.1 [F \"six\"] // named
",
        );

        assert_eq!(properties.len(), 3);
        assert_eq!(properties[1].to_string(), "P=? [F \"two\"]");
        assert_eq!(properties[2].name(), Some("six"));
        assert_eq!(properties[2].to_string(), "\"six\": P>=0.1 [F \"six\"]");
    }

    #[test]
    fn test_separators_inside_quoted_names() {
        let properties = parse("P=? [F \"a;b\"]; \"x//y\": P=? [G \"x//y\"] // comment");

        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].source_text(), "P=? [F \"a;b\"]");
        assert_eq!(
            properties[0].raw_formula(),
            &Formula::Probability {
                direction: None,
                bound: Bound::Query,
                path: PathFormula::Eventually(None, label("a;b")),
            }
        );
        assert_eq!(properties[1].name(), Some("x//y"));
        assert_eq!(
            properties[1].raw_formula(),
            &parse_formula("P=? [G \"x//y\"]")
        );

        for property in properties {
            let reparsed = parse(&property.to_string());
            assert_eq!(reparsed.len(), 1);
            assert_eq!(reparsed[0].name(), property.name());
            assert_eq!(reparsed[0].raw_formula(), property.raw_formula());
        }
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            parse_formula("Pmax>=0.5 [ \"safe\" U<=10 \"goal\" ]"),
            Formula::Probability {
                direction: Some(OptimizationDirection::Maximize),
                bound: Bound::Compare(ComparisonOp::Geq, 0.5),
                path: PathFormula::Until(label("safe"), Some(10), label("goal")),
            }
        );

        assert_eq!(
            parse_formula("Pmin=? [ G !\"fail\" ]"),
            Formula::Probability {
                direction: Some(OptimizationDirection::Minimize),
                bound: Bound::Query,
                path: PathFormula::Globally(None, Box::new(Formula::Not(label("fail")))),
            }
        );

        assert_eq!(
            parse_formula("P<0.1 [ X s=7 ]"),
            Formula::Probability {
                direction: None,
                bound: Bound::Compare(ComparisonOp::Lt, 0.1),
                path: PathFormula::Next(Box::new(Formula::Atomic(Expression::binary(
                    Expression::identifier("s"),
                    BinaryOp::Eq,
                    Expression::Int(7)
                )))),
            }
        );

        assert_eq!(
            parse_formula("R{\"coin_flips\"}min=? [ F \"done\" ]"),
            Formula::Reward {
                reward_model: Some("coin_flips".to_string()),
                direction: Some(OptimizationDirection::Minimize),
                bound: Bound::Query,
                path: RewardPathFormula::Reachability(label("done")),
            }
        );

        assert_eq!(
            parse_formula("R<=5 [ C<=100 ]"),
            Formula::Reward {
                reward_model: None,
                direction: None,
                bound: Bound::Compare(ComparisonOp::Leq, 5.0),
                path: RewardPathFormula::Cumulative(100),
            }
        );

        assert_eq!(
            parse_formula("S=? [ \"up\" ]"),
            Formula::LongRunAverage {
                direction: None,
                bound: Bound::Query,
                formula: label("up"),
            }
        );
    }

    #[test]
    fn test_boolean_connectives() {
        let f = parse_formula("\"a\" & !\"b\" | \"c\" => true");
        let expected = Formula::Implies(
            Box::new(Formula::Or(
                Box::new(Formula::And(label("a"), Box::new(Formula::Not(label("b"))))),
                label("c"),
            )),
            Box::new(Formula::True),
        );
        assert_eq!(f, expected);
    }

    #[test]
    fn test_display_reparses() {
        let inputs = [
            "P=? [ F<=10 \"a\" & s<3 ]",
            "Pmax>=0.5 [ (\"a\" | \"b\") U \"c\" ]",
            "!(\"a\" & P>0.5 [ X \"b\" ]) => R{\"r\"}=? [ I=5 ]",
            "S<=0.2 [ s=0 | s=1 ]",
        ];
        for input in inputs {
            let f = parse_formula(input);
            assert_eq!(parse_formula(&f.to_string()), f, "Display of {input}");
        }
    }

    #[test]
    fn test_invalid_properties() {
        let inputs = [
            "P=? F \"one\"",
            "P=? [F \"one\"",
            "P>=1.5 [F \"one\"]",
            "R=? [F<=3 \"done\"]",
            "P=? [\"a\"]",
            "Q=? [F \"one\"]",
        ];
        for input in inputs {
            assert!(
                PctlParser::new().parse_properties(input).is_err(),
                "Expected error for {input:?}"
            );
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("// nothing\n;\n").is_empty());
    }
}
