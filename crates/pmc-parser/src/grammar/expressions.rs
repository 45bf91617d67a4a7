//! Conversion of parsed expressions
//!
//! Operator precedence follows the PRISM language: the conditional operator
//! binds weakest, followed by `<=>`, `=>`, `|`, `&`, `!`, (in)equality,
//! relations, additive and multiplicative operators and finally unary minus.

use anyhow::anyhow;
use pest::{
    Parser,
    iterators::Pair,
    pratt_parser::{Assoc, PrattParser},
};
use pmc_model::expressions::{BinaryOp, Expression, Function, UnaryOp};

use crate::grammar::{PestPmcParser, Rule, new_parsing_error, parse_identifier};

// Pratt parser responsible for maintaining operator precedence
lazy_static::lazy_static! {
   pub(crate) static ref PRATT_PARSER: PrattParser<Rule> = {
        use pest::pratt_parser::{Op};

        // Precedence is defined lowest to highest
        PrattParser::new()
            .op(Op::infix(Rule::iff, Assoc::Left))
            .op(Op::infix(Rule::implies, Assoc::Right))
            .op(Op::infix(Rule::or, Assoc::Left))
            .op(Op::infix(Rule::and, Assoc::Left))
            .op(Op::prefix(Rule::not))
            .op(Op::infix(Rule::eq, Assoc::Left) | Op::infix(Rule::neq, Assoc::Left))
            .op(Op::infix(Rule::leq, Assoc::Left)
                | Op::infix(Rule::lt, Assoc::Left)
                | Op::infix(Rule::geq, Assoc::Left)
                | Op::infix(Rule::gt, Assoc::Left))
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
            .op(Op::infix(Rule::mul, Assoc::Left) | Op::infix(Rule::div, Assoc::Left))
            .op(Op::prefix(Rule::neg))
    };
}

/// Parse a standalone expression, e.g. the value column of a transition file
pub(crate) fn parse_expression_str(input: &str) -> Result<Expression, anyhow::Error> {
    let mut pairs = PestPmcParser::parse(Rule::expression_input, input)?;
    let pair = pairs
        .next()
        .ok_or_else(|| anyhow!("Expected an expression, got '{input}'"))?;

    Ok(parse_expression(pair)?)
}

/// Parse an expression, including conditional expressions
pub(crate) fn parse_expression(
    pair: Pair<'_, Rule>,
) -> Result<Expression, Box<pest::error::Error<()>>> {
    debug_assert!(
        pair.as_rule() == Rule::expression,
        "Expected an expression, got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    let mut pairs = pair.into_inner();
    let cond = parse_binary_expression(pairs.next().expect("Missing: expression"))?;

    match (pairs.next(), pairs.next()) {
        (Some(then), Some(els)) => Ok(Expression::Ite(
            Box::new(cond),
            Box::new(parse_expression(then)?),
            Box::new(parse_expression(els)?),
        )),
        _ => Ok(cond),
    }
}

fn parse_binary_expression(
    pair: Pair<'_, Rule>,
) -> Result<Expression, Box<pest::error::Error<()>>> {
    debug_assert!(
        pair.as_rule() == Rule::binary_expression,
        "Got rule {:?} for {}",
        pair.as_rule(),
        pair.as_str()
    );

    PRATT_PARSER
        .map_primary(parse_primary)
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::iff => BinaryOp::Iff,
                Rule::implies => BinaryOp::Implies,
                Rule::or => BinaryOp::Or,
                Rule::and => BinaryOp::And,
                Rule::eq => BinaryOp::Eq,
                Rule::neq => BinaryOp::Neq,
                Rule::leq => BinaryOp::Leq,
                Rule::lt => BinaryOp::Lt,
                Rule::geq => BinaryOp::Geq,
                Rule::gt => BinaryOp::Gt,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                _ => unreachable!(
                    "Unknown rule for binary operator {:?}: {}",
                    op.as_rule(),
                    op.as_str()
                ),
            };

            Ok(Expression::binary(lhs?, op, rhs?))
        })
        .map_prefix(|op, rhs| {
            let op = match op.as_rule() {
                Rule::not => UnaryOp::Not,
                Rule::neg => UnaryOp::Neg,
                _ => unreachable!(
                    "Unknown rule for unary operator {:?}: {}",
                    op.as_rule(),
                    op.as_str()
                ),
            };

            Ok(Expression::Unary(op, Box::new(rhs?)))
        })
        .parse(pair.into_inner())
}

fn parse_primary(pair: Pair<'_, Rule>) -> Result<Expression, Box<pest::error::Error<()>>> {
    match pair.as_rule() {
        Rule::integer => pair.as_str().parse::<i64>().map(Expression::Int).map_err(|err| {
            new_parsing_error(format!("Invalid integer literal: {err}"), pair.as_span())
        }),
        Rule::double => pair.as_str().parse::<f64>().map(Expression::Double).map_err(|err| {
            new_parsing_error(format!("Invalid double literal: {err}"), pair.as_span())
        }),
        Rule::bool_true => Ok(Expression::Bool(true)),
        Rule::bool_false => Ok(Expression::Bool(false)),
        Rule::identifier => Ok(Expression::Identifier(parse_identifier(&pair))),
        Rule::function_call => parse_function_call(pair),
        Rule::expression => parse_expression(pair),
        _ => unreachable!(
            "Unknown rule for expression atom {:?}: {}",
            pair.as_rule(),
            pair.as_str()
        ),
    }
}

fn parse_function_call(pair: Pair<'_, Rule>) -> Result<Expression, Box<pest::error::Error<()>>> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();

    let name = pairs.next().expect("Missing: function name");
    let func = Function::from_name(name.as_str())
        .ok_or_else(|| new_parsing_error(format!("Unknown function '{}'", name.as_str()), span))?;

    let args = pairs
        .map(parse_expression)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Expression::Function(func, args))
}

#[cfg(test)]
mod tests {
    use pmc_model::expressions::{Identifier, Valuation, Value};

    use super::*;

    fn parse(input: &str) -> Expression {
        parse_expression_str(input).unwrap()
    }

    #[test]
    fn test_literals() {
        assert_eq!(parse("42"), Expression::Int(42));
        assert_eq!(parse("0.25"), Expression::Double(0.25));
        assert_eq!(parse("1e-3"), Expression::Double(1e-3));
        assert_eq!(parse("true"), Expression::Bool(true));
        assert_eq!(parse("false"), Expression::Bool(false));
        assert_eq!(parse("pK"), Expression::identifier("pK"));
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expected = Expression::Int(1) + Expression::Int(2) * Expression::identifier("x");
        assert_eq!(parse("1 + 2 * x"), expected);

        let expected = (Expression::Int(1) + Expression::Int(2)) * Expression::identifier("x");
        assert_eq!(parse("(1 + 2) * x"), expected);

        let expected = Expression::Int(1) - Expression::identifier("pK");
        assert_eq!(parse("1-pK"), expected);
    }

    #[test]
    fn test_boolean_precedence() {
        let s_eq = |v| Expression::binary(Expression::identifier("s"), BinaryOp::Eq, Expression::Int(v));

        let expected = Expression::binary(
            s_eq(0),
            BinaryOp::Or,
            Expression::binary(s_eq(1), BinaryOp::And, s_eq(2)),
        );
        assert_eq!(parse("s=0 | s=1 & s=2"), expected);

        assert_eq!(parse("!s=7"), !s_eq(7));
    }

    #[test]
    fn test_implies_is_right_associative() {
        let id = Expression::identifier;
        let expected = Expression::binary(
            id("a"),
            BinaryOp::Implies,
            Expression::binary(id("b"), BinaryOp::Implies, id("c")),
        );
        assert_eq!(parse("a => b => c"), expected);
    }

    #[test]
    fn test_conditional_and_functions() {
        let expr = parse("x > 1 ? max(x, 3) : floor(0.5)");
        let mut valuation = Valuation::new();
        valuation.insert(Identifier::new("x"), Value::Int(2));
        assert_eq!(expr.evaluate(&valuation), Ok(Value::Int(3)));

        valuation.insert(Identifier::new("x"), Value::Int(0));
        assert_eq!(expr.evaluate(&valuation).unwrap().as_f64(), Some(0.0));
    }

    #[test]
    fn test_rational_value() {
        let expr = parse("1/3");
        assert!(expr.is_constant());
        let value = expr.evaluate(&Valuation::new()).unwrap().as_f64().unwrap();
        assert!((value - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_display_can_be_parsed_again() {
        for input in ["1 - pK", "s = 0 & (d = 1 | d = 2)", "x > 1 ? 2 : 3", "-(a + b) * c"] {
            let expr = parse(input);
            assert_eq!(parse(&expr.to_string()), expr);
        }
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(parse_expression_str("1 +").is_err());
        assert!(parse_expression_str("(a").is_err());
        assert!(parse_expression_str("module").is_err());
        assert!(parse_expression_str("").is_err());
    }
}
