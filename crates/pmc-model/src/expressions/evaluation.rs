//! Evaluation of [`Expression`]s under a valuation of their identifiers

use std::{collections::HashMap, error, fmt};

use super::{BinaryOp, Expression, Function, Identifier, UnaryOp};

/// Assignment of values to identifiers
pub type Valuation = HashMap<Identifier, Value>;

/// Result of evaluating an expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Integer value
    Int(i64),
    /// Double value
    Double(f64),
    /// Boolean value
    Bool(bool),
}

impl Value {
    /// Numeric value of the value, integers are converted to doubles
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            Value::Bool(_) => None,
        }
    }

    /// Integer value, only defined for integers
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean value, only defined for booleans
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Expression::from(*self))
    }
}

/// Error that can occur while evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// The identifier has no value in the valuation
    UnknownIdentifier(Identifier),
    /// An operator was applied to operands of the wrong type
    TypeMismatch(String),
    /// Integer division or modulo by zero
    DivisionByZero,
    /// A function was applied to the wrong number of arguments
    InvalidArguments(Function, usize),
    /// The result of an integer operation does not fit into 64 bits
    IntegerOverflow(String),
}

impl error::Error for EvaluationError {}

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationError::UnknownIdentifier(id) => {
                write!(f, "No value assigned to identifier '{id}'")
            }
            EvaluationError::TypeMismatch(msg) => write!(f, "Type mismatch: {msg}"),
            EvaluationError::DivisionByZero => write!(f, "Division by zero"),
            EvaluationError::InvalidArguments(func, n) => {
                write!(f, "Function '{func}' cannot be applied to {n} argument(s)")
            }
            EvaluationError::IntegerOverflow(expr) => write!(f, "Integer overflow in {expr}"),
        }
    }
}

impl Expression {
    /// Evaluate the expression under the given valuation
    ///
    /// Division always yields a double, as in PRISM. All other arithmetic
    /// operators stay in the integers if both operands are integers.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use pmc_model::expressions::*;
    ///
    /// let expr = Expression::Int(1) - Expression::identifier("p");
    /// let valuation = HashMap::from([(Identifier::new("p"), Value::Double(0.25))]);
    ///
    /// assert_eq!(expr.evaluate(&valuation), Ok(Value::Double(0.75)));
    /// ```
    pub fn evaluate(&self, valuation: &Valuation) -> Result<Value, EvaluationError> {
        match self {
            Expression::Int(i) => Ok(Value::Int(*i)),
            Expression::Double(d) => Ok(Value::Double(*d)),
            Expression::Bool(b) => Ok(Value::Bool(*b)),
            Expression::Identifier(id) => valuation
                .get(id)
                .copied()
                .ok_or_else(|| EvaluationError::UnknownIdentifier(id.clone())),
            Expression::Unary(op, e) => {
                let v = e.evaluate(valuation)?;
                match (op, v) {
                    (UnaryOp::Neg, Value::Int(i)) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| EvaluationError::IntegerOverflow(format!("{op}{v}"))),
                    (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    _ => Err(EvaluationError::TypeMismatch(format!(
                        "cannot apply '{op}' to {v}"
                    ))),
                }
            }
            Expression::Binary(lhs, op, rhs) => {
                let l = lhs.evaluate(valuation)?;
                let r = rhs.evaluate(valuation)?;
                evaluate_binary(l, *op, r)
            }
            Expression::Ite(c, t, e) => {
                let cond = c.evaluate(valuation)?;
                match cond.as_bool() {
                    Some(true) => t.evaluate(valuation),
                    Some(false) => e.evaluate(valuation),
                    None => Err(EvaluationError::TypeMismatch(format!(
                        "condition '{c}' is not boolean"
                    ))),
                }
            }
            Expression::Function(func, args) => {
                let args = args
                    .iter()
                    .map(|a| a.evaluate(valuation))
                    .collect::<Result<Vec<_>, _>>()?;
                evaluate_function(*func, &args)
            }
        }
    }
}

fn evaluate_binary(l: Value, op: BinaryOp, r: Value) -> Result<Value, EvaluationError> {
    let mismatch = || EvaluationError::TypeMismatch(format!("cannot apply '{op}' to {l} and {r}"));

    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::Implies | BinaryOp::Iff => {
            let (a, b) = match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => (a, b),
                _ => return Err(mismatch()),
            };
            Ok(Value::Bool(match op {
                BinaryOp::And => a && b,
                BinaryOp::Or => a || b,
                BinaryOp::Implies => !a || b,
                _ => a == b,
            }))
        }
        BinaryOp::Eq | BinaryOp::Neq => {
            let equal = match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Int(a), Value::Int(b)) => a == b,
                _ => match (l.as_f64(), r.as_f64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => return Err(mismatch()),
                },
            };
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Lt | BinaryOp::Leq | BinaryOp::Gt | BinaryOp::Geq => {
            let (a, b) = l.as_f64().zip(r.as_f64()).ok_or_else(mismatch)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Leq => a <= b,
                BinaryOp::Gt => a > b,
                _ => a >= b,
            }))
        }
        BinaryOp::Div => {
            let (a, b) = l.as_f64().zip(r.as_f64()).ok_or_else(mismatch)?;
            if b == 0.0 {
                return Err(EvaluationError::DivisionByZero);
            }
            Ok(Value::Double(a / b))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
            if let (Value::Int(a), Value::Int(b)) = (l, r) {
                let res = match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    _ => a.checked_mul(b),
                };
                return res
                    .map(Value::Int)
                    .ok_or_else(|| EvaluationError::IntegerOverflow(format!("{l} {op} {r}")));
            }

            let (a, b) = l.as_f64().zip(r.as_f64()).ok_or_else(mismatch)?;
            Ok(Value::Double(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                _ => a * b,
            }))
        }
    }
}

fn evaluate_function(func: Function, args: &[Value]) -> Result<Value, EvaluationError> {
    let invalid = || EvaluationError::InvalidArguments(func, args.len());
    let numeric = |v: &Value| {
        v.as_f64()
            .ok_or_else(|| EvaluationError::TypeMismatch(format!("'{func}' expects numbers, got {v}")))
    };

    match func {
        Function::Min | Function::Max => {
            if args.len() < 2 {
                return Err(invalid());
            }
            if let Some(ints) = args.iter().map(Value::as_i64).collect::<Option<Vec<_>>>() {
                let res = if func == Function::Min {
                    ints.into_iter().min()
                } else {
                    ints.into_iter().max()
                };
                return res.map(Value::Int).ok_or_else(invalid);
            }
            let values = args.iter().map(numeric).collect::<Result<Vec<_>, _>>()?;
            let res = values
                .into_iter()
                .reduce(|a, b| if func == Function::Min { a.min(b) } else { a.max(b) })
                .ok_or_else(invalid)?;
            Ok(Value::Double(res))
        }
        Function::Floor | Function::Ceil => {
            let [x] = args else {
                return Err(invalid());
            };
            let x = numeric(x)?;
            let res = if func == Function::Floor { x.floor() } else { x.ceil() };
            Ok(Value::Int(res as i64))
        }
        Function::Pow => {
            let [base, exp] = args else {
                return Err(invalid());
            };
            if let (Value::Int(b), Value::Int(e)) = (base, exp)
                && let Ok(e) = u32::try_from(*e)
                && let Some(res) = b.checked_pow(e)
            {
                return Ok(Value::Int(res));
            }
            Ok(Value::Double(numeric(base)?.powf(numeric(exp)?)))
        }
        Function::Mod => {
            let [Value::Int(i), Value::Int(n)] = args else {
                return Err(invalid());
            };
            if *n == 0 {
                return Err(EvaluationError::DivisionByZero);
            }
            i.checked_rem_euclid(*n)
                .map(Value::Int)
                .ok_or_else(|| EvaluationError::IntegerOverflow(format!("mod({i}, {n})")))
        }
        Function::Log => {
            let [x, b] = args else {
                return Err(invalid());
            };
            Ok(Value::Double(numeric(x)?.log(numeric(b)?)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Expression {
        Expression::identifier(name)
    }

    #[test]
    fn test_arithmetic_stays_integer() {
        let expr = Expression::Int(2) * Expression::Int(3) + Expression::Int(1);
        assert_eq!(expr.evaluate(&Valuation::new()), Ok(Value::Int(7)));
    }

    #[test]
    fn test_division_yields_double() {
        let expr = Expression::Int(1) / Expression::Int(6);
        let v = expr.evaluate(&Valuation::new()).unwrap();
        assert!((v.as_f64().unwrap() - 1.0 / 6.0).abs() < 1e-12);

        let expr = Expression::Int(1) / Expression::Int(0);
        assert_eq!(
            expr.evaluate(&Valuation::new()),
            Err(EvaluationError::DivisionByZero)
        );
    }

    #[test]
    fn test_unknown_identifier() {
        let expr = id("pL") + Expression::Int(1);
        assert_eq!(
            expr.evaluate(&Valuation::new()),
            Err(EvaluationError::UnknownIdentifier(Identifier::new("pL")))
        );
    }

    #[test]
    fn test_boolean_and_relational() {
        let valuation = Valuation::from([
            (Identifier::new("s"), Value::Int(7)),
            (Identifier::new("done"), Value::Bool(true)),
        ]);

        let expr = Expression::binary(
            Expression::binary(id("s"), BinaryOp::Eq, Expression::Int(7)),
            BinaryOp::And,
            id("done"),
        );
        assert_eq!(expr.evaluate(&valuation), Ok(Value::Bool(true)));

        let expr = Expression::binary(id("s"), BinaryOp::Lt, Expression::Double(6.5));
        assert_eq!(expr.evaluate(&valuation), Ok(Value::Bool(false)));

        let expr = Expression::binary(id("s"), BinaryOp::And, id("done"));
        assert!(matches!(
            expr.evaluate(&valuation),
            Err(EvaluationError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_ite() {
        let valuation = Valuation::from([(Identifier::new("i"), Value::Int(16))]);
        let expr = Expression::Ite(
            Box::new(Expression::binary(id("i"), BinaryOp::Eq, Expression::Int(16))),
            Box::new(Expression::Int(1)),
            Box::new(Expression::Int(0)),
        );
        assert_eq!(expr.evaluate(&valuation), Ok(Value::Int(1)));
    }

    #[test]
    fn test_functions() {
        let v = Valuation::new();
        let call = |func, args: Vec<Expression>| Expression::Function(func, args).evaluate(&v);

        assert_eq!(
            call(Function::Min, vec![Expression::Int(3), Expression::Int(1)]),
            Ok(Value::Int(1))
        );
        assert_eq!(
            call(Function::Max, vec![Expression::Int(3), Expression::Double(4.5)]),
            Ok(Value::Double(4.5))
        );
        assert_eq!(
            call(Function::Floor, vec![Expression::Double(2.7)]),
            Ok(Value::Int(2))
        );
        assert_eq!(
            call(Function::Ceil, vec![Expression::Double(2.1)]),
            Ok(Value::Int(3))
        );
        assert_eq!(
            call(Function::Pow, vec![Expression::Int(2), Expression::Int(10)]),
            Ok(Value::Int(1024))
        );
        assert_eq!(
            call(Function::Mod, vec![Expression::Int(-1), Expression::Int(4)]),
            Ok(Value::Int(3))
        );
        assert_eq!(
            call(Function::Min, vec![Expression::Int(3)]),
            Err(EvaluationError::InvalidArguments(Function::Min, 1))
        );
    }

    #[test]
    fn test_integer_overflow() {
        let v = Valuation::new();
        let overflow = |res: Result<Value, EvaluationError>| {
            assert!(
                matches!(res, Err(EvaluationError::IntegerOverflow(_))),
                "Expected an overflow, got {res:?}"
            )
        };

        overflow((-Expression::Int(i64::MIN)).evaluate(&v));
        overflow((Expression::Int(i64::MAX) + Expression::Int(1)).evaluate(&v));
        overflow(
            Expression::Function(
                Function::Mod,
                vec![Expression::Int(i64::MIN), Expression::Int(-1)],
            )
            .evaluate(&v),
        );

        assert_eq!(
            (-Expression::Int(i64::MAX)).evaluate(&v),
            Ok(Value::Int(-i64::MAX))
        );
    }
}
