//! Expressions over constants, variables and formulas of a probabilistic model
//!
//! The same expression type is used for
//! - guards, updates and likelihoods of commands in a PRISM [`crate::program::Program`],
//! - symbolic transition probabilities of parametric explicit models
//!   ([`crate::probability::Probability::Symbolic`]), and
//! - atomic propositions inside temporal logic formulas.
//!
//! Identifiers are not resolved at construction time. Whether an identifier is
//! known is checked by the component owning the expression, for example the
//! [`crate::program::builder::ProgramBuilder`], through the [`IsDeclared`]
//! trait.

use std::{
    collections::{BTreeSet, HashMap},
    fmt::{self, Display},
    ops::{Add, Div, Mul, Neg, Not, Sub},
};

pub mod evaluation;

pub use evaluation::{EvaluationError, Valuation, Value};

/// Trait for checking whether an object of type `T` has been declared
///
/// Used while parsing and building programs to reject expressions that refer
/// to unknown constants, variables or formulas.
pub trait IsDeclared<T> {
    /// Check if object of type T is declared
    fn is_declared(&self, obj: &T) -> bool;
}

/// Name of a constant, variable, formula or parameter
#[derive(Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Create a new identifier with the given name
    pub fn new(name: impl ToString) -> Self {
        Identifier(name.to_string())
    }

    /// Name of the identifier
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::new(value)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation `-`
    Neg,
    /// Boolean negation `!`
    Not,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Binary operators, arithmetic, relational and boolean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `&`
    And,
    /// `|`
    Or,
    /// `=>`
    Implies,
    /// `<=>`
    Iff,
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Leq,
    /// `>`
    Gt,
    /// `>=`
    Geq,
}

impl BinaryOp {
    /// Binding strength of the operator, higher binds tighter
    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Iff => 1,
            BinaryOp::Implies => 2,
            BinaryOp::Or => 3,
            BinaryOp::And => 4,
            BinaryOp::Eq | BinaryOp::Neq => 6,
            BinaryOp::Lt | BinaryOp::Leq | BinaryOp::Gt | BinaryOp::Geq => 7,
            BinaryOp::Add | BinaryOp::Sub => 8,
            BinaryOp::Mul | BinaryOp::Div => 9,
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Implies => "=>",
            BinaryOp::Iff => "<=>",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Leq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Geq => ">=",
        };
        write!(f, "{op}")
    }
}

/// Built-in functions of the PRISM expression language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `min(a, b, ...)`
    Min,
    /// `max(a, b, ...)`
    Max,
    /// `floor(x)`
    Floor,
    /// `ceil(x)`
    Ceil,
    /// `pow(x, y)`
    Pow,
    /// `mod(i, n)`
    Mod,
    /// `log(x, b)`
    Log,
}

impl Function {
    /// Name of the function as written in PRISM
    pub fn name(&self) -> &'static str {
        match self {
            Function::Min => "min",
            Function::Max => "max",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Pow => "pow",
            Function::Mod => "mod",
            Function::Log => "log",
        }
    }

    /// Look up a function by its PRISM name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            "floor" => Some(Function::Floor),
            "ceil" => Some(Function::Ceil),
            "pow" => Some(Function::Pow),
            "mod" => Some(Function::Mod),
            "log" => Some(Function::Log),
            _ => None,
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Expression of the PRISM expression language
///
/// # Example
///
/// ```
/// use pmc_model::expressions::*;
///
/// // 1 - pK
/// let expr = Expression::Int(1) - Expression::Identifier(Identifier::new("pK"));
/// assert_eq!(expr.to_string(), "1 - pK");
/// assert!(!expr.is_constant());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal
    Int(i64),
    /// Double literal
    Double(f64),
    /// Boolean literal
    Bool(bool),
    /// Reference to a constant, variable, formula or parameter
    Identifier(Identifier),
    /// Unary operation
    Unary(UnaryOp, Box<Expression>),
    /// Binary operation
    Binary(Box<Expression>, BinaryOp, Box<Expression>),
    /// `cond ? then : else`
    Ite(Box<Expression>, Box<Expression>, Box<Expression>),
    /// Application of a built-in function
    Function(Function, Vec<Expression>),
}

impl Expression {
    /// Create a binary expression
    pub fn binary(lhs: Expression, op: BinaryOp, rhs: Expression) -> Self {
        Expression::Binary(Box::new(lhs), op, Box::new(rhs))
    }

    /// Create a reference to the identifier with the given name
    pub fn identifier(name: impl ToString) -> Self {
        Expression::Identifier(Identifier::new(name))
    }

    /// Collect all identifiers referenced by the expression
    pub fn identifiers(&self) -> BTreeSet<&Identifier> {
        let mut ids = BTreeSet::new();
        self.collect_identifiers(&mut ids);
        ids
    }

    fn collect_identifiers<'a>(&'a self, ids: &mut BTreeSet<&'a Identifier>) {
        match self {
            Expression::Int(_) | Expression::Double(_) | Expression::Bool(_) => {}
            Expression::Identifier(id) => {
                ids.insert(id);
            }
            Expression::Unary(_, e) => e.collect_identifiers(ids),
            Expression::Binary(lhs, _, rhs) => {
                lhs.collect_identifiers(ids);
                rhs.collect_identifiers(ids);
            }
            Expression::Ite(c, t, e) => {
                c.collect_identifiers(ids);
                t.collect_identifiers(ids);
                e.collect_identifiers(ids);
            }
            Expression::Function(_, args) => args.iter().for_each(|a| a.collect_identifiers(ids)),
        }
    }

    /// Check whether the expression references no identifier at all
    pub fn is_constant(&self) -> bool {
        self.identifiers().is_empty()
    }

    /// Replace identifiers according to `renaming`
    ///
    /// Identifiers that are not part of the renaming are left untouched.
    pub fn rename(&self, renaming: &HashMap<Identifier, Identifier>) -> Expression {
        self.map_identifiers(&|id| {
            Expression::Identifier(renaming.get(id).cloned().unwrap_or_else(|| id.clone()))
        })
    }

    /// Replace identifiers by the expressions given in `substitution`
    pub fn substitute(&self, substitution: &HashMap<Identifier, Expression>) -> Expression {
        self.map_identifiers(&|id| {
            substitution
                .get(id)
                .cloned()
                .unwrap_or_else(|| Expression::Identifier(id.clone()))
        })
    }

    fn map_identifiers(&self, f: &impl Fn(&Identifier) -> Expression) -> Expression {
        match self {
            Expression::Int(_) | Expression::Double(_) | Expression::Bool(_) => self.clone(),
            Expression::Identifier(id) => f(id),
            Expression::Unary(op, e) => Expression::Unary(*op, Box::new(e.map_identifiers(f))),
            Expression::Binary(lhs, op, rhs) => Expression::Binary(
                Box::new(lhs.map_identifiers(f)),
                *op,
                Box::new(rhs.map_identifiers(f)),
            ),
            Expression::Ite(c, t, e) => Expression::Ite(
                Box::new(c.map_identifiers(f)),
                Box::new(t.map_identifiers(f)),
                Box::new(e.map_identifiers(f)),
            ),
            Expression::Function(func, args) => {
                Expression::Function(*func, args.iter().map(|a| a.map_identifiers(f)).collect())
            }
        }
    }

    /// Binding strength of the top level construct, used for printing
    fn precedence(&self) -> u8 {
        match self {
            Expression::Ite(_, _, _) => 0,
            Expression::Binary(_, op, _) => op.precedence(),
            Expression::Unary(UnaryOp::Not, _) => 5,
            Expression::Unary(UnaryOp::Neg, _) => 10,
            _ => 11,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Int(i) => write!(f, "{i}"),
            Expression::Double(d) => {
                if d.fract() == 0.0 && d.is_finite() {
                    write!(f, "{d:.1}")
                } else {
                    write!(f, "{d}")
                }
            }
            Expression::Bool(b) => write!(f, "{b}"),
            Expression::Identifier(id) => write!(f, "{id}"),
            Expression::Unary(op, e) => {
                write!(f, "{op}")?;
                e.fmt_child(f, self.precedence() + 1)
            }
            Expression::Binary(lhs, op, rhs) => {
                let p = op.precedence();
                lhs.fmt_child(f, p)?;
                write!(f, " {op} ")?;
                rhs.fmt_child(f, p + 1)
            }
            Expression::Ite(c, t, e) => {
                c.fmt_child(f, 1)?;
                write!(f, " ? ")?;
                t.fmt_child(f, 1)?;
                write!(f, " : ")?;
                e.fmt_child(f, 0)
            }
            Expression::Function(func, args) => {
                write!(
                    f,
                    "{func}({})",
                    pmc_display_utils::join_iterator(args.iter(), ", ")
                )
            }
        }
    }
}

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Self) -> Self::Output {
        Expression::binary(self, BinaryOp::Add, rhs)
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Self) -> Self::Output {
        Expression::binary(self, BinaryOp::Sub, rhs)
    }
}

impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Self) -> Self::Output {
        Expression::binary(self, BinaryOp::Mul, rhs)
    }
}

impl Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Self) -> Self::Output {
        Expression::binary(self, BinaryOp::Div, rhs)
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output {
        Expression::Unary(UnaryOp::Neg, Box::new(self))
    }
}

impl Not for Expression {
    type Output = Expression;

    fn not(self) -> Self::Output {
        Expression::Unary(UnaryOp::Not, Box::new(self))
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Int(value)
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Double(value)
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::Bool(value)
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        match value {
            Value::Int(i) => Expression::Int(i),
            Value::Double(d) => Expression::Double(d),
            Value::Bool(b) => Expression::Bool(b),
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
    fn test_display_respects_precedence() {
        // (a + b) * c
        let expr = (id("a") + id("b")) * id("c");
        assert_eq!(expr.to_string(), "(a + b) * c");

        // a + b * c
        let expr = id("a") + id("b") * id("c");
        assert_eq!(expr.to_string(), "a + b * c");

        // a - (b - c)
        let expr = id("a") - (id("b") - id("c"));
        assert_eq!(expr.to_string(), "a - (b - c)");

        // !(s = 1) & t
        let expr = Expression::binary(
            !Expression::binary(id("s"), BinaryOp::Eq, Expression::Int(1)),
            BinaryOp::And,
            id("t"),
        );
        assert_eq!(expr.to_string(), "!s = 1 & t");
    }

    #[test]
    fn test_display_literals_and_functions() {
        assert_eq!(Expression::Double(1.0).to_string(), "1.0");
        assert_eq!(Expression::Double(0.25).to_string(), "0.25");
        assert_eq!((-id("x")).to_string(), "-x");
        assert_eq!((-(id("a") + id("b"))).to_string(), "-(a + b)");

        let expr = Expression::Function(Function::Max, vec![id("x"), Expression::Int(0)]);
        assert_eq!(expr.to_string(), "max(x, 0)");

        let expr = Expression::Ite(
            Box::new(Expression::binary(id("i"), BinaryOp::Eq, id("N"))),
            Box::new(Expression::Int(1)),
            Box::new(Expression::Int(0)),
        );
        assert_eq!(expr.to_string(), "i = N ? 1 : 0");
    }

    #[test]
    fn test_identifiers() {
        let expr = Expression::Int(1) - id("pK") * id("pL") + id("pK");
        let ids = expr.identifiers();
        assert_eq!(
            ids.into_iter().cloned().collect::<Vec<_>>(),
            vec![Identifier::new("pK"), Identifier::new("pL")]
        );
        assert!(!expr.is_constant());
        assert!((Expression::Int(1) / Expression::Int(6)).is_constant());
    }

    #[test]
    fn test_rename() {
        let expr = Expression::binary(id("s1"), BinaryOp::Eq, id("s2"));
        let renaming = HashMap::from([
            (Identifier::new("s1"), Identifier::new("s2")),
            (Identifier::new("s2"), Identifier::new("s1")),
        ]);
        assert_eq!(
            expr.rename(&renaming),
            Expression::binary(id("s2"), BinaryOp::Eq, id("s1"))
        );
    }

    #[test]
    fn test_substitute() {
        let expr = id("N") - Expression::Int(1);
        let substitution = HashMap::from([(Identifier::new("N"), Expression::Int(16))]);
        assert_eq!(
            expr.substitute(&substitution),
            Expression::Int(16) - Expression::Int(1)
        );
    }

    #[test]
    fn test_function_lookup() {
        for func in [
            Function::Min,
            Function::Max,
            Function::Floor,
            Function::Ceil,
            Function::Pow,
            Function::Mod,
            Function::Log,
        ] {
            assert_eq!(Function::from_name(func.name()), Some(func));
        }
        assert_eq!(Function::from_name("sqrt"), None);
    }
}
