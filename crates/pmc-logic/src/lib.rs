//! Probabilistic temporal logic formulas
//!
//! This crate provides the types representing properties of probabilistic
//! models: PCTL state and path formulas extended with reward and long-run
//! average operators, as accepted by PRISM.
//!
//! A [`Property`] couples a parsed [`Formula`] with the exact text it was
//! parsed from. The [`fmt::Display`] of a [`Formula`] renders the canonical
//! form of the formula, while a [`Property`] always renders its source text.

use std::{
    collections::BTreeSet,
    fmt,
    ops::{BitAnd, BitOr, Not},
};

use pmc_model::expressions::{BinaryOp, Expression};

/// Comparison of a probability or reward against a threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `<`
    Lt,
    /// `<=`
    Leq,
    /// `>`
    Gt,
    /// `>=`
    Geq,
}

impl ComparisonOp {
    /// Check whether the value satisfies the comparison with the threshold
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::Lt => value < threshold,
            ComparisonOp::Leq => value <= threshold,
            ComparisonOp::Gt => value > threshold,
            ComparisonOp::Geq => value >= threshold,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOp::Lt => write!(f, "<"),
            ComparisonOp::Leq => write!(f, "<="),
            ComparisonOp::Gt => write!(f, ">"),
            ComparisonOp::Geq => write!(f, ">="),
        }
    }
}

/// Bound of an operator, either a query (`=?`) or a threshold comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Compute the value (`=?`)
    Query,
    /// Compare the value against a threshold
    Compare(ComparisonOp, f64),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Query => write!(f, "=?"),
            Bound::Compare(op, threshold) => write!(f, "{op}{threshold}"),
        }
    }
}

/// Optimization direction resolving nondeterminism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptimizationDirection {
    /// `min`
    Minimize,
    /// `max`
    Maximize,
}

impl fmt::Display for OptimizationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationDirection::Minimize => write!(f, "min"),
            OptimizationDirection::Maximize => write!(f, "max"),
        }
    }
}

/// Path formula of a probability operator
#[derive(Debug, Clone, PartialEq)]
pub enum PathFormula {
    /// Next `X φ`
    Next(Box<Formula>),
    /// Eventually `F φ`, optionally step bounded `F<=k φ`
    Eventually(Option<u64>, Box<Formula>),
    /// Globally `G φ`, optionally step bounded `G<=k φ`
    Globally(Option<u64>, Box<Formula>),
    /// Until `φ U ψ`, optionally step bounded `φ U<=k ψ`
    Until(Box<Formula>, Option<u64>, Box<Formula>),
}

impl PathFormula {
    fn subformulas(&self) -> Vec<&Formula> {
        match self {
            PathFormula::Next(f) | PathFormula::Eventually(_, f) | PathFormula::Globally(_, f) => {
                vec![f.as_ref()]
            }
            PathFormula::Until(lhs, _, rhs) => vec![lhs.as_ref(), rhs.as_ref()],
        }
    }
}

/// Display a step bound
struct StepBound(Option<u64>);

impl fmt::Display for StepBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(k) => write!(f, "<={k}"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for PathFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFormula::Next(phi) => write!(f, "X {phi}"),
            PathFormula::Eventually(k, phi) => write!(f, "F{} {phi}", StepBound(*k)),
            PathFormula::Globally(k, phi) => write!(f, "G{} {phi}", StepBound(*k)),
            PathFormula::Until(lhs, k, rhs) => write!(f, "{lhs} U{} {rhs}", StepBound(*k)),
        }
    }
}

/// Path formula of a reward operator
#[derive(Debug, Clone, PartialEq)]
pub enum RewardPathFormula {
    /// Reward accumulated until reaching `φ` (`F φ`)
    Reachability(Box<Formula>),
    /// Reward accumulated within `k` steps (`C<=k`)
    Cumulative(u64),
    /// Reward in the state reached after exactly `k` steps (`I=k`)
    Instantaneous(u64),
}

impl fmt::Display for RewardPathFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardPathFormula::Reachability(phi) => write!(f, "F {phi}"),
            RewardPathFormula::Cumulative(k) => write!(f, "C<={k}"),
            RewardPathFormula::Instantaneous(k) => write!(f, "I={k}"),
        }
    }
}

/// State formula
///
/// # Example
///
/// ```
/// use pmc_logic::*;
///
/// let formula = Formula::Probability {
///     direction: None,
///     bound: Bound::Query,
///     path: PathFormula::Eventually(None, Box::new(Formula::Label("one".into()))),
/// };
/// assert_eq!(formula.to_string(), "P=? [F \"one\"]");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// Always true
    True,
    /// Always false
    False,
    /// States carrying the label
    Label(String),
    /// Boolean expression over the variables of a program
    Atomic(Expression),
    /// Negation `!φ`
    Not(Box<Formula>),
    /// Conjunction `φ & ψ`
    And(Box<Formula>, Box<Formula>),
    /// Disjunction `φ | ψ`
    Or(Box<Formula>, Box<Formula>),
    /// Implication `φ => ψ`
    Implies(Box<Formula>, Box<Formula>),
    /// Probability operator `P`
    Probability {
        /// Direction for nondeterministic models
        direction: Option<OptimizationDirection>,
        /// Query or threshold
        bound: Bound,
        /// Path formula
        path: PathFormula,
    },
    /// Reward operator `R`
    Reward {
        /// Reward structure, `None` for the default one
        reward_model: Option<String>,
        /// Direction for nondeterministic models
        direction: Option<OptimizationDirection>,
        /// Query or threshold
        bound: Bound,
        /// Reward path formula
        path: RewardPathFormula,
    },
    /// Long-run average operator `S`
    LongRunAverage {
        /// Direction for nondeterministic models
        direction: Option<OptimizationDirection>,
        /// Query or threshold
        bound: Bound,
        /// States whose long-run probability is measured
        formula: Box<Formula>,
    },
}

impl Formula {
    /// Binding strength of the top level connective, higher binds tighter
    fn precedence(&self) -> u8 {
        match self {
            Formula::Implies(_, _) => 1,
            Formula::Or(_, _) => 2,
            Formula::And(_, _) => 3,
            Formula::Not(_) => 4,
            Formula::Atomic(Expression::Binary(_, op, _))
                if matches!(
                    op,
                    BinaryOp::And | BinaryOp::Or | BinaryOp::Implies | BinaryOp::Iff
                ) =>
            {
                0
            }
            _ => 5,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    /// Check whether the formula is an operator with a `=?` bound, i.e., the
    /// formula asks for a numeric value
    pub fn is_quantitative(&self) -> bool {
        matches!(
            self,
            Formula::Probability {
                bound: Bound::Query,
                ..
            } | Formula::Reward {
                bound: Bound::Query,
                ..
            } | Formula::LongRunAverage {
                bound: Bound::Query,
                ..
            }
        )
    }

    /// Check whether the formula contains a reward operator
    pub fn contains_reward_operator(&self) -> bool {
        matches!(self, Formula::Reward { .. })
            || self
                .subformulas()
                .into_iter()
                .any(Formula::contains_reward_operator)
    }

    /// Check whether the formula contains an operator with an optimization
    /// direction
    pub fn has_optimization_direction(&self) -> bool {
        let direct = match self {
            Formula::Probability { direction, .. }
            | Formula::Reward { direction, .. }
            | Formula::LongRunAverage { direction, .. } => direction.is_some(),
            _ => false,
        };
        direct
            || self
                .subformulas()
                .into_iter()
                .any(Formula::has_optimization_direction)
    }

    /// Labels referenced in the formula
    pub fn labels(&self) -> BTreeSet<&str> {
        let mut res = BTreeSet::new();
        if let Formula::Label(l) = self {
            res.insert(l.as_str());
        }
        for sub in self.subformulas() {
            res.extend(sub.labels());
        }
        res
    }

    /// Reward structures referenced by name in the formula
    pub fn reward_models(&self) -> BTreeSet<&str> {
        let mut res = BTreeSet::new();
        if let Formula::Reward {
            reward_model: Some(r),
            ..
        } = self
        {
            res.insert(r.as_str());
        }
        for sub in self.subformulas() {
            res.extend(sub.reward_models());
        }
        res
    }

    /// Direct subformulas
    fn subformulas(&self) -> Vec<&Formula> {
        match self {
            Formula::True | Formula::False | Formula::Label(_) | Formula::Atomic(_) => vec![],
            Formula::Not(f) => vec![f.as_ref()],
            Formula::And(lhs, rhs) | Formula::Or(lhs, rhs) | Formula::Implies(lhs, rhs) => {
                vec![lhs.as_ref(), rhs.as_ref()]
            }
            Formula::Probability { path, .. } => path.subformulas(),
            Formula::Reward { path, .. } => match path {
                RewardPathFormula::Reachability(f) => vec![f.as_ref()],
                RewardPathFormula::Cumulative(_) | RewardPathFormula::Instantaneous(_) => vec![],
            },
            Formula::LongRunAverage { formula, .. } => vec![formula.as_ref()],
        }
    }
}

/// Display the operator prefix, e.g. `Pmax` followed by the bound
struct OperatorHead<'a>(&'a str, &'a Option<OptimizationDirection>, &'a Bound);

impl fmt::Display for OperatorHead<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        if let Some(d) = self.1 {
            write!(f, "{d}")?;
        }
        write!(f, "{}", self.2)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::True => write!(f, "true"),
            Formula::False => write!(f, "false"),
            Formula::Label(l) => write!(f, "\"{l}\""),
            Formula::Atomic(e) => write!(f, "{e}"),
            Formula::Not(phi) => {
                write!(f, "!")?;
                phi.fmt_child(f, 5)
            }
            Formula::And(lhs, rhs) => {
                lhs.fmt_child(f, 3)?;
                write!(f, " & ")?;
                rhs.fmt_child(f, 4)
            }
            Formula::Or(lhs, rhs) => {
                lhs.fmt_child(f, 2)?;
                write!(f, " | ")?;
                rhs.fmt_child(f, 3)
            }
            Formula::Implies(lhs, rhs) => {
                lhs.fmt_child(f, 2)?;
                write!(f, " => ")?;
                rhs.fmt_child(f, 1)
            }
            Formula::Probability {
                direction,
                bound,
                path,
            } => write!(f, "{} [{path}]", OperatorHead("P", direction, bound)),
            Formula::Reward {
                reward_model,
                direction,
                bound,
                path,
            } => {
                let head = match reward_model {
                    Some(r) => format!("R{{\"{r}\"}}"),
                    None => "R".to_string(),
                };
                write!(f, "{} [{path}]", OperatorHead(&head, direction, bound))
            }
            Formula::LongRunAverage {
                direction,
                bound,
                formula,
            } => write!(f, "{} [{formula}]", OperatorHead("S", direction, bound)),
        }
    }
}

impl Not for Formula {
    type Output = Self;

    fn not(self) -> Self::Output {
        Formula::Not(Box::new(self))
    }
}

impl BitAnd for Formula {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Formula::And(Box::new(self), Box::new(rhs))
    }
}

impl BitOr for Formula {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Formula::Or(Box::new(self), Box::new(rhs))
    }
}

/// Formula together with the text it was parsed from
///
/// The [`fmt::Display`] of a property is exactly the text of the property in
/// its input, including an optional name prefix `"name":`.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: Option<String>,
    source: String,
    formula: Formula,
}

impl Property {
    /// Create a new property
    pub fn new(name: Option<String>, source: impl ToString, formula: Formula) -> Self {
        Self {
            name,
            source: source.to_string(),
            formula,
        }
    }

    /// Name of the property, if one was given
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Text the property was parsed from
    pub fn source_text(&self) -> &str {
        &self.source
    }

    /// Parsed formula of the property
    pub fn raw_formula(&self) -> &Formula {
        &self.formula
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(l: &str) -> Formula {
        Formula::Label(l.to_string())
    }

    #[test]
    fn test_display_operators() {
        let p = Formula::Probability {
            direction: Some(OptimizationDirection::Maximize),
            bound: Bound::Compare(ComparisonOp::Geq, 0.5),
            path: PathFormula::Until(Box::new(!label("fail")), Some(10), Box::new(label("done"))),
        };
        assert_eq!(p.to_string(), "Pmax>=0.5 [!\"fail\" U<=10 \"done\"]");

        let r = Formula::Reward {
            reward_model: Some("coin_flips".into()),
            direction: Some(OptimizationDirection::Minimize),
            bound: Bound::Query,
            path: RewardPathFormula::Reachability(Box::new(label("done"))),
        };
        assert_eq!(r.to_string(), "R{\"coin_flips\"}min=? [F \"done\"]");

        let c = Formula::Reward {
            reward_model: None,
            direction: None,
            bound: Bound::Compare(ComparisonOp::Lt, 3.0),
            path: RewardPathFormula::Cumulative(5),
        };
        assert_eq!(c.to_string(), "R<3 [C<=5]");

        let s = Formula::LongRunAverage {
            direction: None,
            bound: Bound::Query,
            formula: Box::new(label("up")),
        };
        assert_eq!(s.to_string(), "S=? [\"up\"]");
    }

    #[test]
    fn test_display_connectives() {
        let f = (label("a") | label("b")) & !label("c");
        assert_eq!(f.to_string(), "(\"a\" | \"b\") & !\"c\"");

        let f = Formula::Implies(Box::new(label("a") & label("b")), Box::new(Formula::True));
        assert_eq!(f.to_string(), "\"a\" & \"b\" => true");

        let f = !(label("a") & label("b"));
        assert_eq!(f.to_string(), "!(\"a\" & \"b\")");

        let atomic = Formula::Atomic(Expression::binary(
            Expression::identifier("s"),
            BinaryOp::Eq,
            Expression::Int(7),
        ));
        assert_eq!(atomic.to_string(), "s = 7");

        let disjunction = Formula::Atomic(Expression::binary(
            Expression::identifier("a"),
            BinaryOp::Or,
            Expression::identifier("b"),
        ));
        assert_eq!((disjunction & label("c")).to_string(), "(a | b) & \"c\"");
    }

    #[test]
    fn test_queries() {
        let f = Formula::Probability {
            direction: None,
            bound: Bound::Query,
            path: PathFormula::Eventually(
                None,
                Box::new(
                    label("done")
                        & Formula::Reward {
                            reward_model: Some("r".into()),
                            direction: None,
                            bound: Bound::Compare(ComparisonOp::Leq, 2.0),
                            path: RewardPathFormula::Instantaneous(3),
                        },
                ),
            ),
        };
        assert!(f.is_quantitative());
        assert!(f.contains_reward_operator());
        assert!(!f.has_optimization_direction());
        assert_eq!(f.labels(), BTreeSet::from(["done"]));
        assert_eq!(f.reward_models(), BTreeSet::from(["r"]));
        assert!(ComparisonOp::Leq.holds(2.0, 2.0));
        assert!(!ComparisonOp::Lt.holds(2.0, 2.0));
    }

    #[test]
    fn test_property_keeps_source() {
        let formula = Formula::Probability {
            direction: None,
            bound: Bound::Query,
            path: PathFormula::Eventually(None, Box::new(label("one"))),
        };
        let property = Property::new(None, "P=?[ F \"one\" ]", formula.clone());
        assert_eq!(property.to_string(), "P=?[ F \"one\" ]");
        assert_eq!(property.raw_formula(), &formula);
        assert_eq!(property.name(), None);
    }
}
