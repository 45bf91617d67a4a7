//! Transition probabilities of sparse models
//!
//! A probability is either a concrete number or, for parametric models, an
//! expression over undefined constants (the parameters of the model).

use std::{collections::BTreeSet, fmt};

use crate::expressions::{EvaluationError, Expression, Identifier, Valuation};

/// Value of a single transition
///
/// # Example
///
/// ```
/// use pmc_model::probability::Probability;
/// use pmc_model::expressions::Expression;
///
/// let p = Probability::Constant(0.5);
/// assert!(p.is_constant());
///
/// let q = Probability::Symbolic(Expression::Int(1) - Expression::identifier("pK"));
/// assert!(!q.is_constant());
/// assert_eq!(q.to_string(), "1 - pK");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Probability {
    /// Concrete probability
    Constant(f64),
    /// Probability given as an expression over parameters
    Symbolic(Expression),
}

impl Probability {
    /// Check whether the probability is a concrete number
    pub fn is_constant(&self) -> bool {
        matches!(self, Probability::Constant(_))
    }

    /// Concrete value, `None` for symbolic probabilities
    pub fn constant_value(&self) -> Option<f64> {
        match self {
            Probability::Constant(c) => Some(*c),
            Probability::Symbolic(_) => None,
        }
    }

    /// Check whether a concrete probability lies in the interval (0, 1]
    ///
    /// Symbolic probabilities are always considered in range, their value is
    /// only known once the parameters are instantiated.
    pub fn is_in_range(&self) -> bool {
        match self {
            Probability::Constant(c) => *c > 0.0 && *c <= 1.0,
            Probability::Symbolic(_) => true,
        }
    }

    /// Parameters the probability depends on
    pub fn parameters(&self) -> BTreeSet<Identifier> {
        match self {
            Probability::Constant(_) => BTreeSet::new(),
            Probability::Symbolic(e) => e.identifiers().into_iter().cloned().collect(),
        }
    }

    /// Numeric value of the probability under a valuation of the parameters
    pub fn evaluate(&self, valuation: &Valuation) -> Result<f64, EvaluationError> {
        match self {
            Probability::Constant(c) => Ok(*c),
            Probability::Symbolic(e) => {
                let v = e.evaluate(valuation)?;
                v.as_f64().ok_or_else(|| {
                    EvaluationError::TypeMismatch(format!(
                        "probability '{e}' evaluates to non-numeric value {v}"
                    ))
                })
            }
        }
    }
}

impl From<f64> for Probability {
    fn from(value: f64) -> Self {
        Probability::Constant(value)
    }
}

impl fmt::Display for Probability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probability::Constant(c) => write!(f, "{c}"),
            Probability::Symbolic(e) => write!(f, "{e}"),
        }
    }
}
