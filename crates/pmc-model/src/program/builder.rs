//! Factory methods for building a valid [`Program`]
//!
//! The [`ProgramBuilder`] ensures that names are unique and that every
//! identifier used in an expression refers to a constant, a variable or a
//! formula of the program.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt::{self, Display},
};

use log::debug;

use super::{
    Constant, ConstantType, Label, Module, NamedFormula, Program, ProgramModelType,
    RewardStructure, Variable,
};
use crate::expressions::{Expression, Identifier, IsDeclared, Value};

/// Builder for constructing a [`Program`]
///
/// Components are added one by one, name clashes are detected immediately.
/// References between components are only resolved in
/// [`ProgramBuilder::build`], as modules may use variables of modules that
/// are declared later.
///
/// # Example
///
/// ```
/// use pmc_model::expressions::*;
/// use pmc_model::program::*;
///
/// let builder = ProgramBuilder::new(ProgramModelType::Mdp)
///     .with_constant(Constant::new("N", ConstantType::Int, Some(Expression::Int(3))))
///     .unwrap();
///
/// assert!(builder.is_declared(&Identifier::new("N")));
/// assert!(builder.with_constant(Constant::new("N", ConstantType::Int, None)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    /// Create a builder for an empty program of the given type
    pub fn new(model_type: ProgramModelType) -> Self {
        Self {
            program: Program {
                model_type,
                constants: Vec::new(),
                global_variables: Vec::new(),
                formulas: Vec::new(),
                modules: Vec::new(),
                labels: Vec::new(),
                reward_structures: Vec::new(),
                initial_states: None,
            },
        }
    }

    /// Checks whether a name is already taken
    fn check_for_name_clash(&self, name: &Identifier) -> Result<(), ProgramError> {
        if self.program.is_declared(name) {
            return Err(ProgramError::NameClash(name.clone()));
        }
        Ok(())
    }

    /// Adds a constant to the program
    pub fn with_constant(mut self, constant: Constant) -> Result<Self, ProgramError> {
        self.check_for_name_clash(constant.name())?;
        self.program.constants.push(constant);
        Ok(self)
    }

    /// Adds a global variable to the program
    pub fn with_global_variable(mut self, variable: Variable) -> Result<Self, ProgramError> {
        self.check_for_name_clash(variable.name())?;
        self.program.global_variables.push(variable);
        Ok(self)
    }

    /// Adds a formula definition to the program
    pub fn with_formula(mut self, formula: NamedFormula) -> Result<Self, ProgramError> {
        self.check_for_name_clash(formula.name())?;
        self.program.formulas.push(formula);
        Ok(self)
    }

    /// Adds a module to the program
    ///
    /// Returns an error if a module with the same name exists or if one of
    /// its variables clashes with another name of the program.
    pub fn with_module(mut self, module: Module) -> Result<Self, ProgramError> {
        if self.program.module(module.name().name()).is_some() {
            return Err(ProgramError::DuplicateModule(module.name().clone()));
        }

        let mut local = HashSet::new();
        for v in module.variables() {
            self.check_for_name_clash(v.name())?;
            if !local.insert(v.name()) {
                return Err(ProgramError::NameClash(v.name().clone()));
            }
        }

        self.program.modules.push(module);
        Ok(self)
    }

    /// Adds a copy of an already added module with renamed identifiers
    ///
    /// Every renamed identifier has to occur in the base module, and every
    /// identifier may only be renamed once.
    pub fn with_renamed_module(
        self,
        name: impl ToString,
        base: &Identifier,
        renaming: impl IntoIterator<Item = (Identifier, Identifier)>,
    ) -> Result<Self, ProgramError> {
        let name = Identifier::new(name);
        let base_module = self
            .program
            .module(base.name())
            .ok_or_else(|| ProgramError::UnknownModule(base.clone()))?;

        let occurring = identifiers_of_module(base_module);
        let mut map = HashMap::new();
        for (from, to) in renaming {
            if !occurring.contains(&from) {
                return Err(ProgramError::MalformedRenaming {
                    module: name,
                    msg: format!("{from} does not occur in module {base}"),
                });
            }
            if map.insert(from.clone(), to).is_some() {
                return Err(ProgramError::MalformedRenaming {
                    module: name,
                    msg: format!("{from} is renamed multiple times"),
                });
            }
        }

        debug!("Renaming module {base} to {name}");
        let module = base_module.renamed(name, &map);
        self.with_module(module)
    }

    /// Adds a label to the program
    pub fn with_label(mut self, label: Label) -> Result<Self, ProgramError> {
        if self.program.labels.iter().any(|l| l.name() == label.name()) {
            return Err(ProgramError::DuplicateLabel(label.name().to_string()));
        }
        self.program.labels.push(label);
        Ok(self)
    }

    /// Adds a reward structure to the program
    pub fn with_reward_structure(
        mut self,
        rewards: RewardStructure,
    ) -> Result<Self, ProgramError> {
        if self
            .program
            .reward_structures
            .iter()
            .any(|r| r.name() == rewards.name())
        {
            return Err(ProgramError::DuplicateRewardStructure(
                rewards.name().unwrap_or_default().to_string(),
            ));
        }
        self.program.reward_structures.push(rewards);
        Ok(self)
    }

    /// Sets the expression describing the initial states
    pub fn with_initial_states(mut self, init: Expression) -> Self {
        self.program.initial_states = Some(init);
        self
    }

    /// Check that all identifiers of the expression are declared
    fn validate_expression(&self, expr: &Expression, context: &str) -> Result<(), ProgramError> {
        if let Some(unknown) = expr
            .identifiers()
            .into_iter()
            .find(|id| !self.program.is_declared(id))
        {
            return Err(ProgramError::UnknownIdentifier {
                identifier: unknown.clone(),
                context: context.to_string(),
            });
        }
        Ok(())
    }

    /// Check all references of a module
    fn validate_module(&self, module: &Module) -> Result<(), ProgramError> {
        let context = format!("module {}", module.name());

        for v in module.variables() {
            for e in v.expressions() {
                self.validate_expression(e, &context)?;
            }
        }

        for c in module.commands() {
            self.validate_expression(c.guard(), &context)?;
            for u in c.updates() {
                if let Some(p) = &u.probability {
                    self.validate_expression(p, &context)?;
                }
                for a in u.assignments() {
                    let assignable = module.is_declared(a.variable())
                        || self
                            .program
                            .global_variables
                            .iter()
                            .any(|v| v.name() == a.variable());
                    if !assignable {
                        return Err(ProgramError::UnknownIdentifier {
                            identifier: a.variable().clone(),
                            context: format!("assignment in {context}"),
                        });
                    }
                    self.validate_expression(a.value(), &context)?;
                }
            }
        }

        Ok(())
    }

    /// Complete the construction of the program
    ///
    /// Returns an error if an expression uses an undeclared identifier or an
    /// update assigns a variable that is neither global nor local to the
    /// module.
    pub fn build(self) -> Result<Program, ProgramError> {
        for c in self.program.constants.iter() {
            if let Some(v) = c.value() {
                self.validate_expression(v, &format!("constant {}", c.name()))?;
            }
        }
        for v in self.program.global_variables.iter() {
            for e in v.expressions() {
                self.validate_expression(e, &format!("global variable {}", v.name()))?;
            }
        }
        for f in self.program.formulas.iter() {
            self.validate_expression(f.expression(), &format!("formula {}", f.name()))?;
        }
        for m in self.program.modules.iter() {
            self.validate_module(m)?;
        }
        for l in self.program.labels.iter() {
            self.validate_expression(l.expression(), &format!("label \"{}\"", l.name()))?;
        }
        for r in self.program.reward_structures.iter() {
            let context = format!("rewards {}", r.name().unwrap_or_default());
            for item in r.items() {
                for e in item.expressions() {
                    self.validate_expression(e, &context)?;
                }
            }
        }
        if let Some(init) = &self.program.initial_states {
            self.validate_expression(init, "init")?;
        }

        Ok(self.program)
    }
}

impl IsDeclared<Identifier> for ProgramBuilder {
    fn is_declared(&self, obj: &Identifier) -> bool {
        self.program.is_declared(obj)
    }
}

/// Names occurring anywhere in a module
fn identifiers_of_module(module: &Module) -> BTreeSet<Identifier> {
    let mut res = BTreeSet::new();
    for v in module.variables() {
        res.insert(v.name().clone());
        for e in v.expressions() {
            res.extend(e.identifiers().into_iter().cloned());
        }
    }
    for c in module.commands() {
        res.extend(c.action().cloned());
        res.extend(c.guard().identifiers().into_iter().cloned());
        for u in c.updates() {
            res.extend(u.probability().identifiers().into_iter().cloned());
            for a in u.assignments() {
                res.insert(a.variable().clone());
                res.extend(a.value().identifiers().into_iter().cloned());
            }
        }
    }
    res
}

/// Custom error type to indicate an error when building or modifying a
/// [`Program`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramError {
    /// The same name was used for different components
    NameClash(Identifier),
    /// An expression uses an identifier that is not declared
    UnknownIdentifier {
        /// Undeclared identifier
        identifier: Identifier,
        /// Component the identifier was used in
        context: String,
    },
    /// A module refers to a module that does not exist
    UnknownModule(Identifier),
    /// Two modules have the same name
    DuplicateModule(Identifier),
    /// Two labels have the same name
    DuplicateLabel(String),
    /// Two reward structures have the same name
    DuplicateRewardStructure(String),
    /// The renaming of a module is malformed
    MalformedRenaming {
        /// Module defined by the renaming
        module: Identifier,
        /// Description of the problem
        msg: String,
    },
    /// A constant was defined that does not exist
    UnknownConstant(Identifier),
    /// A constant was defined that already has a value
    ConstantAlreadyDefined(Identifier),
    /// The value given for a constant has the wrong type
    ConstantTypeMismatch {
        /// Constant
        constant: Identifier,
        /// Declared type of the constant
        expected: ConstantType,
        /// Value that was given
        value: Value,
    },
}

impl std::error::Error for ProgramError {}

impl Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::NameClash(name) => write!(f, "Name {name} already taken"),
            ProgramError::UnknownIdentifier {
                identifier,
                context,
            } => write!(f, "Unknown identifier {identifier} in {context}"),
            ProgramError::UnknownModule(m) => write!(f, "Unknown module: {m}"),
            ProgramError::DuplicateModule(m) => write!(f, "Duplicate module: {m}"),
            ProgramError::DuplicateLabel(l) => write!(f, "Duplicate label: \"{l}\""),
            ProgramError::DuplicateRewardStructure(r) => {
                write!(f, "Duplicate reward structure: \"{r}\"")
            }
            ProgramError::MalformedRenaming { module, msg } => {
                write!(f, "Malformed renaming of module {module}: {msg}")
            }
            ProgramError::UnknownConstant(c) => write!(f, "Unknown constant: {c}"),
            ProgramError::ConstantAlreadyDefined(c) => {
                write!(f, "Constant {c} already has a value")
            }
            ProgramError::ConstantTypeMismatch {
                constant,
                expected,
                value,
            } => write!(
                f,
                "Constant {constant} of type {expected} cannot take value {value}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        expressions::BinaryOp,
        program::{Assignment, Command, Update, VariableType},
    };

    use super::*;

    fn flip_module(name: &str, var: &str, action: Option<&str>) -> Module {
        Module::new(
            name,
            vec![Variable::new(var, VariableType::Bool, None)],
            vec![Command::new(
                action.map(Identifier::new),
                !Expression::identifier(var),
                vec![Update::new(
                    None,
                    vec![Assignment::new(var, Expression::Bool(true))],
                )],
            )],
        )
    }

    #[test]
    fn test_name_clash() {
        let err = ProgramBuilder::new(ProgramModelType::Dtmc)
            .with_constant(Constant::new("x", ConstantType::Int, None))
            .unwrap()
            .with_module(flip_module("m", "x", None))
            .unwrap_err();
        assert_eq!(err, ProgramError::NameClash(Identifier::new("x")));
    }

    #[test]
    fn test_duplicate_module() {
        let err = ProgramBuilder::new(ProgramModelType::Dtmc)
            .with_module(flip_module("m", "x", None))
            .unwrap()
            .with_module(flip_module("m", "y", None))
            .unwrap_err();
        assert_eq!(err, ProgramError::DuplicateModule(Identifier::new("m")));
    }

    #[test]
    fn test_unknown_identifier() {
        let module = Module::new(
            "m",
            vec![Variable::new("x", VariableType::Bool, None)],
            vec![Command::new(
                None,
                Expression::identifier("y"),
                vec![Update::new(None, vec![])],
            )],
        );
        let err = ProgramBuilder::new(ProgramModelType::Dtmc)
            .with_module(module)
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ProgramError::UnknownIdentifier { identifier, .. } if identifier == Identifier::new("y")
        ));
    }

    #[test]
    fn test_forward_reference_between_modules() {
        let reader = Module::new(
            "reader",
            vec![Variable::new("r", VariableType::Bool, None)],
            vec![Command::new(
                None,
                Expression::identifier("w"),
                vec![Update::new(
                    None,
                    vec![Assignment::new("r", Expression::Bool(true))],
                )],
            )],
        );
        let program = ProgramBuilder::new(ProgramModelType::Dtmc)
            .with_module(reader)
            .unwrap()
            .with_module(flip_module("writer", "w", None))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(program.nr_modules(), 2);
    }

    #[test]
    fn test_assignment_to_foreign_variable() {
        let module = Module::new(
            "m",
            vec![Variable::new("x", VariableType::Bool, None)],
            vec![Command::new(
                None,
                Expression::Bool(true),
                vec![Update::new(
                    None,
                    vec![Assignment::new("y", Expression::Bool(true))],
                )],
            )],
        );
        let err = ProgramBuilder::new(ProgramModelType::Dtmc)
            .with_module(module)
            .unwrap()
            .with_module(flip_module("other", "y", None))
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(err, ProgramError::UnknownIdentifier { .. }));
    }

    #[test]
    fn test_renamed_module() {
        let program = ProgramBuilder::new(ProgramModelType::Mdp)
            .with_module(flip_module("m1", "x1", Some("a")))
            .unwrap()
            .with_renamed_module(
                "m2",
                &Identifier::new("m1"),
                vec![
                    (Identifier::new("x1"), Identifier::new("x2")),
                    (Identifier::new("a"), Identifier::new("b")),
                ],
            )
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(program.nr_modules(), 2);
        let m2 = program.module("m2").unwrap();
        assert!(m2.is_declared(&Identifier::new("x2")));
        assert_eq!(
            program.actions(),
            BTreeSet::from([&Identifier::new("a"), &Identifier::new("b")])
        );
    }

    #[test]
    fn test_malformed_renaming() {
        let builder = ProgramBuilder::new(ProgramModelType::Mdp)
            .with_module(flip_module("m1", "x1", None))
            .unwrap();

        let err = builder
            .clone()
            .with_renamed_module(
                "m2",
                &Identifier::new("m0"),
                vec![(Identifier::new("x1"), Identifier::new("x2"))],
            )
            .unwrap_err();
        assert_eq!(err, ProgramError::UnknownModule(Identifier::new("m0")));

        let err = builder
            .clone()
            .with_renamed_module(
                "m2",
                &Identifier::new("m1"),
                vec![(Identifier::new("z"), Identifier::new("x2"))],
            )
            .unwrap_err();
        assert!(matches!(err, ProgramError::MalformedRenaming { .. }));

        // local variable not renamed
        let err = builder
            .with_renamed_module("m2", &Identifier::new("m1"), vec![])
            .unwrap_err();
        assert_eq!(err, ProgramError::NameClash(Identifier::new("x1")));
    }

    #[test]
    fn test_duplicate_label() {
        let label = || {
            Label::new(
                "done",
                Expression::binary(
                    Expression::identifier("x"),
                    BinaryOp::Eq,
                    Expression::Bool(true),
                ),
            )
        };
        let err = ProgramBuilder::new(ProgramModelType::Dtmc)
            .with_label(label())
            .unwrap()
            .with_label(label())
            .unwrap_err();
        assert_eq!(err, ProgramError::DuplicateLabel("done".into()));
    }
}
