//! Representation of PRISM programs
//!
//! A [`Program`] is the structured description of a model in the PRISM
//! language: constants, global variables, formulas, modules with guarded
//! commands, labels, reward structures and an optional initial state
//! expression. Programs are constructed through the
//! [`builder::ProgramBuilder`], which ensures that every identifier used in
//! an expression is declared.

use std::{
    collections::{BTreeSet, HashMap},
    fmt::{self, Display},
};

use pmc_display_utils::{indent_all, join_iterator};

use crate::{
    expressions::{Expression, Identifier, IsDeclared, Value},
    models::ModelType,
};

pub mod builder;

pub use builder::{ProgramBuilder, ProgramError};

/// Model type declared by a PRISM program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramModelType {
    /// Discrete-time Markov chain (`dtmc` / `probabilistic`)
    Dtmc,
    /// Markov decision process (`mdp` / `nondeterministic`)
    Mdp,
    /// Continuous-time Markov chain (`ctmc` / `stochastic`)
    Ctmc,
}

impl ProgramModelType {
    /// Sparse model type the program translates to, `None` for model types
    /// without a sparse representation
    pub fn sparse_model_type(&self) -> Option<ModelType> {
        match self {
            ProgramModelType::Dtmc => Some(ModelType::Dtmc),
            ProgramModelType::Mdp => Some(ModelType::Mdp),
            ProgramModelType::Ctmc => None,
        }
    }
}

impl Display for ProgramModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramModelType::Dtmc => write!(f, "dtmc"),
            ProgramModelType::Mdp => write!(f, "mdp"),
            ProgramModelType::Ctmc => write!(f, "ctmc"),
        }
    }
}

/// Type of a constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantType {
    /// Integer constant
    Int,
    /// Floating point constant
    Double,
    /// Boolean constant
    Bool,
}

impl Display for ConstantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantType::Int => write!(f, "int"),
            ConstantType::Double => write!(f, "double"),
            ConstantType::Bool => write!(f, "bool"),
        }
    }
}

/// Constant of a program, undefined if it has no value
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    name: Identifier,
    ty: ConstantType,
    value: Option<Expression>,
}

impl Constant {
    /// Create a new constant
    pub fn new(name: impl ToString, ty: ConstantType, value: Option<Expression>) -> Self {
        Self {
            name: Identifier::new(name),
            ty,
            value,
        }
    }

    /// Name of the constant
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Type of the constant
    pub fn constant_type(&self) -> ConstantType {
        self.ty
    }

    /// Value of the constant, if defined
    pub fn value(&self) -> Option<&Expression> {
        self.value.as_ref()
    }

    /// Check whether the constant is defined
    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "const {} {}", self.ty, self.name)?;
        if let Some(v) = &self.value {
            write!(f, " = {v}")?;
        }
        write!(f, ";")
    }
}

/// Type of a program variable
#[derive(Debug, Clone, PartialEq)]
pub enum VariableType {
    /// Integer variable ranging from lower to upper bound (inclusive)
    Bounded {
        /// Lower bound
        lower: Expression,
        /// Upper bound
        upper: Expression,
    },
    /// Boolean variable
    Bool,
}

/// Variable of a module or global variable
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: Identifier,
    ty: VariableType,
    init: Option<Expression>,
}

impl Variable {
    /// Create a new variable
    pub fn new(name: impl ToString, ty: VariableType, init: Option<Expression>) -> Self {
        Self {
            name: Identifier::new(name),
            ty,
            init,
        }
    }

    /// Name of the variable
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Type of the variable
    pub fn variable_type(&self) -> &VariableType {
        &self.ty
    }

    /// Initial value, if given
    pub fn init(&self) -> Option<&Expression> {
        self.init.as_ref()
    }

    /// Expressions occurring in the declaration
    fn expressions(&self) -> impl Iterator<Item = &Expression> {
        let bounds = match &self.ty {
            VariableType::Bounded { lower, upper } => vec![lower, upper],
            VariableType::Bool => vec![],
        };
        bounds.into_iter().chain(self.init.iter())
    }

    fn renamed(&self, renaming: &HashMap<Identifier, Identifier>) -> Self {
        let ty = match &self.ty {
            VariableType::Bounded { lower, upper } => VariableType::Bounded {
                lower: lower.rename(renaming),
                upper: upper.rename(renaming),
            },
            VariableType::Bool => VariableType::Bool,
        };
        Self {
            name: renaming.get(&self.name).unwrap_or(&self.name).clone(),
            ty,
            init: self.init.as_ref().map(|e| e.rename(renaming)),
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            VariableType::Bounded { lower, upper } => {
                write!(f, "{} : [{lower}..{upper}]", self.name)?
            }
            VariableType::Bool => write!(f, "{} : bool", self.name)?,
        }
        if let Some(init) = &self.init {
            write!(f, " init {init}")?;
        }
        write!(f, ";")
    }
}

/// Assignment `(x'=e)` of an update
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    variable: Identifier,
    value: Expression,
}

impl Assignment {
    /// Create a new assignment
    pub fn new(variable: impl ToString, value: Expression) -> Self {
        Self {
            variable: Identifier::new(variable),
            value,
        }
    }

    /// Variable that is assigned
    pub fn variable(&self) -> &Identifier {
        &self.variable
    }

    /// New value of the variable
    pub fn value(&self) -> &Expression {
        &self.value
    }
}

impl Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}'={})", self.variable, self.value)
    }
}

/// One probabilistic branch of a command
///
/// An update without an explicit probability is taken with probability 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    probability: Option<Expression>,
    assignments: Vec<Assignment>,
}

impl Update {
    /// Create a new update
    pub fn new(probability: Option<Expression>, assignments: Vec<Assignment>) -> Self {
        Self {
            probability,
            assignments,
        }
    }

    /// Probability of the update, 1 if none was given
    pub fn probability(&self) -> Expression {
        self.probability.clone().unwrap_or(Expression::Int(1))
    }

    /// Assignments of the update, empty for `true`
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }
}

impl Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.probability {
            write!(f, "{p} : ")?;
        }
        if self.assignments.is_empty() {
            write!(f, "true")
        } else {
            write!(f, "{}", join_iterator(self.assignments.iter(), " & "))
        }
    }
}

/// Guarded command of a module
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    action: Option<Identifier>,
    guard: Expression,
    updates: Vec<Update>,
}

impl Command {
    /// Create a new command, `action` is `None` for unlabeled commands
    pub fn new(action: Option<Identifier>, guard: Expression, updates: Vec<Update>) -> Self {
        Self {
            action,
            guard,
            updates,
        }
    }

    /// Action label of the command
    pub fn action(&self) -> Option<&Identifier> {
        self.action.as_ref()
    }

    /// Guard of the command
    pub fn guard(&self) -> &Expression {
        &self.guard
    }

    /// Probabilistic branches of the command
    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    fn renamed(&self, renaming: &HashMap<Identifier, Identifier>) -> Self {
        Self {
            action: self
                .action
                .as_ref()
                .map(|a| renaming.get(a).unwrap_or(a).clone()),
            guard: self.guard.rename(renaming),
            updates: self
                .updates
                .iter()
                .map(|u| Update {
                    probability: u.probability.as_ref().map(|p| p.rename(renaming)),
                    assignments: u
                        .assignments
                        .iter()
                        .map(|a| Assignment {
                            variable: renaming.get(&a.variable).unwrap_or(&a.variable).clone(),
                            value: a.value.rename(renaming),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = self.action.as_ref().map(|a| a.name()).unwrap_or("");
        write!(
            f,
            "[{action}] {} -> {};",
            self.guard,
            join_iterator(self.updates.iter(), " + ")
        )
    }
}

/// Module of a program
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    name: Identifier,
    variables: Vec<Variable>,
    commands: Vec<Command>,
}

impl Module {
    /// Create a new module
    pub fn new(name: impl ToString, variables: Vec<Variable>, commands: Vec<Command>) -> Self {
        Self {
            name: Identifier::new(name),
            variables,
            commands,
        }
    }

    /// Name of the module
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Local variables of the module
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Commands of the module
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Actions the module synchronizes on
    pub fn actions(&self) -> BTreeSet<&Identifier> {
        self.commands.iter().filter_map(|c| c.action()).collect()
    }

    /// Create a copy of the module under a new name with identifiers
    /// replaced according to the renaming
    pub fn renamed(&self, name: impl ToString, renaming: &HashMap<Identifier, Identifier>) -> Self {
        Self {
            name: Identifier::new(name),
            variables: self.variables.iter().map(|v| v.renamed(renaming)).collect(),
            commands: self.commands.iter().map(|c| c.renamed(renaming)).collect(),
        }
    }
}

impl IsDeclared<Identifier> for Module {
    fn is_declared(&self, obj: &Identifier) -> bool {
        self.variables.iter().any(|v| v.name() == obj)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut body = String::new();
        for v in self.variables.iter() {
            body += &format!("{v}\n");
        }
        if !self.variables.is_empty() && !self.commands.is_empty() {
            body += "\n";
        }
        for c in self.commands.iter() {
            body += &format!("{c}\n");
        }
        write!(f, "module {}\n{}endmodule", self.name, indent_all(body))
    }
}

/// Named expression (`formula name = e;`)
#[derive(Debug, Clone, PartialEq)]
pub struct NamedFormula {
    name: Identifier,
    expression: Expression,
}

impl NamedFormula {
    /// Create a new formula definition
    pub fn new(name: impl ToString, expression: Expression) -> Self {
        Self {
            name: Identifier::new(name),
            expression,
        }
    }

    /// Name of the formula
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Expression the name stands for
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl Display for NamedFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "formula {} = {};", self.name, self.expression)
    }
}

/// Label of a program (`label "name" = e;`)
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    name: String,
    expression: Expression,
}

impl Label {
    /// Create a new label
    pub fn new(name: impl ToString, expression: Expression) -> Self {
        Self {
            name: name.to_string(),
            expression,
        }
    }

    /// Name of the label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// States satisfying the expression carry the label
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label \"{}\" = {};", self.name, self.expression)
    }
}

/// Item of a reward structure
#[derive(Debug, Clone, PartialEq)]
pub enum RewardItem {
    /// `guard : value;`
    State {
        /// States receiving the reward
        guard: Expression,
        /// Reward
        value: Expression,
    },
    /// `[action] guard : value;`
    Transition {
        /// Action the reward is attached to, `None` for `[]`
        action: Option<Identifier>,
        /// States in which the reward is collected
        guard: Expression,
        /// Reward
        value: Expression,
    },
}

impl RewardItem {
    fn expressions(&self) -> [&Expression; 2] {
        match self {
            RewardItem::State { guard, value } => [guard, value],
            RewardItem::Transition { guard, value, .. } => [guard, value],
        }
    }
}

impl Display for RewardItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewardItem::State { guard, value } => write!(f, "{guard} : {value};"),
            RewardItem::Transition {
                action,
                guard,
                value,
            } => {
                let action = action.as_ref().map(|a| a.name()).unwrap_or("");
                write!(f, "[{action}] {guard} : {value};")
            }
        }
    }
}

/// Reward structure (`rewards "name" ... endrewards`)
#[derive(Debug, Clone, PartialEq)]
pub struct RewardStructure {
    name: Option<String>,
    items: Vec<RewardItem>,
}

impl RewardStructure {
    /// Create a new reward structure
    pub fn new(name: Option<String>, items: Vec<RewardItem>) -> Self {
        Self { name, items }
    }

    /// Name of the reward structure, `None` for the unnamed one
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Items of the reward structure
    pub fn items(&self) -> &[RewardItem] {
        &self.items
    }
}

impl Display for RewardStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rewards")?;
        if let Some(name) = &self.name {
            write!(f, " \"{name}\"")?;
        }
        let body = join_iterator(self.items.iter(), "\n");
        write!(f, "\n{}\nendrewards", indent_all(body))
    }
}

/// PRISM program
///
/// # Example
///
/// ```
/// use pmc_model::expressions::*;
/// use pmc_model::program::*;
///
/// let program = ProgramBuilder::new(ProgramModelType::Dtmc)
///     .with_constant(Constant::new("p", ConstantType::Double, None))
///     .unwrap()
///     .with_module(Module::new(
///         "coin",
///         vec![Variable::new("x", VariableType::Bool, Some(Expression::Bool(false)))],
///         vec![Command::new(
///             None,
///             !Expression::identifier("x"),
///             vec![
///                 Update::new(
///                     Some(Expression::identifier("p")),
///                     vec![Assignment::new("x", Expression::Bool(true))],
///                 ),
///                 Update::new(
///                     Some(Expression::Int(1) - Expression::identifier("p")),
///                     vec![],
///                 ),
///             ],
///         )],
///     ))
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(program.nr_modules(), 1);
/// assert!(program.has_undefined_constants());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    model_type: ProgramModelType,
    constants: Vec<Constant>,
    global_variables: Vec<Variable>,
    formulas: Vec<NamedFormula>,
    modules: Vec<Module>,
    labels: Vec<Label>,
    reward_structures: Vec<RewardStructure>,
    initial_states: Option<Expression>,
}

impl Program {
    /// Model type declared by the program
    pub fn model_type(&self) -> ProgramModelType {
        self.model_type
    }

    /// Number of modules, including renamed modules
    pub fn nr_modules(&self) -> usize {
        self.modules.len()
    }

    /// Check whether some constant of the program has no value
    pub fn has_undefined_constants(&self) -> bool {
        self.constants.iter().any(|c| !c.is_defined())
    }

    /// Constants without a value
    pub fn undefined_constants(&self) -> impl Iterator<Item = &Constant> {
        self.constants.iter().filter(|c| !c.is_defined())
    }

    /// All constants in order of declaration
    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    /// Get a constant by name
    pub fn constant(&self, name: &str) -> Option<&Constant> {
        self.constants.iter().find(|c| c.name().name() == name)
    }

    /// Global variables
    pub fn global_variables(&self) -> &[Variable] {
        &self.global_variables
    }

    /// Formula definitions
    pub fn formulas(&self) -> &[NamedFormula] {
        &self.formulas
    }

    /// Modules in order of declaration
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Get a module by name
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name().name() == name)
    }

    /// Labels
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Reward structures
    pub fn reward_structures(&self) -> &[RewardStructure] {
        &self.reward_structures
    }

    /// Expression describing the initial states, if an `init` block was given
    pub fn initial_states(&self) -> Option<&Expression> {
        self.initial_states.as_ref()
    }

    /// Actions used by any module
    pub fn actions(&self) -> BTreeSet<&Identifier> {
        self.modules.iter().flat_map(|m| m.actions()).collect()
    }

    /// Define undefined constants of the program
    ///
    /// Integer values are accepted for double constants. Returns an error if
    /// a constant does not exist, already has a value or the value has the
    /// wrong type.
    pub fn define_constants(
        &self,
        definitions: &HashMap<Identifier, Value>,
    ) -> Result<Program, ProgramError> {
        let mut program = self.clone();

        for (name, value) in definitions.iter() {
            let constant = program
                .constants
                .iter_mut()
                .find(|c| c.name() == name)
                .ok_or_else(|| ProgramError::UnknownConstant(name.clone()))?;

            if constant.is_defined() {
                return Err(ProgramError::ConstantAlreadyDefined(name.clone()));
            }

            let value = match (constant.ty, value) {
                (ConstantType::Int, Value::Int(i)) => Expression::Int(*i),
                (ConstantType::Double, Value::Int(i)) => Expression::Double(*i as f64),
                (ConstantType::Double, Value::Double(d)) => Expression::Double(*d),
                (ConstantType::Bool, Value::Bool(b)) => Expression::Bool(*b),
                (ty, v) => {
                    return Err(ProgramError::ConstantTypeMismatch {
                        constant: name.clone(),
                        expected: ty,
                        value: *v,
                    });
                }
            };
            constant.value = Some(value);
        }

        Ok(program)
    }
}

impl IsDeclared<Identifier> for Program {
    fn is_declared(&self, obj: &Identifier) -> bool {
        self.constants.iter().any(|c| c.name() == obj)
            || self.global_variables.iter().any(|v| v.name() == obj)
            || self.formulas.iter().any(|f| f.name() == obj)
            || self.modules.iter().any(|m| m.is_declared(obj))
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.model_type)?;

        let lines = |items: Vec<String>| (items, "\n");
        let blocks = |items: Vec<String>| (items, "\n\n");

        let sections = [
            lines(self.constants.iter().map(|c| c.to_string()).collect()),
            lines(
                self.global_variables
                    .iter()
                    .map(|v| format!("global {v}"))
                    .collect(),
            ),
            lines(self.formulas.iter().map(|x| x.to_string()).collect()),
            blocks(self.modules.iter().map(|m| m.to_string()).collect()),
            lines(self.labels.iter().map(|l| l.to_string()).collect()),
            blocks(self.reward_structures.iter().map(|r| r.to_string()).collect()),
            lines(
                self.initial_states
                    .iter()
                    .map(|i| format!("init\n{}\nendinit", indent_all(i.to_string())))
                    .collect(),
            ),
        ];

        for (items, sep) in sections.iter().filter(|(items, _)| !items.is_empty()) {
            writeln!(f)?;
            writeln!(f, "{}", items.join(*sep))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn die_module() -> Module {
        let s = || Expression::identifier("s");
        let command = |from: i64, to1: i64, to2: i64| {
            Command::new(
                None,
                Expression::binary(s(), crate::expressions::BinaryOp::Eq, Expression::Int(from)),
                vec![
                    Update::new(
                        Some(Expression::Double(0.5)),
                        vec![Assignment::new("s", Expression::Int(to1))],
                    ),
                    Update::new(
                        Some(Expression::Double(0.5)),
                        vec![Assignment::new("s", Expression::Int(to2))],
                    ),
                ],
            )
        };

        Module::new(
            "die",
            vec![Variable::new(
                "s",
                VariableType::Bounded {
                    lower: Expression::Int(0),
                    upper: Expression::Int(7),
                },
                Some(Expression::Int(0)),
            )],
            vec![command(0, 1, 2), command(1, 3, 4)],
        )
    }

    #[test]
    fn test_display_module() {
        assert_eq!(
            die_module().to_string(),
            "module die\n    s : [0..7] init 0;\n\n    [] s = 0 -> 0.5 : (s'=1) + 0.5 : (s'=2);\n    [] s = 1 -> 0.5 : (s'=3) + 0.5 : (s'=4);\nendmodule"
        );
    }

    #[test]
    fn test_renamed_module() {
        let renaming = HashMap::from([(Identifier::new("s"), Identifier::new("s2"))]);
        let renamed = die_module().renamed("die2", &renaming);

        assert_eq!(renamed.name(), &Identifier::new("die2"));
        assert!(renamed.is_declared(&Identifier::new("s2")));
        assert!(!renamed.is_declared(&Identifier::new("s")));
        assert!(renamed.to_string().contains("[] s2 = 0 -> 0.5 : (s2'=1)"));
    }

    #[test]
    fn test_define_constants() {
        let program = ProgramBuilder::new(ProgramModelType::Dtmc)
            .with_constant(Constant::new("N", ConstantType::Int, None))
            .unwrap()
            .with_constant(Constant::new("p", ConstantType::Double, None))
            .unwrap()
            .with_constant(Constant::new("q", ConstantType::Double, Some(Expression::Double(0.1))))
            .unwrap()
            .with_module(die_module())
            .unwrap()
            .build()
            .unwrap();
        assert!(program.has_undefined_constants());
        assert_eq!(program.undefined_constants().count(), 2);

        let defined = program
            .define_constants(&HashMap::from([
                (Identifier::new("N"), Value::Int(16)),
                (Identifier::new("p"), Value::Int(1)),
            ]))
            .unwrap();
        assert!(!defined.has_undefined_constants());
        assert_eq!(
            defined.constant("p").unwrap().value(),
            Some(&Expression::Double(1.0))
        );

        let err = program
            .define_constants(&HashMap::from([(Identifier::new("N"), Value::Double(0.5))]))
            .unwrap_err();
        assert!(matches!(err, ProgramError::ConstantTypeMismatch { .. }));

        let err = program
            .define_constants(&HashMap::from([(Identifier::new("M"), Value::Int(1))]))
            .unwrap_err();
        assert_eq!(err, ProgramError::UnknownConstant(Identifier::new("M")));

        let err = program
            .define_constants(&HashMap::from([(Identifier::new("q"), Value::Double(0.2))]))
            .unwrap_err();
        assert_eq!(err, ProgramError::ConstantAlreadyDefined(Identifier::new("q")));
    }

    #[test]
    fn test_display_program() {
        let program = ProgramBuilder::new(ProgramModelType::Dtmc)
            .with_constant(Constant::new("N", ConstantType::Int, Some(Expression::Int(7))))
            .unwrap()
            .with_module(die_module())
            .unwrap()
            .with_label(Label::new(
                "done",
                Expression::binary(
                    Expression::identifier("s"),
                    crate::expressions::BinaryOp::Eq,
                    Expression::identifier("N"),
                ),
            ))
            .unwrap()
            .build()
            .unwrap();

        let rendered = program.to_string();
        assert!(rendered.starts_with("dtmc\n\nconst int N = 7;\n\nmodule die\n"));
        assert!(rendered.ends_with("endmodule\n\nlabel \"done\" = s = N;\n"));
    }
}
