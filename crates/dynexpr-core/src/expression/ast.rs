//! Typed predicate and update trees.
//!
//! Callers build these from logical property names; the translator resolves
//! each name through entity metadata and emits wire syntax. Nodes are
//! immutable once built and live for a single translation.

use std::fmt;

use crate::value::Value;

/// A condition, filter or key-condition predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `subject op operand(s)`.
    Compare {
        /// Property (or its size) being compared.
        subject: Subject,
        /// Comparison operator.
        op: Operator,
        /// Right-hand operands; the count depends on `op`.
        operands: Vec<Operand>,
    },
    /// Function call: `attribute_exists(p)`, `begins_with(p, v)`, ...
    Function {
        /// Function name.
        name: FunctionName,
        /// Function arguments.
        args: Vec<FunctionArg>,
    },
    /// Conjunction. Children are emitted in order.
    And(Vec<Predicate>),
    /// Disjunction. Children are emitted in order.
    Or(Vec<Predicate>),
    /// Negation.
    Not(Box<Predicate>),
}

/// Left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    /// A logical property.
    Property(String),
    /// `size(property)`.
    Size(String),
}

impl Subject {
    /// `size(property)`.
    #[must_use]
    pub fn size(property: impl Into<String>) -> Self {
        Self::Size(property.into())
    }

    /// The logical property this subject refers to.
    #[must_use]
    pub fn property(&self) -> &str {
        match self {
            Self::Property(p) | Self::Size(p) => p,
        }
    }
}

impl From<&str> for Subject {
    fn from(property: &str) -> Self {
        Self::Property(property.to_owned())
    }
}

impl From<String> for Subject {
    fn from(property: String) -> Self {
        Self::Property(property)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `BETWEEN a AND b`
    Between,
    /// `begins_with(p, v)`
    BeginsWith,
    /// `contains(p, v)`
    Contains,
    /// `IN (v0, v1, ...)`
    In,
}

impl Operator {
    /// Algebraic inverse, for the operators that have one.
    #[must_use]
    pub fn inverse(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Ne),
            Self::Ne => Some(Self::Eq),
            Self::Lt => Some(Self::Gte),
            Self::Lte => Some(Self::Gt),
            Self::Gt => Some(Self::Lte),
            Self::Gte => Some(Self::Lt),
            Self::Between | Self::BeginsWith | Self::Contains | Self::In => None,
        }
    }

    /// Accepted operand count, as `(min, max)`.
    pub(crate) fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Between => (2, Some(2)),
            Self::In => (1, None),
            _ => (1, Some(1)),
        }
    }

    /// Operand count wording for error messages.
    pub(crate) fn arity_text(self) -> &'static str {
        match self {
            Self::Between => "exactly 2",
            Self::In => "at least 1",
            _ => "exactly 1",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Between => "BETWEEN",
            Self::BeginsWith => "begins_with",
            Self::Contains => "contains",
            Self::In => "IN",
        };
        f.write_str(text)
    }
}

/// Built-in wire functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionName {
    /// `attribute_exists(path)`
    AttributeExists,
    /// `attribute_not_exists(path)`
    AttributeNotExists,
    /// `attribute_type(path, type)`
    AttributeType,
    /// `begins_with(path, prefix)`
    BeginsWith,
    /// `contains(path, operand)`
    Contains,
    /// `size(path)`
    Size,
    /// `if_not_exists(path, operand)`, update only.
    IfNotExists,
    /// `list_append(a, b)`, update only.
    ListAppend,
}

impl FunctionName {
    /// Every function, for keyword lookup.
    pub const ALL: [Self; 8] = [
        Self::AttributeExists,
        Self::AttributeNotExists,
        Self::AttributeType,
        Self::BeginsWith,
        Self::Contains,
        Self::Size,
        Self::IfNotExists,
        Self::ListAppend,
    ];

    /// Wire spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttributeExists => "attribute_exists",
            Self::AttributeNotExists => "attribute_not_exists",
            Self::AttributeType => "attribute_type",
            Self::BeginsWith => "begins_with",
            Self::Contains => "contains",
            Self::Size => "size",
            Self::IfNotExists => "if_not_exists",
            Self::ListAppend => "list_append",
        }
    }

    /// Case-insensitive lookup of a function keyword.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Argument of a [`Predicate::Function`].
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    /// A logical property, emitted as a name placeholder.
    Property(String),
    /// A bound value.
    Operand(Operand),
}

/// A bound value on the right-hand side of a comparison or action.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A native value, converted by the codec and given a fresh placeholder.
    Value(Value),
    /// A value placeholder already minted in the request scope.
    Placeholder(String),
}

impl Operand {
    /// A literal value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Explicit reuse of a minted placeholder (`:p0`).
    pub fn placeholder(placeholder: impl Into<String>) -> Self {
        Self::Placeholder(placeholder.into())
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

fn compare(property: impl Into<String>, op: Operator, operands: Vec<Operand>) -> Predicate {
    Predicate::Compare {
        subject: Subject::Property(property.into()),
        op,
        operands,
    }
}

impl Predicate {
    /// General comparison.
    pub fn compare(subject: impl Into<Subject>, op: Operator, operands: Vec<Operand>) -> Self {
        Self::Compare {
            subject: subject.into(),
            op,
            operands,
        }
    }

    /// `property = value`
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(property, Operator::Eq, vec![Operand::value(value)])
    }

    /// `property <> value`
    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(property, Operator::Ne, vec![Operand::value(value)])
    }

    /// `property < value`
    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(property, Operator::Lt, vec![Operand::value(value)])
    }

    /// `property <= value`
    pub fn lte(property: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(property, Operator::Lte, vec![Operand::value(value)])
    }

    /// `property > value`
    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(property, Operator::Gt, vec![Operand::value(value)])
    }

    /// `property >= value`
    pub fn gte(property: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(property, Operator::Gte, vec![Operand::value(value)])
    }

    /// `property BETWEEN low AND high`
    pub fn between(
        property: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        compare(
            property,
            Operator::Between,
            vec![Operand::value(low), Operand::value(high)],
        )
    }

    /// `begins_with(property, prefix)`
    pub fn begins_with(property: impl Into<String>, prefix: impl Into<Value>) -> Self {
        compare(property, Operator::BeginsWith, vec![Operand::value(prefix)])
    }

    /// `contains(property, value)`
    pub fn contains(property: impl Into<String>, value: impl Into<Value>) -> Self {
        compare(property, Operator::Contains, vec![Operand::value(value)])
    }

    /// `property IN (v0, v1, ...)`
    pub fn is_in<I, V>(property: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        compare(
            property,
            Operator::In,
            values.into_iter().map(Operand::value).collect(),
        )
    }

    /// `size(property) op value`
    pub fn size(property: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self::compare(Subject::size(property), op, vec![Operand::value(value)])
    }

    /// `attribute_exists(property)`
    pub fn attribute_exists(property: impl Into<String>) -> Self {
        Self::Function {
            name: FunctionName::AttributeExists,
            args: vec![FunctionArg::Property(property.into())],
        }
    }

    /// `attribute_not_exists(property)`
    pub fn attribute_not_exists(property: impl Into<String>) -> Self {
        Self::Function {
            name: FunctionName::AttributeNotExists,
            args: vec![FunctionArg::Property(property.into())],
        }
    }

    /// `attribute_type(property, :t)` where `:t` binds a wire type descriptor.
    pub fn attribute_type(property: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self::Function {
            name: FunctionName::AttributeType,
            args: vec![
                FunctionArg::Property(property.into()),
                FunctionArg::Operand(Operand::Value(Value::String(descriptor.into()))),
            ],
        }
    }

    /// Conjunction of `children`.
    pub fn and(children: impl IntoIterator<Item = Predicate>) -> Self {
        Self::And(children.into_iter().collect())
    }

    /// Disjunction of `children`.
    pub fn or(children: impl IntoIterator<Item = Predicate>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    /// Negation of `self`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

impl std::ops::Not for Predicate {
    type Output = Self;

    fn not(self) -> Self {
        self.negate()
    }
}

/// An update expression: ordered SET / REMOVE / ADD / DELETE actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// Actions in caller order.
    pub actions: Vec<UpdateAction>,
}

/// One update action.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// `SET property = value`
    Set {
        /// Target property.
        property: String,
        /// Assigned value.
        value: SetValue,
    },
    /// `REMOVE property`
    Remove {
        /// Target property.
        property: String,
    },
    /// `ADD property value` (numbers and sets).
    Add {
        /// Target property.
        property: String,
        /// Added value.
        value: Operand,
    },
    /// `DELETE property value` (set members).
    Delete {
        /// Target property.
        property: String,
        /// Removed members.
        value: Operand,
    },
}

impl UpdateAction {
    pub(crate) fn keyword(&self) -> UpdateKeyword {
        match self {
            Self::Set { .. } => UpdateKeyword::Set,
            Self::Remove { .. } => UpdateKeyword::Remove,
            Self::Add { .. } => UpdateKeyword::Add,
            Self::Delete { .. } => UpdateKeyword::Delete,
        }
    }
}

/// Clause keyword an update action is grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum UpdateKeyword {
    Set,
    Remove,
    Add,
    Delete,
}

impl fmt::Display for UpdateKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Set => "SET",
            Self::Remove => "REMOVE",
            Self::Add => "ADD",
            Self::Delete => "DELETE",
        })
    }
}

/// Right-hand side of a SET action.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    /// A bound value.
    Operand(Operand),
    /// Another property's current value.
    Property(String),
    /// `a + b`
    Plus(Box<SetValue>, Box<SetValue>),
    /// `a - b`
    Minus(Box<SetValue>, Box<SetValue>),
    /// `if_not_exists(property, default)`
    IfNotExists(String, Operand),
    /// `list_append(a, b)`
    ListAppend(Box<SetValue>, Box<SetValue>),
}

impl SetValue {
    /// A literal value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Operand(Operand::value(value))
    }

    /// Another property.
    pub fn property(property: impl Into<String>) -> Self {
        Self::Property(property.into())
    }

    /// `a + b`
    #[must_use]
    pub fn plus(a: SetValue, b: SetValue) -> Self {
        Self::Plus(Box::new(a), Box::new(b))
    }

    /// `a - b`
    #[must_use]
    pub fn minus(a: SetValue, b: SetValue) -> Self {
        Self::Minus(Box::new(a), Box::new(b))
    }

    /// `if_not_exists(property, default)`
    pub fn if_not_exists(property: impl Into<String>, default: impl Into<Value>) -> Self {
        Self::IfNotExists(property.into(), Operand::value(default))
    }

    /// `list_append(a, b)`
    #[must_use]
    pub fn list_append(a: SetValue, b: SetValue) -> Self {
        Self::ListAppend(Box::new(a), Box::new(b))
    }
}

impl Update {
    /// Create an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `SET property = value`
    #[must_use]
    pub fn set(self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_value(property, SetValue::value(value))
    }

    /// `SET property = <expression>`
    #[must_use]
    pub fn set_value(mut self, property: impl Into<String>, value: SetValue) -> Self {
        self.actions.push(UpdateAction::Set {
            property: property.into(),
            value,
        });
        self
    }

    /// `REMOVE property`
    #[must_use]
    pub fn remove(mut self, property: impl Into<String>) -> Self {
        self.actions.push(UpdateAction::Remove {
            property: property.into(),
        });
        self
    }

    /// `ADD property value`
    #[must_use]
    pub fn add(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.actions.push(UpdateAction::Add {
            property: property.into(),
            value: Operand::value(value),
        });
        self
    }

    /// `DELETE property value`
    #[must_use]
    pub fn delete(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.actions.push(UpdateAction::Delete {
            property: property.into(),
            value: Operand::value(value),
        });
        self
    }

    /// Whether the update has no action.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
