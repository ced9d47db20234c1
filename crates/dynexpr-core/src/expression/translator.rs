//! Predicate, update and projection translation.
//!
//! Walks the typed trees from [`super::ast`], resolving every logical property
//! through the entity schema and routing it through a name placeholder, so
//! reserved words never reach the wire. Values are bound in the order they are
//! encountered, left to right.

use dynexpr_model::{AttributeValue, ClauseKind, PropertyDescriptor};

use super::ast::{
    FunctionArg, FunctionName, Operand, Operator, Predicate, SetValue, Subject, Update,
    UpdateAction, UpdateKeyword,
};
use super::binder::Binder;
use crate::error::{CompileError, CompileResult};
use crate::metadata::EntitySchema;
use crate::value::Value;

/// Translates one clause into wire syntax.
pub(crate) struct Translator<'t, 'a> {
    binder: &'t mut Binder<'a>,
    schema: &'t EntitySchema,
    kind: ClauseKind,
}

impl<'t, 'a> Translator<'t, 'a> {
    pub(crate) fn new(binder: &'t mut Binder<'a>, schema: &'t EntitySchema, kind: ClauseKind) -> Self {
        Self {
            binder,
            schema,
            kind,
        }
    }

    // -----------------------------------------------------------------------
    // Predicates
    // -----------------------------------------------------------------------

    pub(crate) fn predicate(&mut self, node: &Predicate) -> CompileResult<String> {
        match node {
            Predicate::Compare {
                subject,
                op,
                operands,
            } => {
                self.check_key_condition_compare(subject, *op)?;
                self.compare(subject, *op, operands)
            }
            Predicate::Function { name, args } => {
                if self.kind == ClauseKind::KeyCondition && *name != FunctionName::BeginsWith {
                    return Err(self.not_in_key_condition(name.as_str()));
                }
                self.function(*name, args)
            }
            Predicate::And(children) => self.junction("AND", children),
            Predicate::Or(children) => {
                if self.kind == ClauseKind::KeyCondition {
                    return Err(self.not_in_key_condition("OR"));
                }
                self.junction("OR", children)
            }
            Predicate::Not(inner) => {
                if self.kind == ClauseKind::KeyCondition {
                    return Err(self.not_in_key_condition("NOT"));
                }
                self.negation(inner)
            }
        }
    }

    fn check_key_condition_compare(&self, subject: &Subject, op: Operator) -> CompileResult<()> {
        if self.kind != ClauseKind::KeyCondition {
            return Ok(());
        }
        if matches!(subject, Subject::Size(_)) {
            return Err(self.not_in_key_condition("size"));
        }
        match op {
            Operator::Eq
            | Operator::Lt
            | Operator::Lte
            | Operator::Gt
            | Operator::Gte
            | Operator::Between
            | Operator::BeginsWith => Ok(()),
            Operator::Ne | Operator::Contains | Operator::In => {
                Err(self.not_in_key_condition(&op.to_string()))
            }
        }
    }

    fn not_in_key_condition(&self, operation: &str) -> CompileError {
        CompileError::unsupported(operation, format!("not allowed in {}", self.kind))
    }

    fn compare(
        &mut self,
        subject: &Subject,
        op: Operator,
        operands: &[Operand],
    ) -> CompileResult<String> {
        let (min, max) = op.arity();
        if operands.len() < min || max.is_some_and(|max| operands.len() > max) {
            return Err(CompileError::InvalidOperandCount {
                operator: op.to_string(),
                expected: op.arity_text(),
                found: operands.len(),
            });
        }

        let descriptor = self.schema.resolve(subject.property())?;
        let name = self.binder.name(&descriptor.attribute_name);
        let (lhs, value_policy) = match subject {
            Subject::Property(_) => (name, descriptor.clone()),
            // size() compares a plain number, not the property's encoded form.
            Subject::Size(_) => (
                format!("size({name})"),
                PropertyDescriptor::new(descriptor.attribute_name.clone()),
            ),
        };
        let values = operands
            .iter()
            .map(|operand| self.binder.operand(operand, &value_policy))
            .collect::<CompileResult<Vec<_>>>()?;

        let expression = match op {
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
                format!("{lhs} {op} {}", values[0])
            }
            Operator::Between => format!("{lhs} BETWEEN {} AND {}", values[0], values[1]),
            Operator::BeginsWith | Operator::Contains => format!("{op}({lhs}, {})", values[0]),
            Operator::In => format!("{lhs} IN ({})", values.join(", ")),
        };
        Ok(expression)
    }

    fn function(&mut self, name: FunctionName, args: &[FunctionArg]) -> CompileResult<String> {
        match name {
            FunctionName::AttributeExists | FunctionName::AttributeNotExists => {
                let [FunctionArg::Property(property)] = args else {
                    return Err(function_shape(name, args, "exactly 1", "(property)"));
                };
                let descriptor = self.schema.resolve(property)?;
                let path = self.binder.name(&descriptor.attribute_name);
                Ok(format!("{name}({path})"))
            }
            FunctionName::AttributeType => {
                let [FunctionArg::Property(property), FunctionArg::Operand(operand)] = args else {
                    return Err(function_shape(name, args, "exactly 2", "(property, type)"));
                };
                let descriptor = self.schema.resolve(property)?;
                if let Operand::Value(value) = operand {
                    check_type_descriptor(value, &descriptor.attribute_name)?;
                }
                let path = self.binder.name(&descriptor.attribute_name);
                let plain = PropertyDescriptor::new(descriptor.attribute_name.clone());
                let value = self.binder.operand(operand, &plain)?;
                Ok(format!("{name}({path}, {value})"))
            }
            FunctionName::BeginsWith | FunctionName::Contains => {
                let [FunctionArg::Property(property), FunctionArg::Operand(operand)] = args else {
                    return Err(function_shape(name, args, "exactly 2", "(property, value)"));
                };
                let descriptor = self.schema.resolve(property)?;
                let path = self.binder.name(&descriptor.attribute_name);
                let value = self.binder.operand(operand, descriptor)?;
                Ok(format!("{name}({path}, {value})"))
            }
            FunctionName::Size | FunctionName::IfNotExists | FunctionName::ListAppend => Err(
                CompileError::unsupported(name.as_str(), "is not a condition function"),
            ),
        }
    }

    fn junction(&mut self, connective: &str, children: &[Predicate]) -> CompileResult<String> {
        match children {
            [] => Err(CompileError::unsupported(
                connective,
                "needs at least one operand",
            )),
            [only] => self.predicate(only),
            _ => {
                let parts = children
                    .iter()
                    .map(|child| self.predicate(child).map(|s| format!("({s})")))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(parts.join(&format!(" {connective} ")))
            }
        }
    }

    fn negation(&mut self, inner: &Predicate) -> CompileResult<String> {
        match inner {
            Predicate::Not(x) => self.predicate(x),
            Predicate::Compare {
                subject,
                op,
                operands,
            } => match (op.inverse(), op) {
                (Some(inverse), _) => self.compare(subject, inverse, operands),
                (None, Operator::Between | Operator::BeginsWith) => Err(
                    CompileError::unsupported(op.to_string(), "cannot be negated"),
                ),
                (None, _) => Ok(format!("NOT ({})", self.compare(subject, *op, operands)?)),
            },
            Predicate::Function { name, args } => match name {
                FunctionName::AttributeExists => self.function(FunctionName::AttributeNotExists, args),
                FunctionName::AttributeNotExists => self.function(FunctionName::AttributeExists, args),
                FunctionName::BeginsWith => Err(CompileError::unsupported(
                    name.as_str(),
                    "cannot be negated",
                )),
                _ => Ok(format!("NOT {}", self.function(*name, args)?)),
            },
            Predicate::And(children) | Predicate::Or(children) if children.len() == 1 => {
                self.negation(&children[0])
            }
            Predicate::And(_) | Predicate::Or(_) => {
                Ok(format!("NOT ({})", self.predicate(inner)?))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Updates and projections
    // -----------------------------------------------------------------------

    pub(crate) fn update(&mut self, update: &Update) -> CompileResult<String> {
        if update.is_empty() {
            return Err(CompileError::unsupported(
                "UPDATE",
                "an update needs at least one action",
            ));
        }

        let mut keywords: Vec<UpdateKeyword> = Vec::new();
        for action in &update.actions {
            if !keywords.contains(&action.keyword()) {
                keywords.push(action.keyword());
            }
        }

        let mut groups = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let items = update
                .actions
                .iter()
                .filter(|action| action.keyword() == keyword)
                .map(|action| self.update_action(action))
                .collect::<CompileResult<Vec<_>>>()?;
            groups.push(format!("{keyword} {}", items.join(", ")));
        }
        Ok(groups.join(" "))
    }

    fn update_action(&mut self, action: &UpdateAction) -> CompileResult<String> {
        match action {
            UpdateAction::Set { property, value } => {
                let descriptor = self.schema.resolve(property)?;
                let path = self.binder.name(&descriptor.attribute_name);
                let rhs = self.set_value(value, descriptor, true)?;
                Ok(format!("{path} = {rhs}"))
            }
            UpdateAction::Remove { property } => {
                let descriptor = self.schema.resolve(property)?;
                Ok(self.binder.name(&descriptor.attribute_name))
            }
            UpdateAction::Add { property, value } | UpdateAction::Delete { property, value } => {
                let descriptor = self.schema.resolve(property)?;
                let path = self.binder.name(&descriptor.attribute_name);
                let value = self.binder.operand(value, descriptor)?;
                Ok(format!("{path} {value}"))
            }
        }
    }

    fn set_value(
        &mut self,
        value: &SetValue,
        target: &PropertyDescriptor,
        top_level: bool,
    ) -> CompileResult<String> {
        match value {
            SetValue::Operand(operand) => self.binder.operand(operand, target),
            SetValue::Property(property) => {
                let descriptor = self.schema.resolve(property)?;
                Ok(self.binder.name(&descriptor.attribute_name))
            }
            SetValue::Plus(a, b) | SetValue::Minus(a, b) => {
                if !top_level {
                    return Err(CompileError::unsupported(
                        "SET",
                        "arithmetic cannot be nested",
                    ));
                }
                let sign = if matches!(value, SetValue::Plus(..)) { '+' } else { '-' };
                let a = self.set_value(a, target, false)?;
                let b = self.set_value(b, target, false)?;
                Ok(format!("{a} {sign} {b}"))
            }
            SetValue::IfNotExists(property, default) => {
                let descriptor = self.schema.resolve(property)?;
                let path = self.binder.name(&descriptor.attribute_name);
                let default = self.binder.operand(default, descriptor)?;
                Ok(format!("{}({path}, {default})", FunctionName::IfNotExists))
            }
            SetValue::ListAppend(a, b) => {
                let a = self.set_value(a, target, false)?;
                let b = self.set_value(b, target, false)?;
                Ok(format!("{}({a}, {b})", FunctionName::ListAppend))
            }
        }
    }

    pub(crate) fn projection(&mut self, properties: &[String]) -> CompileResult<String> {
        if properties.is_empty() {
            return Err(CompileError::unsupported(
                "PROJECTION",
                "a projection needs at least one property",
            ));
        }
        let names = properties
            .iter()
            .map(|property| {
                self.schema
                    .resolve(property)
                    .map(|descriptor| self.binder.name(&descriptor.attribute_name))
            })
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(names.join(", "))
    }
}

fn function_shape(
    name: FunctionName,
    args: &[FunctionArg],
    expected: &'static str,
    signature: &str,
) -> CompileError {
    let arity = match name {
        FunctionName::AttributeExists | FunctionName::AttributeNotExists => 1,
        _ => 2,
    };
    if args.len() == arity {
        CompileError::unsupported(name.as_str(), format!("expects arguments {signature}"))
    } else {
        CompileError::InvalidOperandCount {
            operator: name.as_str().to_owned(),
            expected,
            found: args.len(),
        }
    }
}

fn check_type_descriptor(value: &Value, field: &str) -> CompileResult<()> {
    match value {
        Value::String(s) if AttributeValue::is_type_descriptor(s) => Ok(()),
        Value::String(s) => Err(CompileError::invalid_value(
            field,
            format!("'{s}' is not an attribute type (S, N, B, SS, NS, BS, BOOL, NULL, L, M)"),
        )),
        other => Err(CompileError::invalid_value(
            field,
            format!("attribute type must be a string, got {}", other.kind()),
        )),
    }
}
