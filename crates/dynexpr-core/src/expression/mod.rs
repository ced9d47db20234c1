//! Expression translation.
//!
//! Typed predicates and updates ([`ast`]) and positional format strings are
//! both lowered to DynamoDB expression text through a [`binder::Binder`],
//! which mints the placeholders of one clause.

pub(crate) mod ast;
pub(crate) mod binder;
mod reserved;
pub(crate) mod template;
pub(crate) mod translator;

pub use ast::{
    FunctionArg, FunctionName, Operand, Operator, Predicate, SetValue, Subject, Update,
    UpdateAction,
};
