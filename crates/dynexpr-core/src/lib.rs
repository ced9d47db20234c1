//! Client-side compiler for DynamoDB expressions.
//!
//! Callers describe key conditions, filters, conditions, updates and
//! projections either as a typed [`Predicate`] / [`Update`] tree or as a
//! positional format string (`"status = {0} AND age > {1:D3}"`). The
//! [`Compiler`] resolves logical property names through an
//! [`EntitySchema`], converts values with each property's format and
//! transform hook, and emits expression text whose names and values are
//! bound to `#attrN` / `:pN` placeholders in a request-wide
//! [`PlaceholderScope`].
//!
//! A clause either commits completely or leaves the scope untouched. The
//! `_async` entry points run asynchronous transform hooks concurrently and
//! can be cancelled with a [`tokio_util::sync::CancellationToken`].
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod compiler;
pub mod config;
pub mod error;
pub mod expression;
pub mod metadata;
pub mod request;
pub mod scope;
pub mod transform;
pub mod value;

pub use codec::Codec;
pub use compiler::Compiler;
pub use config::CompilerConfig;
pub use error::{CompileError, CompileErrorKind, CompileResult, TransformError};
pub use expression::{
    FunctionArg, FunctionName, Operand, Operator, Predicate, SetValue, Subject, Update,
    UpdateAction,
};
pub use metadata::{EntitySchema, SchemaRegistry};
pub use request::RequestBuilder;
pub use scope::{PlaceholderScope, TranslatedClause};
pub use transform::{
    AsyncValueTransform, TransformContext, TransformHook, TransformRegistry, ValueTransform,
};
pub use value::{Value, ValueKind};
