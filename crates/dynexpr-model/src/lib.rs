//! Wire model types for the dynexpr expression compiler.
//!
//! This crate holds the data that crosses the compiler boundary: the typed
//! [`AttributeValue`] with its DynamoDB JSON encoding, the per-property
//! [`PropertyDescriptor`] supplied by entity metadata, and the
//! [`CompiledRequest`] record handed to the transport layer.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod descriptor;
pub mod request;

pub use attribute_value::{AttributeValue, EmptyCollection};
pub use descriptor::PropertyDescriptor;
pub use request::{ClauseKind, CompiledRequest};
