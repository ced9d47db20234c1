//! Value-transform hooks (field encryption and similar).
//!
//! A property descriptor may name a hook by id. Before a value is bound, the
//! codec serializes its wire form to bytes, runs the hook, and binds the
//! result as a binary value. Decoding runs the inverse first.
//!
//! Hooks come in two flavours. [`ValueTransform`] runs inline and works on
//! both translation paths. [`AsyncValueTransform`] uses `#[async_trait]` so it
//! stays object-safe; the codec defers it as a [`DeferredTransform`], and the
//! async translation path resolves every deferred transform of a clause as
//! one order-preserving batch before the clause commits.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use dynexpr_model::AttributeValue;
use tokio_util::sync::CancellationToken;

use crate::error::{CompileError, TransformError};

/// What a hook knows about the value it transforms.
#[derive(Debug, Clone)]
pub struct TransformContext {
    /// Wire attribute name of the property.
    pub field: String,
    /// Entity type owning the property, when known.
    pub entity: Option<String>,
    /// Cancelled when the caller abandons the translation.
    pub cancellation: CancellationToken,
}

/// Synchronous value transform.
pub trait ValueTransform: Send + Sync + fmt::Debug {
    /// Transform plaintext wire bytes (encrypt).
    fn transform(&self, input: Bytes, ctx: &TransformContext) -> Result<Bytes, TransformError>;

    /// Undo [`ValueTransform::transform`] (decrypt).
    fn inverse(&self, input: Bytes, ctx: &TransformContext) -> Result<Bytes, TransformError>;
}

/// Asynchronous value transform, e.g. backed by a remote key service.
#[async_trait::async_trait]
pub trait AsyncValueTransform: Send + Sync + fmt::Debug {
    /// Transform plaintext wire bytes (encrypt).
    async fn transform(&self, input: Bytes, ctx: &TransformContext)
    -> Result<Bytes, TransformError>;

    /// Undo [`AsyncValueTransform::transform`] (decrypt).
    async fn inverse(&self, input: Bytes, ctx: &TransformContext) -> Result<Bytes, TransformError>;
}

/// A registered hook.
#[derive(Debug, Clone)]
pub enum TransformHook {
    /// Runs inline.
    Sync(Arc<dyn ValueTransform>),
    /// Deferred until the async path resolves the clause.
    Async(Arc<dyn AsyncValueTransform>),
}

/// Hooks keyed by the id descriptors refer to.
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    hooks: HashMap<String, TransformHook>,
}

impl TransformRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous hook under `id`, replacing any previous one.
    pub fn register_sync(&mut self, id: impl Into<String>, hook: Arc<dyn ValueTransform>) {
        self.hooks.insert(id.into(), TransformHook::Sync(hook));
    }

    /// Register an asynchronous hook under `id`, replacing any previous one.
    pub fn register_async(&mut self, id: impl Into<String>, hook: Arc<dyn AsyncValueTransform>) {
        self.hooks.insert(id.into(), TransformHook::Async(hook));
    }

    /// Look up a hook.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&TransformHook> {
        self.hooks.get(id)
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

/// A value binding produced by the codec.
#[derive(Debug)]
pub enum Binding {
    /// Wire value ready to bind.
    Ready(AttributeValue),
    /// Waiting on an asynchronous hook.
    Deferred(DeferredTransform),
}

/// An asynchronous transform captured during translation.
#[derive(Debug)]
pub struct DeferredTransform {
    hook_id: String,
    hook: Arc<dyn AsyncValueTransform>,
    input: Bytes,
    context: TransformContext,
}

impl DeferredTransform {
    pub(crate) fn new(
        hook_id: String,
        hook: Arc<dyn AsyncValueTransform>,
        input: Bytes,
        context: TransformContext,
    ) -> Self {
        Self {
            hook_id,
            hook,
            input,
            context,
        }
    }

    /// Wire attribute name of the value being transformed.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.context.field
    }

    /// Id of the hook this transform waits on.
    #[must_use]
    pub fn hook_id(&self) -> &str {
        &self.hook_id
    }

    /// Run the hook and wrap its output as a binary wire value.
    pub async fn resolve(self) -> Result<AttributeValue, CompileError> {
        let output = self
            .hook
            .transform(self.input, &self.context)
            .await
            .map_err(|source| CompileError::TransformFailure {
                field: self.context.field.clone(),
                source,
            })?;
        Ok(AttributeValue::B(output))
    }
}

/// Serialize a wire value to the bytes a hook operates on.
pub(crate) fn encode_payload(value: &AttributeValue) -> Result<Bytes, TransformError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| TransformError::MalformedPayload(e.to_string()))
}

/// Decode the bytes an inverse hook returned.
pub(crate) fn decode_payload(bytes: &[u8]) -> Result<AttributeValue, TransformError> {
    serde_json::from_slice(bytes).map_err(|e| TransformError::MalformedPayload(e.to_string()))
}
