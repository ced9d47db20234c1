//! Request composition.
//!
//! A [`RequestBuilder`] owns the [`PlaceholderScope`] of one logical request
//! and collects clauses into a [`CompiledRequest`]. Key conditions, filters
//! and conditions may be added repeatedly and are combined with `AND`; an
//! update or projection may be set once.

use dynexpr_model::{ClauseKind, CompiledRequest, PropertyDescriptor};
use tokio_util::sync::CancellationToken;

use crate::compiler::Compiler;
use crate::error::{CompileError, CompileResult};
use crate::expression::ast::{Predicate, Update};
use crate::metadata::EntitySchema;
use crate::scope::{PlaceholderScope, TranslatedClause};
use crate::value::Value;

/// Builds the expressions and placeholder maps of one request.
#[derive(Debug)]
pub struct RequestBuilder<'c> {
    compiler: &'c Compiler,
    scope: PlaceholderScope,
    request: CompiledRequest,
}

impl<'c> RequestBuilder<'c> {
    /// Start an empty request.
    #[must_use]
    pub fn new(compiler: &'c Compiler) -> Self {
        Self {
            compiler,
            scope: compiler.scope(),
            request: CompiledRequest::default(),
        }
    }

    /// The request's placeholder scope.
    #[must_use]
    pub fn scope(&self) -> &PlaceholderScope {
        &self.scope
    }

    /// Pre-bind a value for explicit reuse; see [`Compiler::bind_value`].
    pub fn bind_value(
        &mut self,
        value: &Value,
        descriptor: &PropertyDescriptor,
    ) -> CompileResult<String> {
        self.compiler.bind_value(value, descriptor, &mut self.scope)
    }

    /// Add a typed predicate to a key-condition, filter or condition slot.
    pub fn predicate(
        &mut self,
        kind: ClauseKind,
        predicate: &Predicate,
        schema: &EntitySchema,
    ) -> CompileResult<&mut Self> {
        self.ensure_open(kind)?;
        let clause = self
            .compiler
            .translate_predicate(kind, predicate, schema, &mut self.scope)?;
        Ok(self.merge(kind, clause))
    }

    /// Async variant of [`RequestBuilder::predicate`].
    pub async fn predicate_async(
        &mut self,
        kind: ClauseKind,
        predicate: &Predicate,
        schema: &EntitySchema,
        cancel: &CancellationToken,
    ) -> CompileResult<&mut Self> {
        self.ensure_open(kind)?;
        let clause = self
            .compiler
            .translate_predicate_async(kind, predicate, schema, &mut self.scope, cancel)
            .await?;
        Ok(self.merge(kind, clause))
    }

    /// Add a format-string clause to any slot.
    pub fn format_string(
        &mut self,
        kind: ClauseKind,
        template: &str,
        args: &[Value],
        schema: Option<&EntitySchema>,
    ) -> CompileResult<&mut Self> {
        self.ensure_open(kind)?;
        let clause =
            self.compiler
                .translate_format_string(kind, template, args, schema, &mut self.scope)?;
        Ok(self.merge(kind, clause))
    }

    /// Async variant of [`RequestBuilder::format_string`].
    pub async fn format_string_async(
        &mut self,
        kind: ClauseKind,
        template: &str,
        args: &[Value],
        schema: Option<&EntitySchema>,
        cancel: &CancellationToken,
    ) -> CompileResult<&mut Self> {
        self.ensure_open(kind)?;
        let clause = self
            .compiler
            .translate_format_string_async(kind, template, args, schema, &mut self.scope, cancel)
            .await?;
        Ok(self.merge(kind, clause))
    }

    /// Set the update expression.
    pub fn update(&mut self, update: &Update, schema: &EntitySchema) -> CompileResult<&mut Self> {
        self.ensure_open(ClauseKind::Update)?;
        let clause = self
            .compiler
            .translate_update(update, schema, &mut self.scope)?;
        Ok(self.merge(ClauseKind::Update, clause))
    }

    /// Async variant of [`RequestBuilder::update`].
    pub async fn update_async(
        &mut self,
        update: &Update,
        schema: &EntitySchema,
        cancel: &CancellationToken,
    ) -> CompileResult<&mut Self> {
        self.ensure_open(ClauseKind::Update)?;
        let clause = self
            .compiler
            .translate_update_async(update, schema, &mut self.scope, cancel)
            .await?;
        Ok(self.merge(ClauseKind::Update, clause))
    }

    /// Set the projection expression.
    pub fn projection<S: AsRef<str>>(
        &mut self,
        properties: &[S],
        schema: &EntitySchema,
    ) -> CompileResult<&mut Self> {
        self.ensure_open(ClauseKind::Projection)?;
        let clause = self
            .compiler
            .translate_projection(properties, schema, &mut self.scope)?;
        Ok(self.merge(ClauseKind::Projection, clause))
    }

    /// Finish the request.
    #[must_use]
    pub fn build(self) -> CompiledRequest {
        let mut request = self.request;
        let (names, values) = self.scope.into_parts();
        request.expression_attribute_names = names;
        request.expression_attribute_values = values;
        request
    }

    fn ensure_open(&self, kind: ClauseKind) -> CompileResult<()> {
        if !kind.is_conjunctive() && self.request.expression(kind).is_some() {
            return Err(CompileError::DuplicateClause { clause: kind });
        }
        Ok(())
    }

    fn merge(&mut self, kind: ClauseKind, clause: TranslatedClause) -> &mut Self {
        let slot = self.request.expression_mut(kind);
        *slot = Some(match slot.take() {
            Some(previous) => format!("({previous}) AND ({})", clause.expression),
            None => clause.expression,
        });
        self
    }
}
