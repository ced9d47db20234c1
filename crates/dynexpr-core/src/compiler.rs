//! Public translation entry points.
//!
//! Every `translate_*` call stages a clause against the shared
//! [`PlaceholderScope`], resolves its value bindings, and only then commits.
//! The `_async` variants additionally run asynchronous transform hooks and
//! honour a [`CancellationToken`].

use dynexpr_model::{ClauseKind, PropertyDescriptor};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::codec::Codec;
use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult};
use crate::expression::ast::{Predicate, Update};
use crate::expression::binder::Binder;
use crate::expression::template::TemplateParser;
use crate::expression::translator::Translator;
use crate::metadata::EntitySchema;
use crate::request::RequestBuilder;
use crate::scope::{PendingClause, PlaceholderScope, TranslatedClause};
use crate::transform::TransformRegistry;
use crate::value::Value;

/// Expression compiler: configuration plus registered transform hooks.
///
/// # Examples
///
/// ```
/// use dynexpr_core::{Compiler, EntitySchema, PlaceholderScope, Predicate};
/// use dynexpr_model::{ClauseKind, PropertyDescriptor};
///
/// let compiler = Compiler::default();
/// let schema = EntitySchema::new("User").with_property(PropertyDescriptor::new("pk"));
/// let mut scope = PlaceholderScope::new();
///
/// let clause = compiler
///     .translate_predicate(
///         ClauseKind::KeyCondition,
///         &Predicate::eq("pk", "USER#123"),
///         &schema,
///         &mut scope,
///     )
///     .unwrap();
/// assert_eq!(clause.expression, "#attr0 = :p0");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
    transforms: TransformRegistry,
}

impl Compiler {
    /// Create a compiler.
    #[must_use]
    pub fn new(config: CompilerConfig, transforms: TransformRegistry) -> Self {
        Self { config, transforms }
    }

    /// Create a compiler configured from the environment, with no hooks.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(CompilerConfig::from_env(), TransformRegistry::new())
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// The registered transform hooks.
    #[must_use]
    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    /// A codec using this compiler's formats and hooks.
    #[must_use]
    pub fn codec(&self) -> Codec<'_> {
        Codec::new(&self.config, &self.transforms)
    }

    /// A fresh scope with the configured placeholder prefixes.
    #[must_use]
    pub fn scope(&self) -> PlaceholderScope {
        PlaceholderScope::with_config(&self.config)
    }

    /// Start composing a request.
    #[must_use]
    pub fn request(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(self)
    }

    /// Convert `value` with `descriptor`'s policy and bind it to a new value
    /// placeholder, for explicit reuse across clauses.
    pub fn bind_value(
        &self,
        value: &Value,
        descriptor: &PropertyDescriptor,
        scope: &mut PlaceholderScope,
    ) -> CompileResult<String> {
        let wire = self.codec().to_wire(value, descriptor)?;
        scope.next_value_placeholder(wire)
    }

    /// Translate a typed predicate.
    pub fn translate_predicate(
        &self,
        kind: ClauseKind,
        predicate: &Predicate,
        schema: &EntitySchema,
        scope: &mut PlaceholderScope,
    ) -> CompileResult<TranslatedClause> {
        let pending =
            self.stage_predicate(kind, predicate, schema, scope, &CancellationToken::new())?;
        Ok(scope.commit(kind, pending.resolve_sync()?))
    }

    /// Translate a typed predicate, awaiting asynchronous transform hooks.
    pub async fn translate_predicate_async(
        &self,
        kind: ClauseKind,
        predicate: &Predicate,
        schema: &EntitySchema,
        scope: &mut PlaceholderScope,
        cancel: &CancellationToken,
    ) -> CompileResult<TranslatedClause> {
        let pending = self.stage_predicate(kind, predicate, schema, scope, cancel)?;
        let resolved = pending.resolve(cancel).await?;
        Ok(scope.commit(kind, resolved))
    }

    /// Translate a positional format string. `schema`, when given, supplies
    /// the format and transform of properties referenced before a slot.
    pub fn translate_format_string(
        &self,
        kind: ClauseKind,
        template: &str,
        args: &[Value],
        schema: Option<&EntitySchema>,
        scope: &mut PlaceholderScope,
    ) -> CompileResult<TranslatedClause> {
        let pending =
            self.stage_template(kind, template, args, schema, scope, &CancellationToken::new())?;
        Ok(scope.commit(kind, pending.resolve_sync()?))
    }

    /// Translate a positional format string, awaiting asynchronous transform hooks.
    pub async fn translate_format_string_async(
        &self,
        kind: ClauseKind,
        template: &str,
        args: &[Value],
        schema: Option<&EntitySchema>,
        scope: &mut PlaceholderScope,
        cancel: &CancellationToken,
    ) -> CompileResult<TranslatedClause> {
        let pending = self.stage_template(kind, template, args, schema, scope, cancel)?;
        let resolved = pending.resolve(cancel).await?;
        Ok(scope.commit(kind, resolved))
    }

    /// Translate an update.
    pub fn translate_update(
        &self,
        update: &Update,
        schema: &EntitySchema,
        scope: &mut PlaceholderScope,
    ) -> CompileResult<TranslatedClause> {
        let pending = self.stage_update(update, schema, scope, &CancellationToken::new())?;
        Ok(scope.commit(ClauseKind::Update, pending.resolve_sync()?))
    }

    /// Translate an update, awaiting asynchronous transform hooks.
    pub async fn translate_update_async(
        &self,
        update: &Update,
        schema: &EntitySchema,
        scope: &mut PlaceholderScope,
        cancel: &CancellationToken,
    ) -> CompileResult<TranslatedClause> {
        let pending = self.stage_update(update, schema, scope, cancel)?;
        let resolved = pending.resolve(cancel).await?;
        Ok(scope.commit(ClauseKind::Update, resolved))
    }

    /// Translate a projection list of logical property names.
    pub fn translate_projection<S: AsRef<str>>(
        &self,
        properties: &[S],
        schema: &EntitySchema,
        scope: &mut PlaceholderScope,
    ) -> CompileResult<TranslatedClause> {
        let properties: Vec<String> = properties.iter().map(|p| p.as_ref().to_owned()).collect();
        let pending = self.stage(
            ClauseKind::Projection,
            Some(schema),
            scope,
            &CancellationToken::new(),
            |binder| Translator::new(binder, schema, ClauseKind::Projection).projection(&properties),
        )?;
        Ok(scope.commit(ClauseKind::Projection, pending.resolve_sync()?))
    }

    fn stage_predicate(
        &self,
        kind: ClauseKind,
        predicate: &Predicate,
        schema: &EntitySchema,
        scope: &PlaceholderScope,
        cancel: &CancellationToken,
    ) -> CompileResult<PendingClause> {
        if !kind.is_conjunctive() {
            return Err(CompileError::unsupported(
                kind.field_name(),
                "does not take a predicate",
            ));
        }
        self.stage(kind, Some(schema), scope, cancel, |binder| {
            Translator::new(binder, schema, kind).predicate(predicate)
        })
    }

    fn stage_update(
        &self,
        update: &Update,
        schema: &EntitySchema,
        scope: &PlaceholderScope,
        cancel: &CancellationToken,
    ) -> CompileResult<PendingClause> {
        self.stage(ClauseKind::Update, Some(schema), scope, cancel, |binder| {
            Translator::new(binder, schema, ClauseKind::Update).update(update)
        })
    }

    fn stage_template(
        &self,
        kind: ClauseKind,
        template: &str,
        args: &[Value],
        schema: Option<&EntitySchema>,
        scope: &PlaceholderScope,
        cancel: &CancellationToken,
    ) -> CompileResult<PendingClause> {
        let alias = self.config.alias_reserved_words;
        self.stage(kind, schema, scope, cancel, |binder| {
            TemplateParser::new(template, args, schema, binder, alias).parse()
        })
    }

    fn stage<F>(
        &self,
        kind: ClauseKind,
        schema: Option<&EntitySchema>,
        scope: &PlaceholderScope,
        cancel: &CancellationToken,
        translate: F,
    ) -> CompileResult<PendingClause>
    where
        F: FnOnce(&mut Binder<'_>) -> CompileResult<String>,
    {
        let entity = schema.map(|s| s.entity.as_str());
        trace!(clause = %kind, entity = ?entity, "translating clause");
        let mut binder = Binder::new(self.codec(), scope, entity, cancel);
        let expression = translate(&mut binder)?;
        Ok(binder.finish(expression))
    }
}
