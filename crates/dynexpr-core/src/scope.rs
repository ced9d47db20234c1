//! Placeholder allocation shared by every clause of one request.
//!
//! A [`PlaceholderScope`] mints `#attrN` name placeholders and `:pN` value
//! placeholders from two counters that only ever grow. Clause translation
//! never writes to the scope directly: it allocates into a [`ClauseDraft`]
//! seeded with the scope's counters, and the finished clause is committed in
//! one step once every binding (including deferred transforms) has resolved.
//! A clause that fails leaves the scope exactly as it found it.

use std::collections::HashMap;

use dynexpr_model::{AttributeValue, ClauseKind};
use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult, TransformError};
use crate::transform::Binding;

/// Name and value placeholders minted for one logical request.
#[derive(Debug, Clone)]
pub struct PlaceholderScope {
    name_prefix: String,
    value_prefix: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
    next_name: usize,
    next_value: usize,
}

impl Default for PlaceholderScope {
    fn default() -> Self {
        Self::with_config(&CompilerConfig::default())
    }
}

impl PlaceholderScope {
    /// Create a scope producing `#attrN` / `:pN`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope using the placeholder prefixes from `config`.
    #[must_use]
    pub fn with_config(config: &CompilerConfig) -> Self {
        Self {
            name_prefix: format!("#{}", config.name_prefix),
            value_prefix: format!(":{}", config.value_prefix),
            names: HashMap::new(),
            values: HashMap::new(),
            next_name: 0,
            next_value: 0,
        }
    }

    /// Mint a name placeholder for `attribute_name`.
    pub fn next_name_placeholder(&mut self, attribute_name: impl Into<String>) -> String {
        let placeholder = format!("{}{}", self.name_prefix, self.next_name);
        self.next_name += 1;
        self.names.insert(placeholder.clone(), attribute_name.into());
        placeholder
    }

    /// Mint a value placeholder bound to `value`.
    ///
    /// The returned placeholder can be referenced explicitly by later clauses
    /// to reuse the value. Empty collections are rejected.
    pub fn next_value_placeholder(&mut self, value: AttributeValue) -> CompileResult<String> {
        let placeholder = format!("{}{}", self.value_prefix, self.next_value);
        if let Some(empty) = value.find_empty_collection() {
            return Err(CompileError::EmptyCollectionValue {
                field: format!("{placeholder}{}", empty.path),
                collection: empty.collection,
            });
        }
        self.next_value += 1;
        self.values.insert(placeholder.clone(), value);
        Ok(placeholder)
    }

    /// Number of name placeholders minted so far.
    #[must_use]
    pub fn name_count(&self) -> usize {
        self.next_name
    }

    /// Number of value placeholders minted so far.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.next_value
    }

    /// Wire attribute name behind a `#` placeholder.
    #[must_use]
    pub fn resolve_name(&self, placeholder: &str) -> Option<&str> {
        self.names.get(placeholder).map(String::as_str)
    }

    /// Wire value behind a `:` placeholder.
    #[must_use]
    pub fn resolve_value(&self, placeholder: &str) -> Option<&AttributeValue> {
        self.values.get(placeholder)
    }

    /// Whether `placeholder` (either kind) has been minted.
    #[must_use]
    pub fn contains(&self, placeholder: &str) -> bool {
        match placeholder.as_bytes().first() {
            Some(b'#') => self.names.contains_key(placeholder),
            Some(b':') => self.values.contains_key(placeholder),
            _ => false,
        }
    }

    /// All name placeholders.
    #[must_use]
    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    /// All value placeholders.
    #[must_use]
    pub fn values(&self) -> &HashMap<String, AttributeValue> {
        &self.values
    }

    /// Consume the scope, returning the name and value maps.
    #[must_use]
    pub fn into_parts(self) -> (HashMap<String, String>, HashMap<String, AttributeValue>) {
        (self.names, self.values)
    }

    pub(crate) fn draft(&self) -> ClauseDraft<'_> {
        ClauseDraft {
            scope: self,
            names: Vec::new(),
            values: Vec::new(),
        }
    }

    pub(crate) fn commit(&mut self, kind: ClauseKind, clause: ResolvedClause) -> TranslatedClause {
        debug_assert_eq!(clause.name_base, self.next_name);
        debug_assert_eq!(clause.value_base, self.next_value);

        self.next_name += clause.names.len();
        self.next_value += clause.values.len();
        self.names.extend(clause.names.iter().cloned());
        self.values.extend(clause.values.iter().cloned());

        debug!(
            clause = %kind,
            names = clause.names.len(),
            values = clause.values.len(),
            "committed clause"
        );
        TranslatedClause {
            expression: clause.expression,
            names: clause.names,
            values: clause.values,
        }
    }
}

/// Placeholders allocated by a clause that has not been committed yet.
#[derive(Debug)]
pub(crate) struct ClauseDraft<'s> {
    scope: &'s PlaceholderScope,
    names: Vec<(String, String)>,
    values: Vec<(String, Binding)>,
}

impl ClauseDraft<'_> {
    pub(crate) fn name(&mut self, attribute_name: &str) -> String {
        let placeholder = format!(
            "{}{}",
            self.scope.name_prefix,
            self.scope.next_name + self.names.len()
        );
        self.names
            .push((placeholder.clone(), attribute_name.to_owned()));
        placeholder
    }

    pub(crate) fn value(&mut self, binding: Binding) -> String {
        let placeholder = format!(
            "{}{}",
            self.scope.value_prefix,
            self.scope.next_value + self.values.len()
        );
        self.values.push((placeholder.clone(), binding));
        placeholder
    }

    /// Resolve an explicitly written placeholder against the scope and this draft.
    pub(crate) fn reuse(&self, placeholder: &str) -> CompileResult<String> {
        let known = self.scope.contains(placeholder)
            || self.names.iter().any(|(p, _)| p == placeholder)
            || self.values.iter().any(|(p, _)| p == placeholder);
        if known {
            Ok(placeholder.to_owned())
        } else {
            Err(CompileError::UnresolvedPlaceholder {
                placeholder: placeholder.to_owned(),
            })
        }
    }

    pub(crate) fn attribute_behind(&self, placeholder: &str) -> Option<&str> {
        self.scope.resolve_name(placeholder).or_else(|| {
            self.names
                .iter()
                .find(|(p, _)| p == placeholder)
                .map(|(_, attribute)| attribute.as_str())
        })
    }

    pub(crate) fn finish(self, expression: String) -> PendingClause {
        PendingClause {
            expression,
            name_base: self.scope.next_name,
            value_base: self.scope.next_value,
            names: self.names,
            values: self.values,
        }
    }
}

/// A translated clause whose value bindings may still wait on async hooks.
#[derive(Debug)]
pub(crate) struct PendingClause {
    expression: String,
    name_base: usize,
    value_base: usize,
    names: Vec<(String, String)>,
    values: Vec<(String, Binding)>,
}

impl PendingClause {
    /// Resolve on the synchronous path, where a deferred transform is an error.
    pub(crate) fn resolve_sync(self) -> CompileResult<ResolvedClause> {
        let values = self
            .values
            .into_iter()
            .map(|(placeholder, binding)| match binding {
                Binding::Ready(value) => Ok((placeholder, value)),
                Binding::Deferred(deferred) => Err(CompileError::TransformFailure {
                    field: deferred.field().to_owned(),
                    source: TransformError::AsyncOnSyncPath(deferred.hook_id().to_owned()),
                }),
            })
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(ResolvedClause {
            expression: self.expression,
            name_base: self.name_base,
            value_base: self.value_base,
            names: self.names,
            values,
        })
    }

    /// Run every deferred transform concurrently and bind the results in
    /// allocation order. Cancellation abandons the whole batch.
    pub(crate) async fn resolve(self, cancel: &CancellationToken) -> CompileResult<ResolvedClause> {
        if cancel.is_cancelled() {
            return Err(CompileError::Cancelled);
        }

        let mut slots = Vec::with_capacity(self.values.len());
        let mut waiting = Vec::new();
        let mut pending = Vec::new();
        for (index, (placeholder, binding)) in self.values.into_iter().enumerate() {
            match binding {
                Binding::Ready(value) => slots.push((placeholder, Some(value))),
                Binding::Deferred(deferred) => {
                    slots.push((placeholder, None));
                    waiting.push(index);
                    pending.push(deferred.resolve());
                }
            }
        }

        if !pending.is_empty() {
            debug!(transforms = pending.len(), "resolving deferred transforms");
            let resolved = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CompileError::Cancelled),
                result = try_join_all(pending) => result?,
            };
            for (index, value) in waiting.into_iter().zip(resolved) {
                slots[index].1 = Some(value);
            }
        }

        Ok(ResolvedClause {
            expression: self.expression,
            name_base: self.name_base,
            value_base: self.value_base,
            names: self.names,
            values: slots
                .into_iter()
                .filter_map(|(placeholder, value)| value.map(|v| (placeholder, v)))
                .collect(),
        })
    }
}

/// A clause with every value ready, waiting to be committed.
#[derive(Debug)]
pub(crate) struct ResolvedClause {
    expression: String,
    name_base: usize,
    value_base: usize,
    names: Vec<(String, String)>,
    values: Vec<(String, AttributeValue)>,
}

/// Output of one clause translation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedClause {
    /// The wire expression.
    pub expression: String,
    /// Name placeholders this clause minted, in allocation order.
    pub names: Vec<(String, String)>,
    /// Value placeholders this clause minted, in allocation order.
    pub values: Vec<(String, AttributeValue)>,
}
