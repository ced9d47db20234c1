//! Placeholder binding for one clause under translation.

use dynexpr_model::PropertyDescriptor;
use tokio_util::sync::CancellationToken;

use super::ast::Operand;
use crate::codec::Codec;
use crate::error::{CompileError, CompileResult};
use crate::scope::{ClauseDraft, PendingClause, PlaceholderScope};
use crate::value::Value;

/// Mints placeholders into a clause draft, converting values through the codec.
#[derive(Debug)]
pub(crate) struct Binder<'a> {
    codec: Codec<'a>,
    entity: Option<&'a str>,
    cancel: CancellationToken,
    draft: ClauseDraft<'a>,
}

impl<'a> Binder<'a> {
    pub(crate) fn new(
        codec: Codec<'a>,
        scope: &'a PlaceholderScope,
        entity: Option<&'a str>,
        cancel: &CancellationToken,
    ) -> Self {
        Self {
            codec,
            entity,
            cancel: cancel.clone(),
            draft: scope.draft(),
        }
    }

    /// Name placeholder for a wire attribute.
    pub(crate) fn name(&mut self, attribute_name: &str) -> String {
        self.draft.name(attribute_name)
    }

    /// Value placeholder for `value`, encoded with `descriptor`'s policy.
    pub(crate) fn value(
        &mut self,
        value: &Value,
        descriptor: &PropertyDescriptor,
    ) -> CompileResult<String> {
        let binding = self
            .codec
            .to_binding(value, descriptor, self.entity, &self.cancel)?;
        Ok(self.draft.value(binding))
    }

    /// Bind a literal operand, or check an explicitly reused value placeholder.
    pub(crate) fn operand(
        &mut self,
        operand: &Operand,
        descriptor: &PropertyDescriptor,
    ) -> CompileResult<String> {
        match operand {
            Operand::Value(value) => self.value(value, descriptor),
            Operand::Placeholder(placeholder) if placeholder.starts_with(':') => {
                self.draft.reuse(placeholder)
            }
            Operand::Placeholder(placeholder) => Err(CompileError::UnresolvedPlaceholder {
                placeholder: placeholder.clone(),
            }),
        }
    }

    /// Check a caller-written `#name` or `:value` token.
    pub(crate) fn reuse(&self, placeholder: &str) -> CompileResult<String> {
        self.draft.reuse(placeholder)
    }

    /// Wire attribute behind a `#name` placeholder, minted earlier or in this clause.
    pub(crate) fn attribute_behind(&self, placeholder: &str) -> Option<&str> {
        self.draft.attribute_behind(placeholder)
    }

    pub(crate) fn finish(self, expression: String) -> PendingClause {
        self.draft.finish(expression)
    }
}
