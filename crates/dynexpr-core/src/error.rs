//! Error types for expression compilation.
//!
//! Every failure carries its kind plus the offending identifier so callers can
//! branch on [`CompileError::kind`] instead of matching message text. None of
//! these are retried by the compiler: they are raised before a clause commits,
//! so the shared placeholder scope never sees a partial clause.

use dynexpr_model::ClauseKind;

/// Errors raised while translating a clause.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A format-string template could not be parsed.
    #[error("Malformed template at offset {position}: {reason} (template: {template:?})")]
    MalformedTemplate {
        /// The template as supplied by the caller.
        template: String,
        /// Byte offset of the offending token.
        position: usize,
        /// Explanation.
        reason: String,
    },
    /// A predicate referenced a property the entity metadata does not define.
    #[error("Unknown property '{property}' on entity '{entity}'")]
    UnknownProperty {
        /// Entity type whose metadata was consulted.
        entity: String,
        /// The logical property name.
        property: String,
    },
    /// An empty set, list or map was bound as a value.
    #[error("Empty {collection} collection bound to '{field}'")]
    EmptyCollectionValue {
        /// Property (and nested path) holding the empty collection.
        field: String,
        /// Wire type descriptor of the collection (`SS`, `L`, `M`, ...).
        collection: &'static str,
    },
    /// The wire protocol cannot express the requested operation.
    #[error("Unsupported operation {operation}: {reason}")]
    UnsupportedOperation {
        /// The operator, function or clause that was rejected.
        operation: String,
        /// Explanation.
        reason: String,
    },
    /// The value-transform hook failed.
    #[error("Value transform failed for '{field}': {source}")]
    TransformFailure {
        /// Property whose value was being transformed.
        field: String,
        /// The hook's error, unchanged.
        source: TransformError,
    },
    /// A value cannot be represented on the wire, or a wire value cannot be decoded.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Property the value belongs to.
        field: String,
        /// Explanation.
        reason: String,
    },
    /// A wire value does not have the type the caller asked for.
    #[error("Type mismatch for '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Property the value belongs to.
        field: String,
        /// The requested native kind.
        expected: &'static str,
        /// The wire type descriptor that was found.
        found: &'static str,
    },
    /// An operator received the wrong number of operands.
    #[error("Operator {operator} takes {expected} operand(s), got {found}")]
    InvalidOperandCount {
        /// The operator.
        operator: String,
        /// Accepted operand count.
        expected: &'static str,
        /// Supplied operand count.
        found: usize,
    },
    /// A caller-supplied placeholder was never minted in this request.
    #[error("Unresolved placeholder: {placeholder}")]
    UnresolvedPlaceholder {
        /// The placeholder text (`:p7`, `#attr3`).
        placeholder: String,
    },
    /// A non-conjunctive clause was set twice on one request.
    #[error("{clause} is already set on this request")]
    DuplicateClause {
        /// The clause slot.
        clause: ClauseKind,
    },
    /// The translation was cancelled while transforms were pending.
    #[error("Translation cancelled")]
    Cancelled,
}

/// Stable classification of [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CompileErrorKind {
    /// See [`CompileError::MalformedTemplate`].
    MalformedTemplate,
    /// See [`CompileError::UnknownProperty`].
    UnknownProperty,
    /// See [`CompileError::EmptyCollectionValue`].
    EmptyCollectionValue,
    /// See [`CompileError::UnsupportedOperation`].
    UnsupportedOperation,
    /// See [`CompileError::TransformFailure`].
    TransformFailure,
    /// See [`CompileError::InvalidValue`].
    InvalidValue,
    /// See [`CompileError::TypeMismatch`].
    TypeMismatch,
    /// See [`CompileError::InvalidOperandCount`].
    InvalidOperandCount,
    /// See [`CompileError::UnresolvedPlaceholder`].
    UnresolvedPlaceholder,
    /// See [`CompileError::DuplicateClause`].
    DuplicateClause,
    /// See [`CompileError::Cancelled`].
    Cancelled,
}

impl CompileErrorKind {
    /// Returns the short kind string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedTemplate => "MalformedTemplate",
            Self::UnknownProperty => "UnknownProperty",
            Self::EmptyCollectionValue => "EmptyCollectionValue",
            Self::UnsupportedOperation => "UnsupportedOperation",
            Self::TransformFailure => "TransformFailure",
            Self::InvalidValue => "InvalidValue",
            Self::TypeMismatch => "TypeMismatch",
            Self::InvalidOperandCount => "InvalidOperandCount",
            Self::UnresolvedPlaceholder => "UnresolvedPlaceholder",
            Self::DuplicateClause => "DuplicateClause",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl CompileError {
    /// Returns the stable kind of this error.
    #[must_use]
    pub fn kind(&self) -> CompileErrorKind {
        match self {
            Self::MalformedTemplate { .. } => CompileErrorKind::MalformedTemplate,
            Self::UnknownProperty { .. } => CompileErrorKind::UnknownProperty,
            Self::EmptyCollectionValue { .. } => CompileErrorKind::EmptyCollectionValue,
            Self::UnsupportedOperation { .. } => CompileErrorKind::UnsupportedOperation,
            Self::TransformFailure { .. } => CompileErrorKind::TransformFailure,
            Self::InvalidValue { .. } => CompileErrorKind::InvalidValue,
            Self::TypeMismatch { .. } => CompileErrorKind::TypeMismatch,
            Self::InvalidOperandCount { .. } => CompileErrorKind::InvalidOperandCount,
            Self::UnresolvedPlaceholder { .. } => CompileErrorKind::UnresolvedPlaceholder,
            Self::DuplicateClause { .. } => CompileErrorKind::DuplicateClause,
            Self::Cancelled => CompileErrorKind::Cancelled,
        }
    }

    /// Returns the offending identifier: property, field, operator or placeholder.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::MalformedTemplate { template, .. } => Some(template),
            Self::UnknownProperty { property, .. } => Some(property),
            Self::EmptyCollectionValue { field, .. }
            | Self::TransformFailure { field, .. }
            | Self::InvalidValue { field, .. }
            | Self::TypeMismatch { field, .. } => Some(field),
            Self::UnsupportedOperation { operation, .. } => Some(operation),
            Self::InvalidOperandCount { operator, .. } => Some(operator),
            Self::UnresolvedPlaceholder { placeholder } => Some(placeholder),
            Self::DuplicateClause { clause } => Some(clause.field_name()),
            Self::Cancelled => None,
        }
    }

    pub(crate) fn unsupported(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a value-transform hook or while driving one.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The descriptor names a hook that is not registered.
    #[error("No value transform registered as '{0}'")]
    UnknownHook(String),
    /// An asynchronous hook was reached from the synchronous translation path.
    #[error("Value transform '{0}' is asynchronous; use the async translation path")]
    AsyncOnSyncPath(String),
    /// The hook returned bytes that do not decode to a wire value.
    #[error("Malformed transform payload: {0}")]
    MalformedPayload(String),
    /// The hook observed cancellation and gave up.
    #[error("Value transform cancelled")]
    Cancelled,
    /// Failure raised inside the hook (key service unavailable, bad key, ...).
    #[error(transparent)]
    Hook(#[from] anyhow::Error),
}

/// Convenience result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;
