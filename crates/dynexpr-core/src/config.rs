//! Compiler configuration.
//!
//! Provides [`CompilerConfig`]. Values are loaded from environment variables
//! the same way the service configs are, with defaults that produce the
//! canonical `#attrN` / `:pN` placeholder forms.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Expression compiler configuration.
///
/// # Examples
///
/// ```
/// use dynexpr_core::config::CompilerConfig;
///
/// let config = CompilerConfig::default();
/// assert_eq!(config.name_prefix, "attr");
/// assert_eq!(config.value_prefix, "p");
/// assert!(config.alias_reserved_words);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Prefix of name placeholders (`#attr0`).
    #[builder(default = String::from("attr"))]
    pub name_prefix: String,

    /// Prefix of value placeholders (`:p0`).
    #[builder(default = String::from("p"))]
    pub value_prefix: String,

    /// Whether raw reserved words in format-string templates are aliased to
    /// name placeholders.
    #[builder(default = true)]
    pub alias_reserved_words: bool,

    /// chrono format applied to dates and timestamps whose property declares
    /// no format.
    /// ISO-8601 when unset.
    #[builder(default, setter(strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_date_format: Option<String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            name_prefix: String::from("attr"),
            value_prefix: String::from("p"),
            alias_reserved_words: true,
            default_date_format: None,
        }
    }
}

impl CompilerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DYNEXPR_NAME_PREFIX` | `attr` |
    /// | `DYNEXPR_VALUE_PREFIX` | `p` |
    /// | `DYNEXPR_ALIAS_RESERVED_WORDS` | `true` |
    /// | `DYNEXPR_DATE_FORMAT` | unset |
    ///
    /// Prefixes that do not lex as identifiers are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("DYNEXPR_NAME_PREFIX") {
            if is_placeholder_prefix(&v) {
                config.name_prefix = v;
            }
        }
        if let Some(v) = lookup("DYNEXPR_VALUE_PREFIX") {
            if is_placeholder_prefix(&v) {
                config.value_prefix = v;
            }
        }
        if let Some(v) = lookup("DYNEXPR_ALIAS_RESERVED_WORDS") {
            config.alias_reserved_words = parse_bool(&v);
        }
        if let Some(v) = lookup("DYNEXPR_DATE_FORMAT") {
            if !v.is_empty() {
                config.default_date_format = Some(v);
            }
        }

        config
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Placeholder prefixes must lex as identifiers on the wire.
fn is_placeholder_prefix(value: &str) -> bool {
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
