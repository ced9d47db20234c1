//! Per-property metadata consumed by the compiler.

use serde::{Deserialize, Serialize};

/// How one logical property of an entity maps onto the wire.
///
/// Descriptors are supplied by the surrounding system (hand-written or
/// generated) and are read-only to the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    /// Logical property name used by callers (`createdAt`).
    pub name: String,
    /// Attribute name stored on the wire (`created_at`).
    pub attribute_name: String,
    /// Serialization format for dates and numbers (`%Y-%m-%d`, `F2`, `epoch`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Identifier of the value-transform hook applied before binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_transform: Option<String>,
}

impl PropertyDescriptor {
    /// Create a descriptor whose wire attribute name equals the logical name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            attribute_name: name.clone(),
            name,
            format: None,
            value_transform: None,
        }
    }

    /// Store the property under a different wire attribute name.
    #[must_use]
    pub fn with_attribute_name(mut self, attribute_name: impl Into<String>) -> Self {
        self.attribute_name = attribute_name.into();
        self
    }

    /// Serialize values of this property with `format`.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Run values of this property through the transform hook registered as `hook`.
    #[must_use]
    pub fn with_value_transform(mut self, hook: impl Into<String>) -> Self {
        self.value_transform = Some(hook.into());
        self
    }

    /// A copy of this descriptor with its format replaced by `format`.
    #[must_use]
    pub fn overriding_format(&self, format: &str) -> Self {
        let mut descriptor = self.clone();
        descriptor.format = Some(format.to_owned());
        descriptor
    }
}
