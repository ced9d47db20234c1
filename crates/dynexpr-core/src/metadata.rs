//! Entity metadata: logical property name → wire attribute policy.

use std::collections::HashMap;

use dynexpr_model::PropertyDescriptor;
use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// Property descriptors of one entity type, keyed by logical name.
///
/// # Examples
///
/// ```
/// use dynexpr_core::metadata::EntitySchema;
/// use dynexpr_model::PropertyDescriptor;
///
/// let schema = EntitySchema::new("User")
///     .with_property(PropertyDescriptor::new("id").with_attribute_name("pk"));
/// assert_eq!(schema.resolve("id").unwrap().attribute_name, "pk");
/// assert!(schema.resolve("nickname").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    /// Entity type name, used in error messages and transform contexts.
    pub entity: String,
    properties: HashMap<String, PropertyDescriptor>,
}

impl EntitySchema {
    /// Create a schema with no properties.
    #[must_use]
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            properties: HashMap::new(),
        }
    }

    /// Add (or replace) a property.
    #[must_use]
    pub fn with_property(mut self, descriptor: PropertyDescriptor) -> Self {
        self.insert(descriptor);
        self
    }

    /// Add (or replace) a property in place.
    pub fn insert(&mut self, descriptor: PropertyDescriptor) {
        self.properties.insert(descriptor.name.clone(), descriptor);
    }

    /// Look up a property by logical name.
    pub fn resolve(&self, property: &str) -> CompileResult<&PropertyDescriptor> {
        self.properties
            .get(property)
            .ok_or_else(|| CompileError::UnknownProperty {
                entity: self.entity.clone(),
                property: property.to_owned(),
            })
    }

    /// Reverse lookup by wire attribute name.
    #[must_use]
    pub fn resolve_attribute(&self, attribute_name: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .values()
            .find(|d| d.attribute_name == attribute_name)
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the schema defines no property.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Load a schema from JSON:
    /// `{"entity": "User", "properties": {"id": {"name": "id", "attributeName": "pk"}}}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Schemas keyed by entity type.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its entity name, replacing any previous one.
    pub fn register(&mut self, schema: EntitySchema) {
        self.schemas.insert(schema.entity.clone(), schema);
    }

    /// Schema of `entity`, if registered.
    #[must_use]
    pub fn get(&self, entity: &str) -> Option<&EntitySchema> {
        self.schemas.get(entity)
    }

    /// Resolve `entity.property`; both must be known.
    pub fn resolve(&self, entity: &str, property: &str) -> CompileResult<&PropertyDescriptor> {
        self.get(entity)
            .ok_or_else(|| CompileError::UnknownProperty {
                entity: entity.to_owned(),
                property: property.to_owned(),
            })?
            .resolve(property)
    }
}
