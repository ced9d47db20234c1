//! Compiled request output handed to the transport layer.
//!
//! Field naming follows the DynamoDB `awsJson1_0` request shape so the record
//! can be merged straight into a `Query`, `Scan`, `UpdateItem`, `PutItem` or
//! `DeleteItem` payload.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

/// The clause slots of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClauseKind {
    /// `KeyConditionExpression` of a `Query`.
    KeyCondition,
    /// `FilterExpression` of a `Query` or `Scan`.
    Filter,
    /// `ConditionExpression` of a write or condition check.
    Condition,
    /// `UpdateExpression` of an `UpdateItem`.
    Update,
    /// `ProjectionExpression` of a read.
    Projection,
}

impl ClauseKind {
    /// Returns the request field name carrying this clause.
    #[must_use]
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::KeyCondition => "KeyConditionExpression",
            Self::Filter => "FilterExpression",
            Self::Condition => "ConditionExpression",
            Self::Update => "UpdateExpression",
            Self::Projection => "ProjectionExpression",
        }
    }

    /// Whether two clauses of this kind can be merged with `AND`.
    #[must_use]
    pub fn is_conjunctive(&self) -> bool {
        matches!(self, Self::KeyCondition | Self::Filter | Self::Condition)
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Every expression and placeholder map produced for one logical request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompiledRequest {
    /// Key condition of a `Query`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,

    /// Filter applied after the key condition or scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,

    /// Condition guarding a write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,

    /// Update actions of an `UpdateItem`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_expression: Option<String>,

    /// Attributes to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_expression: Option<String>,

    /// Name placeholders (`#attr0` -> wire attribute name).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_names: HashMap<String, String>,

    /// Value placeholders (`:p0` -> wire value).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,
}

impl CompiledRequest {
    /// Returns the expression compiled for `kind`, if any.
    #[must_use]
    pub fn expression(&self, kind: ClauseKind) -> Option<&str> {
        match kind {
            ClauseKind::KeyCondition => self.key_condition_expression.as_deref(),
            ClauseKind::Filter => self.filter_expression.as_deref(),
            ClauseKind::Condition => self.condition_expression.as_deref(),
            ClauseKind::Update => self.update_expression.as_deref(),
            ClauseKind::Projection => self.projection_expression.as_deref(),
        }
    }

    /// Mutable slot for the expression of `kind`.
    pub fn expression_mut(&mut self, kind: ClauseKind) -> &mut Option<String> {
        match kind {
            ClauseKind::KeyCondition => &mut self.key_condition_expression,
            ClauseKind::Filter => &mut self.filter_expression,
            ClauseKind::Condition => &mut self.condition_expression,
            ClauseKind::Update => &mut self.update_expression,
            ClauseKind::Projection => &mut self.projection_expression,
        }
    }
}
