//! Wire-level `AttributeValue` with the DynamoDB JSON encoding.
//!
//! `AttributeValue` is a tagged union where exactly one variant is present.
//! The JSON wire format uses single-key objects like `{"S": "hello"}`.
//!
//! Sets, lists and maps are never empty on the wire. Values built through the
//! checked constructors ([`AttributeValue::string_set`] and friends) or
//! decoded from JSON uphold that; [`AttributeValue::find_empty_collection`]
//! reports the first violation for values built by hand.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// DynamoDB attribute value.
///
/// Numbers are always string-encoded to preserve arbitrary precision.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Number value (string-encoded for arbitrary precision).
    N(String),
    /// Binary value (base64-encoded in JSON).
    B(bytes::Bytes),
    /// String Set.
    Ss(Vec<String>),
    /// Number Set (string-encoded).
    Ns(Vec<String>),
    /// Binary Set (base64-encoded in JSON).
    Bs(Vec<bytes::Bytes>),
    /// Boolean value.
    Bool(bool),
    /// Null value.
    Null(bool),
    /// List of attribute values.
    L(Vec<AttributeValue>),
    /// Map of attribute values.
    M(HashMap<String, AttributeValue>),
}

/// The first empty collection found inside a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyCollection {
    /// Path to the offending collection, relative to the inspected value
    /// (empty for the value itself, `tags[2]` or `address.lines` when nested).
    pub path: String,
    /// Type descriptor of the collection (`SS`, `L`, `M`, ...).
    pub collection: &'static str,
}

impl AttributeValue {
    /// Build a string set, rejecting an empty input.
    pub fn string_set(values: Vec<String>) -> Result<Self, EmptyCollection> {
        non_empty(values, "SS").map(Self::Ss)
    }

    /// Build a number set from canonical number strings, rejecting an empty input.
    pub fn number_set(values: Vec<String>) -> Result<Self, EmptyCollection> {
        non_empty(values, "NS").map(Self::Ns)
    }

    /// Build a binary set, rejecting an empty input.
    pub fn binary_set(values: Vec<bytes::Bytes>) -> Result<Self, EmptyCollection> {
        non_empty(values, "BS").map(Self::Bs)
    }

    /// Build a list, rejecting an empty input.
    pub fn list(values: Vec<AttributeValue>) -> Result<Self, EmptyCollection> {
        non_empty(values, "L").map(Self::L)
    }

    /// Build a map, rejecting an empty input.
    pub fn map(values: HashMap<String, AttributeValue>) -> Result<Self, EmptyCollection> {
        if values.is_empty() {
            return Err(EmptyCollection {
                path: String::new(),
                collection: "M",
            });
        }
        Ok(Self::M(values))
    }

    /// Returns `true` if this is a null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(true))
    }

    /// Returns the bytes if this is a `B` variant.
    #[must_use]
    pub fn as_b(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::B(b) => Some(b),
            _ => None,
        }
    }

    /// The wire type tag: `S`, `N`, `BOOL`, `SS`, ...
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }

    /// Returns `true` if `descriptor` names one of the ten wire types.
    #[must_use]
    pub fn is_type_descriptor(descriptor: &str) -> bool {
        TYPE_DESCRIPTORS.contains(&descriptor)
    }

    /// Walk the value and report the first empty set, list or map.
    ///
    /// Map entries are visited in key order so the reported path is stable.
    #[must_use]
    pub fn find_empty_collection(&self) -> Option<EmptyCollection> {
        let empty = |collection| {
            Some(EmptyCollection {
                path: String::new(),
                collection,
            })
        };
        match self {
            Self::Ss(v) | Self::Ns(v) if v.is_empty() => empty(self.type_descriptor()),
            Self::Bs(v) if v.is_empty() => empty("BS"),
            Self::L(v) if v.is_empty() => empty("L"),
            Self::M(m) if m.is_empty() => empty("M"),
            Self::L(v) => v.iter().enumerate().find_map(|(i, item)| {
                item.find_empty_collection()
                    .map(|inner| inner.nested(&format!("[{i}]")))
            }),
            Self::M(m) => {
                let mut keys: Vec<_> = m.keys().collect();
                keys.sort();
                keys.into_iter().find_map(|k| {
                    m[k].find_empty_collection()
                        .map(|inner| inner.nested(&format!(".{k}")))
                })
            }
            _ => None,
        }
    }
}

impl EmptyCollection {
    fn nested(mut self, segment: &str) -> Self {
        self.path = format!("{segment}{}", self.path);
        self
    }
}

const TYPE_DESCRIPTORS: [&str; 10] = ["S", "N", "B", "SS", "NS", "BS", "BOOL", "NULL", "L", "M"];

fn non_empty<T>(values: Vec<T>, collection: &'static str) -> Result<Vec<T>, EmptyCollection> {
    if values.is_empty() {
        return Err(EmptyCollection {
            path: String::new(),
            collection,
        });
    }
    Ok(values)
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        let tag = self.type_descriptor();
        match self {
            Self::S(text) | Self::N(text) => map.serialize_entry(tag, text)?,
            Self::Ss(items) | Self::Ns(items) => map.serialize_entry(tag, items)?,
            Self::B(bytes) => map.serialize_entry(tag, &BASE64.encode(bytes))?,
            Self::Bs(items) => {
                let encoded: Vec<String> = items.iter().map(|b| BASE64.encode(b)).collect();
                map.serialize_entry(tag, &encoded)?;
            }
            Self::Bool(flag) | Self::Null(flag) => map.serialize_entry(tag, flag)?,
            Self::L(items) => map.serialize_entry(tag, items)?,
            Self::M(entries) => map.serialize_entry(tag, entries)?,
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(WireVisitor)
    }
}

const BASE64: base64::engine::GeneralPurpose = base64::engine::general_purpose::STANDARD;

struct WireVisitor;

impl<'de> Visitor<'de> for WireVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a single-key object tagged with a DynamoDB type")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let tag = map
            .next_key::<String>()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let value = read_tagged(&tag, &mut map)?;
        if map.next_key::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::custom(format!(
                "value tagged '{tag}' carries a second type key"
            )));
        }
        match value.find_empty_collection() {
            Some(empty) => Err(de::Error::custom(format!(
                "empty {} at '{}'",
                empty.collection, empty.path
            ))),
            None => Ok(value),
        }
    }
}

fn read_tagged<'de, M: MapAccess<'de>>(tag: &str, map: &mut M) -> Result<AttributeValue, M::Error> {
    let decode = |text: &str| -> Result<bytes::Bytes, M::Error> {
        BASE64
            .decode(text)
            .map(bytes::Bytes::from)
            .map_err(de::Error::custom)
    };
    Ok(match tag {
        "S" => AttributeValue::S(map.next_value()?),
        "N" => AttributeValue::N(map.next_value()?),
        "B" => AttributeValue::B(decode(&map.next_value::<String>()?)?),
        "SS" => AttributeValue::Ss(map.next_value()?),
        "NS" => AttributeValue::Ns(map.next_value()?),
        "BS" => AttributeValue::Bs(
            map.next_value::<Vec<String>>()?
                .iter()
                .map(|text| decode(text))
                .collect::<Result<_, _>>()?,
        ),
        "BOOL" => AttributeValue::Bool(map.next_value()?),
        "NULL" => AttributeValue::Null(map.next_value()?),
        "L" => AttributeValue::L(map.next_value()?),
        "M" => AttributeValue::M(map.next_value()?),
        other => return Err(de::Error::unknown_field(other, &TYPE_DESCRIPTORS)),
    })
}
