//! Native value ⇄ wire value conversion.
//!
//! The [`Codec`] turns a [`Value`] into the [`AttributeValue`] that is bound
//! to a `:pN` placeholder, applying the property's format and transform hook,
//! and decodes wire values back into native values.

mod number;
mod temporal;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use dynexpr_model::{AttributeValue, PropertyDescriptor};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use self::number::NumericFormat;
use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult, TransformError};
use crate::transform::{
    Binding, DeferredTransform, TransformContext, TransformHook, TransformRegistry, decode_payload,
    encode_payload,
};
use crate::value::{Value, ValueKind};

/// Converts values between their native and wire forms.
#[derive(Debug, Clone, Copy)]
pub struct Codec<'a> {
    config: &'a CompilerConfig,
    transforms: &'a TransformRegistry,
}

impl<'a> Codec<'a> {
    /// Create a codec reading formats from `config` and hooks from `transforms`.
    #[must_use]
    pub fn new(config: &'a CompilerConfig, transforms: &'a TransformRegistry) -> Self {
        Self { config, transforms }
    }

    /// Convert `value` to its wire form, running a synchronous transform hook
    /// if the descriptor names one.
    ///
    /// An asynchronous hook fails with [`TransformError::AsyncOnSyncPath`].
    pub fn to_wire(
        &self,
        value: &Value,
        descriptor: &PropertyDescriptor,
    ) -> CompileResult<AttributeValue> {
        match self.to_binding(value, descriptor, None, &CancellationToken::new())? {
            Binding::Ready(wire) => Ok(wire),
            Binding::Deferred(deferred) => Err(CompileError::TransformFailure {
                field: deferred.field().to_owned(),
                source: TransformError::AsyncOnSyncPath(deferred.hook_id().to_owned()),
            }),
        }
    }

    /// Convert `value` to a binding. Asynchronous hooks are captured as a
    /// [`DeferredTransform`] instead of being awaited.
    pub fn to_binding(
        &self,
        value: &Value,
        descriptor: &PropertyDescriptor,
        entity: Option<&str>,
        cancel: &CancellationToken,
    ) -> CompileResult<Binding> {
        let field = descriptor.attribute_name.as_str();
        let wire = self.encode(value, field, descriptor.format.as_deref())?;
        let Some(hook_id) = descriptor.value_transform.as_deref() else {
            return Ok(Binding::Ready(wire));
        };

        let hook = self.hook(hook_id, field)?;
        let payload = encode_payload(&wire).map_err(|source| transform_failure(field, source))?;
        let ctx = TransformContext {
            field: field.to_owned(),
            entity: entity.map(ToOwned::to_owned),
            cancellation: cancel.clone(),
        };
        trace!(field, hook = hook_id, "applying value transform");
        match hook {
            TransformHook::Sync(hook) => hook
                .transform(payload, &ctx)
                .map(|output| Binding::Ready(AttributeValue::B(output)))
                .map_err(|source| transform_failure(field, source)),
            TransformHook::Async(hook) => Ok(Binding::Deferred(DeferredTransform::new(
                hook_id.to_owned(),
                Arc::clone(hook),
                payload,
                ctx,
            ))),
        }
    }

    /// Decode a wire value into `kind`, running the inverse of a synchronous
    /// transform hook first if the descriptor names one.
    pub fn from_wire(
        &self,
        wire: &AttributeValue,
        kind: ValueKind,
        descriptor: &PropertyDescriptor,
    ) -> CompileResult<Value> {
        let field = descriptor.attribute_name.as_str();
        let Some(hook_id) = descriptor.value_transform.as_deref() else {
            return self.decode(wire, kind, field, descriptor.format.as_deref());
        };

        let ctx = TransformContext {
            field: field.to_owned(),
            entity: None,
            cancellation: CancellationToken::new(),
        };
        let payload = sealed_payload(wire, field)?;
        let plain = match self.hook(hook_id, field)? {
            TransformHook::Sync(hook) => hook
                .inverse(payload, &ctx)
                .map_err(|source| transform_failure(field, source))?,
            TransformHook::Async(_) => {
                return Err(transform_failure(
                    field,
                    TransformError::AsyncOnSyncPath(hook_id.to_owned()),
                ));
            }
        };
        self.decode_plain(&plain, kind, descriptor)
    }

    /// Async counterpart of [`Codec::from_wire`] that also accepts
    /// asynchronous hooks. Returns [`CompileError::Cancelled`] when `cancel`
    /// fires before the hook completes.
    pub async fn from_wire_async(
        &self,
        wire: &AttributeValue,
        kind: ValueKind,
        descriptor: &PropertyDescriptor,
        cancel: &CancellationToken,
    ) -> CompileResult<Value> {
        let field = descriptor.attribute_name.as_str();
        let Some(hook_id) = descriptor.value_transform.as_deref() else {
            return self.decode(wire, kind, field, descriptor.format.as_deref());
        };

        let ctx = TransformContext {
            field: field.to_owned(),
            entity: None,
            cancellation: cancel.clone(),
        };
        let payload = sealed_payload(wire, field)?;
        let plain = match self.hook(hook_id, field)? {
            TransformHook::Sync(hook) => hook.inverse(payload, &ctx),
            TransformHook::Async(hook) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(CompileError::Cancelled),
                    result = hook.inverse(payload, &ctx) => result,
                }
            }
        }
        .map_err(|source| transform_failure(field, source))?;
        self.decode_plain(&plain, kind, descriptor)
    }

    fn hook(&self, hook_id: &str, field: &str) -> CompileResult<&'a TransformHook> {
        self.transforms
            .get(hook_id)
            .ok_or_else(|| transform_failure(field, TransformError::UnknownHook(hook_id.to_owned())))
    }

    fn decode_plain(
        &self,
        plain: &[u8],
        kind: ValueKind,
        descriptor: &PropertyDescriptor,
    ) -> CompileResult<Value> {
        let field = descriptor.attribute_name.as_str();
        let inner = decode_payload(plain).map_err(|source| transform_failure(field, source))?;
        self.decode(&inner, kind, field, descriptor.format.as_deref())
    }

    fn temporal_format<'f>(&'f self, format: Option<&'f str>) -> Option<&'f str> {
        format.or(self.config.default_date_format.as_deref())
    }

    fn encode(
        &self,
        value: &Value,
        field: &str,
        format: Option<&str>,
    ) -> CompileResult<AttributeValue> {
        let wire = match value {
            Value::Null => AttributeValue::Null(true),
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::String(s) => AttributeValue::S(s.clone()),
            Value::Integer(n) => match numeric_format(format, field)? {
                Some(fmt) => render_formatted(fmt, Decimal::from(*n), field)?,
                None => AttributeValue::N(n.to_string()),
            },
            Value::Decimal(d) => match numeric_format(format, field)? {
                Some(fmt) => render_formatted(fmt, *d, field)?,
                None => AttributeValue::N(d.to_string()),
            },
            Value::Float(f) => {
                let text = number::canonical_float(*f).ok_or_else(|| {
                    CompileError::invalid_value(field, format!("{f} has no wire representation"))
                })?;
                match numeric_format(format, field)? {
                    Some(fmt) => {
                        let decimal = number::parse_decimal(&text).ok_or_else(|| {
                            CompileError::invalid_value(field, format!("{f} exceeds decimal range"))
                        })?;
                        render_formatted(fmt, decimal, field)?
                    }
                    None => AttributeValue::N(text),
                }
            }
            Value::Binary(b) => AttributeValue::B(b.clone()),
            Value::Timestamp(ts) => {
                temporal::timestamp_to_wire(ts, self.temporal_format(format))
                    .map_err(|reason| CompileError::invalid_value(field, reason))?
            }
            Value::Date(date) => temporal::date_to_wire(*date, self.temporal_format(format))
                .map_err(|reason| CompileError::invalid_value(field, reason))?,
            Value::StringSet(items) => {
                AttributeValue::string_set(dedupe(items.iter().cloned(), |s| s.clone()))
                    .map_err(|_| empty_collection(field, "SS"))?
            }
            Value::NumberSet(items) => AttributeValue::number_set(
                dedupe(items.iter().copied(), Decimal::normalize)
                    .into_iter()
                    .map(|d| d.to_string())
                    .collect(),
            )
            .map_err(|_| empty_collection(field, "NS"))?,
            Value::BinarySet(items) => {
                AttributeValue::binary_set(dedupe(items.iter().cloned(), Bytes::clone))
                    .map_err(|_| empty_collection(field, "BS"))?
            }
            Value::List(items) => {
                let converted = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.encode(item, &format!("{field}[{i}]"), format))
                    .collect::<CompileResult<Vec<_>>>()?;
                AttributeValue::list(converted).map_err(|_| empty_collection(field, "L"))?
            }
            Value::Map(entries) => {
                let converted = entries
                    .iter()
                    .map(|(key, item)| {
                        self.encode(item, &format!("{field}.{key}"), format)
                            .map(|wire| (key.clone(), wire))
                    })
                    .collect::<CompileResult<HashMap<_, _>>>()?;
                AttributeValue::map(converted).map_err(|_| empty_collection(field, "M"))?
            }
        };
        Ok(wire)
    }

    fn decode(
        &self,
        wire: &AttributeValue,
        kind: ValueKind,
        field: &str,
        format: Option<&str>,
    ) -> CompileResult<Value> {
        if wire.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = || CompileError::TypeMismatch {
            field: field.to_owned(),
            expected: kind.as_str(),
            found: wire.type_descriptor(),
        };
        let value = match (kind, wire) {
            (ValueKind::Null, _) => return Err(mismatch()),
            (ValueKind::Bool, AttributeValue::Bool(b)) => Value::Bool(*b),
            (ValueKind::String, AttributeValue::S(s)) => Value::String(s.clone()),
            (ValueKind::Binary, AttributeValue::B(b)) => Value::Binary(b.clone()),
            (ValueKind::Integer | ValueKind::Decimal | ValueKind::Float, wire) => {
                let text = number_text(wire, format).ok_or_else(mismatch)?;
                decode_number(kind, text, field)?
            }
            (ValueKind::Timestamp, AttributeValue::S(_) | AttributeValue::N(_)) => {
                temporal::timestamp_from_wire(wire, self.temporal_format(format))
                    .map(Value::Timestamp)
                    .map_err(|reason| CompileError::invalid_value(field, reason))?
            }
            (ValueKind::Date, AttributeValue::S(_) | AttributeValue::N(_)) => {
                temporal::date_from_wire(wire, self.temporal_format(format))
                    .map(Value::Date)
                    .map_err(|reason| CompileError::invalid_value(field, reason))?
            }
            (ValueKind::StringSet, AttributeValue::Ss(items)) => Value::StringSet(items.clone()),
            (ValueKind::NumberSet, AttributeValue::Ns(items)) => Value::NumberSet(
                items
                    .iter()
                    .map(|n| {
                        number::parse_decimal(n).ok_or_else(|| {
                            CompileError::invalid_value(field, format!("'{n}' is not a number"))
                        })
                    })
                    .collect::<CompileResult<_>>()?,
            ),
            (ValueKind::BinarySet, AttributeValue::Bs(items)) => Value::BinarySet(items.clone()),
            (ValueKind::List, AttributeValue::L(items)) => Value::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.decode(item, natural_kind(item), &format!("{field}[{i}]"), None)
                    })
                    .collect::<CompileResult<_>>()?,
            ),
            (ValueKind::Map, AttributeValue::M(entries)) => Value::Map(
                entries
                    .iter()
                    .map(|(key, item)| {
                        self.decode(item, natural_kind(item), &format!("{field}.{key}"), None)
                            .map(|value| (key.clone(), value))
                    })
                    .collect::<CompileResult<BTreeMap<_, _>>>()?,
            ),
            _ => return Err(mismatch()),
        };
        Ok(value)
    }
}

fn transform_failure(field: &str, source: TransformError) -> CompileError {
    CompileError::TransformFailure {
        field: field.to_owned(),
        source,
    }
}

fn empty_collection(field: &str, collection: &'static str) -> CompileError {
    CompileError::EmptyCollectionValue {
        field: field.to_owned(),
        collection,
    }
}

/// Transformed values are always bound as binaries.
fn sealed_payload(wire: &AttributeValue, field: &str) -> CompileResult<Bytes> {
    wire.as_b().cloned().ok_or_else(|| CompileError::TypeMismatch {
        field: field.to_owned(),
        expected: "binary",
        found: wire.type_descriptor(),
    })
}

fn numeric_format(format: Option<&str>, field: &str) -> CompileResult<Option<NumericFormat>> {
    match format {
        None => Ok(None),
        Some(f) => NumericFormat::parse(f).map(Some).ok_or_else(|| {
            CompileError::invalid_value(field, format!("'{f}' is not a numeric format"))
        }),
    }
}

fn render_formatted(
    format: NumericFormat,
    value: Decimal,
    field: &str,
) -> CompileResult<AttributeValue> {
    format
        .render(value)
        .map(AttributeValue::S)
        .map_err(|reason| CompileError::invalid_value(field, reason))
}

/// Number text from a wire value: `N` always, `S` only when the property
/// declares a numeric format.
fn number_text<'w>(wire: &'w AttributeValue, format: Option<&str>) -> Option<&'w str> {
    match wire {
        AttributeValue::N(n) => Some(n),
        AttributeValue::S(s) if format.and_then(NumericFormat::parse).is_some() => Some(s),
        _ => None,
    }
}

fn decode_number(kind: ValueKind, text: &str, field: &str) -> CompileResult<Value> {
    let invalid = || CompileError::invalid_value(field, format!("'{text}' is not a valid {kind}"));
    match kind {
        ValueKind::Integer => number::parse_integer(text)
            .map(Value::Integer)
            .ok_or_else(invalid),
        ValueKind::Float => text
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float)
            .ok_or_else(invalid),
        _ => number::parse_decimal(text)
            .map(Value::Decimal)
            .ok_or_else(invalid),
    }
}

/// The native kind a nested wire value decodes to when no target is given.
fn natural_kind(wire: &AttributeValue) -> ValueKind {
    match wire {
        AttributeValue::S(_) => ValueKind::String,
        AttributeValue::N(n) if n.parse::<i64>().is_ok() => ValueKind::Integer,
        AttributeValue::N(_) => ValueKind::Decimal,
        AttributeValue::B(_) => ValueKind::Binary,
        AttributeValue::Ss(_) => ValueKind::StringSet,
        AttributeValue::Ns(_) => ValueKind::NumberSet,
        AttributeValue::Bs(_) => ValueKind::BinarySet,
        AttributeValue::Bool(_) => ValueKind::Bool,
        AttributeValue::Null(_) => ValueKind::Null,
        AttributeValue::L(_) => ValueKind::List,
        AttributeValue::M(_) => ValueKind::Map,
    }
}

/// Drop repeated members, keeping the first occurrence.
fn dedupe<T, K, I, F>(items: I, key: F) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::transform::{AsyncValueTransform, ValueTransform};

    #[derive(Debug)]
    struct Xor;

    impl ValueTransform for Xor {
        fn transform(&self, input: Bytes, _ctx: &TransformContext) -> Result<Bytes, TransformError> {
            Ok(input.iter().map(|b| b ^ 0x5a).collect::<Vec<_>>().into())
        }

        fn inverse(&self, input: Bytes, ctx: &TransformContext) -> Result<Bytes, TransformError> {
            self.transform(input, ctx)
        }
    }

    #[derive(Debug)]
    struct SlowXor;

    #[async_trait::async_trait]
    impl AsyncValueTransform for SlowXor {
        async fn transform(
            &self,
            input: Bytes,
            ctx: &TransformContext,
        ) -> Result<Bytes, TransformError> {
            Xor.transform(input, ctx)
        }

        async fn inverse(
            &self,
            input: Bytes,
            ctx: &TransformContext,
        ) -> Result<Bytes, TransformError> {
            Xor.inverse(input, ctx)
        }
    }

    fn registry() -> TransformRegistry {
        let mut registry = TransformRegistry::new();
        registry.register_sync("xor", Arc::new(Xor));
        registry.register_async("kms", Arc::new(SlowXor));
        registry
    }

    fn roundtrip(codec: &Codec<'_>, value: Value, descriptor: &PropertyDescriptor) -> Value {
        let wire = codec.to_wire(&value, descriptor).unwrap();
        codec.from_wire(&wire, value.kind(), descriptor).unwrap()
    }

    #[test]
    fn test_should_encode_scalars() {
        let config = CompilerConfig::default();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("f");

        assert_eq!(
            codec.to_wire(&Value::from("x"), &d).unwrap(),
            AttributeValue::S("x".to_owned())
        );
        assert_eq!(
            codec.to_wire(&Value::from(-18), &d).unwrap(),
            AttributeValue::N("-18".to_owned())
        );
        assert_eq!(
            codec.to_wire(&Value::Decimal(Decimal::new(150, 2)), &d).unwrap(),
            AttributeValue::N("1.50".to_owned())
        );
        assert_eq!(
            codec.to_wire(&Value::Float(2.5e-3), &d).unwrap(),
            AttributeValue::N("0.0025".to_owned())
        );
        assert_eq!(
            codec.to_wire(&Value::Null, &d).unwrap(),
            AttributeValue::Null(true)
        );
    }

    #[test]
    fn test_should_roundtrip_scalars() {
        let config = CompilerConfig::default();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("f");
        let instant = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        for value in [
            Value::Bool(true),
            Value::from("hello"),
            Value::Integer(i64::MIN),
            Value::Integer(i64::MAX),
            Value::Decimal(Decimal::new(-123_456_789, 4)),
            Value::Float(0.1),
            Value::Float(-1.0e300),
            Value::Binary(Bytes::from_static(b"\x00\xff")),
            Value::Timestamp(instant),
            Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()),
        ] {
            assert_eq!(roundtrip(&codec, value.clone(), &d), value);
        }
    }

    #[test]
    fn test_should_reject_non_finite_float() {
        let config = CompilerConfig::default();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let err = codec
            .to_wire(&Value::Float(f64::NAN), &PropertyDescriptor::new("score"))
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { ref field, .. } if field == "score"));
    }

    #[test]
    fn test_should_apply_numeric_format() {
        let config = CompilerConfig::default();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("rank").with_format("D5");

        let wire = codec.to_wire(&Value::from(42), &d).unwrap();
        assert_eq!(wire, AttributeValue::S("00042".to_owned()));
        assert_eq!(
            codec.from_wire(&wire, ValueKind::Integer, &d).unwrap(),
            Value::Integer(42)
        );

        let d = PropertyDescriptor::new("rank").with_format("%Y");
        let err = codec.to_wire(&Value::from(42), &d).unwrap_err();
        assert!(matches!(err, CompileError::InvalidValue { .. }));
    }

    #[test]
    fn test_should_apply_date_formats() {
        let config = CompilerConfig::builder()
            .default_date_format("epoch".into())
            .build();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();

        let wire = codec
            .to_wire(&Value::Timestamp(instant), &PropertyDescriptor::new("at"))
            .unwrap();
        assert_eq!(wire, AttributeValue::N("1705276800".to_owned()));

        let d = PropertyDescriptor::new("at").with_format("%Y%m%d");
        let wire = codec.to_wire(&Value::Timestamp(instant), &d).unwrap();
        assert_eq!(wire, AttributeValue::S("20240115".to_owned()));
        assert_eq!(
            codec.from_wire(&wire, ValueKind::Timestamp, &d).unwrap(),
            Value::Timestamp(instant)
        );
    }

    #[test]
    fn test_should_apply_default_date_format_to_dates() {
        let config = CompilerConfig::builder()
            .default_date_format("%d/%m/%Y".into())
            .build();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let day = Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let plain = PropertyDescriptor::new("day");

        let wire = codec.to_wire(&day, &plain).unwrap();
        assert_eq!(wire, AttributeValue::S("29/02/2024".to_owned()));
        assert_eq!(codec.from_wire(&wire, ValueKind::Date, &plain).unwrap(), day);

        let iso = PropertyDescriptor::new("day").with_format("%Y-%m-%d");
        let wire = codec.to_wire(&day, &iso).unwrap();
        assert_eq!(wire, AttributeValue::S("2024-02-29".to_owned()));
        assert_eq!(codec.from_wire(&wire, ValueKind::Date, &iso).unwrap(), day);
    }

    #[test]
    fn test_should_dedupe_sets_in_first_seen_order() {
        let config = CompilerConfig::default();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("tags");

        assert_eq!(
            codec
                .to_wire(&Value::string_set(["b", "a", "b"]), &d)
                .unwrap(),
            AttributeValue::Ss(vec!["b".to_owned(), "a".to_owned()])
        );
        assert_eq!(
            codec
                .to_wire(
                    &Value::NumberSet(vec![Decimal::new(10, 1), Decimal::from(1), Decimal::from(2)]),
                    &d
                )
                .unwrap(),
            AttributeValue::Ns(vec!["1.0".to_owned(), "2".to_owned()])
        );
    }

    #[test]
    fn test_should_reject_empty_collections() {
        let config = CompilerConfig::default();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("tags");

        let err = codec.to_wire(&Value::StringSet(vec![]), &d).unwrap_err();
        assert!(matches!(
            err,
            CompileError::EmptyCollectionValue { ref field, collection: "SS" } if field == "tags"
        ));

        let nested = Value::List(vec![
            Value::from(1),
            Value::Map(BTreeMap::from([("lines".to_owned(), Value::List(vec![]))])),
        ]);
        let err = codec.to_wire(&nested, &d).unwrap_err();
        assert!(matches!(
            err,
            CompileError::EmptyCollectionValue { ref field, collection: "L" } if field == "tags[1].lines"
        ));
    }

    #[test]
    fn test_should_roundtrip_nested_collections() {
        let config = CompilerConfig::default();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let value = Value::Map(BTreeMap::from([
            ("count".to_owned(), Value::from(3)),
            ("ratio".to_owned(), Value::Decimal(Decimal::new(25, 2))),
            ("names".to_owned(), Value::List(vec![Value::from("a"), Value::Bool(false)])),
        ]));
        assert_eq!(
            roundtrip(&codec, value.clone(), &PropertyDescriptor::new("doc")),
            value
        );
    }

    #[test]
    fn test_should_report_type_mismatch() {
        let config = CompilerConfig::default();
        let transforms = TransformRegistry::new();
        let codec = Codec::new(&config, &transforms);
        let err = codec
            .from_wire(
                &AttributeValue::S("x".to_owned()),
                ValueKind::Integer,
                &PropertyDescriptor::new("age"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::TypeMismatch { expected: "integer", found: "S", .. }
        ));
    }

    #[test]
    fn test_should_run_sync_transform_both_ways() {
        let config = CompilerConfig::default();
        let transforms = registry();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("ssn").with_value_transform("xor");

        let wire = codec.to_wire(&Value::from("123-45-6789"), &d).unwrap();
        assert_eq!(wire.type_descriptor(), "B");
        assert_eq!(
            codec.from_wire(&wire, ValueKind::String, &d).unwrap(),
            Value::from("123-45-6789")
        );
    }

    #[test]
    fn test_should_reject_async_hook_on_sync_path() {
        let config = CompilerConfig::default();
        let transforms = registry();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("ssn").with_value_transform("kms");

        let err = codec.to_wire(&Value::from("x"), &d).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TransformFailure {
                source: TransformError::AsyncOnSyncPath(_),
                ..
            }
        ));
    }

    #[test]
    fn test_should_reject_unknown_hook() {
        let config = CompilerConfig::default();
        let transforms = registry();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("ssn").with_value_transform("missing");

        let err = codec.to_wire(&Value::from("x"), &d).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TransformFailure {
                source: TransformError::UnknownHook(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_should_defer_and_resolve_async_transform() {
        let config = CompilerConfig::default();
        let transforms = registry();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("ssn").with_value_transform("kms");
        let cancel = CancellationToken::new();

        let binding = codec
            .to_binding(&Value::from("secret"), &d, Some("User"), &cancel)
            .unwrap();
        let Binding::Deferred(deferred) = binding else {
            panic!("expected a deferred binding");
        };
        let wire = deferred.resolve().await.unwrap();
        let decoded = codec
            .from_wire_async(&wire, ValueKind::String, &d, &cancel)
            .await
            .unwrap();
        assert_eq!(decoded, Value::from("secret"));
    }

    #[tokio::test]
    async fn test_should_cancel_async_inverse() {
        let config = CompilerConfig::default();
        let transforms = registry();
        let codec = Codec::new(&config, &transforms);
        let d = PropertyDescriptor::new("ssn").with_value_transform("kms");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let wire = AttributeValue::B(Bytes::from_static(b"sealed"));
        let err = codec
            .from_wire_async(&wire, ValueKind::String, &d, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Cancelled));
    }
}
