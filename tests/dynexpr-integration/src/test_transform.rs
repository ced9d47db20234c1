//! Value transforms, async resolution, cancellation and codec round trips.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use chrono::{NaiveDate, TimeZone, Utc};
    use dynexpr_core::{
        CompileError, Compiler, CompilerConfig, Predicate, TransformError, TransformRegistry,
        Update, Value, ValueKind,
    };
    use dynexpr_model::{AttributeValue, ClauseKind, PropertyDescriptor};
    use rust_decimal::Decimal;
    use tokio_util::sync::CancellationToken;

    use crate::{SlowKeyService, compiler, user_schema};

    #[test]
    fn test_should_seal_and_open_with_sync_hook() {
        let compiler = compiler();
        let schema = user_schema();
        let mut scope = compiler.scope();
        let clause = compiler
            .translate_predicate(
                ClauseKind::Filter,
                &Predicate::eq("email", "a@example.com"),
                &schema,
                &mut scope,
            )
            .unwrap();

        let sealed = &clause.values[0].1;
        assert!(matches!(sealed, AttributeValue::B(_)));
        let descriptor = schema.resolve("email").unwrap();
        let opened = compiler
            .codec()
            .from_wire(sealed, ValueKind::String, descriptor)
            .unwrap();
        assert_eq!(opened, Value::from("a@example.com"));
    }

    #[tokio::test]
    async fn test_should_resolve_async_hooks_in_allocation_order() {
        let compiler = compiler();
        let schema = user_schema();
        let mut scope = compiler.scope();
        let cancel = CancellationToken::new();
        let clause = compiler
            .translate_update_async(
                &Update::new().set("ssn", "111").set("status", "OK").set("ssn", "222"),
                &schema,
                &mut scope,
                &cancel,
            )
            .await
            .unwrap();

        assert_eq!(clause.expression, "SET #attr0 = :p0, #attr1 = :p1, #attr2 = :p2");
        let placeholders: Vec<_> = clause.values.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(placeholders, [":p0", ":p1", ":p2"]);
        assert!(matches!(clause.values[0].1, AttributeValue::B(_)));
        assert_eq!(clause.values[1].1, AttributeValue::S("OK".to_owned()));

        let descriptor = schema.resolve("ssn").unwrap();
        let opened = compiler
            .codec()
            .from_wire_async(&clause.values[2].1, ValueKind::String, descriptor, &cancel)
            .await
            .unwrap();
        assert_eq!(opened, Value::from("222"));
    }

    #[tokio::test]
    async fn test_should_cancel_without_touching_scope() {
        let mut transforms = TransformRegistry::new();
        transforms.register_async(
            "kms",
            Arc::new(SlowKeyService {
                delay: Duration::from_secs(30),
            }),
        );
        let compiler = Compiler::new(CompilerConfig::default(), transforms);
        let schema = user_schema();
        let mut scope = compiler.scope();
        compiler
            .translate_predicate(ClauseKind::KeyCondition, &Predicate::eq("pk", "A"), &schema, &mut scope)
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = compiler
            .translate_predicate_async(
                ClauseKind::Filter,
                &Predicate::eq("ssn", "123-45-6789"),
                &schema,
                &mut scope,
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CompileError::Cancelled));
        assert_eq!(scope.name_count(), 1);
        assert_eq!(scope.value_count(), 1);

        let next = compiler
            .translate_predicate(ClauseKind::Filter, &Predicate::eq("status", "B"), &schema, &mut scope)
            .unwrap();
        assert_eq!(next.expression, "#attr1 = :p1");
    }

    #[test]
    fn test_should_refuse_async_hook_on_sync_path() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let err = compiler
            .translate_format_string(
                ClauseKind::Filter,
                "ssn = {0}",
                &["1".into()],
                Some(&user_schema()),
                &mut scope,
            )
            .unwrap_err();

        assert!(matches!(
            err,
            CompileError::TransformFailure { ref field, source: TransformError::AsyncOnSyncPath(_) }
                if field == "ssn"
        ));
        assert_eq!(scope.value_count(), 0);
    }

    #[test]
    fn test_should_round_trip_scalars_through_codec() {
        let compiler = compiler();
        let codec = compiler.codec();
        let plain = PropertyDescriptor::new("v");
        let cases = [
            Value::Null,
            Value::Bool(true),
            Value::from("héllo"),
            Value::Integer(-42),
            Value::Decimal(Decimal::new(-31_415, 4)),
            Value::Float(0.25),
            Value::Binary(Bytes::from_static(b"\x00\x01")),
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 5).unwrap()),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            Value::Map(BTreeMap::from([("k".to_owned(), Value::from("v"))])),
        ];
        for value in cases {
            let wire = codec.to_wire(&value, &plain).unwrap();
            let back = codec.from_wire(&wire, value.kind(), &plain).unwrap();
            assert_eq!(back, value, "{wire:?}");
        }
    }
}
