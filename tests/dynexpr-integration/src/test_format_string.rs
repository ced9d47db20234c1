//! Positional format-string translation.

#[cfg(test)]
mod tests {
    use dynexpr_core::{CompileError, CompileErrorKind, Predicate, Value, ValueKind};
    use dynexpr_model::{AttributeValue, ClauseKind};
    use rust_decimal::Decimal;

    use crate::{compiler, user_schema};

    #[test]
    fn test_should_bind_slots_and_keep_raw_names() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let clause = compiler
            .translate_format_string(
                ClauseKind::KeyCondition,
                "pk = {0} AND sk > {1}",
                &["USER#123".into(), "2024-01-01".into()],
                None,
                &mut scope,
            )
            .unwrap();

        assert_eq!(clause.expression, "pk = :p0 AND sk > :p1");
        assert!(clause.names.is_empty());
        assert_eq!(
            clause.values,
            vec![
                (":p0".to_owned(), AttributeValue::S("USER#123".to_owned())),
                (":p1".to_owned(), AttributeValue::S("2024-01-01".to_owned())),
            ]
        );
    }

    #[test]
    fn test_should_apply_slot_and_schema_formats() {
        let compiler = compiler();
        let schema = user_schema();
        let mut scope = compiler.scope();
        let clause = compiler
            .translate_format_string(
                ClauseKind::Filter,
                "balance >= {0} AND age = {1:D3}",
                &[Value::Decimal(Decimal::new(125, 1)), Value::Integer(7)],
                Some(&schema),
                &mut scope,
            )
            .unwrap();

        assert_eq!(clause.expression, "balance >= :p0 AND age = :p1");
        assert_eq!(scope.resolve_value(":p0"), Some(&AttributeValue::S("12.50".to_owned())));
        assert_eq!(scope.resolve_value(":p1"), Some(&AttributeValue::S("007".to_owned())));
    }

    #[test]
    fn test_should_alias_reserved_words_in_template() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let clause = compiler
            .translate_format_string(
                ClauseKind::Filter,
                "status = {0} AND attribute_exists(email)",
                &["ACTIVE".into()],
                None,
                &mut scope,
            )
            .unwrap();

        assert_eq!(clause.expression, "#attr0 = :p0 AND attribute_exists(email)");
        assert_eq!(scope.resolve_name("#attr0"), Some("status"));
    }

    #[test]
    fn test_should_share_scope_with_typed_predicates() {
        let compiler = compiler();
        let schema = user_schema();
        let mut scope = compiler.scope();
        compiler
            .translate_predicate(ClauseKind::KeyCondition, &Predicate::eq("pk", "A"), &schema, &mut scope)
            .unwrap();
        let clause = compiler
            .translate_format_string(
                ClauseKind::Filter,
                "#attr0 <> {0} OR pk = :p0",
                &["B".into()],
                None,
                &mut scope,
            )
            .unwrap();

        assert_eq!(clause.expression, "#attr0 <> :p1 OR pk = :p0");
        assert!(clause.names.is_empty());
        assert_eq!(scope.value_count(), 2);
    }

    #[test]
    fn test_should_seal_slot_behind_earlier_name_placeholder() {
        let compiler = compiler();
        let schema = user_schema();
        let mut scope = compiler.scope();
        compiler
            .translate_predicate(
                ClauseKind::Filter,
                &Predicate::attribute_exists("email"),
                &schema,
                &mut scope,
            )
            .unwrap();
        let clause = compiler
            .translate_format_string(
                ClauseKind::Condition,
                "#attr0 = {0}",
                &["b@example.com".into()],
                Some(&schema),
                &mut scope,
            )
            .unwrap();

        assert_eq!(clause.expression, "#attr0 = :p0");
        let sealed = &clause.values[0].1;
        assert!(matches!(sealed, AttributeValue::B(_)));
        let opened = compiler
            .codec()
            .from_wire(sealed, ValueKind::String, schema.resolve("email").unwrap())
            .unwrap();
        assert_eq!(opened, Value::from("b@example.com"));
    }

    #[test]
    fn test_should_bind_type_argument_without_property_policy() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let clause = compiler
            .translate_format_string(
                ClauseKind::Filter,
                "attribute_type(email, {0})",
                &["S".into()],
                Some(&user_schema()),
                &mut scope,
            )
            .unwrap();

        assert_eq!(clause.expression, "attribute_type(email, :p0)");
        assert_eq!(clause.values, vec![(":p0".to_owned(), AttributeValue::S("S".to_owned()))]);
    }

    #[test]
    fn test_should_not_format_nested_attribute_as_parent() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let clause = compiler
            .translate_format_string(
                ClauseKind::Filter,
                "balance.count = {0} AND balance = {1}",
                &[Value::from(7), Value::from(7)],
                Some(&user_schema()),
                &mut scope,
            )
            .unwrap();

        assert_eq!(scope.resolve_value(":p0"), Some(&AttributeValue::N("7".to_owned())));
        assert_eq!(scope.resolve_value(":p1"), Some(&AttributeValue::S("7.00".to_owned())));
        assert_eq!(clause.expression, "balance.#attr0 = :p0 AND balance = :p1");
    }

    #[test]
    fn test_should_reject_malformed_templates_without_leaking() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let cases = [
            ("a = {0", "unbalanced"),
            ("a = {x}", "index"),
            ("a = {0} AND b = {3}", "range"),
            ("a = {0} AND bogus_fn(b)", "function"),
        ];
        for (template, label) in cases {
            let err = compiler
                .translate_format_string(ClauseKind::Filter, template, &[Value::from(1)], None, &mut scope)
                .unwrap_err();
            assert_eq!(err.kind(), CompileErrorKind::MalformedTemplate, "{label}");
            assert!(matches!(err, CompileError::MalformedTemplate { .. }));
        }
        assert_eq!(scope.name_count(), 0);
        assert_eq!(scope.value_count(), 0);
    }

    #[test]
    fn test_should_reject_unknown_reused_placeholder() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let err = compiler
            .translate_format_string(ClauseKind::Filter, "a = :p7", &[], None, &mut scope)
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedPlaceholder { ref placeholder } if placeholder == ":p7"
        ));
    }
}
