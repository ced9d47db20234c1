//! Typed predicate translation against a shared scope.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use dynexpr_core::{CompileError, CompileErrorKind, Operator, Predicate, Value};
    use dynexpr_model::{AttributeValue, ClauseKind};

    use crate::{compiler, user_schema};

    #[test]
    fn test_should_translate_single_equality() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let clause = compiler
            .translate_predicate(
                ClauseKind::KeyCondition,
                &Predicate::eq("pk", "USER#123"),
                &user_schema(),
                &mut scope,
            )
            .unwrap();

        assert_eq!(clause.expression, "#attr0 = :p0");
        assert_eq!(clause.names, vec![("#attr0".to_owned(), "pk".to_owned())]);
        assert_eq!(
            clause.values,
            vec![(":p0".to_owned(), AttributeValue::S("USER#123".to_owned()))]
        );
        assert_eq!(scope.resolve_name("#attr0"), Some("pk"));
    }

    #[test]
    fn test_should_parenthesize_conjunction() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let clause = compiler
            .translate_predicate(
                ClauseKind::Filter,
                &Predicate::and([Predicate::eq("status", "ACTIVE"), Predicate::gt("age", 18)]),
                &user_schema(),
                &mut scope,
            )
            .unwrap();

        assert_eq!(clause.expression, "(#attr0 = :p0) AND (#attr1 > :p1)");
        assert_eq!(
            scope.resolve_value(":p1"),
            Some(&AttributeValue::N("18".to_owned()))
        );
    }

    #[test]
    fn test_should_reject_empty_set_naming_field() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let err = compiler
            .translate_predicate(
                ClauseKind::Filter,
                &Predicate::contains("tags", Value::StringSet(vec![])),
                &user_schema(),
                &mut scope,
            )
            .unwrap_err();

        assert_eq!(err.kind(), CompileErrorKind::EmptyCollectionValue);
        assert_eq!(err.identifier(), Some("tags"));
        assert_eq!(scope.name_count(), 0);
        assert_eq!(scope.value_count(), 0);
    }

    #[test]
    fn test_should_continue_numbering_on_second_clause() {
        let compiler = compiler();
        let schema = user_schema();
        let mut scope = compiler.scope();
        let first = compiler
            .translate_predicate(ClauseKind::KeyCondition, &Predicate::eq("pk", "A"), &schema, &mut scope)
            .unwrap();
        let second = compiler
            .translate_predicate(ClauseKind::Filter, &Predicate::eq("status", "B"), &schema, &mut scope)
            .unwrap();

        assert_eq!(first.values[0].0, ":p0");
        assert_eq!(second.values[0].0, ":p1");
        assert_eq!(second.expression, "#attr1 = :p1");
    }

    #[test]
    fn test_should_allocate_contiguous_placeholders_across_many_clauses() {
        let compiler = compiler();
        let schema = user_schema();
        let mut scope = compiler.scope();
        let mut emitted = Vec::new();
        for i in 0..10_i64 {
            let predicate = if i % 2 == 0 {
                Predicate::between("age", i, i + 10)
            } else {
                Predicate::is_in("status", [format!("S{i}"), format!("T{i}"), format!("U{i}")])
            };
            let clause = compiler
                .translate_predicate(ClauseKind::Filter, &predicate, &schema, &mut scope)
                .unwrap();
            emitted.extend(clause.values.into_iter().map(|(p, _)| p));
        }

        let expected: Vec<String> = (0..scope.value_count()).map(|i| format!(":p{i}")).collect();
        assert_eq!(emitted, expected);
        assert_eq!(emitted.iter().collect::<HashSet<_>>().len(), 25);
    }

    #[test]
    fn test_should_alias_every_property_alike() {
        let compiler = compiler();
        let schema = user_schema();
        let translate = |property: &str| {
            let mut scope = compiler.scope();
            compiler
                .translate_predicate(ClauseKind::Filter, &Predicate::eq(property, 1), &schema, &mut scope)
                .unwrap()
                .expression
        };

        assert_eq!(translate("size"), translate("age"));
        assert_eq!(translate("status"), "#attr0 = :p0");
    }

    #[test]
    fn test_should_treat_single_child_conjunction_as_child() {
        let compiler = compiler();
        let schema = user_schema();
        let x = Predicate::begins_with("sk", "ORDER#");
        let mut a = compiler.scope();
        let mut b = compiler.scope();

        let wrapped = compiler
            .translate_predicate(ClauseKind::KeyCondition, &Predicate::and([x.clone()]), &schema, &mut a)
            .unwrap();
        let plain = compiler
            .translate_predicate(ClauseKind::KeyCondition, &x, &schema, &mut b)
            .unwrap();
        assert_eq!(wrapped, plain);
        assert_eq!(plain.expression, "begins_with(#attr0, :p0)");
    }

    #[test]
    fn test_should_map_logical_name_to_wire_attribute() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let clause = compiler
            .translate_predicate(
                ClauseKind::Condition,
                &Predicate::attribute_not_exists("createdAt"),
                &user_schema(),
                &mut scope,
            )
            .unwrap();
        assert_eq!(clause.expression, "attribute_not_exists(#attr0)");
        assert_eq!(scope.resolve_name("#attr0"), Some("created_at"));
    }

    #[test]
    fn test_should_negate_comparisons_and_reject_range_negation() {
        let compiler = compiler();
        let schema = user_schema();
        let mut scope = compiler.scope();

        let clause = compiler
            .translate_predicate(ClauseKind::Filter, &!Predicate::gt("age", 21), &schema, &mut scope)
            .unwrap();
        assert_eq!(clause.expression, "#attr0 <= :p0");

        let err = compiler
            .translate_predicate(
                ClauseKind::Filter,
                &!Predicate::between("age", 1, 5),
                &schema,
                &mut scope,
            )
            .unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedOperation { .. }));
        assert_eq!(scope.value_count(), 1);
    }

    #[test]
    fn test_should_fail_unknown_property_before_allocating() {
        let compiler = compiler();
        let mut scope = compiler.scope();
        let err = compiler
            .translate_predicate(
                ClauseKind::Filter,
                &Predicate::and([
                    Predicate::eq("status", "A"),
                    Predicate::size("nickname", Operator::Gt, 3),
                ]),
                &user_schema(),
                &mut scope,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownProperty { ref entity, ref property }
                if entity == "User" && property == "nickname"
        ));
        assert_eq!(scope.name_count(), 0);
    }
}
