//! Composing a whole request with the builder.

#[cfg(test)]
mod tests {
    use dynexpr_core::{CompileError, Predicate, SetValue, Update, Value};
    use dynexpr_model::{ClauseKind, PropertyDescriptor};
    use serde_json::json;

    use crate::{compiler, user_schema};

    #[test]
    fn test_should_compile_query_request_to_wire_json() {
        let compiler = compiler();
        let schema = user_schema();
        let mut builder = compiler.request();
        builder
            .predicate(ClauseKind::KeyCondition, &Predicate::eq("pk", "USER#123"), &schema)
            .unwrap()
            .predicate(
                ClauseKind::KeyCondition,
                &Predicate::begins_with("sk", "ORDER#"),
                &schema,
            )
            .unwrap()
            .format_string(ClauseKind::Filter, "age >= {0}", &[Value::from(21)], Some(&schema))
            .unwrap()
            .projection(&["pk", "sk", "status"], &schema)
            .unwrap();
        let request = builder.build();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            json!({
                "KeyConditionExpression": "(#attr0 = :p0) AND (begins_with(#attr1, :p1))",
                "FilterExpression": "age >= :p2",
                "ProjectionExpression": "#attr2, #attr3, #attr4",
                "ExpressionAttributeNames": {
                    "#attr0": "pk",
                    "#attr1": "sk",
                    "#attr2": "pk",
                    "#attr3": "sk",
                    "#attr4": "status",
                },
                "ExpressionAttributeValues": {
                    ":p0": { "S": "USER#123" },
                    ":p1": { "S": "ORDER#" },
                    ":p2": { "N": "21" },
                },
            })
        );
    }

    #[test]
    fn test_should_compile_conditional_update() {
        let compiler = compiler();
        let schema = user_schema();
        let mut builder = compiler.request();
        builder
            .predicate(ClauseKind::Condition, &Predicate::attribute_exists("pk"), &schema)
            .unwrap()
            .update(
                &Update::new()
                    .set("status", "ACTIVE")
                    .set_value(
                        "age",
                        SetValue::plus(SetValue::property("age"), SetValue::value(1)),
                    )
                    .remove("balance")
                    .add("tags", Value::StringSet(vec!["vip".to_owned()])),
                &schema,
            )
            .unwrap();
        let request = builder.build();

        assert_eq!(request.condition_expression.as_deref(), Some("attribute_exists(#attr0)"));
        assert_eq!(
            request.update_expression.as_deref(),
            Some("SET #attr1 = :p0, #attr2 = #attr3 + :p1 REMOVE #attr4 ADD #attr5 :p2")
        );
        assert_eq!(request.expression_attribute_names["#attr4"], "balance");
        assert_eq!(request.expression_attribute_values.len(), 3);
    }

    #[test]
    fn test_should_reuse_prebound_value_across_clauses() {
        let compiler = compiler();
        let schema = user_schema();
        let mut builder = compiler.request();
        let shared = builder
            .bind_value(&Value::from("ACTIVE"), &PropertyDescriptor::new("status"))
            .unwrap();
        builder
            .format_string(ClauseKind::Condition, &format!("pk = {shared}"), &[], None)
            .unwrap()
            .update(&Update::new().set("status", Value::from("ACTIVE")), &schema)
            .unwrap();
        let request = builder.build();

        assert_eq!(request.condition_expression.as_deref(), Some("pk = :p0"));
        assert_eq!(request.update_expression.as_deref(), Some("SET #attr0 = :p1"));
    }

    #[test]
    fn test_should_reject_second_projection() {
        let compiler = compiler();
        let schema = user_schema();
        let mut builder = compiler.request();
        builder.projection(&["pk"], &schema).unwrap();
        let err = builder.projection(&["sk"], &schema).unwrap_err();

        assert!(matches!(err, CompileError::DuplicateClause { clause: ClauseKind::Projection }));
        assert_eq!(builder.scope().name_count(), 1);
    }
}
