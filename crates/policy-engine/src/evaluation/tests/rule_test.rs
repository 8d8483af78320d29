use serde_json::json;

use super::common::{build_engine, engine_with_store, store_with};
use crate::catalog::{Rule, RuleId};
use crate::evaluation::FeatureValue;

#[test]
fn passing_rules_report_the_extracted_value() {
    let (engine, _) = build_engine();

    let outcome = engine
        .test_rule(&RuleId::from("r-adult"), &json!({ "age": 25 }))
        .expect("rule exists");

    assert!(outcome.result);
    assert_eq!(outcome.message, "Rule passed");
    assert_eq!(outcome.rule_name, "Adult applicant");
    assert_eq!(outcome.feature_name, "age");
    assert_eq!(outcome.extracted_value, Some(FeatureValue::Integer(25)));
    assert_eq!(outcome.operator_code, "GTE");
    assert_eq!(outcome.operator_name.as_deref(), Some("Greater Than or Equal"));
    assert_eq!(outcome.operand, Some(json!(21)));
}

#[test]
fn failing_rules_are_not_errors() {
    let (engine, _) = build_engine();

    let outcome = engine
        .test_rule(&RuleId::from("r-adult"), &json!({ "age": 17 }))
        .expect("rule exists");

    assert!(!outcome.result);
    assert_eq!(outcome.message, "Rule failed");
}

#[test]
fn defaults_apply_when_input_is_absent() {
    let (engine, _) = build_engine();

    let outcome = engine
        .test_rule(&RuleId::from("r-clean"), &json!({}))
        .expect("rule exists");

    assert!(outcome.result);
    assert_eq!(outcome.extracted_value, Some(FeatureValue::List(Vec::new())));
}

#[test]
fn extraction_problems_end_up_in_the_message() {
    let (engine, _) = build_engine();

    let outcome = engine
        .test_rule(&RuleId::from("r-adult"), &json!({ "creditScore": 700 }))
        .expect("rule exists");

    assert!(!outcome.result);
    assert!(outcome.extracted_value.is_none());
    assert_eq!(
        outcome.message,
        "Error: Missing required input for feature(s): age"
    );
}

#[test]
fn operator_problems_end_up_in_the_message() {
    let store = store_with(|document| {
        document.rules.push(Rule {
            id: RuleId::from("r-bad-pattern"),
            name: "Broken pattern".to_string(),
            description: None,
            feature_id: "f-employment".into(),
            operator_code: "REGEX".to_string(),
            operand: Some(json!("(unclosed")),
        });
    });
    let (engine, _) = engine_with_store(store);

    let outcome = engine
        .test_rule(
            &RuleId::from("r-bad-pattern"),
            &json!({ "applicant": { "employment": { "type": "SALARIED" } } }),
        )
        .expect("rule exists");

    assert!(!outcome.result);
    assert!(outcome.message.starts_with("Error: invalid regular expression"));
    assert_eq!(
        outcome.extracted_value,
        Some(FeatureValue::Text("SALARIED".to_string()))
    );
}

#[test]
fn unknown_features_fall_back_to_the_reference() {
    let store = store_with(|document| {
        document.rules.push(Rule {
            id: RuleId::from("r-orphan"),
            name: "Orphan".to_string(),
            description: None,
            feature_id: "f-retired".into(),
            operator_code: "EQ".to_string(),
            operand: Some(json!(1)),
        });
    });
    let (engine, _) = engine_with_store(store);

    let outcome = engine
        .test_rule(&RuleId::from("r-orphan"), &json!({}))
        .expect("rule exists");

    assert!(!outcome.result);
    assert_eq!(outcome.feature_name, "f-retired");
    assert_eq!(outcome.message, "Error: feature 'f-retired' not found");
}

#[test]
fn unknown_rules_are_not_found() {
    let (engine, _) = build_engine();

    let err = engine
        .test_rule(&RuleId::from("r-missing"), &json!({}))
        .expect_err("no such rule");

    assert!(err.is_not_found());
}
