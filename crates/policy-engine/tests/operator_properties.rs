use policy_engine::catalog::{ExtractionConfig, Feature, FeatureId, FeatureType};
use policy_engine::evaluation::{FeatureExtractor, OperatorCatalog};
use policy_engine::FeatureValue;
use proptest::prelude::*;
use serde_json::{json, Value};

fn evaluate(code: &str, value: &FeatureValue, operand: &Value) -> bool {
    OperatorCatalog::builtin()
        .get(code)
        .expect("builtin operator")
        .evaluate(value, Some(operand))
        .expect("operands are well formed")
}

fn numeric_feature(default_value: Option<i64>) -> Feature {
    Feature {
        id: FeatureId::from("f-amount"),
        name: "amount".to_string(),
        description: None,
        feature_type: FeatureType::Numeric,
        extraction_config: ExtractionConfig::Direct {
            field: "amount".to_string(),
        },
        default_value: default_value.map(Value::from),
    }
}

proptest! {
    #[test]
    fn between_is_inclusive_on_both_bounds(
        value in -1_000i64..1_000,
        low in -1_000i64..1_000,
        span in 0i64..500,
    ) {
        let high = low + span;
        let operand = json!({ "min": low, "max": high });
        let expected = low <= value && value <= high;

        prop_assert_eq!(evaluate("BETWEEN", &FeatureValue::Integer(value), &operand), expected);
        prop_assert!(evaluate("BETWEEN", &FeatureValue::Integer(low), &operand));
        prop_assert!(evaluate("BETWEEN", &FeatureValue::Integer(high), &operand));
    }

    #[test]
    fn negated_operators_complement_their_base(
        value in -50i64..50,
        candidates in proptest::collection::vec(-50i64..50, 0..8),
    ) {
        let value = FeatureValue::Integer(value);
        let list = json!(candidates);
        prop_assert_ne!(evaluate("IN", &value, &list), evaluate("NOT_IN", &value, &list));

        let single = json!(candidates.first().copied().unwrap_or_default());
        prop_assert_ne!(evaluate("EQ", &value, &single), evaluate("NEQ", &value, &single));
    }

    #[test]
    fn integers_and_floats_compare_by_value(value in -10_000i64..10_000) {
        let float = json!(value as f64);
        prop_assert!(evaluate("EQ", &FeatureValue::Integer(value), &float));
        prop_assert!(evaluate("GTE", &FeatureValue::Integer(value), &float));
        prop_assert!(!evaluate("LT", &FeatureValue::Integer(value), &float));
    }

    #[test]
    fn defaults_stand_in_for_absent_values(default in any::<i32>(), present in any::<bool>(), raw in any::<i32>()) {
        let features = [numeric_feature(Some(i64::from(default)))];
        let input = if present { json!({ "amount": raw }) } else { json!({}) };

        let extracted = FeatureExtractor
            .extract(&features, &input)
            .expect("default covers absence");

        let expected = if present { raw } else { default };
        prop_assert_eq!(&extracted["amount"], &FeatureValue::Integer(i64::from(expected)));
    }

    #[test]
    fn features_without_defaults_are_required(raw in proptest::option::of(any::<i32>())) {
        let features = [numeric_feature(None)];
        let input = match raw {
            Some(raw) => json!({ "amount": raw }),
            None => json!({ "amount": null }),
        };

        let result = FeatureExtractor.extract(&features, &input);
        prop_assert_eq!(result.is_ok(), raw.is_some());
    }
}
