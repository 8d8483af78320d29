use serde_json::Value;

use super::{numeric_operand, OperatorStrategy};
use crate::catalog::{FeatureType, OperandType};
use crate::evaluation::error::OperatorError;
use crate::evaluation::value::FeatureValue;

const SIZED_TYPES: &[FeatureType] = &[FeatureType::String, FeatureType::List];

pub(super) fn operators() -> Vec<Box<dyn OperatorStrategy>> {
    vec![
        Box::new(Emptiness {
            code: "IS_EMPTY",
            name: "Is Empty",
            expect_empty: true,
        }),
        Box::new(Emptiness {
            code: "IS_NOT_EMPTY",
            name: "Is Not Empty",
            expect_empty: false,
        }),
        Box::new(Size {
            code: "SIZE_EQ",
            name: "Size Equals",
            test: |size, expected| size == expected,
        }),
        Box::new(Size {
            code: "SIZE_GT",
            name: "Size Greater Than",
            test: |size, expected| size > expected,
        }),
        Box::new(Size {
            code: "SIZE_LT",
            name: "Size Less Than",
            test: |size, expected| size < expected,
        }),
    ]
}

fn is_empty(value: &FeatureValue) -> bool {
    match value {
        FeatureValue::Null => true,
        FeatureValue::Text(text) => text.is_empty(),
        FeatureValue::List(items) => items.is_empty(),
        _ => false,
    }
}

/// Null counts as empty.
struct Emptiness {
    code: &'static str,
    name: &'static str,
    expect_empty: bool,
}

impl OperatorStrategy for Emptiness {
    fn code(&self) -> &'static str {
        self.code
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn operand_type(&self) -> OperandType {
        OperandType::None
    }

    fn compatible_feature_types(&self) -> &'static [FeatureType] {
        SIZED_TYPES
    }

    fn evaluate(&self, value: &FeatureValue, _operand: Option<&Value>) -> Result<bool, OperatorError> {
        Ok(is_empty(value) == self.expect_empty)
    }

    fn on_null(&self) -> bool {
        self.expect_empty
    }
}

struct Size {
    code: &'static str,
    name: &'static str,
    test: fn(i64, i64) -> bool,
}

impl OperatorStrategy for Size {
    fn code(&self) -> &'static str {
        self.code
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn operand_type(&self) -> OperandType {
        OperandType::Single
    }

    fn compatible_feature_types(&self) -> &'static [FeatureType] {
        SIZED_TYPES
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>) -> Result<bool, OperatorError> {
        let size = match value {
            FeatureValue::Text(text) => text.chars().count(),
            FeatureValue::List(items) => items.len(),
            other => {
                return Err(OperatorError::UnsupportedValue {
                    operator: self.code,
                    found: other.kind(),
                })
            }
        };
        // Fractional operands are truncated toward zero.
        let expected = numeric_operand(self.code, operand)?.trunc() as i64;
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        Ok((self.test)(size, expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::operators::OperatorCatalog;
    use serde_json::json;

    fn check(code: &str, value: Value, operand: Option<Value>) -> Result<bool, OperatorError> {
        OperatorCatalog::builtin()
            .get(code)
            .expect("operator registered")
            .evaluate(&FeatureValue::from_json(&value), operand.as_ref())
    }

    #[test]
    fn emptiness_covers_strings_and_lists() {
        assert_eq!(check("IS_EMPTY", json!(""), None), Ok(true));
        assert_eq!(check("IS_EMPTY", json!([]), None), Ok(true));
        assert_eq!(check("IS_EMPTY", json!("x"), None), Ok(false));
        assert_eq!(check("IS_NOT_EMPTY", json!([1]), None), Ok(true));
        assert_eq!(check("IS_NOT_EMPTY", json!(0), None), Ok(true));
    }

    #[test]
    fn null_overrides_follow_emptiness() {
        let catalog = OperatorCatalog::builtin();
        assert!(catalog.get("IS_EMPTY").expect("registered").on_null());
        assert!(!catalog.get("IS_NOT_EMPTY").expect("registered").on_null());
        assert!(!catalog.get("EQ").expect("registered").on_null());
    }

    #[test]
    fn sizes_count_items_and_characters() {
        assert_eq!(check("SIZE_EQ", json!(["a", "b"]), Some(json!(2))), Ok(true));
        assert_eq!(check("SIZE_GT", json!("héllo"), Some(json!(4))), Ok(true));
        assert_eq!(check("SIZE_LT", json!([1, 2, 3]), Some(json!(3))), Ok(false));
    }

    #[test]
    fn fractional_size_operands_are_truncated() {
        assert_eq!(check("SIZE_LT", json!(["a", "b"]), Some(json!(2.5))), Ok(false));
        assert_eq!(check("SIZE_EQ", json!(["a", "b"]), Some(json!(2.9))), Ok(true));
        assert_eq!(check("SIZE_GT", json!("abc"), Some(json!(2.99))), Ok(true));
    }

    #[test]
    fn size_operand_must_be_numeric() {
        let err = check("SIZE_EQ", json!([1]), Some(json!("1"))).expect_err("string operand");
        assert!(matches!(err, OperatorError::InvalidOperand { .. }));
        let err = check("SIZE_EQ", json!(12), Some(json!(2))).expect_err("number has no size");
        assert!(matches!(err, OperatorError::UnsupportedValue { .. }));
    }
}
