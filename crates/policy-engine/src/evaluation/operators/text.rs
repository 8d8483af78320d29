use regex::Regex;
use serde_json::Value;

use super::{single_operand, OperatorStrategy};
use crate::catalog::{FeatureType, OperandType};
use crate::evaluation::error::OperatorError;
use crate::evaluation::value::FeatureValue;

const TEXT_TYPES: &[FeatureType] = &[FeatureType::String];

pub(super) fn operators() -> Vec<Box<dyn OperatorStrategy>> {
    vec![
        Box::new(Affix {
            code: "STARTS_WITH",
            name: "Starts With",
            test: |text, affix| text.starts_with(affix),
        }),
        Box::new(Affix {
            code: "ENDS_WITH",
            name: "Ends With",
            test: |text, affix| text.ends_with(affix),
        }),
        Box::new(Pattern),
    ]
}

fn text_of<'a>(operator: &'static str, value: &'a FeatureValue) -> Result<&'a str, OperatorError> {
    value.as_str().ok_or(OperatorError::UnsupportedValue {
        operator,
        found: value.kind(),
    })
}

struct Affix {
    code: &'static str,
    name: &'static str,
    test: fn(&str, &str) -> bool,
}

impl OperatorStrategy for Affix {
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
        TEXT_TYPES
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>) -> Result<bool, OperatorError> {
        let text = text_of(self.code, value)?;
        let affix = single_operand(self.code, operand)?.to_string();
        Ok((self.test)(text, &affix))
    }
}

/// The whole value must match the pattern.
struct Pattern;

impl OperatorStrategy for Pattern {
    fn code(&self) -> &'static str {
        "REGEX"
    }

    fn name(&self) -> &'static str {
        "Matches Pattern"
    }

    fn operand_type(&self) -> OperandType {
        OperandType::Single
    }

    fn compatible_feature_types(&self) -> &'static [FeatureType] {
        TEXT_TYPES
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>) -> Result<bool, OperatorError> {
        let text = text_of(self.code(), value)?;
        let pattern = operand
            .and_then(Value::as_str)
            .ok_or(OperatorError::InvalidOperand {
                operator: self.code(),
                expected: "a pattern string",
            })?;
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
            OperatorError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(anchored.is_match(text))
    }
}
