use serde_json::Value;

use super::{list_operand, single_operand, OperatorStrategy};
use crate::catalog::{FeatureType, OperandType};
use crate::evaluation::error::OperatorError;
use crate::evaluation::value::FeatureValue;

const SCALAR_TYPES: &[FeatureType] = &[
    FeatureType::Numeric,
    FeatureType::String,
    FeatureType::Boolean,
    FeatureType::Date,
];

pub(super) fn operators() -> Vec<Box<dyn OperatorStrategy>> {
    vec![
        Box::new(InList {
            code: "IN",
            name: "In",
            negate: false,
        }),
        Box::new(InList {
            code: "NOT_IN",
            name: "Not In",
            negate: true,
        }),
        Box::new(Contains),
        Box::new(ContainsEvery {
            code: "CONTAINS_ALL",
            name: "Contains All",
            require_all: true,
        }),
        Box::new(ContainsEvery {
            code: "CONTAINS_ANY",
            name: "Contains Any",
            require_all: false,
        }),
    ]
}

fn holds(items: &[FeatureValue], candidate: &FeatureValue) -> bool {
    items.iter().any(|item| item.loosely_equals(candidate))
}

struct InList {
    code: &'static str,
    name: &'static str,
    negate: bool,
}

impl OperatorStrategy for InList {
    fn code(&self) -> &'static str {
        self.code
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn operand_type(&self) -> OperandType {
        OperandType::List
    }

    fn compatible_feature_types(&self) -> &'static [FeatureType] {
        SCALAR_TYPES
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>) -> Result<bool, OperatorError> {
        let allowed = list_operand(self.code, operand)?;
        Ok(holds(&allowed, value) != self.negate)
    }
}

/// Substring test for strings, membership test for lists.
struct Contains;

impl OperatorStrategy for Contains {
    fn code(&self) -> &'static str {
        "CONTAINS"
    }

    fn name(&self) -> &'static str {
        "Contains"
    }

    fn operand_type(&self) -> OperandType {
        OperandType::Single
    }

    fn compatible_feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::String, FeatureType::List]
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>) -> Result<bool, OperatorError> {
        let needle = single_operand(self.code(), operand)?;
        match value {
            FeatureValue::Text(text) => Ok(text.contains(&needle.to_string())),
            FeatureValue::List(items) => Ok(holds(items, &needle)),
            other => Err(OperatorError::UnsupportedValue {
                operator: self.code(),
                found: other.kind(),
            }),
        }
    }
}

struct ContainsEvery {
    code: &'static str,
    name: &'static str,
    require_all: bool,
}

impl OperatorStrategy for ContainsEvery {
    fn code(&self) -> &'static str {
        self.code
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn operand_type(&self) -> OperandType {
        OperandType::List
    }

    fn compatible_feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::List]
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>) -> Result<bool, OperatorError> {
        let items = value.as_list().ok_or(OperatorError::UnsupportedValue {
            operator: self.code,
            found: value.kind(),
        })?;
        let wanted = list_operand(self.code, operand)?;

        let mut present = wanted.iter().map(|candidate| holds(items, candidate));
        if self.require_all {
            Ok(present.all(|found| found))
        } else {
            Ok(present.any(|found| found))
        }
    }
}
