use std::cmp::Ordering;

use serde_json::Value;

use super::{range_operand, single_operand, OperatorStrategy};
use crate::catalog::{FeatureType, OperandType};
use crate::evaluation::error::OperatorError;
use crate::evaluation::value::FeatureValue;

const ORDERED_TYPES: &[FeatureType] = &[FeatureType::Numeric, FeatureType::Date, FeatureType::String];

pub(super) fn operators() -> Vec<Box<dyn OperatorStrategy>> {
    vec![
        Box::new(Equality {
            code: "EQ",
            name: "Equals",
            negate: false,
        }),
        Box::new(Equality {
            code: "NEQ",
            name: "Not Equals",
            negate: true,
        }),
        Box::new(Ordered {
            code: "LT",
            name: "Less Than",
            accepts: Ordering::is_lt,
        }),
        Box::new(Ordered {
            code: "LTE",
            name: "Less Than or Equal",
            accepts: Ordering::is_le,
        }),
        Box::new(Ordered {
            code: "GT",
            name: "Greater Than",
            accepts: Ordering::is_gt,
        }),
        Box::new(Ordered {
            code: "GTE",
            name: "Greater Than or Equal",
            accepts: Ordering::is_ge,
        }),
        Box::new(Between),
    ]
}

struct Equality {
    code: &'static str,
    name: &'static str,
    negate: bool,
}

impl OperatorStrategy for Equality {
    fn code(&self) -> &'static str {
        self.code
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn operand_type(&self) -> OperandType {
        OperandType::Single
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>) -> Result<bool, OperatorError> {
        let expected = single_operand(self.code, operand)?;
        Ok(value.loosely_equals(&expected) != self.negate)
    }
}

struct Ordered {
    code: &'static str,
    name: &'static str,
    accepts: fn(Ordering) -> bool,
}

impl OperatorStrategy for Ordered {
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
        ORDERED_TYPES
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>) -> Result<bool, OperatorError> {
        let threshold = single_operand(self.code, operand)?;
        Ok((self.accepts)(value.compare(&threshold)?))
    }
}

/// Inclusive on both bounds.
struct Between;

impl OperatorStrategy for Between {
    fn code(&self) -> &'static str {
        "BETWEEN"
    }

    fn name(&self) -> &'static str {
        "Between"
    }

    fn operand_type(&self) -> OperandType {
        OperandType::Range
    }

    fn compatible_feature_types(&self) -> &'static [FeatureType] {
        ORDERED_TYPES
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>) -> Result<bool, OperatorError> {
        let (min, max) = range_operand(self.code(), operand)?;
        Ok(value.compare(&min)?.is_ge() && value.compare(&max)?.is_le())
    }
}
