//! Registry of named predicate operators.

mod collection;
mod comparison;
mod membership;
mod text;

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::error::OperatorError;
use super::value::FeatureValue;
use crate::catalog::{FeatureType, OperandType, OperatorDefinition};

/// One predicate operator applied to a feature value and a rule operand.
pub trait OperatorStrategy: Send + Sync {
    fn code(&self) -> &'static str;

    fn name(&self) -> &'static str;

    fn operand_type(&self) -> OperandType;

    /// Feature types the operator applies to; empty means any.
    fn compatible_feature_types(&self) -> &'static [FeatureType] {
        &[]
    }

    fn evaluate(&self, value: &FeatureValue, operand: Option<&Value>)
        -> Result<bool, OperatorError>;

    /// Result used when the feature value is null.
    fn on_null(&self) -> bool {
        false
    }

    fn definition(&self) -> OperatorDefinition {
        OperatorDefinition {
            code: self.code().to_string(),
            name: self.name().to_string(),
            description: None,
            operand_type: self.operand_type(),
            compatible_feature_types: self.compatible_feature_types().to_vec(),
        }
    }
}

/// Operators keyed by code.
pub struct OperatorCatalog {
    operators: BTreeMap<&'static str, Box<dyn OperatorStrategy>>,
}

impl OperatorCatalog {
    /// Catalog holding every built-in operator.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for operator in comparison::operators()
            .into_iter()
            .chain(membership::operators())
            .chain(text::operators())
            .chain(collection::operators())
        {
            catalog.register(operator);
        }
        debug!(operators = catalog.len(), "operator catalog built");
        catalog
    }

    pub fn empty() -> Self {
        Self {
            operators: BTreeMap::new(),
        }
    }

    /// Add or replace an operator under its code.
    pub fn register(&mut self, operator: Box<dyn OperatorStrategy>) {
        self.operators.insert(operator.code(), operator);
    }

    pub fn get(&self, code: &str) -> Result<&dyn OperatorStrategy, OperatorError> {
        self.operators
            .get(code)
            .map(|operator| operator.as_ref())
            .ok_or_else(|| OperatorError::UnknownOperator(code.to_string()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.operators.contains_key(code)
    }

    pub fn codes(&self) -> Vec<&'static str> {
        self.operators.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Definitions of the built-in operators, ordered by code.
    pub fn definitions() -> Vec<OperatorDefinition> {
        Self::builtin()
            .operators
            .values()
            .map(|operator| operator.definition())
            .collect()
    }
}

impl Default for OperatorCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for OperatorCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorCatalog")
            .field("codes", &self.codes())
            .finish()
    }
}

pub(crate) fn single_operand(
    operator: &'static str,
    operand: Option<&Value>,
) -> Result<FeatureValue, OperatorError> {
    match operand {
        Some(value) if !value.is_null() && !value.is_array() && !value.is_object() => {
            Ok(FeatureValue::from_json(value))
        }
        _ => Err(OperatorError::InvalidOperand {
            operator,
            expected: "a single value",
        }),
    }
}

pub(crate) fn list_operand(
    operator: &'static str,
    operand: Option<&Value>,
) -> Result<Vec<FeatureValue>, OperatorError> {
    match operand {
        Some(Value::Array(items)) => Ok(items.iter().map(FeatureValue::from_json).collect()),
        _ => Err(OperatorError::InvalidOperand {
            operator,
            expected: "a list",
        }),
    }
}

pub(crate) fn range_operand(
    operator: &'static str,
    operand: Option<&Value>,
) -> Result<(FeatureValue, FeatureValue), OperatorError> {
    let bounds = operand
        .and_then(Value::as_object)
        .and_then(|map| Some((map.get("min")?, map.get("max")?)));
    match bounds {
        Some((min, max)) if !min.is_null() && !max.is_null() => {
            Ok((FeatureValue::from_json(min), FeatureValue::from_json(max)))
        }
        _ => Err(OperatorError::InvalidOperand {
            operator,
            expected: "a {min, max} range",
        }),
    }
}

pub(crate) fn numeric_operand(
    operator: &'static str,
    operand: Option<&Value>,
) -> Result<f64, OperatorError> {
    operand
        .and_then(Value::as_f64)
        .ok_or(OperatorError::InvalidOperand {
            operator,
            expected: "a numeric",
        })
}
