use std::collections::HashMap;

use serde_json::Value;

use super::error::{EvaluationError, OperatorError};
use super::operators::OperatorCatalog;
use super::value::FeatureValue;
use crate::catalog::{DefinitionStore, Feature, FeatureId, OperatorDefinition, Rule, RuleId};

/// A rule together with the definitions it references, fixed for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRule {
    pub rule: Rule,
    pub feature: Feature,
}

pub type ResolvedRules = HashMap<RuleId, ResolvedRule>;

/// Binds one feature value to one rule's operator and operand.
#[derive(Debug, Clone, Copy)]
pub struct RuleEvaluator<'a> {
    operators: &'a OperatorCatalog,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(operators: &'a OperatorCatalog) -> Self {
        Self { operators }
    }

    pub fn evaluate(&self, rule: &Rule, value: &FeatureValue) -> Result<bool, OperatorError> {
        let operator = self.operators.get(&rule.operator_code)?;
        if value.is_null() {
            return Ok(operator.on_null());
        }
        operator.evaluate(value, rule.operand.as_ref())
    }
}

/// Features are referenced by id; a feature name is accepted as well.
pub(crate) fn lookup_feature<S>(store: &S, id: &FeatureId) -> Result<Feature, EvaluationError>
where
    S: DefinitionStore + ?Sized,
{
    if let Some(feature) = store.feature(id)? {
        return Ok(feature);
    }
    store
        .feature_by_name(&id.0)?
        .ok_or_else(|| EvaluationError::not_found("feature", id))
}

/// Check a rule against its operator and feature definitions. Returns the
/// first problem found.
pub(crate) fn check_rule(
    rule: &Rule,
    feature: &Feature,
    definition: &OperatorDefinition,
    operators: &OperatorCatalog,
) -> Result<(), String> {
    if !operators.contains(&rule.operator_code) {
        return Err(format!(
            "operator '{}' has no registered implementation",
            rule.operator_code
        ));
    }
    if !definition.operand_type.accepts(rule.operand.as_ref()) {
        return Err(format!(
            "operand {} does not match operand type {:?} of operator '{}'",
            render_operand(rule.operand.as_ref()),
            definition.operand_type,
            rule.operator_code
        ));
    }
    if !definition.supports(feature.feature_type) {
        return Err(format!(
            "operator '{}' cannot be applied to {} feature '{}'",
            rule.operator_code,
            feature.feature_type.label(),
            feature.name
        ));
    }
    Ok(())
}

/// Operand text used in failure reasons; strings are shown unquoted.
pub(crate) fn render_operand(operand: Option<&Value>) -> String {
    match operand {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
