use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier wrapper for feature definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub String);

/// Identifier wrapper for rule definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub String);

/// Identifier wrapper for policies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyId(pub String);

/// Identifier wrapper for policy sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicySetId(pub String);

macro_rules! display_id {
    ($($ty:ident),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $ty {
                fn from(value: &str) -> Self {
                    Self(value.to_string())
                }
            }
        )+
    };
}

display_id!(FeatureId, RuleId, PolicyId, PolicySetId);

/// Declared type a raw input value is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    Numeric,
    String,
    Boolean,
    Date,
    List,
    /// Types this engine does not know; values pass through uncoerced.
    #[serde(other)]
    Unknown,
}

impl FeatureType {
    pub fn label(&self) -> &'static str {
        match self {
            FeatureType::Numeric => "NUMERIC",
            FeatureType::String => "STRING",
            FeatureType::Boolean => "BOOLEAN",
            FeatureType::Date => "DATE",
            FeatureType::List => "LIST",
            FeatureType::Unknown => "UNKNOWN",
        }
    }
}

/// How a feature's raw value is located inside an input document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionConfig {
    JsonPath { path: String },
    Direct { field: String },
}

/// Named, typed value derived from an input document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: FeatureId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub feature_type: FeatureType,
    pub extraction_config: ExtractionConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

/// Shape of the operand an operator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperandType {
    None,
    Single,
    List,
    Range,
}

impl OperandType {
    /// Whether `operand` has the shape this operand type requires.
    pub fn accepts(&self, operand: Option<&Value>) -> bool {
        match (self, operand) {
            (OperandType::None, None | Some(Value::Null)) => true,
            (OperandType::None, Some(_)) => false,
            (_, None | Some(Value::Null)) => false,
            (OperandType::Single, Some(value)) => !value.is_array() && !value.is_object(),
            (OperandType::List, Some(value)) => value.is_array(),
            (OperandType::Range, Some(Value::Object(map))) => {
                map.contains_key("min") && map.contains_key("max")
            }
            (OperandType::Range, Some(_)) => false,
        }
    }
}

/// Catalog entry describing a registered operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorDefinition {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub operand_type: OperandType,
    /// Empty means the operator applies to every feature type.
    #[serde(default)]
    pub compatible_feature_types: Vec<FeatureType>,
}

impl OperatorDefinition {
    pub fn supports(&self, feature_type: FeatureType) -> bool {
        self.compatible_feature_types.is_empty()
            || self.compatible_feature_types.contains(&feature_type)
    }
}

/// A feature bound to an operator and operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub feature_id: FeatureId,
    pub operator_code: String,
    #[serde(default)]
    pub operand: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

impl LogicalOperator {
    pub fn label(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Not => "NOT",
        }
    }
}

/// Decision tree node combining rules into one verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionNode {
    Leaf {
        #[serde(rename = "ruleId")]
        rule_id: RuleId,
    },
    Composite {
        operator: LogicalOperator,
        #[serde(default)]
        children: Vec<DecisionNode>,
    },
}

impl DecisionNode {
    pub fn leaf(rule_id: impl Into<String>) -> Self {
        DecisionNode::Leaf {
            rule_id: RuleId(rule_id.into()),
        }
    }

    pub fn all(children: Vec<DecisionNode>) -> Self {
        DecisionNode::Composite {
            operator: LogicalOperator::And,
            children,
        }
    }

    pub fn any(children: Vec<DecisionNode>) -> Self {
        DecisionNode::Composite {
            operator: LogicalOperator::Or,
            children,
        }
    }

    pub fn negate(child: DecisionNode) -> Self {
        DecisionNode::Composite {
            operator: LogicalOperator::Not,
            children: vec![child],
        }
    }

    /// Every rule id referenced by a leaf, in pre-order, duplicates included.
    pub fn rule_ids(&self) -> Vec<RuleId> {
        let mut ids = Vec::new();
        self.collect_rule_ids(&mut ids);
        ids
    }

    fn collect_rule_ids(&self, ids: &mut Vec<RuleId>) {
        match self {
            DecisionNode::Leaf { rule_id } => ids.push(rule_id.clone()),
            DecisionNode::Composite { children, .. } => {
                for child in children {
                    child.collect_rule_ids(ids);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    Boolean,
    Offer,
}

/// Partial set of loan terms; absent fields stay unset when applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_of_interest: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_fee: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenure: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emi: Option<f64>,
}

/// Output applied when `condition` holds, e.g. `creditScore>=750`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalOutput {
    #[serde(default)]
    pub condition: String,
    pub output: OfferFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMapping {
    #[serde(default)]
    pub default_output: OfferFields,
    #[serde(default)]
    pub conditional_outputs: Vec<ConditionalOutput>,
}

/// A named decision tree, plus an output mapping for offer policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: PolicyId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub policy_type: PolicyType,
    pub root_node: DecisionNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_mapping: Option<OutputMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationStrategy {
    #[default]
    BooleanFirst,
    OfferFirst,
    Parallel,
    /// Unrecognized strategy names; evaluated like `BooleanFirst`.
    #[serde(other)]
    Unrecognized,
}

impl EvaluationStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            EvaluationStrategy::BooleanFirst => "BOOLEAN_FIRST",
            EvaluationStrategy::OfferFirst => "OFFER_FIRST",
            EvaluationStrategy::Parallel => "PARALLEL",
            EvaluationStrategy::Unrecognized => "UNRECOGNIZED",
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Offer policy reference inside a policy set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPolicyEntry {
    pub policy_id: PolicyId,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

/// One boolean policy and prioritized offer policies under a strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySet {
    pub id: PolicySetId,
    pub name: String,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_policy_id: Option<PolicyId>,
    #[serde(default)]
    pub offer_policies: Vec<OfferPolicyEntry>,
    #[serde(default)]
    pub evaluation_strategy: EvaluationStrategy,
}

fn first_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decision_nodes_deserialize_from_tagged_json() {
        let node: DecisionNode = serde_json::from_value(json!({
            "type": "COMPOSITE",
            "operator": "AND",
            "children": [
                { "type": "LEAF", "ruleId": "r-age" },
                {
                    "type": "COMPOSITE",
                    "operator": "NOT",
                    "children": [{ "type": "LEAF", "ruleId": "r-fraud" }]
                }
            ]
        }))
        .expect("tree parses");

        assert_eq!(
            node,
            DecisionNode::all(vec![
                DecisionNode::leaf("r-age"),
                DecisionNode::negate(DecisionNode::leaf("r-fraud")),
            ])
        );
        assert_eq!(
            node.rule_ids(),
            vec![RuleId::from("r-age"), RuleId::from("r-fraud")]
        );
    }

    #[test]
    fn unknown_node_type_fails_to_parse() {
        let parsed = serde_json::from_value::<DecisionNode>(json!({
            "type": "XOR_GATE",
            "children": []
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn unknown_strategy_and_feature_type_are_tolerated() {
        let set: PolicySet = serde_json::from_value(json!({
            "id": "ps-1",
            "name": "Retail",
            "evaluationStrategy": "ROUND_ROBIN"
        }))
        .expect("policy set parses");
        assert_eq!(set.evaluation_strategy, EvaluationStrategy::Unrecognized);
        assert_eq!(set.version, 1);

        let feature_type: FeatureType =
            serde_json::from_value(json!("GEO_POINT")).expect("type parses");
        assert_eq!(feature_type, FeatureType::Unknown);
    }

    #[test]
    fn offer_entries_default_to_enabled() {
        let entry: OfferPolicyEntry =
            serde_json::from_value(json!({ "policyId": "p-offer", "priority": 3 }))
                .expect("entry parses");
        assert!(entry.enabled);
    }

    #[test]
    fn operand_shapes_follow_operand_type() {
        assert!(OperandType::None.accepts(None));
        assert!(OperandType::None.accepts(Some(&Value::Null)));
        assert!(!OperandType::None.accepts(Some(&json!(1))));
        assert!(OperandType::Single.accepts(Some(&json!(21))));
        assert!(!OperandType::Single.accepts(Some(&json!([21]))));
        assert!(OperandType::List.accepts(Some(&json!(["a", "b"]))));
        assert!(OperandType::Range.accepts(Some(&json!({ "min": 1, "max": 2 }))));
        assert!(!OperandType::Range.accepts(Some(&json!({ "min": 1 }))));
    }
}
