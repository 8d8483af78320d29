use serde::Serialize;
use serde_json::Value;

use super::error::TreeError;
use super::features::ExtractedFeatures;
use super::operators::OperatorCatalog;
use super::rules::{render_operand, ResolvedRules, RuleEvaluator};
use super::value::FeatureValue;
use crate::catalog::{DecisionNode, LogicalOperator, RuleId};

/// Evaluation record of one tree node, children included.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEvaluation {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(flatten)]
    pub detail: NodeDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "nodeType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeDetail {
    #[serde(rename_all = "camelCase")]
    Leaf {
        rule_id: RuleId,
        rule_name: String,
        feature_name: String,
        feature_value: FeatureValue,
        operator_code: String,
        operand: Option<Value>,
    },
    #[serde(rename_all = "camelCase")]
    Composite {
        operator: LogicalOperator,
        child_results: Vec<NodeEvaluation>,
    },
}

impl NodeEvaluation {
    /// Failure reasons of failing leaves, depth first in pre-order.
    pub fn leaf_failure_reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        self.collect_leaf_reasons(&mut reasons);
        reasons
    }

    fn collect_leaf_reasons(&self, reasons: &mut Vec<String>) {
        match &self.detail {
            NodeDetail::Leaf { .. } => {
                if let Some(reason) = &self.failure_reason {
                    reasons.push(reason.clone());
                }
            }
            NodeDetail::Composite { child_results, .. } => {
                for child in child_results {
                    child.collect_leaf_reasons(reasons);
                }
            }
        }
    }
}

/// Check tree shape and depth, reporting every problem at once.
pub fn validate_tree(node: &DecisionNode, max_depth: usize) -> Result<(), TreeError> {
    let mut problems = Vec::new();
    collect_problems(node, "root", 1, max_depth, &mut problems);
    if problems.is_empty() {
        Ok(())
    } else {
        Err(TreeError::Malformed(problems))
    }
}

fn collect_problems(
    node: &DecisionNode,
    location: &str,
    depth: usize,
    max_depth: usize,
    problems: &mut Vec<String>,
) {
    if depth > max_depth {
        problems.push(format!(
            "{location}: tree exceeds the maximum depth of {max_depth}"
        ));
        return;
    }

    if let DecisionNode::Composite { operator, children } = node {
        if let Some(problem) = shape_problem(*operator, children.len()) {
            problems.push(format!("{location}: {problem}"));
        }
        for (index, child) in children.iter().enumerate() {
            let child_location = format!("{location}.children[{index}]");
            collect_problems(child, &child_location, depth + 1, max_depth, problems);
        }
    }
}

fn shape_problem(operator: LogicalOperator, children: usize) -> Option<String> {
    match operator {
        LogicalOperator::Not if children != 1 => Some(format!(
            "NOT requires exactly one child (found {children})"
        )),
        _ if children == 0 => Some(format!("{} requires at least one child", operator.label())),
        _ => None,
    }
}

/// Recursive evaluator over a resolved rule snapshot. Composite nodes
/// evaluate every child so the trace is complete.
pub struct DecisionTreeEvaluator<'a> {
    rules: &'a ResolvedRules,
    evaluator: RuleEvaluator<'a>,
}

impl<'a> DecisionTreeEvaluator<'a> {
    pub fn new(rules: &'a ResolvedRules, operators: &'a OperatorCatalog) -> Self {
        Self {
            rules,
            evaluator: RuleEvaluator::new(operators),
        }
    }

    pub fn evaluate(
        &self,
        node: &DecisionNode,
        features: &ExtractedFeatures,
    ) -> Result<NodeEvaluation, TreeError> {
        match node {
            DecisionNode::Leaf { rule_id } => self.evaluate_leaf(rule_id, features),
            DecisionNode::Composite { operator, children } => {
                self.evaluate_composite(*operator, children, features)
            }
        }
    }

    fn evaluate_leaf(
        &self,
        rule_id: &RuleId,
        features: &ExtractedFeatures,
    ) -> Result<NodeEvaluation, TreeError> {
        let resolved = self
            .rules
            .get(rule_id)
            .ok_or_else(|| TreeError::UnresolvedRule(rule_id.clone()))?;
        let rule = &resolved.rule;
        let feature_value = features
            .get(&resolved.feature.name)
            .cloned()
            .unwrap_or(FeatureValue::Null);

        let result = self
            .evaluator
            .evaluate(rule, &feature_value)
            .map_err(|source| TreeError::Rule {
                rule: rule.name.clone(),
                source,
            })?;

        let failure_reason = (!result).then(|| {
            format!(
                "Rule '{}' failed: {} {} {} = false",
                rule.name,
                feature_value,
                rule.operator_code,
                render_operand(rule.operand.as_ref())
            )
        });

        Ok(NodeEvaluation {
            result,
            failure_reason,
            detail: NodeDetail::Leaf {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                feature_name: resolved.feature.name.clone(),
                feature_value,
                operator_code: rule.operator_code.clone(),
                operand: rule.operand.clone(),
            },
        })
    }

    fn evaluate_composite(
        &self,
        operator: LogicalOperator,
        children: &[DecisionNode],
        features: &ExtractedFeatures,
    ) -> Result<NodeEvaluation, TreeError> {
        if let Some(problem) = shape_problem(operator, children.len()) {
            return Err(TreeError::Malformed(vec![problem]));
        }

        let child_results = children
            .iter()
            .map(|child| self.evaluate(child, features))
            .collect::<Result<Vec<_>, _>>()?;

        let child_reasons = || {
            child_results
                .iter()
                .filter_map(|child| child.failure_reason.as_deref())
                .collect::<Vec<_>>()
                .join("; ")
        };

        let (result, failure_reason) = match operator {
            LogicalOperator::And => {
                let result = child_results.iter().all(|child| child.result);
                (result, (!result).then(child_reasons))
            }
            LogicalOperator::Or => {
                let result = child_results.iter().any(|child| child.result);
                let reason = (!result).then(|| format!("All OR conditions failed: {}", child_reasons()));
                (result, reason)
            }
            LogicalOperator::Not => {
                let result = !child_results[0].result;
                let reason = (!result)
                    .then(|| "NOT condition failed: inner condition was true".to_string());
                (result, reason)
            }
        };

        Ok(NodeEvaluation {
            result,
            failure_reason,
            detail: NodeDetail::Composite {
                operator,
                child_results,
            },
        })
    }
}
