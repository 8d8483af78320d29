use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::error::EvaluationError;
use super::features::{ExtractedFeatures, FeatureExtractor};
use super::offer::{compute_offer, Offer};
use super::operators::OperatorCatalog;
use super::rules::{check_rule, lookup_feature, ResolvedRule, ResolvedRules};
use super::tree::{validate_tree, DecisionTreeEvaluator, NodeEvaluation};
use crate::catalog::{DefinitionStore, Feature, FeatureId, Policy, PolicyId, PolicyType, RuleId};
use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionStatus {
    Approved,
    Rejected,
}

impl DecisionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DecisionStatus::Approved => "APPROVED",
            DecisionStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, DecisionStatus::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub status: DecisionStatus,
    #[serde(default)]
    pub reasons: Vec<String>,
}

impl Decision {
    pub fn approved() -> Self {
        Self {
            status: DecisionStatus::Approved,
            reasons: Vec::new(),
        }
    }

    pub fn rejected(reasons: Vec<String>) -> Self {
        Self {
            status: DecisionStatus::Rejected,
            reasons,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status.is_approved()
    }
}

/// Result of evaluating one policy against one input document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEvaluation {
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub policy_type: PolicyType,
    pub decision: Decision,
    pub offer: Option<Offer>,
    pub extracted_features: ExtractedFeatures,
    pub tree_result: NodeEvaluation,
}

/// Resolves, extracts and evaluates a single policy.
pub struct PolicyEvaluator<'a, S: ?Sized> {
    store: &'a S,
    operators: &'a OperatorCatalog,
    config: EngineConfig,
}

impl<'a, S> PolicyEvaluator<'a, S>
where
    S: DefinitionStore + ?Sized,
{
    pub fn new(store: &'a S, operators: &'a OperatorCatalog, config: EngineConfig) -> Self {
        Self {
            store,
            operators,
            config,
        }
    }

    pub fn evaluate(
        &self,
        policy: &Policy,
        input: &Value,
    ) -> Result<PolicyEvaluation, EvaluationError> {
        validate_tree(&policy.root_node, self.config.max_tree_depth)?;

        let (rules, features) = self.resolve(policy)?;
        let extracted = FeatureExtractor.extract(&features, input)?;
        let tree_result =
            DecisionTreeEvaluator::new(&rules, self.operators).evaluate(&policy.root_node, &extracted)?;

        let decision = if tree_result.result {
            Decision::approved()
        } else {
            Decision::rejected(tree_result.leaf_failure_reasons())
        };

        let offer = match policy.policy_type {
            PolicyType::Offer if tree_result.result => {
                Some(compute_offer(policy.output_mapping.as_ref(), &extracted))
            }
            _ => None,
        };

        debug!(
            policy_id = %policy.id,
            decision = decision.status.label(),
            reasons = decision.reasons.len(),
            "policy evaluated"
        );

        Ok(PolicyEvaluation {
            policy_id: policy.id.clone(),
            policy_name: policy.name.clone(),
            policy_type: policy.policy_type,
            decision,
            offer,
            extracted_features: extracted,
            tree_result,
        })
    }

    /// Resolve every referenced rule, feature and operator once. Features
    /// come back in first-reference order without duplicates.
    fn resolve(&self, policy: &Policy) -> Result<(ResolvedRules, Vec<Feature>), EvaluationError> {
        let mut seen = HashSet::new();
        let rule_ids: Vec<RuleId> = policy
            .root_node
            .rule_ids()
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut fetched: HashMap<RuleId, _> = self
            .store
            .rules_by_ids(&rule_ids)?
            .into_iter()
            .map(|rule| (rule.id.clone(), rule))
            .collect();

        let mut resolved = ResolvedRules::with_capacity(rule_ids.len());
        let mut features: Vec<Feature> = Vec::new();
        let mut feature_cache: HashMap<FeatureId, Feature> = HashMap::new();

        for rule_id in rule_ids {
            let rule = fetched
                .remove(&rule_id)
                .ok_or_else(|| EvaluationError::not_found("rule", &rule_id))?;

            let feature = match feature_cache.get(&rule.feature_id) {
                Some(feature) => feature.clone(),
                None => {
                    let feature = lookup_feature(self.store, &rule.feature_id)?;
                    feature_cache.insert(rule.feature_id.clone(), feature.clone());
                    if !features.iter().any(|known| known.id == feature.id) {
                        features.push(feature.clone());
                    }
                    feature
                }
            };

            let operator = self
                .store
                .operator(&rule.operator_code)?
                .ok_or_else(|| EvaluationError::not_found("operator", &rule.operator_code))?;

            check_rule(&rule, &feature, &operator, self.operators).map_err(|reason| {
                EvaluationError::InvalidRule {
                    rule: rule.name.clone(),
                    reason,
                }
            })?;

            resolved.insert(
                rule_id,
                ResolvedRule { rule, feature },
            );
        }

        Ok((resolved, features))
    }
}
