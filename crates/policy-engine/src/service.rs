use std::sync::Arc;

use serde_json::Value;

use crate::catalog::{DefinitionStore, ExecutionLogSink, PolicyId, PolicySetId, RuleId};
use crate::config::EngineConfig;
use crate::evaluation::rule_test::run_rule_test;
use crate::evaluation::{
    EvaluationError, OperatorCatalog, PolicyEvaluation, PolicyEvaluator, PolicySetOrchestrator,
    RuleTestOutcome, UnifiedEvaluation,
};

/// Facade exposing policy, policy set and rule evaluation over shared
/// definitions and an execution log.
pub struct PolicyEngine<S, L> {
    store: Arc<S>,
    execution_log: Arc<L>,
    operators: Arc<OperatorCatalog>,
    config: EngineConfig,
}

impl<S, L> PolicyEngine<S, L>
where
    S: DefinitionStore + 'static,
    L: ExecutionLogSink + 'static,
{
    pub fn new(store: Arc<S>, execution_log: Arc<L>, config: EngineConfig) -> Self {
        Self::with_operators(store, execution_log, OperatorCatalog::builtin(), config)
    }

    pub fn with_operators(
        store: Arc<S>,
        execution_log: Arc<L>,
        operators: OperatorCatalog,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            execution_log,
            operators: Arc::new(operators),
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Decision, offer, extracted features and tree trace for one policy.
    pub fn evaluate_policy(
        &self,
        policy_id: &PolicyId,
        input: &Value,
    ) -> Result<PolicyEvaluation, EvaluationError> {
        let policy = self
            .store
            .policy(policy_id)?
            .ok_or_else(|| EvaluationError::not_found("policy", policy_id))?;

        PolicyEvaluator::new(self.store.as_ref(), &self.operators, self.config)
            .evaluate(&policy, input)
    }

    /// Unified decision and selected offer for a policy set. The detailed
    /// sub-results are written to the execution log.
    pub fn evaluate_policy_set(
        &self,
        policy_set_id: &PolicySetId,
        input: &Value,
    ) -> Result<UnifiedEvaluation, EvaluationError> {
        let policy_set = self
            .store
            .policy_set(policy_set_id)?
            .ok_or_else(|| EvaluationError::not_found("policy set", policy_set_id))?;

        PolicySetOrchestrator::new(
            self.store.as_ref(),
            self.execution_log.as_ref(),
            &self.operators,
            self.config,
        )
        .evaluate(&policy_set, input)
    }

    /// Evaluate one rule in isolation. Only an unknown rule id is an error.
    pub fn test_rule(
        &self,
        rule_id: &RuleId,
        input: &Value,
    ) -> Result<RuleTestOutcome, EvaluationError> {
        let rule = self
            .store
            .rule(rule_id)?
            .ok_or_else(|| EvaluationError::not_found("rule", rule_id))?;

        Ok(run_rule_test(
            self.store.as_ref(),
            &self.operators,
            rule,
            input,
        ))
    }
}
