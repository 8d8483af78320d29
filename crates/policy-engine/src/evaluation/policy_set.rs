use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::EvaluationError;
use super::features::ExtractedFeatures;
use super::offer::Offer;
use super::operators::OperatorCatalog;
use super::policy::{Decision, DecisionStatus, PolicyEvaluation, PolicyEvaluator};
use crate::catalog::{
    DefinitionStore, EvaluationStrategy, ExecutionLogRecord, ExecutionLogSink, Policy, PolicyId,
    PolicySet, PolicySetId, PolicyType,
};
use crate::config::EngineConfig;

pub const NO_DECISION_REASON: &str = "No policy in the set produced a decision";

/// Caller-facing policy set result. `details` feeds the execution log only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnifiedEvaluation {
    pub decision: Decision,
    pub offer: Option<Offer>,
    #[serde(skip)]
    pub details: EvaluationDetails,
}

/// Sub-results and offer selection metadata of a policy set evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDetails {
    pub policy_set_id: PolicySetId,
    pub policy_set_name: String,
    pub strategy: EvaluationStrategy,
    pub boolean_result: Option<PolicyEvaluation>,
    pub offer_result: Option<PolicyEvaluation>,
    pub selected_offer_policy_name: Option<String>,
    pub selected_offer_policy_priority: Option<i32>,
    pub all_offer_results: Vec<OfferSummary>,
    pub offer_failures: Vec<OfferFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferSummary {
    pub policy_name: String,
    pub priority: i32,
    pub status: DecisionStatus,
    pub offer: Option<Offer>,
}

/// An offer policy that could not be evaluated and was skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferFailure {
    pub policy_id: PolicyId,
    pub priority: i32,
    pub error: String,
}

#[derive(Debug, Clone)]
struct RankedOffer {
    priority: i32,
    evaluation: PolicyEvaluation,
}

/// Offer sub-evaluation: results ranked by priority plus captured failures.
#[derive(Debug, Clone, Default)]
struct OfferRound {
    ranked: Vec<RankedOffer>,
    selected: Option<usize>,
    failures: Vec<OfferFailure>,
}

impl OfferRound {
    fn selected(&self) -> Option<&RankedOffer> {
        self.selected.and_then(|index| self.ranked.get(index))
    }

    fn selected_decision(&self) -> Option<&Decision> {
        self.selected().map(|ranked| &ranked.evaluation.decision)
    }
}

/// What a strategy decided, before the offer is attached.
struct StrategyOutcome {
    decision: Option<Decision>,
    boolean: Option<PolicyEvaluation>,
    offers: OfferRound,
    /// PARALLEL only attaches an offer behind an approving boolean policy.
    offer_requires_boolean: bool,
}

/// Combines a boolean policy and prioritized offer policies.
pub struct PolicySetOrchestrator<'a, S: ?Sized, L: ?Sized> {
    store: &'a S,
    sink: &'a L,
    operators: &'a OperatorCatalog,
    config: EngineConfig,
}

impl<'a, S, L> PolicySetOrchestrator<'a, S, L>
where
    S: DefinitionStore + ?Sized,
    L: ExecutionLogSink + ?Sized,
{
    pub fn new(
        store: &'a S,
        sink: &'a L,
        operators: &'a OperatorCatalog,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            sink,
            operators,
            config,
        }
    }

    pub fn evaluate(
        &self,
        policy_set: &PolicySet,
        input: &Value,
    ) -> Result<UnifiedEvaluation, EvaluationError> {
        let started = Instant::now();

        let outcome = match policy_set.evaluation_strategy {
            EvaluationStrategy::OfferFirst => self.offer_first(policy_set, input)?,
            EvaluationStrategy::Parallel => self.parallel(policy_set, input)?,
            EvaluationStrategy::BooleanFirst | EvaluationStrategy::Unrecognized => {
                self.boolean_first(policy_set, input)?
            }
        };

        let evaluation = assemble(policy_set, outcome);
        info!(
            policy_set_id = %policy_set.id,
            strategy = policy_set.evaluation_strategy.label(),
            decision = evaluation.decision.status.label(),
            offer = evaluation.offer.is_some(),
            "policy set evaluated"
        );

        let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.record_execution(policy_set, input, &evaluation, elapsed);

        Ok(evaluation)
    }

    fn boolean_first(
        &self,
        policy_set: &PolicySet,
        input: &Value,
    ) -> Result<StrategyOutcome, EvaluationError> {
        match self.evaluate_boolean(policy_set, input)? {
            Some(boolean) => {
                let offers = if boolean.decision.is_approved() {
                    self.evaluate_offers(policy_set, input)
                } else {
                    OfferRound::default()
                };
                Ok(StrategyOutcome {
                    decision: Some(boolean.decision.clone()),
                    boolean: Some(boolean),
                    offers,
                    offer_requires_boolean: false,
                })
            }
            None => {
                let offers = self.evaluate_offers(policy_set, input);
                Ok(StrategyOutcome {
                    decision: offers.selected_decision().cloned(),
                    boolean: None,
                    offers,
                    offer_requires_boolean: false,
                })
            }
        }
    }

    /// An approved offer can still be overturned by a rejecting boolean policy.
    fn offer_first(
        &self,
        policy_set: &PolicySet,
        input: &Value,
    ) -> Result<StrategyOutcome, EvaluationError> {
        let offers = self.evaluate_offers(policy_set, input);
        let boolean = self.evaluate_boolean(policy_set, input)?;

        let decision = match &boolean {
            Some(boolean) => Some(boolean.decision.clone()),
            None => offers.selected_decision().cloned(),
        };

        Ok(StrategyOutcome {
            decision,
            boolean,
            offers,
            offer_requires_boolean: false,
        })
    }

    /// Boolean and offer evaluations do not depend on each other; both always
    /// run unless the boolean policy itself fails.
    fn parallel(
        &self,
        policy_set: &PolicySet,
        input: &Value,
    ) -> Result<StrategyOutcome, EvaluationError> {
        let boolean = self.evaluate_boolean(policy_set, input)?;
        let offers = self.evaluate_offers(policy_set, input);

        let decision = match &boolean {
            Some(boolean) => Some(boolean.decision.clone()),
            None => offers.selected_decision().cloned(),
        };

        Ok(StrategyOutcome {
            decision,
            boolean,
            offers,
            offer_requires_boolean: true,
        })
    }

    fn evaluate_boolean(
        &self,
        policy_set: &PolicySet,
        input: &Value,
    ) -> Result<Option<PolicyEvaluation>, EvaluationError> {
        let Some(policy_id) = &policy_set.boolean_policy_id else {
            return Ok(None);
        };
        let policy = self.load_policy(policy_id, PolicyType::Boolean)?;
        self.policy_evaluator().evaluate(&policy, input).map(Some)
    }

    /// Evaluate every enabled offer policy. Failures are captured per policy
    /// and never abort the round.
    fn evaluate_offers(&self, policy_set: &PolicySet, input: &Value) -> OfferRound {
        let evaluator = self.policy_evaluator();
        let mut round = OfferRound::default();

        for entry in policy_set.offer_policies.iter().filter(|entry| entry.enabled) {
            let evaluated = self
                .load_policy(&entry.policy_id, PolicyType::Offer)
                .and_then(|policy| evaluator.evaluate(&policy, input));

            match evaluated {
                Ok(evaluation) => round.ranked.push(RankedOffer {
                    priority: entry.priority,
                    evaluation,
                }),
                Err(err) => {
                    warn!(
                        policy_set_id = %policy_set.id,
                        policy_id = %entry.policy_id,
                        error = %err,
                        "offer policy evaluation failed; skipping"
                    );
                    round.failures.push(OfferFailure {
                        policy_id: entry.policy_id.clone(),
                        priority: entry.priority,
                        error: err.to_string(),
                    });
                }
            }
        }

        // Stable: equal priorities keep their configured order.
        round
            .ranked
            .sort_by(|left, right| right.priority.cmp(&left.priority));

        round.selected = round
            .ranked
            .iter()
            .position(|ranked| {
                ranked.evaluation.decision.is_approved()
                    && ranked
                        .evaluation
                        .offer
                        .as_ref()
                        .map_or(false, |offer| !offer.is_empty())
            })
            .or((!round.ranked.is_empty()).then_some(0));

        debug!(
            policy_set_id = %policy_set.id,
            evaluated = round.ranked.len(),
            failed = round.failures.len(),
            "offer policies evaluated"
        );
        round
    }

    fn load_policy(&self, id: &PolicyId, expected: PolicyType) -> Result<Policy, EvaluationError> {
        let policy = self
            .store
            .policy(id)?
            .ok_or_else(|| EvaluationError::not_found("policy", id))?;
        if policy.policy_type != expected {
            return Err(EvaluationError::InvalidPolicy {
                policy: policy.name,
                reason: format!("expected a {expected:?} policy, found {:?}", policy.policy_type),
            });
        }
        Ok(policy)
    }

    fn policy_evaluator(&self) -> PolicyEvaluator<'a, S> {
        PolicyEvaluator::new(self.store, self.operators, self.config)
    }

    /// Best effort: failures are logged and never reach the caller.
    fn record_execution(
        &self,
        policy_set: &PolicySet,
        input: &Value,
        evaluation: &UnifiedEvaluation,
        execution_time_ms: u64,
    ) {
        let details = &evaluation.details;
        let mut features = ExtractedFeatures::new();
        for result in [&details.boolean_result, &details.offer_result]
            .into_iter()
            .flatten()
        {
            features.extend(result.extracted_features.clone());
        }

        let record = ExecutionLogRecord {
            id: Uuid::new_v4(),
            policy_set_id: policy_set.id.clone(),
            policy_set_version: policy_set.version,
            input_data: input.clone(),
            extracted_features: to_json_or_null("extractedFeatures", &features),
            boolean_policy_result: to_json_or_null("booleanPolicyResult", &details.boolean_result),
            offer_policy_result: to_json_or_null("offerPolicyResult", &details.offer_result),
            decision_status: evaluation.decision.status.label().to_string(),
            execution_time_ms,
            executed_at: Utc::now(),
        };

        match self.sink.append(record) {
            Ok(()) => debug!(
                policy_set_id = %policy_set.id,
                decision = evaluation.decision.status.label(),
                "execution logged"
            ),
            Err(err) => error!(
                policy_set_id = %policy_set.id,
                error = %err,
                "failed to log policy set execution"
            ),
        }
    }
}

fn to_json_or_null<T: Serialize>(field: &'static str, value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        warn!(field, error = %err, "failed to serialize execution log field");
        Value::Null
    })
}

fn assemble(policy_set: &PolicySet, outcome: StrategyOutcome) -> UnifiedEvaluation {
    let StrategyOutcome {
        decision,
        boolean,
        offers,
        offer_requires_boolean,
    } = outcome;

    let decision = decision.unwrap_or_else(|| Decision::rejected(vec![NO_DECISION_REASON.to_string()]));

    let boolean_gate = !offer_requires_boolean
        || boolean
            .as_ref()
            .map_or(false, |boolean| boolean.decision.is_approved());

    let selected = offers.selected();
    let offer = if decision.is_approved() && boolean_gate {
        selected
            .and_then(|ranked| ranked.evaluation.offer.clone())
            .filter(|offer| !offer.is_empty())
    } else {
        None
    };

    let details = EvaluationDetails {
        policy_set_id: policy_set.id.clone(),
        policy_set_name: policy_set.name.clone(),
        strategy: policy_set.evaluation_strategy,
        selected_offer_policy_name: selected.map(|ranked| ranked.evaluation.policy_name.clone()),
        selected_offer_policy_priority: selected.map(|ranked| ranked.priority),
        offer_result: selected.map(|ranked| ranked.evaluation.clone()),
        all_offer_results: offers
            .ranked
            .iter()
            .map(|ranked| OfferSummary {
                policy_name: ranked.evaluation.policy_name.clone(),
                priority: ranked.priority,
                status: ranked.evaluation.decision.status,
                offer: ranked.evaluation.offer.clone(),
            })
            .collect(),
        offer_failures: offers.failures,
        boolean_result: boolean,
    };

    UnifiedEvaluation {
        decision,
        offer,
        details,
    }
}
