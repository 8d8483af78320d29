use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::response::Response;
use serde_json::{json, Value};

use crate::catalog::{
    CatalogDocument, DefinitionStore, ExecutionLogRecord, ExecutionLogSink, Feature, FeatureId,
    InMemoryDefinitionStore, InMemoryExecutionLog, LogSinkError, OperatorDefinition, Policy,
    PolicyId, PolicySet, PolicySetId, RepositoryError, Rule, RuleId,
};
use crate::config::EngineConfig;
use crate::service::PolicyEngine;

/// Loan catalog: an eligibility policy, three offer policies and policy sets
/// for every strategy.
pub(super) fn loan_catalog() -> Value {
    json!({
        "features": [
            {
                "id": "f-age",
                "name": "age",
                "featureType": "NUMERIC",
                "extractionConfig": { "type": "DIRECT", "field": "age" }
            },
            {
                "id": "f-credit-score",
                "name": "creditScore",
                "featureType": "NUMERIC",
                "extractionConfig": { "type": "DIRECT", "field": "creditScore" }
            },
            {
                "id": "f-income",
                "name": "monthlyIncome",
                "featureType": "NUMERIC",
                "extractionConfig": { "type": "JSON_PATH", "path": "$.applicant.income.monthly" },
                "defaultValue": 0
            },
            {
                "id": "f-employment",
                "name": "employmentType",
                "featureType": "STRING",
                "extractionConfig": { "type": "JSON_PATH", "path": "$.applicant.employment.type" }
            },
            {
                "id": "f-flags",
                "name": "riskFlags",
                "featureType": "LIST",
                "extractionConfig": { "type": "DIRECT", "field": "riskFlags" },
                "defaultValue": []
            }
        ],
        "rules": [
            { "id": "r-adult", "name": "Adult applicant", "featureId": "f-age", "operatorCode": "GTE", "operand": 21 },
            { "id": "r-score", "name": "Minimum credit score", "featureId": "f-credit-score", "operatorCode": "GTE", "operand": 650 },
            { "id": "r-prime", "name": "Prime credit score", "featureId": "f-credit-score", "operatorCode": "GTE", "operand": 750 },
            { "id": "r-income", "name": "Minimum income", "featureId": "f-income", "operatorCode": "GTE", "operand": 25000 },
            { "id": "r-salaried", "name": "Salaried employment", "featureId": "f-employment", "operatorCode": "IN", "operand": ["SALARIED", "GOVERNMENT"] },
            { "id": "r-clean", "name": "No risk flags", "featureId": "f-flags", "operatorCode": "IS_EMPTY" }
        ],
        "policies": [
            {
                "id": "p-eligibility",
                "name": "Basic eligibility",
                "policyType": "BOOLEAN",
                "rootNode": {
                    "type": "COMPOSITE",
                    "operator": "AND",
                    "children": [
                        { "type": "LEAF", "ruleId": "r-adult" },
                        { "type": "LEAF", "ruleId": "r-score" }
                    ]
                }
            },
            {
                "id": "p-prime-offer",
                "name": "Prime offer",
                "policyType": "OFFER",
                "rootNode": { "type": "LEAF", "ruleId": "r-prime" },
                "outputMapping": {
                    "defaultOutput": { "loanAmount": 500000, "rateOfInterest": 10.5, "tenure": 60 }
                }
            },
            {
                "id": "p-standard-offer",
                "name": "Standard offer",
                "policyType": "OFFER",
                "rootNode": { "type": "LEAF", "ruleId": "r-score" },
                "outputMapping": {
                    "defaultOutput": { "loanAmount": 200000, "rateOfInterest": 13.0, "tenure": 36 },
                    "conditionalOutputs": [
                        { "condition": "creditScore>=720", "output": { "loanAmount": 300000, "rateOfInterest": 12.0 } },
                        { "condition": "creditScore>=700", "output": { "loanAmount": 250000 } }
                    ]
                }
            },
            {
                "id": "p-salaried-offer",
                "name": "Salaried offer",
                "policyType": "OFFER",
                "rootNode": { "type": "LEAF", "ruleId": "r-salaried" },
                "outputMapping": {
                    "defaultOutput": { "loanAmount": 150000, "rateOfInterest": 14.0, "tenure": 24 }
                }
            }
        ],
        "policySets": [
            policy_set_json("ps-boolean-first", "BOOLEAN_FIRST"),
            policy_set_json("ps-offer-first", "OFFER_FIRST"),
            policy_set_json("ps-parallel", "PARALLEL"),
            {
                "id": "ps-offers-only",
                "name": "Offers only",
                "version": 2,
                "offerPolicies": [
                    { "policyId": "p-standard-offer", "priority": 1 },
                    { "policyId": "p-prime-offer", "priority": 5 }
                ],
                "evaluationStrategy": "BOOLEAN_FIRST"
            }
        ]
    })
}

fn policy_set_json(id: &str, strategy: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Retail lending {strategy}"),
        "version": 3,
        "booleanPolicyId": "p-eligibility",
        "offerPolicies": [
            { "policyId": "p-standard-offer", "priority": 2 },
            { "policyId": "p-prime-offer", "priority": 3 },
            { "policyId": "p-salaried-offer", "priority": 1 }
        ],
        "evaluationStrategy": strategy
    })
}

pub(super) fn loan_document() -> CatalogDocument {
    serde_json::from_value(loan_catalog()).expect("catalog fixture parses")
}

pub(super) fn loan_store() -> InMemoryDefinitionStore {
    InMemoryDefinitionStore::from_document(loan_document()).expect("catalog fixture loads")
}

pub(super) fn store_with(edit: impl FnOnce(&mut CatalogDocument)) -> InMemoryDefinitionStore {
    let mut document = loan_document();
    edit(&mut document);
    InMemoryDefinitionStore::from_document(document).expect("edited catalog loads")
}

pub(super) fn applicant(age: i64, credit_score: i64) -> Value {
    json!({
        "age": age,
        "creditScore": credit_score,
        "applicant": {
            "income": { "monthly": 48000 },
            "employment": { "type": "SALARIED" }
        }
    })
}

pub(super) fn build_engine() -> (
    PolicyEngine<InMemoryDefinitionStore, InMemoryExecutionLog>,
    Arc<InMemoryExecutionLog>,
) {
    engine_with_store(loan_store())
}

pub(super) fn engine_with_store(
    store: InMemoryDefinitionStore,
) -> (
    PolicyEngine<InMemoryDefinitionStore, InMemoryExecutionLog>,
    Arc<InMemoryExecutionLog>,
) {
    let log = Arc::new(InMemoryExecutionLog::default());
    let engine = PolicyEngine::new(Arc::new(store), log.clone(), EngineConfig::default());
    (engine, log)
}

pub(super) fn policy(store: &InMemoryDefinitionStore, id: &str) -> Policy {
    store
        .policy(&PolicyId::from(id))
        .expect("lookup succeeds")
        .expect("policy fixture present")
}

/// Execution log that refuses every record.
#[derive(Default)]
pub(super) struct FailingLog {
    pub(super) attempts: AtomicUsize,
}

impl ExecutionLogSink for FailingLog {
    fn append(&self, _record: ExecutionLogRecord) -> Result<(), LogSinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LogSinkError::Unavailable("audit database offline".to_string()))
    }
}

/// Store wrapper counting lookups so tests can assert single resolution.
pub(super) struct CountingStore {
    inner: InMemoryDefinitionStore,
    pub(super) rule_batches: AtomicUsize,
    pub(super) single_rule_lookups: AtomicUsize,
    pub(super) feature_lookups: AtomicUsize,
}

impl CountingStore {
    pub(super) fn new(inner: InMemoryDefinitionStore) -> Self {
        Self {
            inner,
            rule_batches: AtomicUsize::new(0),
            single_rule_lookups: AtomicUsize::new(0),
            feature_lookups: AtomicUsize::new(0),
        }
    }
}

impl DefinitionStore for CountingStore {
    fn feature(&self, id: &FeatureId) -> Result<Option<Feature>, RepositoryError> {
        self.feature_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.feature(id)
    }

    fn feature_by_name(&self, name: &str) -> Result<Option<Feature>, RepositoryError> {
        self.feature_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.feature_by_name(name)
    }

    fn rule(&self, id: &RuleId) -> Result<Option<Rule>, RepositoryError> {
        self.single_rule_lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.rule(id)
    }

    fn rules_by_ids(&self, ids: &[RuleId]) -> Result<Vec<Rule>, RepositoryError> {
        self.rule_batches.fetch_add(1, Ordering::SeqCst);
        self.inner.rules_by_ids(ids)
    }

    fn operator(&self, code: &str) -> Result<Option<OperatorDefinition>, RepositoryError> {
        self.inner.operator(code)
    }

    fn policy(&self, id: &PolicyId) -> Result<Option<Policy>, RepositoryError> {
        self.inner.policy(id)
    }

    fn policy_set(&self, id: &PolicySetId) -> Result<Option<PolicySet>, RepositoryError> {
        self.inner.policy_set(id)
    }
}

pub(super) struct UnavailableStore;

impl DefinitionStore for UnavailableStore {
    fn feature(&self, _id: &FeatureId) -> Result<Option<Feature>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn feature_by_name(&self, _name: &str) -> Result<Option<Feature>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn rule(&self, _id: &RuleId) -> Result<Option<Rule>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn rules_by_ids(&self, _ids: &[RuleId]) -> Result<Vec<Rule>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn operator(&self, _code: &str) -> Result<Option<OperatorDefinition>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn policy(&self, _id: &PolicyId) -> Result<Option<Policy>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn policy_set(&self, _id: &PolicySetId) -> Result<Option<PolicySet>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
