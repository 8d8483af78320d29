use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::domain::{
    Feature, FeatureId, OperatorDefinition, Policy, PolicyId, PolicySet, PolicySetId, Rule,
    RuleId,
};

/// Read-only lookup of already-validated definitions.
pub trait DefinitionStore: Send + Sync {
    fn feature(&self, id: &FeatureId) -> Result<Option<Feature>, RepositoryError>;
    fn feature_by_name(&self, name: &str) -> Result<Option<Feature>, RepositoryError>;
    fn rule(&self, id: &RuleId) -> Result<Option<Rule>, RepositoryError>;
    /// Rules for the given ids; unknown ids are simply absent from the result.
    fn rules_by_ids(&self, ids: &[RuleId]) -> Result<Vec<Rule>, RepositoryError>;
    fn operator(&self, code: &str) -> Result<Option<OperatorDefinition>, RepositoryError>;
    fn policy(&self, id: &PolicyId) -> Result<Option<Policy>, RepositoryError>;
    fn policy_set(&self, id: &PolicySetId) -> Result<Option<PolicySet>, RepositoryError>;
}

/// Error enumeration for definition store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("definition store unavailable: {0}")]
    Unavailable(String),
}

/// Audit sink for policy set evaluations. Writes are best effort.
pub trait ExecutionLogSink: Send + Sync {
    fn append(&self, record: ExecutionLogRecord) -> Result<(), LogSinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LogSinkError {
    #[error("execution log unavailable: {0}")]
    Unavailable(String),
    #[error("execution log rejected record: {0}")]
    Rejected(String),
}

/// Audit record of one policy set evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogRecord {
    pub id: Uuid,
    pub policy_set_id: PolicySetId,
    pub policy_set_version: u32,
    pub input_data: Value,
    pub extracted_features: Value,
    pub boolean_policy_result: Value,
    pub offer_policy_result: Value,
    pub decision_status: String,
    pub execution_time_ms: u64,
    pub executed_at: DateTime<Utc>,
}
