use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{
    Feature, FeatureId, OperatorDefinition, Policy, PolicyId, PolicySet, PolicySetId, Rule,
    RuleId,
};
use super::repository::{
    DefinitionStore, ExecutionLogRecord, ExecutionLogSink, LogSinkError, RepositoryError,
};
use crate::config::DEFAULT_EXECUTION_LOG_CAPACITY;
use crate::evaluation::operators::OperatorCatalog;

/// Serialized catalog of definitions, as loaded from disk or a request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub operators: Vec<OperatorDefinition>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub policy_sets: Vec<PolicySet>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate {kind} '{key}' in catalog")]
    Duplicate { kind: &'static str, key: String },
}

/// Immutable in-memory definition store.
#[derive(Debug, Default)]
pub struct InMemoryDefinitionStore {
    features: HashMap<FeatureId, Feature>,
    feature_names: HashMap<String, FeatureId>,
    operators: HashMap<String, OperatorDefinition>,
    rules: HashMap<RuleId, Rule>,
    policies: HashMap<PolicyId, Policy>,
    policy_sets: HashMap<PolicySetId, PolicySet>,
}

impl InMemoryDefinitionStore {
    /// Index a catalog document. Built-in operator definitions are used when
    /// the document lists none.
    pub fn from_document(document: CatalogDocument) -> Result<Self, CatalogLoadError> {
        let mut store = Self::default();

        for feature in document.features {
            if store.feature_names.contains_key(&feature.name) {
                return Err(CatalogLoadError::Duplicate {
                    kind: "feature name",
                    key: feature.name,
                });
            }
            store
                .feature_names
                .insert(feature.name.clone(), feature.id.clone());
            insert_unique(&mut store.features, feature.id.clone(), feature, "feature")?;
        }

        let operators = if document.operators.is_empty() {
            OperatorCatalog::definitions()
        } else {
            document.operators
        };
        for operator in operators {
            insert_unique(
                &mut store.operators,
                operator.code.clone(),
                operator,
                "operator",
            )?;
        }

        for rule in document.rules {
            insert_unique(&mut store.rules, rule.id.clone(), rule, "rule")?;
        }
        for policy in document.policies {
            insert_unique(&mut store.policies, policy.id.clone(), policy, "policy")?;
        }
        for policy_set in document.policy_sets {
            insert_unique(
                &mut store.policy_sets,
                policy_set.id.clone(),
                policy_set,
                "policy set",
            )?;
        }

        debug!(
            features = store.features.len(),
            operators = store.operators.len(),
            rules = store.rules.len(),
            policies = store.policies.len(),
            policy_sets = store.policy_sets.len(),
            "definition catalog indexed"
        );

        Ok(store)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogLoadError> {
        let document: CatalogDocument = serde_json::from_str(raw)?;
        Self::from_document(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn policy_ids(&self) -> Vec<PolicyId> {
        let mut ids: Vec<PolicyId> = self.policies.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn policy_set_ids(&self) -> Vec<PolicySetId> {
        let mut ids: Vec<PolicySetId> = self.policy_sets.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn insert_unique<K, V>(
    map: &mut HashMap<K, V>,
    key: K,
    value: V,
    kind: &'static str,
) -> Result<(), CatalogLoadError>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
{
    if map.contains_key(&key) {
        return Err(CatalogLoadError::Duplicate {
            kind,
            key: key.to_string(),
        });
    }
    map.insert(key, value);
    Ok(())
}

impl DefinitionStore for InMemoryDefinitionStore {
    fn feature(&self, id: &FeatureId) -> Result<Option<Feature>, RepositoryError> {
        Ok(self.features.get(id).cloned())
    }

    fn feature_by_name(&self, name: &str) -> Result<Option<Feature>, RepositoryError> {
        Ok(self
            .feature_names
            .get(name)
            .and_then(|id| self.features.get(id))
            .cloned())
    }

    fn rule(&self, id: &RuleId) -> Result<Option<Rule>, RepositoryError> {
        Ok(self.rules.get(id).cloned())
    }

    fn rules_by_ids(&self, ids: &[RuleId]) -> Result<Vec<Rule>, RepositoryError> {
        Ok(ids.iter().filter_map(|id| self.rules.get(id).cloned()).collect())
    }

    fn operator(&self, code: &str) -> Result<Option<OperatorDefinition>, RepositoryError> {
        Ok(self.operators.get(code).cloned())
    }

    fn policy(&self, id: &PolicyId) -> Result<Option<Policy>, RepositoryError> {
        Ok(self.policies.get(id).cloned())
    }

    fn policy_set(&self, id: &PolicySetId) -> Result<Option<PolicySet>, RepositoryError> {
        Ok(self.policy_sets.get(id).cloned())
    }
}

/// Execution log kept in process memory, newest record last. Once `capacity`
/// records are held, each append evicts the oldest one.
#[derive(Debug)]
pub struct InMemoryExecutionLog {
    capacity: usize,
    records: Mutex<VecDeque<ExecutionLogRecord>>,
}

impl Default for InMemoryExecutionLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EXECUTION_LOG_CAPACITY)
    }
}

impl InMemoryExecutionLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn records(&self) -> Vec<ExecutionLogRecord> {
        match self.records.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}

impl ExecutionLogSink for InMemoryExecutionLog {
    fn append(&self, record: ExecutionLogRecord) -> Result<(), LogSinkError> {
        if self.capacity == 0 {
            return Ok(());
        }
        let mut guard = self
            .records
            .lock()
            .map_err(|_| LogSinkError::Unavailable("execution log lock poisoned".to_string()))?;
        while guard.len() >= self.capacity {
            let Some(evicted) = guard.pop_front() else {
                break;
            };
            debug!(
                record_id = %evicted.id,
                capacity = self.capacity,
                "execution log full; evicted oldest record"
            );
        }
        guard.push_back(record);
        Ok(())
    }
}
