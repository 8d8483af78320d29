//! Definitions the engine evaluates and the collaborators that serve them.

pub mod domain;
pub mod memory;
pub mod repository;

pub use domain::{
    ConditionalOutput, DecisionNode, EvaluationStrategy, ExtractionConfig, Feature, FeatureId,
    FeatureType, LogicalOperator, OfferFields, OfferPolicyEntry, OperandType,
    OperatorDefinition, OutputMapping, Policy, PolicyId, PolicySet, PolicySetId, PolicyType,
    Rule, RuleId,
};
pub use memory::{CatalogDocument, CatalogLoadError, InMemoryDefinitionStore, InMemoryExecutionLog};
pub use repository::{
    DefinitionStore, ExecutionLogRecord, ExecutionLogSink, LogSinkError, RepositoryError,
};
