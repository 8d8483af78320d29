//! Decision engine for lending policies.
//!
//! Input documents are turned into typed features, features are checked by
//! rules, rules are combined by decision trees into approve/reject verdicts,
//! and offer policies compute loan terms. Policy sets combine one boolean
//! policy with prioritized offer policies under an evaluation strategy.

pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod router;
pub mod service;
pub mod telemetry;

pub use catalog::{
    CatalogDocument, DefinitionStore, ExecutionLogRecord, ExecutionLogSink,
    InMemoryDefinitionStore,
};
pub use evaluation::{
    Decision, DecisionStatus, EvaluationError, FeatureValue, Offer, PolicyEvaluation,
    RuleTestOutcome, UnifiedEvaluation,
};
pub use router::engine_router;
pub use service::PolicyEngine;
