//! Evaluation pipeline: extraction, operators, rules, trees, policies and
//! policy sets.

pub mod error;
pub mod features;
pub mod offer;
pub mod operators;
pub mod path;
pub mod policy;
pub mod policy_set;
pub mod rules;
pub mod tree;
pub mod value;

#[cfg(test)]
mod tests;

pub use error::{EvaluationError, ExtractionError, OperatorError, TreeError};
pub use features::{ExtractedFeatures, FeatureExtractor};
pub use offer::Offer;
pub use operators::{OperatorCatalog, OperatorStrategy};
pub use policy::{Decision, DecisionStatus, PolicyEvaluation, PolicyEvaluator};
pub use policy_set::{
    EvaluationDetails, OfferFailure, OfferSummary, PolicySetOrchestrator, UnifiedEvaluation,
    NO_DECISION_REASON,
};
pub use rule_test::RuleTestOutcome;
pub use rules::{ResolvedRule, ResolvedRules, RuleEvaluator};
pub use tree::{validate_tree, DecisionTreeEvaluator, NodeDetail, NodeEvaluation};
pub use value::FeatureValue;
