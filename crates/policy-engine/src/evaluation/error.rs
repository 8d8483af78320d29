use crate::catalog::{RepositoryError, RuleId};

/// Failures while turning an input document into features.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Missing required input for feature(s): {}", .0.join(", "))]
    MissingFeatures(Vec<String>),
    #[error("feature '{feature}' has an unsupported JSON path '{path}': {reason}")]
    InvalidPath {
        feature: String,
        path: String,
        reason: String,
    },
}

/// Failures raised by operator implementations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperatorError {
    #[error("unknown operator code '{0}'")]
    UnknownOperator(String),
    #[error("operator {operator} requires {expected} operand")]
    InvalidOperand {
        operator: &'static str,
        expected: &'static str,
    },
    #[error("cannot compare {left} value with {right} value")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
    },
    #[error("operator {operator} cannot be applied to a {found} value")]
    UnsupportedValue {
        operator: &'static str,
        found: &'static str,
    },
    #[error("invalid regular expression '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Failures raised while validating or walking a decision tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    #[error("decision tree is malformed: {}", .0.join("; "))]
    Malformed(Vec<String>),
    #[error("rule '{0}' was not resolved before evaluation")]
    UnresolvedRule(RuleId),
    #[error("rule '{rule}' could not be evaluated: {source}")]
    Rule {
        rule: String,
        #[source]
        source: OperatorError,
    },
}

/// Error taxonomy surfaced by policy and policy set evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Operator(#[from] OperatorError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("rule '{rule}' is invalid: {reason}")]
    InvalidRule { rule: String, reason: String },
    #[error("policy '{policy}' is invalid: {reason}")]
    InvalidPolicy { policy: String, reason: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EvaluationError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        EvaluationError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EvaluationError::NotFound { .. })
    }

    /// Definition or input problems the caller can fix.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            EvaluationError::NotFound { .. } | EvaluationError::Repository(_)
        )
    }
}
