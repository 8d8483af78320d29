use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};

use crate::catalog::{DefinitionStore, ExecutionLogSink, PolicyId, PolicySetId, RuleId};
use crate::evaluation::EvaluationError;
use crate::service::PolicyEngine;

/// Router builder exposing the evaluation endpoints.
pub fn engine_router<S, L>(engine: Arc<PolicyEngine<S, L>>) -> Router
where
    S: DefinitionStore + 'static,
    L: ExecutionLogSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/policies/:policy_id/evaluate",
            post(evaluate_policy_handler::<S, L>),
        )
        .route(
            "/api/v1/policy-sets/:policy_set_id/evaluate",
            post(evaluate_policy_set_handler::<S, L>),
        )
        .route("/api/v1/rules/:rule_id/test", post(test_rule_handler::<S, L>))
        .with_state(engine)
}

pub(crate) async fn evaluate_policy_handler<S, L>(
    State(engine): State<Arc<PolicyEngine<S, L>>>,
    Path(policy_id): Path<String>,
    Json(input): Json<Value>,
) -> Response
where
    S: DefinitionStore + 'static,
    L: ExecutionLogSink + 'static,
{
    match engine.evaluate_policy(&PolicyId(policy_id), &input) {
        Ok(evaluation) => (StatusCode::OK, Json(evaluation)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn evaluate_policy_set_handler<S, L>(
    State(engine): State<Arc<PolicyEngine<S, L>>>,
    Path(policy_set_id): Path<String>,
    Json(input): Json<Value>,
) -> Response
where
    S: DefinitionStore + 'static,
    L: ExecutionLogSink + 'static,
{
    match engine.evaluate_policy_set(&PolicySetId(policy_set_id), &input) {
        Ok(evaluation) => (StatusCode::OK, Json(evaluation)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn test_rule_handler<S, L>(
    State(engine): State<Arc<PolicyEngine<S, L>>>,
    Path(rule_id): Path<String>,
    Json(input): Json<Value>,
) -> Response
where
    S: DefinitionStore + 'static,
    L: ExecutionLogSink + 'static,
{
    match engine.test_rule(&RuleId(rule_id), &input) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn evaluation_status(err: &EvaluationError) -> StatusCode {
    match err {
        EvaluationError::NotFound { .. } => StatusCode::NOT_FOUND,
        EvaluationError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
        other if other.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: EvaluationError) -> Response {
    let payload = json!({
        "error": err.to_string(),
    });
    (evaluation_status(&err), Json(payload)).into_response()
}
