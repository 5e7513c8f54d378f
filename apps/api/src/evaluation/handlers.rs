use anyhow::Context;
use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::AppError;
use crate::evaluation::service::{EvaluationRequest, EvaluationResult};
use crate::matching::concepts::{Concept, ConceptRegistry};
use crate::state::AppState;

/// POST /api/v1/evaluate
///
/// Scoring is CPU-bound, so it runs on the blocking pool.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluationRequest>,
) -> Result<Json<EvaluationResult>, AppError> {
    let evaluator = state.evaluator.clone();
    let result = tokio::task::spawn_blocking(move || evaluator.evaluate(&req))
        .await
        .context("evaluation task failed")?;
    Ok(Json(result))
}

/// GET /api/v1/concepts
pub async fn handle_list_concepts(State(state): State<AppState>) -> Json<ConceptRegistry> {
    Json(state.registry.as_ref().clone())
}

/// GET /api/v1/concepts/:key
pub async fn handle_get_concept(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Concept>, AppError> {
    state
        .registry
        .get(&key)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("concept '{key}'")))
}
