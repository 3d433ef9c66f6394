//! Workflow handlers

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use domain_warranty::{Actor, ClaimStatus, WorkflowStatistics};

use crate::dto::workflow::*;
use crate::{error::ApiError, AppState};

/// Transitions the caller's role may request from `status`
pub async fn available_transitions(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<TransitionsQuery>,
) -> Result<Json<Vec<TransitionResponse>>, ApiError> {
    let current: ClaimStatus = query.status.parse()?;
    let transitions = state
        .service
        .available_transitions(current, actor.role)
        .into_iter()
        .map(TransitionResponse::from)
        .collect();
    Ok(Json(transitions))
}

/// Aggregate counts over all claims
pub async fn statistics(State(state): State<AppState>) -> Result<Json<WorkflowStatistics>, ApiError> {
    Ok(Json(state.service.workflow_statistics().await?))
}
