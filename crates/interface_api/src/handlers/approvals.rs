//! Approval handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use domain_warranty::{Actor, ApprovalRecord, Claim};

use super::{parse_approval_id, parse_claim_id};
use crate::dto::approvals::*;
use crate::dto::validate_request;
use crate::{error::ApiError, AppState};

/// Opens an approval round for a claim
pub async fn initialize_approvals(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Vec<ApprovalRecord>>), ApiError> {
    let claim_id = parse_claim_id(&id)?;
    let records = state.service.initialize_approvals(claim_id, &actor).await?;
    Ok((StatusCode::CREATED, Json(records)))
}

/// Approval records of a claim across all rounds
pub async fn list_approvals(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ApprovalRecord>>, ApiError> {
    let claim_id = parse_claim_id(&id)?;
    Ok(Json(state.service.approval_records(claim_id).await?))
}

/// Records the caller's decision on a pending approval
pub async fn process_decision(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<Claim>, ApiError> {
    validate_request(&request)?;
    let record_id = parse_approval_id(&id)?;
    let claim = state
        .service
        .process_decision(record_id, request.decision, &actor, request.comments, request.approved_amount)
        .await?;
    Ok(Json(claim))
}

/// Assigns an approver to a pending record
pub async fn assign_approver(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<AssignApproverRequest>,
) -> Result<Json<ApprovalRecord>, ApiError> {
    let record_id = parse_approval_id(&id)?;
    let record = state
        .service
        .assign_approver(record_id, request.approver_id, &actor)
        .await?;
    Ok(Json(record))
}
