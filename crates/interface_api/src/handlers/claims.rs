//! Claims handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use domain_warranty::{Actor, Claim, ClaimStatus};

use super::parse_claim_id;
use crate::dto::claims::*;
use crate::dto::validate_request;
use crate::{error::ApiError, AppState};

/// Files a new claim
pub async fn submit_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<Claim>), ApiError> {
    validate_request(&request)?;
    let new_claim = request.into_new_claim(&actor)?;
    let claim = state.service.submit_claim(new_claim, &actor).await?;
    Ok((StatusCode::CREATED, Json(claim)))
}

/// Lists claims, optionally by status
pub async fn list_claims(
    State(state): State<AppState>,
    Query(query): Query<ListClaimsQuery>,
) -> Result<Json<Vec<Claim>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ClaimStatus>)
        .transpose()?;
    Ok(Json(state.service.list_claims(status).await?))
}

/// Gets a claim by ID
pub async fn get_claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Claim>, ApiError> {
    let claim_id = parse_claim_id(&id)?;
    Ok(Json(state.service.get_claim(claim_id).await?))
}

/// Edits the mutable claim details
pub async fn update_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<UpdateClaimRequest>,
) -> Result<Json<Claim>, ApiError> {
    validate_request(&request)?;
    let claim_id = parse_claim_id(&id)?;
    let claim = state
        .service
        .update_claim_details(claim_id, request.into(), &actor)
        .await?;
    Ok(Json(claim))
}

/// Requests a status transition
pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Claim>, ApiError> {
    validate_request(&request)?;
    let claim_id = parse_claim_id(&id)?;
    let claim = state
        .service
        .request_transition(claim_id, request.status, &actor, request.reason.as_deref())
        .await?;
    Ok(Json(claim))
}

/// Status history, oldest first
pub async fn status_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusChangeResponse>>, ApiError> {
    let claim_id = parse_claim_id(&id)?;
    let history = state.service.status_history(claim_id).await?;
    Ok(Json(history.into_iter().map(StatusChangeResponse::from).collect()))
}
