//! Request handlers

pub mod claims;
pub mod approvals;
pub mod workflow;
pub mod health;

use std::str::FromStr;

use core_kernel::{ApprovalId, ClaimId};

use crate::error::ApiError;

pub(crate) fn parse_claim_id(raw: &str) -> Result<ClaimId, ApiError> {
    ClaimId::from_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid claim id: {}", raw)))
}

pub(crate) fn parse_approval_id(raw: &str) -> Result<ApprovalId, ApiError> {
    ApprovalId::from_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid approval id: {}", raw)))
}
