//! Claims DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{CustomerId, UserId, VehicleId};
use domain_warranty::{
    Actor, ClaimDetailsUpdate, ClaimStatus, ClaimType, NewClaim, Priority, Role, StatusChange,
};

use super::non_negative;
use crate::error::ApiError;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitClaimRequest {
    /// Defaults to the caller when a customer submits
    pub customer_id: Option<CustomerId>,
    pub vehicle_id: VehicleId,
    pub claim_type: ClaimType,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub issue_date: NaiveDate,
    pub reported_mileage: u32,
    #[validate(custom(function = "non_negative"))]
    pub estimated_cost: Decimal,
    pub priority: Priority,
}

impl SubmitClaimRequest {
    pub fn into_new_claim(self, actor: &Actor) -> Result<NewClaim, ApiError> {
        let customer_id = match (self.customer_id, actor.role) {
            (Some(customer_id), _) => customer_id,
            (None, Role::Customer) => CustomerId::from_uuid(*actor.id.as_uuid()),
            (None, _) => return Err(ApiError::Validation("customer_id is required".to_string())),
        };

        Ok(NewClaim {
            customer_id,
            vehicle_id: self.vehicle_id,
            claim_type: self.claim_type,
            title: self.title,
            description: self.description,
            issue_date: self.issue_date,
            reported_mileage: self.reported_mileage,
            estimated_cost: self.estimated_cost,
            priority: self.priority,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClaimRequest {
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(custom(function = "non_negative"))]
    pub estimated_cost: Option<Decimal>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<UserId>,
    #[validate(length(max = 4000))]
    pub repair_instructions: Option<String>,
}

impl From<UpdateClaimRequest> for ClaimDetailsUpdate {
    fn from(request: UpdateClaimRequest) -> Self {
        ClaimDetailsUpdate {
            description: request.description,
            estimated_cost: request.estimated_cost,
            priority: request.priority,
            assigned_to: request.assigned_to,
            repair_instructions: request.repair_instructions,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    pub status: ClaimStatus,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListClaimsQuery {
    pub status: Option<String>,
}

/// One entry of a claim's status history
#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    pub reason: Option<String>,
    pub changed_by: UserId,
    pub changed_at: chrono::DateTime<chrono::Utc>,
    pub note: String,
}

impl From<StatusChange> for StatusChangeResponse {
    fn from(change: StatusChange) -> Self {
        Self {
            from: change.from,
            to: change.to,
            reason: change.reason,
            changed_by: change.changed_by,
            changed_at: change.changed_at,
            note: change.note,
        }
    }
}
