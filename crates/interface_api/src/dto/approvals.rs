//! Approval DTOs

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use core_kernel::UserId;
use domain_warranty::ApprovalDecision;

use super::non_negative;

#[derive(Debug, Deserialize, Validate)]
pub struct DecisionRequest {
    pub decision: ApprovalDecision,
    #[validate(length(max = 2000))]
    pub comments: Option<String>,
    /// Only kept on approval
    #[validate(custom(function = "non_negative"))]
    pub approved_amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct AssignApproverRequest {
    pub approver_id: UserId,
}
