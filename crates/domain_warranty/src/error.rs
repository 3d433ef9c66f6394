//! Warranty workflow errors

use thiserror::Error;

use core_kernel::{ApprovalId, ClaimId, PortError, UserId};

use crate::approval::ApprovalStatus;
use crate::claim::ClaimStatus;
use crate::rules::RuleViolation;
use crate::tiers::ApprovalLevel;
use crate::transitions::Role;

/// Errors that can occur in the warranty workflow
///
/// Caller errors are rejected before anything is written. Resource errors
/// name the missing claim, record or approver. `Persistence` wraps a failed
/// collaborator write; the unit of work it belonged to was not committed.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Transition from {from} to {to} is not permitted")]
    InvalidTransition { from: ClaimStatus, to: ClaimStatus },

    #[error("A reason is required to move a claim from {from} to {to}")]
    MissingReason { from: ClaimStatus, to: ClaimStatus },

    #[error("Approval record {record_id} has already been decided ({status})")]
    AlreadyDecided { record_id: ApprovalId, status: ApprovalStatus },

    #[error("Business rules violated: {}", join_violations(.0))]
    RuleViolation(Vec<RuleViolation>),

    #[error("Claim not found: {0}")]
    ClaimNotFound(ClaimId),

    #[error("Approval record not found: {0}")]
    ApprovalNotFound(ApprovalId),

    #[error("No active approver available for {level} approval of claim {claim_id}")]
    NoApproverAvailable {
        claim_id: ClaimId,
        level: ApprovalLevel,
        /// The unassigned record awaiting an approver, when one was created
        record_id: Option<ApprovalId>,
    },

    #[error("Approvals are already in progress for claim {0}")]
    ApprovalsAlreadyInitialized(ClaimId),

    #[error("Approval chain for claim {claim_id} is not complete")]
    ApprovalChainIncomplete { claim_id: ClaimId },

    #[error("User {actor} is not the assigned approver of record {record_id}")]
    NotAssignedApprover { record_id: ApprovalId, actor: UserId },

    #[error("User {user} is not an active {level} approver")]
    ApproverNotEligible { user: UserId, level: ApprovalLevel },

    #[error("Approval record {0} belongs to a closed approval round")]
    StaleApproval(ApprovalId),

    #[error("Approval record {record_id} is at the highest level and cannot be escalated")]
    EscalationExhausted { record_id: ApprovalId },

    #[error("Role {role} may not {action}")]
    Forbidden { role: Role, action: &'static str },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] PortError),
}

fn join_violations(violations: &[RuleViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    /// Maps a store lookup failure, turning NotFound into `ClaimNotFound`
    pub fn claim_lookup(claim_id: ClaimId) -> impl FnOnce(PortError) -> Self {
        move |err| {
            if err.is_not_found() {
                WorkflowError::ClaimNotFound(claim_id)
            } else {
                WorkflowError::Persistence(err)
            }
        }
    }

    /// Maps a store lookup failure, turning NotFound into `ApprovalNotFound`
    pub fn approval_lookup(record_id: ApprovalId) -> impl FnOnce(PortError) -> Self {
        move |err| {
            if err.is_not_found() {
                WorkflowError::ApprovalNotFound(record_id)
            } else {
                WorkflowError::Persistence(err)
            }
        }
    }

    /// Returns true for errors caused by the request itself
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            WorkflowError::InvalidTransition { .. }
                | WorkflowError::MissingReason { .. }
                | WorkflowError::AlreadyDecided { .. }
                | WorkflowError::RuleViolation(_)
                | WorkflowError::ApprovalsAlreadyInitialized(_)
                | WorkflowError::ApprovalChainIncomplete { .. }
                | WorkflowError::NotAssignedApprover { .. }
                | WorkflowError::ApproverNotEligible { .. }
                | WorkflowError::StaleApproval(_)
                | WorkflowError::EscalationExhausted { .. }
                | WorkflowError::Forbidden { .. }
                | WorkflowError::Validation(_)
        )
    }

    /// Returns true when an operator can resolve the failure and retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            WorkflowError::NoApproverAvailable { .. } => true,
            WorkflowError::Persistence(err) => err.is_transient(),
            _ => false,
        }
    }

    /// Returns true if the error refers to a missing claim or record
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            WorkflowError::ClaimNotFound(_) | WorkflowError::ApprovalNotFound(_)
        )
    }
}
