//! Transition table
//!
//! The static map of legal claim status changes. Each entry names the roles
//! allowed to trigger it and whether the caller must give a reason.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use core_kernel::UserId;

use crate::claim::ClaimStatus;
use crate::error::WorkflowError;

/// Role of the user acting on a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Reviewer,
    Technician,
    Supervisor,
    Manager,
    Director,
    Admin,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Customer,
        Role::Reviewer,
        Role::Technician,
        Role::Supervisor,
        Role::Manager,
        Role::Director,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Reviewer => "reviewer",
            Role::Technician => "technician",
            Role::Supervisor => "supervisor",
            Role::Manager => "manager",
            Role::Director => "director",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| WorkflowError::validation(format!("Unknown role: {}", s)))
    }
}

/// An authenticated user acting on the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// One edge of the claim lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionRule {
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    pub roles: &'static [Role],
    pub reason_required: bool,
}

impl TransitionRule {
    /// Returns true if `role` may trigger this transition
    pub fn permits(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

const ADMIN_REVIEWER: &[Role] = &[Role::Admin, Role::Reviewer];
const ADMIN_TECHNICIAN: &[Role] = &[Role::Admin, Role::Technician];
const ADMIN_ONLY: &[Role] = &[Role::Admin];
const CUSTOMER_ADMIN: &[Role] = &[Role::Customer, Role::Admin];

const fn rule(
    from: ClaimStatus,
    to: ClaimStatus,
    roles: &'static [Role],
    reason_required: bool,
) -> TransitionRule {
    TransitionRule { from, to, roles, reason_required }
}

/// Every legal status change
pub const TRANSITION_TABLE: &[TransitionRule] = &[
    rule(ClaimStatus::Submitted, ClaimStatus::UnderReview, ADMIN_REVIEWER, false),
    rule(ClaimStatus::Submitted, ClaimStatus::Rejected, ADMIN_REVIEWER, true),
    rule(ClaimStatus::UnderReview, ClaimStatus::Approved, ADMIN_REVIEWER, false),
    rule(ClaimStatus::UnderReview, ClaimStatus::Rejected, ADMIN_REVIEWER, true),
    rule(ClaimStatus::UnderReview, ClaimStatus::Submitted, ADMIN_REVIEWER, true),
    rule(ClaimStatus::Approved, ClaimStatus::Processing, ADMIN_TECHNICIAN, false),
    rule(ClaimStatus::Approved, ClaimStatus::Cancelled, ADMIN_ONLY, true),
    rule(ClaimStatus::Processing, ClaimStatus::Completed, ADMIN_TECHNICIAN, false),
    rule(ClaimStatus::Processing, ClaimStatus::Cancelled, ADMIN_ONLY, true),
    rule(ClaimStatus::Rejected, ClaimStatus::Submitted, CUSTOMER_ADMIN, false),
];

/// Who is driving a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransitionAuthority {
    /// A user request, gated by the role column of the table
    Role(Role),
    /// The approval chain concluding; only the edge itself must exist
    ApprovalChain,
}

/// Looks up the table entry for an edge regardless of role
pub fn find_transition(from: ClaimStatus, to: ClaimStatus) -> Option<&'static TransitionRule> {
    TRANSITION_TABLE.iter().find(|rule| rule.from == from && rule.to == to)
}

/// Transitions out of `current` that `role` may trigger
pub fn available_transitions(current: ClaimStatus, role: Role) -> Vec<TransitionRule> {
    TRANSITION_TABLE
        .iter()
        .filter(|rule| rule.from == current && rule.permits(role))
        .copied()
        .collect()
}

/// Checks an edge against the table and the reason policy
///
/// Returns the trimmed reason, or `None` when none was supplied.
pub(crate) fn validate_transition(
    from: ClaimStatus,
    to: ClaimStatus,
    authority: TransitionAuthority,
    reason: Option<&str>,
) -> Result<Option<String>, WorkflowError> {
    let rule = find_transition(from, to)
        .filter(|rule| match authority {
            TransitionAuthority::Role(role) => rule.permits(role),
            TransitionAuthority::ApprovalChain => true,
        })
        .ok_or(WorkflowError::InvalidTransition { from, to })?;

    let reason = reason.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string);
    if rule.reason_required && reason.is_none() {
        return Err(WorkflowError::MissingReason { from, to });
    }
    Ok(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ClaimStatus::*;

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for status in [Completed, Cancelled] {
            for role in Role::ALL {
                assert!(available_transitions(status, role).is_empty());
            }
        }
    }

    #[test]
    fn test_rejected_only_returns_to_submitted() {
        let exits: Vec<_> = TRANSITION_TABLE.iter().filter(|r| r.from == Rejected).collect();
        assert_eq!(exits.len(), 1);
        assert_eq!(exits[0].to, Submitted);
    }

    #[test]
    fn test_available_transitions_for_reviewer() {
        let targets: Vec<_> = available_transitions(UnderReview, Role::Reviewer)
            .into_iter()
            .map(|r| r.to)
            .collect();
        assert_eq!(targets, vec![Approved, Rejected, Submitted]);

        assert!(available_transitions(UnderReview, Role::Customer).is_empty());
        assert!(available_transitions(Approved, Role::Reviewer).is_empty());
    }

    #[test]
    fn test_customer_can_resubmit() {
        assert!(validate_transition(Rejected, Submitted, TransitionAuthority::Role(Role::Customer), None).is_ok());
        assert!(matches!(
            validate_transition(Rejected, Submitted, TransitionAuthority::Role(Role::Reviewer), None),
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_reason_policy() {
        let admin = TransitionAuthority::Role(Role::Admin);
        assert!(matches!(
            validate_transition(Approved, Cancelled, admin, None),
            Err(WorkflowError::MissingReason { .. })
        ));
        assert!(matches!(
            validate_transition(Approved, Cancelled, admin, Some("   ")),
            Err(WorkflowError::MissingReason { .. })
        ));
        assert_eq!(
            validate_transition(Approved, Cancelled, admin, Some(" customer sold the car ")).unwrap(),
            Some("customer sold the car".to_string())
        );
    }

    #[test]
    fn test_approval_chain_still_needs_a_table_edge() {
        assert!(validate_transition(UnderReview, Approved, TransitionAuthority::ApprovalChain, None).is_ok());
        assert!(matches!(
            validate_transition(Submitted, Approved, TransitionAuthority::ApprovalChain, None),
            Err(WorkflowError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Technician".parse::<Role>().unwrap(), Role::Technician);
        assert!("superuser".parse::<Role>().is_err());
    }
}
