//! Workflow DTOs

use serde::{Deserialize, Serialize};

use domain_warranty::{ClaimStatus, Role, TransitionRule};

#[derive(Debug, Deserialize)]
pub struct TransitionsQuery {
    pub status: String,
}

/// A transition the caller may request
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    pub roles: Vec<Role>,
    pub reason_required: bool,
}

impl From<TransitionRule> for TransitionResponse {
    fn from(rule: TransitionRule) -> Self {
        Self {
            from: rule.from,
            to: rule.to,
            roles: rule.roles.to_vec(),
            reason_required: rule.reason_required,
        }
    }
}
