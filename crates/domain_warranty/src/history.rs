//! Status history
//!
//! One immutable `StatusChange` is written per transition, in the same unit
//! of work as the claim update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, StatusChangeId, UserId};

use crate::claim::ClaimStatus;

/// Audit record of one claim transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: StatusChangeId,
    pub claim_id: ClaimId,
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    pub reason: Option<String>,
    pub changed_by: UserId,
    pub changed_at: DateTime<Utc>,
    /// Generated summary of the change
    pub note: String,
}

impl StatusChange {
    pub fn record(
        claim_id: ClaimId,
        from: ClaimStatus,
        to: ClaimStatus,
        reason: Option<String>,
        changed_by: UserId,
        changed_at: DateTime<Utc>,
    ) -> Self {
        let note = match &reason {
            Some(reason) => format!("Status changed from {} to {}: {}", from, to, reason),
            None => format!("Status changed from {} to {}", from, to),
        };
        Self {
            id: StatusChangeId::new_v7(),
            claim_id,
            from,
            to,
            reason,
            changed_by,
            changed_at,
            note,
        }
    }
}

/// Replays a history from `SUBMITTED`
///
/// Returns `None` if a record does not start where the previous one ended.
pub fn replay(history: &[StatusChange]) -> Option<ClaimStatus> {
    history.iter().try_fold(ClaimStatus::Submitted, |current, change| {
        (change.from == current).then_some(change.to)
    })
}
