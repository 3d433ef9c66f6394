//! Customer notification events
//!
//! Events are dispatched after the unit of work that produced them has
//! committed. Delivery is best effort: a failed notification is logged and
//! never unwinds the state change behind it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use core_kernel::{ApprovalId, ClaimId, CustomerId, UserId};

use crate::approval::ApprovalRecord;
use crate::claim::{Claim, ClaimStatus};
use crate::history::StatusChange;
use crate::numbering::ClaimNumber;
use crate::ports::ClaimNotifier;
use crate::tiers::ApprovalLevel;

/// Event sent to the customer who owns a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ClaimEvent {
    ClaimSubmitted {
        claim_id: ClaimId,
        claim_number: ClaimNumber,
    },
    StatusChanged {
        claim_id: ClaimId,
        from: ClaimStatus,
        to: ClaimStatus,
        reason: Option<String>,
    },
    /// A tier record was opened
    ApprovalRequested {
        claim_id: ClaimId,
        record_id: ApprovalId,
        level: ApprovalLevel,
        approver_id: Option<UserId>,
    },
    /// A tier record is waiting for an operator to assign an approver
    ApprovalStalled {
        claim_id: ClaimId,
        record_id: ApprovalId,
        level: ApprovalLevel,
    },
}

impl ClaimEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ClaimEvent::ClaimSubmitted { .. } => "claim_submitted",
            ClaimEvent::StatusChanged { .. } => "status_changed",
            ClaimEvent::ApprovalRequested { .. } => "approval_requested",
            ClaimEvent::ApprovalStalled { .. } => "approval_stalled",
        }
    }

    pub fn claim_id(&self) -> ClaimId {
        match self {
            ClaimEvent::ClaimSubmitted { claim_id, .. }
            | ClaimEvent::StatusChanged { claim_id, .. }
            | ClaimEvent::ApprovalRequested { claim_id, .. }
            | ClaimEvent::ApprovalStalled { claim_id, .. } => *claim_id,
        }
    }

    pub(crate) fn submitted(claim: &Claim) -> Self {
        ClaimEvent::ClaimSubmitted {
            claim_id: claim.id,
            claim_number: claim.claim_number,
        }
    }

    pub(crate) fn status_changed(change: &StatusChange) -> Self {
        ClaimEvent::StatusChanged {
            claim_id: change.claim_id,
            from: change.from,
            to: change.to,
            reason: change.reason.clone(),
        }
    }

    pub(crate) fn approval_requested(record: &ApprovalRecord) -> Self {
        ClaimEvent::ApprovalRequested {
            claim_id: record.claim_id,
            record_id: record.id,
            level: record.level,
            approver_id: record.approver_id,
        }
    }
}

/// Fire-and-forget dispatcher in front of a [`ClaimNotifier`]
#[derive(Clone)]
pub(crate) struct Notifications {
    notifier: Arc<dyn ClaimNotifier>,
}

impl Notifications {
    pub(crate) fn new(notifier: Arc<dyn ClaimNotifier>) -> Self {
        Self { notifier }
    }

    /// Sends every event to the claim's customer
    ///
    /// Delivery runs on a spawned task. Errors are logged and dropped.
    pub(crate) fn dispatch(&self, customer_id: CustomerId, events: Vec<ClaimEvent>) {
        if events.is_empty() {
            return;
        }
        let notifier = Arc::clone(&self.notifier);
        let delivery = async move {
            for event in events {
                match notifier.notify(customer_id, &event).await {
                    Ok(()) => debug!(
                        claim_id = %event.claim_id(),
                        event_type = event.event_type(),
                        "Notification delivered"
                    ),
                    Err(err) => warn!(
                        claim_id = %event.claim_id(),
                        event_type = event.event_type(),
                        error = %err,
                        "Notification failed; continuing"
                    ),
                }
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(delivery);
            }
            Err(_) => warn!("No async runtime available; notifications dropped"),
        }
    }
}

impl std::fmt::Debug for Notifications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifications").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_tag_matches_serialization() {
        let event = ClaimEvent::StatusChanged {
            claim_id: ClaimId::new(),
            from: ClaimStatus::Submitted,
            to: ClaimStatus::UnderReview,
            reason: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], event.event_type());
        assert_eq!(json["to"], "UNDER_REVIEW");
    }

    #[test]
    fn test_stalled_event_serializes_level_as_rank() {
        let event = ClaimEvent::ApprovalStalled {
            claim_id: ClaimId::new(),
            record_id: ApprovalId::new(),
            level: ApprovalLevel::Manager,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "approval_stalled");
        assert_eq!(json["level"], 3);
    }
}
