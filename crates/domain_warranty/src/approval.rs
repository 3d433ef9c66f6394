//! Approval records
//!
//! One record per tier per approval round. Records are opened one tier at a
//! time; escalation opens a record at the next level and leaves the lower
//! one marked `Escalated` rather than rewriting it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ApprovalId, ClaimId, UserId};

use crate::error::WorkflowError;
use crate::tiers::ApprovalLevel;

/// Status of an approval record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Escalated,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Escalated => "escalated",
        }
    }

    /// Anything but `Pending` has been decided and accepts no further decision
    pub fn is_decided(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            "escalated" => Ok(ApprovalStatus::Escalated),
            other => Err(WorkflowError::validation(format!("Unknown approval status: {}", other))),
        }
    }
}

/// Decision an approver can take on a pending record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
    Escalated,
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
            ApprovalDecision::Escalated => ApprovalStatus::Escalated,
        }
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ApprovalStatus::from(*self).fmt(f)
    }
}

/// One tier's approval for a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub id: ApprovalId,
    pub claim_id: ClaimId,
    /// Approval round the record belongs to, starting at 1
    pub round: u32,
    pub level: ApprovalLevel,
    /// `None` while the tier waits for an operator to assign someone
    pub approver_id: Option<UserId>,
    pub status: ApprovalStatus,
    pub comments: Option<String>,
    pub approved_amount: Option<Decimal>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRecord {
    /// Opens a pending record
    pub fn pending(
        claim_id: ClaimId,
        round: u32,
        level: ApprovalLevel,
        approver_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApprovalId::new_v7(),
            claim_id,
            round,
            level,
            approver_id,
            status: ApprovalStatus::Pending,
            comments: None,
            approved_amount: None,
            decided_at: None,
            created_at: now,
        }
    }

    /// Records a decision
    pub(crate) fn decide(
        &mut self,
        decision: ApprovalDecision,
        comments: Option<String>,
        approved_amount: Option<Decimal>,
        now: DateTime<Utc>,
    ) {
        self.status = decision.into();
        self.comments = comments;
        self.approved_amount = match decision {
            ApprovalDecision::Approved => approved_amount,
            _ => None,
        };
        self.decided_at = Some(now);
    }
}

/// View over the records of a single approval round
#[derive(Debug)]
pub struct ApprovalChain<'a> {
    records: Vec<&'a ApprovalRecord>,
}

impl<'a> ApprovalChain<'a> {
    pub fn for_round(records: &'a [ApprovalRecord], round: u32) -> Self {
        let mut records: Vec<_> = records.iter().filter(|r| r.round == round).collect();
        records.sort_by_key(|r| r.level);
        Self { records }
    }

    pub fn records(&self) -> &[&'a ApprovalRecord] {
        &self.records
    }

    pub fn record_at(&self, level: ApprovalLevel) -> Option<&'a ApprovalRecord> {
        self.records.iter().copied().find(|r| r.level == level)
    }

    /// The record currently awaiting a decision
    pub fn pending(&self) -> Option<&'a ApprovalRecord> {
        self.records.iter().copied().find(|r| r.status == ApprovalStatus::Pending)
    }

    pub fn is_rejected(&self) -> bool {
        self.records.iter().any(|r| r.status == ApprovalStatus::Rejected)
    }

    /// True when the round grants final approval
    ///
    /// Every required level, and every level reached through escalation,
    /// must hold a record that is approved or escalated, and the highest of
    /// them must be approved. An escalated record is satisfied by the
    /// decision of the tier it was forwarded to.
    pub fn is_complete(&self, required: &BTreeSet<ApprovalLevel>) -> bool {
        if self.is_rejected() {
            return false;
        }
        let mut effective = required.clone();
        effective.extend(self.records.iter().map(|r| r.level));

        let Some(top) = effective.iter().next_back().copied() else {
            return false;
        };
        let levels_satisfied = effective.iter().all(|level| {
            self.record_at(*level).is_some_and(|r| {
                matches!(r.status, ApprovalStatus::Approved | ApprovalStatus::Escalated)
            })
        });
        levels_satisfied
            && self.record_at(top).is_some_and(|r| r.status == ApprovalStatus::Approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApprovalLevel::*;

    fn record(level: ApprovalLevel, status: ApprovalStatus) -> ApprovalRecord {
        let mut record = ApprovalRecord::pending(ClaimId::new(), 1, level, Some(UserId::new()), Utc::now());
        record.status = status;
        record
    }

    #[test]
    fn test_decide_sets_amount_only_on_approval() {
        let mut r = record(Technician, ApprovalStatus::Pending);
        r.decide(ApprovalDecision::Rejected, Some("no".to_string()), Some(Decimal::ONE), Utc::now());
        assert_eq!(r.status, ApprovalStatus::Rejected);
        assert_eq!(r.approved_amount, None);
        assert!(r.decided_at.is_some());
        assert!(r.status.is_decided());
    }

    #[test]
    fn test_complete_when_all_required_levels_approved() {
        let records = vec![
            record(Technician, ApprovalStatus::Approved),
            record(Supervisor, ApprovalStatus::Approved),
        ];
        let chain = ApprovalChain::for_round(&records, 1);
        assert!(chain.is_complete(&BTreeSet::from([Technician, Supervisor])));
        assert!(!chain.is_complete(&BTreeSet::from([Technician, Supervisor, Manager])));
    }

    #[test]
    fn test_pending_level_blocks_completion() {
        let records = vec![
            record(Technician, ApprovalStatus::Approved),
            record(Supervisor, ApprovalStatus::Pending),
        ];
        let chain = ApprovalChain::for_round(&records, 1);
        assert!(!chain.is_complete(&BTreeSet::from([Technician, Supervisor])));
        assert_eq!(chain.pending().map(|r| r.level), Some(Supervisor));
    }

    #[test]
    fn test_escalated_level_satisfied_by_higher_approval() {
        let records = vec![
            record(Technician, ApprovalStatus::Escalated),
            record(Supervisor, ApprovalStatus::Approved),
        ];
        let chain = ApprovalChain::for_round(&records, 1);
        assert!(chain.is_complete(&BTreeSet::from([Technician])));
    }

    #[test]
    fn test_escalated_top_is_not_complete() {
        let records = vec![record(Technician, ApprovalStatus::Escalated)];
        let chain = ApprovalChain::for_round(&records, 1);
        assert!(!chain.is_complete(&BTreeSet::from([Technician])));
    }

    #[test]
    fn test_rejection_anywhere_blocks_completion() {
        let records = vec![
            record(Technician, ApprovalStatus::Approved),
            record(Supervisor, ApprovalStatus::Rejected),
        ];
        let chain = ApprovalChain::for_round(&records, 1);
        assert!(chain.is_rejected());
        assert!(!chain.is_complete(&BTreeSet::from([Technician])));
    }

    #[test]
    fn test_rounds_are_isolated() {
        let mut old = record(Technician, ApprovalStatus::Approved);
        old.round = 1;
        let mut current = record(Technician, ApprovalStatus::Pending);
        current.round = 2;
        let records = vec![old, current];

        assert!(ApprovalChain::for_round(&records, 1).is_complete(&BTreeSet::from([Technician])));
        assert!(!ApprovalChain::for_round(&records, 2).is_complete(&BTreeSet::from([Technician])));
    }
}
