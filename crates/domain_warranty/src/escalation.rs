//! Escalation coordinator
//!
//! Drives the multi-level approval chain of a claim. Records are opened one
//! tier at a time, each decision is taken inside the claim's unit of work,
//! and the chain converges on exactly one final outcome: approval by the
//! last required tier moves the claim to `APPROVED`, a rejection at any tier
//! moves it to `REJECTED`.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use core_kernel::{ApprovalId, ClaimId, UserId};

use crate::approval::{ApprovalChain, ApprovalDecision, ApprovalRecord};
use crate::claim::{Claim, ClaimStatus, Resolution, ResolutionDecision};
use crate::error::WorkflowError;
use crate::events::ClaimEvent;
use crate::lifecycle::ClaimLifecycle;
use crate::ports::{ApproverDirectory, ClaimStore};
use crate::tiers::{next_required_level, ApprovalLevel, TierResolver};
use crate::transitions::{find_transition, validate_transition, Actor, TransitionAuthority};

/// Coordinates approval records for claims under review
pub struct EscalationCoordinator<S: ClaimStore> {
    store: Arc<S>,
    lifecycle: Arc<ClaimLifecycle<S>>,
    directory: Arc<dyn ApproverDirectory>,
    tiers: TierResolver,
}

/// Locked view of a claim and the record being acted on
struct LockedRecord<Snap> {
    snapshot: Snap,
    claim: Claim,
    records: Vec<ApprovalRecord>,
    record: ApprovalRecord,
}

impl<S: ClaimStore> EscalationCoordinator<S> {
    pub(crate) fn new(
        store: Arc<S>,
        lifecycle: Arc<ClaimLifecycle<S>>,
        directory: Arc<dyn ApproverDirectory>,
        tiers: TierResolver,
    ) -> Self {
        Self {
            store,
            lifecycle,
            directory,
            tiers,
        }
    }

    /// Starts an approval round for a claim
    ///
    /// A `SUBMITTED` claim is first moved to `UNDER_REVIEW`. Only the record
    /// for the lowest required level is created; later tiers are opened as
    /// the chain advances, but every required level must have an active
    /// approver up front. When one does not, nothing is written.
    #[instrument(skip(self, actor), fields(actor = %actor.id, role = %actor.role))]
    pub async fn initialize_approvals(
        &self,
        claim_id: ClaimId,
        actor: &Actor,
    ) -> Result<Vec<ApprovalRecord>, WorkflowError> {
        let may_review = find_transition(ClaimStatus::Submitted, ClaimStatus::UnderReview)
            .is_some_and(|rule| rule.permits(actor.role));
        if !may_review {
            return Err(WorkflowError::Forbidden {
                role: actor.role,
                action: "initialize approvals",
            });
        }

        let mut snapshot = self
            .store
            .begin(claim_id)
            .await
            .map_err(WorkflowError::claim_lookup(claim_id))?;
        let mut claim = self
            .store
            .claim_for_update(&mut snapshot)
            .await
            .map_err(WorkflowError::claim_lookup(claim_id))?;

        let now = Utc::now();
        let mut events = Vec::new();
        match claim.status {
            ClaimStatus::Submitted => {
                let reason = validate_transition(
                    ClaimStatus::Submitted,
                    ClaimStatus::UnderReview,
                    TransitionAuthority::Role(actor.role),
                    None,
                )?;
                let change = self
                    .lifecycle
                    .stage_transition(&mut snapshot, &mut claim, ClaimStatus::UnderReview, reason, actor.id, now)
                    .await?;
                events.push(ClaimEvent::status_changed(&change));
            }
            ClaimStatus::UnderReview if claim.approval_open => {
                return Err(WorkflowError::ApprovalsAlreadyInitialized(claim_id));
            }
            ClaimStatus::UnderReview => {}
            other => {
                return Err(WorkflowError::InvalidTransition {
                    from: other,
                    to: ClaimStatus::UnderReview,
                });
            }
        }

        let required = self.tiers.for_claim(&claim);
        let (first, approver) = self.staff_chain(claim_id, &required).await?;

        claim.approval_round += 1;
        claim.approval_open = true;
        claim.updated_at = now;
        self.store.save_claim(&mut snapshot, &claim).await?;

        let record = ApprovalRecord::pending(claim.id, claim.approval_round, first, Some(approver), now);
        self.store.save_approval_record(&mut snapshot, &record).await?;
        self.store.commit(snapshot).await?;

        info!(
            claim_id = %claim_id,
            round = claim.approval_round,
            required = ?required,
            "Approval round started"
        );
        events.push(ClaimEvent::approval_requested(&record));
        self.lifecycle.notifications().dispatch(claim.customer_id, events);
        Ok(vec![record])
    }

    /// Resolves an active approver for each required level
    ///
    /// Returns the lowest level with its approver.
    async fn staff_chain(
        &self,
        claim_id: ClaimId,
        required: &BTreeSet<ApprovalLevel>,
    ) -> Result<(ApprovalLevel, UserId), WorkflowError> {
        let mut first = None;
        for &level in required {
            let Some(approver) = self.directory.find_active_approver(level.role()).await? else {
                warn!(claim_id = %claim_id, level = %level, "No approver available; approvals not started");
                return Err(WorkflowError::NoApproverAvailable {
                    claim_id,
                    level,
                    record_id: None,
                });
            };
            if first.is_none() {
                first = Some((level, approver));
            }
        }
        first.ok_or_else(|| WorkflowError::Configuration("no approval levels required".to_string()))
    }

    /// Applies an approver's decision to a pending record
    ///
    /// Returns the claim as committed. When the next tier has no approver the
    /// decision is still committed, the new record is left unassigned, and
    /// the call fails with `NoApproverAvailable` naming that record.
    #[instrument(skip(self, actor, comments), fields(actor = %actor.id, decision = %decision))]
    pub async fn process_decision(
        &self,
        record_id: ApprovalId,
        decision: ApprovalDecision,
        actor: &Actor,
        comments: Option<String>,
        approved_amount: Option<Decimal>,
    ) -> Result<Claim, WorkflowError> {
        if approved_amount.is_some_and(|amount| amount.is_sign_negative()) {
            return Err(WorkflowError::validation("Approved amount must not be negative"));
        }
        let comments = comments
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let LockedRecord {
            mut snapshot,
            mut claim,
            mut records,
            mut record,
        } = self.lock_record(record_id).await?;

        match record.approver_id {
            None => {
                return Err(WorkflowError::NoApproverAvailable {
                    claim_id: claim.id,
                    level: record.level,
                    record_id: Some(record.id),
                })
            }
            Some(approver) if approver != actor.id => {
                return Err(WorkflowError::NotAssignedApprover {
                    record_id,
                    actor: actor.id,
                })
            }
            Some(_) => {}
        }

        let now = Utc::now();
        let mut events = Vec::new();
        let mut stalled = None;

        match decision {
            ApprovalDecision::Approved => {
                let required = self.tiers.for_claim(&claim);
                record.decide(decision, comments.clone(), approved_amount, now);

                match next_required_level(&required, record.level) {
                    Some(next) => {
                        self.store.save_approval_record(&mut snapshot, &record).await?;
                        let opened = self.open_tier(&mut snapshot, &claim, next, now).await?;
                        events.push(ClaimEvent::approval_requested(&opened));
                        if opened.approver_id.is_none() {
                            stalled = Some(opened);
                        }
                    }
                    None => {
                        replace_record(&mut records, &record);
                        let chain = ApprovalChain::for_round(&records, claim.approval_round);
                        if !chain.is_complete(&required) {
                            return Err(WorkflowError::ApprovalChainIncomplete { claim_id: claim.id });
                        }
                        self.lifecycle.check_business_rules(&claim).await?;

                        let reason = validate_transition(
                            claim.status,
                            ClaimStatus::Approved,
                            TransitionAuthority::ApprovalChain,
                            comments.as_deref(),
                        )?;
                        let approved_cost = approved_amount.unwrap_or(claim.estimated_cost);
                        claim.approved_cost = Some(approved_cost);
                        claim.resolution = Some(Resolution {
                            decision: ResolutionDecision::Approved,
                            reason: reason.clone(),
                            decided_by: actor.id,
                            approved_amount: Some(approved_cost),
                            repair_instructions: None,
                            decided_at: now,
                        });

                        self.store.save_approval_record(&mut snapshot, &record).await?;
                        let change = self
                            .lifecycle
                            .stage_transition(&mut snapshot, &mut claim, ClaimStatus::Approved, reason, actor.id, now)
                            .await?;
                        events.push(ClaimEvent::status_changed(&change));
                    }
                }
            }
            ApprovalDecision::Rejected => {
                let reason = comments
                    .clone()
                    .unwrap_or_else(|| format!("Rejected at {} approval", record.level));
                let reason = validate_transition(
                    claim.status,
                    ClaimStatus::Rejected,
                    TransitionAuthority::ApprovalChain,
                    Some(&reason),
                )?;
                record.decide(decision, comments, None, now);
                claim.resolution = Some(Resolution {
                    decision: ResolutionDecision::Rejected,
                    reason: reason.clone(),
                    decided_by: actor.id,
                    approved_amount: None,
                    repair_instructions: None,
                    decided_at: now,
                });

                self.store.save_approval_record(&mut snapshot, &record).await?;
                let change = self
                    .lifecycle
                    .stage_transition(&mut snapshot, &mut claim, ClaimStatus::Rejected, reason, actor.id, now)
                    .await?;
                events.push(ClaimEvent::status_changed(&change));
            }
            ApprovalDecision::Escalated => {
                let Some(next) = record.level.next() else {
                    return Err(WorkflowError::EscalationExhausted { record_id });
                };
                record.decide(decision, comments, None, now);
                self.store.save_approval_record(&mut snapshot, &record).await?;
                let opened = self.open_tier(&mut snapshot, &claim, next, now).await?;
                events.push(ClaimEvent::approval_requested(&opened));
                if opened.approver_id.is_none() {
                    stalled = Some(opened);
                }
            }
        }

        self.store.commit(snapshot).await?;
        info!(
            claim_id = %claim.id,
            record_id = %record_id,
            level = %record.level,
            status = %claim.status,
            "Approval decision recorded"
        );

        if let Some(opened) = &stalled {
            warn!(claim_id = %claim.id, level = %opened.level, "Approval chain stalled; no approver available");
            events.push(ClaimEvent::ApprovalStalled {
                claim_id: claim.id,
                record_id: opened.id,
                level: opened.level,
            });
        }
        self.lifecycle.notifications().dispatch(claim.customer_id, events);

        match stalled {
            Some(opened) => Err(WorkflowError::NoApproverAvailable {
                claim_id: claim.id,
                level: opened.level,
                record_id: Some(opened.id),
            }),
            None => Ok(claim),
        }
    }

    /// Assigns an approver to a pending record, unblocking a stalled chain
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn assign_approver(
        &self,
        record_id: ApprovalId,
        approver_id: UserId,
        actor: &Actor,
    ) -> Result<ApprovalRecord, WorkflowError> {
        if !actor.is_admin() {
            return Err(WorkflowError::Forbidden {
                role: actor.role,
                action: "assign approvers",
            });
        }

        let LockedRecord {
            mut snapshot,
            claim,
            mut record,
            ..
        } = self.lock_record(record_id).await?;

        let eligible = self
            .directory
            .is_active_approver(approver_id, record.level.role())
            .await?;
        if !eligible {
            return Err(WorkflowError::ApproverNotEligible {
                user: approver_id,
                level: record.level,
            });
        }

        record.approver_id = Some(approver_id);
        self.store.save_approval_record(&mut snapshot, &record).await?;
        self.store.commit(snapshot).await?;

        info!(claim_id = %claim.id, record_id = %record_id, level = %record.level, "Approver assigned");
        self.lifecycle
            .notifications()
            .dispatch(claim.customer_id, vec![ClaimEvent::approval_requested(&record)]);
        Ok(record)
    }

    /// Locks the claim owning `record_id` and checks the record is actionable
    ///
    /// The record must be pending and belong to the open round of a claim
    /// that is still under review.
    async fn lock_record(&self, record_id: ApprovalId) -> Result<LockedRecord<S::Snapshot>, WorkflowError> {
        let claim_id = self
            .store
            .load_approval_record(record_id)
            .await
            .map_err(WorkflowError::approval_lookup(record_id))?
            .claim_id;

        let mut snapshot = self
            .store
            .begin(claim_id)
            .await
            .map_err(WorkflowError::claim_lookup(claim_id))?;
        let claim = self
            .store
            .claim_for_update(&mut snapshot)
            .await
            .map_err(WorkflowError::claim_lookup(claim_id))?;
        let records = self.store.approval_records_for_update(&mut snapshot).await?;
        let record = records
            .iter()
            .find(|r| r.id == record_id)
            .cloned()
            .ok_or(WorkflowError::ApprovalNotFound(record_id))?;

        if record.status.is_decided() {
            return Err(WorkflowError::AlreadyDecided {
                record_id,
                status: record.status,
            });
        }
        let current_round = claim.approval_open
            && record.round == claim.approval_round
            && claim.status == ClaimStatus::UnderReview;
        if !current_round {
            return Err(WorkflowError::StaleApproval(record_id));
        }

        Ok(LockedRecord {
            snapshot,
            claim,
            records,
            record,
        })
    }

    /// Creates the pending record for `level` in the claim's open round
    ///
    /// The record is left unassigned when no approver holds the level's role.
    async fn open_tier(
        &self,
        snapshot: &mut S::Snapshot,
        claim: &Claim,
        level: ApprovalLevel,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRecord, WorkflowError> {
        let approver = self.directory.find_active_approver(level.role()).await?;
        let record = ApprovalRecord::pending(claim.id, claim.approval_round, level, approver, now);
        self.store.save_approval_record(snapshot, &record).await?;
        Ok(record)
    }
}

fn replace_record(records: &mut [ApprovalRecord], updated: &ApprovalRecord) {
    if let Some(slot) = records.iter_mut().find(|r| r.id == updated.id) {
        *slot = updated.clone();
    }
}
