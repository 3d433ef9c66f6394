//! Claim lifecycle engine
//!
//! Applies role-gated status transitions to claims. Every transition runs as
//! one unit of work on the claim store: the claim is locked and re-read, the
//! edge is checked against the transition table, and the new status and its
//! history record are written together.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tracing::{info, instrument};

use core_kernel::{ClaimId, UserId};

use crate::approval::ApprovalChain;
use crate::claim::{Claim, ClaimDetailsUpdate, ClaimStatus, NewClaim};
use crate::config::DueDatePolicy;
use crate::error::WorkflowError;
use crate::events::{ClaimEvent, Notifications};
use crate::history::StatusChange;
use crate::numbering::ClaimNumber;
use crate::ports::{ClaimStore, CoverageLookup};
use crate::rules::BusinessRuleValidator;
use crate::tiers::TierResolver;
use crate::transitions::{validate_transition, Actor, Role, TransitionAuthority};

/// Lifecycle engine over a claim store
pub struct ClaimLifecycle<S: ClaimStore> {
    store: Arc<S>,
    coverage: Arc<dyn CoverageLookup>,
    rules: BusinessRuleValidator,
    tiers: TierResolver,
    due_dates: DueDatePolicy,
    notifications: Notifications,
}

impl<S: ClaimStore> ClaimLifecycle<S> {
    pub(crate) fn new(
        store: Arc<S>,
        coverage: Arc<dyn CoverageLookup>,
        rules: BusinessRuleValidator,
        tiers: TierResolver,
        due_dates: DueDatePolicy,
        notifications: Notifications,
    ) -> Self {
        Self {
            store,
            coverage,
            rules,
            tiers,
            due_dates,
            notifications,
        }
    }

    /// Files a new claim in `SUBMITTED`
    ///
    /// The claim number is drawn from the store's per-year sequence.
    #[instrument(skip(self, request, actor), fields(actor = %actor.id))]
    pub async fn submit_claim(&self, request: NewClaim, actor: &Actor) -> Result<Claim, WorkflowError> {
        if !matches!(actor.role, Role::Customer | Role::Admin) {
            return Err(WorkflowError::Forbidden {
                role: actor.role,
                action: "submit claims",
            });
        }
        request.validate()?;

        let now = Utc::now();
        let sequence = self.store.next_claim_sequence(now.year()).await?;
        let claim = Claim::submit(request, ClaimNumber::new(now.year(), sequence), &self.due_dates, now);
        self.store.insert_claim(&claim).await?;

        info!(
            claim_id = %claim.id,
            claim_number = %claim.claim_number,
            priority = %claim.priority,
            "Claim submitted"
        );
        self.notifications
            .dispatch(claim.customer_id, vec![ClaimEvent::submitted(&claim)]);
        Ok(claim)
    }

    /// Moves a claim to `target` on behalf of `actor`
    ///
    /// Checks, in order: the edge exists and permits the actor's role, a
    /// reason is present where required, and for `APPROVED` that every
    /// required tier of the current round has approved and the business rules
    /// pass. Nothing is written unless every check passes.
    #[instrument(skip(self, actor, reason), fields(actor = %actor.id, role = %actor.role))]
    pub async fn request_transition(
        &self,
        claim_id: ClaimId,
        target: ClaimStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<Claim, WorkflowError> {
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

        let reason = validate_transition(claim.status, target, TransitionAuthority::Role(actor.role), reason)?;

        if target == ClaimStatus::Approved {
            let records = self.store.approval_records_for_update(&mut snapshot).await?;
            let required = self.tiers.for_claim(&claim);
            let complete = ApprovalChain::for_round(&records, claim.approval_round).is_complete(&required);
            if claim.approval_open || !complete {
                return Err(WorkflowError::ApprovalChainIncomplete { claim_id });
            }
            self.check_business_rules(&claim).await?;
        }

        let change = self
            .stage_transition(&mut snapshot, &mut claim, target, reason, actor.id, Utc::now())
            .await?;
        self.store.commit(snapshot).await?;

        info!(claim_id = %claim_id, from = %change.from, to = %change.to, "Claim status changed");
        self.notifications
            .dispatch(claim.customer_id, vec![ClaimEvent::status_changed(&change)]);
        Ok(claim)
    }

    /// Edits description, cost, priority or assignee
    #[instrument(skip(self, update, actor), fields(actor = %actor.id))]
    pub async fn update_claim_details(
        &self,
        claim_id: ClaimId,
        update: ClaimDetailsUpdate,
        actor: &Actor,
    ) -> Result<Claim, WorkflowError> {
        if !matches!(actor.role, Role::Reviewer | Role::Admin) {
            return Err(WorkflowError::Forbidden {
                role: actor.role,
                action: "update claim details",
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

        claim.apply_details(update, Utc::now())?;
        self.store.save_claim(&mut snapshot, &claim).await?;
        self.store.commit(snapshot).await?;

        info!(claim_id = %claim_id, "Claim details updated");
        Ok(claim)
    }

    /// Applies an already validated edge inside an open unit of work
    ///
    /// Writes the claim and appends the history record; the caller commits.
    pub(crate) async fn stage_transition(
        &self,
        snapshot: &mut S::Snapshot,
        claim: &mut Claim,
        target: ClaimStatus,
        reason: Option<String>,
        changed_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, WorkflowError> {
        let change = StatusChange::record(claim.id, claim.status, target, reason, changed_by, now);
        claim.apply_status(target, now);
        self.store.save_claim(snapshot, claim).await?;
        self.store.append_status_change(snapshot, &change).await?;
        Ok(change)
    }

    /// Runs the business rules against the claim as of today
    pub(crate) async fn check_business_rules(&self, claim: &Claim) -> Result<(), WorkflowError> {
        let coverage = self.coverage.warranty_coverage(claim.vehicle_id).await?;
        self.rules
            .ensure_approvable(claim, coverage.as_ref(), Utc::now().date_naive())
    }

    pub(crate) fn notifications(&self) -> &Notifications {
        &self.notifications
    }
}
