//! Warranty workflow facade
//!
//! [`WarrantyService`] is the object-safe contract controllers consume.
//! [`WarrantyWorkflow`] wires the lifecycle engine, the escalation
//! coordinator and the collaborators behind it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use core_kernel::{ApprovalId, ClaimId, HealthCheckResult, UserId};

use crate::approval::{ApprovalDecision, ApprovalRecord};
use crate::claim::{Claim, ClaimDetailsUpdate, ClaimStatus, NewClaim};
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::escalation::EscalationCoordinator;
use crate::events::Notifications;
use crate::history::StatusChange;
use crate::lifecycle::ClaimLifecycle;
use crate::ports::{ApproverDirectory, ClaimNotifier, ClaimStore, CoverageLookup};
use crate::rules::BusinessRuleValidator;
use crate::statistics::WorkflowStatistics;
use crate::tiers::TierResolver;
use crate::transitions::{available_transitions, Actor, Role, TransitionRule};

/// Operations exposed to controllers
#[async_trait]
pub trait WarrantyService: Send + Sync {
    async fn submit_claim(&self, request: NewClaim, actor: &Actor) -> Result<Claim, WorkflowError>;

    async fn update_claim_details(
        &self,
        claim_id: ClaimId,
        update: ClaimDetailsUpdate,
        actor: &Actor,
    ) -> Result<Claim, WorkflowError>;

    async fn get_claim(&self, claim_id: ClaimId) -> Result<Claim, WorkflowError>;

    /// Claims, optionally restricted to one status
    async fn list_claims(&self, status: Option<ClaimStatus>) -> Result<Vec<Claim>, WorkflowError>;

    async fn status_history(&self, claim_id: ClaimId) -> Result<Vec<StatusChange>, WorkflowError>;

    async fn approval_records(&self, claim_id: ClaimId) -> Result<Vec<ApprovalRecord>, WorkflowError>;

    async fn request_transition(
        &self,
        claim_id: ClaimId,
        target: ClaimStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<Claim, WorkflowError>;

    async fn initialize_approvals(
        &self,
        claim_id: ClaimId,
        actor: &Actor,
    ) -> Result<Vec<ApprovalRecord>, WorkflowError>;

    async fn process_decision(
        &self,
        record_id: ApprovalId,
        decision: ApprovalDecision,
        actor: &Actor,
        comments: Option<String>,
        approved_amount: Option<Decimal>,
    ) -> Result<Claim, WorkflowError>;

    async fn assign_approver(
        &self,
        record_id: ApprovalId,
        approver_id: UserId,
        actor: &Actor,
    ) -> Result<ApprovalRecord, WorkflowError>;

    /// Table entries leaving `current` that `role` may trigger
    fn available_transitions(&self, current: ClaimStatus, role: Role) -> Vec<TransitionRule>;

    async fn workflow_statistics(&self) -> Result<WorkflowStatistics, WorkflowError>;

    async fn health(&self) -> HealthCheckResult;
}

/// The warranty engine over a concrete claim store
pub struct WarrantyWorkflow<S: ClaimStore> {
    store: Arc<S>,
    lifecycle: Arc<ClaimLifecycle<S>>,
    escalation: EscalationCoordinator<S>,
}

impl<S: ClaimStore> WarrantyWorkflow<S> {
    /// Wires the engine
    ///
    /// Fails with `Configuration` when the workflow settings are inconsistent.
    pub fn new(
        store: Arc<S>,
        directory: Arc<dyn ApproverDirectory>,
        coverage: Arc<dyn CoverageLookup>,
        notifier: Arc<dyn ClaimNotifier>,
        config: WorkflowConfig,
    ) -> Result<Self, WorkflowError> {
        config.validate()?;

        let tiers = TierResolver::new(config.tiers.clone());
        let lifecycle = Arc::new(ClaimLifecycle::new(
            Arc::clone(&store),
            coverage,
            BusinessRuleValidator::from_config(&config),
            tiers.clone(),
            config.due_dates.clone(),
            Notifications::new(notifier),
        ));
        let escalation = EscalationCoordinator::new(Arc::clone(&store), Arc::clone(&lifecycle), directory, tiers);

        Ok(Self {
            store,
            lifecycle,
            escalation,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn lifecycle(&self) -> &ClaimLifecycle<S> {
        &self.lifecycle
    }

    pub fn escalation(&self) -> &EscalationCoordinator<S> {
        &self.escalation
    }
}

#[async_trait]
impl<S: ClaimStore> WarrantyService for WarrantyWorkflow<S> {
    async fn submit_claim(&self, request: NewClaim, actor: &Actor) -> Result<Claim, WorkflowError> {
        self.lifecycle.submit_claim(request, actor).await
    }

    async fn update_claim_details(
        &self,
        claim_id: ClaimId,
        update: ClaimDetailsUpdate,
        actor: &Actor,
    ) -> Result<Claim, WorkflowError> {
        self.lifecycle.update_claim_details(claim_id, update, actor).await
    }

    async fn get_claim(&self, claim_id: ClaimId) -> Result<Claim, WorkflowError> {
        self.store
            .load_claim(claim_id)
            .await
            .map_err(WorkflowError::claim_lookup(claim_id))
    }

    async fn list_claims(&self, status: Option<ClaimStatus>) -> Result<Vec<Claim>, WorkflowError> {
        let mut claims = self.store.list_claims().await?;
        if let Some(status) = status {
            claims.retain(|claim| claim.status == status);
        }
        Ok(claims)
    }

    async fn status_history(&self, claim_id: ClaimId) -> Result<Vec<StatusChange>, WorkflowError> {
        self.get_claim(claim_id).await?;
        Ok(self.store.load_status_history(claim_id).await?)
    }

    async fn approval_records(&self, claim_id: ClaimId) -> Result<Vec<ApprovalRecord>, WorkflowError> {
        self.get_claim(claim_id).await?;
        Ok(self.store.load_approval_records(claim_id).await?)
    }

    async fn request_transition(
        &self,
        claim_id: ClaimId,
        target: ClaimStatus,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<Claim, WorkflowError> {
        self.lifecycle.request_transition(claim_id, target, actor, reason).await
    }

    async fn initialize_approvals(
        &self,
        claim_id: ClaimId,
        actor: &Actor,
    ) -> Result<Vec<ApprovalRecord>, WorkflowError> {
        self.escalation.initialize_approvals(claim_id, actor).await
    }

    async fn process_decision(
        &self,
        record_id: ApprovalId,
        decision: ApprovalDecision,
        actor: &Actor,
        comments: Option<String>,
        approved_amount: Option<Decimal>,
    ) -> Result<Claim, WorkflowError> {
        self.escalation
            .process_decision(record_id, decision, actor, comments, approved_amount)
            .await
    }

    async fn assign_approver(
        &self,
        record_id: ApprovalId,
        approver_id: UserId,
        actor: &Actor,
    ) -> Result<ApprovalRecord, WorkflowError> {
        self.escalation.assign_approver(record_id, approver_id, actor).await
    }

    fn available_transitions(&self, current: ClaimStatus, role: Role) -> Vec<TransitionRule> {
        available_transitions(current, role)
    }

    #[instrument(skip(self))]
    async fn workflow_statistics(&self) -> Result<WorkflowStatistics, WorkflowError> {
        let claims = self.store.list_claims().await?;
        Ok(WorkflowStatistics::compute(&claims, Utc::now()))
    }

    async fn health(&self) -> HealthCheckResult {
        self.store.health_check().await
    }
}
