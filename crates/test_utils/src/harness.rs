//! Workflow Harness
//!
//! Wires a [`WarrantyWorkflow`] to the in-memory adapters with a full staff
//! roster registered as approvers.

use std::sync::Arc;
use std::time::Duration;

use core_kernel::CustomerId;
use domain_warranty::adapters::{
    ChannelNotifier, InMemoryApproverDirectory, InMemoryClaimStore, InMemoryCoverageLookup,
};
use domain_warranty::{
    ApprovalDecision, ApprovalRecord, Claim, ClaimEvent, ClaimNotifier, NewClaim, Role, WarrantyService, WarrantyWorkflow,
    WorkflowConfig,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::fixtures::{CoverageFixtures, Staff};

/// A workflow over in-memory adapters
pub struct TestWorkflow {
    pub workflow: Arc<WarrantyWorkflow<InMemoryClaimStore>>,
    pub store: Arc<InMemoryClaimStore>,
    pub directory: Arc<InMemoryApproverDirectory>,
    pub coverage: Arc<InMemoryCoverageLookup>,
    pub staff: Staff,
    events: UnboundedReceiver<(CustomerId, ClaimEvent)>,
}

/// Builder for [`TestWorkflow`]
pub struct TestWorkflowBuilder {
    config: WorkflowConfig,
    notifier: Option<Arc<dyn ClaimNotifier>>,
    unstaffed: Vec<Role>,
}

impl TestWorkflowBuilder {
    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the channel notifier; `next_event` then never yields
    pub fn notifier(mut self, notifier: Arc<dyn ClaimNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Leaves `role` without a registered approver
    pub fn without_approver(mut self, role: Role) -> Self {
        self.unstaffed.push(role);
        self
    }

    pub async fn build(self) -> TestWorkflow {
        let staff = Staff::new();
        let store = Arc::new(InMemoryClaimStore::new());
        let directory = Arc::new(InMemoryApproverDirectory::new());
        let coverage = Arc::new(InMemoryCoverageLookup::new());

        for approver in staff.approvers() {
            if !self.unstaffed.contains(&approver.role) {
                directory.add_approver(approver.id, approver.role).await;
            }
        }

        let (channel, events) = ChannelNotifier::new();
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(channel) as Arc<dyn ClaimNotifier>);

        let workflow = WarrantyWorkflow::new(
            Arc::clone(&store),
            directory.clone(),
            coverage.clone(),
            notifier,
            self.config,
        )
        .expect("test workflow config is valid");

        TestWorkflow {
            workflow: Arc::new(workflow),
            store,
            directory,
            coverage,
            staff,
            events,
        }
    }
}

impl TestWorkflow {
    pub fn builder() -> TestWorkflowBuilder {
        TestWorkflowBuilder {
            config: WorkflowConfig::default(),
            notifier: None,
            unstaffed: Vec::new(),
        }
    }

    /// Default configuration, every approval role staffed
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    /// Registers valid coverage for the vehicle and submits as the customer
    pub async fn submit(&self, request: NewClaim) -> Claim {
        self.coverage
            .insert(CoverageFixtures::valid_for(request.vehicle_id))
            .await;
        self.workflow
            .submit_claim(request, &self.staff.customer)
            .await
            .expect("claim submission succeeds")
    }

    /// Submits a claim and starts its approval round as the reviewer
    pub async fn submit_for_approval(&self, request: NewClaim) -> (Claim, ApprovalRecord) {
        let claim = self.submit(request).await;
        let mut records = self
            .workflow
            .initialize_approvals(claim.id, &self.staff.reviewer)
            .await
            .expect("approvals initialize");
        let first = records.remove(0);
        (claim, first)
    }

    /// Submits a claim and approves every tier of its chain
    pub async fn submit_approved(&self, request: NewClaim) -> Claim {
        let (_, mut record) = self.submit_for_approval(request).await;
        loop {
            let claim = self
                .workflow
                .process_decision(record.id, ApprovalDecision::Approved, self.staff.approver(record.level), None, None)
                .await
                .expect("tier approval succeeds");
            match self.pending_record(&claim).await {
                Some(next) => record = next,
                None => return claim,
            }
        }
    }

    /// The pending record of the claim's open round
    pub async fn pending_record(&self, claim: &Claim) -> Option<ApprovalRecord> {
        self.workflow
            .approval_records(claim.id)
            .await
            .expect("approval records load")
            .into_iter()
            .find(|r| !r.status.is_decided())
    }

    /// Waits up to a second for the next notification
    pub async fn next_event(&mut self) -> Option<ClaimEvent> {
        tokio::time::timeout(Duration::from_secs(1), self.events.recv())
            .await
            .ok()
            .flatten()
            .map(|(_, event)| event)
    }

    /// Collects notifications until none arrives within the timeout
    pub async fn drain_events(&mut self) -> Vec<ClaimEvent> {
        let mut events = Vec::new();
        while let Ok(Some((_, event))) =
            tokio::time::timeout(Duration::from_millis(100), self.events.recv()).await
        {
            events.push(event);
        }
        events
    }
}
