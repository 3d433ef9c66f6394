//! Warranty Domain Ports
//!
//! The engine reaches persistence, identity, warranty coverage and customer
//! notification only through the traits below. Adapters live in
//! [`crate::adapters`] (in-memory) and in `infra_db` (PostgreSQL).
//!
//! # Units of work
//!
//! Every state change follows the same shape: lock the claim, re-read it,
//! decide, write, commit. [`ClaimStore::begin`] opens a snapshot holding the
//! claim's lock; mutating methods take `&mut Self::Snapshot`, and
//! [`ClaimStore::commit`] makes the writes durable. A snapshot dropped
//! without commit is rolled back, so a failed write never leaves a claim
//! half-transitioned.
//!
//! ```rust,ignore
//! let mut snap = store.begin(claim_id).await?;
//! let mut claim = store.claim_for_update(&mut snap).await?;
//! claim.apply_status(target, now);
//! store.save_claim(&mut snap, &claim).await?;
//! store.append_status_change(&mut snap, &change).await?;
//! store.commit(snap).await?;
//! ```

use async_trait::async_trait;

use core_kernel::{
    ApprovalId, ClaimId, CustomerId, DomainPort, HealthCheckable, PortError, UserId, VehicleId,
};

use crate::approval::ApprovalRecord;
use crate::claim::Claim;
use crate::events::ClaimEvent;
use crate::history::StatusChange;
use crate::rules::WarrantyCoverage;
use crate::transitions::Role;

/// Claim, status history and approval record persistence
#[async_trait]
pub trait ClaimStore: DomainPort + HealthCheckable {
    /// In-progress unit of work holding one claim's lock
    type Snapshot: Send;

    // ------------------------------------------------------------------
    // Reads and inserts outside a unit of work
    // ------------------------------------------------------------------

    /// Atomically increments and returns the claim-number sequence for `year`
    ///
    /// The first call for a year returns 1.
    async fn next_claim_sequence(&self, year: i32) -> Result<u64, PortError>;

    /// Stores a newly submitted claim
    async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError>;

    async fn load_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    /// All claims, oldest first
    async fn list_claims(&self) -> Result<Vec<Claim>, PortError>;

    /// Status changes of a claim in the order they were recorded
    async fn load_status_history(&self, claim_id: ClaimId) -> Result<Vec<StatusChange>, PortError>;

    async fn load_approval_record(&self, id: ApprovalId) -> Result<ApprovalRecord, PortError>;

    /// Approval records of a claim across all rounds
    async fn load_approval_records(&self, claim_id: ClaimId) -> Result<Vec<ApprovalRecord>, PortError>;

    // ------------------------------------------------------------------
    // Unit of work
    // ------------------------------------------------------------------

    /// Opens a unit of work on `claim_id`, waiting for its lock
    ///
    /// Returns `PortError::NotFound` when the claim does not exist.
    async fn begin(&self, claim_id: ClaimId) -> Result<Self::Snapshot, PortError>;

    /// Reads the locked claim, including writes staged in the snapshot
    async fn claim_for_update(&self, snapshot: &mut Self::Snapshot) -> Result<Claim, PortError>;

    /// Reads the locked claim's approval records, including staged writes
    async fn approval_records_for_update(
        &self,
        snapshot: &mut Self::Snapshot,
    ) -> Result<Vec<ApprovalRecord>, PortError>;

    async fn save_claim(&self, snapshot: &mut Self::Snapshot, claim: &Claim) -> Result<(), PortError>;

    async fn append_status_change(
        &self,
        snapshot: &mut Self::Snapshot,
        change: &StatusChange,
    ) -> Result<(), PortError>;

    /// Inserts or replaces an approval record
    async fn save_approval_record(
        &self,
        snapshot: &mut Self::Snapshot,
        record: &ApprovalRecord,
    ) -> Result<(), PortError>;

    /// Makes every staged write durable and releases the claim's lock
    async fn commit(&self, snapshot: Self::Snapshot) -> Result<(), PortError>;
}

/// Identity collaborator resolving approvers
#[async_trait]
pub trait ApproverDirectory: DomainPort {
    /// Picks an active user holding `role`, if any
    async fn find_active_approver(&self, role: Role) -> Result<Option<UserId>, PortError>;

    /// True when `user` is active and holds `role`
    async fn is_active_approver(&self, user: UserId, role: Role) -> Result<bool, PortError>;
}

/// Warranty coverage source for the business rules
#[async_trait]
pub trait CoverageLookup: DomainPort {
    /// Coverage on record for a vehicle, `None` when there is none
    async fn warranty_coverage(&self, vehicle_id: VehicleId) -> Result<Option<WarrantyCoverage>, PortError>;
}

/// Customer notification gateway
#[async_trait]
pub trait ClaimNotifier: DomainPort {
    async fn notify(&self, customer_id: CustomerId, event: &ClaimEvent) -> Result<(), PortError>;
}
