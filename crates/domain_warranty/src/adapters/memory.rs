//! In-memory adapters
//!
//! Each claim has its own async mutex; a [`MemorySnapshot`] owns that lock
//! for its whole lifetime and buffers writes until commit, which gives the
//! same lock-then-decide behavior as the row lock of the PostgreSQL store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use core_kernel::{
    AdapterHealth, ApprovalId, ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError,
    UserId, VehicleId,
};

use crate::approval::ApprovalRecord;
use crate::claim::Claim;
use crate::history::StatusChange;
use crate::ports::{ApproverDirectory, ClaimStore, CoverageLookup};
use crate::rules::WarrantyCoverage;
use crate::transitions::Role;

const ADAPTER_ID: &str = "memory-claim-store";

#[derive(Debug, Default)]
struct StoreState {
    claims: HashMap<ClaimId, Claim>,
    /// Claim ids in insertion order
    order: Vec<ClaimId>,
    history: HashMap<ClaimId, Vec<StatusChange>>,
    approvals: HashMap<ApprovalId, ApprovalRecord>,
    sequences: HashMap<i32, u64>,
}

impl StoreState {
    fn records_for(&self, claim_id: ClaimId) -> Vec<ApprovalRecord> {
        let mut records: Vec<_> = self
            .approvals
            .values()
            .filter(|r| r.claim_id == claim_id)
            .cloned()
            .collect();
        sort_records(&mut records);
        records
    }
}

fn sort_records(records: &mut [ApprovalRecord]) {
    records.sort_by(|a, b| {
        (a.round, a.level, a.created_at).cmp(&(b.round, b.level, b.created_at))
    });
}

/// Claim store kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryClaimStore {
    state: RwLock<StoreState>,
    locks: Mutex<HashMap<ClaimId, Arc<Mutex<()>>>>,
    unavailable: AtomicBool,
}

/// Unit of work over one claim of an [`InMemoryClaimStore`]
#[derive(Debug)]
pub struct MemorySnapshot {
    claim_id: ClaimId,
    _guard: OwnedMutexGuard<()>,
    claim: Option<Claim>,
    changes: Vec<StatusChange>,
    records: Vec<ApprovalRecord>,
}

impl MemorySnapshot {
    fn stage_record(&mut self, record: &ApprovalRecord) {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => *slot = record.clone(),
            None => self.records.push(record.clone()),
        }
    }
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write fail until reset, simulating a storage outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), PortError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PortError::ServiceUnavailable {
                service: ADAPTER_ID.to_string(),
            });
        }
        Ok(())
    }

    async fn claim_lock(&self, claim_id: ClaimId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(claim_id).or_default())
    }

    fn check_snapshot(snapshot: &MemorySnapshot, claim: &Claim) -> Result<(), PortError> {
        if snapshot.claim_id != claim.id {
            return Err(PortError::internal(format!(
                "Snapshot for claim {} cannot write claim {}",
                snapshot.claim_id, claim.id
            )));
        }
        Ok(())
    }
}

impl DomainPort for InMemoryClaimStore {}

#[async_trait]
impl HealthCheckable for InMemoryClaimStore {
    async fn health_check(&self) -> HealthCheckResult {
        let mut result = HealthCheckResult::healthy(ADAPTER_ID);
        if self.unavailable.load(Ordering::SeqCst) {
            result.status = AdapterHealth::Unhealthy;
            result.message = Some("Writes disabled".to_string());
        }
        result
    }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    type Snapshot = MemorySnapshot;

    async fn next_claim_sequence(&self, year: i32) -> Result<u64, PortError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        let sequence = state.sequences.entry(year).or_insert(0);
        *sequence += 1;
        Ok(*sequence)
    }

    async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError> {
        self.ensure_available()?;
        let mut state = self.state.write().await;
        if state.claims.contains_key(&claim.id) {
            return Err(PortError::conflict(format!("Claim {} already exists", claim.id)));
        }
        if state.claims.values().any(|c| c.claim_number == claim.claim_number) {
            return Err(PortError::conflict(format!(
                "Claim number {} already issued",
                claim.claim_number
            )));
        }
        state.order.push(claim.id);
        state.claims.insert(claim.id, claim.clone());
        debug!(claim_id = %claim.id, "Inserted claim");
        Ok(())
    }

    async fn load_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        self.state
            .read()
            .await
            .claims
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Claim", id))
    }

    async fn list_claims(&self) -> Result<Vec<Claim>, PortError> {
        let state = self.state.read().await;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.claims.get(id).cloned())
            .collect())
    }

    async fn load_status_history(&self, claim_id: ClaimId) -> Result<Vec<StatusChange>, PortError> {
        Ok(self
            .state
            .read()
            .await
            .history
            .get(&claim_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_approval_record(&self, id: ApprovalId) -> Result<ApprovalRecord, PortError> {
        self.state
            .read()
            .await
            .approvals
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("ApprovalRecord", id))
    }

    async fn load_approval_records(&self, claim_id: ClaimId) -> Result<Vec<ApprovalRecord>, PortError> {
        Ok(self.state.read().await.records_for(claim_id))
    }

    async fn begin(&self, claim_id: ClaimId) -> Result<MemorySnapshot, PortError> {
        if !self.state.read().await.claims.contains_key(&claim_id) {
            return Err(PortError::not_found("Claim", claim_id));
        }
        let guard = self.claim_lock(claim_id).await.lock_owned().await;
        Ok(MemorySnapshot {
            claim_id,
            _guard: guard,
            claim: None,
            changes: Vec::new(),
            records: Vec::new(),
        })
    }

    async fn claim_for_update(&self, snapshot: &mut MemorySnapshot) -> Result<Claim, PortError> {
        if let Some(claim) = &snapshot.claim {
            return Ok(claim.clone());
        }
        self.load_claim(snapshot.claim_id).await
    }

    async fn approval_records_for_update(
        &self,
        snapshot: &mut MemorySnapshot,
    ) -> Result<Vec<ApprovalRecord>, PortError> {
        let mut records = self.state.read().await.records_for(snapshot.claim_id);
        for staged in &snapshot.records {
            match records.iter_mut().find(|r| r.id == staged.id) {
                Some(slot) => *slot = staged.clone(),
                None => records.push(staged.clone()),
            }
        }
        sort_records(&mut records);
        Ok(records)
    }

    async fn save_claim(&self, snapshot: &mut MemorySnapshot, claim: &Claim) -> Result<(), PortError> {
        Self::check_snapshot(snapshot, claim)?;
        snapshot.claim = Some(claim.clone());
        Ok(())
    }

    async fn append_status_change(
        &self,
        snapshot: &mut MemorySnapshot,
        change: &StatusChange,
    ) -> Result<(), PortError> {
        if change.claim_id != snapshot.claim_id {
            return Err(PortError::internal("Status change belongs to another claim"));
        }
        snapshot.changes.push(change.clone());
        Ok(())
    }

    async fn save_approval_record(
        &self,
        snapshot: &mut MemorySnapshot,
        record: &ApprovalRecord,
    ) -> Result<(), PortError> {
        if record.claim_id != snapshot.claim_id {
            return Err(PortError::internal("Approval record belongs to another claim"));
        }
        snapshot.stage_record(record);
        Ok(())
    }

    async fn commit(&self, snapshot: MemorySnapshot) -> Result<(), PortError> {
        self.ensure_available()?;
        let MemorySnapshot {
            claim_id,
            claim,
            changes,
            records,
            ..
        } = snapshot;

        let mut state = self.state.write().await;
        if let Some(claim) = claim {
            state.claims.insert(claim_id, claim);
        }
        state.history.entry(claim_id).or_default().extend(changes);
        for record in records {
            state.approvals.insert(record.id, record);
        }
        debug!(claim_id = %claim_id, "Committed unit of work");
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct DirectoryEntry {
    user: UserId,
    role: Role,
    active: bool,
}

/// Approver directory kept in process memory
///
/// `find_active_approver` returns the first active user registered for a
/// role.
#[derive(Debug, Default)]
pub struct InMemoryApproverDirectory {
    entries: RwLock<Vec<DirectoryEntry>>,
}

impl InMemoryApproverDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_approver(&self, user: UserId, role: Role) {
        self.entries.write().await.push(DirectoryEntry {
            user,
            role,
            active: true,
        });
    }

    /// Marks every entry of `user` inactive
    pub async fn deactivate(&self, user: UserId) {
        for entry in self.entries.write().await.iter_mut().filter(|e| e.user == user) {
            entry.active = false;
        }
    }
}

impl DomainPort for InMemoryApproverDirectory {}

#[async_trait]
impl ApproverDirectory for InMemoryApproverDirectory {
    async fn find_active_approver(&self, role: Role) -> Result<Option<UserId>, PortError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .find(|e| e.active && e.role == role)
            .map(|e| e.user))
    }

    async fn is_active_approver(&self, user: UserId, role: Role) -> Result<bool, PortError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .any(|e| e.active && e.user == user && e.role == role))
    }
}

/// Warranty coverage kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryCoverageLookup {
    coverage: RwLock<HashMap<VehicleId, WarrantyCoverage>>,
}

impl InMemoryCoverageLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, coverage: WarrantyCoverage) {
        self.coverage.write().await.insert(coverage.vehicle_id, coverage);
    }
}

impl DomainPort for InMemoryCoverageLookup {}

#[async_trait]
impl CoverageLookup for InMemoryCoverageLookup {
    async fn warranty_coverage(&self, vehicle_id: VehicleId) -> Result<Option<WarrantyCoverage>, PortError> {
        Ok(self.coverage.read().await.get(&vehicle_id).cloned())
    }
}
