//! PostgreSQL Claim Store
//!
//! Implements the `ClaimStore` port on top of [`ClaimsRepository`].
//!
//! A snapshot is an open transaction that took the claim's row lock with
//! `SELECT ... FOR UPDATE` in [`ClaimStore::begin`]. Everything written
//! through the snapshot becomes visible on commit; dropping the snapshot
//! rolls the transaction back and releases the lock.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, ApprovalId, ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PortError,
};
use domain_warranty::{ApprovalRecord, Claim, ClaimStore, StatusChange};

use crate::error::DatabaseError;
use crate::repositories::claims::{ApprovalRow, ClaimRow, ClaimsRepository, StatusChangeRow};

const ADAPTER_ID: &str = "postgres-claim-store";

/// PostgreSQL-backed implementation of the `ClaimStore` port
///
/// Database errors are translated to `PortError` through
/// `From<DatabaseError>`; a claim that disappears under a lock surfaces as
/// `PortError::NotFound`.
#[derive(Debug, Clone)]
pub struct PostgresClaimStore {
    repository: ClaimsRepository,
    pool: PgPool,
}

/// Unit of work holding one claim's row lock
pub struct PgSnapshot {
    claim_id: ClaimId,
    tx: Transaction<'static, Postgres>,
}

impl std::fmt::Debug for PgSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgSnapshot")
            .field("claim_id", &self.claim_id)
            .finish_non_exhaustive()
    }
}

impl PgSnapshot {
    pub fn claim_id(&self) -> ClaimId {
        self.claim_id
    }
}

impl PostgresClaimStore {
    /// Creates a new store with the given database pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: ClaimsRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn db_to_port_error(error: DatabaseError) -> PortError {
    PortError::from(error)
}

fn rows_into<R, T>(rows: Vec<R>) -> Result<Vec<T>, PortError>
where
    T: TryFrom<R, Error = DatabaseError>,
{
    rows.into_iter()
        .map(T::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_to_port_error)
}

impl DomainPort for PostgresClaimStore {}

#[async_trait]
impl HealthCheckable for PostgresClaimStore {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl ClaimStore for PostgresClaimStore {
    type Snapshot = PgSnapshot;

    #[instrument(skip(self))]
    async fn next_claim_sequence(&self, year: i32) -> Result<u64, PortError> {
        let value = self.repository.next_sequence(year).await.map_err(db_to_port_error)?;
        u64::try_from(value)
            .map_err(|e| db_to_port_error(DatabaseError::invalid_column("last_value", e)))
    }

    #[instrument(skip(self, claim), fields(claim_id = %claim.id))]
    async fn insert_claim(&self, claim: &Claim) -> Result<(), PortError> {
        let row = ClaimRow::try_from(claim).map_err(db_to_port_error)?;
        self.repository.insert(&row).await.map_err(db_to_port_error)?;
        debug!(claim_number = %claim.claim_number, "Claim inserted");
        Ok(())
    }

    #[instrument(skip(self), fields(claim_id = %id))]
    async fn load_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
        let row = self
            .repository
            .get_by_id(*id.as_uuid())
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => PortError::not_found("Claim", id),
                other => db_to_port_error(other),
            })?;
        Claim::try_from(row).map_err(db_to_port_error)
    }

    async fn list_claims(&self) -> Result<Vec<Claim>, PortError> {
        let rows = self.repository.list_all().await.map_err(db_to_port_error)?;
        debug!(count = rows.len(), "Listed claims");
        rows_into(rows)
    }

    async fn load_status_history(&self, claim_id: ClaimId) -> Result<Vec<StatusChange>, PortError> {
        let rows = self
            .repository
            .status_history(*claim_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        rows_into(rows)
    }

    async fn load_approval_record(&self, id: ApprovalId) -> Result<ApprovalRecord, PortError> {
        let row = self
            .repository
            .get_approval(*id.as_uuid())
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => PortError::not_found("ApprovalRecord", id),
                other => db_to_port_error(other),
            })?;
        ApprovalRecord::try_from(row).map_err(db_to_port_error)
    }

    async fn load_approval_records(&self, claim_id: ClaimId) -> Result<Vec<ApprovalRecord>, PortError> {
        let rows = self
            .repository
            .approvals_for_claim(*claim_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        rows_into(rows)
    }

    #[instrument(skip(self), fields(claim_id = %claim_id))]
    async fn begin(&self, claim_id: ClaimId) -> Result<PgSnapshot, PortError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_to_port_error(DatabaseError::from(e)))?;

        let exists = ClaimsRepository::lock_claim(&mut *tx, *claim_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        if !exists {
            return Err(PortError::not_found("Claim", claim_id));
        }

        debug!("Claim row locked");
        Ok(PgSnapshot { claim_id, tx })
    }

    async fn claim_for_update(&self, snapshot: &mut PgSnapshot) -> Result<Claim, PortError> {
        let claim_id = snapshot.claim_id;
        let row = ClaimsRepository::fetch_claim(&mut *snapshot.tx, *claim_id.as_uuid())
            .await
            .map_err(db_to_port_error)?
            .ok_or_else(|| PortError::not_found("Claim", claim_id))?;
        Claim::try_from(row).map_err(db_to_port_error)
    }

    async fn approval_records_for_update(
        &self,
        snapshot: &mut PgSnapshot,
    ) -> Result<Vec<ApprovalRecord>, PortError> {
        let rows = ClaimsRepository::fetch_approvals(&mut *snapshot.tx, *snapshot.claim_id.as_uuid())
            .await
            .map_err(db_to_port_error)?;
        rows_into(rows)
    }

    async fn save_claim(&self, snapshot: &mut PgSnapshot, claim: &Claim) -> Result<(), PortError> {
        if claim.id != snapshot.claim_id {
            return Err(PortError::conflict(format!(
                "Snapshot for {} cannot write {}",
                snapshot.claim_id, claim.id
            )));
        }
        let row = ClaimRow::try_from(claim).map_err(db_to_port_error)?;
        ClaimsRepository::update_claim(&mut *snapshot.tx, &row)
            .await
            .map_err(db_to_port_error)
    }

    async fn append_status_change(
        &self,
        snapshot: &mut PgSnapshot,
        change: &StatusChange,
    ) -> Result<(), PortError> {
        let row = StatusChangeRow::from(change);
        ClaimsRepository::insert_status_change(&mut *snapshot.tx, &row)
            .await
            .map_err(db_to_port_error)
    }

    async fn save_approval_record(
        &self,
        snapshot: &mut PgSnapshot,
        record: &ApprovalRecord,
    ) -> Result<(), PortError> {
        if record.claim_id != snapshot.claim_id {
            return Err(PortError::conflict(format!(
                "Snapshot for {} cannot write approvals of {}",
                snapshot.claim_id, record.claim_id
            )));
        }
        let row = ApprovalRow::try_from(record).map_err(db_to_port_error)?;
        ClaimsRepository::upsert_approval(&mut *snapshot.tx, &row)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self, snapshot), fields(claim_id = %snapshot.claim_id))]
    async fn commit(&self, snapshot: PgSnapshot) -> Result<(), PortError> {
        snapshot
            .tx
            .commit()
            .await
            .map_err(|e| db_to_port_error(DatabaseError::TransactionFailed(e.to_string())))?;
        debug!("Unit of work committed");
        Ok(())
    }
}
