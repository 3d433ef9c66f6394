//! Claims repository implementation
//!
//! Row types and SQL for warranty claims, their status history, approval
//! records and the per-year claim-number sequence. Every query function is
//! generic over the executor so the same SQL runs against the pool or inside
//! a claim's unit-of-work transaction.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgExecutor;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{ApprovalId, ClaimId, CustomerId, StatusChangeId, UserId, VehicleId};
use domain_warranty::{
    ApprovalLevel, ApprovalRecord, ApprovalStatus, Claim, ClaimNumber, ClaimStatus, ClaimType,
    Priority, Resolution, StatusChange,
};

use crate::error::DatabaseError;

const CLAIM_COLUMNS: &str = r#"
    claim_id, claim_number, customer_id, vehicle_id, claim_type, title,
    description, issue_date, reported_mileage, estimated_cost, approved_cost,
    actual_cost, priority, status, assigned_to, due_date, completed_at,
    resolution, approval_round, approval_open, created_at, updated_at
"#;

const APPROVAL_COLUMNS: &str = r#"
    approval_id, claim_id, round, level, approver_id, status, comments,
    approved_amount, decided_at, created_at
"#;

/// Database row for `warranty_claims`
#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    pub claim_id: Uuid,
    pub claim_number: String,
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    pub claim_type: String,
    pub title: String,
    pub description: Option<String>,
    pub issue_date: NaiveDate,
    pub reported_mileage: i32,
    pub estimated_cost: Decimal,
    pub approved_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub priority: String,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    pub due_date: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub resolution: Option<Json<Resolution>>,
    pub approval_round: i32,
    pub approval_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Claim> for ClaimRow {
    type Error = DatabaseError;

    fn try_from(claim: &Claim) -> Result<Self, Self::Error> {
        Ok(Self {
            claim_id: *claim.id.as_uuid(),
            claim_number: claim.claim_number.to_string(),
            customer_id: *claim.customer_id.as_uuid(),
            vehicle_id: *claim.vehicle_id.as_uuid(),
            claim_type: claim.claim_type.as_str().to_string(),
            title: claim.title.clone(),
            description: claim.description.clone(),
            issue_date: claim.issue_date,
            reported_mileage: i32::try_from(claim.reported_mileage)
                .map_err(|e| DatabaseError::invalid_column("reported_mileage", e))?,
            estimated_cost: claim.estimated_cost,
            approved_cost: claim.approved_cost,
            actual_cost: claim.actual_cost,
            priority: claim.priority.as_str().to_string(),
            status: claim.status.as_str().to_string(),
            assigned_to: claim.assigned_to.map(|user| *user.as_uuid()),
            due_date: claim.due_date,
            completed_at: claim.completed_at,
            resolution: claim.resolution.clone().map(Json),
            approval_round: i32::try_from(claim.approval_round)
                .map_err(|e| DatabaseError::invalid_column("approval_round", e))?,
            approval_open: claim.approval_open,
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        })
    }
}

impl TryFrom<ClaimRow> for Claim {
    type Error = DatabaseError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        Ok(Claim {
            id: ClaimId::from_uuid(row.claim_id),
            claim_number: ClaimNumber::from_str(&row.claim_number)
                .map_err(|e| DatabaseError::invalid_column("claim_number", e))?,
            customer_id: CustomerId::from_uuid(row.customer_id),
            vehicle_id: VehicleId::from_uuid(row.vehicle_id),
            claim_type: ClaimType::from_str(&row.claim_type)
                .map_err(|e| DatabaseError::invalid_column("claim_type", e))?,
            title: row.title,
            description: row.description,
            issue_date: row.issue_date,
            reported_mileage: u32::try_from(row.reported_mileage)
                .map_err(|e| DatabaseError::invalid_column("reported_mileage", e))?,
            estimated_cost: row.estimated_cost,
            approved_cost: row.approved_cost,
            actual_cost: row.actual_cost,
            priority: Priority::from_str(&row.priority)
                .map_err(|e| DatabaseError::invalid_column("priority", e))?,
            status: ClaimStatus::from_str(&row.status)
                .map_err(|e| DatabaseError::invalid_column("status", e))?,
            assigned_to: row.assigned_to.map(UserId::from_uuid),
            due_date: row.due_date,
            completed_at: row.completed_at,
            resolution: row.resolution.map(|json| json.0),
            approval_round: u32::try_from(row.approval_round)
                .map_err(|e| DatabaseError::invalid_column("approval_round", e))?,
            approval_open: row.approval_open,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for `claim_status_changes`
#[derive(Debug, Clone, FromRow)]
pub struct StatusChangeRow {
    pub change_id: Uuid,
    pub claim_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub reason: Option<String>,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
    pub note: String,
}

impl From<&StatusChange> for StatusChangeRow {
    fn from(change: &StatusChange) -> Self {
        Self {
            change_id: *change.id.as_uuid(),
            claim_id: *change.claim_id.as_uuid(),
            from_status: change.from.as_str().to_string(),
            to_status: change.to.as_str().to_string(),
            reason: change.reason.clone(),
            changed_by: *change.changed_by.as_uuid(),
            changed_at: change.changed_at,
            note: change.note.clone(),
        }
    }
}

impl TryFrom<StatusChangeRow> for StatusChange {
    type Error = DatabaseError;

    fn try_from(row: StatusChangeRow) -> Result<Self, Self::Error> {
        Ok(StatusChange {
            id: StatusChangeId::from_uuid(row.change_id),
            claim_id: ClaimId::from_uuid(row.claim_id),
            from: ClaimStatus::from_str(&row.from_status)
                .map_err(|e| DatabaseError::invalid_column("from_status", e))?,
            to: ClaimStatus::from_str(&row.to_status)
                .map_err(|e| DatabaseError::invalid_column("to_status", e))?,
            reason: row.reason,
            changed_by: UserId::from_uuid(row.changed_by),
            changed_at: row.changed_at,
            note: row.note,
        })
    }
}

/// Database row for `approval_records`
#[derive(Debug, Clone, FromRow)]
pub struct ApprovalRow {
    pub approval_id: Uuid,
    pub claim_id: Uuid,
    pub round: i32,
    pub level: i16,
    pub approver_id: Option<Uuid>,
    pub status: String,
    pub comments: Option<String>,
    pub approved_amount: Option<Decimal>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&ApprovalRecord> for ApprovalRow {
    type Error = DatabaseError;

    fn try_from(record: &ApprovalRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            approval_id: *record.id.as_uuid(),
            claim_id: *record.claim_id.as_uuid(),
            round: i32::try_from(record.round).map_err(|e| DatabaseError::invalid_column("round", e))?,
            level: i16::from(record.level.rank()),
            approver_id: record.approver_id.map(|user| *user.as_uuid()),
            status: record.status.as_str().to_string(),
            comments: record.comments.clone(),
            approved_amount: record.approved_amount,
            decided_at: record.decided_at,
            created_at: record.created_at,
        })
    }
}

impl TryFrom<ApprovalRow> for ApprovalRecord {
    type Error = DatabaseError;

    fn try_from(row: ApprovalRow) -> Result<Self, Self::Error> {
        let level = u8::try_from(row.level)
            .ok()
            .and_then(ApprovalLevel::from_rank)
            .ok_or_else(|| DatabaseError::invalid_column("level", row.level))?;

        Ok(ApprovalRecord {
            id: ApprovalId::from_uuid(row.approval_id),
            claim_id: ClaimId::from_uuid(row.claim_id),
            round: u32::try_from(row.round).map_err(|e| DatabaseError::invalid_column("round", e))?,
            level,
            approver_id: row.approver_id.map(UserId::from_uuid),
            status: ApprovalStatus::from_str(&row.status)
                .map_err(|e| DatabaseError::invalid_column("status", e))?,
            comments: row.comments,
            approved_amount: row.approved_amount,
            decided_at: row.decided_at,
            created_at: row.created_at,
        })
    }
}

/// Repository for warranty claim data
///
/// Read methods run on the pool. The associated functions taking an
/// executor are used by the claim store inside its transactions.
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
}

impl ClaimsRepository {
    /// Creates a new ClaimsRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Retrieves a claim by its identifier
    pub async fn get_by_id(&self, claim_id: Uuid) -> Result<ClaimRow, DatabaseError> {
        Self::fetch_claim(&self.pool, claim_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", claim_id))
    }

    /// Retrieves all claims, oldest first
    pub async fn list_all(&self) -> Result<Vec<ClaimRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM warranty_claims ORDER BY created_at, claim_id",
            CLAIM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ClaimRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Retrieves the status history of a claim in recording order
    pub async fn status_history(&self, claim_id: Uuid) -> Result<Vec<StatusChangeRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, StatusChangeRow>(
            r#"
            SELECT change_id, claim_id, from_status, to_status, reason,
                   changed_by, changed_at, note
            FROM claim_status_changes
            WHERE claim_id = $1
            ORDER BY seq
            "#,
        )
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Retrieves one approval record
    pub async fn get_approval(&self, approval_id: Uuid) -> Result<ApprovalRow, DatabaseError> {
        let sql = format!("SELECT {} FROM approval_records WHERE approval_id = $1", APPROVAL_COLUMNS);
        sqlx::query_as::<_, ApprovalRow>(&sql)
            .bind(approval_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("ApprovalRecord", approval_id))
    }

    /// Retrieves every approval record of a claim
    pub async fn approvals_for_claim(&self, claim_id: Uuid) -> Result<Vec<ApprovalRow>, DatabaseError> {
        Self::fetch_approvals(&self.pool, claim_id).await
    }

    /// Increments the claim-number sequence for `year` and returns the new value
    pub async fn next_sequence(&self, year: i32) -> Result<i64, DatabaseError> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO claim_number_sequences (year, last_value)
            VALUES ($1, 1)
            ON CONFLICT (year)
            DO UPDATE SET last_value = claim_number_sequences.last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(year)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }

    /// Inserts a newly submitted claim
    pub async fn insert(&self, row: &ClaimRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO warranty_claims (
                claim_id, claim_number, customer_id, vehicle_id, claim_type, title,
                description, issue_date, reported_mileage, estimated_cost, approved_cost,
                actual_cost, priority, status, assigned_to, due_date, completed_at,
                resolution, approval_round, approval_open, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            "#,
        )
        .bind(row.claim_id)
        .bind(&row.claim_number)
        .bind(row.customer_id)
        .bind(row.vehicle_id)
        .bind(&row.claim_type)
        .bind(&row.title)
        .bind(&row.description)
        .bind(row.issue_date)
        .bind(row.reported_mileage)
        .bind(row.estimated_cost)
        .bind(row.approved_cost)
        .bind(row.actual_cost)
        .bind(&row.priority)
        .bind(&row.status)
        .bind(row.assigned_to)
        .bind(row.due_date)
        .bind(row.completed_at)
        .bind(&row.resolution)
        .bind(row.approval_round)
        .bind(row.approval_open)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Executor-generic queries
    // ------------------------------------------------------------------

    /// Reads a claim row
    pub async fn fetch_claim<'e, E: PgExecutor<'e>>(
        executor: E,
        claim_id: Uuid,
    ) -> Result<Option<ClaimRow>, DatabaseError> {
        let sql = format!("SELECT {} FROM warranty_claims WHERE claim_id = $1", CLAIM_COLUMNS);
        let row = sqlx::query_as::<_, ClaimRow>(&sql)
            .bind(claim_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Takes the row lock on a claim, waiting for any holder to finish
    ///
    /// Returns `false` when the claim does not exist.
    pub async fn lock_claim<'e, E: PgExecutor<'e>>(executor: E, claim_id: Uuid) -> Result<bool, DatabaseError> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT claim_id FROM warranty_claims WHERE claim_id = $1 FOR UPDATE")
                .bind(claim_id)
                .fetch_optional(executor)
                .await?;
        Ok(locked.is_some())
    }

    pub async fn fetch_approvals<'e, E: PgExecutor<'e>>(
        executor: E,
        claim_id: Uuid,
    ) -> Result<Vec<ApprovalRow>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM approval_records WHERE claim_id = $1 ORDER BY round, level, created_at",
            APPROVAL_COLUMNS
        );
        let rows = sqlx::query_as::<_, ApprovalRow>(&sql)
            .bind(claim_id)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    /// Writes every mutable column of a claim
    pub async fn update_claim<'e, E: PgExecutor<'e>>(executor: E, row: &ClaimRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE warranty_claims SET
                description = $2,
                estimated_cost = $3,
                approved_cost = $4,
                actual_cost = $5,
                priority = $6,
                status = $7,
                assigned_to = $8,
                completed_at = $9,
                resolution = $10,
                approval_round = $11,
                approval_open = $12,
                updated_at = $13
            WHERE claim_id = $1
            "#,
        )
        .bind(row.claim_id)
        .bind(&row.description)
        .bind(row.estimated_cost)
        .bind(row.approved_cost)
        .bind(row.actual_cost)
        .bind(&row.priority)
        .bind(&row.status)
        .bind(row.assigned_to)
        .bind(row.completed_at)
        .bind(&row.resolution)
        .bind(row.approval_round)
        .bind(row.approval_open)
        .bind(row.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Claim", row.claim_id));
        }
        Ok(())
    }

    pub async fn insert_status_change<'e, E: PgExecutor<'e>>(
        executor: E,
        row: &StatusChangeRow,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO claim_status_changes (
                change_id, claim_id, from_status, to_status, reason,
                changed_by, changed_at, note
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(row.change_id)
        .bind(row.claim_id)
        .bind(&row.from_status)
        .bind(&row.to_status)
        .bind(&row.reason)
        .bind(row.changed_by)
        .bind(row.changed_at)
        .bind(&row.note)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Inserts an approval record or replaces its decision fields
    pub async fn upsert_approval<'e, E: PgExecutor<'e>>(executor: E, row: &ApprovalRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO approval_records (
                approval_id, claim_id, round, level, approver_id, status,
                comments, approved_amount, decided_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (approval_id) DO UPDATE SET
                approver_id = EXCLUDED.approver_id,
                status = EXCLUDED.status,
                comments = EXCLUDED.comments,
                approved_amount = EXCLUDED.approved_amount,
                decided_at = EXCLUDED.decided_at
            "#,
        )
        .bind(row.approval_id)
        .bind(row.claim_id)
        .bind(row.round)
        .bind(row.level)
        .bind(row.approver_id)
        .bind(&row.status)
        .bind(&row.comments)
        .bind(row.approved_amount)
        .bind(row.decided_at)
        .bind(row.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}
