//! Claim aggregate

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, CustomerId, UserId, VehicleId};

use crate::config::DueDatePolicy;
use crate::error::WorkflowError;
use crate::numbering::ClaimNumber;

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    /// Received from the customer, awaiting review
    Submitted,
    /// Being reviewed or going through the approval chain
    UnderReview,
    /// Approved for repair
    Approved,
    /// Rejected; the customer may resubmit
    Rejected,
    /// Repair in progress
    Processing,
    /// Repair finished
    Completed,
    /// Withdrawn after approval
    Cancelled,
}

impl ClaimStatus {
    /// Every status, in lifecycle order
    pub const ALL: [ClaimStatus; 7] = [
        ClaimStatus::Submitted,
        ClaimStatus::UnderReview,
        ClaimStatus::Approved,
        ClaimStatus::Rejected,
        ClaimStatus::Processing,
        ClaimStatus::Completed,
        ClaimStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Submitted => "SUBMITTED",
            ClaimStatus::UnderReview => "UNDER_REVIEW",
            ClaimStatus::Approved => "APPROVED",
            ClaimStatus::Rejected => "REJECTED",
            ClaimStatus::Processing => "PROCESSING",
            ClaimStatus::Completed => "COMPLETED",
            ClaimStatus::Cancelled => "CANCELLED",
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClaimStatus::Completed | ClaimStatus::Cancelled)
    }

    /// Statuses in which the claim still has work ahead of it
    pub fn is_open(&self) -> bool {
        !matches!(
            self,
            ClaimStatus::Completed | ClaimStatus::Cancelled | ClaimStatus::Rejected
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        ClaimStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| WorkflowError::validation(format!("Unknown claim status: {}", s)))
    }
}

/// Type of warranty issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    ManufacturingDefect,
    NormalWear,
    AccidentalDamage,
    Electrical,
    Battery,
    Software,
}

impl ClaimType {
    pub const ALL: [ClaimType; 6] = [
        ClaimType::ManufacturingDefect,
        ClaimType::NormalWear,
        ClaimType::AccidentalDamage,
        ClaimType::Electrical,
        ClaimType::Battery,
        ClaimType::Software,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::ManufacturingDefect => "manufacturing_defect",
            ClaimType::NormalWear => "normal_wear",
            ClaimType::AccidentalDamage => "accidental_damage",
            ClaimType::Electrical => "electrical",
            ClaimType::Battery => "battery",
            ClaimType::Software => "software",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ClaimType::ALL
            .into_iter()
            .find(|claim_type| claim_type.as_str() == normalized)
            .ok_or_else(|| WorkflowError::validation(format!("Unknown claim type: {}", s)))
    }
}

/// Claim priority, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Critical];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == normalized)
            .ok_or_else(|| WorkflowError::validation(format!("Unknown priority: {}", s)))
    }
}

/// Outcome recorded on the claim when the approval chain concludes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionDecision {
    Approved,
    Rejected,
}

/// Resolution payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub decision: ResolutionDecision,
    pub reason: Option<String>,
    pub decided_by: UserId,
    pub approved_amount: Option<Decimal>,
    pub repair_instructions: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// Data supplied when a customer files a claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClaim {
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    pub claim_type: ClaimType,
    pub title: String,
    pub description: Option<String>,
    pub issue_date: NaiveDate,
    pub reported_mileage: u32,
    pub estimated_cost: Decimal,
    pub priority: Priority,
}

impl NewClaim {
    /// Checks the request shape before a claim number is drawn
    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.title.trim().is_empty() {
            return Err(WorkflowError::validation("Claim title must not be empty"));
        }
        if self.estimated_cost.is_sign_negative() {
            return Err(WorkflowError::validation("Estimated cost must not be negative"));
        }
        Ok(())
    }
}

/// Editable claim details
///
/// Claim number and due date cannot be edited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimDetailsUpdate {
    pub description: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub priority: Option<Priority>,
    pub assigned_to: Option<UserId>,
    pub repair_instructions: Option<String>,
}

/// A warranty claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier
    pub id: ClaimId,
    /// Human-readable claim number, assigned once at submission
    pub claim_number: ClaimNumber,
    /// Customer who filed the claim
    pub customer_id: CustomerId,
    /// Vehicle the claim is for
    pub vehicle_id: VehicleId,
    pub claim_type: ClaimType,
    pub title: String,
    pub description: Option<String>,
    /// Date the issue appeared
    pub issue_date: NaiveDate,
    /// Odometer reading at the time of the claim
    pub reported_mileage: u32,
    pub estimated_cost: Decimal,
    pub approved_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub priority: Priority,
    pub status: ClaimStatus,
    /// Staff member handling the claim
    pub assigned_to: Option<UserId>,
    /// Derived from priority at submission
    pub due_date: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub resolution: Option<Resolution>,
    /// Number of approval rounds started for this claim
    pub approval_round: u32,
    /// Whether the latest approval round is still open
    pub approval_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Claim {
    /// Creates a new claim in `SUBMITTED`
    pub fn submit(
        request: NewClaim,
        claim_number: ClaimNumber,
        due_dates: &DueDatePolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ClaimId::new_v7(),
            claim_number,
            customer_id: request.customer_id,
            vehicle_id: request.vehicle_id,
            claim_type: request.claim_type,
            title: request.title.trim().to_string(),
            description: request.description,
            issue_date: request.issue_date,
            reported_mileage: request.reported_mileage,
            estimated_cost: request.estimated_cost,
            approved_cost: None,
            actual_cost: None,
            priority: request.priority,
            status: ClaimStatus::Submitted,
            assigned_to: None,
            due_date: now + due_dates.offset_for(request.priority),
            completed_at: None,
            resolution: None,
            approval_round: 0,
            approval_open: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the claim to `target`
    ///
    /// Legality is checked by the lifecycle engine before this is called.
    /// Leaving `UNDER_REVIEW` closes the open approval round.
    pub(crate) fn apply_status(&mut self, target: ClaimStatus, now: DateTime<Utc>) {
        if self.status == ClaimStatus::UnderReview && target != ClaimStatus::UnderReview {
            self.approval_open = false;
        }
        if target == ClaimStatus::Completed {
            self.completed_at = Some(now);
        }
        self.status = target;
        self.updated_at = now;
    }

    /// Applies a details update
    ///
    /// Cost and priority drive the approval tiers, so they are frozen while
    /// an approval round is open.
    pub fn apply_details(&mut self, update: ClaimDetailsUpdate, now: DateTime<Utc>) -> Result<(), WorkflowError> {
        if !matches!(self.status, ClaimStatus::Submitted | ClaimStatus::UnderReview) {
            return Err(WorkflowError::validation(format!(
                "Claim details cannot change in status {}",
                self.status
            )));
        }
        let changes_tiers = update.estimated_cost.is_some() || update.priority.is_some();
        if changes_tiers && self.approval_open {
            return Err(WorkflowError::validation(
                "Estimated cost and priority are frozen while approvals are in progress",
            ));
        }
        if let Some(cost) = update.estimated_cost {
            if cost.is_sign_negative() {
                return Err(WorkflowError::validation("Estimated cost must not be negative"));
            }
            self.estimated_cost = cost;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(assignee) = update.assigned_to {
            self.assigned_to = Some(assignee);
        }
        if let Some(instructions) = update.repair_instructions {
            if let Some(resolution) = self.resolution.as_mut() {
                resolution.repair_instructions = Some(instructions);
            }
        }
        self.updated_at = now;
        Ok(())
    }

    /// True when the due date has passed and work is still outstanding
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && self.due_date < now
    }

    /// Whole processing time for completed claims
    pub fn processing_time(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|completed| completed - self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn new_claim(priority: Priority) -> NewClaim {
        NewClaim {
            customer_id: CustomerId::new(),
            vehicle_id: VehicleId::new(),
            claim_type: ClaimType::Battery,
            title: "  Battery drains overnight ".to_string(),
            description: None,
            issue_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            reported_mileage: 42_000,
            estimated_cost: dec!(1800),
            priority,
        }
    }

    fn submit(priority: Priority) -> Claim {
        let now = Utc::now();
        Claim::submit(new_claim(priority), ClaimNumber::new(2026, 7), &DueDatePolicy::default(), now)
    }

    #[test]
    fn test_submit_starts_in_submitted() {
        let claim = submit(Priority::Medium);
        assert_eq!(claim.status, ClaimStatus::Submitted);
        assert_eq!(claim.title, "Battery drains overnight");
        assert_eq!(claim.claim_number.to_string(), "WC-2026-000007");
        assert!(claim.completed_at.is_none());
        assert!(!claim.approval_open);
    }

    #[test]
    fn test_due_date_follows_priority() {
        for (priority, days) in [
            (Priority::Critical, 1),
            (Priority::High, 3),
            (Priority::Medium, 7),
            (Priority::Low, 14),
        ] {
            let claim = submit(priority);
            assert_eq!(claim.due_date - claim.created_at, Duration::days(days));
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(Priority::High < Priority::Critical);
    }

    #[test]
    fn test_status_parsing_is_lenient() {
        assert_eq!("under_review".parse::<ClaimStatus>().unwrap(), ClaimStatus::UnderReview);
        assert_eq!("UNDER-REVIEW".parse::<ClaimStatus>().unwrap(), ClaimStatus::UnderReview);
        assert!("archived".parse::<ClaimStatus>().is_err());
    }

    #[test]
    fn test_claim_type_serde_names() {
        let json = serde_json::to_string(&ClaimType::AccidentalDamage).unwrap();
        assert_eq!(json, "\"accidental_damage\"");
        assert_eq!("accidental-damage".parse::<ClaimType>().unwrap(), ClaimType::AccidentalDamage);
    }

    #[test]
    fn test_details_update_keeps_due_date_and_number() {
        let mut claim = submit(Priority::Low);
        let due = claim.due_date;
        let number = claim.claim_number;

        claim
            .apply_details(
                ClaimDetailsUpdate {
                    priority: Some(Priority::Critical),
                    estimated_cost: Some(dec!(25000)),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();

        assert_eq!(claim.priority, Priority::Critical);
        assert_eq!(claim.due_date, due);
        assert_eq!(claim.claim_number, number);
    }

    #[test]
    fn test_details_frozen_during_approval_round() {
        let mut claim = submit(Priority::Low);
        claim.status = ClaimStatus::UnderReview;
        claim.approval_open = true;

        let result = claim.apply_details(
            ClaimDetailsUpdate { estimated_cost: Some(dec!(100)), ..Default::default() },
            Utc::now(),
        );
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        let result = claim.apply_details(
            ClaimDetailsUpdate { description: Some("more detail".to_string()), ..Default::default() },
            Utc::now(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_leaving_review_closes_round_and_completion_is_stamped() {
        let mut claim = submit(Priority::Low);
        claim.status = ClaimStatus::UnderReview;
        claim.approval_open = true;

        claim.apply_status(ClaimStatus::Approved, Utc::now());
        assert!(!claim.approval_open);

        claim.apply_status(ClaimStatus::Processing, Utc::now());
        assert!(claim.completed_at.is_none());
        claim.apply_status(ClaimStatus::Completed, Utc::now());
        assert!(claim.completed_at.is_some());
        assert!(claim.processing_time().is_some());
    }

    #[test]
    fn test_overdue_only_for_open_claims() {
        let mut claim = submit(Priority::Critical);
        let later = claim.due_date + Duration::hours(1);
        assert!(claim.is_overdue(later));

        claim.status = ClaimStatus::Rejected;
        assert!(!claim.is_overdue(later));
    }

    #[test]
    fn test_new_claim_validation() {
        let mut request = new_claim(Priority::Low);
        assert!(request.validate().is_ok());

        request.title = "   ".to_string();
        assert!(request.validate().is_err());

        let mut request = new_claim(Priority::Low);
        request.estimated_cost = dec!(-1);
        assert!(request.validate().is_err());
    }
}
