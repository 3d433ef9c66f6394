//! Workflow statistics

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::claim::{Claim, ClaimStatus};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Aggregate view over all claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStatistics {
    pub total_claims: u64,
    /// Claim count per status; every status is present
    pub status_distribution: BTreeMap<ClaimStatus, u64>,
    /// Mean days from creation to completion over completed claims
    pub avg_processing_days: Option<f64>,
    /// Open claims whose due date has passed
    pub overdue_count: u64,
}

impl WorkflowStatistics {
    pub fn compute(claims: &[Claim], now: DateTime<Utc>) -> Self {
        let mut status_distribution: BTreeMap<ClaimStatus, u64> =
            ClaimStatus::ALL.into_iter().map(|status| (status, 0)).collect();
        for claim in claims {
            *status_distribution.entry(claim.status).or_default() += 1;
        }

        let processing_days: Vec<f64> = claims
            .iter()
            .filter(|claim| claim.status == ClaimStatus::Completed)
            .filter_map(Claim::processing_time)
            .map(|elapsed| elapsed.num_seconds() as f64 / SECONDS_PER_DAY)
            .collect();
        let avg_processing_days = (!processing_days.is_empty())
            .then(|| processing_days.iter().sum::<f64>() / processing_days.len() as f64);

        Self {
            total_claims: claims.len() as u64,
            status_distribution,
            avg_processing_days,
            overdue_count: claims.iter().filter(|claim| claim.is_overdue(now)).count() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::{ClaimType, NewClaim, Priority};
    use crate::config::DueDatePolicy;
    use crate::numbering::ClaimNumber;
    use chrono::{Duration, NaiveDate};
    use core_kernel::{CustomerId, VehicleId};
    use rust_decimal_macros::dec;

    fn claim_at(created: DateTime<Utc>, priority: Priority) -> Claim {
        let request = NewClaim {
            customer_id: CustomerId::new(),
            vehicle_id: VehicleId::new(),
            claim_type: ClaimType::Electrical,
            title: "Inverter fault".to_string(),
            description: None,
            issue_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            reported_mileage: 12_000,
            estimated_cost: dec!(900),
            priority,
        };
        Claim::submit(request, ClaimNumber::new(2026, 1), &DueDatePolicy::default(), created)
    }

    #[test]
    fn test_empty_store() {
        let stats = WorkflowStatistics::compute(&[], Utc::now());
        assert_eq!(stats.total_claims, 0);
        assert_eq!(stats.status_distribution.len(), ClaimStatus::ALL.len());
        assert!(stats.status_distribution.values().all(|count| *count == 0));
        assert_eq!(stats.avg_processing_days, None);
        assert_eq!(stats.overdue_count, 0);
    }

    #[test]
    fn test_average_over_completed_claims_only() {
        let now = Utc::now();
        let mut quick = claim_at(now - Duration::days(10), Priority::Low);
        quick.apply_status(ClaimStatus::Completed, quick.created_at + Duration::days(2));
        let mut slow = claim_at(now - Duration::days(10), Priority::Low);
        slow.apply_status(ClaimStatus::Completed, slow.created_at + Duration::days(6));
        let open = claim_at(now, Priority::Low);

        let stats = WorkflowStatistics::compute(&[quick, slow, open], now);
        assert_eq!(stats.total_claims, 3);
        assert_eq!(stats.status_distribution[&ClaimStatus::Completed], 2);
        assert_eq!(stats.status_distribution[&ClaimStatus::Submitted], 1);
        let avg = stats.avg_processing_days.unwrap();
        assert!((avg - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_overdue_excludes_closed_claims() {
        let now = Utc::now();
        let overdue = claim_at(now - Duration::days(5), Priority::Critical);
        let mut rejected = claim_at(now - Duration::days(5), Priority::Critical);
        rejected.apply_status(ClaimStatus::Rejected, now);
        let fresh = claim_at(now, Priority::Low);

        let stats = WorkflowStatistics::compute(&[overdue, rejected, fresh], now);
        assert_eq!(stats.overdue_count, 1);
    }
}
