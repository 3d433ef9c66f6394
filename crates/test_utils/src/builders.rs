//! Test Data Builders
//!
//! Builders let a test set only the fields it cares about; everything else
//! defaults to a claim that passes every business rule.

use chrono::{Duration, NaiveDate, Utc};
use core_kernel::{CustomerId, VehicleId};
use domain_warranty::{ClaimType, NewClaim, Priority};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Builder for claim submissions
#[derive(Debug, Clone)]
pub struct NewClaimBuilder {
    customer_id: CustomerId,
    vehicle_id: VehicleId,
    claim_type: ClaimType,
    title: String,
    description: Option<String>,
    issue_date: NaiveDate,
    reported_mileage: u32,
    estimated_cost: Decimal,
    priority: Priority,
}

impl Default for NewClaimBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewClaimBuilder {
    /// A low-priority battery claim costing 600
    pub fn new() -> Self {
        Self {
            customer_id: CustomerId::new(),
            vehicle_id: VehicleId::new(),
            claim_type: ClaimType::Battery,
            title: "Battery module failure".to_string(),
            description: Some("Range dropped by 40% within a week".to_string()),
            issue_date: (Utc::now() - Duration::days(7)).date_naive(),
            reported_mileage: 20_000,
            estimated_cost: dec!(600),
            priority: Priority::Low,
        }
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn with_vehicle(mut self, vehicle_id: VehicleId) -> Self {
        self.vehicle_id = vehicle_id;
        self
    }

    pub fn with_type(mut self, claim_type: ClaimType) -> Self {
        self.claim_type = claim_type;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_mileage(mut self, mileage: u32) -> Self {
        self.reported_mileage = mileage;
        self
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.estimated_cost = cost;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn build(self) -> NewClaim {
        NewClaim {
            customer_id: self.customer_id,
            vehicle_id: self.vehicle_id,
            claim_type: self.claim_type,
            title: self.title,
            description: self.description,
            issue_date: self.issue_date,
            reported_mileage: self.reported_mileage,
            estimated_cost: self.estimated_cost,
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let request = NewClaimBuilder::new().build();
        assert!(request.validate().is_ok());
        assert_eq!(request.priority, Priority::Low);
    }

    #[test]
    fn test_overrides() {
        let request = NewClaimBuilder::new()
            .with_cost(dec!(8000))
            .with_priority(Priority::High)
            .with_type(ClaimType::AccidentalDamage)
            .build();
        assert_eq!(request.estimated_cost, dec!(8000));
        assert_eq!(request.claim_type, ClaimType::AccidentalDamage);
    }
}
