//! Workflow configuration
//!
//! Business constants of the engine. Defaults match the warranty policy;
//! deployments may override them (see `interface_api::config`).

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::claim::{ClaimType, Priority};
use crate::error::WorkflowError;

/// Cost above which each approval tier becomes mandatory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub supervisor_cost: Decimal,
    pub manager_cost: Decimal,
    pub director_cost: Decimal,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            supervisor_cost: dec!(1000),
            manager_cost: dec!(5000),
            director_cost: dec!(20000),
        }
    }
}

/// Days allowed to resolve a claim, per priority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DueDatePolicy {
    pub critical_days: u32,
    pub high_days: u32,
    pub medium_days: u32,
    pub low_days: u32,
}

impl Default for DueDatePolicy {
    fn default() -> Self {
        Self {
            critical_days: 1,
            high_days: 3,
            medium_days: 7,
            low_days: 14,
        }
    }
}

impl DueDatePolicy {
    pub fn offset_for(&self, priority: Priority) -> Duration {
        let days = match priority {
            Priority::Critical => self.critical_days,
            Priority::High => self.high_days,
            Priority::Medium => self.medium_days,
            Priority::Low => self.low_days,
        };
        Duration::days(i64::from(days))
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub tiers: TierThresholds,
    /// Warranty mileage cap
    pub mileage_cap: u32,
    pub due_dates: DueDatePolicy,
    /// Claim types that can never be approved, on top of accidental damage
    pub excluded_claim_types: Vec<ClaimType>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            tiers: TierThresholds::default(),
            mileage_cap: 100_000,
            due_dates: DueDatePolicy::default(),
            excluded_claim_types: vec![ClaimType::AccidentalDamage],
        }
    }
}

impl WorkflowConfig {
    /// Checks internal consistency
    ///
    /// Thresholds must be non-negative and strictly ascending, otherwise the
    /// required tiers would stop forming a contiguous chain from level 1.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let TierThresholds { supervisor_cost, manager_cost, director_cost } = &self.tiers;
        if supervisor_cost.is_sign_negative() {
            return Err(WorkflowError::Configuration(
                "tier thresholds must not be negative".to_string(),
            ));
        }
        if !(supervisor_cost < manager_cost && manager_cost < director_cost) {
            return Err(WorkflowError::Configuration(format!(
                "tier thresholds must ascend: supervisor {} < manager {} < director {}",
                supervisor_cost, manager_cost, director_cost
            )));
        }
        if self.mileage_cap == 0 {
            return Err(WorkflowError::Configuration("mileage cap must be positive".to_string()));
        }
        let days = &self.due_dates;
        if !(days.critical_days <= days.high_days
            && days.high_days <= days.medium_days
            && days.medium_days <= days.low_days)
        {
            return Err(WorkflowError::Configuration(
                "more urgent priorities must not get later due dates".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WorkflowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mileage_cap, 100_000);
        assert_eq!(config.excluded_claim_types, vec![ClaimType::AccidentalDamage]);
    }

    #[test]
    fn test_descending_thresholds_rejected() {
        let mut config = WorkflowConfig::default();
        config.tiers.manager_cost = dec!(500);
        assert!(matches!(config.validate(), Err(WorkflowError::Configuration(_))));
    }

    #[test]
    fn test_partial_deserialization_keeps_defaults() {
        let config: WorkflowConfig =
            serde_json::from_str(r#"{"mileage_cap": 80000, "tiers": {"director_cost": "50000"}}"#).unwrap();
        assert_eq!(config.mileage_cap, 80_000);
        assert_eq!(config.tiers.director_cost, dec!(50000));
        assert_eq!(config.tiers.supervisor_cost, dec!(1000));
        assert_eq!(config.due_dates, DueDatePolicy::default());
    }
}
