//! Business rule validation
//!
//! Consulted before any claim moves to `APPROVED`, whether through a direct
//! transition or the final tier approval. An empty violation list means the
//! claim may be approved.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::VehicleId;

use crate::claim::{Claim, ClaimType};
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;

/// Warranty coverage of a vehicle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyCoverage {
    pub vehicle_id: VehicleId,
    pub starts_on: NaiveDate,
    pub expires_on: NaiveDate,
    /// False once the warranty has been voided
    pub active: bool,
}

impl WarrantyCoverage {
    /// True when the warranty is active and `date` falls inside its term
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.active && self.starts_on <= date && date <= self.expires_on
    }
}

/// A violated business rule
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleViolation {
    #[error("No warranty coverage on record for vehicle {vehicle_id}")]
    WarrantyNotFound { vehicle_id: VehicleId },

    #[error("Warranty for vehicle {vehicle_id} is not valid on {checked_on}")]
    WarrantyNotValid { vehicle_id: VehicleId, checked_on: NaiveDate },

    #[error("Claim type {claim_type} is not covered by warranty")]
    ExcludedClaimType { claim_type: ClaimType },

    #[error("Reported mileage {reported} exceeds the warranty cap of {cap}")]
    MileageCapExceeded { reported: u32, cap: u32 },
}

/// Evaluates the approval rules against a claim
#[derive(Debug, Clone)]
pub struct BusinessRuleValidator {
    mileage_cap: u32,
    excluded: Vec<ClaimType>,
}

impl Default for BusinessRuleValidator {
    fn default() -> Self {
        Self::from_config(&WorkflowConfig::default())
    }
}

impl BusinessRuleValidator {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            mileage_cap: config.mileage_cap,
            excluded: config.excluded_claim_types.clone(),
        }
    }

    /// Returns every rule the claim violates on `on`
    pub fn evaluate(
        &self,
        claim: &Claim,
        coverage: Option<&WarrantyCoverage>,
        on: NaiveDate,
    ) -> Vec<RuleViolation> {
        let mut violations = Vec::new();

        match coverage {
            None => violations.push(RuleViolation::WarrantyNotFound {
                vehicle_id: claim.vehicle_id,
            }),
            Some(coverage) if !coverage.is_valid_on(on) => {
                violations.push(RuleViolation::WarrantyNotValid {
                    vehicle_id: claim.vehicle_id,
                    checked_on: on,
                })
            }
            Some(_) => {}
        }

        if self.is_excluded(claim.claim_type) {
            violations.push(RuleViolation::ExcludedClaimType {
                claim_type: claim.claim_type,
            });
        }

        if claim.reported_mileage > self.mileage_cap {
            violations.push(RuleViolation::MileageCapExceeded {
                reported: claim.reported_mileage,
                cap: self.mileage_cap,
            });
        }

        violations
    }

    /// Accidental damage is excluded whatever the configured list says
    fn is_excluded(&self, claim_type: ClaimType) -> bool {
        claim_type == ClaimType::AccidentalDamage || self.excluded.contains(&claim_type)
    }

    /// Fails with `RuleViolation` when any rule is violated
    pub fn ensure_approvable(
        &self,
        claim: &Claim,
        coverage: Option<&WarrantyCoverage>,
        on: NaiveDate,
    ) -> Result<(), WorkflowError> {
        let violations = self.evaluate(claim, coverage, on);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::RuleViolation(violations))
        }
    }
}
