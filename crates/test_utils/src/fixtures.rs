//! Pre-built Test Fixtures

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use core_kernel::{CustomerId, DomainPort, PortError, UserId, VehicleId};
use domain_warranty::{Actor, ApprovalLevel, ClaimEvent, ClaimNotifier, Role, WarrantyCoverage};

/// One actor per role
#[derive(Debug, Clone)]
pub struct Staff {
    pub customer: Actor,
    pub reviewer: Actor,
    pub technician: Actor,
    pub supervisor: Actor,
    pub manager: Actor,
    pub director: Actor,
    pub admin: Actor,
}

impl Default for Staff {
    fn default() -> Self {
        Self::new()
    }
}

impl Staff {
    pub fn new() -> Self {
        let actor = |role| Actor::new(UserId::new(), role);
        Self {
            customer: actor(Role::Customer),
            reviewer: actor(Role::Reviewer),
            technician: actor(Role::Technician),
            supervisor: actor(Role::Supervisor),
            manager: actor(Role::Manager),
            director: actor(Role::Director),
            admin: actor(Role::Admin),
        }
    }

    /// The staff member approving at `level`
    pub fn approver(&self, level: ApprovalLevel) -> &Actor {
        match level {
            ApprovalLevel::Technician => &self.technician,
            ApprovalLevel::Supervisor => &self.supervisor,
            ApprovalLevel::Manager => &self.manager,
            ApprovalLevel::Director => &self.director,
        }
    }

    /// Approvers registered in the directory, lowest level first
    pub fn approvers(&self) -> [&Actor; 4] {
        [&self.technician, &self.supervisor, &self.manager, &self.director]
    }
}

/// Fixture for warranty coverage
pub struct CoverageFixtures;

impl CoverageFixtures {
    /// Active coverage that started two years ago and runs six more
    pub fn valid_for(vehicle_id: VehicleId) -> WarrantyCoverage {
        let today = Utc::now().date_naive();
        WarrantyCoverage {
            vehicle_id,
            starts_on: today - Duration::days(730),
            expires_on: today + Duration::days(6 * 365),
            active: true,
        }
    }

    /// Coverage that ended yesterday
    pub fn expired_for(vehicle_id: VehicleId) -> WarrantyCoverage {
        let today = Utc::now().date_naive();
        WarrantyCoverage {
            vehicle_id,
            starts_on: today - Duration::days(8 * 365),
            expires_on: today - Duration::days(1),
            active: true,
        }
    }
}

/// Notifier whose every delivery fails
#[derive(Debug, Default)]
pub struct FailingNotifier {
    attempts: AtomicUsize,
}

impl FailingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl DomainPort for FailingNotifier {}

#[async_trait]
impl ClaimNotifier for FailingNotifier {
    async fn notify(&self, _customer_id: CustomerId, _event: &ClaimEvent) -> Result<(), PortError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PortError::connection("notification gateway unreachable"))
    }
}
