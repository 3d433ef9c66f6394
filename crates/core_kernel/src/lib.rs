//! Core Kernel - Foundational types for the warranty claims system
//!
//! This crate provides the building blocks used by every other crate:
//! - Strongly-typed identifiers for claims, customers, vehicles and users
//! - The port error type and marker traits for hexagonal adapters

pub mod identifiers;
pub mod ports;

pub use identifiers::{
    ClaimId, CustomerId, VehicleId, UserId, ApprovalId, StatusChangeId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
