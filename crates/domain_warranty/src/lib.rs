//! Warranty Claims Domain
//!
//! This crate implements the electric-vehicle warranty claim engine: a
//! role-gated claim lifecycle composed with a cost and priority driven,
//! multi-level approval chain.
//!
//! # Claim Lifecycle
//!
//! ```text
//! SUBMITTED -> UNDER_REVIEW -> APPROVED -> PROCESSING -> COMPLETED
//!     ^  \          |    \          \           \
//!     |   \         |     \          +-> CANCELLED +-> CANCELLED
//!     |    +--> REJECTED <-+
//!     +-----------+  (resubmission)
//! ```
//!
//! # Approval Chain
//!
//! ```text
//! technician (1) -> supervisor (2) -> manager (3) -> director (4)
//! ```
//!
//! The tiers a claim needs are computed from its estimated cost and
//! priority. Tier records are opened one at a time; a rejection at any tier
//! rejects the claim, and approval by the last required tier (after the
//! business rules pass) moves the claim to `APPROVED`.
//!
//! The engine consumes persistence, identity and notification through the
//! ports in [`ports`]; [`adapters`] provides in-memory implementations.

pub mod claim;
pub mod numbering;
pub mod transitions;
pub mod history;
pub mod tiers;
pub mod approval;
pub mod rules;
pub mod events;
pub mod config;
pub mod ports;
pub mod lifecycle;
pub mod escalation;
pub mod statistics;
pub mod service;
pub mod adapters;
pub mod error;

pub use claim::{Claim, ClaimStatus, ClaimType, Priority, NewClaim, ClaimDetailsUpdate, Resolution, ResolutionDecision};
pub use numbering::ClaimNumber;
pub use transitions::{Role, Actor, TransitionRule, TRANSITION_TABLE, available_transitions};
pub use history::StatusChange;
pub use tiers::{ApprovalLevel, TierResolver};
pub use approval::{ApprovalRecord, ApprovalStatus, ApprovalDecision, ApprovalChain};
pub use rules::{BusinessRuleValidator, RuleViolation, WarrantyCoverage};
pub use events::ClaimEvent;
pub use config::{WorkflowConfig, TierThresholds, DueDatePolicy};
pub use ports::{ClaimStore, ApproverDirectory, CoverageLookup, ClaimNotifier};
pub use lifecycle::ClaimLifecycle;
pub use escalation::EscalationCoordinator;
pub use statistics::WorkflowStatistics;
pub use service::{WarrantyService, WarrantyWorkflow};
pub use error::WorkflowError;
