//! Repository implementations
//!
//! Repositories encapsulate SQL and map between database rows and domain
//! types. Enumerations are stored as text; costs as `NUMERIC`.

pub mod claims;

pub use claims::{ClaimsRepository, ClaimRow, StatusChangeRow, ApprovalRow};
