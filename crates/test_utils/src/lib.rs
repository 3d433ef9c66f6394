//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! warranty claims test suite.
//!
//! # Modules
//!
//! - `fixtures`: Staff roster, warranty coverage and failing collaborators
//! - `builders`: Builder for claim submissions
//! - `harness`: A workflow wired to in-memory adapters
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use harness::*;
pub use assertions::*;
pub use generators::*;
