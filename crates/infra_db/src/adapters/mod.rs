//! Domain Adapters
//!
//! Implementations of the warranty domain ports backed by PostgreSQL.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use infra_db::adapters::PostgresClaimStore;
//! use domain_warranty::WarrantyWorkflow;
//!
//! let store = Arc::new(PostgresClaimStore::new(pool));
//! let workflow = WarrantyWorkflow::new(store, directory, coverage, notifier, config)?;
//! ```

pub mod claim_store;

pub use claim_store::{PostgresClaimStore, PgSnapshot};
