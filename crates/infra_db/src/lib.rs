//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the warranty engine using SQLx.
//!
//! # Architecture
//!
//! - `repositories`: row types and SQL for claims, status history, approval
//!   records and the claim-number sequence
//! - `adapters`: `PostgresClaimStore`, the `ClaimStore` port implementation
//!
//! # Locking
//!
//! A unit of work on a claim is a database transaction that starts with
//! `SELECT ... FOR UPDATE` on the claim row. Concurrent transitions and
//! approval decisions on the same claim therefore run one after the other.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresClaimStore};
//!
//! let pool = create_pool(&DatabaseConfig::new("postgres://localhost/warranty")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresClaimStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use repositories::ClaimsRepository;
pub use adapters::{PostgresClaimStore, PgSnapshot};
