//! Adapters bundled with the domain
//!
//! - **memory**: in-memory claim store, approver directory and coverage
//!   lookup, used by tests and the `memory` store backend of the API server
//! - **notify**: notifiers that log events or forward them to a channel
//!
//! The PostgreSQL claim store lives in `infra_db`.

pub mod memory;
pub mod notify;

pub use memory::{InMemoryApproverDirectory, InMemoryClaimStore, InMemoryCoverageLookup, MemorySnapshot};
pub use notify::{ChannelNotifier, TracingNotifier};
