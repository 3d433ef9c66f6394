//! Property-Based Test Generators
//!
//! Proptest strategies for the warranty domain's enums and amounts.

use domain_warranty::{ApprovalDecision, ClaimStatus, ClaimType, Priority, Role};
use proptest::prelude::*;
use rust_decimal::Decimal;

pub fn claim_status_strategy() -> impl Strategy<Value = ClaimStatus> {
    proptest::sample::select(ClaimStatus::ALL.to_vec())
}

pub fn role_strategy() -> impl Strategy<Value = Role> {
    proptest::sample::select(Role::ALL.to_vec())
}

pub fn priority_strategy() -> impl Strategy<Value = Priority> {
    proptest::sample::select(Priority::ALL.to_vec())
}

pub fn claim_type_strategy() -> impl Strategy<Value = ClaimType> {
    proptest::sample::select(ClaimType::ALL.to_vec())
}

pub fn approval_decision_strategy() -> impl Strategy<Value = ApprovalDecision> {
    prop_oneof![
        Just(ApprovalDecision::Approved),
        Just(ApprovalDecision::Rejected),
        Just(ApprovalDecision::Escalated),
    ]
}

/// Estimated costs between 0 and 50,000.00
pub fn estimated_cost_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..5_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Optional reason text, sometimes blank
pub fn reason_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("   ".to_string())),
        "[a-z]{3,12}".prop_map(Some),
    ]
}
