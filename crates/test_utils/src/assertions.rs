//! Custom Test Assertions

use domain_warranty::history::replay;
use domain_warranty::{ApprovalRecord, ApprovalStatus, Claim, ClaimStatus, StatusChange, WorkflowError};

/// Asserts the claim has the expected status
pub fn assert_status(claim: &Claim, expected: ClaimStatus) {
    assert_eq!(
        claim.status, expected,
        "Claim {} has status {}, expected {}",
        claim.claim_number, claim.status, expected
    );
}

/// Asserts that replaying the history from SUBMITTED ends at the claim's status
pub fn assert_history_matches(claim: &Claim, history: &[StatusChange]) {
    let replayed = replay(history);
    assert_eq!(
        replayed,
        Some(claim.status),
        "History of claim {} does not replay to {}: {:?}",
        claim.claim_number,
        claim.status,
        history.iter().map(|c| (c.from, c.to)).collect::<Vec<_>>()
    );
}

/// Asserts the record statuses, in record order
pub fn assert_record_statuses(records: &[ApprovalRecord], expected: &[ApprovalStatus]) {
    let actual: Vec<_> = records.iter().map(|r| r.status).collect();
    assert_eq!(actual, expected, "Unexpected approval record statuses");
}

/// Asserts a workflow result is the given error variant
#[macro_export]
macro_rules! assert_workflow_err {
    ($result:expr, $pattern:pat) => {
        match $result {
            Err(err) => assert!(
                matches!(err, $pattern),
                "Expected {}, got {:?}",
                stringify!($pattern),
                err
            ),
            Ok(value) => panic!("Expected {}, got Ok({:?})", stringify!($pattern), value),
        }
    };
}

/// Asserts a rule violation error lists exactly `count` violations
pub fn assert_rule_violations(error: &WorkflowError, count: usize) {
    match error {
        WorkflowError::RuleViolation(violations) => assert_eq!(
            violations.len(),
            count,
            "Unexpected violations: {:?}",
            violations
        ),
        other => panic!("Expected RuleViolation, got {:?}", other),
    }
}
