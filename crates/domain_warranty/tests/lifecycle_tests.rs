//! Claim lifecycle tests against the in-memory adapters

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use rust_decimal_macros::dec;

use core_kernel::ClaimId;
use domain_warranty::{
    ApprovalDecision, ClaimDetailsUpdate, ClaimEvent, ClaimStatus, Priority, WarrantyService, WorkflowError,
};
use test_utils::{
    assert_history_matches, assert_status, assert_workflow_err, FailingNotifier, NewClaimBuilder, TestWorkflow,
};

// ============================================================================
// Submission
// ============================================================================

mod submission_tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_numbers_are_sequential_per_year() {
        let harness = TestWorkflow::new().await;
        let first = harness.submit(NewClaimBuilder::new().build()).await;
        let second = harness.submit(NewClaimBuilder::new().build()).await;

        let year = Utc::now().year();
        assert_eq!(first.claim_number.to_string(), format!("WC-{}-000001", year));
        assert_eq!(second.claim_number.to_string(), format!("WC-{}-000002", year));
        assert_status(&first, ClaimStatus::Submitted);
    }

    #[tokio::test]
    async fn test_due_date_follows_priority() {
        let harness = TestWorkflow::new().await;
        let critical = harness
            .submit(NewClaimBuilder::new().with_priority(Priority::Critical).build())
            .await;
        let low = harness.submit(NewClaimBuilder::new().build()).await;

        assert_eq!((critical.due_date - critical.created_at).num_days(), 1);
        assert_eq!((low.due_date - low.created_at).num_days(), 14);
    }

    #[tokio::test]
    async fn test_reviewer_cannot_submit() {
        let harness = TestWorkflow::new().await;
        let result = harness
            .workflow
            .submit_claim(NewClaimBuilder::new().build(), &harness.staff.reviewer)
            .await;
        assert_workflow_err!(result, WorkflowError::Forbidden { .. });
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let harness = TestWorkflow::new().await;
        let result = harness
            .workflow
            .submit_claim(NewClaimBuilder::new().with_title("   ").build(), &harness.staff.customer)
            .await;
        assert_workflow_err!(result, WorkflowError::Validation(_));
        assert!(harness.workflow.list_claims(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submission_notifies_customer() {
        let mut harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;

        match harness.next_event().await {
            Some(ClaimEvent::ClaimSubmitted { claim_id, claim_number }) => {
                assert_eq!(claim_id, claim.id);
                assert_eq!(claim_number, claim.claim_number);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

// ============================================================================
// Transitions
// ============================================================================

mod transition_tests {
    use super::*;

    #[tokio::test]
    async fn test_reviewer_moves_claim_under_review() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;

        let updated = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::UnderReview, &harness.staff.reviewer, None)
            .await
            .unwrap();
        assert_status(&updated, ClaimStatus::UnderReview);

        let history = harness.workflow.status_history(claim.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].changed_by, harness.staff.reviewer.id);
        assert_eq!(history[0].note, "Status changed from SUBMITTED to UNDER_REVIEW");
        assert_history_matches(&updated, &history);
    }

    #[tokio::test]
    async fn test_customer_cannot_review() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;

        let result = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::UnderReview, &harness.staff.customer, None)
            .await;
        assert_workflow_err!(
            result,
            WorkflowError::InvalidTransition { from: ClaimStatus::Submitted, to: ClaimStatus::UnderReview }
        );

        let stored = harness.workflow.get_claim(claim.id).await.unwrap();
        assert_eq!(stored, claim);
        assert!(harness.workflow.status_history(claim.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_requires_reason() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;
        let reviewer = &harness.staff.reviewer;

        let missing = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Rejected, reviewer, None)
            .await;
        assert_workflow_err!(missing, WorkflowError::MissingReason { .. });

        let blank = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Rejected, reviewer, Some("   "))
            .await;
        assert_workflow_err!(blank, WorkflowError::MissingReason { .. });

        let rejected = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Rejected, reviewer, Some(" Duplicate claim "))
            .await
            .unwrap();
        assert_status(&rejected, ClaimStatus::Rejected);
        let history = harness.workflow.status_history(claim.id).await.unwrap();
        assert_eq!(history[0].reason.as_deref(), Some("Duplicate claim"));
    }

    #[tokio::test]
    async fn test_full_lifecycle_to_completion() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit_approved(NewClaimBuilder::new().build()).await;
        assert_status(&claim, ClaimStatus::Approved);
        let staff = &harness.staff;

        for target in [ClaimStatus::Processing, ClaimStatus::Completed] {
            harness
                .workflow
                .request_transition(claim.id, target, &staff.technician, None)
                .await
                .unwrap();
        }

        let completed = harness.workflow.get_claim(claim.id).await.unwrap();
        assert_status(&completed, ClaimStatus::Completed);
        assert!(completed.completed_at.is_some());
        let history = harness.workflow.status_history(claim.id).await.unwrap();
        assert_eq!(history.len(), 4);
        assert_history_matches(&completed, &history);

        let result = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Cancelled, &staff.admin, Some("late"))
            .await;
        assert_workflow_err!(result, WorkflowError::InvalidTransition { .. });
    }

    #[tokio::test]
    async fn test_cancellation_is_admin_only_and_needs_reason() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit_approved(NewClaimBuilder::new().build()).await;
        let staff = &harness.staff;

        let by_reviewer = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Cancelled, &staff.reviewer, Some("withdrawn"))
            .await;
        assert_workflow_err!(by_reviewer, WorkflowError::InvalidTransition { .. });

        let without_reason = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Cancelled, &staff.admin, None)
            .await;
        assert_workflow_err!(without_reason, WorkflowError::MissingReason { .. });

        let cancelled = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Cancelled, &staff.admin, Some("Customer withdrew"))
            .await
            .unwrap();
        assert!(cancelled.status.is_terminal());
    }

    #[tokio::test]
    async fn test_customer_resubmits_rejected_claim() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;
        harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Rejected, &harness.staff.reviewer, Some("Missing photos"))
            .await
            .unwrap();

        let resubmitted = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Submitted, &harness.staff.customer, None)
            .await
            .unwrap();
        assert_status(&resubmitted, ClaimStatus::Submitted);
        assert_eq!(resubmitted.claim_number, claim.claim_number);
        assert_eq!(resubmitted.due_date, claim.due_date);
    }

    #[tokio::test]
    async fn test_unknown_claim() {
        let harness = TestWorkflow::new().await;
        let missing = ClaimId::new();
        let result = harness
            .workflow
            .request_transition(missing, ClaimStatus::UnderReview, &harness.staff.reviewer, None)
            .await;
        match result {
            Err(WorkflowError::ClaimNotFound(id)) => assert_eq!(id, missing),
            other => panic!("expected ClaimNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transition_notifies_customer() {
        let mut harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;
        harness
            .workflow
            .request_transition(claim.id, ClaimStatus::UnderReview, &harness.staff.reviewer, None)
            .await
            .unwrap();

        let events = harness.drain_events().await;
        assert!(events.iter().any(|event| matches!(
            event,
            ClaimEvent::StatusChanged { to: ClaimStatus::UnderReview, .. }
        )));
    }
}

// ============================================================================
// Approval requires the tier chain
// ============================================================================

mod direct_approval_tests {
    use super::*;

    async fn under_review(harness: &TestWorkflow, builder: NewClaimBuilder) -> ClaimId {
        let claim = harness.submit(builder.build()).await;
        harness
            .workflow
            .request_transition(claim.id, ClaimStatus::UnderReview, &harness.staff.reviewer, None)
            .await
            .unwrap();
        claim.id
    }

    #[tokio::test]
    async fn test_high_value_claim_needs_approval_records() {
        let harness = TestWorkflow::new().await;
        let claim_id = under_review(
            &harness,
            NewClaimBuilder::new()
                .with_cost(dec!(30000))
                .with_priority(Priority::Critical),
        )
        .await;

        for actor in [&harness.staff.reviewer, &harness.staff.admin] {
            let result = harness
                .workflow
                .request_transition(claim_id, ClaimStatus::Approved, actor, None)
                .await;
            assert_workflow_err!(result, WorkflowError::ApprovalChainIncomplete { .. });
        }

        let stored = harness.workflow.get_claim(claim_id).await.unwrap();
        assert_status(&stored, ClaimStatus::UnderReview);
        assert!(stored.resolution.is_none());
        assert!(harness.workflow.approval_records(claim_id).await.unwrap().is_empty());
        assert_eq!(harness.workflow.status_history(claim_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_low_value_claim_needs_technician_approval() {
        let harness = TestWorkflow::new().await;
        let claim_id = under_review(&harness, NewClaimBuilder::new()).await;

        let result = harness
            .workflow
            .request_transition(claim_id, ClaimStatus::Approved, &harness.staff.reviewer, None)
            .await;
        assert_workflow_err!(result, WorkflowError::ApprovalChainIncomplete { .. });
        assert_status(&harness.workflow.get_claim(claim_id).await.unwrap(), ClaimStatus::UnderReview);
    }

    #[tokio::test]
    async fn test_open_round_blocks_direct_approval() {
        let harness = TestWorkflow::new().await;
        let (claim, record) = harness
            .submit_for_approval(NewClaimBuilder::new().with_priority(Priority::Medium).build())
            .await;
        harness
            .workflow
            .process_decision(record.id, ApprovalDecision::Approved, &harness.staff.technician, None, None)
            .await
            .unwrap();

        let result = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Approved, &harness.staff.reviewer, None)
            .await;
        assert_workflow_err!(result, WorkflowError::ApprovalChainIncomplete { .. });
    }

    #[tokio::test]
    async fn test_closed_round_does_not_count() {
        let harness = TestWorkflow::new().await;
        let (claim, _) = harness.submit_for_approval(NewClaimBuilder::new().build()).await;
        harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Submitted, &harness.staff.reviewer, Some("Need photos"))
            .await
            .unwrap();
        harness
            .workflow
            .request_transition(claim.id, ClaimStatus::UnderReview, &harness.staff.reviewer, None)
            .await
            .unwrap();

        let result = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::Approved, &harness.staff.admin, None)
            .await;
        assert_workflow_err!(result, WorkflowError::ApprovalChainIncomplete { .. });
    }
}

// ============================================================================
// Claim details
// ============================================================================

mod details_tests {
    use super::*;

    #[tokio::test]
    async fn test_reviewer_updates_cost_before_approvals() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;

        let update = ClaimDetailsUpdate {
            estimated_cost: Some(dec!(1750)),
            assigned_to: Some(harness.staff.reviewer.id),
            ..Default::default()
        };
        let updated = harness
            .workflow
            .update_claim_details(claim.id, update, &harness.staff.reviewer)
            .await
            .unwrap();
        assert_eq!(updated.estimated_cost, dec!(1750));
        assert_eq!(updated.assigned_to, Some(harness.staff.reviewer.id));
        assert_eq!(updated.claim_number, claim.claim_number);
        assert_eq!(updated.due_date, claim.due_date);
    }

    #[tokio::test]
    async fn test_cost_frozen_during_approvals() {
        let harness = TestWorkflow::new().await;
        let (claim, _) = harness
            .submit_for_approval(NewClaimBuilder::new().build())
            .await;

        let update = ClaimDetailsUpdate {
            estimated_cost: Some(dec!(25000)),
            ..Default::default()
        };
        let result = harness
            .workflow
            .update_claim_details(claim.id, update, &harness.staff.admin)
            .await;
        assert_workflow_err!(result, WorkflowError::Validation(_));
    }

    #[tokio::test]
    async fn test_customer_cannot_edit_details() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;
        let result = harness
            .workflow
            .update_claim_details(claim.id, ClaimDetailsUpdate::default(), &harness.staff.customer)
            .await;
        assert_workflow_err!(result, WorkflowError::Forbidden { .. });
    }
}

// ============================================================================
// Collaborator failures and concurrency
// ============================================================================

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_notification_failure_does_not_unwind_transition() {
        let notifier = Arc::new(FailingNotifier::new());
        let harness = TestWorkflow::builder().notifier(notifier.clone()).build().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;

        let updated = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::UnderReview, &harness.staff.reviewer, None)
            .await
            .unwrap();
        assert_status(&updated, ClaimStatus::UnderReview);

        for _ in 0..50 {
            if notifier.attempts() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(notifier.attempts() >= 2);
        assert_status(&harness.workflow.get_claim(claim.id).await.unwrap(), ClaimStatus::UnderReview);
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_claim_untouched() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;

        harness.store.set_unavailable(true);
        let result = harness
            .workflow
            .request_transition(claim.id, ClaimStatus::UnderReview, &harness.staff.reviewer, None)
            .await;
        harness.store.set_unavailable(false);

        let err = result.unwrap_err();
        assert!(matches!(err, WorkflowError::Persistence(_)));
        assert!(err.is_recoverable());
        assert_eq!(harness.workflow.get_claim(claim.id).await.unwrap(), claim);
        assert!(harness.workflow.status_history(claim.id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transitions_apply_once() {
        let harness = TestWorkflow::new().await;
        let claim = harness.submit(NewClaimBuilder::new().build()).await;

        let claim_id = claim.id;
        let mut handles = Vec::new();
        for _ in 0..8 {
            let workflow = Arc::clone(&harness.workflow);
            let reviewer = harness.staff.reviewer;
            handles.push(tokio::spawn(async move {
                workflow
                    .request_transition(claim_id, ClaimStatus::UnderReview, &reviewer, None)
                    .await
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(err) => assert!(matches!(err, WorkflowError::InvalidTransition { .. })),
            }
        }
        assert_eq!(succeeded, 1);
        assert_eq!(harness.workflow.status_history(claim.id).await.unwrap().len(), 1);
    }
}

// ============================================================================
// Available transitions and statistics
// ============================================================================

mod query_tests {
    use super::*;
    use domain_warranty::Role;

    #[tokio::test]
    async fn test_available_transitions_by_role() {
        let harness = TestWorkflow::new().await;
        let targets: Vec<_> = harness
            .workflow
            .available_transitions(ClaimStatus::UnderReview, Role::Reviewer)
            .into_iter()
            .map(|rule| rule.to)
            .collect();
        assert_eq!(
            targets,
            vec![ClaimStatus::Approved, ClaimStatus::Rejected, ClaimStatus::Submitted]
        );
        assert!(harness
            .workflow
            .available_transitions(ClaimStatus::UnderReview, Role::Customer)
            .is_empty());
    }

    #[tokio::test]
    async fn test_statistics_reflect_store() {
        let harness = TestWorkflow::new().await;
        let first = harness.submit(NewClaimBuilder::new().build()).await;
        harness.submit(NewClaimBuilder::new().build()).await;
        harness
            .workflow
            .request_transition(first.id, ClaimStatus::UnderReview, &harness.staff.reviewer, None)
            .await
            .unwrap();

        let stats = harness.workflow.workflow_statistics().await.unwrap();
        assert_eq!(stats.total_claims, 2);
        assert_eq!(stats.status_distribution[&ClaimStatus::Submitted], 1);
        assert_eq!(stats.status_distribution[&ClaimStatus::UnderReview], 1);
        assert_eq!(stats.avg_processing_days, None);
        assert_eq!(stats.overdue_count, 0);
    }
}
