use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;
use tempfile::TempDir;

use rackrate_core::audit::{AuditContext, InMemoryAuditSink};
use rackrate_core::discount::DiscountEngine;
use rackrate_core::domain::approval::{ApproverLayout, FinalStatus, StageStatus};
use rackrate_core::errors::{ApplicationError, InterfaceError};
use rackrate_core::notifications::InMemoryNotifier;
use rackrate_core::submission::{ApprovalCommand, SubmissionService, SubmitRequest};
use rackrate_db::{InMemorySubmissionRepository, JsonFileSubmissionRepository};

fn context() -> AuditContext {
    AuditContext::new(None, "req-flow", "integration")
}

fn submit_request() -> SubmitRequest {
    serde_json::from_value(json!({
        "products": {
            "home_products": [
                { "product_name": "H4", "product_type": "VARIABLE", "quantity": 2,
                  "rack_rate": "500", "discount_percent": 80 },
                { "product_name": "Setup Fee", "product_type": "FIXED", "quantity": 3,
                  "rack_rate": 200, "discount_percent": 120 }
            ],
            "branch_products": [
                { "product_name": "Branch Kit", "quantity": "1", "rack_rate": 300,
                  "discount_percent": "abc" }
            ]
        },
        "customerName": "Harbor Credit Union",
        "blended_discount": "61.2"
    }))
    .expect("request should deserialize")
}

fn approval(body: serde_json::Value) -> ApprovalCommand {
    serde_json::from_value(body).expect("command should deserialize")
}

#[tokio::test]
async fn file_backed_quote_survives_reload_through_both_approvers() {
    let dir = TempDir::new().expect("tempdir");
    let engine = DiscountEngine::default();
    let service = SubmissionService::new(
        JsonFileSubmissionRepository::new(dir.path()),
        InMemoryAuditSink::default(),
        InMemoryNotifier::default(),
        engine.clone(),
    );

    let receipt = service.submit(submit_request(), "jlee", &context()).await.expect("submit");

    // 1000 @80% + 200 (qty pinned) @100% + 300 @0% => 1500 rack, 500 after discount.
    assert_eq!(receipt.status, FinalStatus::Pending);
    assert_eq!(receipt.layout, ApproverLayout::DualApprover);
    assert_eq!(receipt.corrections.len(), 2);
    let blended = receipt.blended_discount_percent.round_dp(4);
    assert_eq!(blended, Decimal::new(666_667, 4));

    service
        .act(
            &receipt.id,
            1,
            &approval(json!({
                "approver": "approver1", "action": "APPROVE", "approverName": "Dana Reyes",
                "approver2": "Pending", "expectedStatus": "PENDING"
            })),
            &context(),
        )
        .await
        .expect("approver1");

    // A fresh repository over the same directory sees the persisted state.
    let reloaded = SubmissionService::new(
        JsonFileSubmissionRepository::new(dir.path()),
        InMemoryAuditSink::default(),
        InMemoryNotifier::default(),
        engine,
    );
    let view = reloaded.fetch(&receipt.id).await.expect("fetch");
    assert_eq!(view.status, FinalStatus::PendingApprover2);
    assert_eq!(view.approval.approver2_status, StageStatus::Pending);
    assert_eq!(view.data.home_products[1].item.quantity, Decimal::ONE);
    assert_eq!(view.data.home_products[1].item.discount_percent, Decimal::ONE_HUNDRED);
    assert_eq!(view.totals.overall.total_rack, Decimal::from(1_500));
    assert_eq!(view.totals.overall.total_after_discount, Decimal::from(500));

    let final_receipt = reloaded
        .act(
            &receipt.id,
            2,
            &approval(json!({
                "approver": "approver2", "action": "REJECT", "approverName": "Sam Ortiz",
                "comments": "too deep", "decisionDate": "2026-03-15",
                "expectedStatus": "PENDING_APPROVER2"
            })),
            &context(),
        )
        .await
        .expect("approver2");

    assert_eq!(final_receipt.final_status, FinalStatus::Rejected);
    assert_eq!(final_receipt.notices.len(), 1);
    assert_eq!(reloaded.list().await.expect("list").len(), 1);
}

#[tokio::test]
async fn shared_in_memory_store_detects_concurrent_writers() {
    let repository = Arc::new(InMemorySubmissionRepository::default());
    let first = SubmissionService::new(
        Arc::clone(&repository),
        InMemoryAuditSink::default(),
        InMemoryNotifier::default(),
        DiscountEngine::default(),
    );
    let second = SubmissionService::new(
        Arc::clone(&repository),
        InMemoryAuditSink::default(),
        InMemoryNotifier::default(),
        DiscountEngine::default(),
    );

    let receipt = first.submit(submit_request(), "jlee", &context()).await.expect("submit");
    let approve = approval(json!({
        "approver": "approver1", "action": "APPROVE", "approverName": "Dana Reyes",
        "expectedStatus": "PENDING"
    }));

    first.act(&receipt.id, 1, &approve, &context()).await.expect("first approval");
    let error = second.act(&receipt.id, 1, &approve, &context()).await.expect_err("stale writer");

    assert!(matches!(error, ApplicationError::Conflict(_)));
    let interface = error.into_interface("req-flow");
    assert!(matches!(interface, InterfaceError::Conflict { .. }));
}
