use super::*;
use crate::config::ApprovalMode;
use std::sync::Arc;
use telos_tools::RiskLevel;
use uuid::Uuid;

fn shell_request() -> ApprovalRequest {
    ApprovalRequest::new(
        Uuid::new_v4(),
        "shell",
        "run `cargo test`",
        RiskLevel::High,
        serde_json::json!({"tool": "bash", "command": "cargo test"}),
    )
}

fn write_request() -> ApprovalRequest {
    ApprovalRequest::new(
        Uuid::new_v4(),
        "file_write",
        "write report.md",
        RiskLevel::Medium,
        serde_json::json!({"tool": "file", "path": "report.md"}),
    )
}

#[tokio::test]
async fn test_yolo_auto_approves() {
    let manager = ApprovalManager::new(ApprovalMode::Yolo);
    let decision = manager.request(shell_request()).await;
    assert!(decision.approved);
}

#[tokio::test]
async fn test_auto_edit_approves_writes_but_gates_shell() {
    let manager = Arc::new(ApprovalManager::new(ApprovalMode::AutoEdit));

    let decision = manager.request(write_request()).await;
    assert!(decision.approved);

    // Shell still gates: resolve it from a second task
    let request = shell_request();
    let id = request.id;
    let waiter = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.request(request).await })
    };

    // Wait until the request is parked
    loop {
        if manager.get(id).await.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert!(manager.resolve(id, ApprovalDecision::denied("nope")).await);
    let decision = waiter.await.unwrap();
    assert!(!decision.approved);
    assert_eq!(decision.reason.as_deref(), Some("nope"));
}

#[tokio::test]
async fn test_emergency_override() {
    let manager = ApprovalManager::new(ApprovalMode::Interactive);
    manager.set_emergency_override(true);
    let decision = manager.request(shell_request()).await;
    assert!(decision.approved);
}

#[tokio::test]
async fn test_batch_resolution() {
    let manager = Arc::new(ApprovalManager::new(ApprovalMode::Interactive));

    let mut waiters = Vec::new();
    for _ in 0..3 {
        let manager = Arc::clone(&manager);
        waiters.push(tokio::spawn(
            async move { manager.request(write_request()).await },
        ));
    }

    // Wait until all three are parked
    loop {
        if manager.pending().await.len() == 3 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let resolved = manager.resolve_all(true, "batch approve").await;
    assert_eq!(resolved, 3);

    for waiter in waiters {
        assert!(waiter.await.unwrap().approved);
    }
}

#[tokio::test]
async fn test_resolve_unknown_id() {
    let manager = ApprovalManager::new(ApprovalMode::Interactive);
    assert!(
        !manager
            .resolve(Uuid::new_v4(), ApprovalDecision::approved())
            .await
    );
}

#[tokio::test]
async fn test_deny_all_on_abort() {
    let manager = Arc::new(ApprovalManager::new(ApprovalMode::Interactive));
    let request = shell_request();
    let id = request.id;

    let waiter = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.request(request).await })
    };

    loop {
        if manager.get(id).await.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert_eq!(manager.deny_all_pending("aborted").await, 1);
    assert!(!waiter.await.unwrap().approved);
}
