//! # Replay and Tampering
//!
//! | Attack | Expected |
//! |--------|----------|
//! | Resubmit a captured request | `REPLAY_ATTACK` |
//! | Fire the same request concurrently | one accepted, rest `REPLAY_ATTACK` |
//! | Resubmit after the freshness window | `REPLAY_ATTACK` while the nonce is remembered, `STALE_REQUEST` after |
//! | Pre-date or post-date the timestamp | `STALE_REQUEST` |
//! | Edit `actionData` after signing | `INVALID_SIGNATURE` |
//! | Sign with another session's key | `INVALID_SIGNATURE` |

#[cfg(test)]
mod tests {
    use crate::support::{TestNode, TestUser, SOURCE};
    use ap_05_ledger::LedgerApi;
    use futures::future::join_all;
    use serde_json::json;
    use shared_bus::{EventFilter, PipelineEvent};
    use shared_types::{ActionType, ErrorCode};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_captured_request_replayed() {
        let node = TestNode::new();
        let alice = node.login("alice");
        node.assign_task("task-1", &alice.id);
        let mut audit = node.container.bus.subscribe(EventFilter::fraud_audit());

        let captured = node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" }));
        node.submit(&alice, captured.clone()).await.unwrap();

        let replayed = node.submit(&alice, captured).await.unwrap_err();
        assert_eq!(replayed.code, ErrorCode::ReplayAttack);
        assert_eq!(node.container.ledger.history(&alice.id).await.unwrap().len(), 1);

        let Some(PipelineEvent::ActionRejected(notice)) = audit.recv().await else {
            panic!("replay not audited");
        };
        assert_eq!(notice.code, ErrorCode::ReplayAttack);
        assert_eq!(notice.source, SOURCE);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_replay_accepts_exactly_one() {
        const COPIES: usize = 10;

        let node = Arc::new(TestNode::new());
        let alice = node.login("alice");
        node.assign_task("task-1", &alice.id);
        let request = node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" }));

        let handles: Vec<_> = (0..COPIES)
            .map(|_| {
                let node = Arc::clone(&node);
                let alice = alice.clone();
                let request = request.clone();
                tokio::spawn(async move { node.submit(&alice, request).await })
            })
            .collect();

        let mut accepted = 0;
        for joined in join_all(handles).await {
            match joined.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert_eq!(e.code, ErrorCode::ReplayAttack),
            }
        }
        assert_eq!(accepted, 1);
        let state = node.container.ledger.state(&alice.id).await.unwrap();
        assert_eq!(state.current_score, 12);
    }

    #[tokio::test]
    async fn test_replay_after_freshness_window() {
        let node = TestNode::new();
        let alice = node.login("alice");
        node.assign_task("task-1", &alice.id);

        let captured = node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" }));
        node.submit(&alice, captured.clone()).await.unwrap();

        // Past max_age (60s) but inside nonce_ttl (5m): still recognizably a replay.
        node.advance(Duration::from_secs(120));
        let remembered = node.submit(&alice, captured.clone()).await.unwrap_err();
        assert_eq!(remembered.code, ErrorCode::ReplayAttack);

        // The nonce record has expired; the timestamp alone rejects it.
        node.advance(Duration::from_secs(10 * 60));
        let forgotten = node.submit(&alice, captured).await.unwrap_err();
        assert_eq!(forgotten.code, ErrorCode::StaleRequest);
        assert_eq!(node.container.ledger.history(&alice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_and_future_timestamps() {
        let node = TestNode::new();
        node.advance(Duration::from_secs(3600));
        let alice = node.login("alice");
        node.assign_task("task-1", &alice.id);
        let now = node.now();
        let task = || json!({ "taskId": "task-1" });

        let edge = alice.sign(ActionType::CompleteTask, task(), now - 60_000, "nonce-at-the-edge");
        let old = alice.sign(ActionType::CompleteTask, task(), now - 60_001, "nonce-just-too-old");
        let future = alice.sign(ActionType::CompleteTask, task(), now + 5_001, "nonce-from-future");

        assert_eq!(node.submit(&alice, old).await.unwrap_err().code, ErrorCode::StaleRequest);
        assert_eq!(node.submit(&alice, future).await.unwrap_err().code, ErrorCode::StaleRequest);
        node.submit(&alice, edge).await.unwrap();
    }

    #[tokio::test]
    async fn test_tampered_payload() {
        let node = TestNode::new();
        let alice = node.login("alice");
        node.assign_task("task-1", &alice.id);
        node.assign_task("task-2", &alice.id);

        let mut request = node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" }));
        request.action_data = json!({ "taskId": "task-2" });
        let err = node.submit(&alice, request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSignature);
        assert!(node.container.ledger.history(&alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_signature_from_foreign_session_key() {
        let node = TestNode::new();
        let alice = node.login("alice");
        let mallory = node.login("mallory");

        // Alice's credential, Mallory's signing key.
        let impostor = TestUser {
            key: mallory.key.clone(),
            ..alice.clone()
        };
        let forged = node.request(&impostor, ActionType::DailyCheckIn, json!({}));
        let err = node.submit(&alice, forged).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSignature);
    }

    #[tokio::test]
    async fn test_rejected_nonce_is_not_burned() {
        let node = TestNode::new();
        let alice = node.login("alice");
        node.assign_task("task-1", &alice.id);

        let good = node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" }));
        let mut bad = good.clone();
        bad.signature = "00".repeat(32);
        assert_eq!(
            node.submit(&alice, bad).await.unwrap_err().code,
            ErrorCode::InvalidSignature
        );
        // Same nonce with the genuine signature still goes through.
        node.submit(&alice, good).await.unwrap();
    }
}
