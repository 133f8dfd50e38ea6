//! # Pipeline Flows
//!
//! The accept path end to end:
//!
//! ```text
//! submit → gates → score engine → ledger commit
//!                                    │
//!                  ┌─────────────────┼──────────────────┐
//!                  ↓                 ↓                  ↓
//!          cache invalidation   ScoreUpdated       ActionReceipt
//! ```
//!
//! Every accepted action leaves exactly one ledger row, and the row chain
//! replays to the stored score.

#[cfg(test)]
mod tests {
    use crate::support::TestNode;
    use ap_05_ledger::{replay_score, verify_chain, LedgerApi};
    use serde_json::json;
    use shared_bus::{EventFilter, PipelineEvent};
    use shared_types::{ActionType, ErrorCode, UserId};
    use std::time::Duration;

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_each_action_type_scores_from_server_facts() {
        let node = TestNode::new();
        let alice = node.login("alice");
        node.assign_task("task-1", &alice.id);
        node.add_article("article-1", &alice.id);

        let task = node
            .submit(&alice, node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" })))
            .await
            .unwrap();
        assert_eq!(task.score_awarded, 12);

        let check_in = node
            .submit(&alice, node.request(&alice, ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap();
        assert_eq!(check_in.score_awarded, 5);

        let article = node
            .submit(
                &alice,
                node.request(&alice, ActionType::PublishArticle, json!({ "articleId": "article-1" })),
            )
            .await
            .unwrap();
        assert_eq!(article.score_awarded, 20);
        assert_eq!(article.new_total_score, 37);
        assert_eq!(article.new_rank, 1);
    }

    #[tokio::test]
    async fn test_late_completion_loses_speed_bonus() {
        let node = TestNode::new();
        node.assign_task("task-1", &UserId::new("alice"));
        node.advance(Duration::from_secs(2 * 3600));
        let alice = node.login("alice");

        let receipt = node
            .submit(&alice, node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" })))
            .await
            .unwrap();
        assert_eq!(receipt.score_awarded, 10);
    }

    // =========================================================================
    // LEDGER CONSISTENCY
    // =========================================================================

    #[tokio::test]
    async fn test_ledger_chain_matches_stored_score() {
        let node = TestNode::new();
        let alice = node.login("alice");
        for i in 0..5 {
            node.assign_task(&format!("task-{i}"), &alice.id);
        }

        let mut expected = 0;
        for i in 0..5 {
            let receipt = node
                .submit(
                    &alice,
                    node.request(&alice, ActionType::CompleteTask, json!({ "taskId": format!("task-{i}") })),
                )
                .await
                .unwrap();
            expected += receipt.score_awarded;
            assert_eq!(receipt.new_total_score, expected);
            node.advance(Duration::from_secs(1));
        }

        let ledger = &node.container.ledger;
        let state = ledger.state(&alice.id).await.unwrap();
        let history = ledger.history(&alice.id).await.unwrap();
        assert_eq!(state.current_score, expected);
        assert_eq!(state.version, 5);
        assert_eq!(history.len(), 5);
        assert_eq!(replay_score(&history), Some(expected));
        verify_chain(&state, &history).unwrap();
        for pair in history.windows(2) {
            assert_eq!(pair[0].score_after, pair[1].score_before);
        }
    }

    #[tokio::test]
    async fn test_rejections_leave_no_rows() {
        let node = TestNode::new();
        let alice = node.login("alice");
        let bob = node.login("bob");
        node.assign_task("task-bob", &bob.id);

        let not_assigned = node
            .submit(&alice, node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-bob" })))
            .await
            .unwrap_err();
        assert_eq!(not_assigned.code, ErrorCode::UnauthorizedResourceAccess);

        let missing = node
            .submit(&alice, node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "nope" })))
            .await
            .unwrap_err();
        assert_eq!(missing.code, ErrorCode::ResourceNotFound);

        let bad_payload = node
            .submit(&alice, node.request(&alice, ActionType::CompleteTask, json!({ "task": 1 })))
            .await
            .unwrap_err();
        assert_eq!(bad_payload.code, ErrorCode::InvalidRequest);

        assert!(node.container.ledger.history(&alice.id).await.unwrap().is_empty());
        assert_eq!(node.container.ledger.state(&alice.id).await.unwrap().current_score, 0);
    }

    #[tokio::test]
    async fn test_second_completion_and_cooldown() {
        let node = TestNode::new();
        let alice = node.login("alice");
        node.assign_task("task-1", &alice.id);
        node.add_article("a-1", &alice.id);
        node.add_article("a-2", &alice.id);

        node.submit(&alice, node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" })))
            .await
            .unwrap();
        let again = node
            .submit(&alice, node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" })))
            .await
            .unwrap_err();
        assert_eq!(again.code, ErrorCode::AlreadyCompleted);

        node.submit(&alice, node.request(&alice, ActionType::PublishArticle, json!({ "articleId": "a-1" })))
            .await
            .unwrap();
        let cooling = node
            .submit(&alice, node.request(&alice, ActionType::PublishArticle, json!({ "articleId": "a-2" })))
            .await
            .unwrap_err();
        assert_eq!(cooling.code, ErrorCode::CooldownActive);
        assert!(cooling.retry_after.is_some());

        node.advance(Duration::from_secs(10 * 60));
        node.submit(&alice, node.request(&alice, ActionType::PublishArticle, json!({ "articleId": "a-2" })))
            .await
            .unwrap();
        assert_eq!(node.container.ledger.history(&alice.id).await.unwrap().len(), 3);
    }

    // =========================================================================
    // BROADCAST AND READS
    // =========================================================================

    #[tokio::test]
    async fn test_updates_reach_global_and_user_topics() {
        let node = TestNode::new();
        let alice = node.login("alice");
        let bob = node.login("bob");
        let mut global = node.container.bus.subscribe(EventFilter::leaderboard());
        let mut bobs = node.container.bus.subscribe(EventFilter::user(bob.id.clone()));

        node.submit(&alice, node.request(&alice, ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap();
        node.submit(&bob, node.request(&bob, ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap();

        let Some(PipelineEvent::ScoreUpdated(first)) = global.recv().await else {
            panic!("expected alice's update on the global topic");
        };
        assert_eq!(first.user_id, alice.id);
        let Some(PipelineEvent::ScoreUpdated(only)) = bobs.recv().await else {
            panic!("expected bob's update on his topic");
        };
        assert_eq!(only.user_id, bob.id);
        assert_eq!(only.new_score, 5);
        assert!(bobs.try_recv().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_leaderboard_reflects_commits_after_invalidation() {
        let node = TestNode::new();
        let alice = node.login("alice");
        let bob = node.login("bob");
        node.assign_task("task-1", &bob.id);

        node.submit(&alice, node.request(&alice, ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap();
        let before = node.container.leaderboard.top(10).await.unwrap();
        assert_eq!(before[0].user_id, alice.id);

        let receipt = node
            .submit(&bob, node.request(&bob, ActionType::CompleteTask, json!({ "taskId": "task-1" })))
            .await
            .unwrap();
        assert_eq!(receipt.new_rank, 1);

        let after = node.container.leaderboard.top(10).await.unwrap();
        assert_eq!(after[0].user_id, bob.id);
        assert_eq!(after[1].user_id, alice.id);
        assert_eq!(after[1].rank, 2);

        let standing = node.container.leaderboard.standing(&UserId::new("carol")).await.unwrap();
        assert_eq!(standing.score, 0);
        assert_eq!(standing.rank, 3);
    }
}
