//! # Concurrent Updates
//!
//! Parallel submissions for one user serialize on the user's ledger row:
//! N accepted updates of delta d leave `initial + N·d` and exactly N new
//! rows, with no lost update and an unbroken chain.

#[cfg(test)]
mod tests {
    use crate::support::TestNode;
    use ap_05_ledger::{replay_score, verify_chain, CommitRequest, LedgerApi};
    use futures::future::join_all;
    use serde_json::json;
    use shared_types::{ActionType, ErrorCode, UserId};
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_commits_on_one_row() {
        const N: usize = 50;
        const DELTA: i64 = 7;
        const INITIAL: i64 = 100;

        let node = TestNode::new();
        let ledger = node.container.ledger.clone();
        let user = UserId::new("alice");
        let commit = |delta| CommitRequest {
            user_id: user.clone(),
            action_type: ActionType::CompleteTask,
            delta,
            completion_key: None,
            cooldown: None,
            occurred_at: node.now(),
        };

        ledger.commit(commit(INITIAL)).await.unwrap();

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let request = commit(DELTA);
                tokio::spawn(async move { ledger.commit(request).await })
            })
            .collect();
        for result in join_all(handles).await {
            result.unwrap().unwrap();
        }

        let state = ledger.state(&user).await.unwrap();
        let history = ledger.history(&user).await.unwrap();
        assert_eq!(state.current_score, INITIAL + N as i64 * DELTA);
        assert_eq!(history.len(), N + 1);
        assert_eq!(state.version, N as u64 + 1);
        assert_eq!(replay_score(&history), Some(state.current_score));
        verify_chain(&state, &history).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_submissions_through_pipeline() {
        const N: usize = 20;

        let node = Arc::new(TestNode::new());
        let alice = node.login("alice");
        for i in 0..N {
            node.assign_task(&format!("task-{i}"), &alice.id);
        }

        let handles: Vec<_> = (0..N)
            .map(|i| {
                let node = Arc::clone(&node);
                let alice = alice.clone();
                tokio::spawn(async move {
                    let request = node.request(
                        &alice,
                        ActionType::CompleteTask,
                        json!({ "taskId": format!("task-{i}") }),
                    );
                    node.submit(&alice, request).await
                })
            })
            .collect();
        let receipts: Vec<_> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let awarded: i64 = receipts.iter().map(|r| r.score_awarded).sum();
        assert_eq!(awarded, 12 * N as i64);
        let mut totals: Vec<_> = receipts.iter().map(|r| r.new_total_score).collect();
        totals.sort_unstable();
        totals.dedup();
        assert_eq!(totals.len(), N, "every commit saw a distinct running total");

        let ledger = &node.container.ledger;
        let state = ledger.state(&alice.id).await.unwrap();
        let history = ledger.history(&alice.id).await.unwrap();
        assert_eq!(state.current_score, awarded);
        assert_eq!(history.len(), N);
        verify_chain(&state, &history).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_duplicate_completion_race_commits_once() {
        const RACERS: usize = 8;

        let node = Arc::new(TestNode::new());
        let alice = node.login("alice");
        node.assign_task("task-1", &alice.id);

        // Distinct nonces, same task: only the ledger's completion check can
        // stop the losers.
        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let node = Arc::clone(&node);
                let alice = alice.clone();
                tokio::spawn(async move {
                    let request =
                        node.request(&alice, ActionType::CompleteTask, json!({ "taskId": "task-1" }));
                    node.submit(&alice, request).await
                })
            })
            .collect();

        let mut accepted = 0;
        for joined in join_all(handles).await {
            match joined.unwrap() {
                Ok(_) => accepted += 1,
                Err(e) => assert_eq!(e.code, ErrorCode::AlreadyCompleted),
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(node.container.ledger.history(&alice.id).await.unwrap().len(), 1);
    }
}
