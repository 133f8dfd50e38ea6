//! # Rate Limit Evasion
//!
//! | Attack | Expected |
//! |--------|----------|
//! | Burst past the per-user ceiling | request `limit + 1` gets `RATE_LIMIT_EXCEEDED` with a retry hint |
//! | Rotate source addresses | the per-user tier still applies |
//! | Flood from one source across accounts | the per-source tier applies |
//! | Repeat a once-a-day action | the per-action tier rejects before the engine |

#[cfg(test)]
mod tests {
    use crate::support::{TestNode, SOURCE};
    use action_runtime::PipelineConfig;
    use ap_01_rate_limiter::TierLimit;
    use ap_05_ledger::LedgerApi;
    use serde_json::json;
    use shared_types::{ActionType, ErrorCode};
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_secs(60);

    fn config(edit: impl FnOnce(&mut PipelineConfig)) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        edit(&mut config);
        config
    }

    fn task(i: usize) -> serde_json::Value {
        json!({ "taskId": format!("task-{i}") })
    }

    #[tokio::test]
    async fn test_per_user_boundary_and_window_slide() {
        const LIMIT: usize = 3;
        let node = TestNode::with_config(config(|c| {
            c.rate_limit.per_user = TierLimit::new(LIMIT as u32, WINDOW)
        }));
        let alice = node.login("alice");
        for i in 0..=LIMIT {
            node.assign_task(&format!("task-{i}"), &alice.id);
        }

        for i in 0..LIMIT {
            node.submit(&alice, node.request(&alice, ActionType::CompleteTask, task(i)))
                .await
                .unwrap();
        }
        let over = node
            .submit(&alice, node.request(&alice, ActionType::CompleteTask, task(LIMIT)))
            .await
            .unwrap_err();
        assert_eq!(over.code, ErrorCode::RateLimitExceeded);
        let retry_after = over.retry_after.unwrap();
        assert!(retry_after > Duration::ZERO && retry_after <= WINDOW);

        node.advance(WINDOW + Duration::from_secs(1));
        node.submit(&alice, node.request(&alice, ActionType::CompleteTask, task(LIMIT)))
            .await
            .unwrap();
        assert_eq!(
            node.container.ledger.history(&alice.id).await.unwrap().len(),
            LIMIT + 1
        );
    }

    #[tokio::test]
    async fn test_source_rotation_does_not_reset_user_tier() {
        let node = TestNode::with_config(config(|c| {
            c.rate_limit.per_user = TierLimit::new(2, WINDOW)
        }));
        let alice = node.login("alice");
        for i in 0..3 {
            node.assign_task(&format!("task-{i}"), &alice.id);
        }

        let sources = ["198.51.100.1", "198.51.100.2", "198.51.100.3"];
        let mut outcomes = Vec::new();
        for (i, source) in sources.iter().enumerate() {
            let request = node.request(&alice, ActionType::CompleteTask, task(i));
            outcomes.push(node.submit_from(source, &alice, request).await);
        }
        assert!(outcomes[0].is_ok());
        assert!(outcomes[1].is_ok());
        assert_eq!(
            outcomes[2].as_ref().unwrap_err().code,
            ErrorCode::RateLimitExceeded
        );
    }

    #[tokio::test]
    async fn test_one_source_many_accounts() {
        let node = TestNode::with_config(config(|c| {
            c.rate_limit.global = TierLimit::new(2, WINDOW)
        }));
        let users: Vec<_> = ["u1", "u2", "u3"].iter().map(|n| node.login(n)).collect();

        for user in &users[..2] {
            node.submit(user, node.request(user, ActionType::DailyCheckIn, json!({})))
                .await
                .unwrap();
        }
        let third = &users[2];
        let blocked = node
            .submit(third, node.request(third, ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap_err();
        assert_eq!(blocked.code, ErrorCode::RateLimitExceeded);

        // A different source is unaffected.
        node.submit_from("198.51.100.99", third, node.request(third, ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_daily_action_repeated() {
        let node = TestNode::new();
        let alice = node.login("alice");

        node.submit(&alice, node.request(&alice, ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap();
        node.advance(Duration::from_secs(30 * 60));
        let repeat = node
            .submit(&alice, node.request(&alice, ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap_err();
        assert_eq!(repeat.code, ErrorCode::RateLimitExceeded);

        node.advance(Duration::from_secs(24 * 3600));
        // The first credential has expired by now.
        let alice = node.login("alice");
        let next_day = node
            .submit(&alice, node.request(&alice, ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap();
        assert_eq!(next_day.new_total_score, 10);
    }

    #[tokio::test]
    async fn test_malformed_flood_is_throttled_by_source() {
        let node = TestNode::with_config(config(|c| {
            c.rate_limit.global = TierLimit::new(5, WINDOW)
        }));
        let ctx = action_runtime::RequestContext::new(SOURCE);

        let mut codes = Vec::new();
        for _ in 0..6 {
            let err = node
                .container
                .pipeline
                .submit_json(&ctx, Some("Bearer garbage"), b"{}")
                .await
                .unwrap_err();
            codes.push(err.code);
        }
        assert!(codes[..5].iter().all(|c| *c == ErrorCode::InvalidRequest));
        assert_eq!(codes[5], ErrorCode::RateLimitExceeded);
    }

    #[tokio::test]
    async fn test_disabled_limiter_passes_everything() {
        let node = TestNode::with_config(config(|c| {
            c.rate_limit.enabled = false;
            c.rate_limit.per_user = TierLimit::new(1, WINDOW);
        }));
        let alice = node.login("alice");
        for i in 0..5 {
            node.assign_task(&format!("task-{i}"), &alice.id);
            node.submit(&alice, node.request(&alice, ActionType::CompleteTask, task(i)))
                .await
                .unwrap();
        }
    }
}
