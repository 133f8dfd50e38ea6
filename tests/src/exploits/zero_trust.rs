//! # Client-Asserted Scores
//!
//! Clients may put anything in `actionData`, correctly signed. Points come
//! only from the stored resource and the score table, so padding the
//! payload with `points`, `score`, `level` or a bonus never changes the
//! award.

#[cfg(test)]
mod tests {
    use crate::support::TestNode;
    use ap_05_ledger::LedgerApi;
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};
    use shared_types::ActionType;

    const CLAIM_KEYS: [&str; 7] = [
        "points",
        "score",
        "scoreDelta",
        "level",
        "bonus",
        "multiplier",
        "completedAt",
    ];

    fn claim_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            "[a-z0-9]{0,12}".prop_map(Value::from),
            (0u32..1_000_000).prop_map(|n| json!({ "value": n })),
        ]
    }

    fn claims() -> impl Strategy<Value = Vec<(usize, Value)>> {
        prop::collection::vec((0..CLAIM_KEYS.len(), claim_value()), 0..6)
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_padded_task_payload_scores_the_same(claims in claims()) {
            let (awarded, total) = runtime().block_on(async {
                let node = TestNode::new();
                let alice = node.login("alice");
                node.assign_task("task-1", &alice.id);

                let mut data = Map::new();
                data.insert("taskId".to_string(), json!("task-1"));
                for (key, value) in claims {
                    data.insert(CLAIM_KEYS[key].to_string(), value);
                }
                let request = node.request(&alice, ActionType::CompleteTask, Value::Object(data));
                let receipt = node.submit(&alice, request).await.unwrap();
                let state = node.container.ledger.state(&alice.id).await.unwrap();
                (receipt.score_awarded, state.current_score)
            });
            prop_assert_eq!(awarded, 12);
            prop_assert_eq!(total, 12);
        }

        #[test]
        fn prop_padded_check_in_scores_the_same(claims in claims()) {
            let awarded = runtime().block_on(async {
                let node = TestNode::new();
                let alice = node.login("alice");
                let data: Map<String, Value> = claims
                    .into_iter()
                    .map(|(key, value)| (CLAIM_KEYS[key].to_string(), value))
                    .collect();
                let request = node.request(&alice, ActionType::DailyCheckIn, Value::Object(data));
                node.submit(&alice, request).await.unwrap().score_awarded
            });
            prop_assert_eq!(awarded, 5);
        }
    }
}
