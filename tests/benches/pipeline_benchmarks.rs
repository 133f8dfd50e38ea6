//! # Action Pipeline Benchmarks
//!
//! | Stage | Path | Target |
//! |-------|------|--------|
//! | Signature | canonical message + HMAC-SHA256 | < 50µs |
//! | Ledger | one commit on a contended row | < 100µs |
//! | Pipeline | replayed request, rejected at the nonce gate | < 200µs |

use ap_05_ledger::{CommitRequest, LedgerApi};
use ap_tests::support::TestNode;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use shared_types::{ActionType, UserId};
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Signature: canonical form and MAC
// ============================================================================

fn bench_request_signing(c: &mut Criterion) {
    let mut group = c.benchmark_group("ap-03-signature");
    let node = TestNode::new();
    let alice = node.login("alice");

    for fields in [1usize, 10, 100] {
        let data: serde_json::Map<_, _> = (0..fields)
            .map(|i| (format!("field{i:03}"), json!({ "n": i, "s": "value" })))
            .collect();
        let data = serde_json::Value::Object(data);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("sign_request", fields), &data, |b, data| {
            b.iter(|| {
                black_box(alice.sign(
                    ActionType::CompleteTask,
                    data.clone(),
                    node.now(),
                    "nonce-benchmark-0001",
                ))
            })
        });
    }
    group.finish();
}

// ============================================================================
// Ledger: serialized commits on one row
// ============================================================================

fn bench_ledger_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ap-05-ledger");
    group.measurement_time(Duration::from_secs(5));
    let rt = runtime();
    let node = TestNode::new();
    let user = UserId::new("bench-user");

    group.bench_function("commit_single_row", |b| {
        b.iter(|| {
            rt.block_on(node.container.ledger.commit(CommitRequest {
                user_id: user.clone(),
                action_type: ActionType::CompleteTask,
                delta: 1,
                completion_key: None,
                cooldown: None,
                occurred_at: node.now(),
            }))
            .unwrap()
        })
    });
    group.finish();
}

// ============================================================================
// Pipeline: the fraud path
// ============================================================================

fn bench_replay_rejection(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let rt = runtime();
    let mut config = action_runtime::PipelineConfig::default();
    config.rate_limit.enabled = false;
    let node = TestNode::with_config(config);
    let alice = node.login("alice");
    let captured = node.request(&alice, ActionType::DailyCheckIn, json!({}));
    rt.block_on(node.submit(&alice, captured.clone())).unwrap();

    group.bench_function("replay_rejected", |b| {
        b.iter(|| black_box(rt.block_on(node.submit(&alice, captured.clone())).is_err()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_request_signing,
    bench_ledger_commit,
    bench_replay_rejection
);
criterion_main!(benches);
