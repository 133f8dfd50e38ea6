//! # Action Pipeline
//!
//! Drives one submitted action through every gate, in order:
//!
//! ```text
//! [source rate limit] → [decode] → [authenticate] → [authorize] → [user/action/adaptive rate limits]
//!     → [signature + nonce] → [score engine] → [ledger commit]
//!     → cache invalidation → rank lookup → broadcast
//! ```
//!
//! The first failing gate ends the request with its typed rejection. Once the
//! ledger commit has succeeded the action is final: cache, rank, and
//! broadcast failures are logged and counted but never turn the response
//! into a rejection.

use ap_01_rate_limiter::{counts_as_violation, RateLimiterApi, ReputationRecorder};
use ap_02_auth_gate::{parse_bearer, AuthGateApi};
use ap_03_signature_verification::SignatureVerifierApi;
use ap_04_score_engine::ScoreEngineApi;
use ap_05_ledger::{CommitRequest, LedgerApi};
use ap_06_score_broadcast::{CacheInvalidator, ScoreBroadcaster};
use ap_telemetry::{
    metric_inc, time_stage, ACTIONS_ACCEPTED, ACTIONS_RECEIVED, EVENTS_PUBLISHED,
    POINTS_AWARDED, POST_COMMIT_FAILURES, REJECTIONS, TRANSIENT_FAILURES,
};
use shared_bus::{EventPublisher, PipelineEvent, RejectionNotice, ScoreUpdate};
use shared_types::{
    ActionReceipt, ActionRequest, ActionType, Permission, Rejection, ScoreTransaction,
    SharedClock, UserId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-request facts known before the pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Network source identity (client IP), keyed by the tier-1 limit.
    pub source: String,
}

impl RequestContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// The services the pipeline is assembled from.
pub struct PipelineStages {
    pub rate_limiter: Arc<dyn RateLimiterApi>,
    pub reputation: Arc<dyn ReputationRecorder>,
    pub auth: Arc<dyn AuthGateApi>,
    pub signatures: Arc<dyn SignatureVerifierApi>,
    pub engine: Arc<dyn ScoreEngineApi>,
    pub ledger: Arc<dyn LedgerApi>,
    pub invalidator: CacheInvalidator,
    pub broadcaster: ScoreBroadcaster,
    /// Fraud-audit feed.
    pub audit: Arc<dyn EventPublisher>,
    pub clock: SharedClock,
}

enum Submission<'a> {
    Parsed(ActionRequest),
    Raw(&'a [u8]),
}

/// What is known about the request so far, for the rejection log.
#[derive(Default)]
struct Trail {
    user: Option<UserId>,
    action: Option<ActionType>,
}

pub struct ActionPipeline {
    stages: PipelineStages,
}

impl ActionPipeline {
    pub fn new(stages: PipelineStages) -> Self {
        Self { stages }
    }

    /// Runs a decoded request through the pipeline.
    pub async fn submit(
        &self,
        ctx: &RequestContext,
        bearer: Option<&str>,
        request: ActionRequest,
    ) -> Result<ActionReceipt, Rejection> {
        self.execute(ctx, bearer, Submission::Parsed(request)).await
    }

    /// Runs a raw JSON body through the pipeline. The body is decoded only
    /// after the source rate limit, so malformed floods are still throttled.
    pub async fn submit_json(
        &self,
        ctx: &RequestContext,
        bearer: Option<&str>,
        body: &[u8],
    ) -> Result<ActionReceipt, Rejection> {
        self.execute(ctx, bearer, Submission::Raw(body)).await
    }

    async fn execute(
        &self,
        ctx: &RequestContext,
        bearer: Option<&str>,
        submission: Submission<'_>,
    ) -> Result<ActionReceipt, Rejection> {
        metric_inc!(ACTIONS_RECEIVED);
        let _timer = time_stage!("total");
        let mut trail = Trail::default();
        let result = self.run(ctx, bearer, submission, &mut trail).await;
        if let Err(rejection) = &result {
            self.on_rejected(ctx, &trail, rejection).await;
        }
        result
    }

    async fn run(
        &self,
        ctx: &RequestContext,
        bearer: Option<&str>,
        submission: Submission<'_>,
        trail: &mut Trail,
    ) -> Result<ActionReceipt, Rejection> {
        let s = &self.stages;

        {
            let _t = time_stage!("rate_limit_source");
            s.rate_limiter.check_source(&ctx.source).await?;
        }

        let request = match submission {
            Submission::Parsed(request) => request,
            Submission::Raw(body) => serde_json::from_slice::<ActionRequest>(body).map_err(|e| {
                Rejection::invalid_request(format!("malformed action request: {e}"))
            })?,
        };
        trail.action = Some(request.action_type);

        let principal = {
            let _t = time_stage!("auth");
            let token = parse_bearer(bearer)?;
            s.auth.authenticate(token).await?
        };
        trail.user = Some(principal.id.clone());
        s.auth.authorize(&principal, Permission::SubmitAction)?;

        {
            let _t = time_stage!("rate_limit_principal");
            s.rate_limiter
                .check_principal(&principal.id, request.action_type)
                .await?;
        }

        {
            let _t = time_stage!("signature");
            s.signatures.verify(&request, &principal).await?;
        }

        let award = {
            let _t = time_stage!("score_engine");
            s.engine
                .process(request.action_type, &request.action_data, &principal)
                .await?
        };

        let transaction = {
            let _t = time_stage!("ledger");
            s.ledger
                .commit(CommitRequest {
                    user_id: principal.id.clone(),
                    action_type: award.action_type,
                    delta: award.delta,
                    completion_key: award.completion_key,
                    cooldown: award.cooldown,
                    occurred_at: s.clock.now(),
                })
                .await?
        };

        Ok(self.after_commit(&transaction).await)
    }

    /// Side effects of a committed transaction. Never fails; a rank that
    /// cannot be read is reported as 0.
    async fn after_commit(&self, tx: &ScoreTransaction) -> ActionReceipt {
        let s = &self.stages;
        let _t = time_stage!("post_commit");

        if let Err(e) = s.invalidator.invalidate(&tx.user_id, tx.score_after).await {
            warn!(
                user = %tx.user_id,
                tx = %tx.id,
                error = %e,
                "Cache invalidation failed after commit"
            );
            metric_inc!(POST_COMMIT_FAILURES, &["cache_invalidation"]);
        }

        let new_rank = match s.ledger.rank_of(&tx.user_id).await {
            Ok(rank) => rank,
            Err(e) => {
                warn!(
                    user = %tx.user_id,
                    tx = %tx.id,
                    error = %e,
                    "Rank lookup failed after commit"
                );
                metric_inc!(POST_COMMIT_FAILURES, &["rank_lookup"]);
                0
            }
        };

        let update = ScoreUpdate {
            user_id: tx.user_id.clone(),
            new_score: tx.score_after,
            score_change: tx.score_delta,
            new_rank,
            timestamp: tx.occurred_at,
        };
        s.broadcaster.publish(update).await;
        metric_inc!(EVENTS_PUBLISHED, &["score_updated"]);

        s.reputation.record_success(&tx.user_id);
        metric_inc!(ACTIONS_ACCEPTED, &[tx.action_type.as_str()]);
        POINTS_AWARDED.inc_by(tx.score_delta.max(0) as f64);

        info!(
            user = %tx.user_id,
            action = %tx.action_type,
            delta = tx.score_delta,
            score = tx.score_after,
            rank = new_rank,
            "Action accepted"
        );

        ActionReceipt {
            score_awarded: tx.score_delta,
            new_total_score: tx.score_after,
            new_rank,
            transaction_id: tx.id,
        }
    }

    async fn on_rejected(&self, ctx: &RequestContext, trail: &Trail, rejection: &Rejection) {
        let s = &self.stages;
        let gate = rejection.gate();
        let user = trail.user.as_ref().map(UserId::as_str).unwrap_or("-");
        let action = trail.action.map(|a| a.as_str()).unwrap_or("-");

        warn!(
            source = %ctx.source,
            user,
            action,
            gate = gate.as_str(),
            code = rejection.code.as_str(),
            reason = %rejection.message,
            "Action rejected"
        );
        metric_inc!(REJECTIONS, &[gate.as_str(), rejection.code.as_str()]);
        if rejection.is_transient() {
            metric_inc!(TRANSIENT_FAILURES, &[gate.as_str()]);
        }

        if let Some(user) = &trail.user {
            if counts_as_violation(rejection.code) {
                s.reputation.record_violation(user);
            }
        }

        let notice = RejectionNotice {
            user_id: trail.user.clone(),
            source: ctx.source.clone(),
            action_type: trail.action,
            code: rejection.code,
            gate,
            timestamp: s.clock.now(),
        };
        let listeners = s.audit.publish(PipelineEvent::ActionRejected(notice)).await;
        metric_inc!(EVENTS_PUBLISHED, &["action_rejected"]);
        debug!(listeners, "Rejection published to fraud audit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{PipelineConfig, PipelineContainer};
    use ap_03_signature_verification::sign_request;
    use ap_04_score_engine::Task;
    use ap_05_ledger::replay_score;
    use ap_06_score_broadcast::{CacheConfig, KvScoreCache};
    use serde_json::json;
    use shared_bus::EventFilter;
    use shared_store::InMemoryStore;
    use shared_types::{ErrorCode, ManualClock, Role, SessionId, SigningKey, TimeSource};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const T0: u64 = 1_700_000_000_000;

    struct Harness {
        container: PipelineContainer,
        clock: Arc<ManualClock>,
        token: String,
        key: SigningKey,
        user: UserId,
        nonce_seq: AtomicU32,
    }

    impl Harness {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::new(T0));
            let mut config = PipelineConfig::default();
            config.auth.token_secret = "11".repeat(32);
            let container = PipelineContainer::build(&config, clock.clone()).unwrap();
            let user = UserId::new("alice");
            let key = SigningKey::new(b"alice-session-key".to_vec());
            let session = SessionId::new("s-alice");
            let token = container.open_session(&user, &session, Role::User, key.clone());
            container.resources.add_task(Task {
                id: "t1".into(),
                assignees: HashSet::from([user.clone()]),
                level: 1,
                assigned_at: T0,
                expected_duration: Duration::from_secs(3600),
            });
            Self {
                container,
                clock,
                token,
                key,
                user,
                nonce_seq: AtomicU32::new(0),
            }
        }

        fn request(&self, action: ActionType, data: serde_json::Value) -> ActionRequest {
            let n = self.nonce_seq.fetch_add(1, Ordering::SeqCst) + 1;
            let mut request = ActionRequest {
                action_type: action,
                action_data: data,
                timestamp: self.clock.now(),
                nonce: format!("nonce-{n:08}"),
                signature: String::new(),
            };
            request.signature = sign_request(&self.key, &request, &self.user);
            request
        }

        async fn submit(&self, request: ActionRequest) -> Result<ActionReceipt, Rejection> {
            let bearer = format!("Bearer {}", self.token);
            self.container
                .pipeline
                .submit(&RequestContext::new("10.0.0.1"), Some(&bearer), request)
                .await
        }
    }

    #[tokio::test]
    async fn test_accepted_action_commits_and_broadcasts() {
        let h = Harness::new();
        let mut updates = h.container.bus.subscribe(EventFilter::user(h.user.clone()));

        let receipt = h
            .submit(h.request(ActionType::CompleteTask, json!({ "taskId": "t1" })))
            .await
            .unwrap();
        assert_eq!(receipt.score_awarded, 12);
        assert_eq!(receipt.new_total_score, 12);
        assert_eq!(receipt.new_rank, 1);

        let Some(PipelineEvent::ScoreUpdated(update)) = updates.recv().await else {
            panic!("expected a score update");
        };
        assert_eq!(update.new_score, 12);
        assert_eq!(update.score_change, 12);

        let history = h.container.ledger.history(&h.user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(replay_score(&history), Some(12));
    }

    #[tokio::test]
    async fn test_rejection_reaches_fraud_audit() {
        let h = Harness::new();
        let mut audit = h.container.bus.subscribe(EventFilter::fraud_audit());
        let request = h.request(ActionType::CompleteTask, json!({ "taskId": "t1" }));

        h.submit(request.clone()).await.unwrap();
        let err = h.submit(request).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ReplayAttack);

        let Some(PipelineEvent::ActionRejected(notice)) = audit.recv().await else {
            panic!("expected a rejection notice");
        };
        assert_eq!(notice.code, ErrorCode::ReplayAttack);
        assert_eq!(notice.user_id, Some(h.user.clone()));
        assert_eq!(notice.action_type, Some(ActionType::CompleteTask));
        assert_eq!(notice.source, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_missing_bearer_is_invalid_token() {
        let h = Harness::new();
        let err = h
            .container
            .pipeline
            .submit(
                &RequestContext::new("10.0.0.1"),
                None,
                h.request(ActionType::DailyCheckIn, json!({})),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_request() {
        let h = Harness::new();
        let bearer = format!("Bearer {}", h.token);
        let err = h
            .container
            .pipeline
            .submit_json(
                &RequestContext::new("10.0.0.1"),
                Some(&bearer),
                br#"{"actionType":"GRANT_POINTS"}"#,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn test_cache_outage_after_commit_does_not_reject() {
        let h = Harness::new();
        let broken = Arc::new(InMemoryStore::new());
        broken.set_available(false);
        let mut stages = h.container.stages();
        stages.invalidator = CacheInvalidator::new(Arc::new(KvScoreCache::new(
            broken,
            CacheConfig::default(),
            h.clock.clone(),
        )));
        let pipeline = ActionPipeline::new(stages);

        let bearer = format!("Bearer {}", h.token);
        let receipt = pipeline
            .submit(
                &RequestContext::new("10.0.0.1"),
                Some(&bearer),
                h.request(ActionType::DailyCheckIn, json!({})),
            )
            .await
            .unwrap();
        assert_eq!(receipt.new_total_score, 5);
        assert_eq!(receipt.new_rank, 1);
    }

    #[tokio::test]
    async fn test_ledger_outage_is_transient_and_leaves_no_row() {
        let h = Harness::new();
        h.container.ledger_store.set_available(false);
        let err = h
            .submit(h.request(ActionType::DailyCheckIn, json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::StoreUnavailable);
        assert!(err.is_transient());

        h.container.ledger_store.set_available(true);
        assert!(h.container.ledger.history(&h.user).await.unwrap().is_empty());
    }
}
