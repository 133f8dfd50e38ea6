//! Test harness: a fully wired container on a manual clock.

use action_runtime::{PipelineConfig, PipelineContainer, RequestContext};
use ap_04_score_engine::{Article, Task};
use serde_json::Value;
use shared_types::{
    ActionReceipt, ActionRequest, ActionType, ManualClock, Rejection, Role, SessionId, SigningKey,
    TimeSource, Timestamp, UserId,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const T0: Timestamp = 1_700_000_000_000;
pub const SOURCE: &str = "203.0.113.10";

/// Hex secret long enough to pass startup validation.
pub fn test_secret() -> String {
    "5a".repeat(32)
}

pub struct TestNode {
    pub container: PipelineContainer,
    pub clock: Arc<ManualClock>,
}

impl Default for TestNode {
    fn default() -> Self {
        Self::new()
    }
}

impl TestNode {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(mut config: PipelineConfig) -> Self {
        config.auth.token_secret = test_secret();
        let clock = Arc::new(ManualClock::new(T0));
        let container = match PipelineContainer::build(&config, clock.clone()) {
            Ok(container) => container,
            Err(e) => panic!("test container: {e}"),
        };
        Self { container, clock }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Logs `name` in with a fresh session and per-session signing key.
    pub fn login(&self, name: &str) -> TestUser {
        self.login_as(name, Role::User)
    }

    pub fn login_as(&self, name: &str, role: Role) -> TestUser {
        let id = UserId::new(name);
        let key = SigningKey::new(format!("{name}-session-key").into_bytes());
        let session = SessionId::new(format!("session-{name}"));
        let token = self.container.open_session(&id, &session, role, key.clone());
        TestUser { id, key, token }
    }

    /// Level-1 task assigned to `user` now, expected to take an hour.
    pub fn assign_task(&self, task_id: &str, user: &UserId) {
        self.container.resources.add_task(Task {
            id: task_id.to_string(),
            assignees: HashSet::from([user.clone()]),
            level: 1,
            assigned_at: self.now(),
            expected_duration: Duration::from_secs(3600),
        });
    }

    pub fn add_article(&self, article_id: &str, author: &UserId) {
        self.container.resources.add_article(Article {
            id: article_id.to_string(),
            author: author.clone(),
        });
    }

    /// Signed request timestamped at the current server time.
    pub fn request(&self, user: &TestUser, action: ActionType, data: Value) -> ActionRequest {
        user.sign(action, data, self.now(), &Uuid::new_v4().to_string())
    }

    pub async fn submit(
        &self,
        user: &TestUser,
        request: ActionRequest,
    ) -> Result<ActionReceipt, Rejection> {
        self.submit_from(SOURCE, user, request).await
    }

    pub async fn submit_from(
        &self,
        source: &str,
        user: &TestUser,
        request: ActionRequest,
    ) -> Result<ActionReceipt, Rejection> {
        self.container
            .pipeline
            .submit(&RequestContext::new(source), Some(&user.bearer()), request)
            .await
    }
}

#[derive(Clone)]
pub struct TestUser {
    pub id: UserId,
    pub key: SigningKey,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    pub fn sign(
        &self,
        action: ActionType,
        data: Value,
        timestamp: Timestamp,
        nonce: &str,
    ) -> ActionRequest {
        let mut request = ActionRequest {
            action_type: action,
            action_data: data,
            timestamp,
            nonce: nonce.to_string(),
            signature: String::new(),
        };
        request.signature = ap_03_signature_verification::sign_request(&self.key, &request, &self.id);
        request
    }
}
