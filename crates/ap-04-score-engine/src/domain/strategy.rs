//! Per-action validation and scoring strategies.
//!
//! Each strategy parses only the fields it needs from `actionData`. Parsing
//! goes through a typed struct without `deny_unknown_fields`, so anything a
//! client adds beyond the whitelist is silently discarded.

use crate::domain::scoring::{ScoreTable, ScoringFacts};
use crate::ports::outbound::ResourceRepository;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use shared_types::{ActionType, ErrorCode, Principal, Rejection};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of resolving and authorizing the referenced resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    pub resource_key: Option<String>,
    /// The action may be performed once per (user, resource).
    pub once_per_resource: bool,
    pub facts: ScoringFacts,
}

impl ResolvedAction {
    fn unscoped() -> Self {
        Self {
            resource_key: None,
            once_per_resource: false,
            facts: ScoringFacts::default(),
        }
    }

    /// Uniqueness key the ledger records with the transaction.
    pub fn completion_key(&self, action: ActionType) -> Option<String> {
        match (&self.resource_key, self.once_per_resource) {
            (Some(key), true) => Some(format!("{}:{}", action.as_str(), key)),
            _ => None,
        }
    }
}

/// Validation and scoring rules for one action type.
#[async_trait]
pub trait ActionStrategy: Send + Sync {
    fn action_type(&self) -> ActionType;

    /// Parses the whitelisted fields, loads the resource (step 1) and checks
    /// the principal may act on it (step 2).
    async fn resolve(
        &self,
        data: &Value,
        principal: &Principal,
        resources: &dyn ResourceRepository,
    ) -> Result<ResolvedAction, Rejection>;

    /// Minimum spacing between two actions of this type by one user.
    fn cooldown(&self, table: &ScoreTable) -> Option<Duration>;
}

fn parse<T: DeserializeOwned>(data: &Value, action: ActionType) -> Result<T, Rejection> {
    T::deserialize(data).map_err(|e| {
        Rejection::invalid_request(format!("invalid actionData for {action}: {e}"))
    })
}

fn not_found(kind: &str, id: &str) -> Rejection {
    Rejection::new(ErrorCode::ResourceNotFound, format!("{kind} {id} not found"))
}

fn not_allowed(kind: &str, id: &str) -> Rejection {
    Rejection::new(
        ErrorCode::UnauthorizedResourceAccess,
        format!("not permitted to act on {kind} {id}"),
    )
}

// =============================================================================
// COMPLETE_TASK
// =============================================================================

#[derive(Deserialize)]
struct CompleteTaskData {
    #[serde(rename = "taskId")]
    task_id: String,
}

/// `COMPLETE_TASK {taskId}`: assignees only, once per task. Level multiplier
/// and speed bonus come from the stored task.
#[derive(Debug, Default)]
pub struct CompleteTaskStrategy;

#[async_trait]
impl ActionStrategy for CompleteTaskStrategy {
    fn action_type(&self) -> ActionType {
        ActionType::CompleteTask
    }

    async fn resolve(
        &self,
        data: &Value,
        principal: &Principal,
        resources: &dyn ResourceRepository,
    ) -> Result<ResolvedAction, Rejection> {
        let CompleteTaskData { task_id } = parse(data, self.action_type())?;
        let task = resources
            .task(&task_id)
            .await?
            .ok_or_else(|| not_found("task", &task_id))?;
        if !task.is_assigned_to(&principal.id) {
            return Err(not_allowed("task", &task_id));
        }
        Ok(ResolvedAction {
            resource_key: Some(format!("task:{}", task.id)),
            once_per_resource: true,
            facts: ScoringFacts {
                level: Some(task.level),
                started_at: Some(task.assigned_at),
                expected_duration: Some(task.expected_duration),
            },
        })
    }

    fn cooldown(&self, _table: &ScoreTable) -> Option<Duration> {
        None
    }
}

// =============================================================================
// DAILY_CHECK_IN
// =============================================================================

/// `DAILY_CHECK_IN {}`: no resource, one per cooldown.
#[derive(Debug, Default)]
pub struct DailyCheckInStrategy;

#[async_trait]
impl ActionStrategy for DailyCheckInStrategy {
    fn action_type(&self) -> ActionType {
        ActionType::DailyCheckIn
    }

    async fn resolve(
        &self,
        _data: &Value,
        _principal: &Principal,
        _resources: &dyn ResourceRepository,
    ) -> Result<ResolvedAction, Rejection> {
        Ok(ResolvedAction::unscoped())
    }

    fn cooldown(&self, table: &ScoreTable) -> Option<Duration> {
        Some(table.check_in_cooldown)
    }
}

// =============================================================================
// PUBLISH_ARTICLE
// =============================================================================

#[derive(Deserialize)]
struct PublishArticleData {
    #[serde(rename = "articleId")]
    article_id: String,
}

/// `PUBLISH_ARTICLE {articleId}`: author only, once per article.
#[derive(Debug, Default)]
pub struct PublishArticleStrategy;

#[async_trait]
impl ActionStrategy for PublishArticleStrategy {
    fn action_type(&self) -> ActionType {
        ActionType::PublishArticle
    }

    async fn resolve(
        &self,
        data: &Value,
        principal: &Principal,
        resources: &dyn ResourceRepository,
    ) -> Result<ResolvedAction, Rejection> {
        let PublishArticleData { article_id } = parse(data, self.action_type())?;
        let article = resources
            .article(&article_id)
            .await?
            .ok_or_else(|| not_found("article", &article_id))?;
        if article.author != principal.id {
            return Err(not_allowed("article", &article_id));
        }
        Ok(ResolvedAction {
            resource_key: Some(format!("article:{}", article.id)),
            once_per_resource: true,
            facts: ScoringFacts::default(),
        })
    }

    fn cooldown(&self, table: &ScoreTable) -> Option<Duration> {
        Some(table.publish_cooldown)
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Typed map from action type to strategy, built once at startup.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<ActionType, Arc<dyn ActionStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a strategy for every built-in action type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CompleteTaskStrategy));
        registry.register(Arc::new(DailyCheckInStrategy));
        registry.register(Arc::new(PublishArticleStrategy));
        registry
    }

    /// Replaces any strategy already registered for the same action type.
    pub fn register(&mut self, strategy: Arc<dyn ActionStrategy>) {
        self.strategies.insert(strategy.action_type(), strategy);
    }

    pub fn get(&self, action: ActionType) -> Option<&Arc<dyn ActionStrategy>> {
        self.strategies.get(&action)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<&str> = self.strategies.keys().map(|a| a.as_str()).collect();
        actions.sort_unstable();
        f.debug_struct("StrategyRegistry")
            .field("actions", &actions)
            .finish()
    }
}
