//! # Adapters
//!
//! In-memory repositories for tests and single-process deployments.

use crate::domain::resources::{Article, Task};
use crate::ports::outbound::{ActivityRepository, ResourceRepository};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use shared_types::{ActionType, Rejection, Timestamp, UserId};

#[derive(Debug, Default)]
pub struct InMemoryResourceRepository {
    tasks: DashMap<String, Task>,
    articles: DashMap<String, Article>,
}

impl InMemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&self, task: Task) {
        self.tasks.insert(task.id.clone(), task);
    }

    pub fn add_article(&self, article: Article) {
        self.articles.insert(article.id.clone(), article);
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn task(&self, id: &str) -> Result<Option<Task>, Rejection> {
        Ok(self.tasks.get(id).map(|t| t.clone()))
    }

    async fn article(&self, id: &str) -> Result<Option<Article>, Rejection> {
        Ok(self.articles.get(id).map(|a| a.clone()))
    }
}

/// Activity history kept outside a ledger. Used where the engine runs alone.
#[derive(Debug, Default)]
pub struct InMemoryActivityRepository {
    completions: DashSet<(UserId, String)>,
    last_actions: DashMap<(UserId, ActionType), Timestamp>,
}

impl InMemoryActivityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        user: &UserId,
        action: ActionType,
        completion_key: Option<&str>,
        at: Timestamp,
    ) {
        if let Some(key) = completion_key {
            self.completions.insert((user.clone(), key.to_string()));
        }
        self.last_actions.insert((user.clone(), action), at);
    }
}

#[async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn has_completion(
        &self,
        user: &UserId,
        completion_key: &str,
    ) -> Result<bool, Rejection> {
        Ok(self
            .completions
            .contains(&(user.clone(), completion_key.to_string())))
    }

    async fn last_action_at(
        &self,
        user: &UserId,
        action: ActionType,
    ) -> Result<Option<Timestamp>, Rejection> {
        Ok(self
            .last_actions
            .get(&(user.clone(), action))
            .map(|at| *at))
    }
}
