//! Outbound ports: authoritative server-side state.

use crate::domain::resources::{Article, Task};
use async_trait::async_trait;
use shared_types::{ActionType, Rejection, Timestamp, UserId};

/// Lookup of resources that actions reference.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn task(&self, id: &str) -> Result<Option<Task>, Rejection>;

    async fn article(&self, id: &str) -> Result<Option<Article>, Rejection>;
}

/// Committed activity, as recorded by the ledger.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn has_completion(&self, user: &UserId, completion_key: &str)
        -> Result<bool, Rejection>;

    async fn last_action_at(
        &self,
        user: &UserId,
        action: ActionType,
    ) -> Result<Option<Timestamp>, Rejection>;
}
