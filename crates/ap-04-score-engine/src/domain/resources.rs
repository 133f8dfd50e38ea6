//! Server-held resources referenced by actions.

use serde::{Deserialize, Serialize};
use shared_types::{Timestamp, UserId};
use std::collections::HashSet;
use std::time::Duration;

/// A task that can be completed by its assignees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub assignees: HashSet<UserId>,
    /// Difficulty level, 1-based.
    pub level: u32,
    pub assigned_at: Timestamp,
    #[serde(with = "humantime_serde")]
    pub expected_duration: Duration,
}

impl Task {
    pub fn is_assigned_to(&self, user: &UserId) -> bool {
        self.assignees.contains(user)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub author: UserId,
}
