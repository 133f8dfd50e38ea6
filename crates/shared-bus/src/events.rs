//! # Pipeline Events
//!
//! Event types that flow through the shared bus, and the topic model
//! subscribers filter on.

use serde::{Deserialize, Serialize};
use shared_types::{ActionType, ErrorCode, Gate, Score, Timestamp, UserId};

/// Broadcast payload after a committed score change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub user_id: UserId,
    pub new_score: Score,
    pub score_change: Score,
    pub new_rank: u64,
    pub timestamp: Timestamp,
}

/// Fraud-audit record of one rejected action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectionNotice {
    /// Absent when rejected before authentication.
    pub user_id: Option<UserId>,
    pub source: String,
    pub action_type: Option<ActionType>,
    pub code: ErrorCode,
    pub gate: Gate,
    pub timestamp: Timestamp,
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineEvent {
    /// A score change was committed to the ledger.
    ScoreUpdated(ScoreUpdate),

    /// An action was rejected by one of the gates.
    ActionRejected(RejectionNotice),
}

impl PipelineEvent {
    /// Topics this event is delivered on.
    #[must_use]
    pub fn topics(&self) -> Vec<EventTopic> {
        match self {
            PipelineEvent::ScoreUpdated(update) => vec![
                EventTopic::Leaderboard,
                EventTopic::User(update.user_id.clone()),
            ],
            PipelineEvent::ActionRejected(_) => vec![EventTopic::FraudAudit],
        }
    }

    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::ScoreUpdated(_) => "score_updated",
            PipelineEvent::ActionRejected(_) => "action_rejected",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Global leaderboard feed: every score change.
    Leaderboard,
    /// Per-user feed.
    User(UserId),
    /// Rejections, for fraud analysis consumers.
    FraudAudit,
}

/// Filter for subscribing to specific events. No topics means everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    #[must_use]
    pub fn leaderboard() -> Self {
        Self::topics(vec![EventTopic::Leaderboard])
    }

    #[must_use]
    pub fn user(user_id: UserId) -> Self {
        Self::topics(vec![EventTopic::User(user_id)])
    }

    #[must_use]
    pub fn fraud_audit() -> Self {
        Self::topics(vec![EventTopic::FraudAudit])
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &PipelineEvent) -> bool {
        if self.topics.is_empty() {
            return true;
        }
        event
            .topics()
            .iter()
            .any(|topic| self.topics.contains(topic))
    }
}
