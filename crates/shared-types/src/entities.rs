//! # Core Domain Entities
//!
//! Identity, request, and ledger types that flow through the pipeline.
//! Wire-facing types serialize with camelCase field names.

use crate::security::SigningKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Unix timestamp in milliseconds.
pub type Timestamp = u64;

/// Score points. Signed so a penalty could be modeled, but awards are never negative.
pub type Score = i64;

// =============================================================================
// IDENTITY
// =============================================================================

/// Stable identifier of an end user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one login session. Revocation works at this granularity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coarse role carried in the bearer credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Permissions every principal of this role holds.
    pub fn default_permissions(&self) -> HashSet<Permission> {
        let mut set = HashSet::from([
            Permission::SubmitAction,
            Permission::ViewLeaderboard,
            Permission::ViewOwnScore,
        ]);
        match self {
            Role::User => {}
            Role::Moderator => {
                set.insert(Permission::ViewAnyScore);
            }
            Role::Admin => {
                set.insert(Permission::ViewAnyScore);
                set.insert(Permission::ManageSessions);
            }
        }
        set
    }
}

/// Fine-grained permission checked by the auth gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    SubmitAction,
    ViewLeaderboard,
    ViewOwnScore,
    ViewAnyScore,
    ManageSessions,
}

/// Authenticated identity produced by the auth gate.
///
/// The `signing_key` is the per-session secret used only to verify request
/// signatures; it is never the long-lived credential.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
    pub permissions: HashSet<Permission>,
    pub session_id: SessionId,
    pub signing_key: SigningKey,
}

impl Principal {
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Closed set of action kinds. Adding one means adding a variant here and
/// registering a strategy for it in the score engine.
///
/// Serialized through its wire name so it also works as a map key in
/// configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ActionType {
    CompleteTask,
    DailyCheckIn,
    PublishArticle,
}

impl ActionType {
    pub const ALL: [ActionType; 3] = [
        ActionType::CompleteTask,
        ActionType::DailyCheckIn,
        ActionType::PublishArticle,
    ];

    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CompleteTask => "COMPLETE_TASK",
            ActionType::DailyCheckIn => "DAILY_CHECK_IN",
            ActionType::PublishArticle => "PUBLISH_ARTICLE",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action type: {0}")]
pub struct UnknownActionType(pub String);

impl FromStr for ActionType {
    type Err = UnknownActionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownActionType(s.to_string()))
    }
}

impl TryFrom<String> for ActionType {
    type Error = UnknownActionType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActionType> for &'static str {
    fn from(action: ActionType) -> Self {
        action.as_str()
    }
}

/// Client-submitted action. Lives only for the duration of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action_type: ActionType,
    /// Opaque payload interpreted by the score engine strategy.
    #[serde(default)]
    pub action_data: serde_json::Value,
    /// Client clock, Unix milliseconds.
    pub timestamp: Timestamp,
    pub nonce: String,
    /// Lowercase hex HMAC-SHA256 over the canonical message.
    pub signature: String,
}

// =============================================================================
// LEDGER
// =============================================================================

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreTransaction {
    pub id: Uuid,
    pub user_id: UserId,
    pub action_type: ActionType,
    pub score_before: Score,
    pub score_delta: Score,
    pub score_after: Score,
    pub occurred_at: Timestamp,
}

impl ScoreTransaction {
    /// `score_after == score_before + score_delta` without overflow.
    pub fn is_balanced(&self) -> bool {
        self.score_before.checked_add(self.score_delta) == Some(self.score_after)
    }
}

/// Mutable per-user aggregate. Rank is derived on read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScoreState {
    pub user_id: UserId,
    pub current_score: Score,
    pub last_action_at: Option<Timestamp>,
    /// Bumped on every committed transaction.
    pub version: u64,
}

impl UserScoreState {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            current_score: 0,
            last_action_at: None,
            version: 0,
        }
    }
}

/// Leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedScore {
    pub user_id: UserId,
    pub score: Score,
    /// 1-based.
    pub rank: u64,
}

/// Successful pipeline response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReceipt {
    pub score_awarded: Score,
    pub new_total_score: Score,
    pub new_rank: u64,
    pub transaction_id: Uuid,
}
