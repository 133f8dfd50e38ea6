//! Score table and scoring arithmetic.

use serde::{Deserialize, Serialize};
use shared_types::{duration_ms, ActionType, Score, Timestamp};
use std::collections::HashMap;
use std::time::Duration;

/// Static scoring configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    /// Base points per action type.
    pub base_points: HashMap<ActionType, Score>,
    /// Extra percent of base per task level above 1.
    pub level_step_percent: u32,
    /// Levels above this do not increase the multiplier.
    pub max_level: u32,
    /// Bonus percent when a task is completed within its expected duration.
    pub speed_bonus_percent: u32,
    #[serde(with = "humantime_serde")]
    pub check_in_cooldown: Duration,
    #[serde(with = "humantime_serde")]
    pub publish_cooldown: Duration,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            base_points: HashMap::from([
                (ActionType::CompleteTask, 10),
                (ActionType::DailyCheckIn, 5),
                (ActionType::PublishArticle, 20),
            ]),
            level_step_percent: 10,
            max_level: 10,
            speed_bonus_percent: 25,
            check_in_cooldown: Duration::from_secs(24 * 60 * 60),
            publish_cooldown: Duration::from_secs(10 * 60),
        }
    }
}

impl ScoreTable {
    pub fn base(&self, action: ActionType) -> Score {
        self.base_points.get(&action).copied().unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), String> {
        for action in ActionType::ALL {
            match self.base_points.get(&action) {
                None => return Err(format!("scoring.base_points missing {action}")),
                Some(points) if *points < 0 => {
                    return Err(format!("scoring.base_points[{action}] must be >= 0"))
                }
                Some(_) => {}
            }
        }
        if self.max_level == 0 {
            return Err("scoring.max_level must be >= 1".to_string());
        }
        Ok(())
    }

    /// Percent applied to base for a task of `level`, clamped to `1..=max_level`.
    pub fn level_multiplier_percent(&self, level: u32) -> i64 {
        let level = level.clamp(1, self.max_level.max(1));
        100 + i64::from(self.level_step_percent) * i64::from(level - 1)
    }
}

/// Server-held facts a strategy scores from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoringFacts {
    pub level: Option<u32>,
    pub started_at: Option<Timestamp>,
    pub expected_duration: Option<Duration>,
}

impl ScoringFacts {
    /// Completed within the expected duration, measured from server time.
    pub fn within_expected_duration(&self, now: Timestamp) -> bool {
        match (self.started_at, self.expected_duration) {
            (Some(start), Some(expected)) => {
                now >= start && now - start <= duration_ms(expected)
            }
            _ => false,
        }
    }
}

/// Result of a successful evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreAward {
    pub action_type: ActionType,
    /// Never negative.
    pub delta: Score,
    /// `task:{id}` / `article:{id}`, if the action references a resource.
    pub resource_key: Option<String>,
    /// Set for once-per-resource actions; the ledger records it atomically
    /// with the transaction.
    pub completion_key: Option<String>,
    /// Re-checked by the ledger under the user's row lock.
    pub cooldown: Option<Duration>,
}

/// `base * level% (+ speed bonus%)`, integer arithmetic, floored at zero.
pub fn compute_delta(
    table: &ScoreTable,
    action: ActionType,
    facts: &ScoringFacts,
    now: Timestamp,
) -> Score {
    let base = table.base(action);
    let scaled = match facts.level {
        Some(level) => base.saturating_mul(table.level_multiplier_percent(level)) / 100,
        None => base,
    };
    let bonus = if facts.within_expected_duration(now) {
        scaled.saturating_mul(i64::from(table.speed_bonus_percent)) / 100
    } else {
        0
    };
    scaled.saturating_add(bonus).max(0)
}
