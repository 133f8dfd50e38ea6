//! # Adapters
//!
//! In-memory `LedgerStore` with one row lock per user.
//!
//! Lock order is always user row, then scoreboard. Row locks are async and
//! park the task, not the worker thread, while contended. The scoreboard lock
//! is held only for the index update, never across an await.

use crate::domain::commit::{CommitRequest, LedgerConfig};
use crate::domain::errors::LedgerError;
use crate::ports::outbound::LedgerStore;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use shared_types::{
    duration_ms, ActionType, RankedScore, Score, ScoreTransaction, Timestamp, UserId,
    UserScoreState,
};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
struct UserRow {
    state: UserScoreState,
    history: Vec<ScoreTransaction>,
    completions: HashSet<String>,
    last_actions: HashMap<ActionType, Timestamp>,
}

impl UserRow {
    fn new(user: UserId) -> Self {
        Self {
            state: UserScoreState::empty(user),
            history: Vec::new(),
            completions: HashSet::new(),
            last_actions: HashMap::new(),
        }
    }
}

type ScoreboardKey = (Reverse<Score>, UserId);

#[derive(Debug)]
pub struct InMemoryLedgerStore {
    rows: DashMap<UserId, Arc<Mutex<UserRow>>>,
    /// Ordered by score descending, then user id.
    scoreboard: RwLock<BTreeSet<ScoreboardKey>>,
    lock_timeout: Duration,
    available: AtomicBool,
    fail_next_append: AtomicBool,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl InMemoryLedgerStore {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            rows: DashMap::new(),
            scoreboard: RwLock::new(BTreeSet::new()),
            lock_timeout: config.lock_timeout,
            available: AtomicBool::new(true),
            fail_next_append: AtomicBool::new(false),
        }
    }

    /// Simulated outage.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Fault injection: the next commit fails at the append step.
    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    /// Holds `user`'s row lock for `hold`. Lets tests provoke lock timeouts.
    pub async fn hold_row_lock(&self, user: &UserId, hold: Duration) {
        let row = self.row(user);
        let _guard = row.lock().await;
        tokio::time::sleep(hold).await;
    }

    fn ensure_available(&self) -> Result<(), LedgerError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable)
        }
    }

    // The dashmap shard guard is released before the row lock is taken.
    fn row(&self, user: &UserId) -> Arc<Mutex<UserRow>> {
        self.rows
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(UserRow::new(user.clone()))))
            .clone()
    }

    fn existing_row(&self, user: &UserId) -> Option<Arc<Mutex<UserRow>>> {
        self.rows.get(user).map(|row| row.clone())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn apply(&self, request: &CommitRequest) -> Result<ScoreTransaction, LedgerError> {
        self.ensure_available()?;
        let row = self.row(&request.user_id);
        let mut guard = tokio::time::timeout(self.lock_timeout, row.lock())
            .await
            .map_err(|_| LedgerError::ConcurrentModification {
                user: request.user_id.clone(),
                waited: self.lock_timeout,
            })?;

        if let Some(key) = &request.completion_key {
            if guard.completions.contains(key) {
                return Err(LedgerError::AlreadyCompleted { key: key.clone() });
            }
        }
        if let (Some(cooldown), Some(last)) = (
            request.cooldown,
            guard.last_actions.get(&request.action_type).copied(),
        ) {
            let ready_at = last.saturating_add(duration_ms(cooldown));
            if request.occurred_at < ready_at {
                return Err(LedgerError::CooldownActive {
                    retry_after: Duration::from_millis(ready_at - request.occurred_at),
                });
            }
        }

        // Stage.
        let score_before = guard.state.current_score;
        let score_after =
            score_before
                .checked_add(request.delta)
                .ok_or_else(|| LedgerError::Overflow {
                    user: request.user_id.clone(),
                })?;
        let transaction = ScoreTransaction {
            id: Uuid::new_v4(),
            user_id: request.user_id.clone(),
            action_type: request.action_type,
            score_before,
            score_delta: request.delta,
            score_after,
            occurred_at: request.occurred_at,
        };
        let mut next_state = guard.state.clone();
        next_state.current_score = score_after;
        next_state.last_action_at = Some(request.occurred_at);
        next_state.version += 1;

        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            warn!(user = %request.user_id, "Append failed, staged commit discarded");
            return Err(LedgerError::AppendFailed);
        }

        // Apply. Nothing below can fail.
        let first_commit = guard.state.version == 0;
        guard.history.push(transaction.clone());
        guard.state = next_state;
        if let Some(key) = &request.completion_key {
            guard.completions.insert(key.clone());
        }
        guard
            .last_actions
            .insert(request.action_type, request.occurred_at);
        {
            let mut board = self.scoreboard.write();
            if !first_commit {
                board.remove(&(Reverse(score_before), request.user_id.clone()));
            }
            board.insert((Reverse(score_after), request.user_id.clone()));
        }

        debug!(
            user = %request.user_id,
            tx = %transaction.id,
            before = score_before,
            after = score_after,
            "Transaction committed"
        );
        Ok(transaction)
    }

    async fn state(&self, user: &UserId) -> Result<Option<UserScoreState>, LedgerError> {
        self.ensure_available()?;
        let Some(row) = self.existing_row(user) else {
            return Ok(None);
        };
        let state = row.lock().await.state.clone();
        Ok(Some(state).filter(|state| state.version > 0))
    }

    async fn history(&self, user: &UserId) -> Result<Vec<ScoreTransaction>, LedgerError> {
        self.ensure_available()?;
        let Some(row) = self.existing_row(user) else {
            return Ok(Vec::new());
        };
        let history = row.lock().await.history.clone();
        Ok(history)
    }

    async fn has_completion(&self, user: &UserId, key: &str) -> Result<bool, LedgerError> {
        self.ensure_available()?;
        let Some(row) = self.existing_row(user) else {
            return Ok(false);
        };
        let done = row.lock().await.completions.contains(key);
        Ok(done)
    }

    async fn last_action_at(
        &self,
        user: &UserId,
        action: ActionType,
    ) -> Result<Option<Timestamp>, LedgerError> {
        self.ensure_available()?;
        let Some(row) = self.existing_row(user) else {
            return Ok(None);
        };
        let last = row.lock().await.last_actions.get(&action).copied();
        Ok(last)
    }

    async fn top_scores(&self, limit: usize) -> Result<Vec<RankedScore>, LedgerError> {
        self.ensure_available()?;
        let board = self.scoreboard.read();
        let mut ranked = Vec::with_capacity(limit.min(board.len()));
        let mut rank = 0u64;
        let mut previous: Option<Score> = None;
        for (position, (Reverse(score), user)) in board.iter().take(limit).enumerate() {
            if previous != Some(*score) {
                rank = position as u64 + 1;
                previous = Some(*score);
            }
            ranked.push(RankedScore {
                user_id: user.clone(),
                score: *score,
                rank,
            });
        }
        Ok(ranked)
    }

    async fn rank_of(&self, user: &UserId) -> Result<Option<u64>, LedgerError> {
        self.ensure_available()?;
        let Some(state) = self.state(user).await? else {
            return Ok(None);
        };
        let board = self.scoreboard.read();
        let ahead = board
            .iter()
            .take_while(|(Reverse(score), _)| *score > state.current_score)
            .count();
        Ok(Some(ahead as u64 + 1))
    }

    async fn ranked_users(&self) -> Result<u64, LedgerError> {
        self.ensure_available()?;
        Ok(self.scoreboard.read().len() as u64)
    }
}
