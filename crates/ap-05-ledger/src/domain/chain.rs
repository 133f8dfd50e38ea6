//! Ledger consistency checks.

use crate::domain::errors::ChainViolation;
use shared_types::{Score, ScoreTransaction, UserScoreState};

/// Score reached by replaying `history` from zero. `None` on overflow.
pub fn replay_score(history: &[ScoreTransaction]) -> Option<Score> {
    history
        .iter()
        .try_fold(0i64, |score, tx| score.checked_add(tx.score_delta))
}

/// Checks that every row balances, each row continues from the previous
/// one, and the chain ends at `state.current_score`.
pub fn verify_chain(
    state: &UserScoreState,
    history: &[ScoreTransaction],
) -> Result<(), ChainViolation> {
    let mut expected_before = 0;
    for (index, tx) in history.iter().enumerate() {
        if tx.user_id != state.user_id {
            return Err(ChainViolation::ForeignUser { index });
        }
        if !tx.is_balanced() {
            return Err(ChainViolation::Unbalanced { index });
        }
        if tx.score_before != expected_before {
            return Err(ChainViolation::Broken { index });
        }
        expected_before = tx.score_after;
    }
    if expected_before != state.current_score {
        return Err(ChainViolation::ScoreMismatch {
            replayed: expected_before,
            current: state.current_score,
        });
    }
    Ok(())
}
