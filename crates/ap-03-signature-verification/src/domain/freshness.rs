//! Freshness window and nonce format.

use serde::{Deserialize, Serialize};
use shared_types::{duration_ms, ErrorCode, Rejection, Timestamp};
use std::time::Duration;

pub const MIN_NONCE_LEN: usize = 8;
pub const MAX_NONCE_LEN: usize = 128;

/// Signature gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// How old a request timestamp may be.
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
    /// How far ahead of the server clock a request timestamp may be.
    #[serde(with = "humantime_serde")]
    pub max_future_skew: Duration,
    /// Nonce record lifetime. Must cover the whole freshness window.
    #[serde(with = "humantime_serde")]
    pub nonce_ttl: Duration,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(60),
            max_future_skew: Duration::from_secs(5),
            nonce_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl SignatureConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_age.is_zero() {
            return Err("signature.max_age must be > 0".to_string());
        }
        if self.nonce_ttl < self.max_age + self.max_future_skew {
            return Err(format!(
                "signature.nonce_ttl ({:?}) must be >= max_age + max_future_skew ({:?})",
                self.nonce_ttl,
                self.max_age + self.max_future_skew
            ));
        }
        Ok(())
    }
}

/// `now - max_age <= timestamp <= now + max_future_skew`.
pub fn check_freshness(
    timestamp: Timestamp,
    now: Timestamp,
    config: &SignatureConfig,
) -> Result<(), Rejection> {
    if now.saturating_sub(timestamp) > duration_ms(config.max_age) {
        return Err(Rejection::new(ErrorCode::StaleRequest, "request timestamp too old"));
    }
    if timestamp.saturating_sub(now) > duration_ms(config.max_future_skew) {
        return Err(Rejection::new(
            ErrorCode::StaleRequest,
            "request timestamp in the future",
        ));
    }
    Ok(())
}

/// 8 to 128 visible ASCII characters, no `|` (the message separator).
pub fn validate_nonce(nonce: &str) -> Result<(), Rejection> {
    let well_formed = (MIN_NONCE_LEN..=MAX_NONCE_LEN).contains(&nonce.len())
        && nonce.bytes().all(|b| b.is_ascii_graphic() && b != b'|');
    if well_formed {
        Ok(())
    } else {
        Err(Rejection::new(ErrorCode::InvalidSignature, "malformed nonce"))
    }
}
