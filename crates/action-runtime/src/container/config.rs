//! # Pipeline Configuration
//!
//! One TOML document with a section per stage. Every field has a default,
//! so an empty file (or no file) yields a runnable development setup apart
//! from the token secret, which must always be supplied.
//!
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:8080"
//! request_timeout = "5s"
//! session_recheck = "10s"
//!
//! [rate_limit.per_user]
//! limit = 60
//! window = "1m"
//!
//! [signature]
//! max_age = "60s"
//! nonce_ttl = "5m"
//! ```
//!
//! Environment overrides, applied after the file:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `AP_CONFIG` | path of the TOML file |
//! | `AP_BIND_ADDR` | `server.bind_addr` |
//! | `AP_TOKEN_SECRET` | `auth.token_secret` (hex) |
//! | `AP_RATE_LIMIT_ENABLED` | `rate_limit.enabled` |

use ap_01_rate_limiter::RateLimitConfig;
use ap_02_auth_gate::AuthConfig;
use ap_03_signature_verification::SignatureConfig;
use ap_04_score_engine::ScoreTable;
use ap_05_ledger::LedgerConfig;
use ap_06_score_broadcast::CacheConfig;
use serde::{Deserialize, Serialize};
use shared_types::{RetryPolicy, SigningKey};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Shortest accepted credential secret, in bytes.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthSettings,
    pub signature: SignatureConfig,
    pub scoring: ScoreTable,
    pub ledger: LedgerConfig,
    pub broadcast: CacheConfig,
    pub store: StoreConfig,
    /// Bounded retry for `STORE_UNAVAILABLE` / `CONCURRENT_MODIFICATION`.
    pub retry: RetryPolicy,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
    /// Peers allowed to set `X-Forwarded-For` / `X-Real-IP`.
    pub trusted_proxies: Vec<IpAddr>,
    /// Also trust 127.0.0.1 and ::1 as proxies.
    pub trust_localhost: bool,
    /// Allowed CORS origins. `*` allows any.
    pub cors_origins: Vec<String>,
    /// How often an open score stream re-validates its credential.
    #[serde(with = "humantime_serde")]
    pub session_recheck: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
            request_timeout: Duration::from_secs(5),
            body_limit: 64 * 1024,
            trusted_proxies: Vec::new(),
            trust_localhost: true,
            cors_origins: vec!["*".to_string()],
            session_recheck: Duration::from_secs(10),
        }
    }
}

/// Credential settings plus the secret credentials are signed with.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Hex-encoded credential MAC secret.
    pub token_secret: String,
    #[serde(flatten)]
    pub gate: AuthConfig,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("token_secret", &"<redacted>")
            .field("gate", &self.gate)
            .finish()
    }
}

impl AuthSettings {
    pub fn secret(&self) -> Result<SigningKey, ConfigError> {
        let bytes = hex::decode(self.token_secret.trim())
            .map_err(|_| ConfigError::Invalid("auth.token_secret must be hex".to_string()))?;
        if bytes.len() < MIN_TOKEN_SECRET_LEN {
            return Err(ConfigError::InsecureTokenSecret);
        }
        Ok(SigningKey::new(bytes))
    }
}

/// Shared store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Deadline for one store call. Exceeding it is `STORE_UNAVAILABLE`.
    #[serde(with = "humantime_serde")]
    pub op_timeout: Duration,
    /// How often expired keys are swept.
    #[serde(with = "humantime_serde")]
    pub gc_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            op_timeout: Duration::from_millis(50),
            gc_interval: Duration::from_secs(30),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error(
        "SECURITY VIOLATION: auth.token_secret must be at least 32 bytes. \
         Set AP_TOKEN_SECRET or provide it in the config file."
    )]
    InsecureTokenSecret,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl PipelineConfig {
    /// Reads `AP_CONFIG` if set, then applies environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os("AP_CONFIG").map(PathBuf::from);
        let mut config = Self::load(path.as_deref())?;
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Parses the file at `path`, or returns defaults when there is none.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `AP_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("AP_BIND_ADDR") {
            self.server.bind_addr = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "AP_BIND_ADDR",
                value,
            })?;
        }
        if let Some(value) = lookup("AP_TOKEN_SECRET") {
            self.auth.token_secret = value;
        }
        if let Some(value) = lookup("AP_RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "AP_RATE_LIMIT_ENABLED",
                        value,
                    })
                }
            };
        }
        Ok(())
    }

    /// Rejects configurations the pipeline cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.secret()?;
        if self.auth.gate.token_ttl.is_zero() {
            return Err(ConfigError::Invalid("auth.token_ttl must be > 0".to_string()));
        }
        if self.server.body_limit == 0 {
            return Err(ConfigError::Invalid("server.body_limit must be > 0".to_string()));
        }
        if self.server.request_timeout.is_zero() || self.server.session_recheck.is_zero() {
            return Err(ConfigError::Invalid(
                "server.request_timeout and server.session_recheck must be > 0".to_string(),
            ));
        }
        if self.store.op_timeout.is_zero() || self.store.gc_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "store.op_timeout and store.gc_interval must be > 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be >= 1".to_string()));
        }
        self.rate_limit.validate().map_err(ConfigError::Invalid)?;
        self.signature.validate().map_err(ConfigError::Invalid)?;
        self.scoring.validate().map_err(ConfigError::Invalid)?;
        self.ledger.validate().map_err(ConfigError::Invalid)?;
        self.broadcast.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}
