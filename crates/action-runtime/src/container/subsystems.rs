//! # Pipeline Container
//!
//! Builds every stage in dependency order and holds them for the lifetime
//! of the process:
//!
//! ```text
//! Level 0: clock, shared store (timed), ledger store, event bus
//! Level 1: rate limiter, auth gate, signature verifier, ledger
//! Level 2: score engine (reads ledger activity), score cache, leaderboard
//! Level 3: action pipeline
//! ```

use super::config::{ConfigError, PipelineConfig};
use crate::adapters::{LedgerActivity, LedgerRanking};
use crate::pipeline::{ActionPipeline, PipelineStages};
use ap_01_rate_limiter::{DefaultReputationPolicy, InMemoryReputationSource, RateLimiter};
use ap_02_auth_gate::{AuthGate, InMemorySessionDirectory, KvRevocationList, SessionRecord};
use ap_03_signature_verification::{KvNonceStore, SignatureVerifier};
use ap_04_score_engine::{InMemoryResourceRepository, ScoreEngine, StrategyRegistry};
use ap_05_ledger::{InMemoryLedgerStore, TransactionalLedger};
use ap_06_score_broadcast::{
    CacheInvalidator, KvScoreCache, LeaderboardService, ScoreBroadcaster,
};
use shared_bus::InMemoryEventBus;
use shared_store::{InMemoryStore, KeyValueStore, TimedStore};
use shared_types::{Role, SessionId, SharedClock, SigningKey, UserId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct PipelineContainer {
    pub config: PipelineConfig,
    pub clock: SharedClock,

    // Level 0
    /// Backing store, kept for GC and outage simulation.
    pub kv: Arc<InMemoryStore>,
    /// The same store behind per-call timeouts. Every stage uses this one.
    pub store: Arc<dyn KeyValueStore>,
    pub ledger_store: Arc<InMemoryLedgerStore>,
    pub bus: Arc<InMemoryEventBus>,

    // Directories the identity side and the task/article services feed
    pub sessions: Arc<InMemorySessionDirectory>,
    pub reputation: Arc<InMemoryReputationSource>,
    pub resources: Arc<InMemoryResourceRepository>,

    // Level 1-2
    pub rate_limiter: Arc<RateLimiter>,
    pub auth: Arc<AuthGate>,
    pub signatures: Arc<SignatureVerifier>,
    pub engine: Arc<ScoreEngine>,
    pub ledger: Arc<TransactionalLedger>,
    pub cache: Arc<KvScoreCache>,
    pub leaderboard: Arc<LeaderboardService>,

    // Level 3
    pub pipeline: Arc<ActionPipeline>,
}

impl PipelineContainer {
    /// Validates `config` and wires every stage to in-process adapters.
    pub fn build(config: &PipelineConfig, clock: SharedClock) -> Result<Self, ConfigError> {
        config.validate()?;
        let retry = config.retry.clone();

        let kv = Arc::new(InMemoryStore::new());
        let store: Arc<dyn KeyValueStore> =
            Arc::new(TimedStore::new(kv.clone(), config.store.op_timeout));
        let ledger_store = Arc::new(InMemoryLedgerStore::new(config.ledger.clone()));
        let bus = Arc::new(InMemoryEventBus::new());

        let sessions = Arc::new(InMemorySessionDirectory::new());
        let reputation = Arc::new(InMemoryReputationSource::new());
        let resources = Arc::new(InMemoryResourceRepository::new());

        let rate_limiter = Arc::new(
            RateLimiter::new(
                config.rate_limit.clone(),
                store.clone(),
                reputation.clone(),
                Arc::new(DefaultReputationPolicy),
                clock.clone(),
            )
            .with_retry_policy(retry.clone()),
        );
        let auth = Arc::new(
            AuthGate::new(
                config.auth.secret()?,
                config.auth.gate.clone(),
                sessions.clone(),
                Arc::new(KvRevocationList::new(store.clone())),
                clock.clone(),
            )
            .with_retry_policy(retry.clone()),
        );
        let signatures = Arc::new(
            SignatureVerifier::new(
                config.signature.clone(),
                Arc::new(KvNonceStore::new(store.clone())),
                clock.clone(),
            )
            .with_retry_policy(retry.clone()),
        );
        let ledger =
            Arc::new(TransactionalLedger::new(ledger_store.clone()).with_retry_policy(retry.clone()));
        let engine = Arc::new(
            ScoreEngine::new(
                StrategyRegistry::with_defaults(),
                config.scoring.clone(),
                resources.clone(),
                Arc::new(LedgerActivity::new(ledger_store.clone())),
                clock.clone(),
            )
            .with_retry_policy(retry),
        );
        let cache = Arc::new(KvScoreCache::new(
            store.clone(),
            config.broadcast.clone(),
            clock.clone(),
        ));
        let leaderboard = Arc::new(LeaderboardService::new(
            cache.clone(),
            Arc::new(LedgerRanking::new(ledger.clone())),
            config.broadcast.leaderboard_size,
        ));

        let pipeline = Arc::new(ActionPipeline::new(PipelineStages {
            rate_limiter: rate_limiter.clone(),
            reputation: reputation.clone(),
            auth: auth.clone(),
            signatures: signatures.clone(),
            engine: engine.clone(),
            ledger: ledger.clone(),
            invalidator: CacheInvalidator::new(cache.clone()),
            broadcaster: ScoreBroadcaster::new(bus.clone()),
            audit: bus.clone(),
            clock: clock.clone(),
        }));

        info!(
            bind_addr = %config.server.bind_addr,
            rate_limits = config.rate_limit.enabled,
            "Pipeline container built"
        );
        Ok(Self {
            config: config.clone(),
            clock,
            kv,
            store,
            ledger_store,
            bus,
            sessions,
            reputation,
            resources,
            rate_limiter,
            auth,
            signatures,
            engine,
            ledger,
            cache,
            leaderboard,
            pipeline,
        })
    }

    /// A fresh set of stage handles over this container's services.
    pub fn stages(&self) -> PipelineStages {
        PipelineStages {
            rate_limiter: self.rate_limiter.clone(),
            reputation: self.reputation.clone(),
            auth: self.auth.clone(),
            signatures: self.signatures.clone(),
            engine: self.engine.clone(),
            ledger: self.ledger.clone(),
            invalidator: CacheInvalidator::new(self.cache.clone()),
            broadcaster: ScoreBroadcaster::new(self.bus.clone()),
            audit: self.bus.clone(),
            clock: self.clock.clone(),
        }
    }

    /// Registers a session with the directory and issues its credential.
    /// Stands in for the identity provider's login flow.
    pub fn open_session(
        &self,
        user: &UserId,
        session_id: &SessionId,
        role: Role,
        signing_key: SigningKey,
    ) -> String {
        self.sessions.open_session(
            session_id.clone(),
            SessionRecord {
                user_id: user.clone(),
                signing_key,
                extra_permissions: HashSet::new(),
                expires_at: None,
            },
        );
        self.reputation.register_account(user, self.clock.now());
        self.auth.issue_token(user, session_id, role)
    }

    /// Periodically drops expired keys from the shared store until
    /// `shutdown` flips to true.
    pub fn spawn_store_gc(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let kv = self.kv.clone();
        let clock = self.clock.clone();
        let period = self.config.store.gc_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = kv.purge_expired(clock.now());
                        debug!(removed, remaining = kv.len(), "Store GC pass");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Store GC stopped");
        })
    }
}
