//! # Signature Verifier Service
//!
//! Implements `SignatureVerifierApi`.

use crate::domain::canonical::canonical_message;
use crate::domain::freshness::{check_freshness, validate_nonce, SignatureConfig};
use crate::ports::inbound::SignatureVerifierApi;
use crate::ports::outbound::NonceStore;
use async_trait::async_trait;
use shared_types::{
    retry_transient, verify_hex, ActionRequest, ErrorCode, Principal, Rejection, RetryPolicy,
    SharedClock,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SignatureVerifier {
    config: SignatureConfig,
    nonces: Arc<dyn NonceStore>,
    clock: SharedClock,
    retry: RetryPolicy,
}

impl SignatureVerifier {
    pub fn new(config: SignatureConfig, nonces: Arc<dyn NonceStore>, clock: SharedClock) -> Self {
        Self {
            config,
            nonces,
            clock,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &SignatureConfig {
        &self.config
    }

    async fn nonce_seen(&self, nonce: &str, now: u64) -> Result<bool, Rejection> {
        retry_transient(&self.retry, "signature.nonce_seen", || {
            self.nonces.seen(nonce, now)
        })
        .await
    }
}

fn replay() -> Rejection {
    Rejection::new(ErrorCode::ReplayAttack, "nonce already used")
}

#[async_trait]
impl SignatureVerifierApi for SignatureVerifier {
    async fn verify(
        &self,
        request: &ActionRequest,
        principal: &Principal,
    ) -> Result<(), Rejection> {
        let now = self.clock.now();
        let message = canonical_message(request, &principal.id);
        let signed = verify_hex(&principal.signing_key, message.as_bytes(), &request.signature);

        // 1. Freshness. A signed stale request whose nonce is still recorded
        // classifies as replay; unsigned ones never reach the nonce store.
        if let Err(stale) = check_freshness(request.timestamp, now, &self.config) {
            if signed
                && validate_nonce(&request.nonce).is_ok()
                && self.nonce_seen(&request.nonce, now).await?
            {
                warn!(user = %principal.id, nonce = %request.nonce, "Stale replay");
                return Err(replay());
            }
            debug!(user = %principal.id, timestamp = request.timestamp, now, "Stale request");
            return Err(stale);
        }

        // 2. Nonce.
        validate_nonce(&request.nonce)?;
        if self.nonce_seen(&request.nonce, now).await? {
            warn!(user = %principal.id, nonce = %request.nonce, "Replay rejected");
            return Err(replay());
        }

        // 3. Signature.
        if !signed {
            warn!(user = %principal.id, "Signature mismatch");
            return Err(Rejection::new(
                ErrorCode::InvalidSignature,
                "signature does not match request",
            ));
        }

        // 4. Consume the nonce. Losing this race means a concurrent duplicate won.
        let inserted = retry_transient(&self.retry, "signature.nonce_record", || {
            self.nonces.record(&request.nonce, self.config.nonce_ttl, now)
        })
        .await?;
        if !inserted {
            warn!(user = %principal.id, nonce = %request.nonce, "Concurrent replay rejected");
            return Err(replay());
        }
        Ok(())
    }
}
