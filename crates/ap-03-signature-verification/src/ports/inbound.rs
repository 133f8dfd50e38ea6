//! Inbound port.

use async_trait::async_trait;
use shared_types::{ActionRequest, Principal, Rejection};

/// Request-integrity gate.
#[async_trait]
pub trait SignatureVerifierApi: Send + Sync {
    /// Passes only if the request is fresh, signed by the principal's session
    /// key, and carries a nonce never accepted before. On success the nonce
    /// is consumed.
    async fn verify(&self, request: &ActionRequest, principal: &Principal)
        -> Result<(), Rejection>;
}
