//! Inbound port.

use async_trait::async_trait;
use shared_types::{Permission, Principal, Rejection};

#[async_trait]
pub trait AuthGateApi: Send + Sync {
    /// Validates the bearer credential and loads the principal.
    ///
    /// Fails with `INVALID_TOKEN` or `TOKEN_EXPIRED`.
    async fn authenticate(&self, token: &str) -> Result<Principal, Rejection>;

    /// Pure set membership. Fails with `FORBIDDEN`.
    fn authorize(&self, principal: &Principal, permission: Permission) -> Result<(), Rejection>;
}
