//! # Auth Gate Subsystem (AP-02)
//!
//! Turns a bearer credential into a [`Principal`](shared_types::Principal)
//! and answers coarse permission questions. Fine-grained, resource-level
//! checks belong to the score engine, not here.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Credential format, claims, bearer parsing
//! - **Ports Layer** (`ports/`): `AuthGateApi` (inbound), `SessionDirectory`
//!   and `RevocationList` (outbound)
//! - **Adapters** (`adapters/`): In-memory session directory, store-backed
//!   revocation set
//! - **Service Layer** (`service.rs`): `AuthGate`
//!
//! ## Checks, in order
//!
//! 1. Credential MAC (constant-time) and claims shape → `INVALID_TOKEN`
//! 2. Expiry → `TOKEN_EXPIRED`
//! 3. Session revoked, unknown, or owned by someone else → `INVALID_TOKEN`
//! 4. Permission set loaded from role + session grants
//!
//! `authorize` is pure set membership → `FORBIDDEN`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemorySessionDirectory, KvRevocationList};
pub use domain::bearer::parse_bearer;
pub use domain::token::{AuthConfig, TokenClaims, TokenCodec, TokenError};
pub use ports::inbound::AuthGateApi;
pub use ports::outbound::{RevocationList, SessionDirectory, SessionRecord};
pub use service::AuthGate;
