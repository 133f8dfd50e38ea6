//! # HMAC Primitives
//!
//! The one HMAC-SHA256 implementation used by both the bearer credential and
//! the per-request signature.
//!
//! ## Security Properties
//!
//! - **Constant-Time Verification**: `verify_hex` goes through `Mac::verify_slice`.
//! - **Redacted Keys**: `SigningKey` never prints its bytes in `Debug` output.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

pub type HmacSha256 = Hmac<Sha256>;

/// Secret key material. Cloning is cheap enough for per-request use.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey([REDACTED; {}])", self.0.len())
    }
}

// HMAC accepts keys of any length; `None` is unreachable in practice.
fn mac_for(key: &[u8], message: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(message);
    Some(mac)
}

/// Lowercase hex HMAC-SHA256 of `message` under `key`.
pub fn sign_hex(key: &SigningKey, message: &[u8]) -> String {
    mac_for(key.as_bytes(), message)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Verifies a hex signature in constant time. Malformed hex is simply invalid.
pub fn verify_hex(key: &SigningKey, message: &[u8], signature_hex: &str) -> bool {
    let Ok(supplied) = hex::decode(signature_hex) else {
        return false;
    };
    mac_for(key.as_bytes(), message)
        .is_some_and(|mac| mac.verify_slice(&supplied).is_ok())
}
