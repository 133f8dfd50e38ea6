//! `Authorization` header parsing.

use shared_types::{ErrorCode, Rejection};

/// Extracts the token from `Bearer <token>`. The scheme is case-insensitive.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, Rejection> {
    let header = header.ok_or_else(|| missing("missing Authorization header"))?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| missing("malformed Authorization header"))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(missing("unsupported authorization scheme"));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(missing("empty bearer token"));
    }
    Ok(token)
}

fn missing(message: &str) -> Rejection {
    Rejection::new(ErrorCode::InvalidToken, message)
}
