//! Client source identity for the per-source rate limit.
//!
//! Forwarded headers are only honored when the direct peer is a trusted
//! proxy; anyone else could set them to rotate through source identities.

use axum::http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedProxies {
    pub proxies: Vec<IpAddr>,
    /// Trust 127.0.0.1 and ::1.
    pub trust_localhost: bool,
}

impl TrustedProxies {
    pub fn new(proxies: Vec<IpAddr>, trust_localhost: bool) -> Self {
        Self {
            proxies,
            trust_localhost,
        }
    }

    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        self.proxies.contains(&ip) || (self.trust_localhost && ip.is_loopback())
    }

    /// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
    /// Without connection info the peer is taken to be localhost.
    pub fn client_ip(&self, headers: &HeaderMap, direct: Option<IpAddr>) -> IpAddr {
        let direct = direct.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));

        if !self.is_trusted(direct) {
            if let Some(forwarded) = headers.get("x-forwarded-for") {
                warn!(
                    direct_ip = %direct,
                    forwarded = ?forwarded,
                    "Ignoring X-Forwarded-For from untrusted source"
                );
            }
            return direct;
        }

        let forwarded = header_str(headers, "x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            debug!(extracted_ip = %ip, "Client IP from X-Forwarded-For");
            return ip;
        }

        header_str(headers, "x-real-ip")
            .and_then(|value| value.trim().parse::<IpAddr>().ok())
            .unwrap_or(direct)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
