//! Client identification from request headers.
//!
//! # Responsibilities
//! - Derive the rate limit key for a request
//! - Honour `X-Forwarded-For` only when the deployment sits behind a trusted proxy
//!
//! # Design Decisions
//! - The first `X-Forwarded-For` entry is the originating client
//! - Anything the frontend sends about identity (session objects, user names)
//!   is never used as a key or trusted for authorization

use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Key used when neither a forwarded address nor a peer address is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Identify the client behind a request.
pub fn client_identifier(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(client) = forwarded {
            return client.to_string();
        }
    }

    peer.map_or_else(|| UNKNOWN_CLIENT.to_string(), |addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> Option<SocketAddr> {
        Some("192.168.1.7:52311".parse().unwrap())
    }

    #[test]
    fn test_forwarded_for_first_entry() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"));

        assert_eq!(client_identifier(&headers, peer(), true), "203.0.113.9");
    }

    #[test]
    fn test_untrusted_forwarded_for_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.9"));

        assert_eq!(client_identifier(&headers, peer(), false), "192.168.1.7");
    }

    #[test]
    fn test_falls_back_to_peer_then_unknown() {
        let headers = HeaderMap::new();
        assert_eq!(client_identifier(&headers, peer(), true), "192.168.1.7");
        assert_eq!(client_identifier(&headers, None, true), UNKNOWN_CLIENT);
    }
}
