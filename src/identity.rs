//! Client identity resolution for rate limiting.

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};
use std::net::SocketAddr;

/// Header set by proxies to carry the originating client address.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Identity used when neither a header nor a peer address is available.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the rate limiting key for a request.
///
/// Prefers the first entry of `X-Forwarded-For` and falls back to the peer
/// address with its port stripped. Never fails: a peer string that is not a
/// socket address is returned as-is.
pub fn client_identity(headers: &HeaderMap, peer: Option<&str>) -> String {
    if let Some(forwarded) = forwarded_client(headers) {
        return forwarded.to_string();
    }

    match peer {
        Some(addr) => strip_port(addr),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

/// [`client_identity`] for a request, using the peer address axum records in
/// its `ConnectInfo` extension when the server runs with connect info.
pub fn request_identity<B>(request: &Request<B>) -> String {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string());
    client_identity(request.headers(), peer.as_deref())
}

fn forwarded_client(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
}

fn strip_port(addr: &str) -> String {
    addr.parse::<SocketAddr>()
        .map(|socket| socket.ip().to_string())
        .unwrap_or_else(|_| addr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_forwarded_for_first_entry_wins() {
        let headers = forwarded("192.168.1.1, 10.0.0.1");
        assert_eq!(client_identity(&headers, Some("127.0.0.1:4000")), "192.168.1.1");
    }

    #[test]
    fn test_forwarded_for_is_trimmed() {
        let headers = forwarded("   203.0.113.7   ");
        assert_eq!(client_identity(&headers, None), "203.0.113.7");
    }

    #[test]
    fn test_empty_forwarded_for_falls_back_to_peer() {
        let headers = forwarded(" , 10.0.0.1");
        assert_eq!(client_identity(&headers, Some("127.0.0.1:4000")), "127.0.0.1");

        let headers = forwarded("");
        assert_eq!(client_identity(&headers, Some("127.0.0.1:4000")), "127.0.0.1");
    }

    #[test]
    fn test_peer_port_is_stripped() {
        let headers = HeaderMap::new();
        assert_eq!(client_identity(&headers, Some("198.51.100.4:51234")), "198.51.100.4");
        assert_eq!(client_identity(&headers, Some("[::1]:8080")), "::1");
    }

    #[test]
    fn test_malformed_peer_is_used_verbatim() {
        let headers = HeaderMap::new();
        assert_eq!(client_identity(&headers, Some("10.0.0.9")), "10.0.0.9");
        assert_eq!(client_identity(&headers, Some("not an address")), "not an address");
    }

    #[test]
    fn test_no_peer_and_no_header() {
        assert_eq!(client_identity(&HeaderMap::new(), None), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_request_identity_prefers_forwarded_header() {
        let mut request = Request::new(());
        request.headers_mut().insert(
            FORWARDED_FOR,
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        assert_eq!(request_identity(&request), "192.168.1.1");
    }

    #[test]
    fn test_request_identity_from_connect_info() {
        let mut request = Request::new(());
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 1], 55000))));

        assert_eq!(request_identity(&request), "203.0.113.1");
    }

    #[test]
    fn test_request_identity_without_connect_info() {
        assert_eq!(request_identity(&Request::new(())), UNKNOWN_CLIENT);
    }
}
