//! Client identifier extraction for inbound requests.

use axum::http::{HeaderMap, HeaderName};
use std::net::SocketAddr;

/// Decides which client a request is counted against.
pub trait ClientIdentity: Send + Sync {
    fn identify(&self, headers: &HeaderMap, peer: SocketAddr) -> String;
}

/// Uses the first address in a forwarding header, falling back to the
/// peer IP (without port) when the header is missing, blank or not UTF-8.
#[derive(Debug, Clone)]
pub struct ForwardedOrPeer {
    header: HeaderName,
}

impl ForwardedOrPeer {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl Default for ForwardedOrPeer {
    fn default() -> Self {
        Self::new(HeaderName::from_static("x-forwarded-for"))
    }
}

impl ClientIdentity for ForwardedOrPeer {
    fn identify(&self, headers: &HeaderMap, peer: SocketAddr) -> String {
        headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            // "client, proxy1, proxy2": the client is leftmost
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|client| !client.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| peer.ip().to_string())
    }
}
