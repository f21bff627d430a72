//! Header filtering and response relay.

use axum::{
    body::Body,
    http::{HeaderMap, header::HOST},
    response::Response,
};

use super::ProxyError;

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Check if a header is hop-by-hop and must not cross the proxy.
///
/// `Upgrade` is among them, so protocol upgrades such as WebSocket watches
/// are never negotiated through a backend route.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Headers to send upstream: everything except hop-by-hop headers and `Host`.
pub fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if name == HOST || is_hop_by_hop(name.as_str()) {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

/// Copy an upstream response to the client: status, end-to-end headers,
/// and the body as a stream.
pub fn relay_response(upstream: reqwest::Response) -> Result<Response, ProxyError> {
    let mut builder = Response::builder().status(upstream.status());
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in upstream.headers() {
            if !is_hop_by_hop(name.as_str()) {
                headers.append(name.clone(), value.clone());
            }
        }
    }

    builder
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ProxyError::Response(e.to_string()))
}
