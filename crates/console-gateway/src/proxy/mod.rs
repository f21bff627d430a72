//! Forwarding to backend services.
//!
//! This module provides the forwarding capability behind every backend route:
//! - Upstream clients with per-backend TLS and timeouts
//! - `Forward` trait and its HTTP implementation
//! - Hop-by-hop header filtering and verbatim response relay

mod client;
mod error;
mod forward;
mod headers;

pub use client::Upstream;
pub use error::ProxyError;
pub use forward::{Forward, HttpForwarder};
pub use headers::{filter_request_headers, is_hop_by_hop, relay_response};
