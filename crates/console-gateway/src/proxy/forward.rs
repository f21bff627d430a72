//! Request forwarding.

use async_trait::async_trait;
use axum::{
    body::{Body, HttpBody},
    http::{HeaderValue, Request, header::ORIGIN},
    response::Response,
};
use log::{debug, warn};

use super::{ProxyError, Upstream, filter_request_headers, relay_response};

/// Sends a request to a backend and returns the backend's response.
///
/// The request URI carries the backend-relative path: the mount prefix has
/// already been removed.
#[async_trait]
pub trait Forward: Send + Sync {
    async fn forward(&self, req: Request<Body>) -> Result<Response, ProxyError>;
}

/// Streams requests to an HTTP(S) upstream.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    upstream: Upstream,
    origin: Option<HeaderValue>,
}

impl HttpForwarder {
    pub fn new(upstream: Upstream) -> Self {
        Self {
            upstream,
            origin: None,
        }
    }

    /// Overwrite `Origin` on every forwarded request.
    pub fn with_origin(mut self, origin: HeaderValue) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }
}

#[async_trait]
impl Forward for HttpForwarder {
    async fn forward(&self, req: Request<Body>) -> Result<Response, ProxyError> {
        let (parts, body) = req.into_parts();
        let url = self
            .upstream
            .url_for(parts.uri.path(), parts.uri.query());

        let mut headers = filter_request_headers(&parts.headers);
        if let Some(origin) = &self.origin {
            headers.insert(ORIGIN, origin.clone());
        }

        debug!("{} {} -> {}", parts.method, parts.uri.path(), url);

        let mut builder = self
            .upstream
            .request(parts.method, url)
            .headers(headers);
        if body.size_hint().exact() != Some(0) {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let upstream_response = builder.send().await.map_err(|e| {
            let err = ProxyError::from_reqwest(self.upstream.name(), e);
            warn!("{}", err);
            err
        })?;

        relay_response(upstream_response)
    }
}
