//! Forwarding errors.

use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::ApiError;

/// A forward attempt that did not produce an upstream response.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{backend} is unreachable: {message}")]
    Unreachable { backend: String, message: String },

    #[error("{backend} did not respond in time")]
    Timeout { backend: String },

    #[error("{backend} request failed: {message}")]
    Upstream { backend: String, message: String },

    #[error("invalid endpoint for {backend}: {message}")]
    InvalidEndpoint { backend: String, message: String },

    #[error("cannot build client for {backend}: {message}")]
    Client { backend: String, message: String },

    #[error("cannot build response: {0}")]
    Response(String),
}

impl ProxyError {
    /// Classify a transport error for `backend`.
    pub fn from_reqwest(backend: &str, err: reqwest::Error) -> Self {
        let backend = backend.to_string();
        if err.is_timeout() {
            Self::Timeout { backend }
        } else if err.is_connect() {
            Self::Unreachable {
                backend,
                message: err.to_string(),
            }
        } else {
            Self::Upstream {
                backend,
                message: err.to_string(),
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match self {
            ProxyError::Response(msg) => ApiError::internal(msg).into_response(),
            other => ApiError::bad_gateway(other.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_transport_errors_are_bad_gateway() {
        let err = ProxyError::Unreachable {
            backend: "kiali".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "kiali is unreachable: connection refused");
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);

        let err = ProxyError::Timeout {
            backend: "thanos".to_string(),
        };
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
