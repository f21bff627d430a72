//! Why a request could not be tied to a console session.
//!
//! Rejections render as `{"error": ..., "reason": ...}`. Every 401 carries a
//! bearer challenge so API clients know to re-authenticate.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

const CHALLENGE: &str = r#"Bearer realm="console""#;
const CHALLENGE_EXPIRED: &str = r#"Bearer realm="console", error="invalid_token""#;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Neither an `Authorization` header nor the session cookie.
    #[error("no session: send a bearer token or the session cookie")]
    NoSession,

    /// `Authorization` is present but is not exactly `Bearer <token>`.
    #[error("authorization header is not a single bearer token")]
    MalformedAuthorization,

    #[error("session token rejected: {0}")]
    InvalidSession(String),

    #[error("session expired, log in again")]
    SessionExpired,

    /// `/auth/login` was hit but no provider URL is configured.
    #[error("no login provider configured")]
    LoginNotConfigured,

    #[error("cannot encode session cookie: {0}")]
    SessionCookie(String),
}

impl AuthError {
    /// Machine-readable reason for clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::MalformedAuthorization => "malformed_authorization",
            Self::InvalidSession(_) => "invalid_session",
            Self::SessionExpired => "session_expired",
            Self::LoginNotConfigured => "login_not_configured",
            Self::SessionCookie(_) => "session_cookie",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::LoginNotConfigured => StatusCode::NOT_FOUND,
            Self::SessionCookie(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn challenge(&self) -> Option<&'static str> {
        match self {
            Self::NoSession | Self::MalformedAuthorization => Some(CHALLENGE),
            Self::InvalidSession(_) | Self::SessionExpired => Some(CHALLENGE_EXPIRED),
            Self::LoginNotConfigured | Self::SessionCookie(_) => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Rejection {
    error: String,
    reason: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let challenge = self.challenge();
        let body = Json(Rejection {
            error: self.to_string(),
            reason: self.reason(),
        });

        let mut response = (status, body).into_response();
        if let Some(challenge) = challenge {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        response
    }
}
