//! Per-request caller identity.

use serde::Serialize;

/// The caller a request is executed on behalf of.
///
/// Built by the auth gate for each request and handed to the endpoint by
/// value; nothing stores it beyond the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Bearer token forwarded to backends.
    #[serde(skip_serializing)]
    pub token: String,
    /// Display name of the caller.
    pub username: String,
}

impl Identity {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }

    /// Copy of this identity carrying a different token.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: self.username.clone(),
        }
    }

    /// `Authorization` header value for this identity.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}
