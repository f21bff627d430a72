//! A mounted backend: prefix stripping, credential injection, forwarding.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderValue, Request, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use log::debug;

use crate::api::ApiError;
use crate::auth::Identity;
use crate::paths::strip_path_prefix;
use crate::proxy::Forward;
use crate::router::not_found;

/// Whether the caller's credential is written onto forwarded requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPolicy {
    /// Replace `Authorization` with `Bearer <identity token>`.
    Inject,
    /// Forward the client's headers untouched.
    None,
}

/// A backend mounted under the base path. Immutable after startup.
pub struct BackendRoute {
    name: &'static str,
    mount_path: String,
    strip_prefix: String,
    forwarder: Arc<dyn Forward>,
    credential: CredentialPolicy,
}

impl std::fmt::Debug for BackendRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRoute")
            .field("name", &self.name)
            .field("mount_path", &self.mount_path)
            .field("strip_prefix", &self.strip_prefix)
            .field("credential", &self.credential)
            .finish()
    }
}

impl BackendRoute {
    pub fn new(
        name: &'static str,
        mount_path: impl Into<String>,
        strip_prefix: impl Into<String>,
        forwarder: Arc<dyn Forward>,
        credential: CredentialPolicy,
    ) -> Self {
        Self {
            name,
            mount_path: mount_path.into(),
            strip_prefix: strip_prefix.into(),
            forwarder,
            credential,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mount_path(&self) -> &str {
        &self.mount_path
    }

    pub fn strip_prefix(&self) -> &str {
        &self.strip_prefix
    }

    pub fn credential(&self) -> CredentialPolicy {
        self.credential
    }

    /// Backend-relative URI: `strip_prefix` removed from the path, query kept.
    pub fn strip(&self, uri: &Uri) -> Option<Uri> {
        strip_path_prefix(uri, &self.strip_prefix)
    }

    /// Forward `req` to the backend as `identity`.
    ///
    /// `identity` is `None` only for public routes, which never inject.
    pub async fn forward(&self, mut req: Request<Body>, identity: Option<&Identity>) -> Response {
        let Some(uri) = self.strip(req.uri()) else {
            return not_found();
        };
        *req.uri_mut() = uri;

        if let (CredentialPolicy::Inject, Some(identity)) = (self.credential, identity) {
            match HeaderValue::from_str(&identity.bearer()) {
                Ok(value) => {
                    req.headers_mut().insert(AUTHORIZATION, value);
                }
                Err(_) => {
                    return ApiError::bad_request("token is not a valid header value")
                        .into_response();
                }
            }
        }

        debug!("{} <- {}", self.name, req.uri());
        match self.forwarder.forward(req).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
}
