//! The authentication gate wrapped around every guarded endpoint.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, request::Parts},
    response::Response,
};
use log::debug;

use super::{Authenticator, CredentialResolver, CredentialSource, Identity};

/// Resolves the identity a guarded endpoint runs as.
#[derive(Clone)]
pub enum AuthGate {
    /// Identity comes from the authenticator; failures short-circuit.
    Delegated(Arc<dyn Authenticator>),
    /// Identity is the static user.
    ///
    /// With `release_mode`, each request gets a fresh copy carrying the
    /// caller's token (header, then query, then the static token).
    Disabled {
        static_user: Identity,
        release_mode: bool,
    },
}

impl AuthGate {
    pub fn delegated(authenticator: Arc<dyn Authenticator>) -> Self {
        Self::Delegated(authenticator)
    }

    pub fn disabled(static_user: Identity, release_mode: bool) -> Self {
        Self::Disabled {
            static_user,
            release_mode,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled { .. })
    }

    pub fn authenticator(&self) -> Option<&Arc<dyn Authenticator>> {
        match self {
            Self::Delegated(authenticator) => Some(authenticator),
            Self::Disabled { .. } => None,
        }
    }

    /// Resolve the identity for a request, or the rejection to send instead.
    pub async fn resolve(&self, parts: &Parts) -> Result<Identity, Response> {
        match self {
            Self::Delegated(authenticator) => authenticator
                .authenticate(parts)
                .await
                .map_err(|err| {
                    debug!("rejecting {}: {}", parts.uri.path(), err);
                    authenticator.reject(err)
                }),
            Self::Disabled {
                static_user,
                release_mode: false,
            } => Ok(static_user.clone()),
            Self::Disabled {
                static_user,
                release_mode: true,
            } => {
                let credential =
                    CredentialResolver.resolve(&parts.headers, &parts.uri, &static_user.token);
                if credential.source != CredentialSource::Static {
                    debug!("release mode: using {:?} token", credential.source);
                }
                Ok(static_user.with_token(credential.token))
            }
        }
    }

    /// Run `handler` with the resolved identity, or return the rejection.
    ///
    /// The identity is also stored in the request extensions.
    pub async fn wrap<F, Fut>(&self, req: Request<Body>, handler: F) -> Response
    where
        F: FnOnce(Identity, Request<Body>) -> Fut,
        Fut: Future<Output = Response>,
    {
        let (mut parts, body) = req.into_parts();
        match self.resolve(&parts).await {
            Ok(identity) => {
                parts.extensions.insert(identity.clone());
                handler(identity, Request::from_parts(parts, body)).await
            }
            Err(rejection) => rejection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use async_trait::async_trait;
    use axum::http::{StatusCode, header::AUTHORIZATION};
    use axum::response::IntoResponse;

    struct DenyAll;

    #[async_trait]
    impl Authenticator for DenyAll {
        async fn authenticate(&self, _parts: &Parts) -> Result<Identity, AuthError> {
            Err(AuthError::NoSession)
        }

        async fn login(&self, _req: Request<Body>) -> Response {
            StatusCode::OK.into_response()
        }

        async fn logout(&self, _req: Request<Body>) -> Response {
            StatusCode::OK.into_response()
        }

        async fn callback(&self, _req: Request<Body>) -> Response {
            StatusCode::OK.into_response()
        }
    }

    fn request(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn resolved_token(gate: &AuthGate, req: Request<Body>) -> String {
        let (parts, _) = req.into_parts();
        gate.resolve(&parts).await.unwrap().token
    }

    #[tokio::test]
    async fn test_disabled_ignores_caller_token() {
        let gate = AuthGate::disabled(Identity::new("static", "admin"), false);
        let token = resolved_token(&gate, request("/x?token=q", Some("Bearer abc"))).await;
        assert_eq!(token, "static");
    }

    #[tokio::test]
    async fn test_release_mode_precedence() {
        let gate = AuthGate::disabled(Identity::new("static", "admin"), true);

        let token = resolved_token(&gate, request("/x?token=q", Some("Bearer abc"))).await;
        assert_eq!(token, "abc");

        let token = resolved_token(&gate, request("/x?token=xyz", None)).await;
        assert_eq!(token, "xyz");

        let token = resolved_token(&gate, request("/x", None)).await;
        assert_eq!(token, "static");
    }

    #[tokio::test]
    async fn test_release_mode_does_not_leak_between_requests() {
        let gate = AuthGate::disabled(Identity::new("static", "admin"), true);
        let _ = resolved_token(&gate, request("/x", Some("Bearer first"))).await;
        let token = resolved_token(&gate, request("/x", None)).await;
        assert_eq!(token, "static");
    }

    #[tokio::test]
    async fn test_delegated_rejection_skips_handler() {
        let gate = AuthGate::delegated(Arc::new(DenyAll));
        let mut ran = false;
        let response = gate
            .wrap(request("/x", None), |_identity, _req| {
                ran = true;
                async { StatusCode::OK.into_response() }
            })
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!ran);
    }

    #[tokio::test]
    async fn test_wrap_passes_identity() {
        let gate = AuthGate::disabled(Identity::new("static", "admin"), false);
        let response = gate
            .wrap(request("/x", None), |identity, req| async move {
                assert_eq!(req.extensions().get::<Identity>(), Some(&identity));
                identity.username.into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
