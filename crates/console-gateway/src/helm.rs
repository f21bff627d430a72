//! Helm endpoints, relayed to the helm service.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, Uri},
    response::{IntoResponse, Response},
};
use log::debug;

use crate::api::ApiError;
use crate::auth::Identity;
use crate::backends::{BackendRoute, CredentialPolicy};
use crate::paths::single_joining_slash;
use crate::proxy::Forward;

/// A helm operation and the helm service path that performs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelmOperation {
    RenderManifests,
    ListReleases,
    GetChart,
    ReleaseHistory,
    GetRelease,
    Install,
    Uninstall,
    Rollback,
    Upgrade,
}

impl HelmOperation {
    /// Path on the helm service.
    pub fn service_path(self) -> &'static str {
        match self {
            Self::RenderManifests => "/template",
            Self::ListReleases => "/releases",
            Self::GetChart => "/chart",
            Self::ReleaseHistory => "/release/history",
            Self::GetRelease
            | Self::Install
            | Self::Uninstall
            | Self::Rollback
            | Self::Upgrade => "/release",
        }
    }
}

/// Single-operation helm routes, relative to the base path.
pub const HELM_ROUTES: [(&str, HelmOperation); 4] = [
    ("/api/helm/template", HelmOperation::RenderManifests),
    ("/api/helm/releases", HelmOperation::ListReleases),
    ("/api/helm/chart", HelmOperation::GetChart),
    ("/api/helm/release/history", HelmOperation::ReleaseHistory),
];

/// The method-dispatched release route, relative to the base path.
pub const HELM_RELEASE_ROUTE: &str = "/api/helm/release";

/// Finite map from method to operation with a 405 fallback.
#[derive(Debug, Clone, Copy)]
pub struct MethodMap {
    entries: &'static [(&'static str, HelmOperation)],
    allow: &'static str,
}

impl MethodMap {
    pub const fn new(entries: &'static [(&'static str, HelmOperation)], allow: &'static str) -> Self {
        Self { entries, allow }
    }

    pub fn get(&self, method: &Method) -> Option<HelmOperation> {
        self.entries
            .iter()
            .find(|(m, _)| *m == method.as_str())
            .map(|(_, op)| *op)
    }

    pub fn allow(&self) -> &'static str {
        self.allow
    }

    /// The operation for `method`, or the 405 response to send.
    pub fn dispatch(&self, method: &Method) -> Result<HelmOperation, ApiError> {
        self.get(method).ok_or_else(|| {
            ApiError::method_not_allowed(
                self.allow,
                format!("Unsupported method, supported methods are {}", self.allow),
            )
        })
    }
}

const RELEASE_METHODS: &[(&str, HelmOperation)] = &[
    ("GET", HelmOperation::GetRelease),
    ("POST", HelmOperation::Install),
    ("DELETE", HelmOperation::Uninstall),
    ("PATCH", HelmOperation::Rollback),
    ("PUT", HelmOperation::Upgrade),
];

/// Methods of [`HELM_RELEASE_ROUTE`].
pub const RELEASE_METHOD_MAP: MethodMap =
    MethodMap::new(RELEASE_METHODS, "GET, POST, PATCH, PUT, DELETE");

/// Forwards helm operations to the helm service with the caller's credential.
pub struct HelmRelay {
    prefix: String,
    route: BackendRoute,
}

impl HelmRelay {
    /// Requests are relayed under `join(base, "/api/helm/")`, which the helm
    /// service does not see.
    pub fn new(base_path: &str, forwarder: Arc<dyn Forward>) -> Self {
        let prefix = single_joining_slash(base_path, "/api/helm/");
        Self {
            route: BackendRoute::new(
                "helm",
                prefix.clone(),
                prefix.clone(),
                forwarder,
                CredentialPolicy::Inject,
            ),
            prefix,
        }
    }

    /// Run `operation` for `identity`.
    ///
    /// The outbound path is the operation's service path; only the query
    /// of the incoming request is kept.
    pub async fn perform(
        &self,
        operation: HelmOperation,
        mut req: Request<Body>,
        identity: &Identity,
    ) -> Response {
        debug!("helm {:?} for {}", operation, identity.username);
        let mut target = single_joining_slash(&self.prefix, operation.service_path());
        if let Some(query) = req.uri().query() {
            target.push('?');
            target.push_str(query);
        }
        match target.parse::<Uri>() {
            Ok(uri) => *req.uri_mut() = uri,
            Err(err) => {
                return ApiError::bad_request(format!("invalid helm request: {err}"))
                    .into_response();
            }
        }
        self.route.forward(req, Some(identity)).await
    }

    /// Dispatch the release route by method.
    pub async fn release(&self, req: Request<Body>, identity: &Identity) -> Response {
        match RELEASE_METHOD_MAP.dispatch(req.method()) {
            Ok(operation) => self.perform(operation, req, identity).await,
            Err(err) => err.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::RecordingForwarder;
    use axum::http::{StatusCode, header::ALLOW};

    #[test]
    fn test_release_method_map() {
        assert_eq!(
            RELEASE_METHOD_MAP.get(&Method::GET),
            Some(HelmOperation::GetRelease)
        );
        assert_eq!(
            RELEASE_METHOD_MAP.get(&Method::PATCH),
            Some(HelmOperation::Rollback)
        );
        assert_eq!(RELEASE_METHOD_MAP.get(&Method::HEAD), None);
    }

    #[test]
    fn test_routes_match_service_paths() {
        for (pattern, operation) in HELM_ROUTES {
            let rest = pattern.strip_prefix("/api/helm").unwrap();
            assert_eq!(rest, operation.service_path());
        }
        assert_eq!(
            HELM_RELEASE_ROUTE.strip_prefix("/api/helm").unwrap(),
            HelmOperation::Upgrade.service_path()
        );
    }

    #[tokio::test]
    async fn test_release_rejects_unlisted_methods() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let relay = HelmRelay::new("/", forwarder.clone());
        let identity = Identity::new("t", "admin");

        for method in [Method::HEAD, Method::OPTIONS, Method::TRACE] {
            let req = Request::builder()
                .method(method)
                .uri("/api/helm/release")
                .body(Body::empty())
                .unwrap();
            let response = relay.release(req, &identity).await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(response.headers()[ALLOW], "GET, POST, PATCH, PUT, DELETE");
        }
        assert!(forwarder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_operation_selects_service_path() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let relay = HelmRelay::new("/", forwarder.clone());
        let identity = Identity::new("t", "admin");

        let req = Request::builder()
            .uri("/api/helm/chart?x=1")
            .body(Body::empty())
            .unwrap();
        relay.perform(HelmOperation::ListReleases, req, &identity).await;

        let req = Request::builder()
            .uri("/api/helm/anything")
            .body(Body::empty())
            .unwrap();
        relay.perform(HelmOperation::ReleaseHistory, req, &identity).await;

        let seen = forwarder.seen.lock().unwrap();
        assert_eq!(seen[0].0, "/releases?x=1");
        assert_eq!(seen[1].0, "/release/history");
    }

    #[tokio::test]
    async fn test_release_forwards_with_credential() {
        let forwarder = Arc::new(RecordingForwarder::default());
        let relay = HelmRelay::new("/console/", forwarder.clone());
        let identity = Identity::new("t", "admin");

        let req = Request::builder()
            .method(Method::PUT)
            .uri("/console/api/helm/release?name=web&ns=default")
            .body(Body::empty())
            .unwrap();
        let response = relay.release(req, &identity).await;
        assert_eq!(response.status(), StatusCode::OK);

        let seen = forwarder.seen.lock().unwrap();
        assert_eq!(seen[0].0, "/release?name=web&ns=default");
        assert_eq!(seen[0].1.as_deref(), Some("Bearer t"));
    }
}
