//! Single-request utility endpoints relayed from the cluster API.
//!
//! These are not proxies: each handler issues one fixed outbound request and
//! hands the backend's status, headers and body back unchanged.

use axum::{
    http::Method,
    response::{IntoResponse, Response},
};
use log::{debug, info};

use crate::api::ApiError;
use crate::auth::Identity;
use crate::proxy::{ProxyError, Upstream, relay_response};

/// Sends one request to an upstream and relays the reply verbatim.
#[derive(Debug, Clone)]
pub struct ResponseRelay {
    upstream: Upstream,
}

impl ResponseRelay {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Send `method path?query` with `Authorization: Bearer <token>`.
    ///
    /// Any completed exchange is relayed as-is, non-2xx included. Only a
    /// request that could not be sent becomes a 502.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        token: &str,
    ) -> Response {
        let url = self.upstream.url_for(path, query);
        debug!("relay {} {}", method, url);

        let result = self
            .upstream
            .request(method, url)
            .bearer_auth(token)
            .send()
            .await;

        match result {
            Ok(upstream_response) => match relay_response(upstream_response) {
                Ok(response) => response,
                Err(err) => err.into_response(),
            },
            Err(err) => ProxyError::from_reqwest(self.upstream.name(), err).into_response(),
        }
    }
}

const DELETE_TOKEN_ALLOW: &str = "POST";

/// Path of the OAuth access token object named `token`.
pub fn oauth_access_token_path(token: &str) -> String {
    format!(
        "/apis/oauth.openshift.io/v1/oauthaccesstokens/{}",
        urlencoding::encode(token)
    )
}

/// Revoke the caller's own OAuth access token. POST only.
pub async fn delete_token(relay: &ResponseRelay, method: &Method, identity: &Identity) -> Response {
    if *method != Method::POST {
        return ApiError::method_not_allowed(
            DELETE_TOKEN_ALLOW,
            "Invalid method: only POST is allowed",
        )
        .into_response();
    }

    info!("revoking access token for {}", identity.username);
    relay
        .send(
            Method::DELETE,
            &oauth_access_token_path(&identity.token),
            None,
            &identity.token,
        )
        .await
}

/// Cluster resources the console lists on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Config maps holding monitoring dashboards.
    MonitoringDashboards,
    /// CRDs registered as knative event sources.
    KnativeEventSources,
}

impl ResourceKind {
    pub fn path(self) -> &'static str {
        match self {
            Self::MonitoringDashboards => {
                "/api/v1/namespaces/openshift-config-managed/configmaps"
            }
            Self::KnativeEventSources => {
                "/apis/apiextensions.k8s.io/v1/customresourcedefinitions"
            }
        }
    }

    pub fn label_selector(self) -> &'static str {
        match self {
            Self::MonitoringDashboards => "console.openshift.io/dashboard=true",
            Self::KnativeEventSources => "duck.knative.dev/source=true",
        }
    }

    fn query(self) -> String {
        format!(
            "labelSelector={}",
            urlencoding::encode(self.label_selector())
        )
    }
}

/// Lists one resource kind with a fixed token, or the caller's when unset.
#[derive(Debug, Clone)]
pub struct ResourceLister {
    relay: ResponseRelay,
    token: Option<String>,
}

impl ResourceLister {
    pub fn new(relay: ResponseRelay, token: Option<String>) -> Self {
        Self { relay, token }
    }

    pub async fn list(&self, kind: ResourceKind, identity: &Identity) -> Response {
        let token = self.token.as_deref().unwrap_or(&identity.token);
        self.relay
            .send(Method::GET, kind.path(), Some(&kind.query()), token)
            .await
    }
}
