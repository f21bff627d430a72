//! The console: route table, auth gate and the endpoints behind them.

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use log::{debug, info};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use super::{Endpoint, Guard, RouteTable, not_found, with_security_headers};
use crate::api;
use crate::auth::{AuthGate, AuthMode, Identity, JwtAuthenticator};
use crate::backends::{BackendRegistry, UpstreamKind};
use crate::config::AppConfig;
use crate::error::StartupError;
use crate::helm::{HELM_RELEASE_ROUTE, HELM_ROUTES, HelmRelay};
use crate::paths::{single_joining_slash, strip_path_prefix};
use crate::proxy::HttpForwarder;
use crate::relay::{ResourceKind, ResourceLister, ResponseRelay, delete_token};
use crate::shell::{ClientGlobals, IndexShell};

pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_CALLBACK: &str = "/auth/callback";
pub const DELETE_TOKEN: &str = "/api/openshift/delete-token";
pub const MONITORING_DASHBOARDS: &str = "/api/console/monitoring-dashboard-config";
pub const KNATIVE_EVENT_SOURCES: &str = "/api/console/knative-event-sources";
pub const VERSION: &str = "/api/console/version";
pub const HEALTH: &str = "/health";
pub const API_PREFIX: &str = "/api/";
pub const STATIC_PREFIX: &str = "/static/";

/// Everything a request can be dispatched to. Immutable after startup.
pub struct Console {
    base_path: String,
    table: RouteTable,
    gate: AuthGate,
    cluster: Option<ResponseRelay>,
    listers: Option<ResourceLister>,
    helm: Option<HelmRelay>,
    shell: IndexShell,
    static_files: ServeDir,
}

impl Console {
    /// Build the console from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        config.validate()?;

        let base_path = config.server.base_path();
        let gate = build_gate(config, &base_path)?;
        let origin = config.server.origin()?;
        let registry = BackendRegistry::build(&config.backends, &base_path, origin.as_ref())?;
        let shell = IndexShell::load(
            &config.server.public_dir,
            ClientGlobals::from_config(config),
        )?;

        Self::assemble(
            base_path,
            gate,
            registry,
            shell,
            &config.server.public_dir,
            config.listers.token(),
        )
    }

    /// Register every route for the given parts.
    pub fn assemble(
        base_path: String,
        gate: AuthGate,
        registry: BackendRegistry,
        shell: IndexShell,
        public_dir: &Path,
        lister_token: Option<&str>,
    ) -> Result<Self, StartupError> {
        let join = |literal: &str| single_joining_slash(&base_path, literal);
        let mut table = RouteTable::new();

        if gate.authenticator().is_some() {
            table.insert(join(AUTH_LOGIN), Guard::Public, Endpoint::Login)?;
            table.insert(join(AUTH_LOGOUT), Guard::Public, Endpoint::Logout)?;
            table.insert(join(AUTH_CALLBACK), Guard::Public, Endpoint::Callback)?;
        }

        for mount in registry.mounts() {
            table.insert(
                mount.pattern.clone(),
                mount.guard,
                Endpoint::Backend(Arc::clone(&mount.route)),
            )?;
        }

        let cluster = registry
            .upstream(UpstreamKind::Kubernetes)
            .cloned()
            .map(ResponseRelay::new);
        let listers = cluster
            .clone()
            .map(|relay| ResourceLister::new(relay, lister_token.map(String::from)));
        if cluster.is_some() {
            table.insert(
                join(MONITORING_DASHBOARDS),
                Guard::Identity,
                Endpoint::ResourceList(ResourceKind::MonitoringDashboards),
            )?;
            table.insert(
                join(KNATIVE_EVENT_SOURCES),
                Guard::Identity,
                Endpoint::ResourceList(ResourceKind::KnativeEventSources),
            )?;
            if !gate.is_disabled() {
                table.insert(join(DELETE_TOKEN), Guard::Identity, Endpoint::DeleteToken)?;
            }
        }

        let helm = registry.upstream(UpstreamKind::Helm).map(|upstream| {
            HelmRelay::new(&base_path, Arc::new(HttpForwarder::new(upstream.clone())))
        });
        if helm.is_some() {
            for (literal, operation) in HELM_ROUTES {
                table.insert(join(literal), Guard::Identity, Endpoint::Helm(operation))?;
            }
            table.insert(join(HELM_RELEASE_ROUTE), Guard::Identity, Endpoint::HelmRelease)?;
        }

        table.insert(join(VERSION), Guard::Identity, Endpoint::Version)?;
        table.insert(join(HEALTH), Guard::Public, Endpoint::Health)?;
        table.insert(join(API_PREFIX), Guard::Public, Endpoint::NotFound)?;
        table.insert(join(STATIC_PREFIX), Guard::Public, Endpoint::Static)?;
        table.insert(base_path.clone(), Guard::Public, Endpoint::Shell)?;

        info!("{} routes under {}", table.len(), base_path);
        for entry in table.entries() {
            debug!("route {} ({:?})", entry.pattern, entry.guard);
        }

        Ok(Self {
            base_path,
            table,
            gate,
            cluster,
            listers,
            helm,
            shell,
            static_files: ServeDir::new(public_dir),
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Route a request and produce its response.
    pub async fn handle(&self, req: Request<Body>) -> Response {
        let path = req.uri().path().to_string();

        if let Some(target) = self.table.redirect_target(&path) {
            return moved_permanently(target, req.uri().query());
        }

        let Some(entry) = self.table.lookup(&path) else {
            return not_found();
        };

        match entry.guard {
            Guard::Public => self.dispatch(&entry.endpoint, None, req).await,
            Guard::Identity => {
                self.gate
                    .wrap(req, |identity, req| async move {
                        self.dispatch(&entry.endpoint, Some(&identity), req).await
                    })
                    .await
            }
        }
    }

    async fn dispatch(
        &self,
        endpoint: &Endpoint,
        identity: Option<&Identity>,
        req: Request<Body>,
    ) -> Response {
        match endpoint {
            Endpoint::Backend(route) => route.forward(req, identity).await,
            Endpoint::Login => match self.gate.authenticator() {
                Some(authenticator) => authenticator.login(req).await,
                None => not_found(),
            },
            Endpoint::Logout => match self.gate.authenticator() {
                Some(authenticator) => authenticator.logout(req).await,
                None => not_found(),
            },
            Endpoint::Callback => match self.gate.authenticator() {
                Some(authenticator) => authenticator.callback(req).await,
                None => not_found(),
            },
            Endpoint::DeleteToken => match (&self.cluster, identity) {
                (Some(relay), Some(identity)) => delete_token(relay, req.method(), identity).await,
                _ => not_found(),
            },
            Endpoint::ResourceList(kind) => match (&self.listers, identity) {
                (Some(lister), Some(identity)) => lister.list(*kind, identity).await,
                _ => not_found(),
            },
            Endpoint::Helm(operation) => match (&self.helm, identity) {
                (Some(helm), Some(identity)) => helm.perform(*operation, req, identity).await,
                _ => not_found(),
            },
            Endpoint::HelmRelease => match (&self.helm, identity) {
                (Some(helm), Some(identity)) => helm.release(req, identity).await,
                _ => not_found(),
            },
            Endpoint::Version => api::version().await.into_response(),
            Endpoint::Health => api::health().await.into_response(),
            Endpoint::Static => with_security_headers(self.serve_static(req).await),
            Endpoint::Shell => with_security_headers(match self.shell.render() {
                Ok(page) => page.into_response(),
                Err(err) => err.into_response(),
            }),
            Endpoint::NotFound => not_found(),
        }
    }

    async fn serve_static(&self, req: Request<Body>) -> Response {
        let prefix = single_joining_slash(&self.base_path, STATIC_PREFIX);
        let Some(uri) = strip_path_prefix(req.uri(), &prefix) else {
            return not_found();
        };
        let (mut parts, body) = req.into_parts();
        parts.uri = uri;

        match self
            .static_files
            .clone()
            .oneshot(Request::from_parts(parts, body))
            .await
        {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        }
    }
}

fn build_gate(config: &AppConfig, base_path: &str) -> Result<AuthGate, StartupError> {
    match config.auth.mode {
        AuthMode::Disabled => {
            let user = &config.auth.static_user;
            if config.auth.release_mode {
                info!("authentication disabled, honoring caller tokens (release mode)");
            } else {
                info!("authentication disabled, all requests run as {}", user.username);
            }
            Ok(AuthGate::disabled(
                Identity::new(user.token.clone(), user.username.clone()),
                config.auth.release_mode,
            ))
        }
        AuthMode::Delegated => {
            let authenticator =
                JwtAuthenticator::new(&config.auth, base_path, &config.server.public_base())?;
            Ok(AuthGate::delegated(Arc::new(authenticator)))
        }
    }
}

fn moved_permanently(target: &str, query: Option<&str>) -> Response {
    let location = match query {
        Some(query) => format!("{target}?{query}"),
        None => target.to_string(),
    };
    match HeaderValue::from_str(&location) {
        Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response(),
        Err(_) => not_found(),
    }
}
