//! The single-page application shell.
//!
//! `index.html` is read once at startup. Each request gets the template with
//! the client globals substituted for [`SERVER_FLAGS_PLACEHOLDER`].

use std::fs;
use std::path::Path;

use axum::response::Html;
use serde::Serialize;

use crate::api::{ApiError, ApiResult};
use crate::backends::{BackendsConfig, UpstreamKind};
use crate::config::AppConfig;
use crate::error::StartupError;
use crate::paths::single_joining_slash;

pub const INDEX_PAGE: &str = "index.html";

pub const SERVER_FLAGS_PLACEHOLDER: &str = "[[ .ServerFlags ]]";

/// Settings the browser application reads from `window.SERVER_FLAGS`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientGlobals {
    pub console_version: String,
    pub base_path: String,
    #[serde(rename = "kubeAPIServerURL")]
    pub kube_api_server_url: String,
    #[serde(rename = "prometheusBaseURL")]
    pub prometheus_base_url: String,
    #[serde(rename = "prometheusTenancyBaseURL")]
    pub prometheus_tenancy_base_url: String,
    #[serde(rename = "alertManagerBaseURL")]
    pub alert_manager_base_url: String,
    #[serde(rename = "meteringBaseURL")]
    pub metering_base_url: String,
    pub branding: String,
    pub custom_product_name: String,
    #[serde(rename = "grafanaPublicURL")]
    pub grafana_public_url: String,
    #[serde(rename = "prometheusPublicURL")]
    pub prometheus_public_url: String,
    #[serde(rename = "thanosPublicURL")]
    pub thanos_public_url: String,
    pub keycloak_realm: String,
    #[serde(rename = "keycloakAuthURL")]
    pub keycloak_auth_url: String,
    pub keycloak_client_id: String,
    pub keycloak_use_hidden_iframe: bool,
    pub mc_mode: bool,
    pub mc_mode_file: String,
    pub mc_mode_operator: bool,
    pub release_mode_flag: bool,
    #[serde(rename = "gitlabURL")]
    pub gitlab_url: String,
}

impl ClientGlobals {
    pub fn from_config(config: &AppConfig) -> Self {
        let base_path = config.server.base_path();
        let console = &config.console;
        let backends = &config.backends;

        let mut globals = Self {
            console_version: env!("CARGO_PKG_VERSION").to_string(),
            base_path: base_path.clone(),
            kube_api_server_url: console.kube_api_server_url.clone(),
            branding: console.branding.clone(),
            custom_product_name: console.custom_product_name.clone(),
            grafana_public_url: console.grafana_public_url.clone(),
            prometheus_public_url: console.prometheus_public_url.clone(),
            thanos_public_url: console.thanos_public_url.clone(),
            keycloak_realm: console.keycloak_realm.clone(),
            keycloak_auth_url: console.keycloak_auth_url.clone(),
            keycloak_client_id: console.keycloak_client_id.clone(),
            keycloak_use_hidden_iframe: console.keycloak_use_hidden_iframe,
            mc_mode: console.mc_mode,
            mc_mode_file: console.mc_mode_file.clone(),
            mc_mode_operator: console.mc_mode_operator,
            release_mode_flag: config.auth.release_mode,
            gitlab_url: console.gitlab_url.clone(),
            ..Default::default()
        };

        if metrics_enabled(backends) {
            globals.prometheus_base_url = single_joining_slash(&base_path, "/api/prometheus");
            globals.prometheus_tenancy_base_url =
                single_joining_slash(&base_path, "/api/prometheus-tenancy");
        }
        if backends.is_enabled(UpstreamKind::Alertmanager) {
            globals.alert_manager_base_url = single_joining_slash(&base_path, "/api/alertmanager");
        }
        if backends.is_enabled(UpstreamKind::Metering) {
            globals.metering_base_url = single_joining_slash(&base_path, "/api/metering");
        }

        globals
    }
}

fn metrics_enabled(backends: &BackendsConfig) -> bool {
    [
        UpstreamKind::Prometheus,
        UpstreamKind::Thanos,
        UpstreamKind::ThanosTenancy,
    ]
    .into_iter()
    .all(|kind| backends.is_enabled(kind))
}

/// The loaded index template and the globals rendered into it.
#[derive(Debug, Clone)]
pub struct IndexShell {
    template: String,
    globals: ClientGlobals,
}

impl IndexShell {
    pub fn new(template: impl Into<String>, globals: ClientGlobals) -> Self {
        Self {
            template: template.into(),
            globals,
        }
    }

    /// Read `index.html` from `public_dir`. A missing template is fatal.
    pub fn load(public_dir: &Path, globals: ClientGlobals) -> Result<Self, StartupError> {
        let path = public_dir.join(INDEX_PAGE);
        let template = fs::read_to_string(&path)
            .map_err(|source| StartupError::Template { path, source })?;
        Ok(Self::new(template, globals))
    }

    pub fn globals(&self) -> &ClientGlobals {
        &self.globals
    }

    pub fn render(&self) -> ApiResult<Html<String>> {
        let flags = serde_json::to_string(&self.globals)
            .map_err(|e| ApiError::internal(format!("cannot render index page: {e}")))?;
        // Keep the JSON from closing the surrounding script element.
        let flags = flags.replace("</", "<\\/");
        Ok(Html(self.template.replace(SERVER_FLAGS_PLACEHOLDER, &flags)))
    }
}
