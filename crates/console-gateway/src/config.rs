//! Application configuration.
//!
//! Loaded from an optional TOML file and `CONSOLE_GATEWAY__*` environment
//! variables (`__` separates nested keys, e.g.
//! `CONSOLE_GATEWAY__BACKENDS__KIALI__ENDPOINT`).

use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use config::{Config, ConfigError, Environment, File, FileFormat};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;
use crate::backends::BackendsConfig;
use crate::error::StartupError;
use crate::paths::normalize_base_path;

pub const ENV_PREFIX: &str = "CONSOLE_GATEWAY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub backends: BackendsConfig,
    pub console: ConsoleConfig,
    pub listers: ListersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Externally visible URL of the console, e.g. `https://console.example.com`.
    pub base_address: Option<String>,

    /// Mount point of every route.
    pub base_path: String,

    /// Directory holding `index.html` and static assets.
    pub public_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            base_address: None,
            base_path: "/".to_string(),
            public_dir: PathBuf::from("./frontend/public"),
        }
    }
}

impl ServerConfig {
    /// Base path with leading and trailing slash.
    pub fn base_path(&self) -> String {
        normalize_base_path(&self.base_path)
    }

    /// Externally visible base: `base_address` joined with the base path, or
    /// the base path alone.
    pub fn public_base(&self) -> String {
        match self.base_address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => {
                format!("{}{}", address.trim_end_matches('/'), self.base_path())
            }
            _ => self.base_path(),
        }
    }

    /// `scheme://host[:port]` of `base_address`.
    pub fn origin(&self) -> Result<Option<HeaderValue>, StartupError> {
        let Some(address) = self.base_address.as_deref().filter(|a| !a.trim().is_empty()) else {
            return Ok(None);
        };
        let url = Url::parse(address)
            .map_err(|e| StartupError::Server(format!("base_address {address}: {e}")))?;
        if url.host_str().is_none() {
            return Err(StartupError::Server(format!(
                "base_address {address} has no host"
            )));
        }
        HeaderValue::from_str(&url.origin().ascii_serialization())
            .map(Some)
            .map_err(|e| StartupError::Server(e.to_string()))
    }
}

/// Values handed to the browser application in the index page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub branding: String,
    pub custom_product_name: String,
    pub kube_api_server_url: String,
    pub grafana_public_url: String,
    pub prometheus_public_url: String,
    pub thanos_public_url: String,
    pub keycloak_realm: String,
    pub keycloak_auth_url: String,
    pub keycloak_client_id: String,
    pub keycloak_use_hidden_iframe: bool,
    pub mc_mode: bool,
    pub mc_mode_file: String,
    pub mc_mode_operator: bool,
    pub gitlab_url: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            branding: "okd".to_string(),
            custom_product_name: String::new(),
            kube_api_server_url: String::new(),
            grafana_public_url: String::new(),
            prometheus_public_url: String::new(),
            thanos_public_url: String::new(),
            keycloak_realm: String::new(),
            keycloak_auth_url: String::new(),
            keycloak_client_id: String::new(),
            keycloak_use_hidden_iframe: false,
            mc_mode: false,
            mc_mode_file: String::new(),
            mc_mode_operator: false,
            gitlab_url: String::new(),
        }
    }
}

/// Credentials for the cluster resource listers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListersConfig {
    /// Service account token; the caller's token is used when unset.
    pub service_account_token: Option<String>,
}

impl ListersConfig {
    pub fn token(&self) -> Option<&str> {
        self.service_account_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

impl AppConfig {
    /// Load from `path` (if it exists) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Check settings that would otherwise fail per request.
    pub fn validate(&self) -> Result<(), StartupError> {
        if !self.server.base_path.starts_with('/') {
            return Err(StartupError::Server(format!(
                "base_path must be absolute, got {:?}",
                self.server.base_path
            )));
        }
        self.server.origin()?;
        self.auth.validate()?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthMode;
    use crate::backends::UpstreamKind;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.base_path(), "/");
        assert_eq!(config.auth.mode, AuthMode::Disabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_public_base_and_origin() {
        let server = ServerConfig {
            base_address: Some("https://console.example.com:8443/".to_string()),
            base_path: "/console".to_string(),
            ..Default::default()
        };
        assert_eq!(server.public_base(), "https://console.example.com:8443/console/");
        assert_eq!(
            server.origin().unwrap().unwrap(),
            "https://console.example.com:8443"
        );

        let server = ServerConfig::default();
        assert_eq!(server.public_base(), "/");
        assert!(server.origin().unwrap().is_none());
    }

    #[test]
    fn test_validate_rejects_relative_base_path() {
        let mut config = AppConfig::default();
        config.server.base_path = "console/".to_string();
        assert!(matches!(config.validate(), Err(StartupError::Server(_))));
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = AppConfig::default();
        config.auth.mode = AuthMode::Delegated;
        config.auth.jwt_secret = Some("short".to_string());
        assert!(matches!(config.validate(), Err(StartupError::Auth(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9443
base_path = "/console/"

[auth]
release_mode = true

[auth.static_user]
token = "sa-token"

[backends.thanos]
endpoint = "http://thanos:9090"

[console]
branding = "hypercloud"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9443);
        assert_eq!(config.server.base_path(), "/console/");
        assert!(config.auth.release_mode);
        assert_eq!(config.auth.static_user.token, "sa-token");
        assert!(config.backends.is_enabled(UpstreamKind::Thanos));
        assert!(!config.backends.is_enabled(UpstreamKind::Kiali));
        assert_eq!(config.console.branding, "hypercloud");
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let text = AppConfig::default().to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.port, 9000);
    }
}
