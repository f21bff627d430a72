//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How requests are authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No login; every request runs as the static user.
    #[default]
    Disabled,
    /// Sessions are validated by the configured authenticator.
    Delegated,
}

/// The fixed identity used while authentication is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticUserConfig {
    pub username: String,
    /// Token forwarded to backends when no caller token applies.
    pub token: String,
}

impl Default for StaticUserConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            token: String::new(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,

    /// Honor caller-supplied tokens (header, then `token` query) while disabled.
    pub release_mode: bool,

    pub static_user: StaticUserConfig,

    /// HS256 secret for session tokens. Supports `env:VAR_NAME`.
    /// Required in delegated mode.
    pub jwt_secret: Option<String>,

    /// Cookie holding the session token after a login callback.
    pub cookie_name: String,

    /// Identity provider login page; the callback URL is appended as `redirect_uri`.
    pub login_url: Option<String>,

    /// Where to send the browser after logout. Defaults to the base path.
    pub logout_redirect: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Disabled,
            release_mode: false,
            static_user: StaticUserConfig::default(),
            jwt_secret: None,
            cookie_name: "console-session-token".to_string(),
            login_url: None,
            logout_redirect: None,
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match &self.jwt_secret {
            None => Ok(None),
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    match std::env::var(var_name) {
                        Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                        Ok(_) => Err(ConfigValidationError::EnvVarEmpty(var_name.to_string())),
                        Err(_) => Err(ConfigValidationError::EnvVarNotFound(var_name.to_string())),
                    }
                } else {
                    Ok(Some(value.clone()))
                }
            }
        }
    }

    /// Validate the configuration for the selected mode.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.mode == AuthMode::Delegated {
            let secret = self
                .resolve_jwt_secret()?
                .ok_or(ConfigValidationError::MissingJwtSecret)?;
            if secret.len() < 32 {
                return Err(ConfigValidationError::JwtSecretTooShort);
            }
            if self.cookie_name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyCookieName);
            }
        }

        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error(
        "JWT secret is required in delegated mode. Set CONSOLE_GATEWAY__AUTH__JWT_SECRET or auth.jwt_secret in config."
    )]
    MissingJwtSecret,
    #[error("JWT secret must be at least 32 characters long.")]
    JwtSecretTooShort,
    #[error("auth.cookie_name must not be empty in delegated mode.")]
    EmptyCookieName,
    #[error("Environment variable '{0}' not found (referenced via env:{0} in config).")]
    EnvVarNotFound(String),
    #[error("Environment variable '{0}' is empty (referenced via env:{0} in config).")]
    EnvVarEmpty(String),
}
