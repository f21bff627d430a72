//! Session authenticators used in delegated mode.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{
        HeaderValue, Request,
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::credential::{query_token, strict_bearer_token};
use super::{AuthConfig, AuthError, ConfigValidationError, Identity};
use crate::paths::single_joining_slash;

/// Resolves identities and drives the login/logout/callback flow.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve the caller of a request, or fail.
    async fn authenticate(&self, parts: &Parts) -> Result<Identity, AuthError>;

    /// Response sent instead of running the endpoint when [`authenticate`] fails.
    ///
    /// [`authenticate`]: Authenticator::authenticate
    fn reject(&self, err: AuthError) -> Response {
        err.into_response()
    }

    async fn login(&self, req: Request<Body>) -> Response;

    async fn logout(&self, req: Request<Body>) -> Response;

    async fn callback(&self, req: Request<Body>) -> Response;
}

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,

    #[serde(default)]
    pub iat: Option<i64>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub preferred_username: Option<String>,
}

impl Claims {
    /// Name shown for the caller.
    pub fn username(&self) -> &str {
        self.preferred_username
            .as_deref()
            .or(self.name.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == cookie_name && !value.trim().is_empty() {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// HS256 session-token authenticator.
///
/// Tokens arrive as `Authorization: Bearer` or in the session cookie set by
/// the login callback.
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    cookie_name: String,
    base_path: String,
    callback_url: String,
    login_url: Option<String>,
    logout_redirect: Option<String>,
}

impl JwtAuthenticator {
    /// Build from config. `public_base` is the externally visible base
    /// (`server.base_address` when set, else the base path).
    pub fn new(
        config: &AuthConfig,
        base_path: &str,
        public_base: &str,
    ) -> Result<Self, ConfigValidationError> {
        let secret = config
            .resolve_jwt_secret()?
            .ok_or(ConfigValidationError::MissingJwtSecret)?;

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            cookie_name: config.cookie_name.clone(),
            base_path: base_path.to_string(),
            callback_url: single_joining_slash(public_base, "/auth/callback"),
            login_url: config.login_url.clone(),
            logout_redirect: config.logout_redirect.clone(),
        })
    }

    /// Validate a session token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            warn!("JWT validation failed: {:?}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::SessionExpired,
                _ => AuthError::InvalidSession(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    fn session_cookie(&self, token: &str, max_age: Option<u32>) -> Result<HeaderValue, AuthError> {
        let mut cookie = format!(
            "{}={}; Path={}; HttpOnly; SameSite=Lax",
            self.cookie_name, token, self.base_path
        );
        if let Some(max_age) = max_age {
            cookie.push_str(&format!("; Max-Age={max_age}"));
        }
        HeaderValue::from_str(&cookie).map_err(|e| AuthError::SessionCookie(e.to_string()))
    }

    fn error_url(&self) -> String {
        single_joining_slash(&self.base_path, "/error")
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, parts: &Parts) -> Result<Identity, AuthError> {
        let token = if let Some(header) = parts.headers.get(AUTHORIZATION) {
            let header = header.to_str().map_err(|_| AuthError::MalformedAuthorization)?;
            strict_bearer_token(header).ok_or(AuthError::MalformedAuthorization)?
        } else if let Some(cookie) = parts
            .headers
            .get(COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| token_from_cookie_header(h, &self.cookie_name))
        {
            cookie
        } else {
            return Err(AuthError::NoSession);
        };

        let claims = self.validate_token(token)?;
        debug!("authenticated {}", claims.username());
        Ok(Identity::new(token, claims.username()))
    }

    async fn login(&self, _req: Request<Body>) -> Response {
        let Some(login_url) = &self.login_url else {
            return AuthError::LoginNotConfigured.into_response();
        };
        let separator = if login_url.contains('?') { '&' } else { '?' };
        let target = format!(
            "{login_url}{separator}redirect_uri={}",
            urlencoding::encode(&self.callback_url)
        );
        Redirect::to(&target).into_response()
    }

    async fn logout(&self, _req: Request<Body>) -> Response {
        let target = self
            .logout_redirect
            .clone()
            .unwrap_or_else(|| self.base_path.clone());
        match self.session_cookie("", Some(0)) {
            Ok(cookie) => ([(SET_COOKIE, cookie)], Redirect::to(&target)).into_response(),
            Err(err) => err.into_response(),
        }
    }

    async fn callback(&self, req: Request<Body>) -> Response {
        let Some(token) = query_token(req.uri()) else {
            warn!("login callback without token");
            return Redirect::to(&self.error_url()).into_response();
        };

        if let Err(err) = self.validate_token(&token) {
            warn!("login callback rejected: {}", err);
            return Redirect::to(&self.error_url()).into_response();
        }

        match self.session_cookie(&token, None) {
            Ok(cookie) => ([(SET_COOKIE, cookie)], Redirect::to(&self.base_path)).into_response(),
            Err(err) => err.into_response(),
        }
    }
}
