//! Bearer credential resolution.
//!
//! Precedence for the outbound token is: `Authorization` header, then the
//! `token` query parameter, then the static identity's token. Exactly one
//! source wins per request.

use axum::http::{HeaderMap, Uri, header::AUTHORIZATION};

/// Query parameter carrying a token (browsers can't set headers on some requests).
pub const TOKEN_QUERY_PARAM: &str = "token";

const BEARER_SCHEME: &str = "Bearer";

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Header,
    Query,
    Static,
}

/// A resolved bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub source: CredentialSource,
}

/// Computes the effective bearer token for a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialResolver;

impl CredentialResolver {
    /// Resolve the token for a request, falling back to `static_token`.
    pub fn resolve(&self, headers: &HeaderMap, uri: &Uri, static_token: &str) -> Credential {
        if let Some(token) = header_token(headers) {
            return Credential {
                token,
                source: CredentialSource::Header,
            };
        }

        if let Some(token) = query_token(uri) {
            return Credential {
                token,
                source: CredentialSource::Query,
            };
        }

        Credential {
            token: static_token.to_string(),
            source: CredentialSource::Static,
        }
    }
}

/// Token from the `Authorization` header.
///
/// The `Bearer` scheme is stripped when present; any other value is taken as
/// the raw token. A bare scheme or an empty value counts as absent.
pub fn header_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = match value.trim_start().strip_prefix(BEARER_SCHEME) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => value.trim(),
    };
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Non-empty, URL-decoded `token` query parameter.
pub fn query_token(uri: &Uri) -> Option<String> {
    uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key != TOKEN_QUERY_PARAM || value.is_empty() {
            return None;
        }
        urlencoding::decode(value).ok().map(|s| s.into_owned())
    })
}

/// Strictly parse `Bearer <token>` (scheme case-insensitive, single token).
pub fn strict_bearer_token(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(token)
}
