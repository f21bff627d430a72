//! Startup errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::auth::ConfigValidationError;
use crate::proxy::ProxyError;

/// Failure to build the console from its configuration.
///
/// Returned to the caller instead of aborting; per-request failures never
/// surface here.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid auth config: {0}")]
    Auth(#[from] ConfigValidationError),

    #[error("invalid server config: {0}")]
    Server(String),

    #[error("backend setup failed: {0}")]
    Backend(#[from] ProxyError),

    #[error("cannot load page template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("route {0} registered twice")]
    DuplicateRoute(String),
}
