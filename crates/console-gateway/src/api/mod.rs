//! HTTP API surface shared by the router: error responses and local handlers.

mod error;
mod handlers;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{HealthResponse, VersionResponse, health, version};
