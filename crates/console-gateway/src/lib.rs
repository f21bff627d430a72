//! Front-door router for the web console.
//!
//! Every request is matched against a route table built at startup, passed
//! through the auth gate when the route needs an identity, and then served
//! locally (index page, static assets, utility endpoints) or forwarded to one
//! of the configured backends.

pub mod api;
pub mod auth;
pub mod backends;
pub mod config;
pub mod error;
pub mod helm;
pub mod paths;
pub mod proxy;
pub mod relay;
pub mod router;
pub mod shell;

pub use config::AppConfig;
pub use error::StartupError;
pub use router::{Console, create_router};
