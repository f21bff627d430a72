//! Authentication module.
//!
//! Provides the gate every routed request passes through:
//! - Delegated mode, backed by an [`Authenticator`] (JWT session validation)
//! - Disabled mode with a static identity, optionally honoring caller tokens
//!   per request ("release mode")

mod authenticator;
mod config;
pub mod credential;
mod error;
mod gate;
mod identity;

pub use authenticator::{Authenticator, Claims, JwtAuthenticator};
pub use config::{AuthConfig, AuthMode, ConfigValidationError, StaticUserConfig};
pub use credential::{Credential, CredentialResolver, CredentialSource};
pub use error::AuthError;
pub use gate::AuthGate;
pub use identity::Identity;
