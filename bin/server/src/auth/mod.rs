//! Authentication module for the gatehouse server.
//!
//! This module provides:
//! - The authorization-code flow against the configured OIDC provider
//! - The signed-cookie session store
//! - Login, callback, and logout routes
//! - Client IP extraction and 401 auditing
//!
//! # Session Model
//!
//! There is no server-side session table. The identity claims returned by
//! the provider are stored in a signed cookie and trusted until it expires.
//! Logging out deletes the cookie and sends the browser to the provider's
//! end-session endpoint.

pub mod middleware;
pub mod oidc;
pub mod routes;
pub mod session;

use std::sync::Arc;

use gatehouse_access::ProviderConfig;

use crate::config::SessionConfig;

pub use middleware::{ClientIp, audit_unauthorized};
pub use oidc::{IdentityProvider, OidcClient, OidcError};
pub use routes::{callback, login, logout};
pub use session::CookieSession;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The identity provider logins are delegated to.
    pub provider: Arc<dyn IdentityProvider>,
    /// Provider settings (callback and end-session URLs).
    pub provider_config: Arc<ProviderConfig>,
    /// Session cookie settings.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        provider_config: ProviderConfig,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            provider,
            provider_config: Arc::new(provider_config),
            session_config,
        }
    }
}
