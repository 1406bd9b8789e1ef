//! Identity provider configuration.
//!
//! The gateway talks to exactly one Auth0-style provider, identified by its
//! domain. Issuer, discovery, and end-session URLs are all derived from that
//! domain.

use url::Url;

/// Scopes requested unless configured otherwise.
pub const DEFAULT_SCOPES: &str = "openid profile email";

/// Configuration for the OIDC identity provider.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider domain (e.g., "tenant.eu.auth0.com").
    domain: String,
    /// The OAuth2 client ID registered with the provider.
    client_id: String,
    /// The OAuth2 client secret.
    client_secret: String,
    /// Where the provider sends the browser after login.
    callback_url: String,
    /// Where the provider sends the browser after logout.
    post_logout_redirect: String,
    /// Space-separated scopes to request.
    scopes: String,
}

impl ProviderConfig {
    /// Creates a provider configuration with the default scopes.
    #[must_use]
    pub fn new(
        domain: String,
        client_id: String,
        client_secret: String,
        callback_url: String,
        post_logout_redirect: String,
    ) -> Self {
        Self {
            domain,
            client_id,
            client_secret,
            callback_url,
            post_logout_redirect,
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }

    /// Replaces the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: String) -> Self {
        self.scopes = scopes;
        self
    }

    /// Returns the provider domain.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the OAuth2 callback URL.
    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Returns the post-logout redirect base.
    #[must_use]
    pub fn post_logout_redirect(&self) -> &str {
        &self.post_logout_redirect
    }

    /// Returns the requested scopes.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scopes.split_whitespace().collect()
    }

    /// Returns the issuer URL. Auth0 issuers carry a trailing slash.
    #[must_use]
    pub fn issuer_url(&self) -> String {
        format!("https://{}/", self.domain)
    }

    /// Returns the discovery document URL.
    #[must_use]
    pub fn discovery_url(&self) -> String {
        format!("{}.well-known/openid-configuration", self.issuer_url())
    }

    /// Returns the end-session URL the browser is sent to on logout.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain does not form a valid URL.
    pub fn end_session_url(&self) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            &format!("https://{}/v2/logout", self.domain),
            &[
                ("returnTo", self.post_logout_redirect.as_str()),
                ("client_id", self.client_id.as_str()),
            ],
        )
    }
}
