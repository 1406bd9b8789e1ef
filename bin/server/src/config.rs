//! Centralized server configuration.
//!
//! Configuration is loaded via the `config` crate from environment
//! variables, validated once at startup, and then handed to the rest of the
//! server as immutable values. Handlers never read the environment.
//!
//! See [`ProviderConfig`](gatehouse_access::ProviderConfig) for the identity
//! provider settings derived from this configuration.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use axum_extra::extract::cookie::Key;
use gatehouse_access::ProviderConfig;
use rootcause::prelude::Report;
use serde::Deserialize;
use url::Url;

/// Minimum length of the cookie signing secret, in bytes.
pub const MIN_SECRET_KEY_LEN: usize = 64;

/// Server configuration as read from the environment.
///
/// Variable names are matched case-insensitively, so `AUTH0_DOMAIN` fills
/// `auth0_domain`.
#[derive(Deserialize)]
pub struct ServerConfig {
    /// Secret used to sign the session cookie.
    flask_secret_key: String,

    /// OAuth2 client ID registered with the provider.
    auth0_client_id: String,

    /// OAuth2 client secret.
    auth0_client_secret: String,

    /// Provider domain, without scheme.
    auth0_domain: String,

    /// Callback URL registered with the provider.
    auth0_callback_url: String,

    /// Public base URL of this application; the post-logout destination.
    app_base_url: String,

    /// Space-separated scopes to request, when not the provider defaults.
    #[serde(default)]
    auth0_scopes: Option<String>,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Session lifetime in minutes. When set, the cookie outlives the
    /// browser session.
    #[serde(default)]
    session_lifetime_minutes: Option<i64>,
}

fn default_bind_address() -> String {
    "127.0.0.1:5000".to_string()
}

/// Upper bound on a session when no lifetime is configured (31 days).
pub const DEFAULT_SESSION_LIFETIME_MINUTES: i64 = 44_640;

/// Session cookie settings.
#[derive(Clone)]
pub struct SessionConfig {
    /// Key used to sign the session cookie.
    pub cookie_key: Key,
    /// How long a session stays valid after it was last written.
    pub lifetime: chrono::Duration,
    /// Whether the cookie carries `Max-Age` and survives browser restarts.
    pub persistent: bool,
}

impl SessionConfig {
    /// Creates settings for a cookie that ends with the browser session.
    pub fn new(cookie_key: Key, lifetime: chrono::Duration) -> Self {
        Self {
            cookie_key,
            lifetime,
            persistent: false,
        }
    }

    /// Makes the cookie persist for the whole lifetime.
    #[must_use]
    pub fn with_persistent_cookie(mut self) -> Self {
        self.persistent = true;
        self
    }
}

impl ServerConfig {
    /// Loads configuration from process environment variables, merged over
    /// a `.env` file in the working directory if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, Report<ConfigError>> {
        Self::from_env_file(Path::new(".env"))
    }

    /// Loads configuration from the dotenv file at `path` and the process
    /// environment. Variables set in the process win over the file; a missing
    /// file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, or if required
    /// configuration is missing or invalid.
    pub fn from_env_file(path: &Path) -> Result<Self, Report<ConfigError>> {
        let mut vars: HashMap<String, String> = match dotenvy::from_path_iter(path) {
            Ok(entries) => entries
                .collect::<Result<_, _>>()
                .map_err(|e| ConfigError::Load {
                    details: format!("{}: {}", path.display(), e),
                })?,
            Err(e) if e.not_found() => HashMap::new(),
            Err(e) => {
                return Err(ConfigError::Load {
                    details: format!("{}: {}", path.display(), e),
                }
                .into());
            }
        };
        if !vars.is_empty() {
            tracing::debug!(path = %path.display(), "Loaded dotenv file");
        }

        // Non-UTF-8 variables can't be configuration; skip them.
        vars.extend(
            std::env::vars_os()
                .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?))),
        );

        Self::from_environment(config::Environment::default().source(Some(vars)))
    }

    /// Loads configuration from the given environment source.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_environment(source: config::Environment) -> Result<Self, Report<ConfigError>> {
        let config: Self = config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| ConfigError::Load {
                details: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.flask_secret_key.len() < MIN_SECRET_KEY_LEN {
            return Err(ConfigError::WeakSecret {
                length: self.flask_secret_key.len(),
            });
        }

        if self.auth0_domain.trim().is_empty() || self.auth0_domain.contains('/') {
            return Err(ConfigError::InvalidValue {
                name: "AUTH0_DOMAIN",
                details: format!("expected a bare host name, got '{}'", self.auth0_domain),
            });
        }

        for (name, value) in [
            ("AUTH0_CALLBACK_URL", &self.auth0_callback_url),
            ("APP_BASE_URL", &self.app_base_url),
        ] {
            Url::parse(value).map_err(|e| ConfigError::InvalidValue {
                name,
                details: e.to_string(),
            })?;
        }

        if self.session_lifetime_minutes.is_some_and(|minutes| minutes <= 0) {
            return Err(ConfigError::InvalidValue {
                name: "SESSION_LIFETIME_MINUTES",
                details: "must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Returns the identity provider configuration.
    pub fn provider(&self) -> ProviderConfig {
        let provider = ProviderConfig::new(
            self.auth0_domain.clone(),
            self.auth0_client_id.clone(),
            self.auth0_client_secret.clone(),
            self.auth0_callback_url.clone(),
            self.app_base_url.clone(),
        );

        match &self.auth0_scopes {
            Some(scopes) => provider.with_scopes(scopes.clone()),
            None => provider,
        }
    }

    /// Returns the session cookie settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot be used as a signing key.
    pub fn session(&self) -> Result<SessionConfig, ConfigError> {
        let cookie_key =
            Key::try_from(self.flask_secret_key.as_bytes()).map_err(|e| ConfigError::InvalidValue {
                name: "FLASK_SECRET_KEY",
                details: e.to_string(),
            })?;

        let minutes = self
            .session_lifetime_minutes
            .unwrap_or(DEFAULT_SESSION_LIFETIME_MINUTES);
        let session = SessionConfig::new(cookie_key, chrono::Duration::minutes(minutes));

        Ok(match self.session_lifetime_minutes {
            Some(_) => session.with_persistent_cookie(),
            None => session,
        })
    }
}

/// Configuration errors. All are fatal at startup.
#[derive(Debug)]
pub enum ConfigError {
    /// A variable is missing or could not be parsed.
    Load { details: String },
    /// The cookie signing secret is too short.
    WeakSecret { length: usize },
    /// A variable is present but unusable.
    InvalidValue {
        name: &'static str,
        details: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { details } => write!(f, "failed to load configuration: {}", details),
            Self::WeakSecret { length } => write!(
                f,
                "FLASK_SECRET_KEY must be at least {} bytes, got {}",
                MIN_SECRET_KEY_LEN, length
            ),
            Self::InvalidValue { name, details } => {
                write!(f, "invalid value for {}: {}", name, details)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
