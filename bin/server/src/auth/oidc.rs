//! OIDC client implementation using the openidconnect crate.
//!
//! Handlers only see the [`IdentityProvider`] trait. [`OidcClient`] is the
//! production implementation; tests substitute a stub.

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatehouse_access::{IdentityClaims, PendingLogin, ProviderConfig};
use openidconnect::core::{CoreAuthenticationFlow, CoreClient, CoreProviderMetadata};
use openidconnect::{
    AuthorizationCode, ClientId, ClientSecret, CsrfToken, IssuerUrl, Nonce, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, RequestTokenError, Scope, TokenResponse,
};
use rootcause::prelude::Report;

/// Where to send the browser to log in, plus the state to keep until it
/// comes back.
#[derive(Debug, Clone)]
pub struct AuthorizationRedirect {
    pub url: String,
    pub pending: PendingLogin,
}

/// The `code` and `state` the provider hands back on the callback.
#[derive(Debug, Clone)]
pub struct AuthorizationResponse {
    pub code: String,
    pub state: String,
}

/// The authorization-code flow against one identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Builds the provider authorization URL for a login that should return
    /// to `callback_url`.
    fn authorization_redirect(&self, callback_url: &str)
    -> Result<AuthorizationRedirect, OidcError>;

    /// Exchanges the authorization code for verified identity claims.
    async fn exchange_code(
        &self,
        response: &AuthorizationResponse,
        pending: &PendingLogin,
    ) -> Result<IdentityClaims, OidcError>;
}

/// OIDC client for authenticating users.
pub struct OidcClient {
    provider_metadata: CoreProviderMetadata,
    client_id: ClientId,
    client_secret: ClientSecret,
    http_client: reqwest::Client,
    config: ProviderConfig,
}

impl OidcClient {
    /// Creates a new OIDC client by discovering the provider metadata.
    pub async fn discover(config: ProviderConfig) -> Result<Self, Report<OidcError>> {
        let issuer_url = IssuerUrl::new(config.issuer_url())
            .map_err(|e| OidcError::Configuration(format!("invalid issuer URL: {}", e)))?;

        let http_client = http_client()?;

        let provider_metadata = CoreProviderMetadata::discover_async(issuer_url, &http_client)
            .await
            .map_err(|e| OidcError::Discovery(format!("failed to discover provider: {}", e)))?;

        Ok(Self::from_metadata(provider_metadata, http_client, config))
    }

    /// Creates a client from already-known provider metadata.
    pub fn from_metadata(
        provider_metadata: CoreProviderMetadata,
        http_client: reqwest::Client,
        config: ProviderConfig,
    ) -> Self {
        let client_id = ClientId::new(config.client_id().to_string());
        let client_secret = ClientSecret::new(config.client_secret().to_string());

        Self {
            provider_metadata,
            client_id,
            client_secret,
            http_client,
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn redirect_url(callback_url: &str) -> Result<RedirectUrl, OidcError> {
        RedirectUrl::new(callback_url.to_string())
            .map_err(|e| OidcError::Configuration(format!("invalid redirect URI: {}", e)))
    }
}

/// Builds the HTTP client used for provider calls.
///
/// Redirects are disabled to prevent SSRF through the token endpoint.
pub fn http_client() -> Result<reqwest::Client, OidcError> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| OidcError::Configuration(format!("failed to create HTTP client: {}", e)))
}

#[async_trait]
impl IdentityProvider for OidcClient {
    fn authorization_redirect(
        &self,
        callback_url: &str,
    ) -> Result<AuthorizationRedirect, OidcError> {
        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(Self::redirect_url(callback_url)?);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = client
            .authorize_url(
                CoreAuthenticationFlow::AuthorizationCode,
                CsrfToken::new_random,
                Nonce::new_random,
            )
            .set_pkce_challenge(pkce_challenge);

        // `openid` is always sent by the client
        for scope in self.config.scopes() {
            if scope != "openid" {
                auth_request = auth_request.add_scope(Scope::new(scope.to_string()));
            }
        }

        let (auth_url, csrf_token, nonce) = auth_request.url();

        Ok(AuthorizationRedirect {
            url: auth_url.to_string(),
            pending: PendingLogin {
                csrf_token: csrf_token.secret().clone(),
                pkce_verifier: pkce_verifier.secret().clone(),
                nonce: nonce.secret().clone(),
            },
        })
    }

    async fn exchange_code(
        &self,
        response: &AuthorizationResponse,
        pending: &PendingLogin,
    ) -> Result<IdentityClaims, OidcError> {
        if response.state != pending.csrf_token {
            return Err(OidcError::StateMismatch);
        }

        let client = CoreClient::from_provider_metadata(
            self.provider_metadata.clone(),
            self.client_id.clone(),
            Some(self.client_secret.clone()),
        )
        .set_redirect_uri(Self::redirect_url(self.config.callback_url())?);

        let token_response = client
            .exchange_code(AuthorizationCode::new(response.code.clone()))
            .map_err(|e| OidcError::Configuration(format!("token endpoint error: {}", e)))?
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| match e {
                RequestTokenError::ServerResponse(err) => {
                    OidcError::TokenExchange(format!("provider rejected code: {}", err))
                }
                other => OidcError::Transport(format!("token exchange failed: {}", other)),
            })?;

        let id_token = token_response
            .id_token()
            .ok_or_else(|| OidcError::TokenValidation("no ID token in response".to_string()))?;

        let nonce = Nonce::new(pending.nonce.clone());
        let claims = id_token
            .claims(&client.id_token_verifier(), &nonce)
            .map_err(|e| {
                OidcError::TokenValidation(format!("ID token validation failed: {}", e))
            })?;

        let email = claims.email().map(|e| e.as_str().to_string());
        let name = claims
            .name()
            .and_then(|n| n.get(None))
            .map(|n| n.as_str().to_string());
        let nickname = claims
            .nickname()
            .and_then(|n| n.get(None))
            .map(|n| n.as_str().to_string());

        Ok(IdentityClaims::new(claims.subject().to_string())
            .with_email(email)
            .with_email_verified(claims.email_verified())
            .with_name(name)
            .with_nickname(nickname)
            .with_issuer(Some(claims.issuer().to_string())))
    }
}

/// OIDC-related errors.
#[derive(Debug)]
pub enum OidcError {
    /// Configuration error (invalid URLs, etc.)
    Configuration(String),
    /// Failed to discover provider metadata.
    Discovery(String),
    /// The callback `state` does not match the one sent at login.
    StateMismatch,
    /// The callback arrived without a login in progress.
    MissingLoginState,
    /// The callback is missing a required query parameter.
    MissingParameter(&'static str),
    /// The provider reported an error instead of a code.
    ProviderRejected { error: String, description: String },
    /// The token endpoint refused the code.
    TokenExchange(String),
    /// The ID token failed verification.
    TokenValidation(String),
    /// The provider could not be reached or returned garbage.
    Transport(String),
}

impl OidcError {
    /// Returns true if this error means the login itself was refused,
    /// as opposed to the gateway or provider being broken.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::StateMismatch
                | Self::MissingLoginState
                | Self::MissingParameter(_)
                | Self::ProviderRejected { .. }
                | Self::TokenExchange(_)
                | Self::TokenValidation(_)
        )
    }
}

impl std::fmt::Display for OidcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "OIDC configuration error: {}", msg),
            Self::Discovery(msg) => write!(f, "OIDC discovery error: {}", msg),
            Self::StateMismatch => write!(f, "OIDC state mismatch"),
            Self::MissingLoginState => write!(f, "no login in progress"),
            Self::MissingParameter(name) => write!(f, "callback is missing '{}'", name),
            Self::ProviderRejected { error, description } => {
                write!(f, "provider returned '{}': {}", error, description)
            }
            Self::TokenExchange(msg) => write!(f, "OIDC token exchange error: {}", msg),
            Self::TokenValidation(msg) => write!(f, "OIDC token validation error: {}", msg),
            Self::Transport(msg) => write!(f, "OIDC transport error: {}", msg),
        }
    }
}

impl std::error::Error for OidcError {}

impl IntoResponse for OidcError {
    fn into_response(self) -> Response {
        if self.is_auth_failure() {
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }

        tracing::error!(error = %self, "identity provider failure");
        match self {
            Self::Transport(_) | Self::Discovery(_) => {
                (StatusCode::BAD_GATEWAY, "Identity provider unavailable").into_response()
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openidconnect::core::{
        CoreJwsSigningAlgorithm, CoreResponseType, CoreSubjectIdentifierType,
    };
    use openidconnect::{
        AuthUrl, EmptyAdditionalProviderMetadata, JsonWebKeySetUrl, ResponseTypes, TokenUrl,
    };
    use std::collections::HashMap;

    fn provider_config() -> ProviderConfig {
        ProviderConfig::new(
            "tenant.example.com".to_string(),
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/callback".to_string(),
            "https://app.example.com".to_string(),
        )
    }

    fn client() -> OidcClient {
        let metadata = CoreProviderMetadata::new(
            IssuerUrl::new("https://tenant.example.com/".to_string()).expect("issuer"),
            AuthUrl::new("https://tenant.example.com/authorize".to_string()).expect("auth url"),
            JsonWebKeySetUrl::new("https://tenant.example.com/.well-known/jwks.json".to_string())
                .expect("jwks url"),
            vec![ResponseTypes::new(vec![CoreResponseType::Code])],
            vec![CoreSubjectIdentifierType::Public],
            vec![CoreJwsSigningAlgorithm::RsaSsaPkcs1V15Sha256],
            EmptyAdditionalProviderMetadata {},
        )
        .set_token_endpoint(Some(
            TokenUrl::new("https://tenant.example.com/oauth/token".to_string())
                .expect("token url"),
        ));

        OidcClient::from_metadata(metadata, http_client().expect("http client"), provider_config())
    }

    fn query(url: &str) -> HashMap<String, String> {
        url::Url::parse(url)
            .expect("valid url")
            .query_pairs()
            .into_owned()
            .collect()
    }

    #[test]
    fn authorization_redirect_targets_provider_endpoint() {
        let redirect = client()
            .authorization_redirect("https://app.example.com/callback")
            .expect("redirect");

        assert!(
            redirect
                .url
                .starts_with("https://tenant.example.com/authorize?")
        );

        let params = query(&redirect.url);
        assert_eq!(params["client_id"], "client-id");
        assert_eq!(params["redirect_uri"], "https://app.example.com/callback");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["code_challenge_method"], "S256");
        assert!(params.contains_key("code_challenge"));
    }

    #[test]
    fn authorization_redirect_requests_configured_scopes_once() {
        let redirect = client()
            .authorization_redirect("https://app.example.com/callback")
            .expect("redirect");

        let params = query(&redirect.url);
        let scopes: Vec<&str> = params["scope"].split(' ').collect();
        assert_eq!(scopes, vec!["openid", "profile", "email"]);
    }

    #[test]
    fn pending_login_matches_url_state_and_nonce() {
        let redirect = client()
            .authorization_redirect("https://app.example.com/callback")
            .expect("redirect");

        let params = query(&redirect.url);
        assert_eq!(params["state"], redirect.pending.csrf_token);
        assert_eq!(params["nonce"], redirect.pending.nonce);
        assert!(!redirect.pending.pkce_verifier.is_empty());
    }

    #[test]
    fn each_redirect_uses_fresh_state() {
        let client = client();
        let first = client
            .authorization_redirect("https://app.example.com/callback")
            .expect("redirect");
        let second = client
            .authorization_redirect("https://app.example.com/callback")
            .expect("redirect");

        assert_ne!(first.pending.csrf_token, second.pending.csrf_token);
        assert_ne!(first.pending.nonce, second.pending.nonce);
    }

    #[test]
    fn invalid_callback_url_is_a_configuration_error() {
        let result = client().authorization_redirect("not a url");
        assert!(matches!(result, Err(OidcError::Configuration(_))));
    }

    #[tokio::test]
    async fn mismatched_state_is_rejected_before_any_request() {
        let pending = PendingLogin {
            csrf_token: "expected".to_string(),
            pkce_verifier: "verifier".to_string(),
            nonce: "nonce".to_string(),
        };
        let response = AuthorizationResponse {
            code: "code".to_string(),
            state: "forged".to_string(),
        };

        let result = client().exchange_code(&response, &pending).await;
        assert!(matches!(result, Err(OidcError::StateMismatch)));
    }

    #[test]
    fn auth_failures_map_to_unauthorized() {
        assert!(OidcError::StateMismatch.is_auth_failure());
        assert!(OidcError::TokenExchange("invalid_grant".to_string()).is_auth_failure());
        assert!(!OidcError::Transport("connection refused".to_string()).is_auth_failure());

        let response = OidcError::MissingLoginState.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = OidcError::Transport("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
