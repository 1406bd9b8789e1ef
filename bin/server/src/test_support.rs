//! Shared helpers for the server's unit tests.

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{body::Body, extract::ConnectInfo, response::Response};
use axum_extra::extract::cookie::Key;
use gatehouse_access::{IdentityClaims, PendingLogin, ProviderConfig};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use crate::{
    auth::{
        AppState,
        oidc::{AuthorizationRedirect, AuthorizationResponse, IdentityProvider, OidcError},
    },
    config::SessionConfig,
};

pub const STUB_STATE: &str = "stub-state";
pub const GOOD_CODE: &str = "good-code";
pub const UNREACHABLE_CODE: &str = "unreachable";

/// Collects formatted log lines written while installed.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Routes this thread's tracing output into the buffer until the guard
    /// is dropped.
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        let buf = self.0.lock().expect("log buffer poisoned");
        String::from_utf8_lossy(&buf)
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// The peer address tests attach to requests.
pub fn peer() -> ConnectInfo<SocketAddr> {
    ConnectInfo(SocketAddr::from(([203, 0, 113, 7], 51234)))
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn request(uri: &str, cookie: Option<&str>) -> axum::http::Request<Body> {
    let mut builder = axum::http::Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(axum::http::header::COOKIE, cookie);
    }
    let mut request = builder.body(Body::empty()).expect("request");
    request.extensions_mut().insert(peer());
    request
}

/// Returns the `name=value` pair of the session cookie set by a response.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("flask_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .expect("location header")
        .to_str()
        .expect("ascii location")
        .to_string()
}

pub fn provider_config() -> ProviderConfig {
    ProviderConfig::new(
        "tenant.example.com".to_string(),
        "client-id".to_string(),
        "client-secret".to_string(),
        "https://app.example.com/callback".to_string(),
        "https://app.example.com".to_string(),
    )
}

pub fn alice() -> IdentityClaims {
    IdentityClaims::new("auth0|alice".to_string())
        .with_email(Some("alice@example.com".to_string()))
        .with_name(Some("Alice Example".to_string()))
}

/// Provider double: accepts [`GOOD_CODE`], refuses anything else, and
/// simulates an outage for [`UNREACHABLE_CODE`].
pub struct StubProvider {
    config: ProviderConfig,
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn authorization_redirect(
        &self,
        callback_url: &str,
    ) -> Result<AuthorizationRedirect, OidcError> {
        let url = url::Url::parse_with_params(
            &format!("https://{}/authorize", self.config.domain()),
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id()),
                ("redirect_uri", callback_url),
                ("scope", "openid profile email"),
                ("state", STUB_STATE),
            ],
        )
        .map_err(|e| OidcError::Configuration(e.to_string()))?;

        Ok(AuthorizationRedirect {
            url: url.to_string(),
            pending: PendingLogin {
                csrf_token: STUB_STATE.to_string(),
                pkce_verifier: "stub-verifier".to_string(),
                nonce: "stub-nonce".to_string(),
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
        match response.code.as_str() {
            GOOD_CODE => Ok(alice()),
            UNREACHABLE_CODE => Err(OidcError::Transport("connection refused".to_string())),
            _ => Err(OidcError::TokenExchange("invalid_grant".to_string())),
        }
    }
}

pub fn test_state() -> AppState {
    let config = provider_config();
    AppState::new(
        Arc::new(StubProvider {
            config: config.clone(),
        }),
        config,
        SessionConfig::new(
            Key::from(&[42u8; 64][..]),
            chrono::Duration::minutes(30),
        ),
    )
}
