//! Authentication routes for login, callback, and logout.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use gatehouse_access::{AuditEvent, IdentityClaims, PendingLogin};
use serde::Deserialize;

use super::{
    AppState, ClientIp, CookieSession,
    oidc::{AuthorizationResponse, OidcError},
};
use crate::redirect::Found;

/// Where a completed login lands.
pub const AFTER_LOGIN: &str = "/dashboard";

/// Query parameters for the OIDC callback.
///
/// Either `code` and `state`, or `error` (with an optional description)
/// when the provider refused the login.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Initiates the OIDC login flow by redirecting to the identity provider.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    mut session: CookieSession,
) -> Result<(CookieSession, Found), OidcError> {
    AuditEvent::LoginAttempt { ip }.emit();

    let redirect = state
        .provider
        .authorization_redirect(state.provider_config.callback_url())?;

    session.begin_login(redirect.pending);

    Ok((session, Found::to(redirect.url)))
}

/// Handles the OIDC callback after the user authenticates with the identity provider.
///
/// The pending login is consumed whether or not the exchange succeeds, so a
/// callback can never be replayed.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    mut session: CookieSession,
) -> Response {
    let pending = session.take_pending();

    match complete_login(&state, query, pending).await {
        Ok(claims) => {
            AuditEvent::LoginSuccess {
                user_id: &claims.sub,
                email: claims.email.as_deref(),
            }
            .emit();

            session.set_user(claims);
            (session, Found::to(AFTER_LOGIN)).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login callback failed");
            (session, e).into_response()
        }
    }
}

async fn complete_login(
    state: &AppState,
    query: CallbackQuery,
    pending: Option<PendingLogin>,
) -> Result<IdentityClaims, OidcError> {
    if let Some(error) = query.error {
        return Err(OidcError::ProviderRejected {
            error,
            description: query.error_description.unwrap_or_default(),
        });
    }

    let code = query.code.ok_or(OidcError::MissingParameter("code"))?;
    let returned_state = query.state.ok_or(OidcError::MissingParameter("state"))?;
    let pending = pending.ok_or(OidcError::MissingLoginState)?;

    let response = AuthorizationResponse {
        code,
        state: returned_state,
    };

    state.provider.exchange_code(&response, &pending).await
}

/// Logs out the user by clearing their session and ending the provider session.
pub async fn logout(State(state): State<AppState>, mut session: CookieSession) -> Response {
    if let Some(user) = session.user() {
        tracing::info!(user_id = %user.sub, "User logged out");
    }
    session.clear();

    match state.provider_config.end_session_url() {
        Ok(url) => (session, Found::to(url.to_string())).into_response(),
        Err(e) => {
            // The local session is gone either way; fall back to the home page.
            tracing::error!(error = %e, "Failed to build end-session URL");
            (session, Found::to("/")).into_response()
        }
    }
}
