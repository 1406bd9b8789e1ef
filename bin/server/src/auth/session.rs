//! Signed-cookie session store.
//!
//! The whole session lives in the `flask_session` cookie as an encoded
//! [`SessionData`], signed with the server key. A cookie that is missing,
//! unsigned, tampered with, undecodable, or expired reads as an empty
//! session.

use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, SameSite},
};
use chrono::Utc;
use gatehouse_access::{IdentityClaims, PendingLogin, SessionData};
use time::Duration as TimeDuration;

use super::AppState;
use crate::config::SessionConfig;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "flask_session";

/// What the response must do to the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Unchanged,
    Updated,
    Cleared,
}

/// The current request's session.
///
/// Extract it in a handler, mutate it, and return it as part of the response
/// so the cookie is rewritten. Untouched sessions emit no `Set-Cookie`.
pub struct CookieSession {
    jar: SignedCookieJar,
    data: SessionData,
    lifetime: chrono::Duration,
    persistent: bool,
    change: Change,
}

impl<S> FromRequestParts<S> for CookieSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let jar = SignedCookieJar::from_headers(
            &parts.headers,
            app_state.session_config.cookie_key.clone(),
        );

        Ok(Self::load(jar, &app_state.session_config))
    }
}

impl CookieSession {
    /// Reads the session out of a signed cookie jar.
    pub fn load(jar: SignedCookieJar, config: &SessionConfig) -> Self {
        let data = match jar.get(SESSION_COOKIE) {
            Some(cookie) => match SessionData::decode(cookie.value(), Utc::now()) {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring unusable session cookie");
                    SessionData::default()
                }
            },
            None => SessionData::default(),
        };

        Self {
            jar,
            data,
            lifetime: config.lifetime,
            persistent: config.persistent,
            change: Change::Unchanged,
        }
    }

    /// Returns the signed-in user's claims, if any.
    pub fn user(&self) -> Option<&IdentityClaims> {
        self.data.user()
    }

    /// Returns true if a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.data.is_authenticated()
    }

    /// Stores the signed-in user, replacing any previous one.
    pub fn set_user(&mut self, claims: IdentityClaims) {
        self.data.set_user(claims);
        self.change = Change::Updated;
    }

    /// Records the state of a login handed off to the provider.
    pub fn begin_login(&mut self, pending: PendingLogin) {
        self.data.set_pending_login(pending);
        self.change = Change::Updated;
    }

    /// Removes and returns the state of the login in progress.
    pub fn take_pending(&mut self) -> Option<PendingLogin> {
        let pending = self.data.take_pending_login();
        if pending.is_some() && self.change == Change::Unchanged {
            self.change = Change::Updated;
        }
        pending
    }

    /// Ends the session.
    pub fn clear(&mut self) {
        self.data = SessionData::default();
        self.change = Change::Cleared;
    }

    fn into_jar(mut self) -> SignedCookieJar {
        match self.change {
            Change::Unchanged => self.jar,
            Change::Cleared => self.jar.add(removal_cookie()),
            Change::Updated => {
                self.data.refresh_expiry(Utc::now(), self.lifetime);
                match self.data.encode() {
                    Ok(value) => {
                        let max_age = self.persistent.then_some(self.lifetime);
                        self.jar.add(session_cookie(value, max_age))
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode session; clearing it");
                        self.jar.add(removal_cookie())
                    }
                }
            }
        }
    }
}

impl IntoResponseParts for CookieSession {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        self.into_jar().into_response_parts(res)
    }
}

/// Builds the session cookie.
///
/// Without `max_age` the cookie ends with the browser session; the signed
/// `expires_at` still bounds it either way.
///
/// `SameSite=None` is required because the callback arrives as a cross-site
/// navigation from the provider; browsers only accept that with `Secure`.
fn session_cookie(value: String, max_age: Option<chrono::Duration>) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None);
    if let Some(max_age) = max_age {
        cookie = cookie.max_age(TimeDuration::seconds(max_age.num_seconds()));
    }
    cookie.build()
}

/// Builds the cookie that deletes the session cookie.
fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .max_age(TimeDuration::ZERO)
        .build()
}
