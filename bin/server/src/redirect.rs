//! `302 Found` redirects.
//!
//! axum's `Redirect` only offers 303, 307, and 308; browsers and the
//! identity provider flow here expect plain 302s.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// A `302 Found` response pointing at `location`.
#[derive(Debug, Clone)]
pub struct Found(String);

impl Found {
    pub fn to(location: impl Into<String>) -> Self {
        Self(location.into())
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        match HeaderValue::try_from(self.0) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Redirect target is not a valid header value");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
