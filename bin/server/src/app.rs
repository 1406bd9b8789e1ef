//! Router assembly.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    auth::{self, AppState},
    pages,
};

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/login", get(auth::login))
        .route("/callback", get(auth::callback))
        .route("/dashboard", get(pages::dashboard))
        .route("/logout", get(auth::logout))
        .route("/protected", get(pages::protected))
        .layer(axum::middleware::from_fn(auth::audit_unauthorized))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
