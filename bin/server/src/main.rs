use std::net::SocketAddr;
use std::sync::Arc;

use gatehouse_server::{
    app,
    auth::{AppState, OidcClient},
    config::ServerConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    let session_config = config
        .session()
        .expect("failed to build session configuration");
    tracing::info!("Loaded configuration");

    // Initialize OIDC client
    tracing::info!("Discovering OIDC provider...");
    let oidc_client = OidcClient::discover(config.provider())
        .await
        .expect("failed to discover OIDC provider");
    tracing::info!(
        issuer = %oidc_client.config().issuer_url(),
        "Discovered OIDC provider"
    );

    let provider_config = oidc_client.config().clone();
    let app_state = AppState::new(Arc::new(oidc_client), provider_config, session_config);
    let app = app::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
