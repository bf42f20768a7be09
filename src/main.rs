mod app_state;
mod config;
mod deploy;
mod error;
mod github;
mod routes;
mod utils;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{routing::post, Router};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::{build_app_state, AppState};
use crate::config::Config;
use crate::routes::health::health_check;
use crate::routes::webhook_handler::webhook_handler;

// GitHub caps webhook deliveries at 25 MB; axum's default is 2 MB.
const MAX_WEBHOOK_BODY: usize = 25 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = build_app_state(&config);

    info!(
        registry = %config.registry,
        work_dir = %config.work_dir.display(),
        user = %config.credentials.user,
        "configuration loaded"
    );

    let app = router(Arc::new(app_state));

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/github/webhook", post(webhook_handler))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown");
}
