//! # Web Server Crate
//!
//! A small HTTP control surface over a running [`Bot`]: status, the binding table, aggregated
//! accounts, and the pause/resume/kill-switch lifecycle requests.

use axum::{
    Router,
    routing::{get, post},
};
use engine::Bot;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
pub struct AppState {
    pub bot: Arc<Bot>,
}

/// Builds the application router over `bot`.
pub fn router(bot: Arc<Bot>) -> Router {
    let app_state = Arc::new(AppState { bot });
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/status", get(handlers::get_status))
        .route("/api/strategies", get(handlers::get_strategies))
        .route("/api/accounts", get(handlers::get_accounts))
        .route("/api/bot/pause", post(handlers::pause))
        .route("/api/bot/resume", post(handlers::resume))
        .route("/api/bot/kill-switch", post(handlers::set_kill_switch))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serves the control surface on `addr` until `shutdown` resolves.
pub async fn run_server<F>(addr: SocketAddr, bot: Arc<Bot>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(bot);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server started and listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Web server stopped.");
    Ok(())
}
