//! HTTP gateway for Parlance.
//!
//! Exposes the agent loop over a small JSON API: chat, session listing and
//! removal, agent info, the tool catalogue and health checks.

pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use parlance_agent::AgentLoop;
use parlance_provider::Provider;

/// Agent loop over a type-erased provider, shared by all requests.
pub type SharedAgent = Arc<AgentLoop<Arc<dyn Provider>>>;

/// Shared application state for the gateway.
#[derive(Clone)]
pub struct GatewayState {
    pub agent: SharedAgent,
}

impl GatewayState {
    pub fn new(agent: SharedAgent) -> Self {
        Self { agent }
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers: permissive CORS, 1 MB request body limit, HTTP trace logging.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/health", get(handlers::health_handler))
        .route("/chat", post(handlers::chat_handler))
        .route("/sessions", get(handlers::list_sessions_handler))
        .route(
            "/sessions/{id}",
            get(handlers::get_session_handler).delete(handlers::delete_session_handler),
        )
        .route("/tools", get(handlers::list_tools_handler))
        .route("/agent/info", get(handlers::agent_info_handler))
        .route("/agent/info/{id}", get(handlers::session_info_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(agent: SharedAgent, addr: &str) -> std::io::Result<()> {
    let app = build_router(GatewayState::new(agent));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "◆ GATEWAY ONLINE");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("◆ GATEWAY OFFLINE");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
