//! HTTP gateway for toolchat.
//!
//! Serves the embedded chat page, the session API under `/api`, and a
//! health check. Turns stream back to the page as server-sent events.
//!
//! Built on Axum.

pub mod api;
pub mod frontend;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, info, warn};

use toolchat_config::AppConfig;
use toolchat_session::SessionStore;

pub use api::{ApiState, SharedApiState};

/// Build the full router: page, session API, health.
///
/// Layers applied:
/// - CORS limited to the page's own origin
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedApiState, origin: &str) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::api_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors_layer(origin))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
        Err(_) => {
            warn!(origin, "Unusable CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

/// Start the gateway HTTP server.
///
/// Model settings are checked before binding so a misconfigured server
/// fails at startup rather than on the first session.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let settings = config.model_settings()?;
    if !config.has_api_key() {
        warn!("No API key configured; provider calls will be rejected");
    }

    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    let addr = format!("{host}:{port}");
    let origin = format!("http://{addr}");

    let provider = toolchat_providers::build_from_config(&config);
    let idle_secs = config.gateway.session_idle_secs;
    let state = Arc::new(ApiState {
        sessions: SessionStore::from_config(config, provider),
    });
    if idle_secs > 0 {
        spawn_session_sweeper(&state, Duration::from_secs(idle_secs));
    }
    let app = build_router(state, &origin);

    info!(addr = %addr, model = %settings.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop sessions idle for longer than `max_idle`.
///
/// The task holds only a weak reference and ends once the state is gone.
pub fn spawn_session_sweeper(state: &SharedApiState, max_idle: Duration) -> JoinHandle<()> {
    let state = Arc::downgrade(state);
    let period = (max_idle / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(state) = state.upgrade() else {
                break;
            };
            let evicted = state.sessions.evict_idle(max_idle).await;
            if evicted > 0 {
                debug!(evicted, "Session sweep");
            }
        }
    })
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
