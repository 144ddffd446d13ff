//! Axum server: WebSocket relay, health check, and static presentation assets.

use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::connection::handle_ws_connection;
use crate::state::GatewayState;

/// Build the gateway router.
///
/// `/ws` and `/health` take priority; every other path is looked up in the
/// static directory.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway and serve until Ctrl+C.
pub async fn start_gateway(state: Arc<GatewayState>, bind_addr: &str) -> anyhow::Result<()> {
    if state.static_dir.is_dir() {
        info!(dir = %state.static_dir.display(), "Serving static assets");
    } else {
        warn!(dir = %state.static_dir.display(), "Static directory not found, only /ws and /health are served");
    }

    let app = build_router(state.clone());

    let addr = format!("{bind_addr}:{}", state.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Splitboard relay listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(state, socket))
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let stats = state.hub.stats().await;

    axum::Json(json!({
        "status": "ok",
        "port": state.port,
        "version": env!("CARGO_PKG_VERSION"),
        "connections": stats.connections,
        "sides": stats.sides,
    }))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(%e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_port() {
        let state = Arc::new(GatewayState::new(4321, "/nonexistent/splitboard".into()));
        let resp = build_router(state).oneshot(request("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["port"], 4321);
        assert_eq!(json["connections"], 0);
        assert_eq!(json["sides"]["left"], 0);
    }

    #[tokio::test]
    async fn test_serves_static_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("board.html"), "<canvas id=\"board\"></canvas>").unwrap();
        let state = Arc::new(GatewayState::new(0, dir.path().to_path_buf()));

        let resp = build_router(state).oneshot(request("/board.html")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<canvas id=\"board\"></canvas>");
    }

    #[tokio::test]
    async fn test_missing_static_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(GatewayState::new(0, dir.path().to_path_buf()));

        let resp = build_router(state).oneshot(request("/nope.js")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
