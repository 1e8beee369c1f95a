//! HTTP exporter for a live prediction session.
//!
//! Routes:
//! - `/metrics` Prometheus text for the registry
//! - `/session` JSON of the latest [`MetricsSnapshot`]
//! - `/health` `200` once a model is producing predictions, `503` while
//!   the sequence buffer is still filling

use crate::capture::MetricsConfig;
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::prediction::StreamState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Errors from the session exporter.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("metrics export is disabled (port 0)")]
    Disabled,

    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Where the exporter listens.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::from(&MetricsConfig::default())
    }
}

impl MetricsServerConfig {
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

impl From<&MetricsConfig> for MetricsServerConfig {
    fn from(config: &MetricsConfig) -> Self {
        Self::with_port(config.port)
    }
}

/// Registry plus the snapshot it was last updated from.
pub struct MetricsState {
    registry: MetricsRegistry,
    latest: MetricsSnapshot,
}

impl MetricsState {
    /// Feeds a new session snapshot into the registry.
    pub fn update(&mut self, snapshot: MetricsSnapshot) {
        self.registry.update(&snapshot);
        self.latest = snapshot;
    }

    pub fn latest(&self) -> &MetricsSnapshot {
        &self.latest
    }
}

pub type SharedState = Arc<RwLock<MetricsState>>;

/// Serves the registry of one prediction session over HTTP.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: SharedState,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(MetricsState {
                registry,
                latest: MetricsSnapshot::default(),
            })),
        }
    }

    /// Handle the prediction loop writes snapshots through.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Serves until the task is dropped or the listener fails.
    pub async fn run(self) -> Result<(), ServerError> {
        if self.config.bind_addr.port() == 0 {
            return Err(ServerError::Disabled);
        }

        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Session exporter listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))
    }
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/session", get(session_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn metrics_handler(State(state): State<SharedState>) -> Response {
    match state.read().await.registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

async fn session_handler(State(state): State<SharedState>) -> Json<MetricsSnapshot> {
    Json(state.read().await.latest.clone())
}

async fn health_handler(State(state): State<SharedState>) -> (StatusCode, &'static str) {
    let filling = StreamState::Filling.as_gauge();
    if state.read().await.latest.stream_state == filling {
        (StatusCode::SERVICE_UNAVAILABLE, "filling")
    } else {
        (StatusCode::OK, "OK")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn server() -> MetricsServer {
        MetricsServer::new(MetricsServerConfig::default(), MetricsRegistry::new().unwrap())
    }

    #[test]
    fn test_port_comes_from_file_section() {
        assert_eq!(MetricsServerConfig::default().bind_addr.port(), 9090);
        let config = MetricsServerConfig::from(&MetricsConfig { port: 8080 });
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[tokio::test]
    async fn test_disabled_port_refuses_to_serve() {
        let server = MetricsServer::new(
            MetricsServerConfig::with_port(0),
            MetricsRegistry::new().unwrap(),
        );
        assert!(matches!(server.run().await, Err(ServerError::Disabled)));
    }

    #[tokio::test]
    async fn test_health_follows_stream_state() {
        let server = server();
        let state = server.state();

        let (status, _) = health_handler(State(state.clone())).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state.write().await.update(MetricsSnapshot {
            frames: 30,
            stream_state: StreamState::Stable.as_gauge(),
            ..Default::default()
        });
        let (status, _) = health_handler(State(state)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_session_and_metrics_reflect_latest_snapshot() {
        let server = server();
        let state = server.state();
        let mut stable_by_label = BTreeMap::new();
        stable_by_label.insert("Thanks".to_string(), 4);
        state.write().await.update(MetricsSnapshot {
            frames: 64,
            stable_predictions: 4,
            stable_by_label,
            ..Default::default()
        });

        let Json(session) = session_handler(State(state.clone())).await;
        assert_eq!(session.frames, 64);
        assert_eq!(session.stable_by_label.get("Thanks"), Some(&4));

        let response = metrics_handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("gesture_stream_frames_total 64"));
    }
}
