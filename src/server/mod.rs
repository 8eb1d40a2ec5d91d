//! HTTP surface: liveness text and the JSON health report

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::MetricsError;
use crate::health::report::HealthReport;
use crate::health::HealthCollector;

pub const LIVENESS_TEXT: &str = "vitals is up. GET /analyze for a health report.";

pub fn router(collector: Arc<HealthCollector>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/analyze", get(analyze))
        .layer(TraceLayer::new_for_http())
        .with_state(collector)
}

async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

async fn analyze(
    State(collector): State<Arc<HealthCollector>>,
) -> Result<Json<HealthReport>, MetricsError> {
    collector.collect_report().map(Json).map_err(|err| {
        warn!(path = %err.path().display(), error = %err, "health report failed");
        err
    })
}

impl IntoResponse for MetricsError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "metrics unavailable",
            "detail": self.to_string(),
        }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

/// Bind `addr` and serve until Ctrl-C or SIGTERM.
pub async fn serve(addr: SocketAddr, collector: Arc<HealthCollector>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("vitals listening on {}", listener.local_addr()?);
    info!("  GET /        - liveness");
    info!("  GET /analyze - health report");

    axum::serve(listener, router(collector))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("vitals stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(%err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(%err, "failed to listen for SIGTERM");
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
    info!("shutdown signal received");
}
