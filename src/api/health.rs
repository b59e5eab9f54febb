/// Health and metrics endpoints
use crate::{context::AppContext, metrics};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: String,

    pub version: String,

    /// Database round-trip in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .route("/metrics", get(metrics_handler))
}

/// Readiness: pings the database
pub async fn health(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();

    match sqlx::query("SELECT 1").execute(&ctx.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthStatus {
                status: "healthy".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                database_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed: database unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    status: "unhealthy".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    database_ms: None,
                    error: Some("database unreachable".to_string()),
                }),
            )
        }
    }
}

/// Liveness: responds if the process can serve at all
pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Prometheus text exposition
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}
