//! Health check and readiness endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;

use super::AppState;

/// Health check response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status
    pub status: String,
    /// Server version
    pub version: String,
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Environment name
    pub environment: String,
    /// Collaborator status
    pub dependencies: DependencyStatus,
}

/// Collaborator status for health check
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyStatus {
    /// Ledger store availability
    pub ledger: bool,
    /// Whether agreement letters are mailed
    pub notifier_enabled: bool,
    /// Deadline applied to collaborator calls, if any
    pub dependency_timeout_ms: Option<u64>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    /// Ready status
    pub ready: bool,
}

/// Build the health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        environment: state.config.environment.to_string(),
        dependencies: DependencyStatus {
            ledger: true,
            notifier_enabled: state.config.notifier_enabled,
            dependency_timeout_ms: state
                .engine
                .config()
                .dependency_timeout
                .map(|t| t.as_millis() as u64),
        },
    };

    (StatusCode::OK, Json(response))
}

/// GET /ready
async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(ReadyResponse { ready: true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::routes::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn get_json(config: ServerConfig, uri: &str) -> (StatusCode, serde_json::Value) {
        let router = routes().with_state(test_state(config));
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint_returns_json() {
        let (status, json) = get_json(ServerConfig::default(), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["version"], crate::VERSION);
        assert_eq!(json["environment"], "development");
        assert!(json["uptimeSecs"].is_u64());
        assert_eq!(json["dependencies"]["notifierEnabled"], true);
        assert_eq!(json["dependencies"]["dependencyTimeoutMs"], 5000);
    }

    #[tokio::test]
    async fn test_health_reflects_config() {
        let config = ServerConfig {
            notifier_enabled: false,
            dependency_timeout_ms: 0,
            ..Default::default()
        };
        let (_, json) = get_json(config, "/health").await;

        assert_eq!(json["dependencies"]["notifierEnabled"], false);
        assert!(json["dependencies"]["dependencyTimeoutMs"].is_null());
    }

    #[tokio::test]
    async fn test_ready_endpoint() {
        let (status, json) = get_json(ServerConfig::default(), "/ready").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ready"], true);
    }
}
