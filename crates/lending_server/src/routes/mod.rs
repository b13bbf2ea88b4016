//! Route modules for the lending server
//!
//! This module contains endpoint group-specific routers:
//! - loans: loan lifecycle endpoints
//! - health: Health check and monitoring endpoints

pub mod health;
pub mod loans;

use axum::Router;
use lending_engine::engine::LifecycleEngine;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Lifecycle engine
    pub engine: Arc<LifecycleEngine>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create a new AppState
    pub fn new(config: Arc<ServerConfig>, engine: Arc<LifecycleEngine>) -> Self {
        Self {
            config,
            engine,
            start_time: std::time::Instant::now(),
        }
    }
}

/// Build the main application router by merging all route modules
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(loans::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
pub(crate) fn test_state(config: ServerConfig) -> AppState {
    let app = crate::app::Application::wire(&config);
    AppState::new(Arc::new(config), app.engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_build_router_creates_valid_router() {
        let router = build_router(test_state(ServerConfig::default()));

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_router_merges_all_route_groups() {
        let router = build_router(test_state(ServerConfig::default()));

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/loans/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        // No loans yet
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_returns_404() {
        let router = build_router(test_state(ServerConfig::default()));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/unknown/path")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
