//! Thin `axum` adapter exposing the target/change/alert REST surface over
//! a [`sitewatch_engine::Core`]. Not a fully-authenticated production API:
//! no session/auth system is modeled.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use sitewatch_engine::Core;

pub struct AppState {
    pub core: Core,
}

pub fn build_router(core: Core) -> Router {
    let state = Arc::new(AppState { core });

    Router::new()
        .route("/targets", post(handlers::targets::create))
        .route(
            "/targets/:id",
            put(handlers::targets::update).delete(handlers::targets::delete),
        )
        .route("/targets/:id/capture", post(handlers::targets::capture))
        .route(
            "/targets/:id/start-monitoring",
            post(handlers::targets::start_monitoring),
        )
        .route(
            "/targets/:id/disable-monitoring",
            post(handlers::targets::disable_monitoring),
        )
        .route(
            "/targets/:id/monitoring-status",
            get(handlers::targets::monitoring_status),
        )
        .route("/changes", get(handlers::changes::list))
        .route("/alerts", get(handlers::alerts::list))
        .route("/alerts/:id", put(handlers::alerts::update_status))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sitewatch_core::config::Config;
    use sitewatch_engine::StaticRendererClient;
    use tower::ServiceExt;

    fn test_core() -> Core {
        let config = Config {
            database_path: ":memory:".to_string(),
            ..Config::default()
        };
        Core::bootstrap(config, Arc::new(StaticRendererClient::new("<html></html>"))).unwrap()
    }

    #[tokio::test]
    async fn create_target_returns_201() {
        let app = build_router(test_core());
        let body = serde_json::json!({
            "owner_user_id": "user-1",
            "url": "https://ex.test",
            "name": "Example"
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/targets")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn changes_without_target_id_is_rejected() {
        let app = build_router(test_core());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/changes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
