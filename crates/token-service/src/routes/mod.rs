//! HTTP routes for the token service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::services::grant_service::GrantIssuer;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub use crate::observability::metrics::init_metrics_recorder;

/// Request timeout applied to every route.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Grant issuer built from `config`.
    pub issuer: GrantIssuer,

    /// Service configuration.
    pub config: Config,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        Self {
            issuer: GrantIssuer::from_config(&config),
            config,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `POST /api/token` - Issue an access token
/// - `/health` - Liveness check
/// - `/metrics` - Prometheus metrics endpoint
/// - Static front-end with `index.html` fallback when `STATIC_DIR` is set
/// - Permissive CORS, TraceLayer and a 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let static_dir = state.config.static_dir.clone();

    let api_routes = Router::new()
        .route("/api/token", post(handlers::handle_issue_token))
        .route("/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let router = api_routes.merge(metrics_routes);

    let router = match static_dir {
        Some(dir) => {
            let index = ServeFile::new(dir.join("index.html"));
            router.fallback_service(ServeDir::new(dir).fallback(index))
        }
        None => router,
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use common::secret::SecretString;
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_state(extra: &[(&str, &str)]) -> Arc<AppState> {
        let mut vars = HashMap::from([
            ("LIVEKIT_API_KEY".to_string(), "devkey".to_string()),
            ("LIVEKIT_API_SECRET".to_string(), "devsecret".to_string()),
        ]);
        for (k, v) in extra {
            vars.insert((*k).to_string(), (*v).to_string());
        }
        Arc::new(AppState::from_config(Config::from_vars(&vars).unwrap()))
    }

    fn test_router(state: Arc<AppState>) -> Router {
        // Standalone recorder; the global one may already be installed by another test.
        let handle = PrometheusBuilder::new().build_recorder().handle();
        build_routes(state, handle)
    }

    fn token_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_token_route_returns_documented_shape() {
        let app = test_router(test_state(&[]));

        let response = app
            .oneshot(token_request(r#"{"roomName":"demo","participantName":"alice"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["roomName"], "demo");
        assert_eq!(body["participantName"], "alice");
        assert_eq!(body["livekitUrl"], "ws://localhost:7880");
        assert!(body["token"].as_str().unwrap().split('.').count() == 3);
    }

    #[tokio::test]
    async fn test_token_route_applies_defaults() {
        let app = test_router(test_state(&[]));

        let response = app.oneshot(token_request("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["roomName"], "test-room");
        assert!(body["participantName"].as_str().unwrap().starts_with("user-"));
    }

    #[tokio::test]
    async fn test_token_route_reject_policy_is_bad_request() {
        let app = test_router(test_state(&[("REQUIRE_IDENTIFIERS", "true")]));

        let response = app
            .oneshot(token_request(r#"{"participantName":"alice"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"], "roomName is required");
    }

    #[tokio::test]
    async fn test_token_route_signing_failure_is_server_error() {
        let state = test_state(&[]);
        let broken = AppState {
            issuer: GrantIssuer::new("devkey", SecretString::from(""), "ws://localhost:7880"),
            config: state.config.clone(),
        };
        let app = test_router(Arc::new(broken));

        let response = app.oneshot(token_request("{}")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body, serde_json::json!({ "error": "Failed to generate token" }));
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = test_router(test_state(&[]));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes, "OK");
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed() {
        let app = test_router(test_state(&[]));

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/token")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_unknown_path_without_static_dir_is_not_found() {
        let app = test_router(test_state(&[]));

        let response = app
            .oneshot(Request::get("/some/page").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_static_dir_serves_spa_fallback() {
        let dir = std::env::temp_dir().join(format!("token-service-static-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.html"), "<html>app</html>").unwrap();

        let dir_str = dir.to_string_lossy().to_string();
        let app = test_router(test_state(&[("STATIC_DIR", dir_str.as_str())]));

        let response = app
            .oneshot(Request::get("/rooms/demo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes, "<html>app</html>");

        std::fs::remove_dir_all(&dir).ok();
    }
}
