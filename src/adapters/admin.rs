//! Administrative listener for test and chaos tooling.
//!
//! Served on its own address so none of these routes shadow forwarded paths.
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::core::{BackendSnapshot, HealthMonitor};

#[derive(Serialize)]
pub struct PoolStatus {
    pub total: usize,
    pub healthy: usize,
    pub backends: Vec<BackendSnapshot>,
}

#[derive(Deserialize)]
pub struct ForceHealthRequest {
    pub healthy: bool,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub id: String,
    pub healthy: bool,
}

pub async fn get_status(State(monitor): State<Arc<HealthMonitor>>) -> Json<PoolStatus> {
    let backends = monitor.get_all();
    Json(PoolStatus {
        total: backends.len(),
        healthy: backends.iter().filter(|b| b.is_healthy()).count(),
        backends,
    })
}

pub async fn force_health(
    State(monitor): State<Arc<HealthMonitor>>,
    Path(id): Path<String>,
    Json(request): Json<ForceHealthRequest>,
) -> Result<Json<BackendSnapshot>, StatusCode> {
    if !monitor.force_health(&id, request.healthy) {
        return Err(StatusCode::NOT_FOUND);
    }
    monitor
        .find(&id)
        .map(|backend| Json(backend.snapshot()))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn check_backend(
    State(monitor): State<Arc<HealthMonitor>>,
    Path(id): Path<String>,
) -> Result<Json<CheckResult>, StatusCode> {
    let backend = monitor.find(&id).ok_or(StatusCode::NOT_FOUND)?;
    let healthy = monitor.probe_one(&backend).await;
    Ok(Json(CheckResult { id, healthy }))
}

pub fn admin_router(monitor: Arc<HealthMonitor>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/backends/{id}/health", post(force_health))
        .route("/backends/{id}/check", post(check_backend))
        .with_state(monitor)
}

/// Bind the admin listener and serve until `shutdown` resolves
pub async fn serve_admin(
    listen_addr: &str,
    monitor: Arc<HealthMonitor>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .wrap_err_with(|| format!("Failed to bind admin listener on {listen_addr}"))?;

    tracing::info!("Admin interface listening on http://{}", listen_addr);

    axum::serve(listener, admin_router(monitor))
        .with_graceful_shutdown(shutdown)
        .await
        .wrap_err("Admin server error")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body as AxumBody;
    use bytes::Bytes;
    use hyper::{Request, Response};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::ServerConfig,
        ports::http_client::{HealthCheckResponse, HttpClient, HttpClientResult},
    };

    struct HealthyClient;

    #[async_trait]
    impl HttpClient for HealthyClient {
        async fn send_request(
            &self,
            _req: Request<AxumBody>,
        ) -> HttpClientResult<Response<AxumBody>> {
            unimplemented!()
        }

        async fn health_check(
            &self,
            _url: &str,
            _timeout: Duration,
        ) -> HttpClientResult<HealthCheckResponse> {
            Ok(HealthCheckResponse {
                status: StatusCode::OK,
                body: Bytes::from_static(br#"{"serverId":"server-2","status":"healthy"}"#),
            })
        }
    }

    fn monitor() -> Arc<HealthMonitor> {
        let config = ServerConfig::builder()
            .listen_addr("127.0.0.1:9000")
            .ports([8001, 8002])
            .build()
            .unwrap();
        Arc::new(HealthMonitor::from_config(&config, Arc::new(HealthyClient)).unwrap())
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<AxumBody> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(AxumBody::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_force_health_and_status() {
        let monitor = monitor();
        let app = admin_router(monitor.clone());

        let response = app
            .clone()
            .oneshot(post_json("/backends/server-1/health", r#"{"healthy":true}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["health"], "healthy");

        let response = app
            .oneshot(Request::get("/status").body(AxumBody::empty()).unwrap())
            .await
            .unwrap();
        let status = json(response).await;
        assert_eq!(status["total"], 2);
        assert_eq!(status["healthy"], 1);
        assert_eq!(status["backends"][0]["id"], "server-1");
        assert_eq!(status["backends"][1]["health"], "unknown");
    }

    #[tokio::test]
    async fn test_unknown_backend_is_not_found() {
        let app = admin_router(monitor());

        let response = app
            .clone()
            .oneshot(post_json("/backends/server-9/health", r#"{"healthy":false}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(post_json("/backends/server-9/check", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_on_demand_check() {
        let monitor = monitor();
        let app = admin_router(monitor.clone());

        // The stub always reports server-2, so server-1 fails the identity check
        let response = app
            .clone()
            .oneshot(post_json("/backends/server-1/check", ""))
            .await
            .unwrap();
        assert_eq!(json(response).await["healthy"], false);

        let response = app
            .oneshot(post_json("/backends/server-2/check", ""))
            .await
            .unwrap();
        assert_eq!(json(response).await["healthy"], true);
        assert!(monitor.find("server-2").unwrap().is_healthy());
    }
}
