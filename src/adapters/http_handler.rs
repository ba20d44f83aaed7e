use std::{
    any::Any,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    Router as AxumRouter,
    body::Body as AxumBody,
    extract::State,
    http::{StatusCode, header},
};
use chrono::{SecondsFormat, Utc};
use eyre::{Result, WrapErr};
use hyper::{Request, Response};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    core::{ForwardOutcome, ForwardingEngine},
    metrics,
    tracing_setup::create_request_span,
};

pub const NO_HEALTHY_SERVERS: &str = "No healthy servers available";
pub const ALL_BACKENDS_FAILED: &str = "All backend servers failed";
pub const INTERNAL_PROXY_ERROR: &str = "Internal proxy error";

/// Ingress handler: forwards every inbound request and renders terminal failures as JSON
#[derive(Clone)]
pub struct HttpHandler {
    engine: Arc<ForwardingEngine>,
}

impl HttpHandler {
    pub fn new(engine: Arc<ForwardingEngine>) -> Self {
        Self { engine }
    }

    /// Main request handler. Always produces a response.
    pub async fn handle_request(&self, req: Request<AxumBody>) -> Response<AxumBody> {
        let started = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let span = create_request_span(req.method().as_str(), req.uri().path(), &request_id);

        let response = async {
            match self.engine.forward(req).await {
                Ok(ForwardOutcome::Forwarded { response, .. }) => response,
                Ok(ForwardOutcome::NoHealthyBackends) => error_response(
                    StatusCode::SERVICE_UNAVAILABLE,
                    NO_HEALTHY_SERVERS,
                    started.elapsed(),
                ),
                Ok(ForwardOutcome::AllBackendsFailed { .. }) => {
                    error_response(StatusCode::BAD_GATEWAY, ALL_BACKENDS_FAILED, started.elapsed())
                }
                Err(err) => {
                    tracing::error!("Proxy error: {}", err);
                    error_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        INTERNAL_PROXY_ERROR,
                        started.elapsed(),
                    )
                }
            }
        }
        .instrument(span.clone())
        .await;

        let elapsed = started.elapsed();
        span.record("http.status_code", response.status().as_u16());
        span.record("duration_ms", elapsed.as_millis() as u64);
        metrics::record_request(response.status().as_u16(), elapsed);

        response
    }
}

/// JSON body shared by every balancer-generated error
pub fn error_body(status: StatusCode, message: &str, elapsed: Duration) -> serde_json::Value {
    serde_json::json!({
        "error": message,
        "statusCode": status.as_u16(),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "processingTime": format!("{}ms", elapsed.as_millis()),
    })
}

pub fn error_response(status: StatusCode, message: &str, elapsed: Duration) -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::from(
        error_body(status, message, elapsed).to_string(),
    ));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<AxumBody> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Request handler panicked: {}", detail);
    metrics::record_request(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), Duration::ZERO);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_PROXY_ERROR,
        Duration::ZERO,
    )
}

async fn forward_any(State(handler): State<HttpHandler>, req: Request<AxumBody>) -> Response<AxumBody> {
    handler.handle_request(req).await
}

/// Ingress router: every method and path goes to the forwarding engine
pub fn router(handler: HttpHandler) -> AxumRouter {
    AxumRouter::new()
        .fallback(forward_any)
        .with_state(handler)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

/// Bind the ingress listener and serve until `shutdown` resolves
pub async fn serve(
    listen_addr: &str,
    handler: HttpHandler,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .wrap_err_with(|| format!("Failed to bind ingress listener on {listen_addr}"))?;

    tracing::info!("Roundhouse listening on http://{}", listen_addr);

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(shutdown)
        .await
        .wrap_err("Ingress server error")
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use hyper::Method;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::ServerConfig,
        core::{HealthMonitor, Router},
        ports::http_client::{HealthCheckResponse, HttpClient, HttpClientResult},
    };

    struct PanickingClient;

    #[async_trait]
    impl HttpClient for PanickingClient {
        async fn send_request(
            &self,
            _req: Request<AxumBody>,
        ) -> HttpClientResult<Response<AxumBody>> {
            panic!("backend client bug");
        }

        async fn health_check(
            &self,
            _url: &str,
            _timeout: Duration,
        ) -> HttpClientResult<HealthCheckResponse> {
            unimplemented!()
        }
    }

    fn handler(healthy: bool) -> HttpHandler {
        let config = ServerConfig::builder()
            .listen_addr("127.0.0.1:9000")
            .ports([8001])
            .build()
            .unwrap();
        let client: Arc<dyn HttpClient> = Arc::new(PanickingClient);
        let monitor = Arc::new(HealthMonitor::from_config(&config, client.clone()).unwrap());
        if healthy {
            monitor.mark_all_healthy();
        }
        let engine = ForwardingEngine::new(monitor, Router::round_robin(), client, config.forwarding);
        HttpHandler::new(Arc::new(engine))
    }

    async fn json_body(response: Response<AxumBody>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_body_shape() {
        let body = error_body(
            StatusCode::BAD_GATEWAY,
            ALL_BACKENDS_FAILED,
            Duration::from_millis(42),
        );

        assert_eq!(body["error"], ALL_BACKENDS_FAILED);
        assert_eq!(body["statusCode"], 502);
        assert_eq!(body["processingTime"], "42ms");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[tokio::test]
    async fn test_no_healthy_backends_any_path() {
        let app = router(handler(false));

        for (method, path) in [(Method::GET, "/"), (Method::POST, "/api/orders?id=7")] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(path)
                        .body(AxumBody::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/json"
            );
            let body = json_body(response).await;
            assert_eq!(body["error"], NO_HEALTHY_SERVERS);
            assert_eq!(body["statusCode"], 503);
        }
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let app = router(handler(true));

        let response = app
            .oneshot(Request::builder().uri("/boom").body(AxumBody::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], INTERNAL_PROXY_ERROR);
        assert_eq!(body["statusCode"], 500);
    }
}
