#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router as AxumRouter,
    body::Bytes,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use roundhouse::{
    ForwardingEngine, HealthMonitor, HttpClient, HttpClientAdapter, HttpHandler, Router,
    adapters::http_handler,
    config::{ForwardingConfig, ServerConfig},
};

/// A fake backend bound to an ephemeral port, reporting `reported_id` from `/health`.
pub struct FakeBackend {
    pub addr: SocketAddr,
}

impl FakeBackend {
    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn spawn_backend(reported_id: &str) -> FakeBackend {
    let id = reported_id.to_string();
    let health_id = id.clone();
    let fallback_id = id.clone();

    let app = AxumRouter::new()
        .route(
            "/health",
            get(move || {
                let id = health_id.clone();
                async move {
                    Json(serde_json::json!({
                        "serverId": id,
                        "status": "healthy",
                        "timestamp": chrono::Utc::now().to_rfc3339(),
                    }))
                }
            }),
        )
        .route(
            "/helloworld",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "hello world") }),
        )
        .route("/echo", post(|body: Bytes| async move { body }))
        .route(
            "/fail",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded") }),
        )
        .fallback(move || {
            let id = fallback_id.clone();
            async move { Json(serde_json::json!({ "served_by": id })).into_response() }
        });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeBackend { addr }
}

/// A backend that accepts connections but takes `delay` to answer anything
pub async fn spawn_hung_backend(delay: Duration) -> FakeBackend {
    let app = AxumRouter::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "too late"
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeBackend { addr }
}

/// An address nothing is listening on
pub fn unreachable_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub struct Balancer {
    pub monitor: Arc<HealthMonitor>,
    pub engine: Arc<ForwardingEngine>,
    pub app: AxumRouter,
}

/// Probe and attempt timeout used by [`balancer`]
pub const TIMEOUT: Duration = Duration::from_secs(2);

/// Wire a full balancer (real HTTP client) over `backends` given as (id, address)
pub fn balancer(backends: &[(&str, String)]) -> Balancer {
    let mut builder = ServerConfig::builder().listen_addr("127.0.0.1:0");
    for (id, address) in backends {
        builder = builder.backend(*id, address.clone());
    }
    let mut config = builder.build().unwrap();
    config.health_check.timeout_secs = TIMEOUT.as_secs();
    config.forwarding = ForwardingConfig {
        timeout_secs: TIMEOUT.as_secs(),
        ..Default::default()
    };

    let client: Arc<dyn HttpClient> = Arc::new(HttpClientAdapter::new().unwrap());
    let monitor = Arc::new(HealthMonitor::from_config(&config, client.clone()).unwrap());
    let engine = Arc::new(ForwardingEngine::new(
        monitor.clone(),
        Router::round_robin(),
        client,
        config.forwarding.clone(),
    ));
    let app = http_handler::router(HttpHandler::new(engine.clone()));

    Balancer {
        monitor,
        engine,
        app,
    }
}

pub async fn body_bytes(response: axum::response::Response) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}
