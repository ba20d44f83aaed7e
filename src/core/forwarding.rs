//! Request forwarding with bounded failover across healthy backends.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::body::Body as AxumBody;
use bytes::Bytes;
use http::request::Parts;
use http_body_util::BodyExt;
use hyper::{HeaderMap, Request, Response, header};
use thiserror::Error;
use tokio::time::timeout;
use tracing::Instrument;

use crate::{
    config::ForwardingConfig,
    core::{backend::BackendSnapshot, health_monitor::HealthMonitor, load_balancer::Router},
    metrics::{self, AttemptOutcome},
    ports::http_client::{HttpClient, HttpClientError},
    tracing_setup::create_backend_span,
};

/// Request headers never copied to the outbound leg
static SKIPPED_REQUEST_HEADERS: [header::HeaderName; 5] = [
    header::HOST,
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Response headers that describe the backend connection, not the payload
const HOP_BY_HOP_RESPONSE_HEADERS: [&str; 4] =
    ["connection", "transfer-encoding", "keep-alive", "upgrade"];

/// Faults that prevent forwarding from being attempted at all.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ForwardError {
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Failed to build upstream request: {0}")]
    InvalidRequest(String),
}

/// Terminal result of forwarding one inbound request.
#[derive(Debug)]
pub enum ForwardOutcome {
    /// A backend answered; its status, headers and body pass through verbatim
    Forwarded {
        response: Response<AxumBody>,
        backend_id: String,
        attempts: usize,
    },
    /// The healthy set was empty; nothing was attempted
    NoHealthyBackends,
    /// Every attempt failed at the transport level
    AllBackendsFailed { attempts: usize },
}

/// Forwards inbound requests to healthy backends, retrying transport failures on the next candidate.
pub struct ForwardingEngine {
    monitor: Arc<HealthMonitor>,
    router: Router,
    http_client: Arc<dyn HttpClient>,
    config: ForwardingConfig,
}

impl ForwardingEngine {
    pub fn new(
        monitor: Arc<HealthMonitor>,
        router: Router,
        http_client: Arc<dyn HttpClient>,
        config: ForwardingConfig,
    ) -> Self {
        Self {
            monitor,
            router,
            http_client,
            config,
        }
    }

    fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    pub async fn forward(&self, req: Request<AxumBody>) -> Result<ForwardOutcome, ForwardError> {
        // One snapshot per request keeps the attempt bound fixed while health changes underneath
        let healthy = self.monitor.get_healthy();
        if healthy.is_empty() {
            tracing::warn!("No healthy servers available");
            return Ok(ForwardOutcome::NoHealthyBackends);
        }

        let max_attempts = healthy.len().min(self.config.max_attempts);

        let (parts, body) = req.into_parts();
        let body = axum::body::to_bytes(body, self.config.max_body_bytes)
            .await
            .map_err(|e| ForwardError::BodyRead(e.to_string()))?;

        let path_and_query = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str())
            .to_string();

        // Concurrent requests share the cursor, so a pick may repeat a backend this request already tried
        let mut tried: Vec<String> = Vec::with_capacity(max_attempts);
        let mut attempts = 0;
        while attempts < max_attempts {
            let Some(backend) = self
                .router
                .next_accepted(&healthy, |candidate| !tried.contains(&candidate.id))
            else {
                break;
            };
            tried.push(backend.id.clone());
            attempts += 1;

            let outbound = build_outbound_request(&parts, &backend, &path_and_query, body.clone())?;
            let span = create_backend_span(&backend.id, backend.address.as_str(), attempts);
            let started = Instant::now();

            let result = self.attempt(outbound).instrument(span.clone()).await;
            let elapsed = started.elapsed();
            span.record("duration_ms", elapsed.as_millis() as u64);

            match result {
                Ok(response) => {
                    span.record("http.status_code", response.status().as_u16());
                    metrics::record_forward_attempt(&backend.id, AttemptOutcome::Forwarded, elapsed);
                    let suffix = if attempts > 1 {
                        format!(" (attempt {attempts})")
                    } else {
                        String::new()
                    };
                    tracing::info!(
                        "{} {} → {} ({}ms){}",
                        parts.method,
                        path_and_query,
                        backend.id,
                        elapsed.as_millis(),
                        suffix
                    );
                    return Ok(ForwardOutcome::Forwarded {
                        response,
                        backend_id: backend.id,
                        attempts,
                    });
                }
                Err(err) => {
                    let outcome = match err {
                        HttpClientError::Timeout(_) => AttemptOutcome::Timeout,
                        _ => AttemptOutcome::TransportError,
                    };
                    metrics::record_forward_attempt(&backend.id, outcome, elapsed);
                    span.in_scope(|| {
                        tracing::warn!(
                            attempt = attempts,
                            max_attempts,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Failed to forward to {} ({}ms): {}",
                            backend.id,
                            elapsed.as_millis(),
                            err
                        );
                    });
                }
            }
        }

        tracing::error!(attempts, "All backend servers failed");
        Ok(ForwardOutcome::AllBackendsFailed { attempts })
    }

    /// One bounded exchange: send, then collect the body, all inside the attempt timeout
    async fn attempt(&self, outbound: Request<AxumBody>) -> Result<Response<AxumBody>, HttpClientError> {
        let limit = self.attempt_timeout();
        let exchange = async {
            let response = self.http_client.send_request(outbound).await?;
            let (mut parts, body) = response.into_parts();
            let bytes = body
                .collect()
                .await
                .map_err(|e| HttpClientError::BodyError(e.to_string()))?
                .to_bytes();
            strip_hop_by_hop(&mut parts.headers);
            Ok::<_, HttpClientError>(Response::from_parts(parts, AxumBody::from(bytes)))
        };

        timeout(limit, exchange)
            .await
            .unwrap_or(Err(HttpClientError::Timeout(limit)))
    }
}

fn build_outbound_request(
    parts: &Parts,
    backend: &BackendSnapshot,
    path_and_query: &str,
    body: Bytes,
) -> Result<Request<AxumBody>, ForwardError> {
    let mut builder = Request::builder()
        .method(parts.method.clone())
        .uri(backend.address.join(path_and_query));

    if let Some(headers) = builder.headers_mut() {
        for (name, value) in &parts.headers {
            if !SKIPPED_REQUEST_HEADERS.contains(name) {
                headers.append(name.clone(), value.clone());
            }
        }
    }

    builder
        .body(AxumBody::from(body))
        .map_err(|e| ForwardError::InvalidRequest(e.to_string()))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_RESPONSE_HEADERS {
        headers.remove(name);
    }
}
