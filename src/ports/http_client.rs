use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use hyper::{Request, Response, StatusCode};
use thiserror::Error;

/// Custom error type for HTTP client operations.
///
/// Every variant is a transport-level failure: a backend that answered with
/// any status code, 5xx included, is a successful exchange.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when connection to backend fails
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when request times out
    #[error("Timeout error after {0:?}")]
    Timeout(Duration),

    /// Error when request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Error when the response body could not be read to completion
    #[error("Body error: {0}")]
    BodyError(String),
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// Fully buffered answer from a backend health endpoint.
#[derive(Debug, Clone)]
pub struct HealthCheckResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// HttpClient defines the port (interface) for making HTTP requests to backends
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send an HTTP request to a backend server
    ///
    /// # Arguments
    /// * `req` - The HTTP request to send to the backend, with an absolute URI
    ///
    /// # Returns
    /// The backend's response, whatever its status, or a transport error
    async fn send_request(&self, req: Request<AxumBody>) -> HttpClientResult<Response<AxumBody>>;

    /// Issue a GET against a health endpoint and buffer the answer
    ///
    /// # Arguments
    /// * `url` - Absolute URL of the health endpoint
    /// * `timeout` - Bound on the whole exchange, body included
    async fn health_check(&self, url: &str, timeout: Duration)
    -> HttpClientResult<HealthCheckResponse>;
}
