//! Ports (traits) the core depends on; adapters provide the implementations.
pub mod http_client;

pub use http_client::{HealthCheckResponse, HttpClient, HttpClientError, HttpClientResult};
