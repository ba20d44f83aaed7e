use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use eyre::Result;
use http_body_util::BodyExt;
use hyper::{Request, Response, Version, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use rustls_native_certs::load_native_certs;
use tokio::time::timeout;

use crate::ports::http_client::{
    HealthCheckResponse, HttpClient, HttpClientError, HttpClientResult,
};

/// HTTP client adapter using Hyper with Rustls.
///
/// Responsibilities:
/// * Sets the `Host` header from the outbound URI
/// * Forces request version to HTTP/1.1 while allowing ALPN to negotiate h2
/// * Performs GET based health checks with timeout, buffering the payload
/// * Converts between Hyper body and Axum body types
///
/// Retries and failover live in the forwarding engine, not here.
pub struct HttpClientAdapter {
    client: Client<HttpsConnector<HttpConnector>, AxumBody>,
}

impl HttpClientAdapter {
    /// Create a new HTTP client adapter.
    pub fn new() -> Result<Self> {
        // Install default crypto provider for rustls if not already set
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false); // Allow HTTPS URLs

        let mut root_cert_store = rustls::RootCertStore::empty();
        let native_certs = load_native_certs();

        if !native_certs.certs.is_empty() {
            for cert in native_certs.certs {
                if root_cert_store.add(cert).is_err() {
                    tracing::warn!("Failed to add native certificate to rustls RootCertStore");
                }
            }
            tracing::debug!("Loaded {} native root certificates.", root_cert_store.len());
        }

        if !native_certs.errors.is_empty() {
            tracing::warn!(
                "Some native certificates failed to load: {:?}",
                native_certs.errors
            );
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let client = Client::builder(TokioExecutor::new()).build::<_, AxumBody>(https_connector);

        tracing::info!("Created backend HTTP client");
        Ok(Self { client })
    }

    /// Point the `Host` header at the backend the URI addresses
    fn set_host_header(req: &mut Request<AxumBody>) -> HttpClientResult<()> {
        let Some(host) = req.uri().host() else {
            return Err(HttpClientError::InvalidRequest(format!(
                "Outgoing URI has no host: {}",
                req.uri()
            )));
        };

        let value = match req.uri().port_u16() {
            Some(port) => HeaderValue::from_str(&format!("{host}:{port}")),
            None => HeaderValue::from_str(host),
        }
        .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;

        req.headers_mut().insert(header::HOST, value);
        Ok(())
    }
}

#[async_trait]
impl HttpClient for HttpClientAdapter {
    async fn send_request(
        &self,
        mut req: Request<AxumBody>,
    ) -> HttpClientResult<Response<AxumBody>> {
        Self::set_host_header(&mut req)?;

        let (mut parts, axum_body) = req.into_parts();
        parts.version = Version::HTTP_11;

        tracing::debug!("Sending request: {} {}", parts.method, parts.uri);
        tracing::trace!("Outgoing request headers: {:?}", parts.headers);

        let method_for_error_log = parts.method.clone();
        let uri_for_error_log = parts.uri.clone();
        let outgoing_request = Request::from_parts(parts, axum_body);

        match self.client.request(outgoing_request).await {
            Ok(response) => {
                let (mut parts, hyper_body) = response.into_parts();

                // The body is re-framed by the ingress server
                parts.headers.remove(header::TRANSFER_ENCODING);

                Ok(Response::from_parts(parts, AxumBody::new(hyper_body)))
            }
            Err(e) => {
                tracing::debug!(
                    "Error making request to backend ({} {}): {}",
                    method_for_error_log,
                    uri_for_error_log,
                    e
                );

                Err(HttpClientError::ConnectionError(format!(
                    "Request to {method_for_error_log} {uri_for_error_log} failed: {e}"
                )))
            }
        }
    }

    async fn health_check(
        &self,
        url: &str,
        timeout_duration: Duration,
    ) -> HttpClientResult<HealthCheckResponse> {
        let mut request = Request::builder()
            .method("GET")
            .uri(url)
            .version(Version::HTTP_11)
            .header(header::ACCEPT, "application/json")
            .body(AxumBody::empty())
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;
        Self::set_host_header(&mut request)?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| HttpClientError::ConnectionError(e.to_string()))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| HttpClientError::BodyError(e.to_string()))?
                .to_bytes();
            Ok::<_, HttpClientError>(HealthCheckResponse { status, body })
        };

        match timeout(timeout_duration, exchange).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!("Health check timeout for {}", url);
                Err(HttpClientError::Timeout(timeout_duration))
            }
        }
    }
}
