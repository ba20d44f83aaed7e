//! Helper utilities for running the health checker and summarizing backend health.
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    adapters::health_checker::HealthChecker,
    config::models::HealthCheckConfig,
    core::HealthMonitor,
    utils::graceful_shutdown::ShutdownToken,
};

/// Spawn the health checker loop as a detached tokio task.
pub fn spawn_health_checker_task(
    monitor: Arc<HealthMonitor>,
    config: HealthCheckConfig,
    shutdown: ShutdownToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        HealthChecker::new(monitor, config).run(shutdown).await;
    })
}

/// Emit a concise health summary log line (warns if any unhealthy or none configured).
pub fn log_health_summary(monitor: &HealthMonitor, log_prefix: &str) {
    let summary = monitor.summary();

    if summary.total == 0 {
        tracing::warn!("({}) No backends configured", log_prefix);
        return;
    }

    let unhealthy = summary.total - summary.healthy;
    if unhealthy > 0 {
        tracing::warn!(
            "({}) Backend health summary: {}/{} healthy, {} unhealthy",
            log_prefix,
            summary.healthy,
            summary.total,
            unhealthy
        );
    } else {
        tracing::info!(
            "({}) Backend health summary: all {} backends healthy",
            log_prefix,
            summary.total
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body as AxumBody;
    use hyper::{Request, Response};

    use super::*;
    use crate::{
        config::ServerConfig,
        ports::http_client::{HealthCheckResponse, HttpClient, HttpClientResult},
        utils::graceful_shutdown::GracefulShutdown,
    };

    struct UnusedClient;

    #[async_trait]
    impl HttpClient for UnusedClient {
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
            unimplemented!()
        }
    }

    fn monitor(ports: &[u16]) -> Arc<HealthMonitor> {
        let config = ServerConfig::builder()
            .listen_addr("127.0.0.1:9000")
            .ports(ports.iter().copied())
            .build()
            .unwrap();
        Arc::new(HealthMonitor::from_config(&config, Arc::new(UnusedClient)).unwrap())
    }

    #[test]
    fn test_log_health_summary_partial_pool() {
        let monitor = monitor(&[8001, 8002]);
        log_health_summary(&monitor, "test");

        monitor.force_health("server-2", true);
        assert_eq!(monitor.summary().healthy, 1);
        log_health_summary(&monitor, "test");
    }

    #[test]
    fn test_empty_pool_summary() {
        let monitor = monitor(&[]);
        assert_eq!(monitor.summary().total, 0);
        log_health_summary(&monitor, "test");
    }

    #[tokio::test]
    async fn test_spawned_task_with_checks_disabled() {
        let monitor = monitor(&[8001]);
        let shutdown = GracefulShutdown::new();
        let config = HealthCheckConfig {
            enabled: false,
            ..Default::default()
        };

        spawn_health_checker_task(monitor.clone(), config, shutdown.shutdown_token())
            .await
            .unwrap();
        assert_eq!(monitor.summary().healthy, 1);
    }
}
