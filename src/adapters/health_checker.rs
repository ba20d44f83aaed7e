use std::{sync::Arc, time::Duration};

use tokio::time::sleep;

use crate::{config::HealthCheckConfig, core::HealthMonitor, utils::graceful_shutdown::ShutdownToken};

/// Periodic driver for the health monitor: fixed delay after each full cycle
pub struct HealthChecker {
    monitor: Arc<HealthMonitor>,
    config: HealthCheckConfig,
}

impl HealthChecker {
    pub fn new(monitor: Arc<HealthMonitor>, config: HealthCheckConfig) -> Self {
        Self { monitor, config }
    }

    /// Run the health checker loop until `shutdown` fires
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        if !self.config.enabled {
            tracing::info!("Health checking is disabled; all backends are considered healthy");
            self.monitor.mark_all_healthy();
            return;
        }

        let interval = Duration::from_secs(self.config.interval_secs);
        tracing::info!(
            "Starting health checker with interval: {}s, timeout: {}s, path: {}",
            self.config.interval_secs,
            self.config.timeout_secs,
            self.config.path
        );

        if self.config.initial_delay_ms > 0 {
            tokio::select! {
                _ = sleep(Duration::from_millis(self.config.initial_delay_ms)) => {}
                _ = shutdown.wait_for_shutdown() => return,
            }
        }

        loop {
            tracing::info!("Checking {} servers...", self.monitor.len());

            // Dropping the cycle on shutdown aborts any probe still in flight
            let summary = tokio::select! {
                summary = self.monitor.run_cycle() => summary,
                _ = shutdown.wait_for_shutdown() => break,
            };

            tracing::info!("Complete: {}/{} healthy", summary.healthy, summary.total);

            tokio::select! {
                _ = sleep(interval) => {}
                _ = shutdown.wait_for_shutdown() => break,
            }
        }

        tracing::info!("Health checker stopped");
    }
}
