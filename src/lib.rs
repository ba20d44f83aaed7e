//! Roundhouse - a health-aware HTTP load balancer with round-robin failover.
//!
//! Roundhouse forwards every inbound request to one backend of a static pool, keeps
//! that pool's health current with periodic probes, and fails over to the next
//! healthy backend when one cannot be reached. The crate follows a **hexagonal
//! architecture**: domain logic in `core`, traits at the I/O seams in `ports`, and
//! hyper/axum implementations in `adapters`.
//!
//! # Features
//! - Concurrent health probes that verify each backend's reported identity
//! - Round-robin selection over the healthy set with a lock-free shared cursor
//! - Bounded failover: at most `min(healthy, 3)` attempts per request
//! - JSON error bodies for 502 / 503 / 500 outcomes
//! - Optional admin listener to inspect the pool and force health flags
//! - Structured logging via `tracing` and metrics via the `metrics` facade
//! - Graceful shutdown on SIGINT / SIGTERM
//!
//! # Quick Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use roundhouse::{
//!     ForwardingEngine, HealthMonitor, HttpClient, HttpClientAdapter, HttpHandler, Router,
//!     config::ServerConfig,
//! };
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let cfg: ServerConfig = roundhouse::config::loader::load_config("config.yaml").await?;
//! let client: Arc<dyn HttpClient> = Arc::new(HttpClientAdapter::new()?);
//! let monitor = Arc::new(HealthMonitor::from_config(&cfg, client.clone())?);
//! monitor.run_cycle().await;
//!
//! let engine = ForwardingEngine::new(monitor, Router::round_robin(), client, cfg.forwarding);
//! let app = roundhouse::adapters::http_handler::router(HttpHandler::new(Arc::new(engine)));
//! # let _ = app;
//! # Ok(()) }
//! ```
//!
//! # Error Handling
//! Domain errors are `thiserror` enums; glue code returns `eyre::Result<T>` with
//! context attached via `WrapErr`.
//!
//! # Concurrency
//! Each backend's health state lives in an `arc_swap::ArcSwap` and is replaced as a
//! whole on every update, so readers never see a torn (flag, timestamp) pair. The
//! routing cursor is a single `AtomicUsize`.
pub mod config;
pub mod metrics;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod core;

// Re-export the specific types needed by the binary crate
pub use crate::{
    adapters::{HealthChecker, HttpClientAdapter, HttpHandler},
    core::{ForwardingEngine, HealthMonitor, Router},
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
