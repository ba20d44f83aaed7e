pub mod graceful_shutdown;
pub mod health_checker_utils;

pub use graceful_shutdown::{GracefulShutdown, ShutdownReason, ShutdownToken};
pub use health_checker_utils::*;
