pub mod backend;
pub mod forwarding;
pub mod health_monitor;
pub mod load_balancer;
pub mod probe;

pub use backend::{BackendRecord, BackendSnapshot, BackendUrl, HealthStatus, LifecycleStatus};
pub use forwarding::{ForwardError, ForwardOutcome, ForwardingEngine};
pub use health_monitor::{HealthMonitor, HealthSummary};
pub use load_balancer::{LoadBalancingStrategy, RoundRobinStrategy, Router};
pub use probe::{HealthProbe, ProbeFailure, ProbeOutcome};
