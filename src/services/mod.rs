//! Probing services: evaluation, admission control, scheduling and aggregation.

pub mod aggregator;
pub mod host_limiter;
pub mod liveness;
pub mod scheduler;

pub use aggregator::ResultAggregator;
pub use host_limiter::{AdmissionGates, GatedProbeClient, HostLimiter};
pub use liveness::LivenessEvaluator;
pub use scheduler::{ProbeScheduler, RunReport};
