//! Concurrent liveness prober for M3U / HLS live-TV candidate lists.
//!
//! The engine ([`services::ProbeScheduler`]) takes a deduplicated
//! [`models::CandidateSet`] and a [`models::ProbeBudget`], probes every
//! candidate under global and per-host concurrency limits, and returns one
//! [`models::Verdict`] per candidate. Collecting candidates ([`sources`]) and
//! writing artifacts ([`output`]) sit around it.

pub mod config;
pub mod errors;
pub mod manifest;
pub mod models;
pub mod observability;
pub mod output;
pub mod services;
pub mod sources;
pub mod streaming;
pub mod utils;

pub use config::Config;
pub use errors::{AppError, AppResult};
