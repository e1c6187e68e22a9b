//! Centralized error handling for the M3U prober
//!
//! Probe failures are *values*, not errors: every network or parse problem met
//! while evaluating a candidate is turned into a [`ProbeOutcome`] or
//! [`Verdict`] at the point where it happens. The types in this module cover
//! the remaining cases that do abort an operation:
//!
//! - **Configuration errors**: an invalid probe budget or unreadable config
//! - **Manifest errors**: text that is not a usable playlist manifest
//! - **I/O errors**: reading inputs and writing result artifacts
//!
//! # Usage
//!
//! ```rust
//! use m3u_prober::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Ok("success".to_string())
//! }
//! ```
//!
//! [`ProbeOutcome`]: crate::models::ProbeOutcome
//! [`Verdict`]: crate::models::Verdict

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for manifest parsing results
pub type ManifestResult<T> = Result<T, ManifestError>;
