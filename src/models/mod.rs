//! Core data model shared by the probing engine and its collaborators
//!
//! - [`Candidate`] / [`CandidateSet`]: what goes in (deduplicated by normalized URL)
//! - [`ProbeOutcome`]: result of a single network attempt
//! - [`Verdict`]: the one result emitted per admitted candidate
//! - [`ProbeBudget`]: immutable per-run limits and policy flags
//! - [`ProbeResults`] / [`RunSummary`]: the partitioned output handed to writers

pub mod budget;
pub mod candidate;
pub mod outcome;
pub mod results;
pub mod verdict;

pub use budget::ProbeBudget;
pub use candidate::{Candidate, CandidateSet};
pub use outcome::{FailureCause, ProbeOutcome, ProbeSuccess};
pub use results::{ProbeResults, RunSummary};
pub use verdict::{AvailableEntry, Confirmation, UnavailableEntry, UnavailableReason, Verdict};
