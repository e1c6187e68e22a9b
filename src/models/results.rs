use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::verdict::{AvailableEntry, UnavailableEntry, UnavailableReason};

/// Partitioned verdicts handed to the external writer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResults {
    /// Sorted by (display name, uri)
    pub available: Vec<AvailableEntry>,
    /// In admission order
    pub unavailable: Vec<UnavailableEntry>,
    /// Candidates never admitted (max-items cap or cancellation)
    pub skipped: usize,
}

impl ProbeResults {
    /// Number of candidates that received a verdict
    pub fn checked(&self) -> usize {
        self.available.len() + self.unavailable.len()
    }

    pub fn reason_counts(&self) -> BTreeMap<UnavailableReason, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.unavailable {
            *counts.entry(entry.reason).or_insert(0) += 1;
        }
        counts
    }

    pub fn summary(&self, started_at: DateTime<Utc>, elapsed: Duration) -> RunSummary {
        RunSummary {
            timestamp: started_at,
            checked: self.checked(),
            available: self.available.len(),
            unavailable: self.unavailable.len(),
            skipped: self.skipped,
            elapsed_ms: elapsed.as_millis() as u64,
            reasons: self
                .reason_counts()
                .into_iter()
                .map(|(reason, count)| (reason.to_string(), count))
                .collect(),
        }
    }
}

/// Counts for the summary report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp: DateTime<Utc>,
    pub checked: usize,
    pub available: usize,
    pub unavailable: usize,
    pub skipped: usize,
    pub elapsed_ms: u64,
    pub reasons: BTreeMap<String, usize>,
}
