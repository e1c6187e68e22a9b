use std::collections::HashMap;

use tracing::warn;

use crate::models::{Candidate, ProbeResults, Verdict};
use crate::observability::metrics;
use crate::utils::url::UrlUtils;

/// Collects verdicts in whatever order tasks finish
///
/// Owned by the scheduler loop, which is its only writer. Verdicts are keyed
/// by normalized URL; a second verdict for the same key is dropped.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    admission_order: HashMap<String, usize>,
    recorded: HashMap<String, (usize, Verdict)>,
    rejected_duplicates: usize,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate at admission time so unavailable entries keep admission order
    pub fn admit(&mut self, candidate: &Candidate) {
        let next = self.admission_order.len();
        self.admission_order
            .entry(Self::key(&candidate.url))
            .or_insert(next);
    }

    /// Record a verdict; returns false if the candidate already has one
    pub fn record(&mut self, verdict: Verdict) -> bool {
        let key = Self::key(verdict.uri());
        if self.recorded.contains_key(&key) {
            self.rejected_duplicates += 1;
            warn!(
                target = "probe.aggregate",
                url = %UrlUtils::obfuscate_credentials(verdict.uri()),
                "duplicate verdict ignored"
            );
            return false;
        }

        metrics().record_verdict(&verdict);
        let order = self
            .admission_order
            .get(&key)
            .copied()
            .unwrap_or(usize::MAX);
        self.recorded.insert(key, (order, verdict));
        true
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    pub fn rejected_duplicates(&self) -> usize {
        self.rejected_duplicates
    }

    /// Partition into available (sorted by name, then uri) and unavailable (admission order)
    pub fn finish(self, skipped: usize) -> ProbeResults {
        let mut recorded: Vec<(usize, Verdict)> = self.recorded.into_values().collect();
        recorded.sort_by(|(a_order, a), (b_order, b)| {
            a_order.cmp(b_order).then_with(|| a.uri().cmp(b.uri()))
        });

        let mut results = ProbeResults {
            skipped,
            ..Default::default()
        };
        for (_, verdict) in recorded {
            match verdict {
                Verdict::Available(entry) => results.available.push(entry),
                Verdict::Unavailable(entry) => results.unavailable.push(entry),
            }
        }
        results.available.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.uri.cmp(&b.uri))
        });
        results
    }

    fn key(url: &str) -> String {
        UrlUtils::normalize_candidate(url).unwrap_or_else(|| url.to_string())
    }
}
