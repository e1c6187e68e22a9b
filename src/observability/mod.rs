//! Probe metric instruments
//!
//! Counters come from the global OpenTelemetry meter. Without an installed
//! meter provider they are no-ops, so recording is always safe.

use std::sync::OnceLock;

use opentelemetry::global;
use opentelemetry::metrics::{Counter, Meter};

pub use opentelemetry::KeyValue;

use crate::models::{ProbeOutcome, Verdict};

/// Aggregated metric instruments for probing
pub struct ProbeMetrics {
    /// Every network attempt, labelled by operation and outcome
    pub attempts_total: Counter<u64>,
    /// Retries after a transient failure
    pub retries_total: Counter<u64>,
    /// One per candidate verdict, labelled by result and reason
    pub verdicts_total: Counter<u64>,
}

impl ProbeMetrics {
    fn new() -> Self {
        let meter: Meter = global::meter("m3u-prober");
        Self {
            attempts_total: meter
                .u64_counter("probe_attempts_total")
                .with_description("Network attempts issued by probe primitives")
                .build(),
            retries_total: meter
                .u64_counter("probe_retries_total")
                .with_description("Retries after transient probe failures")
                .build(),
            verdicts_total: meter
                .u64_counter("probe_verdicts_total")
                .with_description("Per-candidate verdicts")
                .build(),
        }
    }

    pub fn record_attempt(&self, operation: &'static str, outcome: &ProbeOutcome) {
        self.attempts_total.add(
            1,
            &[
                KeyValue::new("operation", operation),
                KeyValue::new("outcome", outcome.label()),
            ],
        );
    }

    pub fn record_retry(&self, operation: &'static str) {
        self.retries_total
            .add(1, &[KeyValue::new("operation", operation)]);
    }

    pub fn record_verdict(&self, verdict: &Verdict) {
        let (result, reason) = match verdict {
            Verdict::Available(entry) => ("available", entry.confirmation.to_string()),
            Verdict::Unavailable(entry) => ("unavailable", entry.reason.to_string()),
        };
        self.verdicts_total.add(
            1,
            &[KeyValue::new("result", result), KeyValue::new("reason", reason)],
        );
    }
}

static METRICS: OnceLock<ProbeMetrics> = OnceLock::new();

/// Global probe metric instruments
pub fn metrics() -> &'static ProbeMetrics {
    METRICS.get_or_init(ProbeMetrics::new)
}
