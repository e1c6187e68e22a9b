//! Concurrency scheduler
//!
//! Fans candidates out to tokio tasks. Network concurrency is bounded by the
//! admission gates; the number of spawned tasks is bounded separately by an
//! admission window so that a long candidate list does not become a long
//! list of idle tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::aggregator::ResultAggregator;
use super::host_limiter::{AdmissionGates, GatedProbeClient};
use super::liveness::LivenessEvaluator;
use crate::errors::AppResult;
use crate::models::{Candidate, CandidateSet, ProbeBudget, ProbeResults, RunSummary, UnavailableReason, Verdict};
use crate::utils::http_client::ProbeClient;
use crate::utils::url::UrlUtils;

/// Results of one run plus its summary counts
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: ProbeResults,
    pub summary: RunSummary,
}

pub struct ProbeScheduler {
    budget: ProbeBudget,
    client: Arc<dyn ProbeClient>,
    cancel: CancellationToken,
}

impl ProbeScheduler {
    /// Validate the budget up front; an invalid budget never starts a task
    pub fn new(budget: ProbeBudget, client: Arc<dyn ProbeClient>) -> AppResult<Self> {
        budget.validate()?;
        Ok(Self {
            budget,
            client,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned token, e.g. one cancelled on Ctrl-C
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn budget(&self) -> &ProbeBudget {
        &self.budget
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Evaluate every admitted candidate and collect exactly one verdict each
    pub async fn run(&self, candidates: CandidateSet) -> RunReport {
        let started = Instant::now();
        let started_at = Utc::now();
        let total = candidates.len();

        let gates = Arc::new(AdmissionGates::from_budget(&self.budget));
        let gated: Arc<dyn ProbeClient> = Arc::new(GatedProbeClient::new(
            self.client.clone(),
            gates.clone(),
            self.cancel.clone(),
        ));
        let evaluator = LivenessEvaluator::new(gated, &self.budget, self.cancel.clone());

        let cap = self.budget.admission_cap().unwrap_or(usize::MAX);
        let window = self.budget.admission_window().max(1);

        info!(
            target = "probe.run",
            candidates = total,
            concurrency = self.budget.concurrency,
            per_host_limit = self.budget.effective_per_host_limit(),
            max_items = ?self.budget.admission_cap(),
            "probe run started"
        );

        let mut aggregator = ResultAggregator::new();
        let mut tasks: JoinSet<Verdict> = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, Candidate> = HashMap::new();
        let mut pending = candidates.into_iter();
        let mut admitted = 0usize;

        loop {
            while tasks.len() < window && admitted < cap && !self.cancel.is_cancelled() {
                let Some(candidate) = pending.next() else {
                    break;
                };
                admitted += 1;
                aggregator.admit(&candidate);

                let evaluator = evaluator.clone();
                let task_candidate = candidate.clone();
                let handle = tasks.spawn(async move { evaluator.evaluate(&task_candidate).await });
                in_flight.insert(handle.id(), candidate);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };
            match joined {
                Ok((id, verdict)) => {
                    in_flight.remove(&id);
                    aggregator.record(verdict);
                }
                Err(e) => {
                    let Some(candidate) = in_flight.remove(&e.id()) else {
                        warn!(target = "probe.run", "unknown task failed: {e}");
                        continue;
                    };
                    warn!(
                        target = "probe.run",
                        url = %UrlUtils::obfuscate_credentials(&candidate.url),
                        "evaluation task faulted: {e}"
                    );
                    aggregator.record(Verdict::unavailable(
                        candidate.url,
                        UnavailableReason::Internal,
                        format!("evaluation task faulted: {e}"),
                    ));
                }
            }
        }

        let skipped = total - admitted;
        if self.cancel.is_cancelled() {
            warn!(
                target = "probe.run",
                admitted, skipped, "probe run cancelled, remaining candidates skipped"
            );
        }

        let results = aggregator.finish(skipped);
        let summary = results.summary(started_at, started.elapsed());
        info!(
            target = "probe.run",
            checked = summary.checked,
            available = summary.available,
            unavailable = summary.unavailable,
            skipped = summary.skipped,
            hosts = gates.hosts().host_count(),
            elapsed_ms = summary.elapsed_ms,
            "probe run finished"
        );

        RunReport { results, summary }
    }
}
