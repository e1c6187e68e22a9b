//! Admission gates for network calls
//!
//! Two independent limits apply to every network call: a global semaphore and
//! a per-host semaphore. Per-host semaphores are created lazily and stored in a
//! sharded map so that hosts never contend on a single lock.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::models::{FailureCause, ProbeBudget, ProbeOutcome};
use crate::utils::http_client::ProbeClient;
use crate::utils::url::UrlUtils;

/// Key used for URLs without a parsable host; they share one gate
const UNKNOWN_HOST: &str = "<unknown>";

/// Lazily populated per-host semaphores
pub struct HostLimiter {
    per_host: usize,
    hosts: DashMap<String, Arc<Semaphore>>,
}

impl HostLimiter {
    pub fn new(per_host: usize) -> Self {
        Self {
            per_host,
            hosts: DashMap::new(),
        }
    }

    /// Semaphore for a host key, created on first sight
    pub fn semaphore(&self, host: &str) -> Arc<Semaphore> {
        if let Some(existing) = self.hosts.get(host) {
            return existing.value().clone();
        }
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host)))
            .value()
            .clone()
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn per_host_limit(&self) -> usize {
        self.per_host
    }
}

/// Both permits for one network call; dropping it releases them
pub struct CallPermit {
    _host: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// The global and per-host gates shared by every evaluation in a run
pub struct AdmissionGates {
    global: Arc<Semaphore>,
    hosts: HostLimiter,
}

impl AdmissionGates {
    pub fn new(global_limit: usize, per_host_limit: usize) -> Self {
        Self {
            global: Arc::new(Semaphore::new(global_limit)),
            hosts: HostLimiter::new(per_host_limit.min(global_limit)),
        }
    }

    pub fn from_budget(budget: &ProbeBudget) -> Self {
        Self::new(budget.concurrency, budget.effective_per_host_limit())
    }

    /// Wait for the host permit, then the global permit
    ///
    /// Taking the host permit first keeps a task that waits on a saturated
    /// host from holding global capacity. Returns `None` if `cancel` fires
    /// while waiting.
    pub async fn acquire(&self, url: &str, cancel: &CancellationToken) -> Option<CallPermit> {
        let host = UrlUtils::host_key(url).unwrap_or_else(|| UNKNOWN_HOST.to_string());
        let host_semaphore = self.hosts.semaphore(&host);

        let host_permit = tokio::select! {
            _ = cancel.cancelled() => return None,
            permit = host_semaphore.acquire_owned() => permit.ok()?,
        };
        let global_permit = tokio::select! {
            _ = cancel.cancelled() => return None,
            permit = self.global.clone().acquire_owned() => permit.ok()?,
        };

        trace!(target = "probe.gate", host = %host, "call admitted");
        Some(CallPermit {
            _host: host_permit,
            _global: global_permit,
        })
    }

    pub fn hosts(&self) -> &HostLimiter {
        &self.hosts
    }

    pub fn available_global(&self) -> usize {
        self.global.available_permits()
    }
}

/// [`ProbeClient`] decorator that holds both gates for the duration of each call
pub struct GatedProbeClient<C> {
    inner: C,
    gates: Arc<AdmissionGates>,
    cancel: CancellationToken,
}

impl<C: ProbeClient> GatedProbeClient<C> {
    pub fn new(inner: C, gates: Arc<AdmissionGates>, cancel: CancellationToken) -> Self {
        Self {
            inner,
            gates,
            cancel,
        }
    }
}

#[async_trait]
impl<C: ProbeClient> ProbeClient for GatedProbeClient<C> {
    async fn fetch_text(&self, url: &str) -> ProbeOutcome {
        let Some(_permit) = self.gates.acquire(url, &self.cancel).await else {
            return ProbeOutcome::PermanentFailure(FailureCause::Cancelled);
        };
        self.inner.fetch_text(url).await
    }

    async fn fetch_sample(&self, url: &str, limit: usize) -> ProbeOutcome {
        let Some(_permit) = self.gates.acquire(url, &self.cancel).await else {
            return ProbeOutcome::PermanentFailure(FailureCause::Cancelled);
        };
        self.inner.fetch_sample(url, limit).await
    }

    async fn head_or_range_get(&self, url: &str) -> ProbeOutcome {
        let Some(_permit) = self.gates.acquire(url, &self.cancel).await else {
            return ProbeOutcome::PermanentFailure(FailureCause::Cancelled);
        };
        self.inner.head_or_range_get(url).await
    }
}
