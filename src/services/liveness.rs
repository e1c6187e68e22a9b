//! Per-candidate liveness evaluation
//!
//! Classify → fetch manifest → resolve at most one master hop → probe the
//! first segment (or the direct link) → apply policy. Every path ends in
//! exactly one [`Verdict`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::manifest::{Manifest, parse_manifest};
use crate::models::{
    AvailableEntry, Candidate, Confirmation, FailureCause, ProbeBudget, ProbeOutcome,
    UnavailableReason, Verdict, verdict::UNKNOWN_DISPLAY_NAME,
};
use crate::streaming::classification::{Classification, SNIFF_BYTES, SourceType, classify_source};
use crate::utils::http_client::ProbeClient;
use crate::utils::retry::{RetryOutcome, RetryPolicy, with_retry};
use crate::utils::url::UrlUtils;

/// Master manifests followed before the next one is rejected as invalid
pub const MAX_VARIANT_DEPTH: u8 = 1;

const OP_FETCH_SAMPLE: &str = "fetch_sample";
const OP_FETCH_MANIFEST: &str = "fetch_manifest";
const OP_FETCH_VARIANT: &str = "fetch_variant";
const OP_PROBE_SEGMENT: &str = "probe_segment";
const OP_PROBE_DIRECT: &str = "probe_direct";

/// Decides one candidate at a time; cheap to clone and share across tasks
///
/// Timeouts are per attempt. A candidate needs at most four sequential
/// operations (sample fetch, manifest fetch, variant fetch, segment probe),
/// each retried up to `retries + 1` times, and a segment or direct probe may
/// issue a HEAD plus a range GET. The worst case per candidate is therefore
/// bounded by roughly `4 × (retries + 1) × 2 × timeout` plus backoff of at
/// most `retries × retry_backoff_max` per operation.
#[derive(Clone)]
pub struct LivenessEvaluator {
    client: Arc<dyn ProbeClient>,
    retry: RetryPolicy,
    allow_playlist_only: bool,
    require_live: bool,
    cancel: CancellationToken,
}

/// Body and post-redirect URL of a fetched manifest
struct FetchedText {
    body: String,
    final_url: String,
}

impl LivenessEvaluator {
    pub fn new(client: Arc<dyn ProbeClient>, budget: &ProbeBudget, cancel: CancellationToken) -> Self {
        Self {
            client,
            retry: budget.retry_policy(),
            allow_playlist_only: budget.allow_playlist_only,
            require_live: budget.require_live,
            cancel,
        }
    }

    pub async fn evaluate(&self, candidate: &Candidate) -> Verdict {
        let url = candidate.url.as_str();
        let verdict = match classify_source(url, None) {
            Classification::Known(SourceType::PlaylistLike) => self.evaluate_playlist(candidate).await,
            Classification::Known(SourceType::DirectMediaLike) => self.evaluate_direct(candidate).await,
            Classification::Ambiguous => self.evaluate_ambiguous(candidate).await,
        };

        debug!(
            target = "probe.verdict",
            url = %UrlUtils::obfuscate_credentials(url),
            available = verdict.is_available(),
            reason = verdict.reason().map(|r| r.to_string()).unwrap_or_default(),
            "candidate decided"
        );
        verdict
    }

    /// No extension hint: read a short sample and decide from its content
    ///
    /// Only a sample that opens like a manifest leads to a full fetch. Any
    /// other non-empty 2xx body is media already flowing.
    async fn evaluate_ambiguous(&self, candidate: &Candidate) -> Verdict {
        let sampled = self
            .retrying(OP_FETCH_SAMPLE, &candidate.url, Operation::Sample)
            .await;
        let success = match &sampled.outcome {
            ProbeOutcome::Success(success) => success,
            _ => return fetch_failure(candidate, &sampled, UnavailableReason::FetchFailed),
        };

        let sample = success.body.as_deref().unwrap_or_default();
        match classify_source(&candidate.url, Some(sample.as_bytes())) {
            Classification::Known(SourceType::PlaylistLike) => self.evaluate_playlist(candidate).await,
            _ if success.bytes_received == 0 => self.evaluate_direct(candidate).await,
            _ if self.require_live => unavailable(candidate, UnavailableReason::NotLive, "direct media link"),
            _ => available(candidate, Confirmation::DirectMedia),
        }
    }

    async fn evaluate_playlist(&self, candidate: &Candidate) -> Verdict {
        let fetched = match self.fetch_text(OP_FETCH_MANIFEST, &candidate.url).await {
            Ok(fetched) => fetched,
            Err(failure) => return fetch_failure(candidate, &failure, UnavailableReason::FetchFailed),
        };

        let mut manifest = match parse_at(&fetched) {
            Ok(manifest) => manifest,
            Err(detail) => return unavailable(candidate, UnavailableReason::InvalidManifest, detail),
        };

        let mut depth = 0u8;
        while manifest.is_master() {
            if depth >= MAX_VARIANT_DEPTH {
                return unavailable(
                    candidate,
                    UnavailableReason::InvalidManifest,
                    "variant resolves to another master manifest",
                );
            }
            depth += 1;

            let Some(variant) = manifest.best_variant() else {
                return unavailable(candidate, UnavailableReason::InvalidManifest, "master manifest has no variants");
            };
            let variant_url = variant.uri.clone();
            let fetched = match self.fetch_text(OP_FETCH_VARIANT, &variant_url).await {
                Ok(fetched) => fetched,
                Err(failure) => {
                    return fetch_failure(candidate, &failure, UnavailableReason::FetchFailed);
                }
            };
            manifest = match parse_at(&fetched) {
                Ok(manifest) => manifest,
                Err(detail) => {
                    return unavailable(
                        candidate,
                        UnavailableReason::InvalidManifest,
                        format!("variant: {detail}"),
                    );
                }
            };
        }

        self.decide_media(candidate, &manifest).await
    }

    async fn decide_media(&self, candidate: &Candidate, manifest: &Manifest) -> Verdict {
        let Some(segment) = manifest.first_segment() else {
            return unavailable(candidate, UnavailableReason::EmptyManifest, "manifest lists no segments");
        };

        if self.require_live && manifest.is_vod() {
            return unavailable(candidate, UnavailableReason::NotLive, "manifest is a finished VOD list");
        }

        let probe = self
            .retrying(OP_PROBE_SEGMENT, &segment.uri, Operation::HeadOrRange)
            .await;
        match &probe.outcome {
            ProbeOutcome::Success(_) => available(candidate, Confirmation::SegmentConfirmed),
            outcome if outcome.cause() == Some(&FailureCause::Cancelled) => {
                unavailable(candidate, UnavailableReason::Cancelled, "cancelled")
            }
            _ if self.allow_playlist_only => available(candidate, Confirmation::PlaylistOnly),
            outcome => unavailable(
                candidate,
                UnavailableReason::SegmentUnreachable,
                format!("segment: {}", outcome.describe()),
            ),
        }
    }

    async fn evaluate_direct(&self, candidate: &Candidate) -> Verdict {
        if self.require_live {
            return unavailable(candidate, UnavailableReason::NotLive, "direct media link");
        }

        let probe = self
            .retrying(OP_PROBE_DIRECT, &candidate.url, Operation::HeadOrRange)
            .await;
        match probe.outcome {
            ProbeOutcome::Success(_) => available(candidate, Confirmation::DirectMedia),
            _ => fetch_failure(candidate, &probe, UnavailableReason::Unreachable),
        }
    }

    async fn fetch_text(&self, operation: &'static str, url: &str) -> Result<FetchedText, RetryOutcome> {
        let fetched = self.retrying(operation, url, Operation::Text).await;
        match fetched.outcome {
            ProbeOutcome::Success(success) => Ok(FetchedText {
                body: success.body.unwrap_or_default(),
                final_url: success.final_url,
            }),
            _ => Err(fetched),
        }
    }

    async fn retrying(&self, operation: &'static str, url: &str, kind: Operation) -> RetryOutcome {
        with_retry(&self.retry, &self.cancel, operation, url, || async move {
            match kind {
                Operation::Text => self.client.fetch_text(url).await,
                Operation::Sample => self.client.fetch_sample(url, SNIFF_BYTES).await,
                Operation::HeadOrRange => self.client.head_or_range_get(url).await,
            }
        })
        .await
    }
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Text,
    Sample,
    HeadOrRange,
}

fn parse_at(fetched: &FetchedText) -> Result<Manifest, String> {
    let base = Url::parse(&fetched.final_url).ok();
    parse_manifest(&fetched.body, base.as_ref()).map_err(|e| e.to_string())
}

fn display_name(candidate: &Candidate) -> String {
    candidate
        .display_name
        .clone()
        .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string())
}

fn available(candidate: &Candidate, confirmation: Confirmation) -> Verdict {
    Verdict::Available(AvailableEntry {
        display_name: display_name(candidate),
        uri: candidate.url.clone(),
        extinf: candidate.extinf.clone(),
        confirmation,
    })
}

fn unavailable(candidate: &Candidate, reason: UnavailableReason, detail: impl Into<String>) -> Verdict {
    Verdict::unavailable(candidate.url.clone(), reason, detail)
}

/// Verdict for a failed fetch or probe, refined to Cancelled, RedirectLoop or Timeout
fn fetch_failure(candidate: &Candidate, failure: &RetryOutcome, default: UnavailableReason) -> Verdict {
    let reason = match failure.outcome.cause() {
        Some(FailureCause::Cancelled) => UnavailableReason::Cancelled,
        Some(FailureCause::RedirectLoop) => UnavailableReason::RedirectLoop,
        _ if failure.timed_out_every_attempt => UnavailableReason::Timeout,
        _ => default,
    };
    let detail = format!(
        "{} after {} attempt(s)",
        failure.outcome.describe(),
        failure.attempts
    );
    unavailable(candidate, reason, detail)
}
