use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::manifest::parse_channel_list;
use crate::models::{Candidate, ProbeOutcome};
use crate::utils::http_client::ProbeClient;
use crate::utils::retry::{RetryPolicy, with_retry};
use crate::utils::url::UrlUtils;

/// Whether a candidate URL points at a remote channel list to expand
pub fn is_remote_list(url: &str) -> bool {
    UrlUtils::is_http_url(url) && url.trim_end().to_ascii_lowercase().ends_with(".m3u")
}

/// Replace remote `.m3u` channel lists by their entries
///
/// A list that cannot be fetched stays in place as a candidate itself so the
/// failure is still reported by the probe run. Entry URLs are resolved against
/// the list's final URL.
pub async fn expand_remote_lists(
    candidates: Vec<Candidate>,
    client: &dyn ProbeClient,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
) -> Vec<Candidate> {
    let mut expanded = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if !is_remote_list(&candidate.url) || cancel.is_cancelled() {
            expanded.push(candidate);
            continue;
        }

        let safe_url = UrlUtils::obfuscate_credentials(&candidate.url);
        let fetched = with_retry(retry, cancel, "fetch_list", &candidate.url, || {
            client.fetch_text(&candidate.url)
        })
        .await;

        match fetched.outcome {
            ProbeOutcome::Success(success) => {
                let base = Url::parse(&success.final_url).ok();
                let entries = parse_channel_list(success.body.as_deref().unwrap_or_default());
                info!("Expanded remote list {} into {} entries", safe_url, entries.len());
                expanded.extend(entries.into_iter().map(|entry| {
                    let mut entry = entry.into_candidate();
                    entry.url = UrlUtils::resolve(base.as_ref(), &entry.url);
                    entry
                }));
            }
            failure => {
                warn!(
                    "Could not expand remote list {} ({}), probing it as a candidate",
                    safe_url,
                    failure.describe()
                );
                expanded.push(candidate);
            }
        }
    }

    debug!("{} candidates after remote list expansion", expanded.len());
    expanded
}
