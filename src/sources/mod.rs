//! Candidate collection: local inputs, discovery presets, page crawl, GitHub
//! search and remote channel-list expansion.

pub mod discovery;
pub mod expand;
pub mod inputs;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::DiscoveryConfig;
use crate::errors::AppResult;
use crate::models::{Candidate, CandidateSet};
use crate::utils::http_client::ProbeClient;
use crate::utils::retry::RetryPolicy;

/// Gather, expand and deduplicate every candidate for a run
pub async fn collect_candidates(
    inputs: &[String],
    discovery: &DiscoveryConfig,
    github: Option<&discovery::GithubSearch>,
    client: &dyn ProbeClient,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
) -> AppResult<CandidateSet> {
    let mut raw = inputs::read_inputs(inputs).await?;
    raw.extend(
        discovery::preset_urls(&discovery.presets)
            .into_iter()
            .map(Candidate::new),
    );
    if !discovery.crawl.is_empty() {
        let crawled = discovery::crawl_pages(&discovery.crawl, client, retry, cancel).await;
        raw.extend(crawled.into_iter().map(Candidate::new));
    }
    if let Some(github) = github {
        let found = github.discover(cancel).await;
        raw.extend(found.into_iter().map(Candidate::new));
    }

    let expanded = expand::expand_remote_lists(raw, client, retry, cancel).await;
    let set: CandidateSet = expanded.into_iter().collect();
    info!(
        "{} unique candidates ({} duplicates dropped)",
        set.len(),
        set.duplicates()
    );
    Ok(set)
}
