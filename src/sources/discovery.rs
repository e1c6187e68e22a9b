//! Discovery of additional candidate lists
//!
//! Presets name well-known public channel lists. Crawling fetches seed pages
//! and extracts playlist links from `href`/`src` attributes and bare URLs.
//! GitHub code search finds `.m3u` files in public repositories.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{DiscoveryConfig, HttpConfig};
use crate::errors::{AppError, AppResult};
use crate::models::ProbeOutcome;
use crate::utils::http_client::ProbeClient;
use crate::utils::retry::{RetryPolicy, with_retry};
use crate::utils::url::UrlUtils;

/// Preset name to public channel list URL
pub const PRESETS: &[(&str, &str)] = &[
    ("all", "https://iptv-org.github.io/iptv/index.m3u"),
    ("cn", "https://iptv-org.github.io/iptv/countries/cn.m3u"),
    ("us", "https://iptv-org.github.io/iptv/countries/us.m3u"),
    ("sports", "https://iptv-org.github.io/iptv/categories/sports.m3u"),
    ("news", "https://iptv-org.github.io/iptv/categories/news.m3u"),
];

pub fn preset_url(name: &str) -> Option<&'static str> {
    PRESETS
        .iter()
        .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
        .map(|(_, url)| *url)
}

/// Resolve preset names, warning about unknown ones
pub fn preset_urls(names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter_map(|name| match preset_url(name) {
            Some(url) => Some(url.to_string()),
            None => {
                warn!("Unknown discovery preset '{}' ignored", name);
                None
            }
        })
        .collect()
}

fn attribute_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:href|src)\s*=\s*["']([^"']+)["']"#).expect("valid attribute link regex")
    })
}

fn bare_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)https?://[^\s"'<>]+"#).expect("valid bare URL regex"))
}

fn is_playlist_link(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.ends_with(".m3u")
        || lower.ends_with(".m3u8")
        || lower.contains(".m3u8?")
        || lower.contains(".m3u?")
}

/// Playlist links in a page, resolved against `base`, deduplicated in first-seen order
pub fn extract_playlist_links(html: &str, base: Option<&Url>) -> Vec<String> {
    let from_attributes = attribute_link_regex()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|link| !link.is_empty())
        .map(|link| UrlUtils::resolve(base, link));
    let bare = bare_url_regex()
        .find_iter(html)
        .map(|m| m.as_str().trim().to_string());

    let mut seen = HashSet::new();
    from_attributes
        .chain(bare)
        .filter(|link| is_playlist_link(link))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Fetch seed pages and collect the playlist links they contain
pub async fn crawl_pages(
    pages: &[String],
    client: &dyn ProbeClient,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for page in pages {
        if cancel.is_cancelled() {
            break;
        }
        let fetched = with_retry(retry, cancel, "fetch_page", page, || client.fetch_text(page)).await;
        let success = match fetched.outcome {
            ProbeOutcome::Success(success) => success,
            failure => {
                warn!(
                    "Skipping crawl page {}: {}",
                    UrlUtils::obfuscate_credentials(page),
                    failure.describe()
                );
                continue;
            }
        };

        let base = Url::parse(&success.final_url).ok();
        let links = extract_playlist_links(success.body.as_deref().unwrap_or_default(), base.as_ref());
        debug!("Crawl page {} yielded {} links", UrlUtils::obfuscate_credentials(page), links.len());
        found.extend(links.into_iter().filter(|link| seen.insert(link.clone())));
    }

    info!("Crawl discovered {} playlist links from {} pages", found.len(), pages.len());
    found
}

/// Search result pages requested per query
pub const GITHUB_MAX_PAGES: u32 = 5;
const GITHUB_PER_PAGE: u32 = 50;
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const GITHUB_FILE_FILTER: &str = "(extension:m3u OR extension:m3u8)";

#[derive(Debug, Deserialize)]
struct CodeSearchPage {
    #[serde(default)]
    items: Vec<CodeSearchItem>,
}

#[derive(Debug, Deserialize)]
struct CodeSearchItem {
    /// Contents API URL of the matched file
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentMeta {
    download_url: Option<String>,
}

/// GitHub code-search discovery of raw `.m3u` files
///
/// Each query is limited to `.m3u`/`.m3u8` files and walked for at most
/// [`GITHUB_MAX_PAGES`] pages of [`GITHUB_PER_PAGE`] results. Every hit is
/// resolved through the contents API; only download URLs ending in `.m3u`
/// are kept. A failed search page ends that query, a failed contents lookup
/// skips that hit.
pub struct GithubSearch {
    client: Client,
    api_url: String,
    queries: Vec<String>,
    max_items: usize,
}

impl GithubSearch {
    /// `None` when no search keywords are configured
    pub fn from_config(
        http: &HttpConfig,
        discovery: &DiscoveryConfig,
        timeout: Duration,
    ) -> AppResult<Option<Self>> {
        if discovery.github_search.is_empty() {
            return Ok(None);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        if let Some(token) = discovery.github_token.as_deref().filter(|t| !t.trim().is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| AppError::configuration(format!("Invalid GitHub token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .user_agent(http.user_agent.as_str())
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(timeout);
        builder = match http.proxy.as_deref() {
            Some(proxy) => builder.proxy(Proxy::all(proxy)?),
            None => builder.no_proxy(),
        };

        Ok(Some(Self {
            client: builder.build()?,
            api_url: discovery.github_api_url.trim_end_matches('/').to_string(),
            queries: discovery.github_search.clone(),
            max_items: discovery.github_max,
        }))
    }

    /// Download URLs found across all queries, at most `github_max` in total
    pub async fn discover(&self, cancel: &CancellationToken) -> Vec<String> {
        let mut urls = Vec::new();

        for query in &self.queries {
            let query = format!("{GITHUB_FILE_FILTER} {query}").trim().to_string();
            let mut page = 1;
            while urls.len() < self.max_items && page <= GITHUB_MAX_PAGES {
                if cancel.is_cancelled() {
                    return urls;
                }
                let Some(items) = self.search_page(&query, page).await else {
                    break;
                };
                if items.is_empty() {
                    break;
                }

                for item in items {
                    if urls.len() >= self.max_items || cancel.is_cancelled() {
                        break;
                    }
                    let Some(contents_url) = item.url else {
                        continue;
                    };
                    let download = self.download_url(&contents_url).await;
                    if let Some(download) = download.filter(|d| d.to_ascii_lowercase().ends_with(".m3u")) {
                        urls.push(download);
                    }
                }
                page += 1;
            }
        }

        info!(
            "GitHub search discovered {} playlist files from {} queries",
            urls.len(),
            self.queries.len()
        );
        urls
    }

    async fn search_page(&self, query: &str, page: u32) -> Option<Vec<CodeSearchItem>> {
        let per_page = GITHUB_PER_PAGE.to_string();
        let page_number = page.to_string();
        let url = Url::parse_with_params(
            &format!("{}/search/code", self.api_url),
            &[("q", query), ("per_page", &per_page), ("page", &page_number)],
        )
        .ok()?;

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("GitHub search for '{}' failed: {}", query, e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(
                "GitHub search for '{}' page {} returned HTTP {}",
                query,
                page,
                response.status().as_u16()
            );
            return None;
        }

        match response.json::<CodeSearchPage>().await {
            Ok(results) => {
                debug!("GitHub search page {} for '{}' has {} hits", page, query, results.items.len());
                Some(results.items)
            }
            Err(e) => {
                warn!("Failed to parse GitHub search response: {}", e);
                None
            }
        }
    }

    async fn download_url(&self, contents_url: &str) -> Option<String> {
        let response = match self.client.get(contents_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("GitHub contents {} returned HTTP {}", contents_url, response.status().as_u16());
                return None;
            }
            Err(e) => {
                debug!("GitHub contents {} failed: {}", contents_url, e);
                return None;
            }
        };
        response
            .json::<ContentMeta>()
            .await
            .ok()
            .and_then(|meta| meta.download_url)
    }
}
