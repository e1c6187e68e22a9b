use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, HeaderMap, HeaderValue, RANGE};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::config::HttpConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{FailureCause, ProbeOutcome, ProbeSuccess};
use crate::utils::url::UrlUtils;

/// Single-attempt network primitives used by the liveness evaluator
///
/// Implementations never retry and never return `Err`: every attempt is
/// reported as a [`ProbeOutcome`].
#[async_trait]
pub trait ProbeClient: Send + Sync {
    /// GET a text body. Only 2xx is success; the body is carried on the outcome.
    async fn fetch_text(&self, url: &str) -> ProbeOutcome;

    /// GET at most `limit` bytes of the body and drop the connection.
    /// Only 2xx is success; the sample is carried on the outcome.
    async fn fetch_sample(&self, url: &str, limit: usize) -> ProbeOutcome;

    /// Existence check: HEAD, falling back to a small byte-range GET.
    /// Success means HTTP 200 or 206.
    async fn head_or_range_get(&self, url: &str) -> ProbeOutcome;
}

#[async_trait]
impl<T: ProbeClient + ?Sized> ProbeClient for Arc<T> {
    async fn fetch_text(&self, url: &str) -> ProbeOutcome {
        (**self).fetch_text(url).await
    }

    async fn fetch_sample(&self, url: &str, limit: usize) -> ProbeOutcome {
        (**self).fetch_sample(url, limit).await
    }

    async fn head_or_range_get(&self, url: &str) -> ProbeOutcome {
        (**self).head_or_range_get(url).await
    }
}

/// [`ProbeClient`] backed by a shared reqwest client
#[derive(Clone)]
pub struct ReqwestProbeClient {
    client: Client,
    timeout: Duration,
    range_header: HeaderValue,
    max_body_bytes: usize,
}

impl ReqwestProbeClient {
    /// Build the client; `timeout` applies to each attempt
    pub fn new(config: &HttpConfig, timeout: Duration) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(Policy::limited(config.max_redirects))
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        builder = match config.proxy.as_deref() {
            Some(proxy) => builder.proxy(Proxy::all(proxy)?),
            None => builder.no_proxy(),
        };

        let last_byte = config
            .range_bytes
            .checked_sub(1)
            .ok_or_else(|| AppError::configuration("http.range_bytes must be greater than 0"))?;
        let range_header = HeaderValue::from_str(&format!("bytes=0-{last_byte}"))
            .map_err(|e| AppError::internal(format!("Invalid range header: {e}")))?;

        Ok(Self {
            client: builder.build()?,
            timeout,
            range_header,
            max_body_bytes: config.max_manifest_bytes,
        })
    }

    async fn range_get(&self, url: Url) -> ProbeOutcome {
        let response = match self
            .client
            .get(url)
            .header(RANGE, self.range_header.clone())
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status();
        if !is_probe_success(status) {
            return ProbeOutcome::from_status(status.as_u16());
        }

        let final_url = response.url().to_string();
        let mut response = response;
        // The status alone decides success; a failed first chunk still counts.
        let bytes_received = match response.chunk().await {
            Ok(Some(chunk)) => chunk.len() as u64,
            _ => 0,
        };

        ProbeOutcome::Success(ProbeSuccess {
            status: status.as_u16(),
            final_url,
            bytes_received,
            body: None,
        })
    }

    /// GET `url` and keep at most `limit` bytes of a 2xx body
    async fn get_bounded(&self, url: &str, limit: usize) -> ProbeOutcome {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => return ProbeOutcome::PermanentFailure(FailureCause::InvalidUrl(e.to_string())),
        };

        let response = match self.client.get(parsed).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeOutcome::from_status(status.as_u16());
        }

        let final_url = response.url().to_string();
        match read_bounded(response, limit).await {
            Ok(bytes) => {
                debug!(
                    target = "probe.http",
                    url = %UrlUtils::obfuscate_credentials(url),
                    status = status.as_u16(),
                    bytes = bytes.len(),
                    limit,
                    "fetched body"
                );
                ProbeOutcome::Success(ProbeSuccess {
                    status: status.as_u16(),
                    final_url,
                    bytes_received: bytes.len() as u64,
                    body: Some(String::from_utf8_lossy(&bytes).into_owned()),
                })
            }
            Err(e) => classify_error(&e),
        }
    }
}

#[async_trait]
impl ProbeClient for ReqwestProbeClient {
    async fn fetch_text(&self, url: &str) -> ProbeOutcome {
        self.get_bounded(url, self.max_body_bytes).await
    }

    async fn fetch_sample(&self, url: &str, limit: usize) -> ProbeOutcome {
        self.get_bounded(url, limit.min(self.max_body_bytes)).await
    }

    async fn head_or_range_get(&self, url: &str) -> ProbeOutcome {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => return ProbeOutcome::PermanentFailure(FailureCause::InvalidUrl(e.to_string())),
        };

        match self.client.head(parsed.clone()).timeout(self.timeout).send().await {
            Ok(response) if is_probe_success(response.status()) && has_content_length(&response) => {
                return ProbeOutcome::Success(ProbeSuccess {
                    status: response.status().as_u16(),
                    final_url: response.url().to_string(),
                    bytes_received: 0,
                    body: None,
                });
            }
            Ok(response) => {
                debug!(
                    target = "probe.http",
                    url = %UrlUtils::obfuscate_credentials(url),
                    status = response.status().as_u16(),
                    "HEAD inconclusive, falling back to range GET"
                );
            }
            Err(e) => {
                let outcome = classify_error(&e);
                // A GET to the same host would fail the same way.
                if !matches!(
                    outcome.cause(),
                    Some(FailureCause::Connection(_)) | Some(FailureCause::Body(_))
                ) {
                    return outcome;
                }
                debug!(
                    target = "probe.http",
                    url = %UrlUtils::obfuscate_credentials(url),
                    error = %outcome.describe(),
                    "HEAD failed, falling back to range GET"
                );
            }
        }

        self.range_get(parsed).await
    }
}

fn is_probe_success(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::PARTIAL_CONTENT
}

fn has_content_length(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

/// Read at most `limit` bytes of the body, truncating the rest
async fn read_bounded(response: Response, limit: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut body = response.bytes_stream();
    let mut collected: Vec<u8> = Vec::with_capacity(8192.min(limit));
    while collected.len() < limit {
        let Some(chunk) = body.next().await else {
            break;
        };
        let chunk = chunk?;
        let remaining = limit - collected.len();
        if chunk.len() >= remaining {
            collected.extend_from_slice(&chunk[..remaining]);
            break;
        }
        collected.extend_from_slice(&chunk);
    }
    Ok(collected)
}

/// Map a reqwest error onto the transient/permanent taxonomy
pub fn classify_error(error: &reqwest::Error) -> ProbeOutcome {
    let message = UrlUtils::obfuscate_credentials(&error_chain(error));
    if error.is_timeout() {
        return ProbeOutcome::TransientFailure(FailureCause::Timeout);
    }
    if error.is_redirect() {
        return ProbeOutcome::PermanentFailure(FailureCause::RedirectLoop);
    }
    if error.is_builder() {
        return ProbeOutcome::PermanentFailure(FailureCause::InvalidUrl(message));
    }

    let lower = message.to_ascii_lowercase();
    if lower.contains("dns error") || lower.contains("failed to lookup") {
        return ProbeOutcome::PermanentFailure(FailureCause::Dns(message));
    }
    if lower.contains("certificate") || lower.contains("tls") || lower.contains("handshake") {
        return ProbeOutcome::PermanentFailure(FailureCause::Tls(message));
    }
    if error.is_body() || error.is_decode() {
        return ProbeOutcome::TransientFailure(FailureCause::Body(message));
    }
    ProbeOutcome::TransientFailure(FailureCause::Connection(message))
}

/// Error message including every source in the chain
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
