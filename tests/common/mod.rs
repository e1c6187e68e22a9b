//! Scripted in-memory `ProbeClient` shared by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use m3u_prober::models::{FailureCause, ProbeBudget, ProbeOutcome, ProbeSuccess};
use m3u_prober::utils::http_client::ProbeClient;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Text,
    /// Bounded GET; falls back to the `Text` script and truncates its body
    Sample,
    Probe,
}

/// Answers are looked up by `(call kind, url)`. A scripted sequence is
/// consumed front to back and its last entry repeats. Unscripted URLs
/// answer 404.
#[derive(Default)]
pub struct FakeClient {
    scripts: Mutex<HashMap<(Call, String), VecDeque<ProbeOutcome>>>,
    calls: Mutex<HashMap<(Call, String), usize>>,
    delay: Option<Duration>,
    panic_marker: Option<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    hosts: Mutex<HashMap<String, (usize, usize)>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Any call whose URL contains `marker` panics
    pub fn panicking_on(mut self, marker: &str) -> Self {
        self.panic_marker = Some(marker.to_string());
        self
    }

    pub fn script(self, call: Call, url: &str, outcomes: Vec<ProbeOutcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert((call, url.to_string()), outcomes.into());
        self
    }

    pub fn text(self, url: &str, body: &str) -> Self {
        self.script(Call::Text, url, vec![text_ok(url, body)])
    }

    pub fn text_status(self, url: &str, status: u16) -> Self {
        self.script(Call::Text, url, vec![ProbeOutcome::from_status(status)])
    }

    pub fn probe_ok(self, url: &str) -> Self {
        self.script(Call::Probe, url, vec![probe_ok(url)])
    }

    pub fn probe_status(self, url: &str, status: u16) -> Self {
        self.script(Call::Probe, url, vec![ProbeOutcome::from_status(status)])
    }

    pub fn calls(&self, call: Call, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&(call, url.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    /// Distinct URLs that saw at least one call
    pub fn touched_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .calls
            .lock()
            .unwrap()
            .keys()
            .map(|(_, url)| url.clone())
            .collect();
        urls.sort();
        urls.dedup();
        urls
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight_for(&self, host: &str) -> usize {
        self.hosts
            .lock()
            .unwrap()
            .get(host)
            .map(|(_, max)| *max)
            .unwrap_or(0)
    }

    async fn answer(&self, call: Call, url: &str) -> ProbeOutcome {
        if let Some(marker) = &self.panic_marker {
            if url.contains(marker.as_str()) {
                panic!("scripted panic for {url}");
            }
        }

        *self
            .calls
            .lock()
            .unwrap()
            .entry((call, url.to_string()))
            .or_default() += 1;

        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        {
            let mut hosts = self.hosts.lock().unwrap();
            let entry = hosts.entry(host.clone()).or_default();
            entry.0 += 1;
            entry.1 = entry.1.max(entry.0);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = {
            let mut scripts = self.scripts.lock().unwrap();
            let key = match (call, scripts.contains_key(&(call, url.to_string()))) {
                (Call::Sample, false) => (Call::Text, url.to_string()),
                _ => (call, url.to_string()),
            };
            match scripts.get_mut(&key) {
                Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
                Some(queue) => queue.front().cloned().unwrap(),
                None => ProbeOutcome::from_status(404),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(entry) = self.hosts.lock().unwrap().get_mut(&host) {
            entry.0 -= 1;
        }
        outcome
    }
}

#[async_trait]
impl ProbeClient for FakeClient {
    async fn fetch_text(&self, url: &str) -> ProbeOutcome {
        self.answer(Call::Text, url).await
    }

    async fn fetch_sample(&self, url: &str, limit: usize) -> ProbeOutcome {
        match self.answer(Call::Sample, url).await {
            ProbeOutcome::Success(mut success) => {
                if let Some(body) = success.body.as_mut() {
                    let mut end = limit.min(body.len());
                    while !body.is_char_boundary(end) {
                        end -= 1;
                    }
                    body.truncate(end);
                    success.bytes_received = end as u64;
                }
                ProbeOutcome::Success(success)
            }
            other => other,
        }
    }

    async fn head_or_range_get(&self, url: &str) -> ProbeOutcome {
        self.answer(Call::Probe, url).await
    }
}

pub fn text_ok(url: &str, body: &str) -> ProbeOutcome {
    ProbeOutcome::Success(ProbeSuccess {
        status: 200,
        final_url: url.to_string(),
        bytes_received: body.len() as u64,
        body: Some(body.to_string()),
    })
}

pub fn probe_ok(url: &str) -> ProbeOutcome {
    ProbeOutcome::Success(ProbeSuccess {
        status: 206,
        final_url: url.to_string(),
        bytes_received: 2049,
        body: None,
    })
}

pub fn timeout() -> ProbeOutcome {
    ProbeOutcome::TransientFailure(FailureCause::Timeout)
}

/// Budget with millisecond backoff so retry tests stay fast
pub fn fast_budget() -> ProbeBudget {
    ProbeBudget {
        timeout: Duration::from_millis(500),
        retry_backoff: Duration::from_millis(1),
        retry_backoff_max: Duration::from_millis(2),
        ..ProbeBudget::default()
    }
}

pub fn media_manifest(segments: &[&str]) -> String {
    let mut text = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:1\n");
    for segment in segments {
        text.push_str("#EXTINF:6.0,\n");
        text.push_str(segment);
        text.push('\n');
    }
    text
}

pub fn vod_manifest(segments: &[&str]) -> String {
    let mut text = media_manifest(segments);
    text.insert_str("#EXTM3U\n".len(), "#EXT-X-PLAYLIST-TYPE:VOD\n");
    text.push_str("#EXT-X-ENDLIST\n");
    text
}

pub fn master_manifest(variants: &[(u64, &str)]) -> String {
    let mut text = String::from("#EXTM3U\n");
    for (bandwidth, uri) in variants {
        text.push_str(&format!("#EXT-X-STREAM-INF:BANDWIDTH={bandwidth},RESOLUTION=1280x720\n{uri}\n"));
    }
    text
}
