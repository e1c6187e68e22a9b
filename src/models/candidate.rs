use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::url::UrlUtils;

/// A URL to probe plus the metadata it was collected with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Candidate URL; normalized once the candidate is part of a [`CandidateSet`]
    pub url: String,
    /// Human readable channel name, usually the `#EXTINF` title
    pub display_name: Option<String>,
    /// Original `#EXTINF` line, preserved so writers can reproduce it verbatim
    pub extinf: Option<String>,
}

impl Candidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: None,
            extinf: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_extinf(mut self, extinf: impl Into<String>) -> Self {
        self.extinf = Some(extinf.into());
        self
    }
}

/// Ordered, deduplicated candidates ready for probing
///
/// Built from raw candidates by normalizing each URL; on duplicates the
/// first-seen entry (and therefore its display name) wins. Empty URLs are
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    seen: HashSet<String>,
    duplicates: usize,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate, returning `false` when it was empty or a duplicate
    pub fn push(&mut self, candidate: Candidate) -> bool {
        let Some(normalized) = UrlUtils::normalize_candidate(&candidate.url) else {
            return false;
        };
        if !self.seen.insert(normalized.clone()) {
            self.duplicates += 1;
            debug!(
                url = %UrlUtils::obfuscate_credentials(&normalized),
                "Skipping duplicate candidate"
            );
            return false;
        }
        self.items.push(Candidate {
            url: normalized,
            ..candidate
        });
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of inputs dropped because their normalized URL was already present
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.items
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for candidate in iter {
            set.push(candidate);
        }
        set
    }
}

impl IntoIterator for CandidateSet {
    type Item = Candidate;
    type IntoIter = std::vec::IntoIter<Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_seen_display_name() {
        let set: CandidateSet = vec![
            Candidate::new("http://Example.com/live.m3u8").with_display_name("First"),
            Candidate::new("http://example.com/live.m3u8#x").with_display_name("Second"),
            Candidate::new("http://example.com/other.m3u8"),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.duplicates(), 1);
        let first = set.iter().next().unwrap();
        assert_eq!(first.url, "http://example.com/live.m3u8");
        assert_eq!(first.display_name.as_deref(), Some("First"));
    }

    #[test]
    fn test_empty_urls_are_dropped() {
        let set: CandidateSet = vec![Candidate::new("  "), Candidate::new("\u{a0}")]
            .into_iter()
            .collect();
        assert!(set.is_empty());
        assert_eq!(set.duplicates(), 0);
    }

    #[test]
    fn test_push_reports_duplicates() {
        let mut set = CandidateSet::new();
        assert!(set.push(Candidate::new("http://example.com/a.ts")));
        assert!(!set.push(Candidate::new("HTTP://EXAMPLE.COM/a.ts")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.duplicates(), 1);
    }
}
