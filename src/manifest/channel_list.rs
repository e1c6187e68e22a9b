use std::collections::HashMap;

use tracing::debug;

use super::attributes::{find_unquoted_comma, parse_attributes};
use crate::models::Candidate;

/// One `#EXTINF` + URL pair from a channel list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    /// The `#EXTINF` line exactly as written, if the URL had one
    pub extinf: Option<String>,
    pub display_name: Option<String>,
    pub url: String,
    /// `tvg-id`, `tvg-name`, `tvg-logo`, `group-title` and any other attributes
    pub attributes: HashMap<String, String>,
}

impl ChannelEntry {
    pub fn group_title(&self) -> Option<&str> {
        self.attributes.get("group-title").map(String::as_str)
    }

    pub fn tvg_id(&self) -> Option<&str> {
        self.attributes.get("tvg-id").map(String::as_str)
    }

    pub fn into_candidate(self) -> Candidate {
        Candidate {
            url: self.url,
            display_name: self.display_name,
            extinf: self.extinf,
        }
    }
}

/// Display name of an `#EXTINF` line: the text after the first comma outside quotes
pub fn display_name_from_extinf(extinf: &str) -> Option<String> {
    let body = extinf.strip_prefix("#EXTINF:").unwrap_or(extinf);
    let idx = find_unquoted_comma(body)?;
    let name = body[idx + 1..].trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Parse an M3U channel list
///
/// Lenient: the `#EXTM3U` header is optional and unknown tags are skipped.
/// A URL line without a preceding `#EXTINF` becomes an entry with no metadata.
pub fn parse_channel_list(content: &str) -> Vec<ChannelEntry> {
    let mut entries = Vec::new();
    let mut current_extinf: Option<&str> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("#EXTINF") {
            current_extinf = Some(line);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let (display_name, attributes) = match current_extinf {
            Some(extinf) => {
                let body = extinf.strip_prefix("#EXTINF:").unwrap_or(extinf);
                let head = match find_unquoted_comma(body) {
                    Some(idx) => &body[..idx],
                    None => body,
                };
                (
                    display_name_from_extinf(extinf),
                    parse_attributes(head, char::is_whitespace),
                )
            }
            None => (None, HashMap::new()),
        };

        entries.push(ChannelEntry {
            extinf: current_extinf.take().map(str::to_string),
            display_name,
            url: line.to_string(),
            attributes,
        });
    }

    debug!("Parsed {} channel list entries", entries.len());
    entries
}
