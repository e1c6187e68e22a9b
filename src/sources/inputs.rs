use std::path::Path;

use tracing::{debug, info, warn};

use crate::errors::AppResult;
use crate::manifest::parse_channel_list;
use crate::models::Candidate;
use crate::utils::url::UrlUtils;

/// Read candidates from local files and literal URLs
///
/// Files ending in `.m3u`/`.m3u8` are parsed as channel lists so their
/// `#EXTINF` metadata is kept. Any other file is read as one URL per line,
/// skipping blank lines and `#` comments. Items that are neither an existing
/// file nor an `http(s)` URL are ignored with a warning.
pub async fn read_inputs(items: &[String]) -> AppResult<Vec<Candidate>> {
    let mut candidates = Vec::new();

    for item in items {
        let path = Path::new(item);
        if tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file()) {
            let content = decode_text(&tokio::fs::read(path).await?);
            let before = candidates.len();
            if is_channel_list_path(item) {
                candidates.extend(
                    parse_channel_list(&content)
                        .into_iter()
                        .map(|entry| entry.into_candidate()),
                );
            } else {
                candidates.extend(url_lines(&content).map(Candidate::new));
            }
            debug!("Read {} candidates from {}", candidates.len() - before, item);
        } else if UrlUtils::is_http_url(item) {
            candidates.push(Candidate::new(item.trim()));
        } else {
            warn!("Ignoring input that is neither a file nor an http(s) URL: {}", item);
        }
    }

    info!("Collected {} raw candidates from {} inputs", candidates.len(), items.len());
    Ok(candidates)
}

/// UTF-8, falling back to Latin-1 so that every byte maps to a character
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn is_channel_list_path(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".m3u") || lower.ends_with(".m3u8")
}

fn url_lines(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}
