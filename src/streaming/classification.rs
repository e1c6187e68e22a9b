/*!
 * Candidate Classification
 * ========================
 *
 * Decides whether a candidate URL is a playlist (HLS / M3U manifest) or a direct media
 * link (raw TS, progressive MP4, audio, ...).
 *
 * Strategy:
 *   1. Extension heuristic on the URL path (query and fragment ignored).
 *   2. Substring hint: any URL mentioning `m3u8` is treated as a playlist, which catches
 *      `index.php?type=m3u8` style endpoints.
 *   3. Content sniff: if the caller already holds a body sample, look for the `#EXTM3U`
 *      signature.
 *   4. Otherwise the URL is `Ambiguous` and the caller must fetch a sample.
 *
 * Pure decision function, no network access.
 */

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::manifest::parser::HEADER_TAG;
use crate::utils::url::UrlUtils;

/// How many leading bytes of a sample are inspected for the manifest signature
pub const SNIFF_BYTES: usize = 1024;

const PLAYLIST_EXTENSIONS: &[&str] = &[".m3u8", ".m3u"];
const DIRECT_MEDIA_EXTENSIONS: &[&str] = &[
    ".ts", ".mp4", ".m4v", ".mov", ".mkv", ".webm", ".flv", ".avi", ".aac", ".mp3", ".m4a",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
pub enum SourceType {
    PlaylistLike,
    DirectMediaLike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Known(SourceType),
    /// Neither the URL nor any sample decides; fetch a sample first
    Ambiguous,
}

/// Classify a candidate URL, optionally with an already-fetched body sample
pub fn classify_source(url: &str, sample: Option<&[u8]>) -> Classification {
    if let Some(kind) = classify_by_extension(url) {
        return Classification::Known(kind);
    }
    if url.to_ascii_lowercase().contains("m3u8") {
        return Classification::Known(SourceType::PlaylistLike);
    }
    match sample {
        Some(bytes) if looks_like_manifest(bytes) => Classification::Known(SourceType::PlaylistLike),
        Some(_) => Classification::Known(SourceType::DirectMediaLike),
        None => Classification::Ambiguous,
    }
}

fn classify_by_extension(url: &str) -> Option<SourceType> {
    let path = UrlUtils::path_without_query(url).to_ascii_lowercase();
    if PLAYLIST_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Some(SourceType::PlaylistLike);
    }
    if DIRECT_MEDIA_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Some(SourceType::DirectMediaLike);
    }
    None
}

/// Whether the first non-whitespace bytes of a sample are the `#EXTM3U` signature
pub fn looks_like_manifest(sample: &[u8]) -> bool {
    let head = &sample[..sample.len().min(SNIFF_BYTES)];
    let head = head.strip_prefix(b"\xef\xbb\xbf").unwrap_or(head);
    let start = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(head.len());
    head[start..].starts_with(HEADER_TAG.as_bytes())
}
