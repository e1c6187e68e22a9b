/*!
 * Playlist manifest parser
 * ========================
 *
 * Parses HLS-style text manifests into a [`Manifest`]:
 *
 *   - Master manifests: `#EXT-X-STREAM-INF` tags, each followed by a variant URI line.
 *   - Media manifests: segment URI lines, usually preceded by `#EXTINF` duration tags.
 *
 * The first non-empty line must be `#EXTM3U`. Relative URIs are resolved against the
 * manifest's base URL when one is given. Parsing never touches the network and is
 * deterministic for identical input.
 */

use serde::{Deserialize, Serialize};
use url::Url;

use super::attributes::{find_unquoted_comma, parse_attributes};
use crate::errors::{ManifestError, ManifestResult};
use crate::utils::url::UrlUtils;

pub const HEADER_TAG: &str = "#EXTM3U";
const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";
const EXTINF_TAG: &str = "#EXTINF:";
const TARGET_DURATION_TAG: &str = "#EXT-X-TARGETDURATION:";
const PLAYLIST_TYPE_TAG: &str = "#EXT-X-PLAYLIST-TYPE:";
const ENDLIST_TAG: &str = "#EXT-X-ENDLIST";

/// Tags that only appear in media manifests
const MEDIA_TAGS: &[&str] = &[
    EXTINF_TAG,
    TARGET_DURATION_TAG,
    "#EXT-X-MEDIA-SEQUENCE",
    "#EXT-X-DISCONTINUITY-SEQUENCE",
    PLAYLIST_TYPE_TAG,
    ENDLIST_TAG,
    "#EXT-X-MAP",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManifestKind {
    Master,
    Media,
}

/// One alternate-quality stream listed by a master manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRef {
    pub uri: String,
    /// `BANDWIDTH` attribute, only used to order variants
    pub bandwidth: Option<u64>,
    pub resolution: Option<(u32, u32)>,
}

/// One media segment listed by a media manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRef {
    pub uri: String,
    /// Title from the preceding `#EXTINF` tag
    pub title: Option<String>,
    pub duration: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub kind: ManifestKind,
    pub variants: Vec<VariantRef>,
    pub segments: Vec<SegmentRef>,
    /// `#EXT-X-ENDLIST` was present
    pub ended: bool,
    /// Value of `#EXT-X-PLAYLIST-TYPE` (`VOD` or `EVENT`)
    pub playlist_type: Option<String>,
    pub target_duration: Option<f32>,
}

impl Manifest {
    pub fn is_master(&self) -> bool {
        self.kind == ManifestKind::Master
    }

    /// A finite, pre-enumerated media list rather than a live window
    pub fn is_vod(&self) -> bool {
        self.kind == ManifestKind::Media
            && (self.ended
                || self
                    .playlist_type
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case("VOD")))
    }

    /// Highest-bandwidth variant; the first listed wins ties and missing bandwidth sorts lowest
    pub fn best_variant(&self) -> Option<&VariantRef> {
        let mut best: Option<&VariantRef> = None;
        for variant in &self.variants {
            match best {
                Some(current) if variant.bandwidth.unwrap_or(0) <= current.bandwidth.unwrap_or(0) => {}
                _ => best = Some(variant),
            }
        }
        best
    }

    pub fn first_segment(&self) -> Option<&SegmentRef> {
        self.segments.first()
    }
}

/// Parse manifest text, resolving relative URIs against `base`
pub fn parse_manifest(text: &str, base: Option<&Url>) -> ManifestResult<Manifest> {
    let mut lines = text
        .lines()
        .map(|line| line.trim().trim_start_matches('\u{feff}'))
        .filter(|line| !line.is_empty());

    match lines.next() {
        Some(first) if first.starts_with(HEADER_TAG) => {}
        _ => return Err(ManifestError::MissingHeader),
    }

    let mut variants = Vec::new();
    let mut segments = Vec::new();
    let mut saw_media_tag = false;
    let mut ended = false;
    let mut playlist_type = None;
    let mut target_duration = None;

    let mut pending_variant: Option<(Option<u64>, Option<(u32, u32)>)> = None;
    let mut pending_segment: Option<(Option<f32>, Option<String>)> = None;

    for line in lines {
        if let Some(rest) = line.strip_prefix(STREAM_INF_TAG) {
            let attrs = parse_attributes(rest.trim_start_matches(':'), |c| c == ',');
            let bandwidth = attrs.get("BANDWIDTH").and_then(|v| v.parse::<u64>().ok());
            let resolution = attrs.get("RESOLUTION").and_then(|v| {
                let (w, h) = v.split_once(['x', 'X'])?;
                Some((w.parse().ok()?, h.parse().ok()?))
            });
            pending_variant = Some((bandwidth, resolution));
            continue;
        }

        if line.starts_with('#') {
            if MEDIA_TAGS.iter().any(|tag| line.starts_with(tag)) {
                saw_media_tag = true;
            }
            if let Some(info) = line.strip_prefix(EXTINF_TAG) {
                pending_segment = Some(parse_extinf(info));
            } else if let Some(value) = line.strip_prefix(TARGET_DURATION_TAG) {
                target_duration = value.trim().parse::<f32>().ok();
            } else if let Some(value) = line.strip_prefix(PLAYLIST_TYPE_TAG) {
                playlist_type = Some(value.trim().to_string());
            } else if line.starts_with(ENDLIST_TAG) {
                ended = true;
            }
            continue;
        }

        let uri = UrlUtils::resolve(base, line);
        if let Some((bandwidth, resolution)) = pending_variant.take() {
            variants.push(VariantRef {
                uri,
                bandwidth,
                resolution,
            });
        } else {
            let (duration, title) = pending_segment.take().unwrap_or((None, None));
            segments.push(SegmentRef {
                uri,
                title,
                duration,
            });
        }
    }

    let kind = match (variants.is_empty(), segments.is_empty()) {
        (false, false) => return Err(ManifestError::MixedPlaylist),
        (false, true) => ManifestKind::Master,
        (true, false) => ManifestKind::Media,
        (true, true) if saw_media_tag => ManifestKind::Media,
        (true, true) => return Err(ManifestError::NoEntries),
    };

    Ok(Manifest {
        kind,
        variants,
        segments,
        ended,
        playlist_type,
        target_duration,
    })
}

/// `#EXTINF:<duration>[ attrs],<title>` into (duration, title)
fn parse_extinf(info: &str) -> (Option<f32>, Option<String>) {
    let (head, title) = match find_unquoted_comma(info) {
        Some(idx) => (&info[..idx], Some(info[idx + 1..].trim())),
        None => (info, None),
    };
    let duration = head
        .split_whitespace()
        .next()
        .and_then(|d| d.parse::<f32>().ok());
    let title = title.filter(|t| !t.is_empty()).map(str::to_string);
    (duration, title)
}
