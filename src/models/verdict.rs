use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Fixed taxonomy of reasons a candidate is rejected
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, AsRefStr,
)]
pub enum UnavailableReason {
    /// The manifest (or the sample needed to classify the URL) could not be fetched
    FetchFailed,
    /// Not a parsable manifest, or a master manifest pointing at another master
    InvalidManifest,
    /// The media manifest lists no segments
    EmptyManifest,
    /// Manifest is valid but its first segment could not be fetched
    SegmentUnreachable,
    /// A direct media link could not be fetched
    Unreachable,
    /// Live streams were required and this is VOD or a direct file
    NotLive,
    /// Redirect hop limit exceeded
    RedirectLoop,
    /// Every attempt of the failing operation timed out
    Timeout,
    /// The run was interrupted before the evaluation could complete
    Cancelled,
    /// The evaluation task faulted
    Internal,
}

/// How an available candidate was confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
pub enum Confirmation {
    /// A media segment answered 200/206
    SegmentConfirmed,
    /// Manifest valid but no segment could be confirmed (relaxed policy)
    PlaylistOnly,
    /// A direct media link answered 200/206
    DirectMedia,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableEntry {
    pub display_name: String,
    pub uri: String,
    /// Original `#EXTINF` line, if the candidate came from a channel list
    pub extinf: Option<String>,
    pub confirmation: Confirmation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableEntry {
    pub uri: String,
    pub reason: UnavailableReason,
    /// Free-text detail for the failure log (for example `HTTP 404`)
    pub detail: String,
}

/// Final per-candidate result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Available(AvailableEntry),
    Unavailable(UnavailableEntry),
}

/// Display name used when a candidate carries none
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

impl Verdict {
    pub fn unavailable(uri: impl Into<String>, reason: UnavailableReason, detail: impl Into<String>) -> Self {
        Verdict::Unavailable(UnavailableEntry {
            uri: uri.into(),
            reason,
            detail: detail.into(),
        })
    }

    pub fn uri(&self) -> &str {
        match self {
            Verdict::Available(entry) => &entry.uri,
            Verdict::Unavailable(entry) => &entry.uri,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Verdict::Available(_))
    }

    pub fn reason(&self) -> Option<UnavailableReason> {
        match self {
            Verdict::Available(_) => None,
            Verdict::Unavailable(entry) => Some(entry.reason),
        }
    }
}
