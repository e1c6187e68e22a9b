//! Playlist manifest and channel-list parsing.
//!
//! Nothing in this module performs I/O.

pub mod attributes;
pub mod channel_list;
pub mod parser;

pub use channel_list::{ChannelEntry, display_name_from_extinf, parse_channel_list};
pub use parser::{Manifest, ManifestKind, SegmentRef, VariantRef, parse_manifest};
