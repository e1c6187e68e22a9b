//! Run artifact writer: playlist, failure log and JSON report.

pub mod writer;

pub use writer::{ArtifactPaths, render_playlist, render_unavailable_csv, write_artifacts};
