//! Error type definitions for the M3U prober
//!
//! This module defines the error types used throughout the crate. It uses
//! `thiserror` for the trait implementations and error chaining.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors (invalid probe budget, unreadable config file)
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Manifest parsing errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Filesystem errors while reading inputs or writing artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Report serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Reasons a text body could not be parsed as a playlist manifest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The first non-empty line is not `#EXTM3U`
    #[error("missing #EXTM3U header")]
    MissingHeader,

    /// Both variant-stream and media-segment entries are present
    #[error("manifest mixes variant streams and media segments")]
    MixedPlaylist,

    /// Neither variant-stream nor media-level markers were found
    #[error("manifest has no variant or media entries")]
    NoEntries,
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error with a custom message
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
