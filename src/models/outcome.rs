use std::fmt;

/// Why a single network attempt did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// Per-attempt deadline elapsed
    Timeout,
    /// Connection refused/reset or another transport-level failure
    Connection(String),
    /// The server answered with an unacceptable status
    HttpStatus(u16),
    /// The URL could not be used to build a request
    InvalidUrl(String),
    /// Host name resolution failed
    Dns(String),
    /// TLS handshake or certificate failure
    Tls(String),
    /// More redirects than the configured hop limit
    RedirectLoop,
    /// The response body could not be read
    Body(String),
    /// The run was cancelled before or while waiting for the attempt
    Cancelled,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Timeout => write!(f, "timeout"),
            FailureCause::Connection(msg) => write!(f, "connection error: {msg}"),
            FailureCause::HttpStatus(status) => write!(f, "HTTP {status}"),
            FailureCause::InvalidUrl(msg) => write!(f, "invalid URL: {msg}"),
            FailureCause::Dns(msg) => write!(f, "DNS failure: {msg}"),
            FailureCause::Tls(msg) => write!(f, "TLS failure: {msg}"),
            FailureCause::RedirectLoop => write!(f, "redirect limit exceeded"),
            FailureCause::Body(msg) => write!(f, "body read error: {msg}"),
            FailureCause::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Data returned by a successful attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSuccess {
    pub status: u16,
    /// URL after redirects; relative manifest entries resolve against this
    pub final_url: String,
    pub bytes_received: u64,
    /// Decoded text body, present for manifest fetches only
    pub body: Option<String>,
}

/// Result of one network attempt. Every attempt produces exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success(ProbeSuccess),
    /// Worth retrying: timeouts, resets, 408/429 and 5xx responses
    TransientFailure(FailureCause),
    /// Retrying cannot help: 4xx, malformed URL, DNS or TLS failure, redirect loop
    PermanentFailure(FailureCause),
}

impl ProbeOutcome {
    /// Classify an HTTP status that the caller did not accept as success
    pub fn from_status(status: u16) -> Self {
        if status == 408 || status == 429 || (500..600).contains(&status) {
            ProbeOutcome::TransientFailure(FailureCause::HttpStatus(status))
        } else {
            ProbeOutcome::PermanentFailure(FailureCause::HttpStatus(status))
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ProbeOutcome::TransientFailure(_))
    }

    pub fn cause(&self) -> Option<&FailureCause> {
        match self {
            ProbeOutcome::Success(_) => None,
            ProbeOutcome::TransientFailure(cause) | ProbeOutcome::PermanentFailure(cause) => {
                Some(cause)
            }
        }
    }

    /// Short label used for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Success(_) => "success",
            ProbeOutcome::TransientFailure(_) => "transient",
            ProbeOutcome::PermanentFailure(_) => "permanent",
        }
    }

    /// Human readable description used as verdict detail
    pub fn describe(&self) -> String {
        match self {
            ProbeOutcome::Success(success) => format!("HTTP {}", success.status),
            ProbeOutcome::TransientFailure(cause) | ProbeOutcome::PermanentFailure(cause) => {
                cause.to_string()
            }
        }
    }
}
