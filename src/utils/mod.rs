//! Shared helpers: HTTP probe primitives, retry and URL handling.

pub mod http_client;
pub mod retry;
pub mod url;

pub use http_client::{ProbeClient, ReqwestProbeClient};
pub use retry::{RetryOutcome, RetryPolicy, with_retry};
pub use url::UrlUtils;
