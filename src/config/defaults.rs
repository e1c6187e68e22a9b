//! Default values for configuration options, kept in one place.

// Probe defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 6;
pub const DEFAULT_CONCURRENCY: usize = 50;
pub const DEFAULT_PER_HOST_LIMIT: usize = 8;
pub const DEFAULT_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
pub const DEFAULT_RETRY_BACKOFF_MAX_MS: u64 = 2000;
pub const DEFAULT_ALLOW_PLAYLIST_ONLY: bool = false;
pub const DEFAULT_REQUIRE_LIVE: bool = false;

// HTTP defaults
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
/// Bytes requested by a range probe (`Range: bytes=0-2048`)
pub const DEFAULT_RANGE_BYTES: u64 = 2049;
pub const DEFAULT_MAX_MANIFEST_BYTES: usize = 256 * 1024;

// Discovery defaults
pub const DEFAULT_GITHUB_MAX: usize = 30;
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

// Output defaults
pub const DEFAULT_PLAYLIST_PATH: &str = "output/working.m3u";
pub const UNAVAILABLE_FILE_NAME: &str = "unavailable.csv";
pub const REPORT_FILE_NAME: &str = "report.json";

// Config sources
pub const DEFAULT_CONFIG_FILE: &str = "m3u-prober.toml";
pub const ENV_PREFIX: &str = "M3U_PROBER_";

/// Admission window is this many times the global concurrency limit
pub const ADMISSION_WINDOW_FACTOR: usize = 4;
