use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::models::ProbeBudget;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// HTTP client settings shared by every probe request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Redirect hops followed before the request fails as a redirect loop
    pub max_redirects: usize,
    /// Size of the partial-content probe; `Range: bytes=0-{range_bytes - 1}`
    pub range_bytes: u64,
    /// Manifest bodies larger than this are truncated
    pub max_manifest_bytes: usize,
    /// Explicit proxy URL. Proxy environment variables are never consulted.
    pub proxy: Option<String>,
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            range_bytes: DEFAULT_RANGE_BYTES,
            max_manifest_bytes: DEFAULT_MAX_MANIFEST_BYTES,
            proxy: None,
            accept_invalid_certs: false,
        }
    }
}

impl HttpConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.range_bytes == 0 {
            return Err(AppError::configuration("http.range_bytes must be greater than 0"));
        }
        if self.max_manifest_bytes == 0 {
            return Err(AppError::configuration(
                "http.max_manifest_bytes must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Where the writer places its artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub playlist_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            playlist_path: PathBuf::from(DEFAULT_PLAYLIST_PATH),
        }
    }
}

impl OutputConfig {
    fn sibling(&self, file_name: &str) -> PathBuf {
        match self.playlist_path.parent() {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    pub fn unavailable_path(&self) -> PathBuf {
        self.sibling(UNAVAILABLE_FILE_NAME)
    }

    pub fn report_path(&self) -> PathBuf {
        self.sibling(REPORT_FILE_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Preset names (`all`, `cn`, `us`, `sports`, `news`)
    pub presets: Vec<String>,
    /// Seed pages crawled for playlist links
    pub crawl: Vec<String>,
    /// GitHub code-search keywords; each runs restricted to `.m3u`/`.m3u8` files
    pub github_search: Vec<String>,
    /// Bearer token for the GitHub API. Never written back out.
    #[serde(skip_serializing)]
    pub github_token: Option<String>,
    /// Cap on lists taken from GitHub across all queries
    pub github_max: usize,
    pub github_api_url: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            presets: Vec::new(),
            crawl: Vec::new(),
            github_search: Vec::new(),
            github_token: None,
            github_max: DEFAULT_GITHUB_MAX,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !self.github_search.is_empty() && url::Url::parse(&self.github_api_url).is_err() {
            return Err(AppError::configuration(format!(
                "discovery.github_api_url is not a valid URL: {}",
                self.github_api_url
            )));
        }
        Ok(())
    }

    /// Whether any discovery source is configured
    pub fn is_empty(&self) -> bool {
        self.presets.is_empty() && self.crawl.is_empty() && self.github_search.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Re-run interval; a single run when absent
    #[serde(
        with = "duration_serde::option_duration",
        skip_serializing_if = "Option::is_none"
    )]
    pub interval: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub probe: ProbeBudget,
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub discovery: DiscoveryConfig,
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Load defaults, then the TOML file (if it exists), then `M3U_PROBER_*` variables
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let path = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Self::figment(path, Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn figment(path: &Path, env: Env) -> AppResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        } else {
            debug!("Config file {} not found, using defaults", path.display());
        }

        let config: Config = figment
            .merge(env)
            .extract()
            .map_err(|e| AppError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.probe.validate()?;
        self.http.validate()?;
        self.discovery.validate()
    }

    pub fn to_toml_string(&self) -> AppResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::internal(format!("Failed to render configuration: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("missing.toml"))).unwrap();
        assert_eq!(config.probe, ProbeBudget::default());
        assert_eq!(config.http.max_redirects, 5);
        assert_eq!(config.http.range_bytes, 2049);
        assert_eq!(
            config.output.unavailable_path(),
            PathBuf::from("output/unavailable.csv")
        );
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[probe]\ntimeout = \"3s\"\nconcurrency = 10\n\n[schedule]\ninterval = \"30m\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.probe.timeout, Duration::from_secs(3));
        assert_eq!(config.probe.concurrency, 10);
        assert_eq!(config.probe.retries, DEFAULT_RETRIES);
        assert_eq!(config.schedule.interval, Some(Duration::from_secs(1800)));
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[probe]\nconcurrency = 0").unwrap();

        let result = Config::load(Some(file.path()));
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[test]
    fn test_print_config_round_trips() {
        let config = Config::default();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("[probe]"));
        assert!(rendered.contains("timeout = \"6s\""));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_github_token_is_loaded_but_never_rendered() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[discovery]\ngithub_search = [\"iptv\"]\ngithub_token = \"ghp_secret\"\ngithub_max = 5"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.discovery.github_search, vec!["iptv"]);
        assert_eq!(config.discovery.github_token.as_deref(), Some("ghp_secret"));
        assert_eq!(config.discovery.github_max, 5);
        assert_eq!(config.discovery.github_api_url, DEFAULT_GITHUB_API_URL);

        let rendered = config.to_toml_string().unwrap();
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("github_max = 5"));
    }

    #[test]
    fn test_invalid_github_api_url_is_rejected() {
        let mut config = Config::default();
        config.discovery.github_api_url = "not a url".to_string();
        assert!(config.validate().is_ok(), "unused without queries");

        config.discovery.github_search = vec!["iptv".to_string()];
        assert!(matches!(config.validate(), Err(AppError::Configuration { .. })));
    }
}
