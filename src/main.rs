use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u_prober::{
    config::Config,
    output::write_artifacts,
    services::ProbeScheduler,
    sources::{collect_candidates, discovery::GithubSearch},
    utils::http_client::{ProbeClient, ReqwestProbeClient},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "m3u-prober")]
#[command(version)]
#[command(about = "Probe M3U/HLS live-TV candidates and keep the ones that play")]
#[command(long_about = None)]
struct Cli {
    /// Inputs: local M3U files, text files with one URL per line, or URLs
    #[arg(short, long, num_args = 1..)]
    input: Vec<String>,

    /// Output playlist path; the failure log and report are written beside it
    #[arg(short, long, value_name = "PATH")]
    out: Option<PathBuf>,

    /// Per-attempt timeout (seconds or a duration such as `6s`, `1500ms`)
    #[arg(short, long, value_parser = parse_duration_arg)]
    timeout: Option<Duration>,

    /// Global concurrency limit
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Per-host concurrency limit (0 = same as concurrency)
    #[arg(long)]
    per_host_limit: Option<usize>,

    /// Retries for transient failures
    #[arg(long)]
    retries: Option<u32>,

    /// Maximum number of candidates to probe (0 = unlimited)
    #[arg(long)]
    max_items: Option<usize>,

    /// Accept a valid manifest even when no segment can be confirmed
    #[arg(long)]
    allow_playlist_only: bool,

    /// Reject VOD manifests and direct media links
    #[arg(long)]
    require_live: bool,

    /// Discovery presets to add (all, cn, us, sports, news)
    #[arg(long, num_args = 1..)]
    discover: Vec<String>,

    /// Seed pages to crawl for playlist links
    #[arg(long, num_args = 1..)]
    crawl: Vec<String>,

    /// GitHub code-search keywords used to discover `.m3u` files
    #[arg(long, num_args = 1..)]
    github_search: Vec<String>,

    /// GitHub API token (raises the search rate limit)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Maximum number of lists taken from GitHub search
    #[arg(long)]
    github_max: Option<usize>,

    /// Re-run every N minutes until interrupted (0 = run once)
    #[arg(long, value_name = "MINUTES", value_parser = parse_interval_minutes)]
    interval_minutes: Option<Duration>,

    /// Explicit HTTP proxy URL
    #[arg(long)]
    proxy: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(out) = &self.out {
            config.output.playlist_path = out.clone();
        }
        if let Some(timeout) = self.timeout {
            config.probe.timeout = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.probe.concurrency = concurrency;
        }
        if let Some(per_host_limit) = self.per_host_limit {
            config.probe.per_host_limit = per_host_limit;
        }
        if let Some(retries) = self.retries {
            config.probe.retries = retries;
        }
        if let Some(max_items) = self.max_items {
            config.probe.max_items = Some(max_items);
        }
        if self.allow_playlist_only {
            config.probe.allow_playlist_only = true;
        }
        if self.require_live {
            config.probe.require_live = true;
        }
        config.discovery.presets.extend(self.discover.iter().cloned());
        config.discovery.crawl.extend(self.crawl.iter().cloned());
        config.discovery.github_search.extend(self.github_search.iter().cloned());
        if let Some(token) = self.github_token.as_ref().filter(|t| !t.is_empty()) {
            config.discovery.github_token = Some(token.clone());
        }
        if let Some(github_max) = self.github_max {
            config.discovery.github_max = github_max;
        }
        if let Some(interval) = self.interval_minutes {
            config.schedule.interval = (!interval.is_zero()).then_some(interval);
        }
        if let Some(proxy) = &self.proxy {
            config.http.proxy = Some(proxy.clone());
        }
    }
}

/// Seconds (`6`, `1.5`) or a humantime duration (`6s`, `1500ms`)
fn parse_duration_arg(value: &str) -> Result<Duration, String> {
    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).map_err(|e| e.to_string());
    }
    humantime::parse_duration(value).map_err(|e| e.to_string())
}

/// Whole minutes; `0` disables the schedule
fn parse_interval_minutes(value: &str) -> Result<Duration, String> {
    let minutes: u64 = value.parse().map_err(|e: std::num::ParseIntError| e.to_string())?;
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("{minutes} minutes is too large an interval"))
}

fn init_logging(log_level: &str, format: LogFormat) {
    let log_filter = format!("m3u_prober={log_level}");
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()),
    );
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

async fn run_once(
    inputs: &[String],
    config: &Config,
    client: Arc<dyn ProbeClient>,
    cancel: &CancellationToken,
) -> Result<()> {
    let retry = config.probe.retry_policy();
    let github = GithubSearch::from_config(&config.http, &config.discovery, config.probe.timeout)?;
    let candidates = collect_candidates(
        inputs,
        &config.discovery,
        github.as_ref(),
        client.as_ref(),
        &retry,
        cancel,
    )
    .await?;

    let scheduler = ProbeScheduler::new(config.probe.clone(), client)?.with_cancellation(cancel.clone());
    let report = scheduler.run(candidates).await;
    write_artifacts(&config.output, &report).await?;

    info!(
        "Available {}/{} (unavailable {}, skipped {}) in {}",
        report.summary.available,
        report.summary.checked,
        report.summary.unavailable,
        report.summary.skipped,
        humantime::format_duration(Duration::from_millis(report.summary.elapsed_ms))
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    if cli.input.is_empty() && config.discovery.is_empty() {
        bail!("no inputs given; example: m3u-prober -i seeds/urls.txt --discover cn");
    }

    info!("Starting m3u-prober v{}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing in-flight probes");
                cancel.cancel();
            }
        });
    }

    let client: Arc<dyn ProbeClient> = Arc::new(ReqwestProbeClient::new(&config.http, config.probe.timeout)?);

    loop {
        let result = run_once(&cli.input, &config, client.clone(), &cancel).await;

        let Some(interval) = config.schedule.interval else {
            return result;
        };
        if let Err(e) = result {
            error!("Probe run failed: {e:#}");
        }
        if cancel.is_cancelled() {
            break;
        }

        info!("Next run in {}", humantime::format_duration(interval));
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Stopped");
    Ok(())
}
