use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::OutputConfig;
use crate::errors::AppResult;
use crate::models::{AvailableEntry, RunSummary, UnavailableEntry};
use crate::services::RunReport;

/// Files written for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub playlist: PathBuf,
    pub unavailable: PathBuf,
    pub report: PathBuf,
}

impl From<&OutputConfig> for ArtifactPaths {
    fn from(config: &OutputConfig) -> Self {
        Self {
            playlist: config.playlist_path.clone(),
            unavailable: config.unavailable_path(),
            report: config.report_path(),
        }
    }
}

/// `#EXTM3U` playlist of available entries, in the order given
///
/// The original `#EXTINF` line is reused when the candidate had one.
pub fn render_playlist(entries: &[AvailableEntry]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for entry in entries {
        match &entry.extinf {
            Some(extinf) => out.push_str(extinf),
            None => {
                out.push_str("#EXTINF:-1,");
                out.push_str(&entry.display_name);
            }
        }
        out.push('\n');
        out.push_str(&entry.uri);
        out.push('\n');
    }
    out
}

/// Failure log with header `url,reason,detail`
pub fn render_unavailable_csv(entries: &[UnavailableEntry]) -> String {
    let mut out = String::from("url,reason,detail\n");
    for entry in entries {
        out.push_str(&csv_field(&entry.uri));
        out.push(',');
        out.push_str(&csv_field(entry.reason.as_ref()));
        out.push(',');
        out.push_str(&csv_field(&entry.detail));
        out.push('\n');
    }
    out
}

/// Quote every field, doubling embedded quotes
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Write playlist, failure log and report, creating the output directory
pub async fn write_artifacts(config: &OutputConfig, report: &RunReport) -> AppResult<ArtifactPaths> {
    let paths = ArtifactPaths::from(config);
    ensure_parent(&paths.playlist).await?;
    ensure_parent(&paths.unavailable).await?;
    ensure_parent(&paths.report).await?;

    tokio::fs::write(&paths.playlist, render_playlist(&report.results.available)).await?;
    tokio::fs::write(
        &paths.unavailable,
        render_unavailable_csv(&report.results.unavailable),
    )
    .await?;
    tokio::fs::write(&paths.report, render_report(&report.summary)?).await?;

    info!(
        "Wrote {} available entries to {} (failures: {}, report: {})",
        report.results.available.len(),
        paths.playlist.display(),
        paths.unavailable.display(),
        paths.report.display()
    );
    Ok(paths)
}

fn render_report(summary: &RunSummary) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

async fn ensure_parent(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}
