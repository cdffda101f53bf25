use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

/// Timestamp layout the video-store server parses.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// `(from, to)` covering the `seconds` before `now`.
pub fn last_seconds(seconds: u64, now: DateTime<Utc>) -> Result<(String, String)> {
    let span = i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .context("Range is too long")?;
    let from = now
        .checked_sub_signed(span)
        .context("Range starts before the earliest representable time")?;
    Ok((format_timestamp(from), format_timestamp(now)))
}

/// Pick the explicit `--from/--to` pair, or derive one from `--last`.
pub fn resolve_range(
    from: Option<String>,
    to: Option<String>,
    last: Option<u64>,
    now: DateTime<Utc>,
) -> Result<(String, String)> {
    match (from, to, last) {
        (Some(from), Some(to), None) => Ok((from, to)),
        (None, None, Some(seconds)) => last_seconds(seconds, now),
        (_, _, Some(_)) => Err(anyhow::anyhow!("--last cannot be combined with --from/--to")),
        _ => Err(anyhow::anyhow!("Either --from and --to, or --last, must be given")),
    }
}

async fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Write a fetched clip to `path`, creating parent directories.
pub async fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    create_parent_dirs(path).await?;
    tokio::fs::write(path, data)
        .await
        .with_context(|| format!("Failed to write file: {}", path.display()))
}

/// Create `path` (and its parent directories) and hand the file to `write`.
/// The file is removed again if `write` fails, so no partial clip is left behind.
pub async fn stream_output<F, Fut, T, E>(path: &Path, write: F) -> Result<T>
where
    F: FnOnce(tokio::fs::File) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    create_parent_dirs(path).await?;
    let file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create file: {}", path.display()))?;

    match write(file).await {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(remove_err) = tokio::fs::remove_file(path).await {
                tracing::warn!(
                    path = %path.display(),
                    error = %remove_err,
                    "Failed to remove partial output"
                );
            }
            Err(anyhow::Error::new(err))
        }
    }
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
