//! The extraction collaborator: turns a source URL into yt-dlp metadata.
//!
//! [`Extractor`] is the seam the HTTP handlers depend on; [`YtDlp`] is the
//! production implementation, which shells out to the `yt-dlp` binary.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::models::RawInfo;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extractor could not be started at all.
    #[error("failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),

    /// The extractor ran and refused the URL: private, removed,
    /// geo-restricted, unsupported, or the format does not exist.
    #[error("yt-dlp download error: {0}")]
    Download(String),

    #[error("failed to parse yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ExtractError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ExtractError::Download(_))
    }
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetches metadata for a video or playlist without downloading media.
    async fn extract_info(&self, url: &str) -> Result<RawInfo, ExtractError>;

    /// Resolves a single format of `url`, including its direct media URL.
    async fn resolve_format(&self, url: &str, format_id: &str) -> Result<RawInfo, ExtractError>;
}

pub struct YtDlp {
    binary: PathBuf,
    cookies_file: PathBuf,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>, cookies_file: impl Into<PathBuf>) -> Self {
        YtDlp {
            binary: binary.into(),
            cookies_file: cookies_file.into(),
        }
    }

    /// Builds the argument list. The URL always follows `--` so user input can
    /// never be read as an option.
    fn build_args(&self, url: &str, format_id: Option<&str>, use_cookies: bool) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
            "--no-download".to_string(),
        ];
        if let Some(format_id) = format_id {
            args.push("-f".to_string());
            args.push(format_id.to_string());
        }
        if use_cookies {
            args.push("--cookies".to_string());
            args.push(self.cookies_file.to_string_lossy().to_string());
        }
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    async fn run(&self, url: &str, format_id: Option<&str>) -> Result<RawInfo, ExtractError> {
        // Checked per call so a cookie file dropped in later is picked up.
        let use_cookies = tokio::fs::try_exists(&self.cookies_file).await.unwrap_or(false);
        let args = self.build_args(url, format_id, use_cookies);
        tracing::debug!("Running {} {:?}", self.binary.display(), args);

        // A dropped request future must not leave yt-dlp running.
        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let message = last_error_line(&output.stderr);
            tracing::warn!("yt-dlp failed for {}: {}", url, message);
            return Err(ExtractError::Download(message));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn extract_info(&self, url: &str) -> Result<RawInfo, ExtractError> {
        self.run(url, None).await
    }

    async fn resolve_format(&self, url: &str, format_id: &str) -> Result<RawInfo, ExtractError> {
        self.run(url, Some(format_id)).await
    }
}

/// Picks the last non-empty stderr line, which is where yt-dlp puts its
/// `ERROR:` summary.
fn last_error_line(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let line = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or("yt-dlp exited with an error");
    line.strip_prefix("ERROR:").map(str::trim).unwrap_or(line).to_string()
}
