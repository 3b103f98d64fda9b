use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use tokio::fs;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::LauncherConfig;
use crate::error::LauncherError;
use crate::util::{cancel_requested, format_speed};

const USER_AGENT: &str = "boh-launcher";
const CANCELLED: &str = "download cancelled";

// GitHub commits API response, reduced to the fields the launcher reads.
#[derive(Debug, Clone, Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct CommitDetail {
    committer: CommitSignature,
}

#[derive(Debug, Clone, Deserialize)]
struct CommitSignature {
    date: DateTime<Utc>,
}

#[derive(Clone)]
pub struct NetworkClient {
    api_client: Client,
    download_client: Client,
}

impl NetworkClient {
    pub fn new(config: &LauncherConfig) -> Self {
        Self {
            api_client: build_client(Duration::from_secs(config.check_timeout_secs)),
            download_client: build_client(Duration::from_secs(config.download_timeout_secs)),
        }
    }

    /// Timestamp of the latest commit touching the build artifact.
    ///
    /// Queries the commits API scoped to the artifact path and reads the
    /// committer date of the first (most recent) entry.
    pub async fn latest_artifact_commit(
        &self,
        config: &LauncherConfig,
    ) -> Result<DateTime<Utc>, LauncherError> {
        let url = config.commits_url();
        debug!("check: GET {url}");

        let response = self
            .api_client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| LauncherError::network(format!("version check failed: {e}")))?
            .error_for_status()
            .map_err(|e| LauncherError::network(format!("version check status error: {e}")))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| LauncherError::network(format!("version check body error: {e}")))?;

        let remote = parse_latest_commit_date(&body)?;
        info!("check: latest artifact commit {remote}");
        Ok(remote)
    }

    /// Download `url` to `dest`, overwriting any previous file, calling
    /// `progress` with (downloaded, total, speed_text) as bytes arrive.
    /// A transport failure or cancellation removes the partial file.
    pub async fn download_to_path<F>(
        &self,
        url: &str,
        dest: &Path,
        cancel: Option<Arc<AtomicBool>>,
        mut progress: F,
    ) -> Result<(), LauncherError>
    where
        F: FnMut(u64, Option<u64>, &str),
    {
        if cancel_requested(&cancel) {
            return Err(LauncherError::network(CANCELLED));
        }

        let response = self
            .download_client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| LauncherError::network(format!("download request failed: {e}")))?
            .error_for_status()
            .map_err(|e| LauncherError::network(format!("download status error: {e}")))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(format!("failed to create download dir: {e}")))?;
        }
        let mut file = File::create(dest)
            .await
            .map_err(|e| LauncherError::io(format!("failed to create archive file: {e}")))?;

        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        let mut last_tick = Instant::now();
        let mut last_bytes = 0u64;

        while let Some(chunk) = stream.next().await {
            if cancel_requested(&cancel) {
                let _ = fs::remove_file(dest).await;
                warn!("download: cancelled after {downloaded} bytes");
                return Err(LauncherError::network(CANCELLED));
            }
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(dest).await;
                    return Err(LauncherError::network(format!("stream error: {err}")));
                }
            };
            file.write_all(&chunk)
                .await
                .map_err(|e| LauncherError::io(format!("write error: {e}")))?;
            downloaded += chunk.len() as u64;

            let since = last_tick.elapsed().as_secs_f32();
            if since > 0.2 {
                let speed = (downloaded - last_bytes) as f32 / since;
                progress(downloaded, total, &format_speed(speed));
                last_tick = Instant::now();
                last_bytes = downloaded;
            }
        }

        // Final callback.
        progress(downloaded, total, "0 B/s");

        file.flush()
            .await
            .map_err(|e| LauncherError::io(format!("flush error: {e}")))?;

        if let Some(total) = total
            && downloaded < total
        {
            let _ = fs::remove_file(dest).await;
            return Err(LauncherError::network(format!(
                "download incomplete: received {} of {} bytes",
                downloaded, total
            )));
        }

        info!("download: completed {} ({downloaded} bytes)", dest.display());
        Ok(())
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            warn!("network client: falling back to default HTTP client configuration ({err})");
            Client::new()
        })
}

/// Pull the committer date out of a commits API response body.
fn parse_latest_commit_date(body: &[u8]) -> Result<DateTime<Utc>, LauncherError> {
    let entries: Vec<CommitEntry> = serde_json::from_slice(body)
        .map_err(|e| LauncherError::parse(format!("commit response parse error: {e}")))?;
    let first = entries
        .first()
        .ok_or_else(|| LauncherError::parse("no commits found for artifact path"))?;
    Ok(first.commit.committer.date)
}
