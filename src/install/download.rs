//! Artifact download with bounded retry and cancellation

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::async_task::AsyncTask;
use super::error::{FetchError, InstallError};

/// Performs a single download attempt of `url` into `dest`
pub trait ArtifactFetcher: Send + Sync {
    /// Returns the number of bytes written
    fn fetch(&self, url: &str, dest: &Path) -> AsyncTask<Result<u64, FetchError>>;
}

/// How many times to try and how long to wait between tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Sleep before the given 1-based retry: base, 2*base, 4*base, ...
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }
}

/// Download `url` into `dest`, retrying failed attempts with exponential backoff.
///
/// Cancellation abandons the current attempt or backoff sleep immediately.
/// After the last failed attempt its reason is returned.
pub async fn download_with_retry(
    fetcher: &dyn ArtifactFetcher,
    url: &str,
    dest: &Path,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<u64, InstallError> {
    let mut last_err = None;

    for attempt in 0..policy.attempts.max(1) {
        if attempt > 0 {
            let delay = policy.delay_before_retry(attempt);
            debug!("retrying {url} in {delay:?} (attempt {})", attempt + 1);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(InstallError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(InstallError::Cancelled),
            result = fetcher.fetch(url, dest) => result,
        };

        match result {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                warn!("download attempt {} of {url} failed: {e}", attempt + 1);
                last_err = Some(e);
            }
        }
    }

    Err(InstallError::Download(last_err.unwrap_or_else(|| {
        FetchError::Transport(format!("no download attempt made for {url}"))
    })))
}

/// `ArtifactFetcher` streaming over HTTP(S) with an inactivity watchdog
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    inactivity_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(connect_timeout: Duration, inactivity_timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("ghbin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            inactivity_timeout,
        })
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> AsyncTask<Result<u64, FetchError>> {
        let client = self.client.clone();
        let inactivity = self.inactivity_timeout;
        let url = url.to_string();
        let dest: PathBuf = dest.to_path_buf();

        AsyncTask::from_future(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url,
                });
            }
            if response.content_length() == Some(0) {
                return Err(FetchError::Empty { url });
            }

            let mut file = tokio::fs::File::create(&dest).await?;
            let mut stream = response.bytes_stream();
            let mut written: u64 = 0;

            loop {
                let chunk = match timeout(inactivity, stream.next()).await {
                    Ok(Some(Ok(chunk))) => chunk,
                    Ok(Some(Err(e))) => return Err(FetchError::Transport(e.to_string())),
                    Ok(None) => break,
                    Err(_) => {
                        return Err(FetchError::Stalled {
                            secs: inactivity.as_secs(),
                        });
                    }
                };
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;

            if written == 0 {
                return Err(FetchError::Empty { url });
            }
            Ok(written)
        })
    }
}
