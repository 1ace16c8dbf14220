//! Retrying HTTP client for protocol pages.
//!
//! Fetches are polite by design: one request at a time, bounded retries
//! with exponential backoff and jitter on transient failures. The source
//! serves protocol pages to browsers, so requests carry a configured
//! user-agent and, when the source requires it, a session cookie.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use tokio::time::sleep;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    HttpStatus { status: StatusCode, url: String },
}

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(500);

pub struct ProtocolClient {
    http: reqwest::Client,
    cookie: Option<String>,
    max_retries: u32,
    base_backoff: Duration,
}

impl ProtocolClient {
    pub fn new(user_agent: &str, cookie: Option<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            cookie,
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: DEFAULT_BASE_BACKOFF,
        })
    }

    /// Override the retry policy. Tests use a near-zero backoff.
    pub fn with_retry_policy(mut self, max_retries: u32, base_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_backoff = base_backoff;
        self
    }

    /// Fetch one protocol page.
    ///
    /// Returns `Ok(None)` on 404: an unpublished protocol is an expected
    /// condition, not a failure. Connection errors, timeouts, and 5xx
    /// responses are retried with exponential backoff; other non-success
    /// statuses fail immediately.
    pub async fn fetch_protocol(&self, url: &str) -> Result<Option<String>, FetchError> {
        let mut last_err: Option<FetchError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.base_backoff * (1u32 << (attempt - 1));
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250));
                tracing::debug!(url, attempt, "retrying fetch after backoff");
                sleep(backoff + jitter).await;
            }

            match self.get(url).await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(Some(resp.text().await?));
                    }
                    if status == StatusCode::NOT_FOUND {
                        tracing::debug!(url, "protocol not published (404)");
                        return Ok(None);
                    }
                    let err = FetchError::HttpStatus {
                        status,
                        url: url.to_string(),
                    };
                    if !status.is_server_error() {
                        return Err(err);
                    }
                    last_err = Some(err);
                }
                Err(err) => last_err = Some(FetchError::Http(err)),
            }
        }

        // Loop ran at least once, so an error was recorded.
        Err(last_err.unwrap_or(FetchError::HttpStatus {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            url: url.to_string(),
        }))
    }

    /// Lightweight reachability check against the source site. The batch
    /// orchestrator aborts the whole run when this fails.
    pub async fn preflight(&self, base_url: &str) -> Result<(), FetchError> {
        let resp = self.get(base_url).await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::HttpStatus {
                status,
                url: base_url.to_string(),
            })
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, reqwest::Error> {
        let mut req = self
            .http
            .get(url)
            .header("accept", "text/html,application/xhtml+xml")
            .header("accept-language", "lv-LV,lv;q=0.9,en;q=0.8");
        if let Some(cookie) = &self.cookie {
            req = req.header("cookie", cookie);
        }
        req.send().await
    }
}
