//! Bounded retry with exponential backoff, itself bounded by a [`Deadline`].
//!
//! [`retry`] is the generic loop; [`ResilientFetcher`] applies it to HTTP GETs
//! through a shared `reqwest` client.

use std::{future::Future, time::Duration};

use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::{
    deadline::Deadline,
    error::{Error, Result},
};

/// How long to wait between attempts, and how many attempts to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Total attempts, including the first one.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl BackoffPolicy {
    /// Wait after the failed attempt number `attempt` (1-indexed):
    /// `min(initial_interval * 2^(attempt-1), max_interval)`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.initial_interval.saturating_mul(1u32 << exp).min(self.max_interval)
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, spends the
/// attempt budget, or the deadline expires. Expiry wins over any remaining budget.
pub async fn retry<T, F, Fut>(
    policy: &BackoffPolicy,
    deadline: &Deadline,
    label: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        deadline.check()?;
        attempt += 1;

        let err = match deadline.run(op(attempt)).await {
            Ok(value) => {
                debug!(%label, attempt, "attempt succeeded");
                return Ok(value);
            }
            Err(err @ Error::DeadlineExceeded) => {
                warn!(%label, attempt, "deadline expired during attempt");
                return Err(err);
            }
            Err(err) if !err.is_retryable() => {
                warn!(%label, attempt, error = %err, "attempt failed, not retrying");
                return Err(err);
            }
            Err(err) => err,
        };

        if attempt >= max_attempts {
            warn!(%label, attempt, error = %err, "attempt failed, budget exhausted");
            return Err(Error::RetriesExhausted { attempts: attempt, last: Box::new(err) });
        }

        let delay = policy.delay_after(attempt);
        warn!(
            %label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed, backing off"
        );

        deadline.check()?;
        deadline.sleep(delay).await?;
    }
}

/// Issues idempotent GETs with retry. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct ResilientFetcher {
    http: Client,
    policy: BackoffPolicy,
}

impl ResilientFetcher {
    pub fn new(http: Client, policy: BackoffPolicy) -> Self {
        Self { http, policy }
    }

    /// Client with a per-request timeout as a backstop under the deadline.
    pub fn with_timeout(timeout: Duration, policy: BackoffPolicy) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build().map_err(|e| Error::Transport {
            url: String::new(),
            message: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self::new(http, policy))
    }

    /// GET `url` with `query` and return the body of the first 2xx response.
    pub async fn get(&self, url: &Url, query: &[(&str, &str)], deadline: &Deadline) -> Result<String> {
        retry(&self.policy, deadline, url.as_str(), |attempt| self.get_once(url, query, attempt))
            .await
    }

    async fn get_once(&self, url: &Url, query: &[(&str, &str)], attempt: u32) -> Result<String> {
        let transport = |e: reqwest::Error| Error::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let res = self
            .http
            .get(url.clone())
            .query(query)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let status = res.status();
        let body = res.text().await.map_err(transport)?;

        if !status.is_success() {
            debug!(%url, attempt, status = status.as_u16(), "non-success status");
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
