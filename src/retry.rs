use crate::error::EnrichError;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::warn;

/// Exponential backoff for rate-limited (HTTP 429) requests.
/// The delay is `base * factor^attempt`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    pub base: Duration,
    pub factor: f64,
    pub max: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(60),
            max_retries: 5,
        }
    }
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base.as_secs_f64() * self.factor.powi(exp);
        let capped = secs.min(self.max.as_secs_f64());
        if capped.is_finite() && capped >= 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max
        }
    }
}

/// Send the request built by `build`, sleeping and resending while the server answers 429.
/// Any other status is returned to the caller as-is.
pub async fn send_with_backoff<F>(backoff: &Backoff, mut build: F) -> Result<Response, EnrichError>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        let response = build().send().await?;
        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return Ok(response);
        }
        if attempt >= backoff.max_retries {
            return Err(EnrichError::RateLimited {
                attempts: attempt + 1,
                url: response.url().to_string(),
            });
        }
        let delay = backoff.delay(attempt);
        warn!(url = %response.url(), ?delay, "Rate limited, backing off");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Map a non-2xx response to `EnrichError::Status`
pub fn ensure_success(response: Response) -> Result<Response, EnrichError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(EnrichError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}
