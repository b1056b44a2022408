use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use rand::Rng;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EtlError;

const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// One GET request: url, headers and query pairs. Retries resend it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub retry_after: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value> {
        serde_json::from_str::<Value>(self.body.trim())
            .map_err(|err| anyhow!("invalid json body: {err}"))
    }
}

pub trait HttpGet {
    fn fetch(&self, req: &ApiRequest) -> Result<HttpResponse>;
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// 429s tolerated before giving up.
    pub max_retries: u32,
    /// Linear step used when the server sends no usable `Retry-After`.
    pub step: Duration,
    pub max_delay: Duration,
    /// Upper bound of uniform random delay added to every backoff sleep.
    pub jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            step: Duration::from_secs(60),
            max_delay: Duration::from_secs(600),
            jitter: Duration::ZERO,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based), before jitter.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<&str>) -> Duration {
        let base = retry_after
            .and_then(parse_retry_after)
            .unwrap_or_else(|| self.step.saturating_mul(attempt));
        base.min(self.max_delay)
    }

    fn jitter_sample(&self) -> Duration {
        let max_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// Only plain digit strings count; HTTP-date values fall back to the linear step. Digit strings
/// too large for `u64` saturate, so the caller's cap applies.
fn parse_retry_after(raw: &str) -> Option<Duration> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(
        raw.parse::<u64>()
            .map(Duration::from_secs)
            .unwrap_or(Duration::MAX),
    )
}

pub fn request_with_backoff<C, S>(
    client: &C,
    sleeper: &S,
    req: &ApiRequest,
    policy: &BackoffPolicy,
) -> Result<HttpResponse>
where
    C: HttpGet + ?Sized,
    S: Sleeper + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        let resp = client.fetch(req)?;
        if resp.status == STATUS_TOO_MANY_REQUESTS {
            attempt += 1;
            if attempt > policy.max_retries {
                return Err(EtlError::RateLimitExhausted {
                    retries: policy.max_retries,
                    body: resp.body,
                }
                .into());
            }
            let delay = policy
                .delay_for(attempt, resp.retry_after.as_deref())
                .saturating_add(policy.jitter_sample());
            warn!(
                url = %req.url,
                attempt,
                "[429] rate limited, sleeping {}s",
                delay.as_secs()
            );
            sleeper.sleep(delay);
            continue;
        }
        if !resp.is_success() {
            return Err(EtlError::HttpStatus {
                status: resp.status,
                url: req.url.clone(),
                body: resp.body,
            }
            .into());
        }
        debug!(url = %req.url, status = resp.status, "request ok");
        return Ok(resp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_must_be_digits() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 30 "), None);
        assert_eq!(parse_retry_after("30 "), None);
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("1.5"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(parse_retry_after(""), None);
    }

    #[test]
    fn linear_delay_is_capped() {
        let policy = BackoffPolicy {
            max_delay: Duration::from_secs(150),
            ..BackoffPolicy::default()
        };
        assert_eq!(policy.delay_for(1, None), Duration::from_secs(60));
        assert_eq!(policy.delay_for(2, None), Duration::from_secs(120));
        assert_eq!(policy.delay_for(3, None), Duration::from_secs(150));
        assert_eq!(policy.delay_for(4, Some("900")), Duration::from_secs(150));
        assert_eq!(policy.delay_for(4, Some("7")), Duration::from_secs(7));
        assert_eq!(
            policy.delay_for(1, Some("99999999999999999999999")),
            Duration::from_secs(150)
        );
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let policy = BackoffPolicy {
            jitter: Duration::from_millis(250),
            ..BackoffPolicy::default()
        };
        for _ in 0..50 {
            assert!(policy.jitter_sample() <= Duration::from_millis(250));
        }
        assert_eq!(BackoffPolicy::default().jitter_sample(), Duration::ZERO);
    }
}
