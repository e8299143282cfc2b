//! Rate-limit metadata extracted from Coupa responses.

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Serialize;
use strum::Display;

use crate::error::Result;

const LIMIT_HEADERS: [&str; 2] = ["x-ratelimit-limit", "ratelimit-limit"];
const REMAINING_HEADERS: [&str; 2] = ["x-ratelimit-remaining", "ratelimit-remaining"];
const RESET_HEADERS: [&str; 2] = ["x-ratelimit-reset", "ratelimit-reset"];

// Reset values above this are read as a Unix timestamp rather than a delay.
const RESET_EPOCH_THRESHOLD_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RateLimitStatus {
    /// No response was received (transport failure or cancellation).
    #[default]
    Unspecified,
    Ok,
    Overlimit,
}

/// Quota state reported alongside a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitDescription {
    pub status: RateLimitStatus,
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitDescription {
    /// Read the rate-limit headers of a response.
    pub fn from_response(status: StatusCode, headers: &HeaderMap) -> Self {
        Self::from_response_at(status, headers, Utc::now())
    }

    pub(crate) fn from_response_at(
        status: StatusCode,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Self {
        let limit = first_number(headers, &LIMIT_HEADERS);
        let remaining = first_number(headers, &REMAINING_HEADERS);
        let reset_at = first_number(headers, &RESET_HEADERS)
            .and_then(|value| reset_time(value, now))
            .or_else(|| {
                first_number(headers, &[RETRY_AFTER.as_str()]).and_then(|secs| after(now, secs))
            });

        let overlimit = status == StatusCode::TOO_MANY_REQUESTS || remaining == Some(0);
        Self {
            status: if overlimit {
                RateLimitStatus::Overlimit
            } else {
                RateLimitStatus::Ok
            },
            limit,
            remaining,
            reset_at,
        }
    }

    pub fn is_overlimit(&self) -> bool {
        self.status == RateLimitStatus::Overlimit
    }
}

fn first_number(headers: &HeaderMap, names: &[&str]) -> Option<u64> {
    names.iter().find_map(|name| {
        let raw = headers.get(*name)?.to_str().ok()?.trim();
        raw.parse::<u64>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().filter(|v| *v >= 0.0).map(|v| v.ceil() as u64))
    })
}

fn reset_time(value: u64, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if value > RESET_EPOCH_THRESHOLD_SECS {
        DateTime::from_timestamp(i64::try_from(value).ok()?, 0)
    } else {
        after(now, value)
    }
}

/// `now + secs`, or `None` when the delay does not fit in a timestamp.
fn after(now: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let delay = Duration::try_seconds(i64::try_from(secs).ok()?)?;
    now.checked_add_signed(delay)
}

/// An operation outcome paired with the rate-limit state of its last request.
///
/// The descriptor is present whether or not the operation succeeded, so a
/// sync driver can back off even after a failure.
#[derive(Debug)]
pub struct WithRateLimit<T> {
    pub result: Result<T>,
    pub rate_limit: RateLimitDescription,
}

impl<T> WithRateLimit<T> {
    pub fn new(result: Result<T>, rate_limit: RateLimitDescription) -> Self {
        Self { result, rate_limit }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<T> {
        self.result
    }

    pub fn into_parts(self) -> (Result<T>, RateLimitDescription) {
        (self.result, self.rate_limit)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WithRateLimit<U> {
        WithRateLimit {
            result: self.result.map(f),
            rate_limit: self.rate_limit,
        }
    }
}
