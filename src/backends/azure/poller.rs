//! Long-running operation handling.
//!
//! Resource Manager answers slow operations (group delete, template export)
//! with `202 Accepted` and a `Location` header. Polling that URL returns 202
//! until the operation finishes, then the final status and body.

use crate::{Result, RgmuxError};
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Polling settings for one operation.
#[derive(Debug, Clone, Copy)]
pub(super) struct PollOptions {
    /// Wait used when the provider sends no `Retry-After`
    pub interval: Duration,
    /// Give up after this many polls
    pub max_polls: usize,
}

/// Turns a non-success response into an error. 404 becomes
/// [`RgmuxError::NotFound`] naming `target`.
pub(super) async fn check_status(response: Response, target: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.text().await {
        Ok(body) if !body.is_empty() => body,
        _ => status.canonical_reason().unwrap_or("unknown status").to_string(),
    };

    if status == StatusCode::NOT_FOUND {
        return Err(RgmuxError::NotFound(target.to_string()));
    }

    Err(RgmuxError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Parses a `Retry-After` header given in seconds.
pub(super) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn location(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Waits for the operation started by `initial` to finish.
///
/// Responses other than `202` with a `Location` header are returned as-is.
pub(super) async fn wait_for_completion(
    http: &reqwest::Client,
    initial: Response,
    token: &str,
    target: &str,
    options: PollOptions,
) -> Result<Response> {
    if initial.status() != StatusCode::ACCEPTED {
        return Ok(initial);
    }
    let Some(mut poll_url) = location(initial.headers()) else {
        return Ok(initial);
    };
    let mut wait = retry_after(initial.headers()).unwrap_or(options.interval);

    for attempt in 1..=options.max_polls {
        tokio::time::sleep(wait).await;

        let response = http
            .get(&poll_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RgmuxError::Remote(e.to_string()))?;

        debug!(attempt, status = %response.status(), target, "polled long-running operation");

        if response.status() == StatusCode::ACCEPTED {
            if let Some(next) = location(response.headers()) {
                poll_url = next;
            }
            wait = retry_after(response.headers()).unwrap_or(options.interval);
            continue;
        }

        return check_status(response, target).await;
    }

    Err(RgmuxError::Remote(format!(
        "{} did not finish after {} polls",
        target, options.max_polls
    )))
}
