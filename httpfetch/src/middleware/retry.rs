//! Retry middleware with configurable backoff.
//!
//! [`Retry`] re-runs the rest of the pipeline while the outcome is retriable
//! and the retry budget lasts. Any transport error is retriable; responses are
//! checked against the configured predicates, or against `5xx` when none are
//! configured.
//!
//! Waits between attempts race the request's [`CallContext`]. When the scope
//! ends first, the last outcome is returned with its head intact. A retriable
//! response has its body dropped (releasing the connection) before the wait
//! starts; the final response is handed to the caller open.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use httpfetch::{Backoff, Retry};
//!
//! // Up to 3 retries on 5xx or 429, with jittered exponential waits.
//! let retry = Retry::new(3)
//!     .retry_on_server_errors()
//!     .retry_on_status([http::StatusCode::TOO_MANY_REQUESTS])
//!     .backoff(Backoff::exponential(
//!         Duration::from_millis(100),
//!         1.6,
//!         Duration::from_secs(5),
//!         0.2,
//!     ));
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use http::StatusCode;

use super::{Middleware, Next, Request, Response};
use crate::{CallContext, ClientError, ResponseBody};

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    /// Default wait between attempts (linear backoff).
    pub const DELAY: Duration = Duration::from_millis(20);

    /// Default multiplier for exponential backoff.
    pub const MULTIPLIER: f64 = 1.6;

    /// Default jitter factor (0.2 means +/- 20%).
    pub const JITTER: f64 = 0.2;

    /// Default maximum delay for exponential backoff.
    pub const MAX_DELAY: Duration = Duration::from_secs(120);
}

type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Maps the index of a finished attempt (0-based) to the wait before the next.
#[derive(Clone)]
pub struct Backoff {
    kind: BackoffKind,
}

#[derive(Clone)]
enum BackoffKind {
    Linear(Duration),
    Exponential {
        base: Duration,
        multiplier: f64,
        max: Duration,
        jitter: f64,
    },
    Custom(BackoffFn),
}

impl std::fmt::Debug for Backoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            BackoffKind::Linear(delay) => f.debug_tuple("Linear").field(delay).finish(),
            BackoffKind::Exponential {
                base,
                multiplier,
                max,
                jitter,
            } => f
                .debug_struct("Exponential")
                .field("base", base)
                .field("multiplier", multiplier)
                .field("max", max)
                .field("jitter", jitter)
                .finish(),
            BackoffKind::Custom(_) => f.debug_tuple("Custom").finish(),
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::linear(defaults::DELAY)
    }
}

impl Backoff {
    /// Wait the same `delay` before every retry.
    pub fn linear(delay: Duration) -> Self {
        Self {
            kind: BackoffKind::Linear(delay),
        }
    }

    /// Wait `base * multiplier^attempt`, randomized by +/- `jitter` and never
    /// more than `max`.
    ///
    /// # Panics
    ///
    /// Panics if `multiplier` is less than 1.0 or `jitter` is not between 0.0
    /// and 1.0.
    pub fn exponential(base: Duration, multiplier: f64, max: Duration, jitter: f64) -> Self {
        assert!(multiplier >= 1.0, "multiplier must be >= 1.0");
        assert!(
            (0.0..=1.0).contains(&jitter),
            "jitter must be between 0.0 and 1.0"
        );
        Self {
            kind: BackoffKind::Exponential {
                base,
                multiplier,
                max,
                jitter,
            },
        }
    }

    /// Compute waits with a custom function.
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(u32) -> Duration + Send + Sync + 'static,
    {
        Self {
            kind: BackoffKind::Custom(Arc::new(func)),
        }
    }

    /// The wait after attempt number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        match &self.kind {
            BackoffKind::Linear(delay) => *delay,
            BackoffKind::Exponential {
                base,
                multiplier,
                max,
                jitter,
            } => {
                let cap = *max;
                let max = cap.as_secs_f64();
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let delay = (base.as_secs_f64() * multiplier.powi(exponent)).min(max);

                // Apply jitter: delay * (1 + jitter * random(-1, 1))
                let jittered = if *jitter > 0.0 {
                    let random_factor = rand::random::<f64>() * jitter * 2.0 - jitter;
                    delay * (1.0 + random_factor)
                } else {
                    delay
                };

                // `as_secs_f64` rounds huge caps up past `Duration::MAX`.
                Duration::try_from_secs_f64(jittered.min(max).max(0.0)).unwrap_or(cap)
            }
            BackoffKind::Custom(func) => func(attempt),
        }
    }
}

type Predicate = Arc<dyn Fn(&Response) -> bool + Send + Sync>;

/// Retry middleware.
///
/// Predicates are OR-combined and only ever see responses, never errors.
#[derive(Clone)]
pub struct Retry {
    max_retries: u32,
    backoff: Backoff,
    predicates: Vec<Predicate>,
}

impl std::fmt::Debug for Retry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retry")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl Retry {
    /// Retry at most `max_retries` times, not counting the first attempt.
    ///
    /// Defaults to a 20ms linear backoff and retrying `5xx` responses.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
            predicates: Vec::new(),
        }
    }

    /// Set the backoff.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Retry responses with a `5xx` status.
    pub fn retry_on_server_errors(self) -> Self {
        self.retry_if(|response| response.status().is_server_error())
    }

    /// Retry responses with any of the given statuses.
    pub fn retry_on_status<I>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = StatusCode>,
    {
        let statuses: Vec<StatusCode> = statuses.into_iter().collect();
        self.retry_if(move |response| statuses.contains(&response.status()))
    }

    /// Retry responses matching `predicate`.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Maximum number of retries.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn is_retriable(&self, result: &Result<Response, ClientError>) -> bool {
        match result {
            Err(_) => true,
            Ok(response) if self.predicates.is_empty() => response.status().is_server_error(),
            Ok(response) => self.predicates.iter().any(|predicate| predicate(response)),
        }
    }
}

fn release_body(response: Response) -> Response {
    let (parts, _body) = response.into_parts();
    Response::from_parts(parts, ResponseBody::empty())
}

impl Middleware for Retry {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(async move {
            let ctx = CallContext::from_request(&request);
            let mut attempt = 0;
            let mut result = next.clone().run(request.clone()).await;

            while attempt < self.max_retries && self.is_retriable(&result) {
                let delay = self.backoff.delay(attempt);

                #[cfg(feature = "tracing")]
                match &result {
                    Ok(response) => tracing::debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        status = response.status().as_u16(),
                        "retrying request"
                    ),
                    Err(err) => tracing::debug!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying request"
                    ),
                }

                // Release the superseded body before waiting; only the head is
                // kept for the cancellation path.
                result = result.map(release_body);

                tokio::select! {
                    biased;
                    _ = ctx.done() => return result,
                    _ = tokio::time::sleep(delay) => {}
                }

                attempt += 1;
                result = next.clone().run(request.clone()).await;
            }

            result
        })
    }
}
