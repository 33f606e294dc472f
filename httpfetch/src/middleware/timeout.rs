//! Per-attempt timeout middleware.

use std::time::Duration;

use futures::future::BoxFuture;

use super::{Middleware, Next, Request, Response};
use crate::{CallContext, ClientError};

/// Bounds everything after it in the chain with a deadline.
///
/// The request's [`CallContext`] is replaced by a child scope that expires
/// after the configured duration (or earlier, if the caller's scope does).
/// When the scope ends first the rest of the chain is dropped, so a primitive
/// that never looks at [`CallContext`] is still bounded. The child is
/// cancelled as soon as the attempt returns. Placed inside
/// [`Retry`](super::Retry), it bounds each attempt separately.
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use httpfetch::{Middleware, Retry, Timeout, chain};
///
/// let stack: Arc<dyn Middleware> = chain(vec![
///     Arc::new(Retry::new(3)),
///     Arc::new(Timeout::new(Duration::from_secs(2))),
/// ]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    /// Create a timeout middleware.
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// The configured duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Middleware for Timeout {
    fn handle(&self, request: Request, next: Next) -> BoxFuture<'_, Result<Response, ClientError>> {
        let (child, guard) = CallContext::from_request(&request).child_with_timeout(self.duration);
        let request = child.clone().attach(request);

        Box::pin(async move {
            let _guard = guard;
            // The attempt is abandoned at the deadline even if nothing below
            // watches the scope.
            let result = tokio::select! {
                biased;
                err = child.done() => Err(err),
                result = next.run(request) => result,
            };

            #[cfg(feature = "tracing")]
            if matches!(result, Err(ClientError::DeadlineExceeded)) {
                tracing::debug!(
                    timeout_ms = self.duration.as_millis() as u64,
                    "request deadline exceeded"
                );
            }

            result
        })
    }
}
