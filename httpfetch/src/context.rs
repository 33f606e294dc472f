//! Per-call cancellation scopes.
//!
//! A [`CallContext`] travels in the request extensions and bounds everything a
//! call does: the transport round trip, body buffering and retry waits. Child
//! scopes are cancelled with their parent and never outlive its deadline.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::ClientError;

/// Cancellation token plus optional deadline for one call.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use httpfetch::CallContext;
///
/// let ctx = CallContext::with_timeout(Duration::from_secs(5));
/// let request = ctx.attach(http::Request::new(bytes::Bytes::new()));
/// assert!(CallContext::from_request(&request).deadline().is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Create a scope with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scope that expires after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Create a scope that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Get the scope carried by `request`, or a fresh unbounded one.
    pub fn from_request<B>(request: &http::Request<B>) -> Self {
        request
            .extensions()
            .get::<CallContext>()
            .cloned()
            .unwrap_or_default()
    }

    /// Store this scope in the request extensions, replacing any previous one.
    pub fn attach<B>(self, mut request: http::Request<B>) -> http::Request<B> {
        request.extensions_mut().insert(self);
        request
    }

    /// Derive a child scope expiring after `timeout`.
    ///
    /// The child keeps the earlier of the parent's deadline and the new one.
    /// The returned guard cancels the child when dropped.
    pub fn child_with_timeout(&self, timeout: Duration) -> (CallContext, DropGuard) {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };
        let token = self.token.child_token();
        let guard = token.clone().drop_guard();
        (
            CallContext {
                token,
                deadline: Some(deadline),
            },
            guard,
        )
    }

    /// The deadline of this scope, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this scope and all of its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the scope was cancelled or its deadline passed.
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Wait until the scope ends and report why.
    pub async fn done(&self) -> ClientError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => ClientError::Canceled,
                _ = tokio::time::sleep_until(deadline) => ClientError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ClientError::Canceled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_done_reports_cancel() {
        let ctx = CallContext::new();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.done().await });
        ctx.cancel();
        assert!(matches!(handle.await.unwrap(), ClientError::Canceled));
        assert!(ctx.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_reports_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_millis(50));
        assert!(!ctx.is_done());
        assert!(matches!(ctx.done().await, ClientError::DeadlineExceeded));
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_child_keeps_earlier_deadline() {
        let parent = CallContext::with_timeout(Duration::from_millis(10));
        let (child, _guard) = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());

        let parent = CallContext::with_timeout(Duration::from_secs(60));
        let (child, _guard) = parent.child_with_timeout(Duration::from_millis(10));
        assert!(child.deadline().unwrap() < parent.deadline().unwrap());
    }

    #[tokio::test]
    async fn test_child_cancelled_with_parent_and_guard() {
        let parent = CallContext::new();
        let (child, guard) = parent.child_with_timeout(Duration::from_secs(60));
        drop(guard);
        assert!(child.is_done());
        assert!(!parent.is_done());

        let (child, _guard) = parent.child_with_timeout(Duration::from_secs(60));
        parent.cancel();
        assert!(child.is_done());
    }

    #[test]
    fn test_from_request_defaults_when_missing() {
        let request = http::Request::new(());
        let ctx = CallContext::from_request(&request);
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_done());
    }
}
