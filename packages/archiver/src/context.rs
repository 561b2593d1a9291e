//! Cancellation contexts handed to archive jobs by their callers.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use archive_core::CancelCause;
use tokio_util::sync::CancellationToken;

/// Caller-owned cancellation signal carrying the reason it fired.
///
/// Clones share the same signal. Jobs only ever read a context; whoever
/// created it decides when to cancel. The first cause recorded wins.
#[derive(Debug, Clone)]
pub struct CancelContext {
    token: CancellationToken,
    cause: Arc<OnceLock<CancelCause>>,
    parent: Option<Arc<CancelContext>>,
}

impl CancelContext {
    /// A root context that is never cancelled unless `cancel` is called on it.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            cause: Arc::new(OnceLock::new()),
            parent: None,
        }
    }

    /// Same as [`CancelContext::background`].
    pub fn new() -> Self {
        Self::background()
    }

    /// Derive a context that is cancelled whenever `self` is, but that can
    /// also be cancelled on its own without affecting `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            cause: Arc::new(OnceLock::new()),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Derive a child context that cancels itself with
    /// [`CancelCause::DeadlineExceeded`] once `timeout` elapses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let ctx = self.child();
        let deadline = ctx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = deadline.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    deadline.cancel_with(CancelCause::DeadlineExceeded);
                }
            }
        });
        ctx
    }

    /// Cancel with [`CancelCause::Canceled`].
    pub fn cancel(&self) {
        self.cancel_with(CancelCause::Canceled);
    }

    /// Cancel with the given cause. Ignored if already cancelled.
    pub fn cancel_with(&self, cause: CancelCause) {
        if self.token.is_cancelled() {
            return;
        }
        // Cause must be visible before the token reports cancellation.
        let _ = self.cause.set(cause);
        self.token.cancel();
    }

    /// Non-blocking check.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Why the context was cancelled, or `None` while it is live.
    pub fn cause(&self) -> Option<CancelCause> {
        if !self.token.is_cancelled() {
            return None;
        }
        if let Some(cause) = self.cause.get() {
            return Some(cause.clone());
        }
        let inherited = self.parent.as_ref().and_then(|parent| parent.cause());
        Some(inherited.unwrap_or(CancelCause::Canceled))
    }

    /// Wait until the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

impl Default for CancelContext {
    fn default() -> Self {
        Self::background()
    }
}
