//! Cancellation context
//!
//! A `Context` carries an optional deadline and any number of cancellation
//! signals. It governs every suspension point of the pipeline: rate limiter
//! admission, request execution and the wait between retries.
//!
//! Contexts are cheap to clone. Deriving a context (`with_timeout`,
//! `with_cancel`, ...) never loosens the parent: the earlier deadline wins and
//! cancelling a parent cancels everything derived from it.

use futures::future;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context finished
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Governing context for a single pipeline invocation
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    signals: Vec<watch::Receiver<bool>>,
}

/// Cancels the context it was created with (and all contexts derived from it)
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the associated context
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Check whether `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Context {
    /// A context that never expires and is never cancelled
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context that expires after `timeout`
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context that expires at `deadline`
    ///
    /// If the parent already expires earlier, its deadline is kept.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Derive a cancelable context
    #[must_use]
    pub fn with_cancel(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.signals.push(rx);
        (self, CancelHandle { tx })
    }

    /// The deadline, if one is set
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Check whether the context carries a deadline
    pub fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    /// Return why the context finished, or `None` while it is still live
    pub fn err(&self) -> Option<ContextError> {
        if self.signals.iter().any(|rx| *rx.borrow()) {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes
    pub async fn done(&self) -> ContextError {
        if let Some(err) = self.err() {
            return err;
        }

        let cancelled = async {
            if self.signals.is_empty() {
                return future::pending::<()>().await;
            }
            let waits = self.signals.iter().cloned().map(|mut rx| {
                Box::pin(async move {
                    // A dropped handle can no longer cancel
                    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    if closed {
                        future::pending::<()>().await;
                    }
                })
            });
            future::select_all(waits).await;
        };

        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => ContextError::Cancelled,
            () = expired => ContextError::DeadlineExceeded,
        }
    }

    /// Drive `fut` to completion unless the context finishes first
    ///
    /// A context that has already finished never polls `fut`.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }

        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_background_never_finishes() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        assert!(!ctx.has_deadline());

        let result = ctx.run(async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_earlier_deadline_wins() {
        let short = Context::background().with_timeout(Duration::from_millis(10));
        let derived = short.clone().with_timeout(Duration::from_secs(60));
        assert_eq!(derived.deadline(), short.deadline());
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiter() {
        let (ctx, handle) = Context::background().with_cancel();

        let waiter = tokio::spawn(async move { ctx.done().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        let err = waiter.await.unwrap();
        assert_eq!(err, ContextError::Cancelled);
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_child() {
        let (parent, handle) = Context::background().with_cancel();
        let (child, _child_handle) = parent.with_timeout(Duration::from_secs(60)).with_cancel();

        handle.cancel();
        assert_eq!(child.err(), Some(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_future() {
        let (ctx, handle) = Context::background().with_cancel();
        handle.cancel();

        let mut polled = false;
        let result = ctx.run(async { polled = true }).await;
        assert_eq!(result, Err(ContextError::Cancelled));
        assert!(!polled);
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let (ctx, handle) = Context::background().with_cancel();
        drop(handle);

        let ctx = ctx.with_timeout(Duration::from_millis(20));
        assert_eq!(ctx.done().await, ContextError::DeadlineExceeded);
    }
}
