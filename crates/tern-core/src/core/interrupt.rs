use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Error marker for a run cancelled by an interrupt.
///
/// The CLI downcasts to this to map cancellation to exit code 130
/// instead of printing an error.
#[derive(Debug)]
pub struct InterruptedError;

impl std::fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

/// Cooperative cancellation token scoped to one orchestrator.
///
/// Cloning shares the underlying flag, so a clone handed to a Ctrl+C
/// handler cancels the same run the orchestrator is polling. The flag
/// is sticky until `reset()`; triggering twice is a no-op.
#[derive(Clone, Default)]
pub struct InterruptToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    interrupted: AtomicBool,
    notify: Notify,
}

impl InterruptToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes any pending `wait()`.
    pub fn trigger(&self) {
        if !self.inner.interrupted.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Checks whether cancellation has been requested.
    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    /// Waits until cancellation is requested.
    ///
    /// Returns immediately if the token is already triggered.
    pub async fn wait(&self) {
        loop {
            if self.is_interrupted() {
                return;
            }
            self.inner.notify.notified().await;
        }
    }

    /// Clears the flag so the token can be reused for the next turn.
    pub fn reset(&self) {
        self.inner.interrupted.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_sticky_until_reset() {
        let token = InterruptToken::new();
        assert!(!token.is_interrupted());

        token.trigger();
        token.trigger();
        assert!(token.is_interrupted());

        token.reset();
        assert!(!token.is_interrupted());
    }

    #[test]
    fn clones_share_the_flag() {
        let token = InterruptToken::new();
        let clone = token.clone();

        clone.trigger();
        assert!(token.is_interrupted());
    }

    #[tokio::test]
    async fn wait_returns_when_triggered() {
        let token = InterruptToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move {
            waiter.wait().await;
        });

        // Give the waiter a chance to park before triggering.
        tokio::task::yield_now().await;
        token.trigger();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn wait_returns_immediately_if_already_triggered() {
        let token = InterruptToken::new();
        token.trigger();
        token.wait().await;
    }
}
