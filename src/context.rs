// Copyright 2025 Cowboy AI, LLC.

//! Per-dispatch context and cooperative cancellation.
//!
//! A [`DispatchContext`] is threaded through every interceptor and into every
//! handler of a dispatch. Clones share one [`CancellationToken`], so cancelling
//! the caller's context is observed by all concurrently running event
//! handlers. Nothing is aborted: handlers decide when to look.

use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation signal shared by clones.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Create an un-cancelled token
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self {
            state: Arc::new(state),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    /// Non-blocking cancellation check
    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        let mut receiver = self.state.subscribe();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            // The sender lives as long as `self`, so this only fails on drop.
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Context handed to every stage of a dispatch
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    token: CancellationToken,
}

impl DispatchContext {
    /// Context with a fresh token
    pub fn new() -> Self {
        Self::default()
    }

    /// Context bound to an existing token
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    /// The shared cancellation token
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Shorthand for `token().is_cancelled()`
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Shorthand for `token().cancelled()`
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_visible_through_clones() {
        let ctx = DispatchContext::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());

        ctx.token().cancel();
        assert!(clone.is_cancelled());

        // second cancel is a no-op
        ctx.token().cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn independent_contexts_do_not_share_tokens() {
        let a = DispatchContext::new();
        let b = DispatchContext::new();
        a.token().cancel();
        assert!(!b.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let ctx = DispatchContext::with_token(token.clone());

        let waiter = tokio::spawn(async move { ctx.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should observe cancellation")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("already cancelled");
    }
}
