// Copyright 2025 Cowboy AI, LLC.

//! # Interceptors
//!
//! An [`Interceptor`] wraps the dispatch of every message kind. Each hook
//! receives the rest of the chain as a [`Next`] continuation and may:
//!
//! - call it once, optionally replacing the envelope or the response,
//! - skip it (cache hit, rejected input) and answer on its own,
//! - call it again (retry), since `Next` can be run any number of times.
//!
//! Hooks work on erased values. Command and query results travel as a
//! [`Response`]; use [`respond`] to produce one when short-circuiting. The
//! dispatcher downcasts the final response back to the handler's output type.
//!
//! ```rust
//! use async_trait::async_trait;
//! use cim_mediator::{DispatchContext, DispatchResult, Envelope, Interceptor, Next, Response};
//!
//! struct RejectAnonymous;
//!
//! #[async_trait]
//! impl Interceptor for RejectAnonymous {
//!     async fn on_command(
//!         &self,
//!         next: Next<Response>,
//!         command: Envelope,
//!         ctx: &DispatchContext,
//!     ) -> DispatchResult<Response> {
//!         if command.metadata().created_by().is_none() {
//!             return Err(anyhow::anyhow!("anonymous commands are rejected").into());
//!         }
//!         next.run(command, ctx).await
//!     }
//! }
//! ```

use crate::context::DispatchContext;
use crate::errors::{DispatchError, DispatchResult};
use crate::message::Envelope;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::{type_name, Any};
use std::future::Future;
use std::sync::Arc;

/// Erased command or query result
pub type Response = Box<dyn Any + Send>;

/// Box a typed value as a [`Response`]
pub fn respond<T: Send + 'static>(value: T) -> Response {
    Box::new(value)
}

/// Recover the typed value from a [`Response`]
pub fn take_response<T: 'static>(
    response: Response,
    message_type: &'static str,
) -> DispatchResult<T> {
    response
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| DispatchError::ResponseType {
            expected: type_name::<T>(),
            message_type,
        })
}

type Continuation<T> =
    dyn Fn(Envelope, DispatchContext) -> BoxFuture<'static, DispatchResult<T>> + Send + Sync;

/// The rest of the chain: the next interceptor or the handler invocation.
pub struct Next<T> {
    inner: Arc<Continuation<T>>,
}

impl<T> Clone for Next<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Next<T> {
    /// Wrap a continuation
    pub fn new<F, Fut>(continuation: F) -> Self
    where
        F: Fn(Envelope, DispatchContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DispatchResult<T>> + Send + 'static,
    {
        Self {
            inner: Arc::new(
                move |envelope: Envelope,
                      ctx: DispatchContext|
                      -> BoxFuture<'static, DispatchResult<T>> {
                    Box::pin(continuation(envelope, ctx))
                },
            ),
        }
    }

    /// Run the rest of the chain
    pub async fn run(&self, envelope: Envelope, ctx: &DispatchContext) -> DispatchResult<T> {
        (self.inner)(envelope, ctx.clone()).await
    }
}

/// Cross-cutting stage wrapping the dispatch of any message.
///
/// Every hook defaults to a plain pass-through.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// Wrap a command dispatch
    async fn on_command(
        &self,
        next: Next<Response>,
        command: Envelope,
        ctx: &DispatchContext,
    ) -> DispatchResult<Response> {
        next.run(command, ctx).await
    }

    /// Wrap a query dispatch
    async fn on_query(
        &self,
        next: Next<Response>,
        query: Envelope,
        ctx: &DispatchContext,
    ) -> DispatchResult<Response> {
        next.run(query, ctx).await
    }

    /// Wrap an event broadcast, including the whole fan-out
    async fn on_event(
        &self,
        next: Next<()>,
        event: Envelope,
        ctx: &DispatchContext,
    ) -> DispatchResult<()> {
        next.run(event, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Event, Message, MessageMetadata};

    #[derive(Debug)]
    struct Tick(MessageMetadata);

    impl Message for Tick {
        fn metadata(&self) -> &MessageMetadata {
            &self.0
        }
    }

    impl Event for Tick {}

    #[test]
    fn responses_round_trip_through_erasure() {
        let value: u64 = take_response(respond(42u64), "Tick").unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn wrong_response_type_is_reported() {
        let err = take_response::<String>(respond(1u8), "Tick").unwrap_err();
        match err {
            DispatchError::ResponseType {
                expected,
                message_type,
            } => {
                assert_eq!(expected, type_name::<String>());
                assert_eq!(message_type, "Tick");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn next_can_run_more_than_once() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let next = Next::new(move |_envelope, _ctx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, DispatchError>(())
            }
        });

        let envelope = Envelope::event(Tick(MessageMetadata::new()));
        let ctx = DispatchContext::new();
        next.run(envelope.clone(), &ctx).await.unwrap();
        next.clone().run(envelope, &ctx).await.unwrap();

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn default_hooks_pass_through() {
        struct Transparent;
        impl Interceptor for Transparent {}

        let next = Next::new(|_envelope, _ctx| async { Ok::<_, DispatchError>(respond("done")) });
        let envelope = Envelope::event(Tick(MessageMetadata::new()));
        let response = Transparent
            .on_query(next, envelope, &DispatchContext::new())
            .await
            .unwrap();

        assert_eq!(take_response::<&str>(response, "Tick").unwrap(), "done");
        assert!(Transparent.name().ends_with("Transparent"));
    }
}
