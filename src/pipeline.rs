// Copyright 2025 Cowboy AI, LLC.

//! Chain builder
//!
//! Folds an ordered interceptor list around a terminal continuation, from the
//! last interceptor to the first, so that the first-registered interceptor is
//! outermost: it sees the message first and the result last. An empty list
//! yields the terminal unchanged.
//!
//! Chains are rebuilt for every dispatch and never cached.

use crate::context::DispatchContext;
use crate::errors::DispatchResult;
use crate::interceptor::{Interceptor, Next, Response};
use crate::message::Envelope;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Selects which interceptor hook a chain invokes
pub type Hook<T> = for<'a> fn(
    &'a dyn Interceptor,
    Next<T>,
    Envelope,
    &'a DispatchContext,
) -> BoxFuture<'a, DispatchResult<T>>;

/// Invokes [`Interceptor::on_command`]
pub fn command_hook<'a>(
    interceptor: &'a dyn Interceptor,
    next: Next<Response>,
    command: Envelope,
    ctx: &'a DispatchContext,
) -> BoxFuture<'a, DispatchResult<Response>> {
    interceptor.on_command(next, command, ctx)
}

/// Invokes [`Interceptor::on_query`]
pub fn query_hook<'a>(
    interceptor: &'a dyn Interceptor,
    next: Next<Response>,
    query: Envelope,
    ctx: &'a DispatchContext,
) -> BoxFuture<'a, DispatchResult<Response>> {
    interceptor.on_query(next, query, ctx)
}

/// Invokes [`Interceptor::on_event`]
pub fn event_hook<'a>(
    interceptor: &'a dyn Interceptor,
    next: Next<()>,
    event: Envelope,
    ctx: &'a DispatchContext,
) -> BoxFuture<'a, DispatchResult<()>> {
    interceptor.on_event(next, event, ctx)
}

/// Compose `interceptors` around `terminal`.
///
/// Errors are never caught here; they propagate outward unless a stage
/// handles them.
pub fn compose<T: Send + 'static>(
    interceptors: &[Arc<dyn Interceptor>],
    terminal: Next<T>,
    hook: Hook<T>,
) -> Next<T> {
    interceptors
        .iter()
        .rev()
        .fold(terminal, |next, interceptor| {
            let interceptor = Arc::clone(interceptor);
            Next::new(move |envelope: Envelope, ctx: DispatchContext| {
                let interceptor = Arc::clone(&interceptor);
                let next = next.clone();
                async move { hook(interceptor.as_ref(), next, envelope, &ctx).await }
            })
        })
}
