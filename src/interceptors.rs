// Copyright 2025 Cowboy AI, LLC.

//! Stock interceptors

use crate::context::DispatchContext;
use crate::errors::DispatchResult;
use crate::interceptor::{Interceptor, Next, Response};
use crate::message::Envelope;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error, info_span, warn, Instrument};

/// Logs every dispatch with `tracing` and runs it inside a span.
///
/// Register it first to make it the outermost stage, so its timings cover
/// every other interceptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

async fn traced<T: Send + 'static>(
    next: Next<T>,
    envelope: Envelope,
    ctx: &DispatchContext,
) -> DispatchResult<T> {
    let kind = envelope.kind();
    let message_id = envelope.id();
    let message_type = envelope.message_type();
    let span = info_span!(
        "dispatch",
        kind = %kind,
        message_id = %message_id,
        message_type,
        created_by = envelope.metadata().created_by().unwrap_or("-"),
    );

    async move {
        let started = Instant::now();
        debug!("Dispatch started");
        let result = next.run(envelope, ctx).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => debug!(elapsed_ms, "Dispatch completed"),
            Err(err) if err.is_aggregate() => error!(elapsed_ms, error = %err, "Broadcast failed"),
            Err(err) => warn!(elapsed_ms, error = %err, "Dispatch failed"),
        }
        result
    }
    .instrument(span)
    .await
}

#[async_trait]
impl Interceptor for TracingInterceptor {
    async fn on_command(
        &self,
        next: Next<Response>,
        command: Envelope,
        ctx: &DispatchContext,
    ) -> DispatchResult<Response> {
        traced(next, command, ctx).await
    }

    async fn on_query(
        &self,
        next: Next<Response>,
        query: Envelope,
        ctx: &DispatchContext,
    ) -> DispatchResult<Response> {
        traced(next, query, ctx).await
    }

    async fn on_event(
        &self,
        next: Next<()>,
        event: Envelope,
        ctx: &DispatchContext,
    ) -> DispatchResult<()> {
        traced(next, event, ctx).await
    }
}
