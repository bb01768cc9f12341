// Copyright 2025 Cowboy AI, LLC.

//! # Event dispatcher
//!
//! `broadcast` delivers an event to every subscriber concurrently and waits
//! for all of them. The event interceptors wrap the whole fan-out, not each
//! handler.
//!
//! Failure semantics:
//!
//! - no subscribers is a success;
//! - a failing handler never stops the others;
//! - if any handler fails the call returns one [`AggregateFailure`] listing
//!   every failure in subscription order, regardless of completion order;
//! - a panicking handler counts as a failure of that handler.
//!
//! All handlers share the caller's [`DispatchContext`], so cancelling it is
//! observed by each handler that checks. Handlers that ignore cancellation
//! run to completion and their outcome is still reported.

use crate::config::FanOutMode;
use crate::context::DispatchContext;
use crate::errors::{AggregateFailure, DispatchError, DispatchResult, HandlerFailure};
use crate::handlers::EventHandler;
use crate::interceptor::Next;
use crate::message::{Envelope, Event, MessageKind};
use crate::pipeline::{self, event_hook};
use crate::registry::HandlerRegistry;
use anyhow::anyhow;
use futures::future::{join_all, FutureExt};
use std::any::type_name;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

type Subscribers<E> = Arc<[Arc<dyn EventHandler<E>>]>;

/// Dispatches events to zero or more handlers
pub struct Broadcaster<R> {
    registry: Arc<R>,
    fan_out: FanOutMode,
    warn_on_unhandled: bool,
}

impl<R> Clone for Broadcaster<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            fan_out: self.fan_out,
            warn_on_unhandled: self.warn_on_unhandled,
        }
    }
}

impl<R: HandlerRegistry> Broadcaster<R> {
    /// Create a broadcaster with spawned fan-out and unhandled-event warnings
    pub fn new(registry: Arc<R>) -> Self {
        Self {
            registry,
            fan_out: FanOutMode::Spawned,
            warn_on_unhandled: true,
        }
    }

    /// Set the fan-out mode
    pub fn with_fan_out(mut self, fan_out: FanOutMode) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Toggle the unhandled-event warning
    pub fn with_unhandled_event_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_unhandled = enabled;
        self
    }

    /// Deliver `event` to every subscriber
    pub async fn broadcast<E: Event>(&self, event: E, ctx: &DispatchContext) -> DispatchResult<()> {
        let envelope = Envelope::event(event);
        let handlers: Subscribers<E> = self.registry.event_handlers::<E>().into();

        debug!(
            message_id = %envelope.id(),
            message_type = envelope.message_type(),
            handlers = handlers.len(),
            "Broadcasting event"
        );

        let fan_out = self.fan_out;
        let warn_on_unhandled = self.warn_on_unhandled;
        let terminal = Next::new(move |envelope: Envelope, ctx: DispatchContext| {
            let handlers = Arc::clone(&handlers);
            async move {
                let event = envelope.downcast_arc::<E>().ok_or(DispatchError::MessageType {
                    expected: type_name::<E>(),
                    actual: envelope.message_type(),
                })?;
                if handlers.is_empty() {
                    if warn_on_unhandled {
                        warn!(
                            message_id = %envelope.id(),
                            message_type = envelope.message_type(),
                            "Event has no subscribers"
                        );
                    }
                    return Ok(());
                }
                deliver(fan_out, handlers, event, ctx).await
            }
        });

        let interceptors = self.registry.interceptors(MessageKind::Event);
        pipeline::compose(&interceptors, terminal, event_hook)
            .run(envelope, ctx)
            .await
    }
}

/// Run every handler concurrently and aggregate the failures
async fn deliver<E: Event>(
    fan_out: FanOutMode,
    handlers: Subscribers<E>,
    event: Arc<E>,
    ctx: DispatchContext,
) -> DispatchResult<()> {
    let outcomes = match fan_out {
        FanOutMode::Spawned => run_spawned(&handlers, &event, &ctx).await,
        FanOutMode::Inline => run_inline(&handlers, &event, &ctx).await,
    };

    let failures: Vec<HandlerFailure> = outcomes
        .into_iter()
        .enumerate()
        .filter_map(|(index, outcome)| {
            outcome.err().map(|error| HandlerFailure {
                index,
                handler: handlers[index].name(),
                error,
            })
        })
        .collect();

    if failures.is_empty() {
        return Ok(());
    }

    for failure in &failures {
        warn!(
            message_type = type_name::<E>(),
            handler = failure.handler,
            index = failure.index,
            error = %failure.error,
            "Event handler failed"
        );
    }

    Err(AggregateFailure {
        event_type: type_name::<E>(),
        handler_count: handlers.len(),
        failures,
    }
    .into())
}

/// One task per handler; outcomes returned in subscription order
async fn run_spawned<E: Event>(
    handlers: &Subscribers<E>,
    event: &Arc<E>,
    ctx: &DispatchContext,
) -> Vec<anyhow::Result<()>> {
    let mut tasks = JoinSet::new();
    let mut positions = HashMap::with_capacity(handlers.len());

    for (index, handler) in handlers.iter().enumerate() {
        let handler = Arc::clone(handler);
        let event = Arc::clone(event);
        let ctx = ctx.clone();
        let task = tasks.spawn(async move { handler.handle(&event, &ctx).await });
        positions.insert(task.id(), index);
    }

    let mut outcomes: Vec<Option<anyhow::Result<()>>> = handlers.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((id, outcome)) => {
                if let Some(&index) = positions.get(&id) {
                    outcomes[index] = Some(outcome);
                }
            }
            Err(join_error) => {
                if let Some(&index) = positions.get(&join_error.id()) {
                    outcomes[index] = Some(Err(anyhow!("event handler task failed: {join_error}")));
                }
            }
        }
    }

    outcomes
        .into_iter()
        .map(|outcome| outcome.unwrap_or_else(|| Err(anyhow!("event handler task was lost"))))
        .collect()
}

/// All handler futures polled together on the current task
async fn run_inline<E: Event>(
    handlers: &Subscribers<E>,
    event: &Arc<E>,
    ctx: &DispatchContext,
) -> Vec<anyhow::Result<()>> {
    let runs: Vec<_> = handlers
        .iter()
        .map(|handler| AssertUnwindSafe(handler.handle(event, ctx)).catch_unwind())
        .collect();

    join_all(runs)
        .await
        .into_iter()
        .map(|outcome| {
            outcome.unwrap_or_else(|panic| {
                Err(anyhow!("event handler panicked: {}", panic_message(&*panic)))
            })
        })
        .collect()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
