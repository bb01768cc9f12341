// Copyright 2025 Cowboy AI, LLC.

//! Handler shapes for commands, queries and events
//!
//! Handlers are owned by the registry; dispatchers only hold an `Arc` for the
//! duration of a call. Errors are plain [`anyhow::Error`] values so that a
//! handler can raise its own typed error and the caller can downcast it back.

use crate::context::DispatchContext;
use crate::message::{Command, Event, Query};
use async_trait::async_trait;
use std::any::type_name;

/// Handles exactly one command type
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Execute the command
    async fn handle(&self, command: &C, ctx: &DispatchContext) -> anyhow::Result<C::Output>;

    /// Name used in logs
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Handles exactly one query type
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    /// Answer the query
    async fn handle(&self, query: &Q, ctx: &DispatchContext) -> anyhow::Result<Q::Output>;

    /// Name used in logs
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// One of any number of subscribers to an event type
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    /// React to the event
    async fn handle(&self, event: &E, ctx: &DispatchContext) -> anyhow::Result<()>;

    /// Name used in logs and aggregate failures
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}
