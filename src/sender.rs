// Copyright 2025 Cowboy AI, LLC.

//! Command dispatcher
//!
//! Routes a command through the command interceptors to its single handler.
//! Fire-only commands (`Output = ()`) and result-producing commands take the
//! same path; only the terminal's output type differs.

use crate::context::DispatchContext;
use crate::errors::{DispatchError, DispatchResult, HandlerNotFound};
use crate::interceptor::{respond, take_response, Next, Response};
use crate::message::{Command, Envelope, MessageKind};
use crate::pipeline::{self, command_hook};
use crate::registry::HandlerRegistry;
use std::any::type_name;
use std::sync::Arc;
use tracing::debug;

/// Dispatches commands to exactly one handler
pub struct Sender<R> {
    registry: Arc<R>,
}

impl<R> Clone for Sender<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R: HandlerRegistry> Sender<R> {
    /// Create a sender reading from `registry`
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Send `command` and return its handler's output
    pub async fn send<C: Command>(
        &self,
        command: C,
        ctx: &DispatchContext,
    ) -> DispatchResult<C::Output> {
        let envelope = Envelope::command(command);
        let Some(handler) = self.registry.command_handler::<C>() else {
            debug!(
                message_id = %envelope.id(),
                message_type = envelope.message_type(),
                "No command handler registered"
            );
            return Err(HandlerNotFound::new(envelope).into());
        };

        debug!(
            message_id = %envelope.id(),
            message_type = envelope.message_type(),
            handler = handler.name(),
            "Sending command"
        );

        let terminal = Next::new(move |envelope: Envelope, ctx: DispatchContext| {
            let handler = Arc::clone(&handler);
            async move {
                let command = envelope
                    .downcast_arc::<C>()
                    .ok_or(DispatchError::MessageType {
                        expected: type_name::<C>(),
                        actual: envelope.message_type(),
                    })?;
                let output = handler.handle(&command, &ctx).await?;
                Ok::<Response, DispatchError>(respond(output))
            }
        });

        let interceptors = self.registry.interceptors(MessageKind::Command);
        let chain = pipeline::compose(&interceptors, terminal, command_hook);
        let response = chain.run(envelope, ctx).await?;
        take_response::<C::Output>(response, type_name::<C>())
    }
}
