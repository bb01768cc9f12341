// Copyright 2025 Cowboy AI, LLC.

//! Error types for dispatch and registration

use crate::message::{Envelope, MessageKind};
use thiserror::Error;

/// No handler is registered for a command or query type
#[derive(Debug, Error)]
#[error("No {kind} handler registered for {message_type} (message {})", .message.id())]
pub struct HandlerNotFound {
    /// Kind the message was dispatched as
    pub kind: MessageKind,
    /// Concrete message type
    pub message_type: &'static str,
    /// The instance that could not be routed
    pub message: Envelope,
}

impl HandlerNotFound {
    /// Build from the undeliverable envelope
    pub fn new(message: Envelope) -> Self {
        Self {
            kind: message.kind(),
            message_type: message.message_type(),
            message,
        }
    }
}

/// One event handler's failure within a fan-out
#[derive(Debug, Error)]
#[error("Handler #{index} ({handler}) failed: {error}")]
pub struct HandlerFailure {
    /// Registration position of the handler
    pub index: usize,
    /// Handler type name
    pub handler: &'static str,
    /// What the handler raised
    #[source]
    pub error: anyhow::Error,
}

/// Every failure of a broadcast, in handler registration order
#[derive(Debug, Error)]
#[error("{} of {handler_count} handlers failed for event {event_type}", .failures.len())]
pub struct AggregateFailure {
    /// Concrete event type
    pub event_type: &'static str,
    /// Number of handlers the event was delivered to
    pub handler_count: usize,
    /// Individual failures, never empty
    pub failures: Vec<HandlerFailure>,
}

impl AggregateFailure {
    /// Individual failures
    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    /// Number of failed handlers
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Whether the failure list is empty
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Errors surfaced by `send`, `fetch` and `broadcast`
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Command or query without a handler
    #[error(transparent)]
    HandlerNotFound(#[from] HandlerNotFound),

    /// One or more event handlers failed
    #[error(transparent)]
    Aggregate(#[from] AggregateFailure),

    /// An interceptor swapped the message for one of another type
    #[error("Message type mismatch: expected {expected}, got {actual}")]
    MessageType {
        /// Type the handler accepts
        expected: &'static str,
        /// Type that reached the handler
        actual: &'static str,
    },

    /// An interceptor returned a result of the wrong type
    #[error("Response type mismatch while dispatching {message_type}: expected {expected}")]
    ResponseType {
        /// Type the caller expects
        expected: &'static str,
        /// Message being dispatched
        message_type: &'static str,
    },

    /// Raised by a handler or interceptor, passed through untouched
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

impl DispatchError {
    /// Check if this is a missing-handler error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DispatchError::HandlerNotFound(_))
    }

    /// Check if this is a fan-out aggregate
    pub fn is_aggregate(&self) -> bool {
        matches!(self, DispatchError::Aggregate(_))
    }

    /// Borrow the aggregate, if this is one
    pub fn as_aggregate(&self) -> Option<&AggregateFailure> {
        match self {
            DispatchError::Aggregate(aggregate) => Some(aggregate),
            _ => None,
        }
    }

    /// Borrow the missing-handler details, if this is one
    pub fn as_not_found(&self) -> Option<&HandlerNotFound> {
        match self {
            DispatchError::HandlerNotFound(not_found) => Some(not_found),
            _ => None,
        }
    }

    /// Recover the original typed error raised by a handler or interceptor
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            DispatchError::Handler(error) => error.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Registration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A command or query type already has its single handler
    #[error("A {kind} handler for {message_type} is already registered")]
    DuplicateHandler {
        /// Kind of the message type
        kind: MessageKind,
        /// Concrete message type
        message_type: &'static str,
    },
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document could not be parsed
    #[error("Invalid mediator configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
