// Copyright 2025 Cowboy AI, LLC.

//! # Message Model
//!
//! Commands, queries and events share one identity shape: an immutable
//! [`MessageId`], the construction timestamp and an optional actor. Routing
//! never looks at these fields; it is keyed by the message's Rust type.
//!
//! Inside the interception chain messages travel as an [`Envelope`], a
//! type-erased view that lets a generic interceptor read the identity of any
//! message and downcast to the concrete type when it needs to.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any, TypeId};
use std::fmt::{self, Debug};
use std::sync::Arc;
use uuid::Uuid;

/// Message identifier - UUID v7 for time-ordered correlation in logs
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Create a new time-ordered message id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity carried by every message.
///
/// Fields are assigned once, at construction, and have no setters.
///
/// # Examples
///
/// ```rust
/// use cim_mediator::{MessageId, MessageMetadata};
/// use chrono::Utc;
///
/// let id = MessageId::new();
/// let at = Utc::now();
/// let a = MessageMetadata::with_identity(id, at, Some("alice".into()));
/// let b = MessageMetadata::with_identity(id, at, Some("alice".into()));
/// assert_eq!(a, b);
/// assert_eq!(a.created_by(), Some("alice"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct MessageMetadata {
    id: MessageId,
    created_at: DateTime<Utc>,
    created_by: Option<String>,
}

impl MessageMetadata {
    /// Fresh identity with no actor
    pub fn new() -> Self {
        Self {
            id: MessageId::new(),
            created_at: Utc::now(),
            created_by: None,
        }
    }

    /// Fresh identity attributed to `actor`
    pub fn by(actor: impl Into<String>) -> Self {
        Self {
            created_by: Some(actor.into()),
            ..Self::new()
        }
    }

    /// Explicit identity, used for replay and tests
    pub fn with_identity(
        id: MessageId,
        created_at: DateTime<Utc>,
        created_by: Option<String>,
    ) -> Self {
        Self {
            id,
            created_at,
            created_by,
        }
    }

    /// Message id
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Construction timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Actor that created the message, if known
    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }
}

impl Default for MessageMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// The three dispatchable message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// State-changing request with exactly one handler
    Command,
    /// Read-only request with exactly one handler
    Query,
    /// Notification with zero or more handlers
    Event,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Command => write!(f, "command"),
            MessageKind::Query => write!(f, "query"),
            MessageKind::Event => write!(f, "event"),
        }
    }
}

/// Anything that can be dispatched.
pub trait Message: Debug + Send + Sync + 'static {
    /// Identity assigned at construction
    fn metadata(&self) -> &MessageMetadata;

    /// Shorthand for `metadata().id()`
    fn id(&self) -> MessageId {
        self.metadata().id()
    }
}

/// A request to change state.
///
/// Fire-only commands use `Output = ()`; commands that produce a result
/// name it here.
///
/// # Examples
///
/// ```rust
/// use cim_mediator::{Command, Message, MessageMetadata};
///
/// #[derive(Debug)]
/// struct RenameAccount {
///     meta: MessageMetadata,
///     name: String,
/// }
///
/// impl Message for RenameAccount {
///     fn metadata(&self) -> &MessageMetadata {
///         &self.meta
///     }
/// }
///
/// impl Command for RenameAccount {
///     type Output = ();
/// }
/// ```
pub trait Command: Message {
    /// Result produced by the handler
    type Output: Send + 'static;
}

/// A request for data; a successful fetch always yields `Output`.
pub trait Query: Message {
    /// Result produced by the handler
    type Output: Send + 'static;
}

/// A notification broadcast to every subscriber.
pub trait Event: Message {}

/// Type-erased message as seen by interceptors.
///
/// Cloning is cheap; the payload is shared.
#[derive(Clone)]
pub struct Envelope {
    kind: MessageKind,
    message_type: &'static str,
    type_id: TypeId,
    metadata: MessageMetadata,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Envelope {
    /// Wrap a command
    pub fn command<C: Command>(command: C) -> Self {
        Self::from_arc(MessageKind::Command, Arc::new(command))
    }

    /// Wrap a query
    pub fn query<Q: Query>(query: Q) -> Self {
        Self::from_arc(MessageKind::Query, Arc::new(query))
    }

    /// Wrap an event
    pub fn event<E: Event>(event: E) -> Self {
        Self::from_arc(MessageKind::Event, Arc::new(event))
    }

    /// Wrap an already shared message under an explicit kind
    pub fn from_arc<M: Message>(kind: MessageKind, message: Arc<M>) -> Self {
        Self {
            kind,
            message_type: type_name::<M>(),
            type_id: TypeId::of::<M>(),
            metadata: message.metadata().clone(),
            payload: message,
        }
    }

    /// Kind the message was dispatched as
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Fully qualified Rust type name of the payload
    pub fn message_type(&self) -> &'static str {
        self.message_type
    }

    /// Identity of the payload
    pub fn metadata(&self) -> &MessageMetadata {
        &self.metadata
    }

    /// Shorthand for `metadata().id()`
    pub fn id(&self) -> MessageId {
        self.metadata.id()
    }

    /// Whether the payload is an `M`
    pub fn is<M: Message>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    /// Borrow the payload as `M`
    pub fn downcast_ref<M: Message>(&self) -> Option<&M> {
        self.payload.downcast_ref::<M>()
    }

    /// Share the payload as `M`
    pub fn downcast_arc<M: Message>(&self) -> Option<Arc<M>> {
        Arc::clone(&self.payload).downcast::<M>().ok()
    }
}

impl Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("kind", &self.kind)
            .field("message_type", &self.message_type)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
