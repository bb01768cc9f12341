// Copyright 2025 Cowboy AI, LLC.

//! # CIM Mediator
//!
//! In-process message dispatch for the Composable Information Machine.
//!
//! Three kinds of messages are routed from a caller to registered handlers:
//! - **Commands**: state-changing requests with exactly one handler, optionally
//!   producing a result
//! - **Queries**: read-only requests with exactly one handler, always
//!   producing a result
//! - **Events**: notifications delivered concurrently to zero or more handlers
//!
//! Every dispatch runs through an ordered chain of **interceptors** that can
//! observe, transform, short-circuit or retry the call.
//!
//! ## Design Principles
//!
//! 1. **Routing by type**: handlers are resolved by the message's Rust type,
//!    never by instance data
//! 2. **Registration order is execution order**: the first interceptor is the
//!    outermost stage
//! 3. **Pure routing**: the dispatcher recovers nothing; errors reach the
//!    caller untouched unless an interceptor handles them
//! 4. **Independent listeners**: one event handler's failure never hides or
//!    blocks another's; every failure is reported together
//! 5. **Cooperative cancellation**: one token is shared by every stage and
//!    every concurrent handler

#![warn(missing_docs)]

mod broadcaster;
mod config;
mod context;
mod errors;
mod fetcher;
mod handlers;
mod interceptor;
mod mediator;
mod message;
mod registry;
mod sender;
pub mod interceptors;
pub mod pipeline;

pub use broadcaster::Broadcaster;
pub use config::{FanOutMode, MediatorConfig};
pub use context::{CancellationToken, DispatchContext};
pub use errors::{
    AggregateFailure, ConfigError, DispatchError, DispatchResult, HandlerFailure,
    HandlerNotFound, RegistryError,
};
pub use fetcher::Fetcher;
pub use handlers::{CommandHandler, EventHandler, QueryHandler};
pub use interceptor::{respond, take_response, Interceptor, Next, Response};
pub use interceptors::TracingInterceptor;
pub use mediator::{Mediator, MediatorBuilder};
pub use message::{
    Command, Envelope, Event, Message, MessageId, MessageKind, MessageMetadata, Query,
};
pub use registry::{HandlerRegistry, InMemoryRegistry};
pub use sender::Sender;
