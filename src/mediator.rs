// Copyright 2025 Cowboy AI, LLC.

//! # Mediator
//!
//! Single entry point for callers: [`Mediator::send`] for commands,
//! [`Mediator::fetch`] for queries and [`Mediator::broadcast`] for events.
//! Each call is forwarded to the matching dispatcher; the mediator itself
//! only routes by message kind.
//!
//! Messages are taken by value, so an absent message cannot be dispatched.
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use cim_mediator::{
//!     Command, CommandHandler, DispatchContext, InMemoryRegistry, Mediator, Message,
//!     MessageMetadata,
//! };
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Greet {
//!     meta: MessageMetadata,
//!     name: String,
//! }
//!
//! impl Message for Greet {
//!     fn metadata(&self) -> &MessageMetadata {
//!         &self.meta
//!     }
//! }
//!
//! impl Command for Greet {
//!     type Output = String;
//! }
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl CommandHandler<Greet> for Greeter {
//!     async fn handle(&self, command: &Greet, _ctx: &DispatchContext) -> anyhow::Result<String> {
//!         Ok(format!("hello, {}", command.name))
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let registry = Arc::new(InMemoryRegistry::new());
//! registry.register_command_handler::<Greet, _>(Greeter).unwrap();
//!
//! let mediator = Mediator::new(registry);
//! let greeting = mediator
//!     .send(Greet { meta: MessageMetadata::new(), name: "ada".into() })
//!     .await
//!     .unwrap();
//! assert_eq!(greeting, "hello, ada");
//! # });
//! ```

use crate::broadcaster::Broadcaster;
use crate::config::MediatorConfig;
use crate::context::DispatchContext;
use crate::errors::DispatchResult;
use crate::fetcher::Fetcher;
use crate::message::{Command, Event, Query};
use crate::registry::{HandlerRegistry, InMemoryRegistry};
use crate::sender::Sender;
use std::sync::Arc;

/// Facade over the three dispatchers
pub struct Mediator<R = InMemoryRegistry> {
    registry: Arc<R>,
    sender: Sender<R>,
    fetcher: Fetcher<R>,
    broadcaster: Broadcaster<R>,
    config: MediatorConfig,
}

impl<R> Clone for Mediator<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            sender: self.sender.clone(),
            fetcher: self.fetcher.clone(),
            broadcaster: self.broadcaster.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R: HandlerRegistry> Mediator<R> {
    /// Mediator with default configuration
    pub fn new(registry: Arc<R>) -> Self {
        Self::with_config(registry, MediatorConfig::default())
    }

    /// Mediator with explicit configuration
    pub fn with_config(registry: Arc<R>, config: MediatorConfig) -> Self {
        Self {
            sender: Sender::new(Arc::clone(&registry)),
            fetcher: Fetcher::new(Arc::clone(&registry)),
            broadcaster: Broadcaster::new(Arc::clone(&registry))
                .with_fan_out(config.fan_out)
                .with_unhandled_event_warnings(config.warn_on_unhandled_events),
            registry,
            config,
        }
    }

    /// Start a builder
    pub fn builder() -> MediatorBuilder<R> {
        MediatorBuilder::new()
    }

    /// The registry handlers are resolved from
    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Active configuration
    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    /// Send a command with a fresh context
    pub async fn send<C: Command>(&self, command: C) -> DispatchResult<C::Output> {
        self.send_with(command, &DispatchContext::new()).await
    }

    /// Send a command within `ctx`
    pub async fn send_with<C: Command>(
        &self,
        command: C,
        ctx: &DispatchContext,
    ) -> DispatchResult<C::Output> {
        self.sender.send(command, ctx).await
    }

    /// Fetch a query with a fresh context
    pub async fn fetch<Q: Query>(&self, query: Q) -> DispatchResult<Q::Output> {
        self.fetch_with(query, &DispatchContext::new()).await
    }

    /// Fetch a query within `ctx`
    pub async fn fetch_with<Q: Query>(
        &self,
        query: Q,
        ctx: &DispatchContext,
    ) -> DispatchResult<Q::Output> {
        self.fetcher.fetch(query, ctx).await
    }

    /// Broadcast an event with a fresh context
    pub async fn broadcast<E: Event>(&self, event: E) -> DispatchResult<()> {
        self.broadcast_with(event, &DispatchContext::new()).await
    }

    /// Broadcast an event within `ctx`
    pub async fn broadcast_with<E: Event>(
        &self,
        event: E,
        ctx: &DispatchContext,
    ) -> DispatchResult<()> {
        self.broadcaster.broadcast(event, ctx).await
    }
}

/// Builder for [`Mediator`]
pub struct MediatorBuilder<R> {
    registry: Option<Arc<R>>,
    config: MediatorConfig,
}

impl<R: HandlerRegistry> MediatorBuilder<R> {
    /// Empty builder with default configuration
    pub fn new() -> Self {
        Self {
            registry: None,
            config: MediatorConfig::default(),
        }
    }

    /// Use `registry`
    pub fn registry(mut self, registry: Arc<R>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use `config`
    pub fn config(mut self, config: MediatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build, falling back to a default registry when none was given
    pub fn build(self) -> Mediator<R>
    where
        R: Default,
    {
        let registry = self.registry.unwrap_or_default();
        Mediator::with_config(registry, self.config)
    }
}

impl<R: HandlerRegistry> Default for MediatorBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}
