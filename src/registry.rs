// Copyright 2025 Cowboy AI, LLC.

//! Handler registry
//!
//! [`HandlerRegistry`] is the read contract the dispatchers consume: the
//! single handler of a command or query, the subscribers of an event, and an
//! ordered snapshot of the interceptors for a message kind.
//!
//! [`InMemoryRegistry`] is a type-keyed implementation: handlers are stored
//! behind `TypeId`, single-handler types are enforced at registration time,
//! and every resolution returns a fresh snapshot so registrations made after
//! a mediator was built are visible to the next dispatch.

use crate::errors::RegistryError;
use crate::handlers::{CommandHandler, EventHandler, QueryHandler};
use crate::interceptor::Interceptor;
use crate::message::{Command, Event, MessageKind, Query};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Resolution contract consumed by the dispatchers
pub trait HandlerRegistry: Send + Sync + 'static {
    /// The single handler for `C`, if any
    fn command_handler<C: Command>(&self) -> Option<Arc<dyn CommandHandler<C>>>;

    /// The single handler for `Q`, if any
    fn query_handler<Q: Query>(&self) -> Option<Arc<dyn QueryHandler<Q>>>;

    /// Every subscriber of `E`, possibly none
    fn event_handlers<E: Event>(&self) -> Vec<Arc<dyn EventHandler<E>>>;

    /// Interceptors for `kind`, in registration order
    fn interceptors(&self, kind: MessageKind) -> Vec<Arc<dyn Interceptor>>;
}

type Slot = Box<dyn Any + Send + Sync>;

struct ScopedInterceptor {
    scope: Option<MessageKind>,
    interceptor: Arc<dyn Interceptor>,
}

/// Type-keyed in-memory registry
#[derive(Default)]
pub struct InMemoryRegistry {
    commands: RwLock<HashMap<TypeId, Slot>>,
    queries: RwLock<HashMap<TypeId, Slot>>,
    events: RwLock<HashMap<TypeId, Slot>>,
    interceptors: RwLock<Vec<ScopedInterceptor>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn insert_single<M: 'static>(
    table: &RwLock<HashMap<TypeId, Slot>>,
    kind: MessageKind,
    slot: Slot,
) -> Result<(), RegistryError> {
    let mut table = write(table);
    let type_id = TypeId::of::<M>();
    if table.contains_key(&type_id) {
        return Err(RegistryError::DuplicateHandler {
            kind,
            message_type: type_name::<M>(),
        });
    }
    table.insert(type_id, slot);
    debug!(kind = %kind, message_type = type_name::<M>(), "Registered handler");
    Ok(())
}

impl InMemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for `C`; fails if one exists
    pub fn register_command_handler<C, H>(&self, handler: H) -> Result<(), RegistryError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.register_shared_command_handler::<C>(Arc::new(handler))
    }

    /// Register an already shared handler for `C`
    pub fn register_shared_command_handler<C: Command>(
        &self,
        handler: Arc<dyn CommandHandler<C>>,
    ) -> Result<(), RegistryError> {
        insert_single::<C>(&self.commands, MessageKind::Command, Box::new(handler))
    }

    /// Register the handler for `Q`; fails if one exists
    pub fn register_query_handler<Q, H>(&self, handler: H) -> Result<(), RegistryError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        self.register_shared_query_handler::<Q>(Arc::new(handler))
    }

    /// Register an already shared handler for `Q`
    pub fn register_shared_query_handler<Q: Query>(
        &self,
        handler: Arc<dyn QueryHandler<Q>>,
    ) -> Result<(), RegistryError> {
        insert_single::<Q>(&self.queries, MessageKind::Query, Box::new(handler))
    }

    /// Add a subscriber for `E`
    pub fn subscribe<E, H>(&self, handler: H)
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        self.subscribe_shared::<E>(Arc::new(handler))
    }

    /// Add an already shared subscriber for `E`
    pub fn subscribe_shared<E: Event>(&self, handler: Arc<dyn EventHandler<E>>) {
        let mut events = write(&self.events);
        let slot = events
            .entry(TypeId::of::<E>())
            .or_insert_with(|| -> Slot { Box::new(Vec::<Arc<dyn EventHandler<E>>>::new()) });
        if let Some(handlers) = slot.downcast_mut::<Vec<Arc<dyn EventHandler<E>>>>() {
            debug!(
                message_type = type_name::<E>(),
                handler = handler.name(),
                position = handlers.len(),
                "Subscribed event handler"
            );
            handlers.push(handler);
        }
    }

    /// Append an interceptor that wraps every message kind
    pub fn add_interceptor<I: Interceptor + 'static>(&self, interceptor: I) {
        self.push_interceptor(None, Arc::new(interceptor));
    }

    /// Append an interceptor that wraps only `kind`
    pub fn add_interceptor_for<I: Interceptor + 'static>(&self, kind: MessageKind, interceptor: I) {
        self.push_interceptor(Some(kind), Arc::new(interceptor));
    }

    /// Append an already shared interceptor, optionally scoped to one kind
    pub fn add_shared_interceptor(
        &self,
        scope: Option<MessageKind>,
        interceptor: Arc<dyn Interceptor>,
    ) {
        self.push_interceptor(scope, interceptor);
    }

    fn push_interceptor(&self, scope: Option<MessageKind>, interceptor: Arc<dyn Interceptor>) {
        let mut interceptors = write(&self.interceptors);
        debug!(
            interceptor = interceptor.name(),
            scope = ?scope,
            position = interceptors.len(),
            "Added interceptor"
        );
        interceptors.push(ScopedInterceptor { scope, interceptor });
    }

    /// Drop every interceptor
    pub fn clear_interceptors(&self) {
        write(&self.interceptors).clear();
    }
}

impl HandlerRegistry for InMemoryRegistry {
    fn command_handler<C: Command>(&self) -> Option<Arc<dyn CommandHandler<C>>> {
        read(&self.commands)
            .get(&TypeId::of::<C>())
            .and_then(|slot| slot.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .cloned()
    }

    fn query_handler<Q: Query>(&self) -> Option<Arc<dyn QueryHandler<Q>>> {
        read(&self.queries)
            .get(&TypeId::of::<Q>())
            .and_then(|slot| slot.downcast_ref::<Arc<dyn QueryHandler<Q>>>())
            .cloned()
    }

    fn event_handlers<E: Event>(&self) -> Vec<Arc<dyn EventHandler<E>>> {
        read(&self.events)
            .get(&TypeId::of::<E>())
            .and_then(|slot| slot.downcast_ref::<Vec<Arc<dyn EventHandler<E>>>>())
            .cloned()
            .unwrap_or_default()
    }

    fn interceptors(&self, kind: MessageKind) -> Vec<Arc<dyn Interceptor>> {
        read(&self.interceptors)
            .iter()
            .filter(|entry| entry.scope.map_or(true, |scope| scope == kind))
            .map(|entry| Arc::clone(&entry.interceptor))
            .collect()
    }
}

impl<R: HandlerRegistry> HandlerRegistry for Arc<R> {
    fn command_handler<C: Command>(&self) -> Option<Arc<dyn CommandHandler<C>>> {
        self.as_ref().command_handler::<C>()
    }

    fn query_handler<Q: Query>(&self) -> Option<Arc<dyn QueryHandler<Q>>> {
        self.as_ref().query_handler::<Q>()
    }

    fn event_handlers<E: Event>(&self) -> Vec<Arc<dyn EventHandler<E>>> {
        self.as_ref().event_handlers::<E>()
    }

    fn interceptors(&self, kind: MessageKind) -> Vec<Arc<dyn Interceptor>> {
        self.as_ref().interceptors(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DispatchContext;
    use crate::message::{Message, MessageMetadata};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Register(MessageMetadata);
    impl Message for Register {
        fn metadata(&self) -> &MessageMetadata {
            &self.0
        }
    }
    impl Command for Register {
        type Output = ();
    }

    #[derive(Debug)]
    struct Lookup(MessageMetadata);
    impl Message for Lookup {
        fn metadata(&self) -> &MessageMetadata {
            &self.0
        }
    }
    impl Query for Lookup {
        type Output = usize;
    }

    #[derive(Debug)]
    struct Registered(MessageMetadata);
    impl Message for Registered {
        fn metadata(&self) -> &MessageMetadata {
            &self.0
        }
    }
    impl Event for Registered {}

    struct RegisterHandler;

    #[async_trait]
    impl CommandHandler<Register> for RegisterHandler {
        async fn handle(&self, _command: &Register, _ctx: &DispatchContext) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct LookupHandler;

    #[async_trait]
    impl QueryHandler<Lookup> for LookupHandler {
        async fn handle(&self, _query: &Lookup, _ctx: &DispatchContext) -> anyhow::Result<usize> {
            Ok(1)
        }
    }

    struct Audit(&'static str);

    #[async_trait]
    impl EventHandler<Registered> for Audit {
        async fn handle(&self, _event: &Registered, _ctx: &DispatchContext) -> anyhow::Result<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    struct Named(&'static str);

    impl Interceptor for Named {
        fn name(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn resolves_single_handlers_by_type() {
        let registry = InMemoryRegistry::new();
        assert!(registry.command_handler::<Register>().is_none());
        assert!(registry.query_handler::<Lookup>().is_none());

        registry.register_command_handler(RegisterHandler).unwrap();
        registry.register_query_handler(LookupHandler).unwrap();

        assert!(registry.command_handler::<Register>().is_some());
        assert!(registry.query_handler::<Lookup>().is_some());
    }

    #[test]
    fn second_command_handler_is_rejected() {
        let registry = InMemoryRegistry::new();
        registry.register_command_handler(RegisterHandler).unwrap();

        let err = registry.register_command_handler(RegisterHandler).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateHandler {
                kind: MessageKind::Command,
                message_type: type_name::<Register>(),
            }
        );
    }

    #[test]
    fn second_query_handler_is_rejected() {
        let registry = InMemoryRegistry::new();
        registry.register_query_handler(LookupHandler).unwrap();
        assert!(registry.register_query_handler(LookupHandler).is_err());
    }

    #[test]
    fn event_handlers_keep_subscription_order() {
        let registry = InMemoryRegistry::new();
        assert!(registry.event_handlers::<Registered>().is_empty());

        registry.subscribe(Audit("first"));
        registry.subscribe(Audit("second"));
        registry.subscribe_shared::<Registered>(Arc::new(Audit("third")));

        let names: Vec<_> = registry
            .event_handlers::<Registered>()
            .iter()
            .map(|h| h.name())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn interceptors_filtered_by_scope_in_registration_order() {
        let registry = InMemoryRegistry::new();
        registry.add_interceptor(Named("all-1"));
        registry.add_interceptor_for(MessageKind::Event, Named("events"));
        registry.add_interceptor_for(MessageKind::Query, Named("queries"));
        registry.add_interceptor(Named("all-2"));

        let names = |kind| {
            registry
                .interceptors(kind)
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>()
        };

        assert_eq!(names(MessageKind::Command), vec!["all-1", "all-2"]);
        assert_eq!(names(MessageKind::Query), vec!["all-1", "queries", "all-2"]);
        assert_eq!(names(MessageKind::Event), vec!["all-1", "events", "all-2"]);

        // snapshots are stable between calls
        assert_eq!(names(MessageKind::Event), names(MessageKind::Event));

        registry.clear_interceptors();
        assert!(registry.interceptors(MessageKind::Command).is_empty());
    }

    #[test]
    fn shared_registry_resolves_through_arc() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.subscribe(Audit("only"));
        assert_eq!(HandlerRegistry::event_handlers::<Registered>(&registry).len(), 1);
    }
}
