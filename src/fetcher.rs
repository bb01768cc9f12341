// Copyright 2025 Cowboy AI, LLC.

//! Query dispatcher

use crate::context::DispatchContext;
use crate::errors::{DispatchError, DispatchResult, HandlerNotFound};
use crate::interceptor::{respond, take_response, Next, Response};
use crate::message::{Envelope, MessageKind, Query};
use crate::pipeline::{self, query_hook};
use crate::registry::HandlerRegistry;
use std::any::type_name;
use std::sync::Arc;
use tracing::debug;

/// Dispatches queries to exactly one handler
pub struct Fetcher<R> {
    registry: Arc<R>,
}

impl<R> Clone for Fetcher<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R: HandlerRegistry> Fetcher<R> {
    /// Create a fetcher reading from `registry`
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Fetch the answer to `query`
    pub async fn fetch<Q: Query>(
        &self,
        query: Q,
        ctx: &DispatchContext,
    ) -> DispatchResult<Q::Output> {
        let envelope = Envelope::query(query);
        let Some(handler) = self.registry.query_handler::<Q>() else {
            debug!(
                message_id = %envelope.id(),
                message_type = envelope.message_type(),
                "No query handler registered"
            );
            return Err(HandlerNotFound::new(envelope).into());
        };

        debug!(
            message_id = %envelope.id(),
            message_type = envelope.message_type(),
            handler = handler.name(),
            "Fetching query"
        );

        let terminal = Next::new(move |envelope: Envelope, ctx: DispatchContext| {
            let handler = Arc::clone(&handler);
            async move {
                let query = envelope
                    .downcast_arc::<Q>()
                    .ok_or(DispatchError::MessageType {
                        expected: type_name::<Q>(),
                        actual: envelope.message_type(),
                    })?;
                let output = handler.handle(&query, &ctx).await?;
                Ok::<Response, DispatchError>(respond(output))
            }
        });

        let interceptors = self.registry.interceptors(MessageKind::Query);
        let chain = pipeline::compose(&interceptors, terminal, query_hook);
        let response = chain.run(envelope, ctx).await?;
        take_response::<Q::Output>(response, type_name::<Q>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::QueryHandler;
    use crate::interceptor::Interceptor;
    use crate::message::{Message, MessageMetadata};
    use crate::registry::InMemoryRegistry;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct GetBalance {
        meta: MessageMetadata,
        account: &'static str,
    }

    impl Message for GetBalance {
        fn metadata(&self) -> &MessageMetadata {
            &self.meta
        }
    }

    impl Query for GetBalance {
        type Output = Option<i64>;
    }

    struct Ledger(HashMap<&'static str, i64>);

    #[async_trait]
    impl QueryHandler<GetBalance> for Ledger {
        async fn handle(
            &self,
            query: &GetBalance,
            _ctx: &DispatchContext,
        ) -> anyhow::Result<Option<i64>> {
            Ok(self.0.get(query.account).copied())
        }
    }

    /// Answers from memory after the first lookup of an account
    #[derive(Default)]
    struct BalanceCache {
        hits: Mutex<HashMap<&'static str, Option<i64>>>,
    }

    #[async_trait]
    impl Interceptor for BalanceCache {
        async fn on_query(
            &self,
            next: Next<Response>,
            query: Envelope,
            ctx: &DispatchContext,
        ) -> DispatchResult<Response> {
            let Some(account) = query.downcast_ref::<GetBalance>().map(|q| q.account) else {
                return next.run(query, ctx).await;
            };
            if let Some(cached) = self.hits.lock().unwrap().get(account).copied() {
                return Ok(respond(cached));
            }
            let balance: Option<i64> = take_response(next.run(query, ctx).await?, "GetBalance")?;
            self.hits.lock().unwrap().insert(account, balance);
            Ok(respond(balance))
        }
    }

    fn balance_of(account: &'static str) -> GetBalance {
        GetBalance {
            meta: MessageMetadata::new(),
            account,
        }
    }

    fn ledger() -> Ledger {
        Ledger(HashMap::from([("alice", 120), ("bob", -5)]))
    }

    #[tokio::test]
    async fn returns_exactly_the_handler_output() {
        let registry = Arc::new(InMemoryRegistry::new());
        registry.register_query_handler(ledger()).unwrap();
        let fetcher = Fetcher::new(registry);
        let ctx = DispatchContext::new();

        assert_eq!(fetcher.fetch(balance_of("alice"), &ctx).await.unwrap(), Some(120));
        assert_eq!(fetcher.fetch(balance_of("bob"), &ctx).await.unwrap(), Some(-5));
        assert_eq!(fetcher.fetch(balance_of("carol"), &ctx).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_handler_is_reported() {
        let fetcher = Fetcher::new(Arc::new(InMemoryRegistry::new()));
        let err = fetcher
            .fetch(balance_of("alice"), &DispatchContext::new())
            .await
            .unwrap_err();

        let not_found = err.as_not_found().expect("handler not found");
        assert_eq!(not_found.kind, MessageKind::Query);
        assert!(not_found.message.is::<GetBalance>());
    }

    #[tokio::test]
    async fn caching_interceptor_short_circuits() {
        struct CountingLedger(std::sync::atomic::AtomicUsize);

        #[async_trait]
        impl QueryHandler<GetBalance> for CountingLedger {
            async fn handle(
                &self,
                _query: &GetBalance,
                _ctx: &DispatchContext,
            ) -> anyhow::Result<Option<i64>> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(Some(10))
            }
        }

        let registry = Arc::new(InMemoryRegistry::new());
        let counting = Arc::new(CountingLedger(Default::default()));
        registry
            .register_shared_query_handler::<GetBalance>(counting.clone())
            .unwrap();
        registry.add_interceptor_for(MessageKind::Query, BalanceCache::default());

        let fetcher = Fetcher::new(registry);
        let ctx = DispatchContext::new();
        for _ in 0..3 {
            assert_eq!(fetcher.fetch(balance_of("alice"), &ctx).await.unwrap(), Some(10));
        }

        assert_eq!(counting.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
