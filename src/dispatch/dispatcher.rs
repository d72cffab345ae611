//! Public dispatch entry points.

use std::any::type_name;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::dispatch::cache::ExecutorCache;
use crate::dispatch::fanout;
use crate::error::{DispatchError, DispatchResult};
use crate::message::{NoResponse, Notification, Request};
use crate::registry::RegistryLookup;

/// Routes typed requests to their handler-plus-behavior chain and
/// broadcasts notifications to their subscribers.
///
/// The dispatcher owns nothing mutable itself: bindings come from the
/// lookup service it was constructed with, and compiled executors live in
/// the injected [`ExecutorCache`]. Cloning is cheap and every clone
/// shares both, so a single cache serves all callers for the process
/// lifetime.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use courier::{CancellationToken, Dispatcher, HandlerRegistry};
/// # async fn example(registry: HandlerRegistry) -> courier::DispatchResult<()> {
/// # #[derive(Debug)] struct CreateOrder;
/// # impl courier::Request for CreateOrder { type Response = u64; }
/// let dispatcher = Dispatcher::new(Arc::new(registry));
/// let token = CancellationToken::new();
///
/// let order_id: u64 = dispatcher.send(CreateOrder, &token).await?;
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher<L: RegistryLookup> {
    lookup: Arc<L>,
    cache: Arc<ExecutorCache>,
}

impl<L: RegistryLookup> Clone for Dispatcher<L> {
    fn clone(&self) -> Self {
        Self {
            lookup: self.lookup.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<L: RegistryLookup> Dispatcher<L> {
    /// Creates a dispatcher with its own fresh executor cache.
    pub fn new(lookup: Arc<L>) -> Self {
        Self::with_cache(lookup, Arc::new(ExecutorCache::new()))
    }

    /// Creates a dispatcher around an existing cache, for hosts that wire
    /// the cache lifecycle themselves.
    pub fn with_cache(lookup: Arc<L>, cache: Arc<ExecutorCache>) -> Self {
        Self { lookup, cache }
    }

    pub fn cache(&self) -> &Arc<ExecutorCache> {
        &self.cache
    }

    /// Dispatches `request` through its behavior chain and handler,
    /// suspending until the full chain completes.
    ///
    /// # Errors
    ///
    /// * [`DispatchError::HandlerNotFound`] — no handler bound for the
    ///   request's concrete type; raised before anything runs.
    /// * [`DispatchError::Handler`] — a behavior or the handler failed;
    ///   the original error passes through unmodified.
    /// * [`DispatchError::Cancelled`] — a component observed the token.
    #[instrument(skip(self, request, token), fields(request_type = type_name::<R>()), level = "debug")]
    pub async fn send<R: Request>(
        &self,
        request: R,
        token: &CancellationToken,
    ) -> DispatchResult<R::Response> {
        let executor = self.cache.get_or_build::<R, L>(self.lookup.as_ref())?;
        let response = (*executor)(Box::new(request), token.clone()).await?;
        response
            .downcast::<R::Response>()
            .map(|response| *response)
            .map_err(|_| {
                DispatchError::InvalidRequest(format!(
                    "response is not a {}",
                    type_name::<R::Response>()
                ))
            })
    }

    /// Dispatches a request with no meaningful result through the same
    /// path as [`send`](Self::send), discarding the [`NoResponse`]
    /// sentinel.
    pub async fn send_unit<R>(
        &self,
        request: R,
        token: &CancellationToken,
    ) -> DispatchResult<()>
    where
        R: Request<Response = NoResponse>,
    {
        self.send(request, token).await.map(|_| ())
    }

    /// Broadcasts `notification` to every subscribed handler, suspending
    /// until all of them complete. Zero subscribers is a successful
    /// no-op. See the fan-out failure policy on
    /// [`DispatchError::Handler`] surfacing in the module docs of
    /// [`crate::dispatch`].
    #[instrument(skip(self, notification, token), fields(notification_type = type_name::<N>()), level = "debug")]
    pub async fn publish<N: Notification>(
        &self,
        notification: N,
        token: &CancellationToken,
    ) -> DispatchResult<()> {
        fanout::fan_out(self.lookup.as_ref(), &notification, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HandlerError, HandlerResult};
    use crate::handler::{Behavior, Handler};
    use crate::registry::HandlerRegistry;
    use crate::Next;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thiserror::Error;

    struct Add(u64, u64);

    impl Request for Add {
        type Response = u64;
    }

    struct AddHandler;

    #[async_trait]
    impl Handler<Add> for AddHandler {
        async fn handle(&self, request: Add, _token: &CancellationToken) -> HandlerResult<u64> {
            Ok(request.0 + request.1)
        }
    }

    struct Audit;

    impl Request for Audit {
        type Response = NoResponse;
    }

    struct AuditHandler {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Handler<Audit> for AuditHandler {
        async fn handle(
            &self,
            _request: Audit,
            token: &CancellationToken,
        ) -> HandlerResult<NoResponse> {
            if token.is_cancelled() {
                return Err(HandlerError::Cancelled);
            }
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(NoResponse)
        }
    }

    struct CountingBehavior {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Behavior<Audit> for CountingBehavior {
        async fn handle(
            &self,
            request: Audit,
            token: &CancellationToken,
            next: Next<'_, Audit>,
        ) -> HandlerResult<NoResponse> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            next.run(request, token).await
        }
    }

    #[derive(Error, Debug, PartialEq)]
    #[error("insufficient funds")]
    struct InsufficientFunds;

    #[tokio::test]
    async fn send_returns_the_handler_result() {
        let mut registry = HandlerRegistry::new();
        registry.register_handler::<Add, _>(AddHandler);
        let dispatcher = Dispatcher::new(Arc::new(registry));

        let sum = dispatcher
            .send(Add(2, 3), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(sum, 5);
    }

    #[tokio::test]
    async fn unbound_type_fails_with_handler_not_found() {
        let dispatcher = Dispatcher::new(Arc::new(HandlerRegistry::new()));

        let err = dispatcher
            .send(Add(1, 1), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::HandlerNotFound { .. }));
        assert!(dispatcher.cache().is_empty());
    }

    #[tokio::test]
    async fn send_unit_runs_the_full_chain() {
        let handler_runs = Arc::new(AtomicUsize::new(0));
        let behavior_runs = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register_handler::<Audit, _>(AuditHandler {
            runs: handler_runs.clone(),
        });
        registry.register_behavior::<Audit, _>(CountingBehavior {
            runs: behavior_runs.clone(),
        });
        let dispatcher = Dispatcher::new(Arc::new(registry));

        dispatcher
            .send_unit(Audit, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(handler_runs.load(Ordering::SeqCst), 1);
        assert_eq!(behavior_runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_token_surfaces_as_cancelled() {
        let mut registry = HandlerRegistry::new();
        registry.register_handler::<Audit, _>(AuditHandler {
            runs: Arc::new(AtomicUsize::new(0)),
        });
        let dispatcher = Dispatcher::new(Arc::new(registry));

        let token = CancellationToken::new();
        token.cancel();
        let err = dispatcher.send_unit(Audit, &token).await.unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled));
    }

    #[tokio::test]
    async fn handler_errors_keep_their_concrete_type() {
        struct Withdraw;

        impl Request for Withdraw {
            type Response = u64;
        }

        struct WithdrawHandler;

        #[async_trait]
        impl Handler<Withdraw> for WithdrawHandler {
            async fn handle(
                &self,
                _request: Withdraw,
                _token: &CancellationToken,
            ) -> HandlerResult<u64> {
                Err(HandlerError::failure(InsufficientFunds))
            }
        }

        let mut registry = HandlerRegistry::new();
        registry.register_handler::<Withdraw, _>(WithdrawHandler);
        let dispatcher = Dispatcher::new(Arc::new(registry));

        let err = dispatcher
            .send(Withdraw, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<InsufficientFunds>(),
            Some(&InsufficientFunds)
        );
    }

    #[tokio::test]
    async fn clones_share_the_executor_cache() {
        let mut registry = HandlerRegistry::new();
        registry.register_handler::<Add, _>(AddHandler);
        let dispatcher = Dispatcher::new(Arc::new(registry));
        let clone = dispatcher.clone();

        dispatcher
            .send(Add(1, 2), &CancellationToken::new())
            .await
            .unwrap();
        assert!(clone.cache().contains::<Add>());
    }
}
