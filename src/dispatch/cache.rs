//! Memoization of compiled executors per request type.
//!
//! Resolving a handler, resolving its behaviors and composing the chain
//! happens once per concrete request type; afterwards every dispatch of
//! that type reuses the cached executor. The cache is created once at
//! startup, handed to the dispatcher, and lives for the process: the
//! universe of request types is static per build, so entries are never
//! evicted and cardinality is bounded by the number of distinct types
//! dispatched.
//!
//! Building an entry has no observable side effect and entries for the
//! same key are interchangeable, so concurrent first-time dispatches may
//! build redundantly but always converge on one stored executor.

use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::dispatch::pipeline::PipelineChain;
use crate::error::{DispatchError, DispatchResult};
use crate::message::Request;
use crate::registry::RegistryLookup;

/// Request value with its concrete type erased for cache storage.
pub type ErasedRequest = Box<dyn Any + Send>;

/// Response value produced by an erased executor.
pub type ErasedResponse = Box<dyn Any + Send>;

/// Compiled invocation path for one request type: downcast the payload,
/// run the chain, erase the response.
pub type ExecutorFn = Box<
    dyn Fn(ErasedRequest, CancellationToken) -> BoxFuture<'static, DispatchResult<ErasedResponse>>
        + Send
        + Sync,
>;

/// Process-wide executor memo, safe for concurrent read and insert.
pub struct ExecutorCache {
    executors: DashMap<TypeId, Arc<ExecutorFn>>,
}

impl ExecutorCache {
    pub fn new() -> Self {
        Self {
            executors: DashMap::new(),
        }
    }

    /// Number of request types with a compiled executor.
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    pub fn contains<R: Request>(&self) -> bool {
        self.executors.contains_key(&TypeId::of::<R>())
    }

    /// Returns the executor for `R`, building and inserting it on first
    /// use.
    ///
    /// The build runs outside any map lock; two callers racing on the
    /// same cold type both build, the entry that lands first stays, and
    /// the redundant executor is dropped. Resolution failures are
    /// returned, not cached, so a later registration of `R` under a
    /// different lookup still gets a fresh attempt.
    pub fn get_or_build<R, L>(&self, lookup: &L) -> DispatchResult<Arc<ExecutorFn>>
    where
        R: Request,
        L: RegistryLookup,
    {
        let key = TypeId::of::<R>();
        if let Some(executor) = self.executors.get(&key) {
            trace!(request_type = type_name::<R>(), "executor cache hit");
            return Ok(executor.clone());
        }

        debug!(request_type = type_name::<R>(), "compiling executor");
        let built = Arc::new(build_executor::<R, L>(lookup)?);
        Ok(self.executors.entry(key).or_insert(built).clone())
    }
}

impl Default for ExecutorCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the bindings for `R` and compiles them into a type-erased
/// executor. Fails fast with `HandlerNotFound` before anything runs.
fn build_executor<R, L>(lookup: &L) -> DispatchResult<ExecutorFn>
where
    R: Request,
    L: RegistryLookup,
{
    let handler = lookup
        .resolve_handler::<R>()
        .ok_or(DispatchError::HandlerNotFound {
            request_type: type_name::<R>(),
        })?;
    let behaviors = lookup.resolve_behaviors::<R>();
    let chain = Arc::new(PipelineChain::new(handler, behaviors));

    Ok(Box::new(move |request: ErasedRequest, token: CancellationToken| {
        let chain = Arc::clone(&chain);
        Box::pin(async move {
            let request = request.downcast::<R>().map_err(|_| {
                DispatchError::InvalidRequest(format!(
                    "payload is not a {}",
                    type_name::<R>()
                ))
            })?;
            let response = chain.execute(*request, &token).await?;
            Ok(Box::new(response) as ErasedResponse)
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::handler::Handler;
    use crate::registry::HandlerRegistry;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Double(u64);

    impl Request for Double {
        type Response = u64;
    }

    struct DoubleHandler;

    #[async_trait]
    impl Handler<Double> for DoubleHandler {
        async fn handle(&self, request: Double, _token: &CancellationToken) -> HandlerResult<u64> {
            Ok(request.0 * 2)
        }
    }

    /// Lookup wrapper that counts handler resolutions.
    struct CountingLookup {
        inner: HandlerRegistry,
        resolutions: AtomicUsize,
    }

    impl RegistryLookup for CountingLookup {
        fn resolve_handler<R: Request>(&self) -> Option<Arc<dyn Handler<R>>> {
            self.resolutions.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve_handler::<R>()
        }

        fn resolve_behaviors<R: Request>(&self) -> Vec<Arc<dyn crate::handler::Behavior<R>>> {
            self.inner.resolve_behaviors::<R>()
        }

        fn resolve_notification_handlers<N: crate::message::Notification>(
            &self,
        ) -> Vec<Arc<dyn crate::handler::NotificationHandler<N>>> {
            self.inner.resolve_notification_handlers::<N>()
        }
    }

    fn counting_lookup() -> CountingLookup {
        let mut registry = HandlerRegistry::new();
        registry.register_handler::<Double, _>(DoubleHandler);
        CountingLookup {
            inner: registry,
            resolutions: AtomicUsize::new(0),
        }
    }

    async fn run(executor: &ExecutorFn, value: u64) -> u64 {
        let response = executor(Box::new(Double(value)), CancellationToken::new())
            .await
            .unwrap();
        *response.downcast::<u64>().unwrap()
    }

    #[tokio::test]
    async fn second_lookup_is_a_cache_hit() {
        let cache = ExecutorCache::new();
        let lookup = counting_lookup();

        let first = cache.get_or_build::<Double, _>(&lookup).unwrap();
        assert_eq!(run(&first, 3).await, 6);

        let second = cache.get_or_build::<Double, _>(&lookup).unwrap();
        assert_eq!(run(&second, 5).await, 10);

        assert_eq!(lookup.resolutions.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains::<Double>());
    }

    #[tokio::test]
    async fn missing_binding_fails_and_is_not_cached() {
        struct Unbound;

        impl Request for Unbound {
            type Response = ();
        }

        let cache = ExecutorCache::new();
        let lookup = counting_lookup();

        let err = cache.get_or_build::<Unbound, _>(&lookup).err().unwrap();
        assert!(matches!(
            err,
            DispatchError::HandlerNotFound { request_type } if request_type.contains("Unbound")
        ));
        assert!(cache.is_empty());

        // A second attempt resolves again rather than replaying a cached
        // failure.
        let _ = cache.get_or_build::<Unbound, _>(&lookup).err().unwrap();
        assert_eq!(lookup.resolutions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_cold_dispatches_converge_on_one_entry() {
        let cache = Arc::new(ExecutorCache::new());
        let lookup = Arc::new(counting_lookup());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let cache = cache.clone();
                let lookup = lookup.clone();
                tokio::spawn(async move {
                    let executor = cache.get_or_build::<Double, _>(lookup.as_ref()).unwrap();
                    run(&executor, i).await
                })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            assert_eq!(task.await.unwrap(), i as u64 * 2);
        }

        assert_eq!(cache.len(), 1);
        // Redundant builds are bounded by the number of racers.
        let resolutions = lookup.resolutions.load(Ordering::SeqCst);
        assert!((1..=16).contains(&resolutions));
    }
}
