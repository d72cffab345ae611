//! Handler bindings and the lookup interface the dispatcher consumes.
//!
//! The dispatcher never decides how handlers came to be bound; it only
//! resolves them through [`RegistryLookup`]. [`HandlerRegistry`] is the
//! map-backed implementation for in-process wiring: populate it at
//! startup, then share it behind an `Arc`. Systems with their own
//! component container implement [`RegistryLookup`] on top of it instead.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::handler::{Behavior, Handler, NotificationHandler};
use crate::message::{Notification, Request};

/// Resolution interface between the dispatcher and whatever owns the
/// handler bindings.
///
/// Implementations must uphold the binding rules the dispatcher is built
/// on: at most one handler per request type, behaviors returned in
/// registration order, and notification handlers as a possibly-empty list
/// whose order has no meaning.
pub trait RegistryLookup: Send + Sync + 'static {
    /// The one handler bound to `R`, or `None` if the type is unbound.
    fn resolve_handler<R: Request>(&self) -> Option<Arc<dyn Handler<R>>>;

    /// All behaviors bound to `R`, in registration order.
    fn resolve_behaviors<R: Request>(&self) -> Vec<Arc<dyn Behavior<R>>>;

    /// All notification handlers bound to `N`; empty is valid.
    fn resolve_notification_handlers<N: Notification>(
        &self,
    ) -> Vec<Arc<dyn NotificationHandler<N>>>;
}

/// Bindings are stored type-erased; each entry is an `Arc<dyn Handler<R>>`
/// (or behavior/notification equivalent) boxed as `Any` and recovered by
/// downcast under the `TypeId` key that inserted it.
type ErasedBinding = Box<dyn Any + Send + Sync>;

/// Map-backed handler bindings keyed by request/notification `TypeId`.
///
/// Registration happens before the registry is shared: the mutators take
/// `&mut self`, and dispatch-time resolution is read-only, so no interior
/// locking is needed here. Re-registering a handler for a request type
/// replaces the previous binding.
///
/// ```
/// use std::sync::Arc;
/// use courier::{Dispatcher, HandlerRegistry};
/// # use async_trait::async_trait;
/// # use courier::{CancellationToken, Handler, HandlerResult, Request};
/// # struct Ping;
/// # impl Request for Ping { type Response = String; }
/// # struct PingHandler;
/// # #[async_trait]
/// # impl Handler<Ping> for PingHandler {
/// #     async fn handle(&self, _r: Ping, _t: &CancellationToken) -> HandlerResult<String> {
/// #         Ok("pong".into())
/// #     }
/// # }
///
/// let mut registry = HandlerRegistry::new();
/// registry.register_handler::<Ping, _>(PingHandler);
/// let dispatcher = Dispatcher::new(Arc::new(registry));
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TypeId, ErasedBinding>,
    behaviors: HashMap<TypeId, Vec<ErasedBinding>>,
    subscribers: HashMap<TypeId, Vec<ErasedBinding>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` as the one handler for request type `R`, replacing
    /// any previous binding.
    pub fn register_handler<R, H>(&mut self, handler: H)
    where
        R: Request,
        H: Handler<R> + 'static,
    {
        let erased: Arc<dyn Handler<R>> = Arc::new(handler);
        if self
            .handlers
            .insert(TypeId::of::<R>(), Box::new(erased))
            .is_some()
        {
            debug!(
                request_type = type_name::<R>(),
                "replacing existing handler binding"
            );
        } else {
            debug!(request_type = type_name::<R>(), "handler registered");
        }
    }

    /// Appends `behavior` to the chain for request type `R`. Registration
    /// order is execution order: the first registered behavior runs
    /// outermost.
    pub fn register_behavior<R, B>(&mut self, behavior: B)
    where
        R: Request,
        B: Behavior<R> + 'static,
    {
        let erased: Arc<dyn Behavior<R>> = Arc::new(behavior);
        self.behaviors
            .entry(TypeId::of::<R>())
            .or_default()
            .push(Box::new(erased));
        debug!(request_type = type_name::<R>(), "behavior registered");
    }

    /// Subscribes `handler` to notifications of type `N`.
    pub fn subscribe<N, H>(&mut self, handler: H)
    where
        N: Notification,
        H: NotificationHandler<N> + 'static,
    {
        let erased: Arc<dyn NotificationHandler<N>> = Arc::new(handler);
        self.subscribers
            .entry(TypeId::of::<N>())
            .or_default()
            .push(Box::new(erased));
        debug!(notification_type = type_name::<N>(), "subscriber registered");
    }

    pub fn has_handler<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn subscriber_count<N: Notification>(&self) -> usize {
        self.subscribers
            .get(&TypeId::of::<N>())
            .map_or(0, Vec::len)
    }
}

impl RegistryLookup for HandlerRegistry {
    fn resolve_handler<R: Request>(&self) -> Option<Arc<dyn Handler<R>>> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|erased| erased.downcast_ref::<Arc<dyn Handler<R>>>())
            .cloned()
    }

    fn resolve_behaviors<R: Request>(&self) -> Vec<Arc<dyn Behavior<R>>> {
        self.behaviors
            .get(&TypeId::of::<R>())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|erased| erased.downcast_ref::<Arc<dyn Behavior<R>>>())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn resolve_notification_handlers<N: Notification>(
        &self,
    ) -> Vec<Arc<dyn NotificationHandler<N>>> {
        self.subscribers
            .get(&TypeId::of::<N>())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|erased| {
                        erased.downcast_ref::<Arc<dyn NotificationHandler<N>>>()
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
