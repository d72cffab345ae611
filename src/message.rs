//! Marker traits identifying the values the dispatcher routes.
//!
//! A [`Request`] is a typed operation paired, through its associated
//! `Response` type, with the result its handler produces. A
//! [`Notification`] is a typed event with no result, delivered to any
//! number of subscribed handlers. Both are identified at dispatch time by
//! their concrete `TypeId`, which keys the handler bindings and the
//! executor cache.

/// A typed operation submitted through [`Dispatcher::send`].
///
/// The associated `Response` type is the request's declared contract:
/// dispatching an `R` yields an `R::Response`. Requests are owned values;
/// the engine consumes the request and hands ownership of the response
/// back to the caller.
///
/// Requests that produce no meaningful result use [`NoResponse`] so that
/// both kinds of request share a single dispatch path.
///
/// ```
/// use courier::{NoResponse, Request};
///
/// struct CreateOrder {
///     item: String,
/// }
///
/// impl Request for CreateOrder {
///     type Response = u64; // order id
/// }
///
/// struct FlushQueue;
///
/// impl Request for FlushQueue {
///     type Response = NoResponse;
/// }
/// ```
///
/// [`Dispatcher::send`]: crate::Dispatcher::send
pub trait Request: Send + 'static {
    /// The value a successful dispatch of this request produces.
    type Response: Send + 'static;
}

/// Zero-information response sentinel for requests with no meaningful
/// result.
///
/// Using a unit value instead of a second dispatch path keeps chain
/// construction, caching and error semantics identical for both kinds of
/// request. [`Dispatcher::send_unit`] discards the sentinel for the caller.
///
/// [`Dispatcher::send_unit`]: crate::Dispatcher::send_unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoResponse;

/// A typed event broadcast through [`Dispatcher::publish`].
///
/// Notifications carry no response and are shared by reference with every
/// subscribed handler, which run concurrently. Zero subscribers is valid;
/// publishing is then a no-op.
///
/// [`Dispatcher::publish`]: crate::Dispatcher::publish
pub trait Notification: Send + Sync + 'static {}
