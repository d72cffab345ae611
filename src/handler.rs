//! Capability traits the dispatcher invokes.
//!
//! [`Handler`] performs the operation for one request type, exactly one
//! per type. [`NotificationHandler`] reacts to one notification type, any
//! number per type. [`Behavior`] wraps the execution of a request in
//! cross-cutting logic (logging, validation, transactions) and decides
//! whether and how to continue the chain through [`Next`].
//!
//! All three run as `Send` async units of work; the hosting runtime may
//! execute them on any worker. Cancellation is cooperative: every call
//! receives the [`CancellationToken`] and is expected to fail promptly
//! with [`HandlerError::Cancelled`] once it observes the signal. The
//! dispatcher never interrupts a component that ignores it.
//!
//! [`HandlerError::Cancelled`]: crate::error::HandlerError::Cancelled

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::dispatch::pipeline::Next;
use crate::error::HandlerResult;
use crate::message::{Notification, Request};

/// Performs the operation for requests of type `R`.
///
/// ```
/// use async_trait::async_trait;
/// use courier::{CancellationToken, Handler, HandlerResult, Request};
///
/// struct Ping;
///
/// impl Request for Ping {
///     type Response = String;
/// }
///
/// struct PingHandler;
///
/// #[async_trait]
/// impl Handler<Ping> for PingHandler {
///     async fn handle(
///         &self,
///         _request: Ping,
///         _token: &CancellationToken,
///     ) -> HandlerResult<String> {
///         Ok("pong".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    async fn handle(&self, request: R, token: &CancellationToken) -> HandlerResult<R::Response>;
}

/// Reacts to notifications of type `N`.
///
/// Handlers for the same notification type run concurrently with respect
/// to each other and share the notification by reference. Their effects
/// are independent: a failing sibling does not roll anything back.
#[async_trait]
pub trait NotificationHandler<N: Notification>: Send + Sync {
    async fn handle(&self, notification: &N, token: &CancellationToken) -> HandlerResult<()>;
}

/// Cross-cutting wrapper around the execution of requests of type `R`.
///
/// Behaviors form an onion around the handler in registration order: the
/// first-registered behavior is outermost. Each receives the owned
/// request and a [`Next`] continuation bound to the rest of the chain. A
/// behavior may inspect or replace the request before forwarding it,
/// transform the response afterwards, short-circuit by never calling the
/// continuation, or replace a failure. In normal use it calls the
/// continuation exactly once; [`Next::run`] takes `&self`, so a behavior
/// holding a cloneable request may also re-run the tail.
///
/// ```
/// use async_trait::async_trait;
/// use courier::{Behavior, CancellationToken, HandlerResult, Next, Request};
///
/// struct Timing;
///
/// #[async_trait]
/// impl<R: Request> Behavior<R> for Timing {
///     async fn handle(
///         &self,
///         request: R,
///         token: &CancellationToken,
///         next: Next<'_, R>,
///     ) -> HandlerResult<R::Response> {
///         let started = std::time::Instant::now();
///         let response = next.run(request, token).await;
///         tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "request done");
///         response
///     }
/// }
/// ```
#[async_trait]
pub trait Behavior<R: Request>: Send + Sync {
    async fn handle(
        &self,
        request: R,
        token: &CancellationToken,
        next: Next<'_, R>,
    ) -> HandlerResult<R::Response>;
}
