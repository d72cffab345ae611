//! # Courier: In-Process Typed Dispatch
//!
//! Courier decouples callers from the components that serve them: a
//! caller submits a typed [`Request`] and gets back that request's typed
//! response, or broadcasts a typed [`Notification`] to whoever is
//! listening, without knowing which handler runs or what cross-cutting
//! [`Behavior`]s wrap it.
//!
//! ## Architecture
//!
//! ```text
//! caller ──send(request)──▶ Dispatcher ──▶ ExecutorCache ──▶ PipelineChain
//!                               │              (per-type memo)   B1 ▶ B2 ▶ H
//!                               │
//!        ──publish(note)────────┴──▶ fan-out ──▶ [NotificationHandler; N]
//!                                                 (concurrent, join-all)
//! ```
//!
//! - Handler and behavior bindings live behind the [`RegistryLookup`]
//!   interface; [`HandlerRegistry`] is the bundled map-backed
//!   implementation ([`registry`]).
//! - Behaviors wrap the handler as an onion in registration order; the
//!   composed chain is built once per request type and memoized
//!   ([`dispatch`]).
//! - Notifications fan out to all subscribers concurrently, and `publish`
//!   returns only after every handler completes.
//!
//! ## Cancellation
//!
//! Every handler and behavior call receives a [`CancellationToken`].
//! Cancellation is cooperative: components that observe the token return
//! [`HandlerError::Cancelled`], surfaced to the caller as
//! [`DispatchError::Cancelled`]; the engine never interrupts a component
//! that ignores it. Timeouts are the caller's concern (wrap the token).
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use courier::{
//!     CancellationToken, Dispatcher, Handler, HandlerRegistry, HandlerResult, Request,
//! };
//!
//! struct Greet {
//!     name: String,
//! }
//!
//! impl Request for Greet {
//!     type Response = String;
//! }
//!
//! struct GreetHandler;
//!
//! #[async_trait]
//! impl Handler<Greet> for GreetHandler {
//!     async fn handle(&self, request: Greet, _token: &CancellationToken) -> HandlerResult<String> {
//!         Ok(format!("hello, {}", request.name))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> courier::DispatchResult<()> {
//! let mut registry = HandlerRegistry::new();
//! registry.register_handler::<Greet, _>(GreetHandler);
//!
//! let dispatcher = Dispatcher::new(Arc::new(registry));
//! let greeting = dispatcher
//!     .send(Greet { name: "ada".into() }, &CancellationToken::new())
//!     .await?;
//! assert_eq!(greeting, "hello, ada");
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;

// Re-exports
pub use dispatch::{Dispatcher, ExecutorCache, ExecutorFn, Next, PipelineChain};
pub use error::{BoxError, DispatchError, DispatchResult, HandlerError, HandlerResult};
pub use handler::{Behavior, Handler, NotificationHandler};
pub use message::{NoResponse, Notification, Request};
pub use registry::{HandlerRegistry, RegistryLookup};

pub use tokio_util::sync::CancellationToken;
