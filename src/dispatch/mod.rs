//! # Dispatch Core
//!
//! The dispatch core connects three pieces:
//!
//! - [`pipeline`]: composes one handler and its ordered behaviors into a
//!   single invocable chain per request type.
//! - [`cache`]: memoizes the compiled, type-erased invocation path per
//!   concrete request type so repeated dispatches skip resolution and
//!   composition entirely.
//! - [`dispatcher`]: the public entry points, routing requests through
//!   the cache and notifications through the fan-out.
//!
//! ```text
//! send(request) ──▶ ExecutorCache ── hit ──▶ compiled chain ──▶ response
//!                        │ miss
//!                        ▼
//!                  PipelineChain::new(handler, behaviors)
//!
//! publish(notification) ──▶ resolve handlers ──▶ join_all ──▶ ()
//! ```
//!
//! ## Fan-out failure policy
//!
//! `publish` runs every handler to completion, success or failure, before
//! returning. If any failed, the first failure in registration order is
//! surfaced and the rest are discarded. Successful siblings keep their
//! effects; there is no rollback across notification handlers.

pub mod cache;
pub mod dispatcher;
pub(crate) mod fanout;
pub mod pipeline;

pub use cache::{ExecutorCache, ExecutorFn};
pub use dispatcher::Dispatcher;
pub use pipeline::{Next, PipelineChain};
