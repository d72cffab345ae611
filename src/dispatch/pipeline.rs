//! Composition of one handler and its ordered behaviors into a single
//! invocable chain.
//!
//! The chain is built once per request type, stays immutable afterwards,
//! and is stored in the executor cache entry, so cache hits never
//! recompose anything. Invocation walks the behaviors outermost-first:
//! behavior 0 is the first registered, and walking past the end invokes
//! the handler. For behaviors B1 and B2 registered in that order around
//! handler H the observable sequence is
//! `B1.pre → B2.pre → H → B2.post → B1.post`.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::HandlerResult;
use crate::handler::{Behavior, Handler};
use crate::message::Request;

/// Immutable handler-plus-behaviors chain for one request type.
pub struct PipelineChain<R: Request> {
    handler: Arc<dyn Handler<R>>,
    behaviors: Vec<Arc<dyn Behavior<R>>>,
}

impl<R: Request> PipelineChain<R> {
    /// Composes `handler` with `behaviors` in execution order (element 0
    /// outermost). With no behaviors the chain is exactly the handler.
    pub fn new(handler: Arc<dyn Handler<R>>, behaviors: Vec<Arc<dyn Behavior<R>>>) -> Self {
        Self { handler, behaviors }
    }

    pub fn behavior_count(&self) -> usize {
        self.behaviors.len()
    }

    /// Runs the full chain for one request instance.
    pub async fn execute(&self, request: R, token: &CancellationToken) -> HandlerResult<R::Response> {
        self.invoke_from(0, request, token).await
    }

    /// Invokes the chain tail starting at `index`; past the last behavior
    /// this is the handler itself. Boxed because the recursion depth is
    /// only known at runtime.
    fn invoke_from<'a>(
        &'a self,
        index: usize,
        request: R,
        token: &'a CancellationToken,
    ) -> BoxFuture<'a, HandlerResult<R::Response>> {
        Box::pin(async move {
            match self.behaviors.get(index) {
                Some(behavior) => {
                    let next = Next {
                        chain: self,
                        index: index + 1,
                    };
                    behavior.handle(request, token, next).await
                }
                None => self.handler.handle(request, token).await,
            }
        })
    }
}

/// Continuation handed to a behavior, bound to the rest of its chain.
///
/// Not calling [`Next::run`] short-circuits the chain; the response the
/// behavior returns is then the dispatch response. `run` borrows rather
/// than consumes, so a behavior holding a cloneable request may invoke
/// the tail more than once.
pub struct Next<'a, R: Request> {
    chain: &'a PipelineChain<R>,
    index: usize,
}

impl<R: Request> Next<'_, R> {
    /// Runs the remainder of the chain with `request`.
    pub async fn run(&self, request: R, token: &CancellationToken) -> HandlerResult<R::Response> {
        self.chain.invoke_from(self.index, request, token).await
    }
}
