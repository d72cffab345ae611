use std::error::Error;

use thiserror::Error as ThisError;

/// Boxed error type handlers and behaviors use to report domain failures.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Failure produced by a handler or behavior during execution.
///
/// `Cancelled` signals cooperative cancellation: a component that observes
/// the cancellation token should return it promptly instead of finishing
/// its work. Everything else is a `Failure` carrying the component's own
/// error, boxed but otherwise untouched so callers can still downcast to
/// the concrete type.
#[derive(ThisError, Debug)]
pub enum HandlerError {
    #[error("operation cancelled")]
    Cancelled,
    #[error("{0}")]
    Failure(BoxError),
}

impl HandlerError {
    /// Wraps a concrete error without losing its type.
    pub fn failure<E>(source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Failure(Box::new(source))
    }

    /// Ad-hoc failure from a message, for handlers without a dedicated
    /// error type.
    pub fn message(message: impl Into<String>) -> Self {
        Self::Failure(message.into().into())
    }

    /// Returns the original concrete error, if this is a `Failure` of that
    /// type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Failure(source) => source.downcast_ref::<E>(),
            Self::Cancelled => None,
        }
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;

/// Failure surfaced to a dispatch caller.
///
/// The variants keep the three caller-relevant conditions apart: the
/// request never reached a handler (`HandlerNotFound`), a handler ran and
/// failed (`Handler`, original error preserved), or execution observed
/// cancellation (`Cancelled`). Retry and monitoring logic depends on this
/// distinction, so the engine never collapses them.
#[derive(ThisError, Debug)]
pub enum DispatchError {
    /// A type-erased payload did not match the executor it was routed to.
    /// Unreachable through the typed public API; guards the downcast seams
    /// inside the executor cache.
    #[error("invalid request payload: {0}")]
    InvalidRequest(String),

    #[error("no handler registered for request type {request_type}")]
    HandlerNotFound { request_type: &'static str },

    /// A handler or behavior failed. The source error passes through
    /// unmodified and can be recovered with [`DispatchError::downcast_ref`].
    #[error("handler failed: {0}")]
    Handler(HandlerError),

    #[error("dispatch cancelled")]
    Cancelled,
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Cancelled => Self::Cancelled,
            failure => Self::Handler(failure),
        }
    }
}

impl DispatchError {
    /// Returns the concrete error a handler or behavior failed with, if
    /// this is a `Handler` failure of that type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Handler(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
