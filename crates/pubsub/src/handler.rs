//! Message handler contract.

use thiserror::Error;

use crate::message::Message;

/// What a handler can report back to the dispatcher.
///
/// `Drop` and `UniquenessViolation` carry delivery semantics (see the
/// dispatcher); everything else is an opaque failure left to the transport's
/// redelivery policy.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The message is semantically irrelevant (e.g. it references a resource
    /// that no longer exists). Acknowledged and discarded, never logged as
    /// an error.
    #[error("message dropped: {0}")]
    Drop(String),

    /// An idempotency constraint fired (duplicate insert). The message *was*
    /// handled, just redundantly: it is acknowledged, but the violation is
    /// still surfaced for alerting.
    #[error("uniqueness constraint violated: {0}")]
    UniquenessViolation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn drop(reason: impl Into<String>) -> Self {
        Self::Drop(reason.into())
    }

    pub fn uniqueness_violation(detail: impl Into<String>) -> Self {
        Self::UniquenessViolation(detail.into())
    }
}

/// Business logic invoked for each message that passes the audience filter.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: &Message) -> Result<(), HandlerError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        self(message)
    }
}
