//! Audience filtering and per-message dispatch.
//!
//! One physical topic fans out to several logical subscribers; each service
//! wraps its handlers in an [`AudienceFilter`] once at subscription setup so
//! messages meant for other services are acknowledged and discarded without
//! each handler doing its own filtering.

use chrono::Utc;
use fluidly_observability::timing::Stopwatch;
use thiserror::Error;

use crate::config::{MissingConfig, require_env};
use crate::handler::{HandlerError, MessageHandler};
use crate::message::{Message, RawMessage};

/// Acknowledgement handle supplied by the delivery runtime per message.
///
/// An unacknowledged message is redelivered by the transport (at-least-once
/// delivery); acknowledging before surfacing an error is how "handled but
/// exceptional" is expressed.
pub trait Acknowledger {
    fn ack(&self);
}

/// Why a message never reached (or was refused by) the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The audience attribute named other services only.
    WrongAudience,
    /// The handler raised the drop signal.
    Dropped,
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Discarded(DiscardReason),
}

/// Dispatch failures. Whether the message was acknowledged differs per
/// variant; the transport's redelivery policy governs the rest.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Payload was not valid JSON. Not acknowledged.
    #[error("malformed message payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Idempotency violation: acknowledged *and* surfaced, so the anomaly is
    /// observable without redelivering a message that would deterministically
    /// fail again.
    #[error("duplicate message delivery: {0}")]
    Duplicate(String),

    /// Handler failure. Not acknowledged; the transport will redeliver.
    #[error("message handling failed")]
    Handler(#[source] anyhow::Error),
}

/// This service's audience identity.
#[derive(Debug, Clone)]
pub struct AudienceFilter {
    application_name: String,
}

impl AudienceFilter {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
        }
    }

    /// Read the service's own identity name from `APPLICATION_NAME`.
    pub fn from_env() -> Result<Self, MissingConfig> {
        Ok(Self::new(require_env("APPLICATION_NAME")?))
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Wrap a handler for a subscription. Applied once at setup time, not
    /// per message.
    pub fn wrap<H: MessageHandler>(&self, handler: H) -> FilteredHandler<H> {
        FilteredHandler {
            filter: self.clone(),
            handler,
        }
    }
}

/// A handler bound to an audience filter, ready to receive deliveries.
pub struct FilteredHandler<H> {
    filter: AudienceFilter,
    handler: H,
}

impl<H: MessageHandler> FilteredHandler<H> {
    /// Run one message through the filter and handler.
    ///
    /// State machine, in order: decode (malformed JSON propagates without
    /// ack), audience check (foreign audience is acked and discarded),
    /// dispatch (ack on success and on drop; ack-and-surface on uniqueness
    /// violation; propagate unacked otherwise).
    pub fn dispatch(
        &self,
        raw: &RawMessage,
        ack: &dyn Acknowledger,
    ) -> Result<Dispatch, DispatchError> {
        let watch = Stopwatch::start();

        let message = Message::decode(raw)?;

        if let Some(audience) = message.attributes().get("audience") {
            if !audience.is_empty() && !audience.contains(self.filter.application_name()) {
                ack.ack();
                return Ok(Dispatch::Discarded(DiscardReason::WrongAudience));
            }
        }

        let message_age = message.age(Utc::now()).num_milliseconds() as f64 / 1000.0;
        let connection_id = message.connection_id().map(str::to_owned);

        match self.handler.handle(&message) {
            Ok(()) => {
                ack.ack();
                tracing::info!(
                    duration = watch.elapsed_secs(),
                    success = true,
                    connection_id,
                    "pubsub_message_processed",
                );
                Ok(Dispatch::Handled)
            }
            Err(HandlerError::Drop(reason)) => {
                ack.ack();
                tracing::debug!(reason, connection_id, "pubsub_message_dropped");
                Ok(Dispatch::Discarded(DiscardReason::Dropped))
            }
            Err(HandlerError::UniquenessViolation(detail)) => {
                ack.ack();
                tracing::warn!(
                    duration = watch.elapsed_secs(),
                    connection_id,
                    detail,
                    "pubsub_message_duplicate",
                );
                Err(DispatchError::Duplicate(detail))
            }
            Err(HandlerError::Other(error)) => {
                tracing::error!(
                    duration = watch.elapsed_secs(),
                    success = false,
                    message = %message.data(),
                    message_age,
                    attributes = ?message.attributes(),
                    connection_id,
                    error = %error,
                    "pubsub_message_processed",
                );
                Err(DispatchError::Handler(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::CountingAck;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn raw_with_attributes(attributes: &[(&str, &str)]) -> RawMessage {
        RawMessage {
            data: br#"{"connection_id": "test:123"}"#.to_vec(),
            attributes: Some(
                attributes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<HashMap<_, _>>(),
            ),
            publish_time: Utc::now(),
        }
    }

    fn counting_handler() -> (Arc<AtomicUsize>, impl MessageHandler) {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_handler = calls.clone();
        let handler = move |_message: &Message| {
            calls_in_handler.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        (calls, handler)
    }

    #[test]
    fn wrong_audience_is_acked_and_discarded() {
        let (calls, handler) = counting_handler();
        let wrapped = AudienceFilter::new("python-shared").wrap(handler);
        let ack = CountingAck::new();

        let outcome = wrapped
            .dispatch(
                &raw_with_attributes(&[("audience", "random_service")]),
                &ack,
            )
            .unwrap();

        assert_eq!(outcome, Dispatch::Discarded(DiscardReason::WrongAudience));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(ack.count(), 1);
    }

    #[test]
    fn own_audience_reaches_the_handler() {
        let (calls, handler) = counting_handler();
        let wrapped = AudienceFilter::new("python-shared").wrap(handler);
        let ack = CountingAck::new();

        let outcome = wrapped
            .dispatch(&raw_with_attributes(&[("audience", "python-shared")]), &ack)
            .unwrap();

        assert_eq!(outcome, Dispatch::Handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn absent_audience_reaches_the_handler() {
        let (calls, handler) = counting_handler();
        let wrapped = AudienceFilter::new("python-shared").wrap(handler);
        let ack = CountingAck::new();

        let outcome = wrapped
            .dispatch(&raw_with_attributes(&[("connection_id", "qbo:123")]), &ack)
            .unwrap();

        assert_eq!(outcome, Dispatch::Handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_audience_reaches_the_handler() {
        let (calls, handler) = counting_handler();
        let wrapped = AudienceFilter::new("python-shared").wrap(handler);
        let ack = CountingAck::new();

        let outcome = wrapped
            .dispatch(&raw_with_attributes(&[("audience", "")]), &ack)
            .unwrap();

        assert_eq!(outcome, Dispatch::Handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_signal_is_acked_and_swallowed() {
        let handler =
            |_message: &Message| -> Result<(), HandlerError> { Err(HandlerError::drop("gone")) };
        let wrapped = AudienceFilter::new("python-shared").wrap(handler);
        let ack = CountingAck::new();

        let outcome = wrapped.dispatch(&raw_with_attributes(&[]), &ack).unwrap();

        assert_eq!(outcome, Dispatch::Discarded(DiscardReason::Dropped));
        assert_eq!(ack.count(), 1);
    }

    #[test]
    fn uniqueness_violation_is_acked_and_surfaced() {
        let handler = |_message: &Message| -> Result<(), HandlerError> {
            Err(HandlerError::uniqueness_violation("duplicate insert"))
        };
        let wrapped = AudienceFilter::new("python-shared").wrap(handler);
        let ack = CountingAck::new();

        let err = wrapped
            .dispatch(&raw_with_attributes(&[]), &ack)
            .unwrap_err();

        assert!(matches!(err, DispatchError::Duplicate(_)));
        assert_eq!(ack.count(), 1);
    }

    #[test]
    fn handler_failure_propagates_unacknowledged() {
        let handler =
            |_message: &Message| -> Result<(), HandlerError> { Err(anyhow!("boom").into()) };
        let wrapped = AudienceFilter::new("python-shared").wrap(handler);
        let ack = CountingAck::new();

        let err = wrapped
            .dispatch(&raw_with_attributes(&[]), &ack)
            .unwrap_err();

        assert!(matches!(err, DispatchError::Handler(_)));
        assert_eq!(ack.count(), 0);
    }

    #[test]
    fn malformed_payload_propagates_unacknowledged() {
        let (calls, handler) = counting_handler();
        let wrapped = AudienceFilter::new("python-shared").wrap(handler);
        let ack = CountingAck::new();

        let raw = RawMessage {
            data: b"{not json".to_vec(),
            attributes: None,
            publish_time: Utc::now(),
        };
        let err = wrapped.dispatch(&raw, &ack).unwrap_err();

        assert!(matches!(err, DispatchError::Decode(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(ack.count(), 0);
    }

    #[test]
    fn handled_exactly_once_without_audience_attribute() {
        let (calls, handler) = counting_handler();
        let wrapped = AudienceFilter::new("python-shared").wrap(handler);
        let ack = CountingAck::new();

        let raw = RawMessage {
            data: br#"{"connection_id": "test:123"}"#.to_vec(),
            attributes: None,
            publish_time: Utc::now(),
        };
        let outcome = wrapped.dispatch(&raw, &ack).unwrap();

        assert_eq!(outcome, Dispatch::Handled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
