//! Subscription wiring against an external delivery runtime.
//!
//! The broker client itself is out of scope; it is consumed behind
//! [`SubscriberClient`] so the composition root owns one shared handle and
//! tests can substitute their own.

use crate::config::{MissingConfig, require_env};
use crate::dispatch::{Acknowledger, Dispatch, DispatchError, FilteredHandler};
use crate::handler::MessageHandler;
use crate::message::RawMessage;

/// Callback bound to one subscription.
pub type SubscriptionCallback =
    Box<dyn Fn(&RawMessage, &dyn Acknowledger) -> Result<Dispatch, DispatchError> + Send + Sync>;

/// The delivery runtime seam: binds callbacks to subscription paths and
/// guarantees at-least-once delivery with ack/nack semantics.
pub trait SubscriberClient {
    fn subscribe(&self, subscription_path: &str, callback: SubscriptionCallback);
}

/// Fully qualified subscription path within a project namespace.
pub fn subscription_path(project: &str, subscription: &str) -> String {
    format!("projects/{project}/subscriptions/{subscription}")
}

impl<H: MessageHandler + 'static> FilteredHandler<H> {
    /// Adapt this handler into the callback shape the runtime expects.
    pub fn into_callback(self) -> SubscriptionCallback {
        Box::new(move |raw, ack| self.dispatch(raw, ack))
    }
}

/// Bind `(subscription name, callback)` pairs under the `GOOGLE_PROJECT`
/// namespace.
pub fn setup_subscriptions<C: SubscriberClient>(
    client: &C,
    subscriptions: Vec<(&str, SubscriptionCallback)>,
) -> Result<(), MissingConfig> {
    let project = require_env("GOOGLE_PROJECT")?;

    for (name, callback) in subscriptions {
        client.subscribe(&subscription_path(&project, name), callback);
    }

    Ok(())
}
