//! `fluidly-pubsub` — audience-filtered message delivery.
//!
//! Messages arrive from an at-least-once delivery runtime; this crate
//! decodes them, filters by intended audience, and hands them to business
//! handlers with defined semantics for dropping, surfacing duplicates, and
//! failing hard. The broker client itself lives behind trait seams.

pub mod config;
pub mod dispatch;
pub mod handler;
pub mod message;
pub mod publisher;
pub mod subscriber;
pub mod testkit;

pub use config::MissingConfig;
pub use dispatch::{Acknowledger, AudienceFilter, Dispatch, DispatchError, DiscardReason, FilteredHandler};
pub use handler::{HandlerError, MessageHandler};
pub use message::{Message, RawMessage};
pub use publisher::{Publisher, topic_path};
pub use subscriber::{SubscriberClient, SubscriptionCallback, setup_subscriptions, subscription_path};
