//! Test doubles for subscribers and publishers.
//!
//! Real code, not test-only: downstream services use these in their own
//! suites, so they live in the library like any other module.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use serde_json::Value;

use crate::dispatch::Acknowledger;
use crate::handler::MessageHandler;
use crate::message::{Message, RawMessage};
use crate::publisher::Publisher;

/// Build a decoded message straight from a JSON string.
pub fn message_from_str(payload: &str, attributes: Option<HashMap<String, String>>) -> Message {
    let raw = RawMessage {
        data: payload.as_bytes().to_vec(),
        attributes,
        publish_time: Utc::now(),
    };
    Message::decode(&raw).expect("test payload must be valid JSON")
}

/// Build a decoded message from a JSON value.
pub fn message_from_value(payload: &Value, attributes: Option<HashMap<String, String>>) -> Message {
    message_from_str(&payload.to_string(), attributes)
}

/// Acknowledgement spy.
#[derive(Debug, Default)]
pub struct CountingAck {
    count: AtomicUsize,
}

impl CountingAck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Acknowledger for CountingAck {
    fn ack(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Per-topic record of publish calls.
#[derive(Debug, Default, Clone)]
pub struct TopicSpy {
    pub call_count: usize,
    pub call_list: Vec<String>,
}

/// In-memory publisher that records calls and optionally routes published
/// payloads into registered handlers, short-circuiting the broker.
#[derive(Default)]
pub struct FakePublisher {
    subscriptions: HashMap<String, Box<dyn MessageHandler>>,
    topics_called: Mutex<HashMap<String, TopicSpy>>,
}

impl FakePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route messages published to `topic` into `handler`.
    pub fn with_subscription(
        mut self,
        topic: impl Into<String>,
        handler: impl MessageHandler + 'static,
    ) -> Self {
        self.subscriptions.insert(topic.into(), Box::new(handler));
        self
    }

    pub fn topic_spy(&self, topic: &str) -> TopicSpy {
        self.topics_called
            .lock()
            .expect("topics lock poisoned")
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }
}

impl Publisher for FakePublisher {
    type Error = anyhow::Error;

    fn publish(
        &self,
        topic: &str,
        data: &[u8],
        attributes: &HashMap<String, String>,
    ) -> Result<(), Self::Error> {
        {
            let mut topics = self.topics_called.lock().expect("topics lock poisoned");
            let spy = topics.entry(topic.to_string()).or_default();
            spy.call_count += 1;
            spy.call_list.push(String::from_utf8_lossy(data).into_owned());
        }

        if let Some(handler) = self.subscriptions.get(topic) {
            let raw = RawMessage {
                data: data.to_vec(),
                attributes: Some(attributes.clone()),
                publish_time: Utc::now(),
            };
            let message = Message::decode(&raw)?;
            handler.handle(&message).map_err(anyhow::Error::from)?;
        }

        Ok(())
    }
}
