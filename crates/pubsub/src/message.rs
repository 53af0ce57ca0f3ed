//! Inbound message envelope.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::handler::HandlerError;

/// A message as delivered by the transport, before decoding.
///
/// `attributes` may be absent on the wire; it is normalized to an empty map
/// during decode.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub data: Vec<u8>,
    pub attributes: Option<HashMap<String, String>>,
    pub publish_time: DateTime<Utc>,
}

/// A decoded message ready for a handler.
///
/// The payload is decoded eagerly: a message whose body is not valid JSON
/// never reaches a handler.
#[derive(Debug, Clone)]
pub struct Message {
    data: Value,
    attributes: HashMap<String, String>,
    publish_time: DateTime<Utc>,
}

impl Message {
    pub fn decode(raw: &RawMessage) -> Result<Self, serde_json::Error> {
        Ok(Self {
            data: serde_json::from_slice(&raw.data)?,
            attributes: raw.attributes.clone().unwrap_or_default(),
            publish_time: raw.publish_time,
        })
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn publish_time(&self) -> DateTime<Utc> {
        self.publish_time
    }

    /// Look up a payload field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Look up a payload field, treating absence as a drop signal.
    ///
    /// Use this at the handler boundary for fields the message is useless
    /// without; the dispatcher will acknowledge and discard.
    pub fn require(&self, field: &str) -> Result<&Value, HandlerError> {
        self.get(field)
            .ok_or_else(|| HandlerError::drop(format!("missing required field {field}")))
    }

    /// Connection id attribute, when the publisher attached one (logging
    /// only).
    pub fn connection_id(&self) -> Option<&str> {
        self.attributes.get("connection_id").map(String::as_str)
    }

    /// Time since publish. Observability only, never policy.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.publish_time
    }
}
