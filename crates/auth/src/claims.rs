//! Normalized identity claims decoded from the inbound envelope.
//!
//! Claims are read-only after construction: nothing in this workspace
//! mutates them between request entry and response.

use serde_json::{Map, Value};

/// Namespace prefix the identity provider uses for custom claims.
pub const CLAIM_NAMESPACE: &str = "https://api.fluidly.com";

/// Identity facts asserted by the upstream identity provider.
///
/// This wraps the raw decoded claims object rather than projecting it into a
/// fixed struct: the permission gate forwards the claims verbatim to the
/// remote permission service, which applies its own policy to fields we do
/// not model here.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    raw: Map<String, Value>,
}

impl Claims {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self { raw }
    }

    /// Wrap a JSON value; non-object values become an empty claims set.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self { raw: map },
            _ => Self { raw: Map::new() },
        }
    }

    /// The full raw claims object, exactly as decoded.
    ///
    /// This is what gets forwarded to the permission service (including any
    /// PII the identity provider embedded). Narrowing the forwarded payload
    /// is a policy decision that belongs here if it ever happens.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    fn namespaced(&self, key: &str) -> Option<&Value> {
        self.raw.get(&format!("{CLAIM_NAMESPACE}/{key}"))
    }

    /// Best-effort display email; absence never blocks authorization.
    pub fn email(&self) -> Option<&str> {
        self.namespaced("email").and_then(Value::as_str)
    }

    /// Best-effort display name; absence never blocks authorization.
    pub fn name(&self) -> Option<&str> {
        self.namespaced("name").and_then(Value::as_str)
    }

    /// Application metadata asserted by the identity provider.
    pub fn app_metadata(&self) -> Option<&Map<String, Value>> {
        self.namespaced("app_metadata").and_then(Value::as_object)
    }

    /// Internal metadata asserted by the identity provider.
    pub fn internal_metadata(&self) -> Option<&Map<String, Value>> {
        self.namespaced("internal_metadata").and_then(Value::as_object)
    }

    /// The caller's internal id (`app_metadata.userId`).
    ///
    /// Kept as a raw JSON value: historically this has been both numeric and
    /// opaque-string shaped.
    pub fn user_id(&self) -> Option<&Value> {
        self.app_metadata().and_then(|m| m.get("userId"))
    }

    /// Whether the caller is another internal service
    /// (`internal_metadata.isServiceAccount`). Defaults to false.
    pub fn is_service_account(&self) -> bool {
        self.internal_metadata()
            .and_then(|m| m.get("isServiceAccount"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Claims {
        Claims::from_value(value)
    }

    #[test]
    fn reads_namespaced_display_identity() {
        let c = claims(json!({
            "https://api.fluidly.com/email": "user@example.com",
            "https://api.fluidly.com/name": "A User",
        }));

        assert_eq!(c.email(), Some("user@example.com"));
        assert_eq!(c.name(), Some("A User"));
    }

    #[test]
    fn missing_display_identity_is_none() {
        let c = claims(json!({"sub": "auth0|123"}));
        assert_eq!(c.email(), None);
        assert_eq!(c.name(), None);
    }

    #[test]
    fn user_id_comes_from_app_metadata() {
        let c = claims(json!({
            "https://api.fluidly.com/app_metadata": {"userId": 42},
        }));
        assert_eq!(c.user_id(), Some(&json!(42)));
    }

    #[test]
    fn service_account_flag_defaults_to_false() {
        assert!(!claims(json!({})).is_service_account());

        let c = claims(json!({
            "https://api.fluidly.com/internal_metadata": {"isServiceAccount": true},
        }));
        assert!(c.is_service_account());

        let c = claims(json!({
            "https://api.fluidly.com/internal_metadata": {"isServiceAccount": "yes"},
        }));
        assert!(!c.is_service_account());
    }

    #[test]
    fn non_object_values_become_empty_claims() {
        let c = claims(json!("not an object"));
        assert!(c.raw().is_empty());
    }
}
