use serde_json::Value;

/// Identity attached to a request that passed the per-connection gate.
///
/// Inserted as a request extension by the `authorised` middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorisedUser {
    pub connection_id: String,
    pub user_id: Option<Value>,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Identity attached to a request that passed the admin gate.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminUser {
    pub user_id: Option<Value>,
    pub email: Option<String>,
    pub name: Option<String>,
}
