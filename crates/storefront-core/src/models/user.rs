use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::order::Order;
use crate::auth::Role;

/// Typed view of the profile blob returned by `auth/user/`.
///
/// The session keeps the raw JSON; this is only for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub role_display: Option<String>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl UserProfile {
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().map(Role::parse)
    }
}

/// Role carried by a profile blob, if any
pub fn profile_role(profile: &Value) -> Option<Role> {
    profile.get("role").and_then(Value::as_str).map(Role::parse)
}

/// Fields accepted by `auth/register/`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}
