use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::storage::{KeyValueStore, StorageError};

// Durable storage keys
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const ROLE_KEY: &str = "user_role";
pub const PROFILE_KEY: &str = "user_data";

pub const STORAGE_KEYS: [&str; 4] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, ROLE_KEY, PROFILE_KEY];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Admin,
}

impl Role {
    /// Parse a backend role string. Unknown roles (the backend uses
    /// `customer`) are ordinary users.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "guest" => Role::Guest,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The client's credential and profile state.
///
/// A session is authenticated exactly when it holds an access token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub role: Option<Role>,
    pub profile: Option<Value>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn status(&self) -> AuthStatus {
        AuthStatus {
            authenticated: self.is_authenticated(),
            role: self.role,
        }
    }
}

/// What the route guard needs to know about the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub role: Option<Role>,
}

impl AuthStatus {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(role: Role) -> Self {
        Self {
            authenticated: true,
            role: Some(role),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

/// Persists the session across restarts, one storage key per field.
///
/// Reads never fail: an unreadable key is treated as absent, so storage
/// trouble degrades to "not authenticated".
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read session storage, treating as absent");
                None
            }
        }
    }

    fn write(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        match value {
            Some(v) => self.backend.set(key, v),
            None => self.backend.remove(key),
        }
    }

    /// Reconstruct the session snapshot from durable storage
    pub fn get(&self) -> Session {
        let profile = self.read(PROFILE_KEY).and_then(|raw| {
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Null) => None,
                Ok(value) => Some(value),
                Err(e) => {
                    debug!(error = %e, "Stored profile is not valid JSON, ignoring");
                    None
                }
            }
        });

        Session {
            access_token: self.read(ACCESS_TOKEN_KEY),
            refresh_token: self.read(REFRESH_TOKEN_KEY),
            role: self.read(ROLE_KEY).map(|r| Role::parse(&r)),
            profile,
        }
    }

    /// Write every field. Absent fields are removed from storage.
    /// All keys are attempted even if one fails; the first error is returned.
    pub fn set(&self, session: &Session) -> Result<(), StorageError> {
        let profile = session
            .profile
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let results = [
            self.write(ACCESS_TOKEN_KEY, session.access_token.as_deref()),
            self.write(REFRESH_TOKEN_KEY, session.refresh_token.as_deref()),
            self.write(ROLE_KEY, session.role.map(|r| r.as_str())),
            self.write(PROFILE_KEY, profile.as_deref()),
        ];
        results.into_iter().collect()
    }

    pub fn set_access_token(&self, token: &str) -> Result<(), StorageError> {
        self.backend.set(ACCESS_TOKEN_KEY, token)
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<(), StorageError> {
        self.backend.set(REFRESH_TOKEN_KEY, token)
    }

    pub fn set_role(&self, role: Role) -> Result<(), StorageError> {
        self.backend.set(ROLE_KEY, role.as_str())
    }

    pub fn set_profile(&self, profile: &Value) -> Result<(), StorageError> {
        self.backend.set(PROFILE_KEY, &serde_json::to_string(profile)?)
    }

    /// Remove every session key
    pub fn clear(&self) -> Result<(), StorageError> {
        STORAGE_KEYS
            .iter()
            .map(|key| self.backend.remove(key))
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
}
