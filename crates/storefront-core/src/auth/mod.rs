//! Authentication module for managing the storefront session.
//!
//! This module provides:
//! - `TokenStore`: persists tokens, role and profile across restarts
//! - `KeyValueStore` backends: JSON file, OS keychain, in-memory
//! - `AuthSessionManager`: login, registration, logout and token refresh

pub mod manager;
pub mod session;
pub mod storage;

pub use manager::{AuthSessionManager, SESSION_EXPIRED_MESSAGE};
pub use session::{
    AuthStatus, Role, Session, TokenStore, ACCESS_TOKEN_KEY, PROFILE_KEY, REFRESH_TOKEN_KEY,
    ROLE_KEY, STORAGE_KEYS,
};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StorageError};
