//! Storefront core - the client side of an e-commerce backend.
//!
//! The pieces, leaf first:
//! - `auth::TokenStore` keeps tokens, role and profile across restarts
//! - `api::SessionClient` talks to the backend and refreshes expired tokens
//! - `auth::AuthSessionManager` runs login, registration and logout
//! - `router` gates navigation on authentication and role
//! - `cart` and the catalog/order calls are plain state plumbing

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod models;
pub mod router;
pub mod utils;

pub use api::{ApiError, SessionClient};
pub use auth::{AuthSessionManager, AuthStatus, Role, Session, TokenStore};
pub use config::Config;
pub use router::{Navigation, Navigator, Router};
