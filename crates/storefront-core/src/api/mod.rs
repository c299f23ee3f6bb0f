//! REST API client module for the storefront backend.
//!
//! This module provides the session-bound `SessionClient` used for every
//! backend call, the refresh-and-retry protocol it runs on 401 responses,
//! and the catalog and order operations built on it.
//!
//! The backend uses JWT bearer tokens issued by `auth/login/` and renewed
//! through `auth/refresh/`.

pub mod client;
pub mod endpoints;
pub mod error;
pub mod storefront;

pub use client::{ApiRequest, PendingRequest, RequestBody, SessionClient};
pub use error::ApiError;
