//! Session-bound HTTP client for the storefront backend.
//!
//! A `SessionClient` is built from the `AuthSessionManager` with whatever
//! access token the session holds at that moment. Every request goes through
//! `send`, which implements the refresh-and-retry protocol: a 401 triggers
//! one token refresh and one re-issue of the request; a second 401 is
//! returned to the caller. A failed refresh logs the session out.

use parking_lot::Mutex;
use reqwest::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{AuthSessionManager, SESSION_EXPIRED_MESSAGE};

use super::ApiError;

/// Request payload. Catalog writes go as form fields, everything else as JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// An outbound call, independent of credentials
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::BadRequest(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// A request in flight through the retry protocol.
///
/// `retried` is set before the one permitted re-issue, so a request can be
/// refreshed at most once.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request: ApiRequest,
    pub authorization: Option<String>,
    retried: bool,
}

impl PendingRequest {
    pub fn new(request: ApiRequest, authorization: Option<String>) -> Self {
        Self {
            request,
            authorization,
            retried: false,
        }
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Record a refreshed token for the re-issue. Returns false if the
    /// request was already retried once.
    fn retry_with(&mut self, token: String) -> bool {
        if self.retried {
            return false;
        }
        self.retried = true;
        self.authorization = Some(token);
        true
    }
}

pub struct SessionClient<'a> {
    manager: &'a AuthSessionManager,
    token: Mutex<Option<String>>,
}

impl<'a> SessionClient<'a> {
    pub(crate) fn new(manager: &'a AuthSessionManager, token: Option<String>) -> Self {
        Self {
            manager,
            token: Mutex::new(token),
        }
    }

    /// The access token currently attached to requests
    pub fn access_token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    async fn execute(&self, pending: &PendingRequest) -> Result<Response, ApiError> {
        let request = &pending.request;
        let url = self.manager.config().endpoint(&request.path);

        let mut builder = self.manager.http().request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref token) = pending.authorization {
            builder = builder.bearer_auth(token);
        }
        match request.body {
            Some(RequestBody::Json(ref body)) => builder = builder.json(body),
            Some(RequestBody::Form(ref fields)) => builder = builder.form(fields),
            None => {}
        }

        debug!(method = %request.method, url = %url, retried = pending.is_retried(), "Sending request");
        Ok(builder.send().await?)
    }

    /// Exchange the refresh token, or log the session out if that fails
    async fn refresh(&self) -> Result<String, ApiError> {
        let exchanged = self.manager.refresh_token();
        match self.manager.exchange_refresh_token().await {
            Ok(token) => Ok(token),
            Err(e) if exchanged.is_some() && self.manager.refresh_token() != exchanged => {
                // Logged out or signed in again meanwhile; that session is not ours to end
                debug!(error = %e, "Session replaced during token refresh");
                Err(e)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                self.manager.logout(Some(SESSION_EXPIRED_MESSAGE)).await;
                Err(e)
            }
        }
    }

    /// Send a request, refreshing the access token once on 401
    pub async fn send(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let mut pending = PendingRequest::new(request, self.access_token());

        loop {
            let response = self.execute(&pending).await?;

            if response.status() == StatusCode::UNAUTHORIZED && !pending.is_retried() {
                debug!(path = %pending.request.path, "Unauthorized, refreshing access token");
                let token = self.refresh().await?;
                *self.token.lock() = Some(token.clone());
                pending.retry_with(token);
                continue;
            }

            return Self::check_response(response).await;
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    /// Send a request and decode its JSON body
    pub async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let response = self.send(request).await?;
        Self::parse(response, &path).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(ApiRequest::get(path)).await
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch(ApiRequest::post(path).json(body)?).await
    }

    pub async fn patch_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.fetch(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(ApiRequest::delete(path)).await?;
        Ok(())
    }
}
