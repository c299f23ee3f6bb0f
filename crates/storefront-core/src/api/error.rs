use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Credentials or registration data rejected by the backend.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The refresh token could not be exchanged for a new access token.
    /// By the time this is returned the session it belonged to is gone:
    /// cleared by the forced logout, or ended or replaced while the refresh
    /// was in flight.
    #[error("Session expired: {0}")]
    Refresh(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => ApiError::BadRequest(truncated),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Build an `Auth` error from a rejected login/register response.
    ///
    /// The backend answers bad credentials with `{"error": "..."}` and
    /// rejected registrations with per-field error lists; both are surfaced
    /// as-is so the caller can show them.
    pub fn auth_rejected(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    format!("Status {}", status)
                } else {
                    Self::truncate_body(body)
                }
            });
        ApiError::Auth(message)
    }

    /// True when the error means the local session is gone.
    pub fn is_session_lost(&self) -> bool {
        matches!(self, ApiError::Refresh(_) | ApiError::NotAuthenticated)
    }
}
