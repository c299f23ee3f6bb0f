//! Authentication session manager - login, registration, logout and profile
//! refresh over the storefront backend.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::session::{AuthStatus, Role, Session, TokenStore};
use crate::api::{endpoints, ApiError, SessionClient};
use crate::config::Config;
use crate::models::{profile_role, Credentials, Registration, UserProfile};
use crate::router::{Navigation, Navigator, LOGIN_LANDING_PATH, LOGIN_PATH, REGISTER_LANDING_PATH};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Shown after the session was ended because the refresh token was rejected
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Sorry, your session has expired or the server was restarted. Please sign in again.";

/// Body of a successful login or registration
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access: String,
    refresh: String,
    #[serde(default)]
    role: Option<String>,
    /// Registration echoes the created user instead of a role
    #[serde(default)]
    user: Option<Value>,
}

impl TokenResponse {
    fn role(&self) -> Option<Role> {
        self.role
            .as_deref()
            .map(Role::parse)
            .or_else(|| self.user.as_ref().and_then(profile_role))
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh tokens
    #[serde(default)]
    refresh: Option<String>,
}

/// Owns the session and every operation that changes it.
pub struct AuthSessionManager {
    config: Config,
    http: Client,
    tokens: TokenStore,
    session: RwLock<Session>,
    navigator: Arc<dyn Navigator>,
    logout_message: Mutex<Option<String>>,
}

impl AuthSessionManager {
    /// Create a manager, restoring any session left in `tokens`
    pub fn new(config: Config, tokens: TokenStore, navigator: Arc<dyn Navigator>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let session = tokens.get();
        debug!(
            authenticated = session.is_authenticated(),
            role = ?session.role,
            "Session restored from storage"
        );

        Ok(Self {
            config,
            http,
            tokens,
            session: RwLock::new(session),
            navigator,
            logout_message: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    // =========================================================================
    // Session state
    // =========================================================================

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    pub fn status(&self) -> AuthStatus {
        self.session.read().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.session.read().is_admin()
    }

    pub fn access_token(&self) -> Option<String> {
        self.session.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.session.read().refresh_token.clone()
    }

    pub fn profile(&self) -> Option<Value> {
        self.session.read().profile.clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.session.read().profile.as_ref().and_then(UserProfile::from_value)
    }

    /// Message left by a forced logout, until cleared
    pub fn logout_message(&self) -> Option<String> {
        self.logout_message.lock().clone()
    }

    pub fn clear_logout_message(&self) {
        *self.logout_message.lock() = None;
    }

    /// Navigate through the route guard with the current session status
    pub fn navigate(&self, path: &str) -> Navigation {
        self.navigator.navigate(path, &self.status())
    }

    // =========================================================================
    // Clients
    // =========================================================================

    /// A client bound to the current access token, if any
    pub fn client(&self) -> SessionClient<'_> {
        SessionClient::new(self, self.access_token())
    }

    /// A client for endpoints that need a signed-in user
    pub fn authenticated_client(&self) -> Result<SessionClient<'_>, ApiError> {
        match self.access_token() {
            Some(token) => Ok(SessionClient::new(self, Some(token))),
            None => Err(ApiError::NotAuthenticated),
        }
    }

    // =========================================================================
    // Login / registration
    // =========================================================================

    pub async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        info!(username = %credentials.username, "Logging in");
        let tokens = self.obtain_tokens(endpoints::LOGIN, credentials).await?;
        self.establish(tokens, LOGIN_LANDING_PATH).await?;
        info!("Login successful");
        Ok(())
    }

    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        info!(username = %registration.username, "Registering");
        let tokens = self.obtain_tokens(endpoints::REGISTER, registration).await?;
        self.establish(tokens, REGISTER_LANDING_PATH).await?;
        info!("Registration successful");
        Ok(())
    }

    async fn obtain_tokens<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<TokenResponse, ApiError> {
        let response = self
            .http
            .post(self.config.endpoint(path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, endpoint = path, "Authentication rejected");
            return Err(ApiError::auth_rejected(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse token response: {}", e)))
    }

    /// Store fresh tokens, load the profile and move to the landing route
    async fn establish(&self, tokens: TokenResponse, landing: &str) -> Result<(), ApiError> {
        let session = Session {
            role: tokens.role(),
            access_token: Some(tokens.access),
            refresh_token: Some(tokens.refresh),
            profile: None,
        };
        *self.session.write() = session.clone();
        if let Err(e) = self.tokens.set(&session) {
            warn!(error = %e, "Failed to persist session");
        }

        let profile: Value = self.client().get_json(endpoints::USER).await?;
        self.store_profile(profile);

        self.navigate(landing);
        Ok(())
    }

    fn store_profile(&self, profile: Value) {
        let derived_role = {
            let mut session = self.session.write();
            let derived = if session.role.is_none() {
                profile_role(&profile)
            } else {
                None
            };
            if derived.is_some() {
                session.role = derived;
            }
            session.profile = Some(profile.clone());
            derived
        };

        if let Some(role) = derived_role {
            debug!(role = %role, "Role taken from profile");
            if let Err(e) = self.tokens.set_role(role) {
                warn!(error = %e, "Failed to persist role");
            }
        }
        if let Err(e) = self.tokens.set_profile(&profile) {
            warn!(error = %e, "Failed to persist profile");
        }
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Reload the cached profile. Failures keep the previous copy.
    pub async fn fetch_user_data(&self) {
        if !self.is_authenticated() {
            return;
        }

        match self.client().get_json::<Value>(endpoints::USER).await {
            Ok(profile) => self.store_profile(profile),
            Err(e) => error!(error = %e, "Failed to load user profile"),
        }
    }

    // =========================================================================
    // Token refresh
    // =========================================================================

    /// Trade the refresh token for a new access token and store it.
    /// Every failure is reported as `ApiError::Refresh`.
    pub(crate) async fn exchange_refresh_token(&self) -> Result<String, ApiError> {
        let refresh = self
            .refresh_token()
            .ok_or_else(|| ApiError::Refresh("No refresh token held".to_string()))?;

        let response = self
            .http
            .post(self.config.endpoint(endpoints::REFRESH))
            .json(&json!({ "refresh": refresh }))
            .send()
            .await
            .map_err(|e| ApiError::Refresh(format!("Refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Refresh(format!("Refresh rejected with status {}", status)));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Refresh(format!("Invalid refresh response: {}", e)))?;

        // Commit only into the session that issued the exchange. A logout or
        // new login while the request was in flight wins. Storage is written
        // under the lock so a concurrent logout cannot interleave with it.
        let mut session = self.session.write();
        if session.refresh_token.as_deref() != Some(refresh.as_str()) {
            debug!("Session changed during token refresh, discarding new token");
            return Err(ApiError::Refresh("Session ended during token refresh".to_string()));
        }

        session.access_token = Some(body.access.clone());
        if let Err(e) = self.tokens.set_access_token(&body.access) {
            warn!(error = %e, "Failed to persist refreshed access token");
        }
        if let Some(rotated) = body.refresh {
            if let Err(e) = self.tokens.set_refresh_token(&rotated) {
                warn!(error = %e, "Failed to persist rotated refresh token");
            }
            session.refresh_token = Some(rotated);
        }
        drop(session);

        info!("Access token refreshed");
        Ok(body.access)
    }

    // =========================================================================
    // Logout
    // =========================================================================

    /// End the session. Never fails: the backend call is best-effort and the
    /// local session is always cleared.
    pub async fn logout(&self, reason: Option<&str>) {
        if let Some(reason) = reason {
            *self.logout_message.lock() = Some(reason.to_string());
        }

        match self.refresh_token() {
            Some(refresh) => {
                if let Err(e) = self.revoke(&refresh).await {
                    warn!(error = %e, "Logout request failed (token may already be invalid)");
                }
            }
            None => debug!("No refresh token to revoke"),
        }

        *self.session.write() = Session::default();
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }

        if self.navigator.current_path() != LOGIN_PATH {
            self.navigate(LOGIN_PATH);
        }
        info!("Logged out");
    }

    async fn revoke(&self, refresh: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.config.endpoint(endpoints::LOGOUT))
            .json(&json!({ "refresh_token": refresh }))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}
