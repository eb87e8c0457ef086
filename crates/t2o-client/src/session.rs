//! Session-based client for the vendor portal
//!
//! The client owns the credentials and the single token slot. Every public
//! call goes through [`SessionClient::ensure_session`], which reuses the
//! cached token until it expires and logs in again afterwards. Failures are
//! returned to the caller and also delivered to the error subscriber, which
//! is how the reconnect supervisor learns that the session went bad.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use t2o_core::{
    ApiError, ApiResult, Credentials, ErrorContext, Gate, GateApi, GateId, SharedClock,
    SystemClock, Token,
};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::wire::{
    extract_session_cookie, generate_chaff, GateListResponse, LoginRequest, LoginResponse,
    OpenGateRequest, GATE_LIST_PATH, LOGIN_PATH, LOGIN_TOKEN_HEADER, OPEN_GATE_PATH,
    SESSION_COOKIE,
};

/// Default session lifetime before a proactive re-login (1 hour)
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Receiving end of the error channel handed to the subscriber
pub type ErrorReceiver = mpsc::UnboundedReceiver<ApiError>;

/// Authenticated client for the vendor portal
pub struct SessionClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
    token_ttl: Duration,
    clock: SharedClock,
    /// The one token slot; last successful login wins
    token: RwLock<Option<Token>>,
    /// At most one subscriber receives error events
    error_tx: Mutex<Option<mpsc::UnboundedSender<ApiError>>>,
}

impl SessionClient {
    /// Create a client for the portal at `base_url`
    pub fn new(base_url: &str, credentials: Credentials) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            token_ttl: DEFAULT_TOKEN_TTL,
            clock: std::sync::Arc::new(SystemClock),
            token: RwLock::new(None),
            error_tx: Mutex::new(None),
        }
    }

    /// Set how long a session is reused before logging in again
    pub fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    /// Use `clock` for token expiry
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Return a token that is valid now, logging in if needed
    ///
    /// No network call is made while the cached token has not expired.
    pub async fn ensure_session(&self) -> ApiResult<Token> {
        if let Some(token) = self.current_token().await {
            return Ok(token);
        }

        let token = self.login().await?;
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// The cached token, if one exists and has not expired
    pub async fn current_token(&self) -> Option<Token> {
        let now = self.clock.now();
        self.token
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_valid_at(now))
            .cloned()
    }

    /// List every gate registered to the account
    #[instrument(skip(self))]
    pub async fn list(&self) -> ApiResult<Vec<Gate>> {
        let token = self.ensure_session().await?;

        // The timestamp query defeats intermediary caches
        let url = format!(
            "{}{}?{}",
            self.base_url,
            GATE_LIST_PATH,
            self.clock.now().timestamp_millis()
        );
        let request = Self::authenticated(self.http.get(&url), &token);
        let response = self.send(request, "Failed to list gates").await?;

        let body: GateListResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                let err = ApiError::Protocol(format!("invalid gate list response: {}", e));
                return Err(self.dispatch(err).await);
            }
        };

        debug!(count = body.gates.len(), "Listed gates");
        Ok(body.gates)
    }

    /// Trigger an open pulse on `gate_id`
    #[instrument(skip(self))]
    pub async fn open(&self, gate_id: GateId) -> ApiResult<()> {
        let token = self.ensure_session().await?;

        let url = format!("{}{}", self.base_url, OPEN_GATE_PATH);
        let request = Self::authenticated(self.http.post(&url), &token)
            .json(&OpenGateRequest { gate_id });
        self.send(request, "Failed to open gate").await?;

        info!(gate_id, "Opened gate");
        Ok(())
    }

    /// Drop the cached token; the backend is not notified
    pub async fn logout(&self) {
        if self.token.write().await.take().is_some() {
            debug!("Discarded session token");
        }
    }

    /// Register the error subscriber, replacing any previous one
    pub async fn subscribe(&self) -> ErrorReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.error_tx.lock().await.replace(tx).is_some() {
            debug!("Replaced previous error subscriber");
        }
        rx
    }

    /// Remove the error subscriber
    pub async fn unsubscribe(&self) {
        self.error_tx.lock().await.take();
    }

    async fn login(&self) -> ApiResult<Token> {
        debug!(username = %self.credentials.username, "Logging in");

        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        let body = LoginRequest {
            username: &self.credentials.username,
            password: &self.credentials.password,
            chaff: generate_chaff(),
        };

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                let ctx = ErrorContext::new(format!("Login request failed: {}", e));
                return Err(self.dispatch(ApiError::Transport(ctx)).await);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let ctx = context_for_status("Login failed", status);
            return Err(self.dispatch(ApiError::Auth(ctx)).await);
        }

        let cookie = match extract_session_cookie(response.headers()) {
            Ok(cookie) => cookie,
            Err(e) => return Err(self.dispatch(e).await),
        };

        let login: LoginResponse = match response.json().await {
            Ok(login) => login,
            Err(e) => {
                let err = ApiError::Protocol(format!("invalid login response: {}", e));
                return Err(self.dispatch(err).await);
            }
        };

        // A lifetime past the representable range never expires
        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(self.token_ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        info!(role = %login.role, supervisor = login.supervisor, "Logged in");

        Ok(Token {
            role: login.role,
            login_token: login.login_token,
            supervisor: login.supervisor,
            cookie,
            expires_at,
        })
    }

    fn authenticated(request: RequestBuilder, token: &Token) -> RequestBuilder {
        request
            .header(LOGIN_TOKEN_HEADER, &token.login_token)
            .header(
                reqwest::header::COOKIE,
                format!("{}={}", SESSION_COOKIE, token.cookie),
            )
    }

    /// Send an authenticated request, failing on anything but 2xx
    async fn send(&self, request: RequestBuilder, message: &str) -> ApiResult<Response> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let ctx = ErrorContext::new(format!("{}: {}", message, e));
                return Err(self.dispatch(ApiError::Transport(ctx)).await);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let ctx = context_for_status(message, status);
            return Err(self.dispatch(ApiError::Transport(ctx)).await);
        }

        Ok(response)
    }

    /// Deliver an error to the subscriber and hand it back for returning
    async fn dispatch(&self, error: ApiError) -> ApiError {
        warn!(error = %error, "Session call failed");

        let mut error_tx = self.error_tx.lock().await;
        if let Some(tx) = error_tx.as_ref() {
            if tx.send(error.clone()).is_err() {
                // Receiver is gone; stop trying
                error_tx.take();
            }
        }
        error
    }
}

fn context_for_status(message: &str, status: StatusCode) -> ErrorContext {
    ErrorContext::with_status(message, status.as_u16(), status.canonical_reason())
}

#[async_trait]
impl GateApi for SessionClient {
    async fn list_gates(&self) -> ApiResult<Vec<Gate>> {
        self.list().await
    }

    async fn open_gate(&self, gate_id: GateId) -> ApiResult<()> {
        self.open(gate_id).await
    }
}
