//! Authenticated session against an SDDC Manager endpoint
//!
//! The session owns the username/password pair and the current bearer token.
//! Every outgoing request passes through [`Session::prepare_request`], which
//! re-authenticates once the token is older than the refresh threshold, so a
//! poll loop running for hours never starts failing with authorization errors.
//!
//! Each `Session` is an independent value. Two sessions in one process (say,
//! one per appliance) never see each other's tokens.
//!
//! # Example
//!
//! ```rust,ignore
//! use vcfctl_core::Session;
//!
//! let session = Session::builder()
//!     .base_url("https://sddc-manager.example.com")
//!     .username("administrator@vsphere.local")
//!     .password("secret")
//!     .connect()
//!     .await?;
//!
//! let request = session.prepare_request(session.http().get(session.endpoint("/v1/tasks")?)).await?;
//! ```

use crate::error::{CoreError, Result};
use crate::service_error::get_error;
use reqwest::RequestBuilder;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, trace, warn};
use url::Url;

/// Tokens older than this are refreshed before the next request (20 minutes)
pub const DEFAULT_REFRESH_AFTER: Duration = Duration::from_secs(20 * 60);

/// User agent string for vcfctl HTTP requests
const VCFCTL_USER_AGENT: &str = concat!("vcfctl/", env!("CARGO_PKG_VERSION"));

const TOKENS_PATH: &str = "v1/tokens";

/// Principal used to obtain bearer tokens
#[derive(Clone)]
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

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(rename = "accessToken", alias = "access_token")]
    access_token: String,
}

#[derive(Default)]
struct TokenState {
    access_token: Option<String>,
    last_refresh: Option<Instant>,
}

/// Clears the refreshing flag when the refresh ends, however it ends
struct RefreshFlag<'a>(&'a AtomicBool);

impl<'a> RefreshFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RefreshFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Credential session that keeps a bearer token fresh
pub struct Session {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    refresh_after: Duration,
    state: RwLock<TokenState>,
    // Held for the whole token round trip; waiting on it means waiting for
    // the in-flight refresh.
    refresh_lock: Mutex<()>,
    refreshing: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("credentials", &self.credentials)
            .field("refresh_after", &self.refresh_after)
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Underlying HTTP client, for building requests to pass through
    /// [`prepare_request`](Self::prepare_request)
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub fn refresh_after(&self) -> Duration {
        self.refresh_after
    }

    /// Resolve an API path against the base URL, keeping any base path prefix
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// True while a token exchange is in flight
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::SeqCst)
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    /// When the current token was obtained, if ever
    pub async fn last_refresh(&self) -> Option<Instant> {
        self.state.read().await.last_refresh
    }

    async fn is_stale(&self) -> bool {
        match self.state.read().await.last_refresh {
            Some(at) => at.elapsed() > self.refresh_after,
            None => true,
        }
    }

    /// Exchange the credentials for a new bearer token
    ///
    /// On failure the previously held token (if any) stays in place.
    pub async fn authenticate(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Caller must hold `refresh_lock`
    async fn refresh_locked(&self) -> Result<()> {
        let _flag = RefreshFlag::raise(&self.refreshing);
        debug!(
            "Requesting bearer token for {} from {}",
            self.credentials.username, self.base_url
        );

        match self.request_token().await {
            Ok(token) => {
                let mut state = self.state.write().await;
                state.access_token = Some(token);
                state.last_refresh = Some(Instant::now());
                info!("Authenticated as {}", self.credentials.username);
                Ok(())
            }
            Err(e) => {
                warn!("Authentication as {} failed: {}", self.credentials.username, e);
                Err(e)
            }
        }
    }

    async fn request_token(&self) -> Result<String> {
        let url = self.endpoint(TOKENS_PATH)?;
        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&TokenRequest {
                username: &self.credentials.username,
                password: &self.credentials.password,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        trace!("Token endpoint answered {}", status);

        if !status.is_success() {
            return Err(match get_error(&body) {
                Some(error) => CoreError::Api { status, error },
                None => CoreError::UnexpectedResponse { status, body },
            });
        }

        match serde_json::from_str::<TokenResponse>(&body) {
            Ok(parsed) => Ok(parsed.access_token),
            Err(_) => Err(CoreError::UnexpectedResponse { status, body }),
        }
    }

    /// Prepare an outgoing request: refresh a stale token, then attach it
    ///
    /// A request prepared while another caller's refresh is in flight waits
    /// for that refresh instead of starting its own or attaching the token it
    /// is about to replace. If the refresh this call starts fails, the error
    /// is returned and the request must not be sent.
    pub async fn prepare_request(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        if self.is_stale().await {
            match self.refresh_lock.try_lock() {
                Ok(_guard) => {
                    // Someone may have refreshed between the check and the lock
                    if self.is_stale().await {
                        debug!("Bearer token is stale, re-authenticating");
                        self.refresh_locked().await?;
                    }
                }
                Err(_) => {
                    debug!("Waiting for in-flight token refresh");
                    let _wait = self.refresh_lock.lock().await;
                }
            }
        } else if self.is_refreshing() {
            debug!("Waiting for in-flight token refresh");
            let _wait = self.refresh_lock.lock().await;
        }

        let request = request.header(CONTENT_TYPE, "application/json");
        Ok(match self.access_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        })
    }

    #[cfg(test)]
    pub(crate) async fn backdate_refresh(&self, by: Duration) {
        let mut state = self.state.write().await;
        state.last_refresh = state.last_refresh.and_then(|at| at.checked_sub(by));
    }
}

/// Builder for [`Session`]
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    base_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    insecure: bool,
    user_agent: String,
    refresh_after: Duration,
    timeout: Option<Duration>,
    http: Option<reqwest::Client>,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            insecure: false,
            user_agent: VCFCTL_USER_AGENT.to_string(),
            refresh_after: DEFAULT_REFRESH_AFTER,
            timeout: None,
            http: None,
        }
    }
}

impl SessionBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn credentials(self, credentials: Credentials) -> Self {
        self.username(credentials.username).password(credentials.password)
    }

    /// Skip TLS certificate verification (lab endpoints with self-signed certs)
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn refresh_after(mut self, refresh_after: Duration) -> Self {
        self.refresh_after = refresh_after;
        self
    }

    /// Per-request timeout for the underlying HTTP client
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a preconfigured HTTP client; `insecure`, `user_agent` and
    /// `timeout` are then ignored
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn build(self) -> Result<Session> {
        let raw_url = self
            .base_url
            .ok_or_else(|| CoreError::Validation("base URL is required".to_string()))?;
        let username = self
            .username
            .ok_or_else(|| CoreError::Validation("username is required".to_string()))?;
        let password = self
            .password
            .ok_or_else(|| CoreError::Validation("password is required".to_string()))?;

        // `Url::join` only keeps the base path when it ends with a slash
        let mut base_url = Url::parse(&raw_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = match self.http {
            Some(client) => client,
            None => {
                if self.insecure {
                    warn!("TLS certificate verification disabled for {}", base_url);
                }
                let mut builder = reqwest::Client::builder()
                    .user_agent(self.user_agent)
                    .danger_accept_invalid_certs(self.insecure);
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(Session {
            http,
            base_url,
            credentials: Credentials { username, password },
            refresh_after: self.refresh_after,
            state: RwLock::new(TokenState::default()),
            refresh_lock: Mutex::new(()),
            refreshing: AtomicBool::new(false),
        })
    }

    /// Build the session and authenticate immediately
    pub async fn connect(self) -> Result<Session> {
        let session = self.build()?;
        session.authenticate().await?;
        Ok(session)
    }
}
