//! API client for the QR Merchant BCA portal.
//!
//! This module provides the `ApiClient` struct, which owns the HTTP client,
//! its cookie store and the current authentication state.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use cookie_store::CookieStore;
use reqwest::{header, Client, StatusCode, Url};
use reqwest_cookie_store::CookieStoreMutex;
use tracing::{debug, info, warn};

use super::ApiError;
use crate::auth::cookies::{restore_cookies, snapshot_cookies};
use crate::auth::SessionData;
use crate::cipher::encrypt_password;
use crate::config::Config;
use crate::models::{
    LoginRequest, LoginResponse, Transaction, TransactionListResponse, STATUS_SUCCESS,
};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds, applied to every call.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Login page, fetched first so the portal sets its anti-automation cookies
const LOGIN_PAGE_PATH: &str = "/login";

/// Session creation endpoint (nginx proxies /api/* to the backend)
const SESSION_ENDPOINT_PATH: &str = "/api/session/v1.0.0/add";

const TRANSACTION_LIST_PATH: &str = "/api/transaction-v2/v2.0.0/list";

/// Date format accepted by `fetch_transactions`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of the window bounds sent to the transaction endpoint
const WINDOW_BOUND_FORMAT: &str = "%Y-%m-%dT00:00:00Z";

// The portal's bot filter rejects the login POST unless it looks like it came
// from its own web client in Chrome. These values must be sent verbatim.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const BROWSER_SEC_CH_UA: &str = r#""Not_A Brand";v="8", "Chromium";v="120""#;
const BROWSER_SEC_CH_UA_MOBILE: &str = "?0";
const BROWSER_SEC_CH_UA_PLATFORM: &str = r#""Windows""#;
const LOGIN_ACCEPT: &str = "application/json, text/plain, */*";

/// User-Agent the web client sends on data requests
const DATA_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Authentication state of a client.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No token held
    Anonymous,
    /// Token held in memory, cookies in the client's store
    Authenticated { token: String },
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Anonymous => f.write_str("Anonymous"),
            AuthState::Authenticated { .. } => f.write_str("Authenticated"),
        }
    }
}

/// API client for the QR Merchant BCA portal.
///
/// One client per command invocation. The cookie store is mutated in place by
/// every request, so a client is not meant to be shared between callers.
pub struct ApiClient {
    client: Client,
    cookies: Arc<CookieStoreMutex>,
    base_url: String,
    base: Url,
    state: AuthState,
}

impl ApiClient {
    /// Create an anonymous client for the portal at `base_url`
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::with_timeout(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let (base_url, base) = parse_base_url(base_url)?;
        let cookies = Arc::new(CookieStoreMutex::new(CookieStore::default()));

        let client = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            cookies,
            base_url,
            base,
            state: AuthState::Anonymous,
        })
    }

    /// Create a client and resume the session saved at `path`.
    ///
    /// Uses the default request timeout; to honour a configured one, build
    /// the client with `from_config` and call `load_session`.
    pub fn from_session_file(path: &Path) -> Result<Self, ApiError> {
        let data = SessionData::load(path)?;
        let mut client = Self::new(&data.base_url)?;
        client.resume(data)?;
        Ok(client)
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated { .. })
    }

    /// Get the bearer token if logged in
    pub fn token(&self) -> Option<&str> {
        match &self.state {
            AuthState::Authenticated { token } => Some(token.as_str()),
            AuthState::Anonymous => None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn cookie_store(&self) -> MutexGuard<'_, CookieStore> {
        self.cookies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Authentication =====

    /// Log in with email and plaintext password.
    ///
    /// On failure the client is left anonymous.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ApiError> {
        self.state = AuthState::Anonymous;
        info!(base_url = %self.base_url, "Logging in");

        self.prime_cookies().await?;

        let encrypted = encrypt_password(password)?;
        let body = LoginRequest {
            email,
            password: &encrypted,
        };

        let response = self
            .client
            .post(self.endpoint(SESSION_ENDPOINT_PATH))
            .headers(self.login_headers()?)
            .json(&body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;

        let login: LoginResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::Malformed(format!("failed to parse login response: {}", e)))?;

        if !login.is_success() {
            debug!(status = %login.status, "Login rejected");
            return Err(ApiError::Authentication(login.message));
        }
        if login.token.is_empty() {
            return Err(ApiError::Authentication(format!(
                "status was {:?} but no token was returned",
                STATUS_SUCCESS
            )));
        }

        self.state = AuthState::Authenticated { token: login.token };
        info!("Login successful");
        Ok(())
    }

    /// Visit the login page so the portal sets its cookies. Only the cookie
    /// side effect matters; the page itself is ignored.
    async fn prime_cookies(&self) -> Result<(), ApiError> {
        let response = self
            .client
            .get(self.endpoint(LOGIN_PAGE_PATH))
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await?;
        debug!(status = %response.status(), "Visited login page");
        Ok(())
    }

    fn login_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let origin = header::HeaderValue::from_str(&self.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        let referer = header::HeaderValue::from_str(&self.endpoint(LOGIN_PAGE_PATH))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(LOGIN_ACCEPT));
        headers.insert(header::ORIGIN, origin);
        headers.insert(header::REFERER, referer);
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(BROWSER_USER_AGENT),
        );
        headers.insert(
            header::HeaderName::from_static("sec-ch-ua"),
            header::HeaderValue::from_static(BROWSER_SEC_CH_UA),
        );
        headers.insert(
            header::HeaderName::from_static("sec-ch-ua-mobile"),
            header::HeaderValue::from_static(BROWSER_SEC_CH_UA_MOBILE),
        );
        headers.insert(
            header::HeaderName::from_static("sec-ch-ua-platform"),
            header::HeaderValue::from_static(BROWSER_SEC_CH_UA_PLATFORM),
        );
        headers.insert(
            header::HeaderName::from_static("sec-fetch-dest"),
            header::HeaderValue::from_static("empty"),
        );
        headers.insert(
            header::HeaderName::from_static("sec-fetch-mode"),
            header::HeaderValue::from_static("cors"),
        );
        headers.insert(
            header::HeaderName::from_static("sec-fetch-site"),
            header::HeaderValue::from_static("same-origin"),
        );
        Ok(headers)
    }

    /// Drop the in-memory token and cookies. The session file is untouched.
    pub fn logout(&mut self) {
        self.state = AuthState::Anonymous;
        *self.cookie_store() = CookieStore::default();
    }

    // ===== Session persistence =====

    /// Save token, cookies and base URL to `path` (owner-only permissions)
    pub fn save_session(&self, path: &Path) -> Result<(), ApiError> {
        let token = self.token().ok_or(ApiError::NoActiveSession)?;
        let cookies = snapshot_cookies(&self.cookie_store(), &self.base);

        SessionData::new(token.to_string(), cookies, self.base_url.clone()).save(path)?;
        info!(path = %path.display(), "Session saved");
        Ok(())
    }

    /// Resume the session saved at `path` without contacting the portal.
    ///
    /// Expired sessions fail with `SessionExpired`; the file is left intact.
    pub fn load_session(&mut self, path: &Path) -> Result<(), ApiError> {
        let data = SessionData::load(path)?;
        self.resume(data)
    }

    /// Adopt an already-loaded session: its base URL, cookies and token.
    pub fn resume(&mut self, data: SessionData) -> Result<(), ApiError> {
        data.validate()?;
        let (base_url, base) = parse_base_url(&data.base_url)?;

        *self.cookie_store() = restore_cookies(&data.cookies, &base);
        self.base_url = base_url;
        self.base = base;
        self.state = AuthState::Authenticated { token: data.token };

        info!(saved_at = %data.saved_at, "Resumed saved session");
        Ok(())
    }

    // ===== Data Fetching Methods =====

    /// Fetch the transactions for one day, `date` as `YYYY-MM-DD`.
    pub async fn fetch_transactions(&self, date: &str) -> Result<Vec<Transaction>, ApiError> {
        let token = self.token().ok_or(ApiError::NotLoggedIn)?;
        let (start_date, end_date) = transaction_window(date)?;

        debug!(start_date = %start_date, end_date = %end_date, "Fetching transactions");
        let response = self
            .client
            .get(self.endpoint(TRANSACTION_LIST_PATH))
            .query(&[("start_date", &start_date), ("end_date", &end_date)])
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, DATA_USER_AGENT)
            .bearer_auth(token)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let text = response.text().await?;

        let parsed: TransactionListResponse = serde_json::from_str(&text).map_err(|e| {
            ApiError::Malformed(format!("failed to parse transaction response: {}", e))
        })?;

        if let Some(status) = parsed.status.as_deref() {
            if status != STATUS_SUCCESS {
                warn!(
                    status = %status,
                    portal_message = parsed.message.as_deref().unwrap_or(""),
                    count = parsed.transactions.len(),
                    "Transaction list returned non-success status"
                );
            }
        }

        debug!(count = parsed.transactions.len(), "Fetched transactions");
        Ok(parsed.transactions)
    }

    /// Anything but 200 is a transport error carrying the raw body.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status() == StatusCode::OK {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

/// Parse and normalise a base URL (no trailing slash).
fn parse_base_url(base_url: &str) -> Result<(String, Url), ApiError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let base = Url::parse(trimmed)
        .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
    if base.host_str().is_none() {
        return Err(ApiError::InvalidUrl(format!("{}: missing host", base_url)));
    }
    Ok((trimmed.to_string(), base))
}

/// Half-open UTC window `[date, date + 1 day)` for the transaction endpoint.
pub fn transaction_window(date: &str) -> Result<(String, String), ApiError> {
    let start = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|e| ApiError::InvalidDate(format!("{}: {}", date, e)))?;
    // chrono accepts unpadded fields and leading signs or spaces
    if start.format(DATE_FORMAT).to_string() != date {
        return Err(ApiError::InvalidDate(format!("{}: expected YYYY-MM-DD", date)));
    }
    let end = start
        .succ_opt()
        .ok_or_else(|| ApiError::InvalidDate(format!("{}: out of range", date)))?;

    Ok((
        start.format(WINDOW_BOUND_FORMAT).to_string(),
        end.format(WINDOW_BOUND_FORMAT).to_string(),
    ))
}
