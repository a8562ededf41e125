use crate::{REQUEST_TIMEOUT_SECS, TOKEN_URL, USER_AGENT};
use chrono::{Duration as ChronoDuration, Utc};
use redwatch_core::{AuthError, CoreError, Credentials, Token};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Refresh this long before the reported expiry so a token never goes
/// stale mid-cycle.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

/// Result of a standalone credential test, for the configuration
/// surface. Never touches the pipeline's cached token.
#[derive(Debug, Clone)]
pub struct CredentialCheck {
    pub success: bool,
    pub error: Option<String>,
}

/// Owns the access token lifecycle. The only component that ever
/// writes a token: tokens are created by a successful exchange,
/// cleared on a rejected one or on a 401 from a fetch, never mutated
/// in place.
#[derive(Debug)]
pub struct TokenManager {
    http: Client,
    credentials: Credentials,
    cached: Mutex<Option<Token>>,
}

impl TokenManager {
    pub fn new(credentials: Credentials) -> Result<Self, CoreError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            credentials,
            cached: Mutex::new(None),
        })
    }

    /// Seed the cache from persisted state at startup. An already
    /// expired token is discarded rather than carried.
    pub fn with_cached_token(mut self, token: Option<Token>) -> Self {
        self.cached = Mutex::new(token.filter(|t| t.is_usable()));
        self
    }

    /// Returns a usable token, exchanging credentials only when the
    /// cache is empty or expired. The fast path makes no network call.
    pub async fn get_valid_token(&self) -> Result<Token, CoreError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            let margin = Utc::now() + ChronoDuration::seconds(REFRESH_MARGIN_SECS);
            if token.is_usable_at(margin) {
                debug!("reusing cached access token");
                return Ok(token.clone());
            }
        }

        if !self.credentials.is_complete() {
            return Err(AuthError::MissingCredentials.into());
        }

        // Old token is gone before the exchange; a failed refresh must
        // never leave a stale token behind.
        cached.take();

        match exchange(&self.http, &self.credentials).await {
            Ok(token) => {
                info!("access token refreshed");
                *cached = Some(token.clone());
                Ok(token)
            }
            Err(err) => {
                warn!("token exchange failed: {err}");
                Err(err)
            }
        }
    }

    /// Drops the cached token; the next cycle performs a fresh
    /// exchange. Called when a fetch comes back 401.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        if cached.take().is_some() {
            info!("cached access token invalidated");
        }
    }

    /// Snapshot of the current token for persistence.
    pub async fn current(&self) -> Option<Token> {
        self.cached.lock().await.clone()
    }

    /// Performs an exchange with the supplied credentials without
    /// touching the cached token.
    pub async fn test_credentials(&self, credentials: &Credentials) -> CredentialCheck {
        if !credentials.is_complete() {
            return CredentialCheck {
                success: false,
                error: Some(AuthError::MissingCredentials.to_string()),
            };
        }

        match exchange(&self.http, credentials).await {
            Ok(_) => CredentialCheck {
                success: true,
                error: None,
            },
            Err(err) => CredentialCheck {
                success: false,
                error: Some(redwatch_core::ErrorExt::user_friendly_message(&err)),
            },
        }
    }
}

/// The password-grant exchange. Wire shape is fixed: Basic auth of
/// (client_id, client_secret), form-encoded grant_type/username/
/// password, JSON response with `access_token` and `expires_in`.
async fn exchange(http: &Client, credentials: &Credentials) -> Result<Token, CoreError> {
    let response = http
        .post(TOKEN_URL)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .form(&[
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ])
        .send()
        .await
        .map_err(|e| -> CoreError {
            if e.is_timeout() {
                AuthError::Timeout.into()
            } else {
                e.into()
            }
        })?;

    let status = response.status();
    let text = response.text().await.map_err(CoreError::from)?;

    if !status.is_success() {
        // The endpoint reports rejections as {"error": "..."} but a
        // proxy may answer with anything; the status code is enough.
        let reason = serde_json::from_str::<TokenResponse>(&text)
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| status.to_string());
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            reason,
        }
        .into());
    }

    let body: TokenResponse = serde_json::from_str(&text).map_err(|e| {
        CoreError::from(AuthError::MalformedResponse {
            details: e.to_string(),
        })
    })?;

    let access_token = body.access_token.ok_or_else(|| AuthError::Rejected {
        status: status.as_u16(),
        reason: "no access token in response".to_string(),
    })?;

    let expires_in = body.expires_in.unwrap_or(3600);
    Ok(Token {
        access_token,
        expires_at: Utc::now() + ChronoDuration::seconds(expires_in as i64),
    })
}
