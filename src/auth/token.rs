//! Bearer token issuance and caching.

use chrono::{DateTime, Utc};
use reqwest::header::RETRY_AFTER;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::Credentials;
use crate::client::RetryPolicy;
use crate::{ApiVersion, Error, Result};

/// A bearer token issued by the service.
///
/// Tokens are immutable: a refresh produces a new `Token` that replaces the
/// cached one wholesale. Validity is never tracked locally; the client only
/// learns a token is bad when a request is rejected.
#[derive(Clone)]
pub struct Token {
    value: SecretString,
    issued_at: DateTime<Utc>,
}

impl Token {
    pub(crate) fn new(value: SecretString) -> Self {
        Self {
            value,
            issued_at: Utc::now(),
        }
    }

    /// The raw token string.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// When this client obtained (or was seeded with) the token.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    fn same_value(&self, other: &Token) -> bool {
        self.expose() == other.expose()
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Exchanges credentials for bearer tokens and caches the current one.
///
/// Refresh is reactive: callers ask for a new token after a request comes
/// back 401/403. At most one token is cached per manager.
///
/// # Thread Safety
///
/// Clones share the cache. Reads take a shared lock; issuing a token takes
/// the write lock, so concurrent callers that all saw the same rejected
/// token trigger a single re-issue.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<TokenManagerInner>,
}

struct TokenManagerInner {
    http: reqwest::Client,
    token_url: String,
    credentials: Credentials,
    retry: RetryPolicy,
    cached: RwLock<Option<Token>>,
}

impl TokenManager {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: &str,
        credentials: Credentials,
        retry: RetryPolicy,
    ) -> Self {
        let cached = credentials.access_token.clone().map(Token::new);
        Self {
            inner: Arc::new(TokenManagerInner {
                http,
                token_url: format!("{}/tokens", base_url.trim_end_matches('/')),
                credentials,
                retry,
                cached: RwLock::new(cached),
            }),
        }
    }

    /// Exchange the credentials for a fresh token.
    ///
    /// The token request goes through the client's retry policy like any
    /// other call. Does not touch the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if credentials are incomplete
    /// (checked before any request) or the service rejects them with a
    /// client error, and [`Error::TransientFailure`] if every attempt failed
    /// transiently (transport error, rate limit, retryable 5xx).
    pub async fn authenticate(&self) -> Result<Token> {
        let creds = &self.inner.credentials;
        creds.validate()?;

        debug!(url = %self.inner.token_url, version = %creds.version, "requesting token");

        let token = self.inner.retry.execute(|| self.request_token()).await?;

        info!(version = %creds.version, "issued new access token");
        Ok(token)
    }

    /// One attempt at the token endpoint.
    async fn request_token(&self) -> Result<Token> {
        let creds = &self.inner.credentials;
        let api_key = creds.api_key().unwrap_or_default();
        let request = match creds.version {
            ApiVersion::V3 => self
                .inner
                .http
                .post(&self.inner.token_url)
                .json(&serde_json::json!({ "secretKey": api_key })),
            ApiVersion::V2 => self
                .inner
                .http
                .post(&self.inner.token_url)
                .header("X-API-KEY", api_key)
                .basic_auth(
                    creds.client_id.as_deref().unwrap_or_default(),
                    creds.client_secret.as_ref().map(|s| s.expose_secret()),
                )
                .form(&[("grant_type", "client_credentials")]),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let raw = response.text().await?;

        if !(200..300).contains(&status) {
            let body: serde_json::Value = serde_json::from_str(&raw).unwrap_or_default();
            let message = Error::message_from_body(&body, &raw);
            return Err(match status {
                429 => Error::RateLimited {
                    retry_after_secs: retry_after.unwrap_or(0),
                },
                s if self.inner.retry.config().should_retry_status(s) => {
                    Error::Server { status: s, message }
                }
                s => Error::Authentication(format!("token request rejected ({}): {}", s, message)),
            });
        }

        let token_response: TokenResponse = serde_json::from_str(&raw)
            .map_err(|e| Error::Authentication(format!("malformed token response: {}", e)))?;
        Ok(Token::new(SecretString::from(token_response.token)))
    }

    /// Return the cached token, authenticating first if there is none.
    pub async fn current_token(&self) -> Result<Token> {
        if let Some(token) = self.inner.cached.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut cached = self.inner.cached.write().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = self.authenticate().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Force re-authentication and replace the cached token.
    ///
    /// Holds the cache's write lock for the whole token round-trip,
    /// retries included, so concurrent `current_token` callers wait for the
    /// new token instead of reading the old one.
    pub async fn refresh(&self) -> Result<Token> {
        let mut cached = self.inner.cached.write().await;
        let token = self.authenticate().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Replace `stale` after the server rejected it.
    ///
    /// If another task already swapped in a different token while we waited
    /// for the lock, that token is returned without a new request.
    pub(crate) async fn refresh_after(&self, stale: &Token) -> Result<Token> {
        let mut cached = self.inner.cached.write().await;
        if let Some(current) = cached.as_ref() {
            if !current.same_value(stale) {
                debug!("token already refreshed by another task");
                return Ok(current.clone());
            }
        }

        info!("access token rejected; re-authenticating");
        let token = self.authenticate().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// The cached token, if any, without authenticating.
    pub async fn cached(&self) -> Option<Token> {
        self.inner.cached.read().await.clone()
    }

    /// The credentials this manager authenticates with.
    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.inner.token_url)
            .field("credentials", &self.inner.credentials)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "access_token")]
    token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryConfig;

    fn manager(credentials: Credentials) -> TokenManager {
        TokenManager::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/",
            credentials,
            RetryPolicy::new(RetryConfig::no_retry()),
        )
    }

    #[test]
    fn test_token_debug_redacts_value() {
        let token = Token::new(SecretString::from("super-secret-token".to_string()));
        let debug_str = format!("{:?}", token);

        assert!(!debug_str.contains("super-secret-token"));
        assert!(debug_str.contains("REDACTED"));
    }

    #[test]
    fn test_token_response_accepts_both_shapes() {
        let v3: TokenResponse = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(v3.token, "abc");

        let v2: TokenResponse =
            serde_json::from_str(r#"{"access_token":"xyz","token_type":"bearer"}"#).unwrap();
        assert_eq!(v2.token, "xyz");
    }

    #[tokio::test]
    async fn test_seeded_token_is_served_from_cache() {
        let tokens = manager(Credentials::v3("key").with_access_token("seeded"));

        let token = tokens.current_token().await.unwrap();
        assert_eq!(token.expose(), "seeded");
        assert_eq!(tokens.cached().await.unwrap().expose(), "seeded");
        assert_eq!(tokens.inner.token_url, "http://127.0.0.1:9/tokens");
    }

    #[tokio::test]
    async fn test_refresh_after_skips_when_already_replaced() {
        let tokens = manager(Credentials::v3("key").with_access_token("newer"));
        let stale = Token::new(SecretString::from("older".to_string()));

        // The cached token differs from the stale one, so no request is made.
        let token = tokens.refresh_after(&stale).await.unwrap();
        assert_eq!(token.expose(), "newer");
    }

    #[tokio::test]
    async fn test_authenticate_validates_before_request() {
        let tokens = manager(Credentials::v2("key", "", "secret"));
        let err = tokens.authenticate().await.unwrap_err();
        assert!(matches!(err, Error::Authentication(ref m) if m.contains("client_id")));
    }
}
