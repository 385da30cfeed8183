//! HTTP client implementation for the Developer API.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::Method;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::api::DatasetsService;
use crate::auth::{Credentials, Token, TokenManager};
use crate::export::CsvOptions;
use crate::models::{DatasetName, FieldDoc, Query, Row};
use crate::{ApiVersion, Error, Result};

use super::config::ClientConfig;
use super::paginated::PaginatedStream;
use super::retry::RetryPolicy;

/// The main client for the Developer API.
///
/// Construction validates credentials and never touches the network; the
/// first request authenticates. Cloning is cheap and clones share the
/// cached token. For fully independent workers, build one client each.
///
/// # Example
///
/// ```no_run
/// use futures_util::StreamExt;
/// use enverus_rs::{DeveloperApiClient, Query};
///
/// # async fn example() -> enverus_rs::Result<()> {
/// let client = DeveloperApiClient::v3("your-secret-key")?;
///
/// let count = client.count("rigs", &Query::new().filter("deleteddate", "null")).await?;
/// println!("{} rigs", count);
///
/// let mut rows = client.query("rigs", Query::new().page_size(10_000));
/// while let Some(row) = rows.next().await {
///     let row = row?;
///     println!("{:?}", row.get("RigName"));
/// }
/// # Ok(())
/// # }
/// ```
pub struct DeveloperApiClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) tokens: TokenManager,
    pub(crate) retry: RetryPolicy,
    pub(crate) config: ClientConfig,
    pub(crate) base_url: String,
    pub(crate) version: ApiVersion,
}

impl DeveloperApiClient {
    /// Create a client from credentials and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if a required identity field is
    /// missing, or [`Error::Config`] if the base URL is invalid. No request
    /// is made either way.
    pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        credentials.validate()?;

        if let Some(level) = config.log_level {
            crate::logging::init(level);
        }

        let version = credentials.version();
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(version.default_base_url())
            .trim_end_matches('/')
            .to_string();
        Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("invalid base url '{}': {}", base_url, e)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let retry = RetryPolicy::new(config.retry.clone());
        let tokens = TokenManager::new(http.clone(), &base_url, credentials, retry.clone());

        debug!(%version, %base_url, "created Developer API client");

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                tokens,
                retry,
                config,
                base_url,
                version,
            }),
        })
    }

    /// Create a v3 client with default configuration.
    pub fn v3(secret_key: impl Into<String>) -> Result<Self> {
        Self::new(Credentials::v3(secret_key), ClientConfig::default())
    }

    /// Create a v2 client with default configuration.
    pub fn v2(
        api_key: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        Self::new(
            Credentials::v2(api_key, client_id, client_secret),
            ClientConfig::default(),
        )
    }

    /// Get the datasets service.
    pub fn datasets(&self) -> DatasetsService {
        DatasetsService::new(self.inner.clone())
    }

    /// Stream every row of `dataset` matching `query`.
    ///
    /// See [`DatasetsService::query`].
    pub fn query(&self, dataset: impl Into<DatasetName>, query: Query) -> PaginatedStream<Row> {
        self.datasets().query(dataset, query)
    }

    /// Count rows of `dataset` matching `query`.
    ///
    /// See [`DatasetsService::count`].
    pub async fn count(&self, dataset: impl Into<DatasetName>, query: &Query) -> Result<u64> {
        self.datasets().count(dataset, query).await
    }

    /// Fetch field documentation for `dataset`.
    ///
    /// See [`DatasetsService::docs`].
    pub async fn docs(&self, dataset: impl Into<DatasetName>) -> Result<Vec<FieldDoc>> {
        self.datasets().docs(dataset).await
    }

    /// Fetch a `CREATE TABLE` statement for `dataset` in the given dialect.
    ///
    /// See [`DatasetsService::ddl`].
    pub async fn ddl(&self, dataset: impl Into<DatasetName>, database: &str) -> Result<String> {
        self.datasets().ddl(dataset, database).await
    }

    /// Query `dataset` and write every row to a CSV file.
    ///
    /// Returns the number of data rows written.
    pub async fn to_csv(
        &self,
        dataset: impl Into<DatasetName>,
        query: Query,
        path: impl AsRef<Path>,
        options: &CsvOptions,
    ) -> Result<u64> {
        crate::export::to_csv(self.query(dataset, query), path, options).await
    }

    /// Query `dataset` into a typed data frame indexed by its primary key.
    #[cfg(feature = "dataframe")]
    pub async fn to_dataframe(
        &self,
        dataset: impl Into<DatasetName>,
        query: Query,
    ) -> Result<crate::export::IndexedFrame> {
        crate::export::to_dataframe(self, dataset, query).await
    }

    /// The cached access token, if one has been issued or supplied.
    pub async fn access_token(&self) -> Option<Token> {
        self.inner.tokens.cached().await
    }

    /// Force re-authentication.
    pub async fn refresh_token(&self) -> Result<Token> {
        self.inner.tokens.refresh().await
    }

    /// Get the token manager.
    pub fn tokens(&self) -> &TokenManager {
        &self.inner.tokens
    }

    /// The API version this client talks to.
    pub fn version(&self) -> ApiVersion {
        self.inner.version
    }

    /// The effective base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }
}

/// A successful response with its body already read.
#[derive(Debug, Clone)]
pub(crate) struct ApiResponse {
    pub(crate) headers: HeaderMap,
    pub(crate) body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) fn into_text(self) -> Result<String> {
        String::from_utf8(self.body)
            .map_err(|e| Error::UnexpectedResponse(format!("response body is not UTF-8: {}", e)))
    }
}

/// One logical request against a dataset endpoint.
#[derive(Debug, Clone)]
pub(crate) struct ApiRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) dataset: DatasetName,
}

impl ClientInner {
    /// URL of a dataset endpoint.
    pub(crate) fn dataset_url(&self, dataset: &DatasetName) -> String {
        format!("{}/{}", self.base_url, dataset)
    }

    /// Turn a `Link` target into a full URL.
    ///
    /// Targets may be absolute, relative to the API root (`/rigs?...`), or
    /// host-relative including the root's own path prefix.
    pub(crate) fn resolve_link(&self, link: &str) -> Result<String> {
        if let Ok(url) = Url::parse(link) {
            return Ok(url.to_string());
        }

        let base = Url::parse(&self.base_url)?;
        let prefix = base.path().trim_end_matches('/');
        if link.starts_with('/') {
            if !prefix.is_empty() && link.starts_with(&format!("{}/", prefix)) {
                return Ok(base.join(link)?.to_string());
            }
            return Ok(format!("{}{}", self.base_url, link));
        }
        Ok(format!("{}/{}", self.base_url, link))
    }

    /// Build request headers with authentication.
    fn build_headers(&self, token: &Token) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token.expose()))
                .map_err(|_| Error::Authentication("Invalid token format".to_string()))?,
        );

        if self.version == ApiVersion::V2 {
            if let Some(api_key) = self.tokens.credentials().api_key() {
                headers.insert(
                    "X-API-KEY",
                    HeaderValue::from_str(api_key)
                        .map_err(|_| Error::Authentication("Invalid API key format".to_string()))?,
                );
            }
        }

        Ok(headers)
    }

    /// Send a request through the refresh-and-retry state machine.
    ///
    /// Transient failures, including a body that breaks off mid-read, are
    /// retried by the policy. A rejected token is
    /// refreshed once and the same request is sent again; a second
    /// rejection fails with [`Error::Authentication`].
    pub(crate) async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let token = self.tokens.current_token().await?;

        match self.send_with_retry(request, &token).await {
            Err(Error::TokenRejected { status }) => {
                debug!(status, url = %request.url, "token rejected; refreshing once");
                let fresh = self.tokens.refresh_after(&token).await?;
                match self.send_with_retry(request, &fresh).await {
                    Err(Error::TokenRejected { status }) => Err(Error::Authentication(format!(
                        "token rejected again after refresh (status {})",
                        status
                    ))),
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn send_with_retry(&self, request: &ApiRequest, token: &Token) -> Result<ApiResponse> {
        self.retry.execute(|| self.send_once(request, token)).await
    }

    async fn send_once(&self, request: &ApiRequest, token: &Token) -> Result<ApiResponse> {
        let headers = self.build_headers(token)?;

        debug!(method = %request.method, url = %request.url, params = ?request.params, "sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .headers(headers);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }

        let response = builder.send().await?;
        let response = self.check_status(response, request).await?;

        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { headers, body })
    }

    /// Pass successful responses through and classify the rest.
    async fn check_status(
        &self,
        response: reqwest::Response,
        request: &ApiRequest,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let raw = response.text().await.unwrap_or_default();
        let body: serde_json::Value = serde_json::from_str(&raw).unwrap_or_default();

        debug!(status = status_code, url = %request.url, "request failed");

        let err = match status_code {
            401 | 403 => Error::TokenRejected {
                status: status_code,
            },
            404 => Error::Dataset(request.dataset.to_string()),
            400 | 422 => Error::Query(Error::message_from_body(&body, &raw)),
            429 => Error::RateLimited {
                retry_after_secs: retry_after.unwrap_or(0),
            },
            s if self.retry.config().should_retry_status(s) => Error::Server {
                status: s,
                message: Error::message_from_body(&body, &raw),
            },
            _ => Error::from_api_response(status_code, body, &raw),
        };
        Err(err)
    }
}

impl Clone for DeveloperApiClient {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl std::fmt::Debug for DeveloperApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeveloperApiClient")
            .field("version", &self.inner.version)
            .field("base_url", &self.inner.base_url)
            .field("config", &self.inner.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> DeveloperApiClient {
        DeveloperApiClient::new(
            Credentials::v3("key").with_access_token("tok"),
            ClientConfig::default().with_base_url(base_url),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_credentials_fail_at_construction() {
        let err = DeveloperApiClient::v3("").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));

        let err = DeveloperApiClient::v2("key", "id", "").unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = DeveloperApiClient::new(
            Credentials::v3("key"),
            ClientConfig::default().with_base_url("not a url"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_default_base_url_per_version() {
        let v3 = DeveloperApiClient::v3("key").unwrap();
        assert_eq!(v3.base_url(), "https://api.enverus.com/v3/direct-access");
        assert_eq!(v3.version(), ApiVersion::V3);

        let v2 = DeveloperApiClient::v2("key", "id", "secret").unwrap();
        assert_eq!(v2.base_url(), "https://di-api.drillinginfo.com/v2/direct-access");
    }

    #[test]
    fn test_resolve_link() {
        let c = client("https://api.example.com/v3/direct-access/");
        let inner = &c.inner;

        assert_eq!(
            inner.resolve_link("/rigs?next_page=abc").unwrap(),
            "https://api.example.com/v3/direct-access/rigs?next_page=abc"
        );
        assert_eq!(
            inner
                .resolve_link("/v3/direct-access/rigs?next_page=abc")
                .unwrap(),
            "https://api.example.com/v3/direct-access/rigs?next_page=abc"
        );
        assert_eq!(
            inner.resolve_link("rigs?next_page=abc").unwrap(),
            "https://api.example.com/v3/direct-access/rigs?next_page=abc"
        );
        assert_eq!(
            inner
                .resolve_link("https://other.example.com/rigs?next_page=abc")
                .unwrap(),
            "https://other.example.com/rigs?next_page=abc"
        );
    }

    #[test]
    fn test_resolve_link_at_host_root() {
        let c = client("http://127.0.0.1:8080");
        assert_eq!(
            c.inner.resolve_link("/rigs?next_page=2").unwrap(),
            "http://127.0.0.1:8080/rigs?next_page=2"
        );
    }

    #[test]
    fn test_headers_carry_bearer_and_api_key() {
        let v2 = DeveloperApiClient::new(
            Credentials::v2("the-api-key", "id", "secret"),
            ClientConfig::default(),
        )
        .unwrap();
        let token = Token::new(secrecy::SecretString::from("abc".to_string()));
        let headers = v2.inner.build_headers(&token).unwrap();

        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert_eq!(headers.get("X-API-KEY").unwrap(), "the-api-key");

        let v3 = client("http://127.0.0.1:8080");
        let headers = v3.inner.build_headers(&token).unwrap();
        assert!(headers.get("X-API-KEY").is_none());
    }

    #[tokio::test]
    async fn test_truncated_body_is_retried() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let seen = connections.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let n = seen.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response: &[u8] = if n == 0 {
                    // promises 64 bytes, sends 9, then hangs up
                    b"HTTP/1.1 200 OK\r\ncontent-length: 64\r\n\r\nCREATE TA"
                } else {
                    b"HTTP/1.1 200 OK\r\ncontent-length: 23\r\nconnection: close\r\n\r\nCREATE TABLE casings ()"
                };
                let _ = socket.write_all(response).await;
                let _ = socket.shutdown().await;
            }
        });

        let c = DeveloperApiClient::new(
            Credentials::v3("key").with_access_token("tok"),
            ClientConfig::default()
                .with_base_url(format!("http://{}", addr))
                .with_retry(crate::RetryConfig::default().with_retries(3).with_backoff_factor(0.0)),
        )
        .unwrap();

        let ddl = c.ddl("casings", "pg").await.unwrap();
        assert_eq!(ddl, "CREATE TABLE casings ()");
        assert_eq!(connections.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let c = client("http://127.0.0.1:8080");
        let debug_str = format!("{:?}", c);
        assert!(debug_str.contains("DeveloperApiClient"));
        assert!(!debug_str.contains("\"tok\""));
    }
}
