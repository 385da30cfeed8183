//! Error types for the Developer API client.
//!
//! This module provides a single error type covering every failure mode of
//! the client: credential problems, dataset and query rejections, exhausted
//! retries, and the transport/codec errors underneath them.

use serde_json::Value;
use thiserror::Error;

/// A specialized `Result` type for Developer API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for all Developer API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport failed (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error during an export
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Building a data frame failed
    #[cfg(feature = "dataframe")]
    #[error("Data frame error: {0}")]
    DataFrame(#[from] polars::error::PolarsError),

    /// Missing or invalid credentials, or the token was still rejected
    /// after one refresh.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The service does not recognize the requested dataset.
    #[error("Unknown dataset: {0}")]
    Dataset(String),

    /// Malformed query: bad filter, unsupported DDL dialect, or invalid
    /// pagination parameters.
    #[error("Invalid query: {0}")]
    Query(String),

    /// The retry budget was spent on transient failures.
    #[error("Transient failure persisted after {attempts} attempt(s): {source}")]
    TransientFailure {
        /// Number of attempts made
        attempts: u32,
        /// The error returned by the final attempt
        source: Box<Error>,
    },

    /// The server rejected the bearer token (401/403).
    #[error("Bearer token rejected (status {status})")]
    TokenRejected {
        /// HTTP status code
        status: u16,
    },

    /// Rate limited by the API
    #[error("Rate limited; retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Number of seconds the server asked us to wait
        retry_after_secs: u64,
    },

    /// The server reported a transient failure (5xx in the retry list)
    #[error("Server error: status={status}, message={message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// API returned a non-transient error response
    #[error("API error: status={status}, code={code:?}, message={message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Optional error code from the API
        code: Option<String>,
        /// Human-readable error message
        message: String,
        /// Raw response body for debugging
        body: Value,
    },

    /// A successful response was missing something we rely on
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if this error is transient and the request could be
    /// sent again.
    ///
    /// Token rejections are not retryable; they get a single refresh
    /// instead.
    ///
    /// # Example
    ///
    /// ```
    /// use enverus_rs::Error;
    ///
    /// let err = Error::Server { status: 503, message: "busy".into() };
    /// assert!(err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => !e.is_decode() && !e.is_builder(),
            Error::RateLimited { .. } | Error::Server { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is an authentication-related error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Authentication(_) | Error::TokenRejected { .. })
    }

    /// Returns `true` if this error indicates a client-side issue
    /// (unknown dataset, bad query, bad configuration, etc.).
    pub fn is_client_error(&self) -> bool {
        match self {
            Error::Api { status, .. } => *status >= 400 && *status < 500,
            Error::Dataset(_) | Error::Query(_) | Error::Config(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates a server-side issue.
    pub fn is_server_error(&self) -> bool {
        match self {
            Error::Api { status, .. } | Error::Server { status, .. } => *status >= 500,
            Error::TransientFailure { source, .. } => source.is_server_error(),
            _ => false,
        }
    }

    /// Pull a human-readable message out of an error body.
    ///
    /// The service answers with either `{"message": ...}`,
    /// `{"error": {"message": ...}}` or plain text.
    pub(crate) fn message_from_body(body: &Value, raw: &str) -> String {
        body.get("message")
            .or_else(|| body.get("error").and_then(|e| e.get("message")))
            .or_else(|| body.get("error_description"))
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    "Unknown API error".to_string()
                } else {
                    trimmed.to_string()
                }
            })
    }

    /// Create an API error from a response
    pub(crate) fn from_api_response(status: u16, body: Value, raw: &str) -> Self {
        let code = body
            .get("error")
            .and_then(|e| e.get("code").or(Some(e)))
            .and_then(|c| c.as_str())
            .map(String::from);

        let message = Self::message_from_body(&body, raw);

        Error::Api {
            status,
            code,
            message,
            body,
        }
    }
}
