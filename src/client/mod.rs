//! HTTP client, retry policy and pagination for the Developer API.
//!
//! This module provides the main entry point [`DeveloperApiClient`].
//!
//! # Example
//!
//! ```no_run
//! use enverus_rs::{ClientConfig, Credentials, DeveloperApiClient, RetryConfig};
//!
//! # async fn example() -> enverus_rs::Result<()> {
//! let client = DeveloperApiClient::new(
//!     Credentials::v3("secret-key"),
//!     ClientConfig::default()
//!         .with_retry(RetryConfig::default().with_retries(5).with_backoff_factor(10.0)),
//! )?;
//!
//! let docs = client.docs("casings").await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod http;
pub mod paginated;
mod retry;

pub use config::{ClientConfig, RetryConfig};
pub use http::DeveloperApiClient;
pub use paginated::{Page, PaginatedStream, RECORD_COUNT_HEADER};
pub use retry::RetryPolicy;
pub(crate) use http::{ApiRequest, ApiResponse, ClientInner};
