//! # enverus-rs
//!
//! An async Rust client for the Enverus Developer API (Direct Access v2 and v3).
//!
//! The client hides token issue and refresh, follows paginated result sets
//! lazily, retries transient failures with exponential backoff, and exports
//! query results to CSV or (with the `dataframe` feature) to a typed
//! `polars` data frame.
//!
//! ## Features
//!
//! - **Authentication**: v3 secret-key and v2 API-key/OAuth credentials, with
//!   tokens fetched on first use and re-issued when the server rejects them
//! - **Queries**: filter predicates passed through verbatim, rows streamed
//!   page by page in server order
//! - **Metadata**: row counts, field documentation and generated DDL
//! - **Exports**: CSV files and indexed data frames
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use enverus_rs::{DeveloperApiClient, Query};
//!
//! #[tokio::main]
//! async fn main() -> enverus_rs::Result<()> {
//!     let client = DeveloperApiClient::v3("your-secret-key")?;
//!
//!     let query = Query::new()
//!         .filter("deleteddate", "null")
//!         .filter("county", "in(REEVES,LOVING)")
//!         .page_size(10_000);
//!
//!     println!("{} rigs", client.count("rigs", &query).await?);
//!
//!     let mut rows = client.query("rigs", query);
//!     while let Some(row) = rows.next().await {
//!         let row = row?;
//!         println!("{:?}", row.get("RigName"));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## CSV Export
//!
//! ```rust,no_run
//! use enverus_rs::{DeveloperApiClient, Query};
//! use enverus_rs::export::CsvOptions;
//!
//! #[tokio::main]
//! async fn main() -> enverus_rs::Result<()> {
//!     let client = DeveloperApiClient::v3("your-secret-key")?;
//!
//!     let written = client
//!         .to_csv(
//!             "well-origins",
//!             Query::new().filter("updateddate", "gt(2021-01-01)"),
//!             "well_origins.csv",
//!             &CsvOptions::default().with_log_progress(true),
//!         )
//!         .await?;
//!     println!("wrote {} rows", written);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;

// Re-export primary types at crate root for convenience
pub use error::{Error, Result};
pub use models::{ApiVersion, DatasetName, Dialect, FieldDoc, FieldType, Filters, Query, Row};
pub use client::{ClientConfig, DeveloperApiClient, PaginatedStream, RetryConfig};
pub use auth::{Credentials, Token, TokenManager};

/// Prelude module for convenient imports.
///
/// ```rust
/// use enverus_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        ApiVersion, DatasetName, Dialect, FieldDoc, FieldType, Filters, Query, Row,
    };
    pub use crate::client::{ClientConfig, DeveloperApiClient, PaginatedStream, RetryConfig};
    pub use crate::auth::{Credentials, Token, TokenManager};
    pub use crate::export::CsvOptions;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_name_creation() {
        let dataset = DatasetName::new("well-origins");
        assert_eq!(dataset.as_str(), "well-origins");
    }

    #[test]
    fn test_default_base_urls() {
        assert_eq!(
            ApiVersion::V3.default_base_url(),
            "https://api.enverus.com/v3/direct-access"
        );
        assert_eq!(
            ApiVersion::V2.default_base_url(),
            "https://di-api.drillinginfo.com/v2/direct-access"
        );
    }

    #[test]
    fn test_dialect_validation() {
        assert!("pg".parse::<Dialect>().is_ok());
        assert!("mssql".parse::<Dialect>().is_ok());
        assert!(matches!("oracle".parse::<Dialect>(), Err(Error::Query(_))));
    }
}
