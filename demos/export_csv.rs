//! CSV export example.
//!
//! This example prints the Postgres DDL for `casings` and writes recently
//! updated casing records to `casings.csv`.
//!
//! Run with: ENVERUS_SECRET_KEY=... cargo run --example export_csv

use enverus_rs::export::CsvOptions;
use enverus_rs::{ClientConfig, Credentials, DeveloperApiClient, Query, RetryConfig};

#[tokio::main]
async fn main() -> enverus_rs::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let secret_key = std::env::var("ENVERUS_SECRET_KEY")
        .expect("ENVERUS_SECRET_KEY environment variable required");

    let client = DeveloperApiClient::new(
        Credentials::v3(secret_key),
        ClientConfig::default()
            .with_retry(RetryConfig::default().with_retries(5).with_backoff_factor(2.0)),
    )?;

    let ddl = client.ddl("casings", "pg").await?;
    println!("{}", ddl);

    let written = client
        .to_csv(
            "casings",
            Query::new()
                .filter("updateddate", "gt(2021-01-01)")
                .page_size(10_000),
            "casings.csv",
            &CsvOptions::default().with_log_progress(true),
        )
        .await?;

    println!("Wrote {} row(s) to casings.csv", written);
    Ok(())
}
