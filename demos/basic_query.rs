//! Basic query example.
//!
//! This example authenticates with a v3 secret key, counts active rigs in
//! two counties, and streams them page by page.
//!
//! Run with: ENVERUS_SECRET_KEY=... cargo run --example basic_query

use futures_util::StreamExt;
use enverus_rs::{DeveloperApiClient, Query};

#[tokio::main]
async fn main() -> enverus_rs::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let secret_key = std::env::var("ENVERUS_SECRET_KEY")
        .expect("ENVERUS_SECRET_KEY environment variable required");

    let client = DeveloperApiClient::v3(secret_key)?;

    let query = Query::new()
        .filter("deleteddate", "null")
        .filter("county", "in(REEVES,LOVING)")
        .page_size(1000);

    let count = client.count("rigs", &query).await?;
    println!("Found {} rig(s)", count);

    let mut rows = client.query("rigs", query);
    while let Some(row) = rows.next().await {
        let row = row?;
        println!(
            "  - {} ({})",
            row.get("RigName").and_then(|v| v.as_str()).unwrap_or("unnamed"),
            row.get("ContractorName").and_then(|v| v.as_str()).unwrap_or("unknown contractor"),
        );
    }

    println!("\nFetched {} page(s)", rows.pages_fetched());
    Ok(())
}
