//! Refresh Binary
//!
//! Loads a postcode centroid snapshot into staging, provisions it and
//! promotes it to live without read downtime.
//!
//! Commands: refresh, provision, status, nearest
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    centroids::log()?;
    centroids::Args::parse().run().await
}
