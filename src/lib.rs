//! Zero-downtime blue/green refresh of postcode centroids in PostGIS.
//!
//! A full snapshot is loaded into the staging table, given a geography
//! column, a GiST index and two nearest-neighbor functions, then promoted to
//! live in a single transaction. Readers and the generated functions only
//! ever name the live role, so they see either the previous generation or
//! the new one.
//!
//! ## Core Types
//!
//! - [`Role`]: Staging/live identities mapped to fixed identifiers
//! - [`Session`]: Explicit store handle with transaction control
//! - [`transform()`]: Typed centroids with per-group date spans
//! - [`Loader`]: Chunked multi-row INSERT with a [`Conflict`] policy
//! - [`Spatial`]: Geography, index and function provisioning
//! - [`Swap`]: Atomic staging-to-live promotion
//! - [`Pipeline`]: Phase sequencing for one refresh cycle
//! - [`Check`]: Read-only status of both roles
//! - [`Lookup`]: Typed calls into the generated functions
mod error;
mod loader;
mod lookup;
mod pipeline;
mod record;
mod role;
mod schema;
mod session;
mod spatial;
mod status;
mod swap;
mod transform;

/// Dataset reading stays namespaced: `source::open` and `source::read` are
/// too generic to sit at the crate root.
pub mod source;

#[cfg(feature = "server")]
mod config;
#[cfg(test)]
mod catalog;

#[cfg(feature = "server")]
pub use config::*;
pub use error::*;
pub use loader::*;
pub use lookup::*;
pub use pipeline::*;
pub use record::*;
pub use role::*;
pub use schema::*;
pub use session::*;
pub use spatial::*;
pub use status::*;
pub use swap::*;
pub use transform::*;

use std::num::NonZeroU32;
use std::time::Duration;

// ============================================================================
// STORE PARAMETERS
// ============================================================================
/// Spatial reference of every stored point (WGS 84).
pub const SRID: u32 = 4326;
/// Rows each generated nearest-neighbor function returns.
pub const DEFAULT_NEIGHBORS: NonZeroU32 = NonZeroU32::new(5).unwrap();
/// Rows bound per INSERT statement unless configured otherwise.
pub const ROWS_PER_STATEMENT: usize = 5_000;
/// Bind parameters PostgreSQL accepts in one statement.
pub const MAX_BIND_PARAMS: usize = 65_535;
/// Time allowed to establish the store connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize logging with terminal and timestamped file output.
#[cfg(feature = "server")]
pub fn log() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time))?,
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file])?;
    Ok(())
}
