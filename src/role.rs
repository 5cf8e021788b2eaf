//! Role-name indirection between logical roles and physical identifiers.
//!
//! Two physical tables hold the dataset. Which one is live changes on every
//! swap, but readers, indexes and generated functions only ever see the
//! names below. Every identifier is a compile-time constant; nothing here is
//! formatted from runtime input.
use const_format::concatcp;

/// Logical dataset identity shared by both role tables.
#[rustfmt::skip]
pub const DATASET:          &str = "onspd_centroids";
/// Table name while staging.
#[rustfmt::skip]
pub const TABLE_PREPARE:    &str = concatcp!(DATASET, "_prepare");
/// Table name while live.
#[rustfmt::skip]
pub const TABLE_READY:      &str = concatcp!(DATASET, "_ready");
/// Name briefly held by the staging table during the rename exchange.
#[rustfmt::skip]
pub const TABLE_TRANSIENT:  &str = concatcp!(DATASET, "_swap");
/// Spatial index bound to the staging table.
#[rustfmt::skip]
pub const INDEX_PREPARE:    &str = "geog_index_prepare";
/// Spatial index bound to the live table.
#[rustfmt::skip]
pub const INDEX_READY:      &str = "geog_index_ready";
/// Planar nearest-neighbor function.
#[rustfmt::skip]
pub const FUNCTION_PLANAR:  &str = "find_closest_places";
/// Geodesic nearest-neighbor function.
#[rustfmt::skip]
pub const FUNCTION_GEO:     &str = "find_closest_places_geo";

/// The two roles a physical table can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Write target for the next refresh.
    Prepare,
    /// Authoritative for reads and spatial queries.
    Ready,
}

impl Role {
    pub const fn all() -> [Self; 2] {
        [Self::Prepare, Self::Ready]
    }
    pub const fn table(self) -> &'static str {
        match self {
            Self::Prepare => TABLE_PREPARE,
            Self::Ready => TABLE_READY,
        }
    }
    pub const fn index(self) -> &'static str {
        match self {
            Self::Prepare => INDEX_PREPARE,
            Self::Ready => INDEX_READY,
        }
    }
    pub const fn other(self) -> Self {
        match self {
            Self::Prepare => Self::Ready,
            Self::Ready => Self::Prepare,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}
