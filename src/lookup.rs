use crate::error::*;
use crate::role::*;
use const_format::concatcp;
use serde::Serialize;
use std::sync::Arc;
use tokio_postgres::Client;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Which generated function answers a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "server", derive(clap::ValueEnum))]
pub enum Metric {
    /// Euclidean distance in raw degrees. Approximate by construction.
    Planar,
    /// Great-circle distance in kilometers.
    #[default]
    Geodesic,
}

impl Metric {
    pub const fn function(self) -> &'static str {
        match self {
            Self::Planar => FUNCTION_PLANAR,
            Self::Geodesic => FUNCTION_GEO,
        }
    }
    #[rustfmt::skip]
    pub const fn query(self) -> &'static str {
        match self {
            Self::Planar   => concatcp!("SELECT objectid, pcd2, distance    FROM ", FUNCTION_PLANAR, "($1, $2)"),
            Self::Geodesic => concatcp!("SELECT objectid, pcd2, distance_km FROM ", FUNCTION_GEO,    "($1, $2)"),
        }
    }
    /// Distance between two `(long, lat)` points under this metric, computed
    /// locally in the same units the store reports.
    pub fn distance(self, a: (f64, f64), b: (f64, f64)) -> f64 {
        match self {
            Self::Planar => ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt(),
            Self::Geodesic => haversine(a, b),
        }
    }
}

/// Great-circle distance in kilometers between two `(long, lat)` points.
pub fn haversine(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lon1, lat1) = (a.0.to_radians(), a.1.to_radians());
    let (lon2, lat2) = (b.0.to_radians(), b.1.to_radians());
    let h = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// One row returned by a nearest-neighbor function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub objectid: i32,
    pub pcd2: Option<String>,
    pub distance: f64,
}

/// Lookup defines the read interface over the generated functions.
#[async_trait::async_trait]
pub trait Lookup: Send + Sync {
    /// Closest places to `(long, lat)`, nearest first.
    async fn nearest(&self, metric: Metric, long: f64, lat: f64) -> Result<Vec<Place>>;
}

#[async_trait::async_trait]
impl Lookup for Client {
    async fn nearest(&self, metric: Metric, long: f64, lat: f64) -> Result<Vec<Place>> {
        self.query(metric.query(), &[&long, &lat])
            .await
            .map_err(|e| Error::Query(e.into()))?
            .iter()
            .map(|row| -> std::result::Result<Place, tokio_postgres::Error> {
                Ok(Place {
                    objectid: row.try_get(0)?,
                    pcd2: row.try_get(1)?,
                    distance: row.try_get(2)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Query(e.into()))
    }
}

#[async_trait::async_trait]
impl Lookup for Arc<Client> {
    async fn nearest(&self, metric: Metric, long: f64, lat: f64) -> Result<Vec<Place>> {
        self.as_ref().nearest(metric, long, lat).await
    }
}
