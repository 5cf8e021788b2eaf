use crate::schema::Column;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

/// One dataset row exactly as read. Every field is kept as text so that
/// a bad value only ever nulls its own field.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "OBJECTID")]
    pub id: Option<String>,
    #[serde(rename = "PCD2")]
    pub pcd2: Option<String>,
    #[serde(rename = "DOINTR")]
    pub dointr: Option<String>,
    #[serde(rename = "DOTERM")]
    pub doterm: Option<String>,
    #[serde(rename = "OSCTY")]
    pub oscty: Option<String>,
    #[serde(rename = "LAT")]
    pub lat: Option<String>,
    #[serde(rename = "LONG")]
    pub long: Option<String>,
}

/// Headers a dataset must carry.
pub const HEADERS: [&str; 7] = ["OBJECTID", "PCD2", "DOINTR", "DOTERM", "OSCTY", "LAT", "LONG"];

/// A fully typed centroid, ready for the loader.
///
/// `None` is the null sentinel: it is bound as SQL `NULL` and left to the
/// table constraints to accept or reject.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Centroid {
    pub id: Option<i32>,
    pub pcd2: Option<String>,
    pub dointr: Option<NaiveDate>,
    pub doterm: Option<NaiveDate>,
    pub oscty: Option<String>,
    pub lat: Option<Decimal>,
    pub long: Option<Decimal>,
    pub max_dointr: Option<NaiveDate>,
    pub min_dointr: Option<NaiveDate>,
}

impl Centroid {
    /// Bind parameters in [`Column::ALL`](crate::Column::ALL) order.
    pub fn params(&self) -> [&(dyn tokio_postgres::types::ToSql + Sync); 9] {
        [
            &self.id,
            &self.pcd2,
            &self.dointr,
            &self.doterm,
            &self.oscty,
            &self.lat,
            &self.long,
            &self.max_dointr,
            &self.min_dointr,
        ]
    }
    /// Overwrites `column` with the value `from` carries.
    pub fn assign(&mut self, column: Column, from: &Self) {
        match column {
            Column::ObjectId => self.id = from.id,
            Column::Pcd2 => self.pcd2 = from.pcd2.clone(),
            Column::DoIntr => self.dointr = from.dointr,
            Column::DoTerm => self.doterm = from.doterm,
            Column::Oscty => self.oscty = from.oscty.clone(),
            Column::Lat => self.lat = from.lat,
            Column::Long => self.long = from.long,
            Column::MaxDoIntr => self.max_dointr = from.max_dointr,
            Column::MinDoIntr => self.min_dointr = from.min_dointr,
        }
    }
}
