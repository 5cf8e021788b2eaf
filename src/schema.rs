use crate::role::*;
use const_format::concatcp;

/// Columns of a role table, in insert order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "server", derive(clap::ValueEnum))]
pub enum Column {
    #[cfg_attr(feature = "server", value(name = "objectid"))]
    ObjectId,
    Pcd2,
    #[cfg_attr(feature = "server", value(name = "dointr"))]
    DoIntr,
    #[cfg_attr(feature = "server", value(name = "doterm"))]
    DoTerm,
    Oscty,
    Lat,
    Long,
    #[cfg_attr(feature = "server", value(name = "max_dointr"))]
    MaxDoIntr,
    #[cfg_attr(feature = "server", value(name = "min_dointr"))]
    MinDoIntr,
}

impl Column {
    #[rustfmt::skip]
    pub const ALL: [Self; 9] = [
        Self::ObjectId, Self::Pcd2,  Self::DoIntr,    Self::DoTerm,    Self::Oscty,
        Self::Lat,      Self::Long,  Self::MaxDoIntr, Self::MinDoIntr,
    ];
    pub const fn name(self) -> &'static str {
        match self {
            Self::ObjectId => "objectid",
            Self::Pcd2 => "pcd2",
            Self::DoIntr => "dointr",
            Self::DoTerm => "doterm",
            Self::Oscty => "oscty",
            Self::Lat => "lat",
            Self::Long => "long",
            Self::MaxDoIntr => "max_dointr",
            Self::MinDoIntr => "min_dointr",
        }
    }
    /// Every column except the primary key.
    pub fn values() -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|c| *c != Self::ObjectId)
            .collect()
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column list shared by every INSERT.
#[rustfmt::skip]
pub const COLUMNS: &str = "objectid, pcd2, dointr, doterm, oscty, lat, long, max_dointr, min_dointr";

macro_rules! creates {
    ($table:expr) => {
        concatcp!(
            "CREATE TABLE IF NOT EXISTS ", $table, " (
                objectid    INTEGER PRIMARY KEY,
                pcd2        TEXT,
                dointr      DATE,
                doterm      DATE,
                oscty       TEXT,
                lat         DECIMAL(9, 6),
                long        DECIMAL(9, 6),
                max_dointr  DATE,
                min_dointr  DATE
            )"
        )
    };
}

/// Fixed DDL and DML for a role table.
///
/// Statements are resolved per role at compile time so no table identifier
/// is ever built from runtime input.
pub trait Schema {
    /// Returns the physical table name.
    fn name(&self) -> &'static str;
    /// Returns `CREATE TABLE IF NOT EXISTS` DDL.
    fn creates(&self) -> &'static str;
    /// Returns `TRUNCATE TABLE` statement.
    fn truncates(&self) -> &'static str;
    /// Returns a `SELECT COUNT(*)` over the table.
    fn counts(&self) -> &'static str;
}

impl Schema for Role {
    fn name(&self) -> &'static str {
        self.table()
    }
    fn creates(&self) -> &'static str {
        match self {
            Role::Prepare => creates!(TABLE_PREPARE),
            Role::Ready => creates!(TABLE_READY),
        }
    }
    fn truncates(&self) -> &'static str {
        match self {
            Role::Prepare => concatcp!("TRUNCATE TABLE ", TABLE_PREPARE),
            Role::Ready => concatcp!("TRUNCATE TABLE ", TABLE_READY),
        }
    }
    fn counts(&self) -> &'static str {
        match self {
            Role::Prepare => concatcp!("SELECT COUNT(*) FROM ", TABLE_PREPARE),
            Role::Ready => concatcp!("SELECT COUNT(*) FROM ", TABLE_READY),
        }
    }
}
