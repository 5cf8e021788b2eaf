use thiserror::Error;

/// A driver-level failure reported by a [`Session`](crate::Session).
///
/// Carries the SQLSTATE code when the store produced one, so callers can
/// classify the failure without depending on driver error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: Option<String>,
    pub message: String,
}

impl Fault {
    pub fn new(code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            code: code.map(str::to_owned),
            message: message.into(),
        }
    }
    /// SQLSTATE class 23: integrity constraint violation.
    pub fn is_constraint(&self) -> bool {
        self.code.as_deref().is_some_and(|c| c.starts_with("23"))
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(ref code) => write!(f, "{} ({})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl From<tokio_postgres::Error> for Fault {
    fn from(err: tokio_postgres::Error) -> Self {
        let code = err.code().map(|c| c.code().to_owned());
        let message = err
            .as_db_error()
            .map(|db| db.message().to_owned())
            .unwrap_or_else(|| err.to_string());
        Self { code, message }
    }
}

/// Failure kinds surfaced by every store-facing operation.
#[derive(Error, Debug)]
pub enum Error {
    /// Store unreachable within the connect timeout.
    #[error("[C001] store unreachable: {0}")]
    Connection(String),

    /// A single field could not be parsed. Recovered by the transformer.
    #[error("[C002] unparsable {field}: {value:?}")]
    Parse { field: &'static str, value: String },

    /// Integrity violation while loading; the whole batch was rolled back.
    #[error("[C003] constraint violation loading {table}: {fault}")]
    Constraint { table: &'static str, fault: Fault },

    /// Non-integrity failure while loading; the whole batch was rolled back.
    #[error("[C004] load into {table} failed: {fault}")]
    Load { table: &'static str, fault: Fault },

    /// DDL failure; the surrounding transaction was rolled back.
    #[error("[C005] {phase} failed: {fault}")]
    Ddl { phase: &'static str, fault: Fault },

    /// Dataset file unreadable or malformed.
    #[error("[C006] dataset: {0}")]
    Dataset(String),

    /// Read-only query failed.
    #[error("[C007] query failed: {0}")]
    Query(Fault),

    /// Staging has nothing to promote.
    #[error("[C008] refusing to promote empty table {0}")]
    EmptyStaging(&'static str),
}

impl Error {
    /// Classifies a fault raised while loading `table`.
    pub fn load(table: &'static str, fault: Fault) -> Self {
        if fault.is_constraint() {
            Self::Constraint { table, fault }
        } else {
            Self::Load { table, fault }
        }
    }
    pub fn ddl(phase: &'static str, fault: Fault) -> Self {
        Self::Ddl { phase, fault }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::Dataset(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Dataset(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
