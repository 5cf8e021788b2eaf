use crate::error::*;
use crate::role::*;
use crate::schema::*;
use crate::session::*;
use const_format::concatcp;

/// Snapshot of both role tables and the live spatial assets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    /// Row count per role; `None` when the table does not exist.
    pub prepare: Option<u64>,
    pub ready: Option<u64>,
    pub staged_index: bool,
    pub live_index: bool,
    pub functions: u8,
}

impl Status {
    /// Whether the live role is fully queryable.
    pub fn serving(&self) -> bool {
        self.ready.is_some_and(|n| n > 0) && self.live_index && self.functions == 2
    }
    pub fn log(&self) {
        fn commas(n: Option<u64>) -> String {
            n.map(|n| {
                n.to_string()
                    .as_bytes()
                    .rchunks(3)
                    .rev()
                    .map(|c| String::from_utf8_lossy(c).into_owned())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_else(|| "missing".to_owned())
        }
        fn mark(b: bool) -> &'static str {
            if b { "✓" } else { " " }
        }
        log::info!("┌──────────┬───────────────┬───────┐");
        log::info!("│ Role     │ Rows          │ Index │");
        log::info!("├──────────┼───────────────┼───────┤");
        log::info!("│ Ready    │ {:>13} │   {}   │", commas(self.ready), mark(self.live_index));
        log::info!("│ Prepare  │ {:>13} │   {}   │", commas(self.prepare), mark(self.staged_index));
        log::info!("├──────────┴───────────────┴───────┤");
        log::info!("│ Functions installed          {}/2 │", self.functions);
        log::info!("└──────────────────────────────────┘");
    }
}

#[rustfmt::skip]
const EXISTS_PREPARE: &str = concatcp!("SELECT COUNT(*) FROM pg_tables WHERE tablename = '", TABLE_PREPARE, "'");
#[rustfmt::skip]
const EXISTS_READY:   &str = concatcp!("SELECT COUNT(*) FROM pg_tables WHERE tablename = '", TABLE_READY, "'");
#[rustfmt::skip]
const INDEXED_PREPARE:&str = concatcp!("SELECT COUNT(*) FROM pg_indexes WHERE indexname = '", INDEX_PREPARE, "'");
#[rustfmt::skip]
const INDEXED_READY:  &str = concatcp!("SELECT COUNT(*) FROM pg_indexes WHERE indexname = '", INDEX_READY, "'");
#[rustfmt::skip]
const PLANAR:         &str = concatcp!("SELECT COUNT(*) FROM pg_proc WHERE proname = '", FUNCTION_PLANAR, "'");
#[rustfmt::skip]
const GEODESIC:       &str = concatcp!("SELECT COUNT(*) FROM pg_proc WHERE proname = '", FUNCTION_GEO, "'");

/// Check defines read-only status queries over the dataset.
#[async_trait::async_trait]
pub trait Check: Session {
    async fn rows(&self, role: Role) -> Result<Option<u64>> {
        let exists = match role {
            Role::Prepare => EXISTS_PREPARE,
            Role::Ready => EXISTS_READY,
        };
        if self.scalar(exists).await.map_err(Error::Query)? == 0 {
            return Ok(None);
        }
        let n = self.scalar(role.counts()).await.map_err(Error::Query)?;
        Ok(Some(n as u64))
    }
    async fn status(&self) -> Result<Status> {
        let (prepare, ready) = futures::try_join!(self.rows(Role::Prepare), self.rows(Role::Ready))?;
        let flags = futures::try_join!(
            self.scalar(INDEXED_PREPARE),
            self.scalar(INDEXED_READY),
            self.scalar(PLANAR),
            self.scalar(GEODESIC),
        )
        .map_err(Error::Query)?;
        Ok(Status {
            prepare,
            ready,
            staged_index: flags.0 > 0,
            live_index: flags.1 > 0,
            functions: (flags.2 > 0) as u8 + (flags.3 > 0) as u8,
        })
    }
}

impl<S> Check for S where S: Session {}
