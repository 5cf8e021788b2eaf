use crate::error::*;
use crate::role::*;
use crate::schema::*;
use crate::session::*;
use const_format::concatcp;

/// The promotion, in order. Executed as one transaction.
#[rustfmt::skip]
pub const STEPS: [&str; 6] = [
    // 1. release the live index name
    concatcp!("DROP INDEX IF EXISTS ", INDEX_READY),
    // 2. exchange table identities through the transient name
    concatcp!("ALTER TABLE ", TABLE_PREPARE,   " RENAME TO ", TABLE_TRANSIENT),
    concatcp!("ALTER TABLE ", TABLE_READY,     " RENAME TO ", TABLE_PREPARE),
    concatcp!("ALTER TABLE ", TABLE_TRANSIENT, " RENAME TO ", TABLE_READY),
    // 3. the staged index follows its table into the live role
    concatcp!("ALTER INDEX ", INDEX_PREPARE,   " RENAME TO ", INDEX_READY),
    // 4. empty the demoted generation for the next cycle
    concatcp!("TRUNCATE TABLE ", TABLE_PREPARE),
];

/// Swap is the only operation that changes which physical table is live.
///
/// Readers observe either the previous generation or the new one, never a
/// mix: if any step fails the transaction is rolled back and the previous
/// generation stays live with its index.
#[async_trait::async_trait]
pub trait Swap: Session {
    async fn swap(&self) -> Result<()> {
        log::info!("promoting {} to {}", TABLE_PREPARE, TABLE_READY);
        atomically(self, &STEPS).await.map_err(|fault| {
            log::error!("swap rolled back, previous generation stays live: {}", fault);
            Error::ddl("swap", fault)
        })?;
        log::info!("swap complete, {} truncated", TABLE_PREPARE);
        Ok(())
    }
    /// Fails with [`Error::EmptyStaging`] unless staging holds rows.
    async fn staged(&self) -> Result<u64> {
        let rows = self.scalar(Role::Prepare.counts()).await.map_err(Error::Query)?;
        match rows {
            0 => Err(Error::EmptyStaging(TABLE_PREPARE)),
            n => Ok(n as u64),
        }
    }
}

impl<S> Swap for S where S: Session {}
