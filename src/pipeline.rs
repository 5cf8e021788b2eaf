use crate::error::*;
use crate::loader::*;
use crate::record::*;
use crate::role::*;
use crate::schema::*;
use crate::session::*;
use crate::spatial::*;
use crate::swap::*;
use crate::transform::*;
use std::num::NonZeroU32;
use std::path::Path;

/// Resumption points of a refresh cycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "server", derive(clap::ValueEnum))]
pub enum Phase {
    /// Create both role tables, then everything after.
    #[default]
    Schema,
    /// Transform and load staging, then everything after.
    Load,
    /// Provision the already loaded staging table, then swap.
    Provision,
    /// Promote the already provisioned staging table.
    Swap,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema => f.write_str("schema"),
            Self::Load => f.write_str("load"),
            Self::Provision => f.write_str("provision"),
            Self::Swap => f.write_str("swap"),
        }
    }
}

/// Drives one refresh cycle over a single session.
///
/// Phases run strictly in order and the first error ends the run. Nothing
/// touches the live table until the final swap, so a failed run leaves the
/// previous generation serving and can be resumed from the failed phase.
pub struct Pipeline<S: Session> {
    session: S,
    loader: Loader,
    conflict: Conflict,
    neighbors: NonZeroU32,
}

impl<S: Session> Pipeline<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            loader: Loader::default(),
            conflict: Conflict::Ignore,
            neighbors: crate::DEFAULT_NEIGHBORS,
        }
    }
    pub fn loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }
    pub fn conflict(mut self, conflict: Conflict) -> Self {
        self.conflict = conflict;
        self
    }
    pub fn neighbors(mut self, neighbors: NonZeroU32) -> Self {
        self.neighbors = neighbors;
        self
    }
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Creates both role tables if absent.
    pub async fn schema(&self) -> Result<()> {
        log::info!("ensuring {} and {}", TABLE_PREPARE, TABLE_READY);
        let statements = Role::all().map(|role| role.creates());
        atomically(&self.session, &statements)
            .await
            .map_err(|fault| {
                log::error!("schema creation rolled back: {}", fault);
                Error::ddl("schema", fault)
            })
    }

    /// Empties staging and loads `centroids` into it.
    pub async fn stage(&self, centroids: &[Centroid]) -> Result<u64> {
        atomically(&self.session, &[Role::Prepare.truncates()])
            .await
            .map_err(|fault| Error::load(TABLE_PREPARE, fault))?;
        self.loader
            .load(&self.session, centroids, Role::Prepare, &self.conflict)
            .await
    }

    /// Runs every phase from `from` onwards. `raws` is only read when the
    /// load phase runs.
    pub async fn cycle(&self, raws: Vec<RawRecord>, from: Phase) -> Result<()> {
        log::info!("refresh cycle starting at {} phase", from);
        if from <= Phase::Schema {
            self.schema().await?;
        }
        if from <= Phase::Load {
            let (centroids, _) = transform(raws);
            self.stage(&centroids).await?;
        }
        if from <= Phase::Provision {
            self.session.provision(Role::Prepare, self.neighbors).await?;
        }
        let staged = self.session.staged().await?;
        log::info!("{} rows staged", staged);
        self.session.swap().await?;
        log::info!("refresh cycle complete");
        Ok(())
    }

    /// Reads the dataset at `path` when needed and runs [`cycle`](Self::cycle).
    pub async fn run(&self, path: &Path, from: Phase) -> Result<()> {
        let raws = match from {
            Phase::Schema | Phase::Load => crate::source::open(path)?,
            Phase::Provision | Phase::Swap => Vec::new(),
        };
        self.cycle(raws, from).await
    }
}
