//! Command line configuration for the `refresh` binary.
use crate::Check;
use crate::Column;
use crate::Conflict;
use crate::Loader;
use crate::Lookup;
use crate::Metric;
use crate::Phase;
use crate::Pipeline;
use crate::Role;
use crate::Spatial;
use clap::Parser;
use clap::Subcommand;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// PostgreSQL connection string.
    #[arg(long, env = "DB_URL", hide_env_values = true)]
    pub db_url: String,
    /// Seconds allowed to reach the store.
    #[arg(long, env = "CONNECT_TIMEOUT", default_value_t = crate::CONNECT_TIMEOUT.as_secs())]
    pub connect_timeout: u64,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Load a snapshot into staging and promote it to live")]
    Refresh {
        /// Dataset CSV.
        #[arg(long, env = "ONSPD_FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = crate::DEFAULT_NEIGHBORS)]
        neighbors: NonZeroU32,
        /// Phase to resume from after a failed run.
        #[arg(long, value_enum, default_value_t = Phase::Schema)]
        from: Phase,
        #[arg(long, value_enum, default_value_t = Policy::Ignore)]
        conflict: Policy,
        /// Columns overwritten on upsert. Defaults to every non-key column.
        #[arg(long, value_enum, num_args = 1..)]
        update: Vec<Column>,
        #[arg(long, default_value_t = crate::ROWS_PER_STATEMENT)]
        rows_per_statement: usize,
    },
    #[command(about = "Reinstall the query functions and any missing live index")]
    Provision {
        #[arg(long, default_value_t = crate::DEFAULT_NEIGHBORS)]
        neighbors: NonZeroU32,
    },
    #[command(about = "Report both role tables and the live spatial assets")]
    Status,
    #[command(about = "Query the closest places to a point", alias = "nn")]
    Nearest {
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, value_enum, default_value_t = Metric::Geodesic)]
        metric: Metric,
    },
}

/// Conflict policy as chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Policy {
    Ignore,
    Upsert,
}

impl Policy {
    fn conflict(self, update: Vec<Column>) -> Conflict {
        match self {
            Self::Ignore => Conflict::Ignore,
            Self::Upsert if update.is_empty() => Conflict::upsert(Column::values()),
            Self::Upsert => Conflict::upsert(update),
        }
    }
}

impl Args {
    pub async fn run(self) -> anyhow::Result<()> {
        let timeout = Duration::from_secs(self.connect_timeout);
        let client = crate::connect(&self.db_url, timeout).await?;
        match self.command {
            Command::Refresh {
                file,
                neighbors,
                from,
                conflict,
                update,
                rows_per_statement,
            } => {
                Pipeline::new(client)
                    .loader(Loader::new(rows_per_statement))
                    .conflict(conflict.conflict(update))
                    .neighbors(neighbors)
                    .run(&file, from)
                    .await?
            }
            Command::Provision { neighbors } => client.provision(Role::Ready, neighbors).await?,
            Command::Status => client.status().await?.log(),
            Command::Nearest { lon, lat, metric } => {
                for place in client.nearest(metric, lon, lat).await? {
                    println!("{}", serde_json::to_string(&place)?);
                }
            }
        }
        Ok(())
    }
}
