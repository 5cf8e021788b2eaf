use crate::error::*;
use crate::record::*;
use crate::role::*;
use crate::schema::*;
use crate::session::*;
use std::collections::HashMap;

/// What happens when an incoming row's key already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// Keep the existing row; drop the incoming one.
    Ignore,
    /// Overwrite `update` columns of the existing row from the incoming one.
    Upsert { key: Column, update: Vec<Column> },
}

impl Conflict {
    /// Upsert on the primary key.
    pub fn upsert(update: Vec<Column>) -> Self {
        Self::Upsert {
            key: Column::ObjectId,
            update,
        }
    }
    fn clause(&self) -> String {
        match self {
            Self::Ignore => " ON CONFLICT DO NOTHING".to_owned(),
            Self::Upsert { key, update } if update.is_empty() => {
                format!(" ON CONFLICT ({}) DO NOTHING", key)
            }
            Self::Upsert { key, update } => format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                key,
                update
                    .iter()
                    .map(|c| format!("{c} = EXCLUDED.{c}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Multi-row INSERT loader.
///
/// Records are bound as parameters, `rows` per statement, so no statement
/// exceeds the store's bind-parameter limit. Every statement of one
/// [`load`](Loader::load) call runs in a single transaction.
#[derive(Debug, Clone, Copy)]
pub struct Loader {
    rows: usize,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(crate::ROWS_PER_STATEMENT)
    }
}

impl Loader {
    /// Largest chunk whose parameters fit in one statement.
    pub const MAX_ROWS: usize = crate::MAX_BIND_PARAMS / Column::ALL.len();

    pub fn new(rows: usize) -> Self {
        Self {
            rows: rows.clamp(1, Self::MAX_ROWS),
        }
    }
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// INSERT text for `n` rows into `role`'s table.
    pub fn statement(&self, role: Role, conflict: &Conflict, n: usize) -> String {
        let width = Column::ALL.len();
        let values = (0..n)
            .map(|row| {
                let slots = (1..=width)
                    .map(|col| format!("${}", row * width + col))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("({})", slots)
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES {}{}",
            role.table(),
            COLUMNS,
            values,
            conflict.clause()
        )
    }

    /// Loads `records` into `role`'s table, all or nothing.
    ///
    /// Commits before returning `Ok` with the number of rows the store
    /// reports as written. On any failure the transaction is rolled back
    /// and nothing from this call remains.
    pub async fn load<S>(
        &self,
        session: &S,
        records: &[Centroid],
        role: Role,
        conflict: &Conflict,
    ) -> Result<u64>
    where
        S: Session + ?Sized,
    {
        if records.is_empty() {
            return Ok(0);
        }
        let table = role.table();
        let merged;
        let rows: Vec<&Centroid> = match conflict {
            Conflict::Ignore => records.iter().collect(),
            Conflict::Upsert { update, .. } => {
                merged = collapse(records, update);
                merged.iter().collect()
            }
        };
        log::info!(
            "loading {} rows into {} ({} per statement)",
            rows.len(),
            table,
            self.rows
        );
        session.begin().await.map_err(|f| Error::load(table, f))?;
        let full = self.statement(role, conflict, self.rows);
        let mut written = 0;
        for (i, chunk) in rows.chunks(self.rows).enumerate() {
            let partial;
            let sql = if chunk.len() == self.rows {
                &full
            } else {
                partial = self.statement(role, conflict, chunk.len());
                &partial
            };
            let params = chunk
                .iter()
                .copied()
                .flat_map(Centroid::params)
                .collect::<Vec<_>>();
            match session.execute(sql, &params).await {
                Ok(n) => written += n,
                Err(fault) => {
                    log::error!("load into {} failed at chunk {}: {}", table, i, fault);
                    release(session).await;
                    return Err(Error::load(table, fault));
                }
            }
            log::debug!("chunk {} written ({} rows)", i, chunk.len());
        }
        if let Err(fault) = session.commit().await {
            log::error!("load into {} failed at commit: {}", table, fault);
            release(session).await;
            return Err(Error::load(table, fault));
        }
        log::info!("loaded {} rows into {}", written, table);
        Ok(written)
    }
}

/// Folds repeated keys into their first occurrence, which takes each
/// `update` column from every later duplicate in order. One statement then
/// never upserts the same row twice, and the result matches applying the
/// duplicates one after another.
fn collapse(records: &[Centroid], update: &[Column]) -> Vec<Centroid> {
    let mut slots = HashMap::<i32, usize>::new();
    let mut rows = Vec::<Centroid>::with_capacity(records.len());
    for record in records {
        match record.id.and_then(|id| slots.get(&id).copied()) {
            Some(slot) => {
                for &column in update {
                    rows[slot].assign(column, record);
                }
            }
            None => {
                if let Some(id) = record.id {
                    slots.insert(id, rows.len());
                }
                rows.push(record.clone());
            }
        }
    }
    rows
}
