//! In-memory stand-in for the store, used by unit tests.
//!
//! Interprets exactly the statement shapes this crate emits: table and index
//! DDL, renames, truncation, function installs, inserts and catalog counts.
//! `BEGIN` snapshots the catalog and `ROLLBACK` restores it, which is enough
//! to observe transactional behavior. A statement containing the configured
//! pattern fails without touching state.
use crate::error::Fault;
use crate::session::Session;
use crate::schema::Column;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, Default)]
struct State {
    tables: BTreeMap<String, Vec<String>>,
    geog: BTreeSet<String>,
    indexes: BTreeMap<String, String>,
    functions: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    snapshot: Option<State>,
    statements: Vec<String>,
    commits: usize,
    rollbacks: usize,
    fail: Option<(String, &'static str)>,
    inserted: usize,
}

#[derive(Debug, Default)]
pub struct Catalog {
    inner: Mutex<Inner>,
}

impl Catalog {
    pub fn with_table(self, name: &str, rows: &[&str]) -> Self {
        self.lock()
            .state
            .tables
            .insert(name.to_owned(), rows.iter().map(|r| r.to_string()).collect());
        self
    }
    pub fn with_index(self, index: &str, table: &str) -> Self {
        self.lock()
            .state
            .indexes
            .insert(index.to_owned(), table.to_owned());
        self
    }
    pub fn failing(self, pattern: &str) -> Self {
        self.failing_with(pattern, "XX000")
    }
    pub fn failing_with(self, pattern: &str, code: &'static str) -> Self {
        self.lock().fail = Some((pattern.to_owned(), code));
        self
    }
    pub fn heal(&self) {
        self.lock().fail = None;
    }
    pub fn has_table(&self, name: &str) -> bool {
        self.lock().state.tables.contains_key(name)
    }
    pub fn rows(&self, table: &str) -> Option<Vec<String>> {
        self.lock().state.tables.get(table).cloned()
    }
    pub fn has_geog(&self, table: &str) -> bool {
        self.lock().state.geog.contains(table)
    }
    pub fn index(&self, index: &str) -> Option<String> {
        self.lock().state.indexes.get(index).cloned()
    }
    pub fn indexes(&self) -> usize {
        self.lock().state.indexes.len()
    }
    pub fn function(&self, name: &str) -> Option<String> {
        self.lock().state.functions.get(name).cloned()
    }
    pub fn functions(&self) -> usize {
        self.lock().state.functions.len()
    }
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }
    pub fn commits(&self) -> usize {
        self.lock().commits
    }
    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }
    /// Rows received by INSERT statements, committed or not.
    pub fn inserted(&self) -> usize {
        self.lock().inserted
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("catalog lock")
    }

    fn run(&self, sql: &str, params: usize) -> Result<i64, Fault> {
        let mut inner = self.lock();
        inner.statements.push(sql.to_owned());
        if let Some((ref pattern, code)) = inner.fail {
            if sql.contains(pattern.as_str()) {
                return Err(Fault::new(Some(code), format!("injected failure: {}", sql)));
            }
        }
        let tokens = sql.split_whitespace().collect::<Vec<_>>();
        match tokens.as_slice() {
            ["BEGIN"] => {
                inner.snapshot = Some(inner.state.clone());
                Ok(0)
            }
            ["COMMIT"] => {
                inner.snapshot = None;
                inner.commits += 1;
                Ok(0)
            }
            ["ROLLBACK"] => {
                if let Some(snapshot) = inner.snapshot.take() {
                    inner.state = snapshot;
                }
                inner.rollbacks += 1;
                Ok(0)
            }
            ["INSERT", "INTO", table, ..] => {
                let rows = params / Column::ALL.len();
                inner.inserted += rows;
                let state = &mut inner.state;
                let table = existing(state, table)?;
                table.extend((0..rows).map(|i| format!("row{}", i)));
                Ok(rows as i64)
            }
            tokens => apply(&mut inner.state, tokens),
        }
    }
}

fn existing<'s>(state: &'s mut State, table: &str) -> Result<&'s mut Vec<String>, Fault> {
    state
        .tables
        .get_mut(table)
        .ok_or_else(|| Fault::new(Some("42P01"), format!("relation \"{}\" does not exist", table)))
}

fn apply(state: &mut State, tokens: &[&str]) -> Result<i64, Fault> {
    match tokens {
        ["CREATE", "TABLE", "IF", "NOT", "EXISTS", table, ..] => {
            state.tables.entry(table.to_string()).or_default();
            Ok(0)
        }
        ["TRUNCATE", "TABLE", table] => {
            existing(state, table)?.clear();
            Ok(0)
        }
        ["DROP", "INDEX", "IF", "EXISTS", index] => {
            state.indexes.remove(*index);
            Ok(0)
        }
        ["ALTER", "TABLE", from, "RENAME", "TO", to] => {
            if state.tables.contains_key(*to) {
                return Err(Fault::new(Some("42P07"), format!("relation \"{}\" already exists", to)));
            }
            let rows = std::mem::take(existing(state, from)?);
            state.tables.remove(*from);
            state.tables.insert(to.to_string(), rows);
            if state.geog.remove(*from) {
                state.geog.insert(to.to_string());
            }
            for table in state.indexes.values_mut().filter(|t| t.as_str() == *from) {
                *table = to.to_string();
            }
            Ok(0)
        }
        ["ALTER", "INDEX", from, "RENAME", "TO", to] => {
            if state.indexes.contains_key(*to) {
                return Err(Fault::new(Some("42P07"), format!("relation \"{}\" already exists", to)));
            }
            let table = state
                .indexes
                .remove(*from)
                .ok_or_else(|| Fault::new(Some("42P01"), format!("relation \"{}\" does not exist", from)))?;
            state.indexes.insert(to.to_string(), table);
            Ok(0)
        }
        ["ALTER", "TABLE", table, "ADD", "COLUMN", "IF", "NOT", "EXISTS", "geog", ..] => {
            existing(state, table)?;
            state.geog.insert(table.to_string());
            Ok(0)
        }
        ["UPDATE", table, "SET", "geog", ..] => {
            existing(state, table)?;
            if !state.geog.contains(*table) {
                return Err(Fault::new(Some("42703"), "column \"geog\" does not exist"));
            }
            Ok(0)
        }
        ["CREATE", "INDEX", "IF", "NOT", "EXISTS", index, "ON", table, ..] => {
            existing(state, table)?;
            state
                .indexes
                .entry(index.to_string())
                .or_insert_with(|| table.to_string());
            Ok(0)
        }
        ["CREATE", "OR", "REPLACE", "FUNCTION", signature, ..] => {
            let name = signature.split('(').next().unwrap_or(*signature);
            state
                .functions
                .insert(name.to_owned(), tokens.join(" "));
            Ok(0)
        }
        ["SELECT", "COUNT(*)", "FROM", "pg_tables", "WHERE", "tablename", "=", name] => {
            Ok(state.tables.contains_key(unquote(name)) as i64)
        }
        ["SELECT", "COUNT(*)", "FROM", "pg_indexes", "WHERE", "indexname", "=", name] => {
            Ok(state.indexes.contains_key(unquote(name)) as i64)
        }
        ["SELECT", "COUNT(*)", "FROM", "pg_proc", "WHERE", "proname", "=", name] => {
            Ok(state.functions.contains_key(unquote(name)) as i64)
        }
        ["SELECT", "COUNT(*)", "FROM", table] => Ok(existing(state, table)?.len() as i64),
        _ => Err(Fault::new(Some("42601"), format!("unsupported statement: {}", tokens.join(" ")))),
    }
}

fn unquote(name: &str) -> &str {
    name.trim_matches('\'')
}

#[async_trait::async_trait]
impl Session for Catalog {
    async fn batch(&self, sql: &str) -> Result<(), Fault> {
        self.run(sql, 0).map(|_| ())
    }
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, Fault> {
        self.run(sql, params.len()).map(|n| n as u64)
    }
    async fn scalar(&self, sql: &str) -> Result<i64, Fault> {
        self.run(sql, 0)
    }
}
