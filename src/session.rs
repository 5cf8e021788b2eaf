use crate::error::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::Client;
use tokio_postgres::types::ToSql;

/// Session is the explicit store handle every component receives.
///
/// It is the only path to the database: no component holds a connection
/// of its own. Transactions are opened and closed on the session with
/// [`begin`](Session::begin), [`commit`](Session::commit) and
/// [`rollback`](Session::rollback); prefer [`atomically`] which guarantees
/// the rollback on every failure path.
#[async_trait::async_trait]
pub trait Session: Send + Sync {
    /// Runs one or more statements through the simple query protocol.
    async fn batch(&self, sql: &str) -> std::result::Result<(), Fault>;
    /// Runs one parameterized statement, returning affected rows.
    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> std::result::Result<u64, Fault>;
    /// Runs a query whose first row's first column is a `BIGINT`.
    async fn scalar(&self, sql: &str) -> std::result::Result<i64, Fault>;

    async fn begin(&self) -> std::result::Result<(), Fault> {
        self.batch("BEGIN").await
    }
    async fn commit(&self) -> std::result::Result<(), Fault> {
        self.batch("COMMIT").await
    }
    async fn rollback(&self) -> std::result::Result<(), Fault> {
        self.batch("ROLLBACK").await
    }
}

#[async_trait::async_trait]
impl Session for Client {
    async fn batch(&self, sql: &str) -> std::result::Result<(), Fault> {
        self.batch_execute(sql).await.map_err(Fault::from)
    }
    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> std::result::Result<u64, Fault> {
        Client::execute(self, sql, params)
            .await
            .map_err(Fault::from)
    }
    async fn scalar(&self, sql: &str) -> std::result::Result<i64, Fault> {
        self.query_one(sql, &[])
            .await
            .and_then(|row| row.try_get::<_, i64>(0))
            .map_err(Fault::from)
    }
}

#[async_trait::async_trait]
impl Session for Arc<Client> {
    async fn batch(&self, sql: &str) -> std::result::Result<(), Fault> {
        self.as_ref().batch(sql).await
    }
    async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> std::result::Result<u64, Fault> {
        Session::execute(self.as_ref(), sql, params).await
    }
    async fn scalar(&self, sql: &str) -> std::result::Result<i64, Fault> {
        self.as_ref().scalar(sql).await
    }
}

/// Runs `statements` in order inside one transaction.
///
/// Commits only if every statement succeeds. Any failure rolls the whole
/// transaction back before the fault is returned, so no statement is ever
/// committed on its own.
pub async fn atomically<S>(session: &S, statements: &[&str]) -> std::result::Result<(), Fault>
where
    S: Session + ?Sized,
{
    session.begin().await?;
    for sql in statements {
        if let Err(fault) = session.batch(sql).await {
            release(session).await;
            return Err(fault);
        }
    }
    if let Err(fault) = session.commit().await {
        release(session).await;
        return Err(fault);
    }
    Ok(())
}

/// Rolls back after a failure. A failed rollback leaves the server to
/// abort the transaction itself, so it is only logged.
pub(crate) async fn release<S>(session: &S)
where
    S: Session + ?Sized,
{
    if let Err(fault) = session.rollback().await {
        log::error!("rollback failed: {}", fault);
    }
}

/// Establishes a database connection.
///
/// The connection task is spawned onto the current runtime and ends when
/// the returned client is dropped. Fails with [`Error::Connection`] if the
/// store cannot be reached within `timeout`.
pub async fn connect(url: &str, timeout: Duration) -> Result<Arc<Client>> {
    log::info!("connecting to database");
    let mut config = url
        .parse::<tokio_postgres::Config>()
        .map_err(|e| Error::Connection(e.to_string()))?;
    config.connect_timeout(timeout);
    let connecting = config.connect(tokio_postgres::tls::NoTls);
    let (client, connection) = tokio::time::timeout(timeout, connecting)
        .await
        .map_err(|_| Error::Connection(format!("timed out after {:?}", timeout)))?
        .map_err(|e| Error::Connection(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            log::error!("connection closed: {}", e);
        }
    });
    client
        .batch_execute("SET client_min_messages TO WARNING")
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;
    Ok(Arc::new(client))
}
