//! Database session facade.
//!
//! [`Db`] owns a driver connection, a schema cache, and the write timeout,
//! and exposes the CRUD surface. It is cheap to clone; clones share the
//! underlying pool and cache.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::DbConfig;
use crate::core::model::Model;
use crate::core::schema::SchemaRegistry;
use crate::core::traits::{Connection, ExecResult, ResultSet};
use crate::core::value::Value;
use crate::error::Result;
use crate::executor;
use crate::query::QueryBuilder;

/// Handle to an open database.
///
/// ```no_run
/// # use quarry::{Db, Result};
/// # async fn demo() -> Result<()> {
/// let db = Db::connect("sqlite:app.db").await?;
/// db.ping().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Db {
    conn: Arc<dyn Connection>,
    registry: SchemaRegistry,
    exec_timeout: Duration,
}

impl Db {
    /// Open a database from a URL with default settings.
    pub async fn connect(url: impl Into<String>) -> Result<Self> {
        Self::connect_with(DbConfig::new(url)).await
    }

    /// Open a database from a full configuration.
    pub async fn connect_with(config: DbConfig) -> Result<Self> {
        config.validate()?;
        let conn = crate::drivers::connect(&config).await?;
        info!(backend = conn.backend(), "database session opened");
        Ok(Self {
            conn,
            registry: SchemaRegistry::default(),
            exec_timeout: config.exec_timeout(),
        })
    }

    /// Build a session over an already-open connection.
    ///
    /// Intended for custom [`Connection`] implementations; URL-based setup
    /// should go through [`Db::connect`].
    pub fn new(conn: Arc<dyn Connection>) -> Self {
        Self {
            conn,
            registry: SchemaRegistry::default(),
            exec_timeout: DbConfig::default_exec_timeout(),
        }
    }

    pub(crate) fn connection(&self) -> &dyn Connection {
        self.conn.as_ref()
    }

    pub(crate) fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub(crate) fn exec_timeout(&self) -> Duration {
        self.exec_timeout
    }

    /// Start a query chain for a model type.
    pub fn model<T: Model + 'static>(&self) -> QueryBuilder<'_, T> {
        QueryBuilder::new(self)
    }

    /// Insert a record. On success a driver-generated identifier is written
    /// back into the record's id member, when it has one.
    pub async fn create<T: Model + 'static>(&self, record: &mut T) -> Result<()> {
        let schema = self.registry.describe::<T>();
        executor::create(self.connection(), &schema, self.exec_timeout, record).await
    }

    /// Load every row of the model's table into `dest`, appending.
    ///
    /// If the row stream fails part way through, rows already bound stay in
    /// `dest` and the error is returned; callers that need all-or-nothing
    /// should pass a fresh vector and drop it on error.
    pub async fn find<T: Model + 'static>(&self, dest: &mut Vec<T>) -> Result<()> {
        let schema = self.registry.describe::<T>();
        executor::find(self.connection(), &schema, dest).await
    }

    /// Load the first row matching a WHERE clause, or [`Error::NotFound`].
    ///
    /// `where_clause` is literal SQL including the `WHERE` keyword; only
    /// `params` are bound safely.
    ///
    /// [`Error::NotFound`]: crate::Error::NotFound
    pub async fn first<T: Model + 'static>(
        &self,
        where_clause: &str,
        params: &[Value],
    ) -> Result<T> {
        let schema = self.registry.describe::<T>();
        executor::first(self.connection(), &schema, where_clause, params).await
    }

    /// Update columns on rows matching a WHERE clause.
    ///
    /// `set` pairs are applied in the given order; keys are converted to
    /// column form by the naming convention. Returns the affected-row count.
    pub async fn update<T: Model + 'static>(
        &self,
        set: &[(&str, Value)],
        where_clause: &str,
        params: &[Value],
    ) -> Result<u64> {
        let schema = self.registry.describe::<T>();
        executor::update(
            self.connection(),
            &schema,
            self.exec_timeout,
            set,
            where_clause,
            params,
        )
        .await
    }

    /// Delete rows matching a WHERE clause. Returns the affected-row count.
    pub async fn delete<T: Model + 'static>(
        &self,
        where_clause: &str,
        params: &[Value],
    ) -> Result<u64> {
        let schema = self.registry.describe::<T>();
        executor::delete(self.connection(), &schema, self.exec_timeout, where_clause, params).await
    }

    /// Run an arbitrary query and stream its rows.
    pub async fn raw_query(&self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        executor::raw_query(self.connection(), sql, params).await
    }

    /// Run an arbitrary query bound to a cancellation token.
    ///
    /// Both query startup and the returned cursor observe the token: once
    /// it fires, the call (or a later `next`) yields
    /// [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn raw_query_cancellable(
        &self,
        sql: &str,
        params: &[Value],
        token: &CancellationToken,
    ) -> Result<ResultSet> {
        executor::raw_query_cancellable(self.connection(), sql, params, token).await
    }

    /// Run an arbitrary statement (DDL, bulk writes) without row results.
    pub async fn raw_exec(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        executor::raw_exec(self.connection(), sql, params).await
    }

    /// Check that the connection is alive.
    pub async fn ping(&self) -> Result<()> {
        self.conn.ping().await
    }

    /// Close the underlying pool. Other clones of this session observe the
    /// closure too.
    pub async fn close(&self) {
        self.conn.close().await;
        info!(backend = self.conn.backend(), "database session closed");
    }
}
