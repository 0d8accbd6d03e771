//! SQLite driver implementation.
//!
//! Implements the [`Connection`] trait over a SQLx connection pool. SQLite
//! uses `?` placeholders natively and reports generated keys through
//! `last_insert_rowid`, so it maps onto the executor without translation.
//! In-memory URLs (`sqlite::memory:`) make it the natural test backend.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::info;

use crate::config::DbConfig;
use crate::core::traits::{Connection, ExecResult, ResultSet, Row};
use crate::core::value::Value;
use crate::error::{Error, Result};

/// SQLite-backed [`Connection`].
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Create a pool from configuration and verify it with a smoke query.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| Error::connection("parsing SQLite URL", e))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(|e| Error::connection("creating SQLite pool", e))?;

        // Test connection
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| Error::connection("testing SQLite connection", e))?;

        info!(url = %config.url, "Connected to SQLite");

        Ok(Self { pool })
    }
}

/// Whether a statement can produce a generated rowid.
///
/// SQLite's `last_insert_rowid` is connection-sticky: it keeps reporting
/// the most recent INSERT on the pooled connection even after unrelated
/// statements, so the value is only surfaced for statements that insert.
fn reports_generated_id(sql: &str) -> bool {
    let keyword = sql.split_whitespace().next().unwrap_or("");
    keyword.eq_ignore_ascii_case("INSERT") || keyword.eq_ignore_ascii_case("REPLACE")
}

/// Bind dynamic values onto a prepared query in positional order.
fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<i64>),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::Bytes(v) => query.bind(v.as_slice()),
        };
    }
    query
}

/// Convert a SQLite row to a value vector, by declared column type.
fn decode_row(row: &SqliteRow) -> Vec<Value> {
    (0..row.len())
        .map(|i| {
            let Ok(raw) = row.try_get_raw(i) else {
                return Value::Null;
            };
            if raw.is_null() {
                return Value::Null;
            }

            match raw.type_info().name() {
                "INTEGER" => row
                    .try_get::<i64, _>(i)
                    .map(Value::Int)
                    .unwrap_or(Value::Null),
                "BOOLEAN" => row
                    .try_get::<bool, _>(i)
                    .map(Value::Bool)
                    .unwrap_or(Value::Null),
                "REAL" | "NUMERIC" => row
                    .try_get::<f64, _>(i)
                    .map(Value::Float)
                    .unwrap_or(Value::Null),
                "BLOB" => row
                    .try_get::<Vec<u8>, _>(i)
                    .map(Value::Bytes)
                    .unwrap_or(Value::Null),

                // TEXT, plus date/time declarations, come back as text.
                _ => row
                    .try_get::<String, _>(i)
                    .map(Value::Text)
                    .unwrap_or(Value::Null),
            }
        })
        .collect()
}

#[async_trait]
impl Connection for SqliteDriver {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let query = bind_params(sqlx::query(sql), params);
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| Error::query(sql, e))?;

        let last = result.last_insert_rowid();
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: (reports_generated_id(sql) && last != 0).then_some(last),
        })
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<ResultSet> {
        let (tx, rs) = ResultSet::channel();
        let pool = self.pool.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::spawn(async move {
            let query = bind_params(sqlx::query(&sql), &params);
            let mut stream = query.fetch(&pool);
            let mut columns: Option<Arc<Vec<String>>> = None;

            while let Some(item) = stream.next().await {
                let message = match item {
                    Ok(row) => {
                        let cols = columns.get_or_insert_with(|| {
                            Arc::new(row.columns().iter().map(|c| c.name().to_string()).collect())
                        });
                        Ok(Row {
                            columns: Arc::clone(cols),
                            values: decode_row(&row),
                        })
                    }
                    Err(e) => Err(Error::query(sql.clone(), e)),
                };

                let is_err = message.is_err();
                if tx.send(message).await.is_err() || is_err {
                    break;
                }
            }
        });

        Ok(rs)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::connection("pinging SQLite", e))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DbConfig {
        let mut config = DbConfig::new("sqlite::memory:");
        // Every pooled connection to :memory: sees its own database.
        config.max_connections = 1;
        config
    }

    #[test]
    fn test_reports_generated_id_by_leading_keyword() {
        assert!(reports_generated_id("INSERT INTO t (a) VALUES (?)"));
        assert!(reports_generated_id("insert into t (a) values (?)"));
        assert!(reports_generated_id("REPLACE INTO t (a) VALUES (?)"));
        assert!(!reports_generated_id("UPDATE t SET a = ?"));
        assert!(!reports_generated_id("DELETE FROM t"));
        assert!(!reports_generated_id(""));
    }

    #[tokio::test]
    async fn test_non_insert_statement_reports_no_generated_id() {
        let driver = SqliteDriver::connect(&memory_config()).await.unwrap();
        driver
            .execute(
                "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, a INTEGER)",
                &[],
            )
            .await
            .unwrap();

        let insert = driver
            .execute("INSERT INTO t (a) VALUES (?)", &[Value::Int(1)])
            .await
            .unwrap();
        assert_eq!(insert.last_insert_id, Some(1));

        // The sticky rowid from the INSERT above must not leak out of the
        // UPDATE on the same connection.
        let update = driver
            .execute("UPDATE t SET a = ?", &[Value::Int(2)])
            .await
            .unwrap();
        assert_eq!(update.rows_affected, 1);
        assert_eq!(update.last_insert_id, None);

        driver.close().await;
    }
}
