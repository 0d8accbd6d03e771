//! MySQL/MariaDB driver implementation.
//!
//! Implements the [`Connection`] trait over a SQLx connection pool. MySQL
//! uses `?` placeholders and reports generated keys through
//! `last_insert_id`. Temporal columns are decoded via chrono and carried as
//! text, since the value model deliberately stays at the storage classes
//! shared by the supported backends.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use tracing::info;

use crate::config::DbConfig;
use crate::core::traits::{Connection, ExecResult, ResultSet, Row};
use crate::core::value::Value;
use crate::error::{Error, Result};

/// MySQL/MariaDB-backed [`Connection`].
pub struct MysqlDriver {
    pool: MySqlPool,
}

impl MysqlDriver {
    /// Create a pool from configuration and verify it with a smoke query.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let options = MySqlConnectOptions::from_str(&config.url)
            .map_err(|e| Error::connection("parsing MySQL URL", e))?;

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(|e| Error::connection("creating MySQL pool", e))?;

        // Test connection
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| Error::connection("testing MySQL connection", e))?;

        info!(url = %config.url, "Connected to MySQL");

        Ok(Self { pool })
    }
}

/// Bind dynamic values onto a prepared query in positional order.
fn bind_params<'q>(
    mut query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    params: &'q [Value],
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
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

/// Convert a MySQL row to a value vector, by column type.
fn decode_row(row: &MySqlRow) -> Vec<Value> {
    (0..row.len())
        .map(|i| {
            let Ok(raw) = row.try_get_raw(i) else {
                return Value::Null;
            };
            if raw.is_null() {
                return Value::Null;
            }

            match raw.type_info().name() {
                // Integer types (unsigned variants report a suffixed name)
                n if n.ends_with("UNSIGNED") => row
                    .try_get::<u64, _>(i)
                    .map(|v| Value::Int(v as i64))
                    .unwrap_or(Value::Null),
                "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" | "BIGINT" | "YEAR" => {
                    row.try_get::<i64, _>(i)
                        .map(Value::Int)
                        .unwrap_or(Value::Null)
                }

                // Floating point
                "FLOAT" => row
                    .try_get::<f32, _>(i)
                    .map(|v| Value::Float(v.into()))
                    .unwrap_or(Value::Null),
                "DOUBLE" => row
                    .try_get::<f64, _>(i)
                    .map(Value::Float)
                    .unwrap_or(Value::Null),

                // Boolean
                "BOOLEAN" | "BOOL" | "BIT" => row
                    .try_get::<bool, _>(i)
                    .map(Value::Bool)
                    .unwrap_or(Value::Null),

                // Date/time types, carried as text
                "DATE" => row
                    .try_get::<chrono::NaiveDate, _>(i)
                    .map(|v| Value::Text(v.to_string()))
                    .unwrap_or(Value::Null),
                "TIME" => row
                    .try_get::<chrono::NaiveTime, _>(i)
                    .map(|v| Value::Text(v.to_string()))
                    .unwrap_or(Value::Null),
                "DATETIME" => row
                    .try_get::<chrono::NaiveDateTime, _>(i)
                    .map(|v| Value::Text(v.to_string()))
                    .unwrap_or(Value::Null),
                "TIMESTAMP" => row
                    .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                    .map(|v| Value::Text(v.to_rfc3339()))
                    .unwrap_or(Value::Null),

                // Binary types
                "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
                    .try_get::<Vec<u8>, _>(i)
                    .map(Value::Bytes)
                    .unwrap_or(Value::Null),

                // Strings, enums, JSON, and anything else falls back to text
                _ => row
                    .try_get::<String, _>(i)
                    .map(Value::Text)
                    .unwrap_or(Value::Null),
            }
        })
        .collect()
}

#[async_trait]
impl Connection for MysqlDriver {
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        let query = bind_params(sqlx::query(sql), params);
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| Error::query(sql, e))?;

        // Unlike SQLite's sticky rowid, the OK packet carries a
        // per-statement value; non-inserts report 0 and are filtered here.
        let last = result.last_insert_id();
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: (last != 0).then_some(last as i64),
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
            .map_err(|e| Error::connection("pinging MySQL", e))?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend(&self) -> &'static str {
        "mysql"
    }
}
