//! Database driver implementations.
//!
//! Each driver implements [`Connection`](crate::Connection) over a SQLx
//! pool for one `?`-placeholder backend:
//!
//! - [`sqlite`]: SQLite (also the embedded test backend)
//! - [`mysql`]: MySQL/MariaDB
//!
//! PostgreSQL is deliberately absent: its `$n` placeholders would require a
//! dialect layer this crate does not carry.

pub mod mysql;
pub mod sqlite;

pub use mysql::MysqlDriver;
pub use sqlite::SqliteDriver;

use std::sync::Arc;

use crate::config::DbConfig;
use crate::core::traits::Connection;
use crate::error::{Error, Result};

/// Create a driver from a configuration, dispatching on the URL scheme.
///
/// # Errors
///
/// Returns a Config error if the scheme is not recognized.
pub async fn connect(config: &DbConfig) -> Result<Arc<dyn Connection>> {
    let scheme = config.url.split(':').next().unwrap_or("");
    match scheme {
        "sqlite" => Ok(Arc::new(SqliteDriver::connect(config).await?)),
        "mysql" => Ok(Arc::new(MysqlDriver::connect(config).await?)),
        other => Err(Error::Config(format!(
            "Unknown database URL scheme: '{other}'. Supported schemes: sqlite, mysql"
        ))),
    }
}
