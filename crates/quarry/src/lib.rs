//! quarry is a small async ORM over SQLx for SQLite and MySQL.
//!
//! A struct becomes persistable by deriving [`Model`]: the derive records
//! the field layout at compile time, and the [`SchemaRegistry`] maps it to
//! a table using snake_case pluralization (`UserAccount` -> `user_accounts`)
//! with per-field overrides via `#[orm(column = "...")]`.
//!
//! ```no_run
//! use quarry::{params, Db, Model, Result};
//!
//! #[derive(Debug, Default, Model)]
//! struct User {
//!     #[orm(id)]
//!     id: i64,
//!     name: String,
//!     age: i64,
//! }
//!
//! async fn demo() -> Result<()> {
//!     let db = Db::connect("sqlite:app.db").await?;
//!
//!     let mut user = User {
//!         name: "Dybala".into(),
//!         age: 30,
//!         ..Default::default()
//!     };
//!     db.create(&mut user).await?; // user.id now holds the generated key
//!
//!     let mut adults = Vec::new();
//!     db.model::<User>()
//!         .filter("age >= ?", params![18])
//!         .find(&mut adults)
//!         .await?;
//!
//!     db.close().await;
//!     Ok(())
//! }
//! ```
//!
//! Values travel through `?` placeholders; WHERE clause text is trusted
//! caller SQL. Writes are bounded by a configurable timeout
//! ([`DbConfig::exec_timeout_secs`]), reads stream through a bounded
//! channel ([`ResultSet`]).

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod query;
pub mod session;

mod executor;

pub use config::DbConfig;
pub use crate::core::{
    Connection, ExecResult, Field, FieldSpec, FromValue, Model, ResultSet, Row, Schema,
    SchemaRegistry, Value, ValueError,
};
pub use error::{Error, Result};
pub use query::QueryBuilder;
pub use session::Db;

// The derive lives in the macro namespace and coexists with the trait
// re-export of the same name.
pub use quarry_derive::Model;

// Token type accepted by the cancellable query surface.
pub use tokio_util::sync::CancellationToken;
