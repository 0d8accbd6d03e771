//! Core abstractions: the record contract, schema cache, value model,
//! connection trait, and row binder.
//!
//! Drivers (`crate::drivers`) implement [`traits::Connection`]; everything
//! else in this module is database-agnostic.

pub(crate) mod bind;
pub mod identifier;
pub mod model;
pub mod schema;
pub mod traits;
pub mod value;

pub use model::{FieldSpec, Model};
pub use schema::{Field, Schema, SchemaRegistry};
pub use traits::{Connection, ExecResult, ResultSet, Row};
pub use value::{FromValue, Value, ValueError};
