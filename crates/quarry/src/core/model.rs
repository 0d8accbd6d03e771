//! The record-type contract.

use std::collections::HashMap;

use crate::core::value::Value;
use crate::error::Result;

/// Static descriptor of one struct member, as emitted by `#[derive(Model)]`
/// (or written by hand).
///
/// The schema registry turns a type's `FieldSpec` table into a cached
/// [`Schema`](crate::Schema); `skip` entries are excluded from persistence
/// entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// The struct member name (logical name).
    pub name: &'static str,
    /// Explicit column-name override from `#[orm(column = "...")]`.
    pub column: Option<&'static str>,
    /// Whether the member is excluded from persistence (`#[orm(skip)]`).
    pub skip: bool,
}

/// Contract a persisted record type fulfills.
///
/// Usually generated by `#[derive(Model)]`; a manual implementation works
/// the same way and is occasionally useful for types whose columns do not
/// map one-to-one onto members.
///
/// `Default` supplies the zero value for members whose columns are missing
/// from a result set.
pub trait Model: Default + Send {
    /// The type's name, used for table-name derivation (`User` -> `users`).
    const NAME: &'static str;

    /// Member table in declaration order.
    const FIELDS: &'static [FieldSpec];

    /// Extract the current member values keyed by logical name.
    ///
    /// Write paths only; the [`Schema`](crate::Schema) fixes column naming
    /// and ordering afterward. Members absent from the map are omitted from
    /// INSERT statements rather than written as NULL, so an implementation
    /// may leave out members it considers unset.
    fn values(&self) -> HashMap<&'static str, Value>;

    /// Set the member with the given logical name from a column value.
    ///
    /// Unknown names are ignored (the binder already filters through the
    /// schema); conversion failures surface as [`Error::Bind`](crate::Error).
    fn put(&mut self, field: &str, value: Value) -> Result<()>;

    /// Receive the store-generated identifier after a successful insert.
    ///
    /// Returns `true` if the id was assigned to a member. The default
    /// implementation assigns nothing; `#[derive(Model)]` overrides it for
    /// the `#[orm(id)]` field.
    fn assign_generated_id(&mut self, _id: i64) -> bool {
        false
    }
}
