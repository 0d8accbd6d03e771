//! Fluent query construction.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::model::Model;
use crate::core::schema::Schema;
use crate::core::value::Value;
use crate::error::{Error, Result};
use crate::session::Db;

/// Compile a SELECT statement from AND-conjoined predicate fragments.
pub(crate) fn compile_select(table: &str, fragments: &[String]) -> String {
    let mut sql = format!("SELECT * FROM {table}");
    if !fragments.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&fragments.join(" AND "));
    }
    sql
}

/// Fluent accumulator of predicate fragments and positional parameters,
/// compiling to a SELECT (or delegating a create).
///
/// Obtained from [`Db::model`]. Single-use: the terminal calls (`find`,
/// `first`, `create`) consume the builder.
///
/// ```ignore
/// let mut adults = Vec::new();
/// db.model::<User>()
///     .filter("age >= ?", params![18])
///     .find(&mut adults)
///     .await?;
/// ```
pub struct QueryBuilder<'a, T: Model> {
    db: &'a Db,
    schema: Arc<Schema>,
    fragments: Vec<String>,
    params: Vec<Value>,
    _model: PhantomData<fn() -> T>,
}

impl<'a, T: Model + 'static> QueryBuilder<'a, T> {
    pub(crate) fn new(db: &'a Db) -> Self {
        let schema = db.registry().describe::<T>();
        Self {
            db,
            schema,
            fragments: Vec::new(),
            params: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Append a raw condition fragment and its positional parameters.
    ///
    /// Multiple calls are conjoined with AND in call order. The fragment is
    /// trusted SQL text (named `filter` because `where` is a reserved
    /// word); only the parameters are safely bound. The
    /// builder does not verify that placeholder and parameter counts match;
    /// mismatches surface as a driver error at execution.
    #[must_use]
    pub fn filter(mut self, fragment: impl Into<String>, params: Vec<Value>) -> Self {
        self.fragments.push(fragment.into());
        self.params.extend(params);
        self
    }

    /// Execute the accumulated SELECT and append every matching row to
    /// `dest`.
    ///
    /// On a mid-stream failure, rows bound before the error remain in
    /// `dest` (see [`Db::find`] for the contract).
    pub async fn find(self, dest: &mut Vec<T>) -> Result<()> {
        let sql = compile_select(&self.schema.table, &self.fragments);
        crate::executor::select_into(self.db.connection(), &self.schema, &sql, &self.params, dest)
            .await
    }

    /// Execute the accumulated SELECT with `LIMIT 1` and return the single
    /// matching record, or [`Error::NotFound`].
    pub async fn first(self) -> Result<T> {
        let mut sql = compile_select(&self.schema.table, &self.fragments);
        sql.push_str(" LIMIT 1");

        let mut rows: Vec<T> = Vec::with_capacity(1);
        crate::executor::select_into(
            self.db.connection(),
            &self.schema,
            &sql,
            &self.params,
            &mut rows,
        )
        .await?;
        rows.pop().ok_or(Error::NotFound)
    }

    /// Insert a record using the builder's schema. Accumulated predicates
    /// do not apply to inserts.
    pub async fn create(self, record: &mut T) -> Result<()> {
        crate::executor::create(
            self.db.connection(),
            &self.schema,
            self.db.exec_timeout(),
            record,
        )
        .await
    }
}
