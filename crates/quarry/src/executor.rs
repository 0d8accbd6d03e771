//! SQL assembly and execution for the CRUD operations.
//!
//! Values always travel through `?` placeholders. Identifiers (table and
//! column names) are interpolated from schema-derived strings; the only
//! caller-supplied SQL text is the literal WHERE clause of
//! `first`/`update`/`delete`. That clause is trusted: the caller must not
//! embed untrusted input there, only placeholder args are parameterized.

use std::future::Future;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::bind::bind_rows;
use crate::core::identifier::to_snake_case;
use crate::core::model::Model;
use crate::core::schema::Schema;
use crate::core::traits::{Connection, ExecResult, ResultSet};
use crate::core::value::Value;
use crate::error::{Error, Result};

/// Run a write operation under a wall-clock timeout.
async fn bounded<T>(
    fut: impl Future<Output = Result<T>>,
    timeout: Duration,
    operation: &'static str,
) -> Result<T> {
    match time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation,
            after: timeout,
        }),
    }
}

/// Insert a single record.
///
/// Schema fields absent from the extracted value map are omitted from the
/// column list rather than written as NULL (partial insert). On success a
/// driver-reported generated identifier is offered to the record; records
/// without an assignable id member skip it silently.
pub(crate) async fn create<T: Model>(
    conn: &dyn Connection,
    schema: &Schema,
    timeout: Duration,
    record: &mut T,
) -> Result<()> {
    let mut extracted = record.values();

    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut values = Vec::new();

    for field in &schema.fields {
        if let Some(value) = extracted.remove(field.name) {
            columns.push(field.column.as_str());
            placeholders.push("?");
            values.push(value);
        }
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        schema.table,
        columns.join(", "),
        placeholders.join(", ")
    );
    debug!(sql = %sql, "executing insert");

    let result = bounded(conn.execute(&sql, &values), timeout, "create").await?;

    if let Some(id) = result.last_insert_id {
        if !record.assign_generated_id(id) {
            debug!(table = %schema.table, id, "no assignable id member, generated id dropped");
        }
    }

    Ok(())
}

/// Retrieve every row of the schema's table into `dest`.
pub(crate) async fn find<T: Model>(
    conn: &dyn Connection,
    schema: &Schema,
    dest: &mut Vec<T>,
) -> Result<()> {
    let sql = format!("SELECT * FROM {}", schema.table);
    select_into(conn, schema, &sql, &[], dest).await
}

/// Run an assembled SELECT and bind its rows into `dest`.
pub(crate) async fn select_into<T: Model>(
    conn: &dyn Connection,
    schema: &Schema,
    sql: &str,
    params: &[Value],
    dest: &mut Vec<T>,
) -> Result<()> {
    debug!(sql = %sql, "executing select");
    let rs = conn.query(sql, params).await?;
    bind_rows(schema, rs, dest).await
}

/// Retrieve the first row matching a caller-supplied WHERE clause.
///
/// `where_clause` is a literal fragment including the `WHERE` keyword.
/// Returns [`Error::NotFound`] when zero rows match.
pub(crate) async fn first<T: Model>(
    conn: &dyn Connection,
    schema: &Schema,
    where_clause: &str,
    params: &[Value],
) -> Result<T> {
    let sql = format!("SELECT * FROM {} {} LIMIT 1", schema.table, where_clause);
    let mut rows: Vec<T> = Vec::with_capacity(1);
    select_into(conn, schema, &sql, params, &mut rows).await?;
    rows.pop().ok_or(Error::NotFound)
}

/// Update columns matching a caller-supplied WHERE clause.
///
/// Set keys are converted to column form by the naming convention. SET
/// values precede the WHERE args in the bound parameter sequence, in that
/// fixed order. Returns the affected-row count.
pub(crate) async fn update(
    conn: &dyn Connection,
    schema: &Schema,
    timeout: Duration,
    set: &[(&str, Value)],
    where_clause: &str,
    params: &[Value],
) -> Result<u64> {
    let mut assignments = Vec::with_capacity(set.len());
    let mut values = Vec::with_capacity(set.len() + params.len());

    for (key, value) in set {
        assignments.push(format!("{} = ?", to_snake_case(key)));
        values.push(value.clone());
    }
    values.extend_from_slice(params);

    let sql = format!(
        "UPDATE {} SET {} {}",
        schema.table,
        assignments.join(", "),
        where_clause
    );
    debug!(sql = %sql, "executing update");

    let result = bounded(conn.execute(&sql, &values), timeout, "update").await?;
    Ok(result.rows_affected)
}

/// Delete rows matching a caller-supplied WHERE clause.
pub(crate) async fn delete(
    conn: &dyn Connection,
    schema: &Schema,
    timeout: Duration,
    where_clause: &str,
    params: &[Value],
) -> Result<u64> {
    let sql = format!("DELETE FROM {} {}", schema.table, where_clause);
    debug!(sql = %sql, "executing delete");

    let result = bounded(conn.execute(&sql, params), timeout, "delete").await?;
    Ok(result.rows_affected)
}

/// Pass a raw query through to the connection, unbounded.
pub(crate) async fn raw_query(
    conn: &dyn Connection,
    sql: &str,
    params: &[Value],
) -> Result<ResultSet> {
    debug!(sql = %sql, "executing raw query");
    conn.query(sql, params).await
}

/// Raw query bound to a caller-supplied cancellation token.
///
/// The token is observed both while the query starts and by the returned
/// cursor: once it fires, `next` yields [`Error::Cancelled`] and the row
/// stream is shut down.
pub(crate) async fn raw_query_cancellable(
    conn: &dyn Connection,
    sql: &str,
    params: &[Value],
    token: &CancellationToken,
) -> Result<ResultSet> {
    debug!(sql = %sql, "executing cancellable raw query");
    let mut rs = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(Error::Cancelled),
        result = conn.query(sql, params) => result?,
    };
    rs.bind_cancellation(token.clone());
    Ok(rs)
}

/// Pass a raw statement through to the connection, unbounded.
pub(crate) async fn raw_exec(
    conn: &dyn Connection,
    sql: &str,
    params: &[Value],
) -> Result<ExecResult> {
    debug!(sql = %sql, "executing raw statement");
    conn.execute(sql, params).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::FieldSpec;
    use crate::core::traits::Row;
    use crate::core::value::FromValue;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    #[derive(Debug, Default, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
        age: i64,
    }

    impl Model for User {
        const NAME: &'static str = "User";
        const FIELDS: &'static [FieldSpec] = &[
            FieldSpec {
                name: "id",
                column: None,
                skip: false,
            },
            FieldSpec {
                name: "name",
                column: None,
                skip: false,
            },
            FieldSpec {
                name: "age",
                column: None,
                skip: false,
            },
        ];

        fn values(&self) -> HashMap<&'static str, Value> {
            let mut map = HashMap::new();
            // Auto-generated key omitted while unset: partial insert.
            if self.id != 0 {
                map.insert("id", Value::from(self.id));
            }
            map.insert("name", Value::from(self.name.clone()));
            map.insert("age", Value::from(self.age));
            map
        }

        fn put(&mut self, field: &str, value: Value) -> Result<()> {
            match field {
                "id" => self.id = FromValue::from_value(value).map_err(|e| Error::bind("id", e))?,
                "name" => {
                    self.name = FromValue::from_value(value).map_err(|e| Error::bind("name", e))?
                }
                "age" => {
                    self.age = FromValue::from_value(value).map_err(|e| Error::bind("age", e))?
                }
                _ => {}
            }
            Ok(())
        }

        fn assign_generated_id(&mut self, id: i64) -> bool {
            self.id = id;
            true
        }
    }

    /// Scripted connection that records SQL and parameters.
    #[derive(Default)]
    struct FakeConn {
        log: Mutex<Vec<(String, Vec<Value>)>>,
        rows: Mutex<Vec<Row>>,
        last_insert_id: Option<i64>,
    }

    impl FakeConn {
        fn with_rows(rows: Vec<Row>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        fn recorded(&self) -> Vec<(String, Vec<Value>)> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connection for FakeConn {
        async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
            self.log
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(ExecResult {
                rows_affected: 1,
                last_insert_id: self.last_insert_id,
            })
        }

        async fn query(&self, sql: &str, params: &[Value]) -> Result<ResultSet> {
            self.log
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            let rows: Vec<Row> = self.rows.lock().unwrap().drain(..).collect();
            let (tx, rs) = ResultSet::channel();
            tokio::spawn(async move {
                for row in rows {
                    if tx.send(Ok(row)).await.is_err() {
                        break;
                    }
                }
            });
            Ok(rs)
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) {}

        fn backend(&self) -> &'static str {
            "fake"
        }
    }

    fn user_row(id: i64, name: &str, age: i64) -> Row {
        Row {
            columns: Arc::new(vec!["id".to_string(), "name".to_string(), "age".to_string()]),
            values: vec![Value::Int(id), Value::Text(name.into()), Value::Int(age)],
        }
    }

    #[tokio::test]
    async fn test_create_compiles_partial_insert_and_assigns_id() {
        let conn = FakeConn {
            last_insert_id: Some(7),
            ..Default::default()
        };
        let schema = Schema::derive::<User>();
        let mut user = User {
            name: "Dybala".into(),
            age: 30,
            ..Default::default()
        };

        create(&conn, &schema, TEST_TIMEOUT, &mut user)
            .await
            .unwrap();

        let log = conn.recorded();
        // Unset auto-id is omitted from the column list.
        assert_eq!(log[0].0, "INSERT INTO users (name, age) VALUES (?, ?)");
        assert_eq!(
            log[0].1,
            vec![Value::Text("Dybala".into()), Value::Int(30)]
        );
        assert_eq!(user.id, 7);
    }

    #[tokio::test]
    async fn test_create_includes_explicit_id() {
        let conn = FakeConn::default();
        let schema = Schema::derive::<User>();
        let mut user = User {
            id: 42,
            name: "Totti".into(),
            age: 40,
        };

        create(&conn, &schema, TEST_TIMEOUT, &mut user)
            .await
            .unwrap();

        let log = conn.recorded();
        assert_eq!(log[0].0, "INSERT INTO users (id, name, age) VALUES (?, ?, ?)");
    }

    #[tokio::test]
    async fn test_find_selects_everything() {
        let conn = FakeConn::with_rows(vec![user_row(1, "a", 20), user_row(2, "b", 25)]);
        let schema = Schema::derive::<User>();
        let mut users: Vec<User> = Vec::new();

        find(&conn, &schema, &mut users).await.unwrap();

        assert_eq!(conn.recorded()[0].0, "SELECT * FROM users");
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].name, "b");
    }

    #[tokio::test]
    async fn test_first_compiles_limit_and_maps_row() {
        let conn = FakeConn::with_rows(vec![user_row(7, "Dybala", 31)]);
        let schema = Schema::derive::<User>();

        let user: User = first(&conn, &schema, "WHERE id = ?", &[Value::Int(7)])
            .await
            .unwrap();

        assert_eq!(
            conn.recorded()[0].0,
            "SELECT * FROM users WHERE id = ? LIMIT 1"
        );
        assert_eq!(
            user,
            User {
                id: 7,
                name: "Dybala".into(),
                age: 31
            }
        );
    }

    #[tokio::test]
    async fn test_first_zero_rows_is_not_found() {
        let conn = FakeConn::default();
        let schema = Schema::derive::<User>();

        let err = first::<User>(&conn, &schema, "WHERE id = ?", &[Value::Int(99)])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_orders_set_values_before_where_args() {
        let conn = FakeConn::default();
        let schema = Schema::derive::<User>();

        let affected = update(
            &conn,
            &schema,
            TEST_TIMEOUT,
            &[("age", Value::Int(31))],
            "WHERE id = ?",
            &[Value::Int(7)],
        )
        .await
        .unwrap();

        let log = conn.recorded();
        assert_eq!(log[0].0, "UPDATE users SET age = ? WHERE id = ?");
        assert_eq!(log[0].1, vec![Value::Int(31), Value::Int(7)]);
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_update_converts_keys_to_column_form() {
        let conn = FakeConn::default();
        let schema = Schema::derive::<User>();

        update(
            &conn,
            &schema,
            TEST_TIMEOUT,
            &[("UserName", Value::Text("x".into()))],
            "WHERE id = ?",
            &[Value::Int(1)],
        )
        .await
        .unwrap();

        assert_eq!(
            conn.recorded()[0].0,
            "UPDATE users SET user_name = ? WHERE id = ?"
        );
    }

    #[tokio::test]
    async fn test_delete_compiles_where_clause() {
        let conn = FakeConn::default();
        let schema = Schema::derive::<User>();

        delete(&conn, &schema, TEST_TIMEOUT, "WHERE id = ?", &[Value::Int(7)])
            .await
            .unwrap();

        let log = conn.recorded();
        assert_eq!(log[0].0, "DELETE FROM users WHERE id = ?");
        assert_eq!(log[0].1, vec![Value::Int(7)]);
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let conn = FakeConn::default();
        let token = CancellationToken::new();
        token.cancel();

        let err = raw_query_cancellable(&conn, "SELECT 1", &[], &token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        // The query never reached the connection.
        assert!(conn.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_cancelling_mid_stream_stops_the_cursor() {
        let conn = FakeConn::with_rows(vec![
            user_row(1, "a", 20),
            user_row(2, "b", 25),
            user_row(3, "c", 30),
        ]);
        let token = CancellationToken::new();

        let mut rs = raw_query_cancellable(&conn, "SELECT * FROM users", &[], &token)
            .await
            .unwrap();
        assert!(rs.next().await.unwrap().is_ok());

        // Remaining rows may already be buffered; the token still wins.
        token.cancel();
        let item = rs.next().await.unwrap();
        assert!(matches!(item, Err(Error::Cancelled)));
    }
}
