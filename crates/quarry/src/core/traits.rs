//! The connection collaborator contract.
//!
//! Everything above this trait is driver-agnostic: the executor, query
//! builder, and row binder speak [`Value`]s and SQL text with `?`
//! placeholders, and drivers translate to their engine underneath. Result
//! sets stream through a bounded channel so large reads apply backpressure
//! instead of buffering.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::value::Value;
use crate::error::{Error, Result};

/// Outcome of a parameterized statement execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecResult {
    /// Number of rows the statement affected.
    pub rows_affected: u64,
    /// Store-generated identifier, when the engine reports one for the
    /// statement (auto-increment inserts). `None` for statements that
    /// cannot insert rows.
    pub last_insert_id: Option<i64>,
}

/// One result row: column names shared across the result set, plus
/// positionally matched values.
#[derive(Debug, Clone)]
pub struct Row {
    /// Column names as returned by the driver, shared by every row of the
    /// same result set.
    pub columns: Arc<Vec<String>>,
    /// Column values, positionally matched to `columns`.
    pub values: Vec<Value>,
}

impl Row {
    /// Look up a value by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }
}

/// A live, caller-driven cursor over a query's rows.
///
/// Rows arrive through a bounded channel populated by a driver task. A
/// driver error encountered mid-stream is delivered in-band and terminates
/// the stream; rows received before it remain valid.
#[derive(Debug)]
pub struct ResultSet {
    rx: mpsc::Receiver<Result<Row>>,
    cancel: Option<CancellationToken>,
}

impl ResultSet {
    /// Channel capacity used by drivers when streaming rows.
    pub const CHANNEL_CAPACITY: usize = 64;

    /// Create a sender/cursor pair. Used by driver implementations.
    #[must_use]
    pub fn channel() -> (mpsc::Sender<Result<Row>>, ResultSet) {
        let (tx, rx) = mpsc::channel(Self::CHANNEL_CAPACITY);
        (tx, ResultSet { rx, cancel: None })
    }

    /// Bind the cursor to a cancellation token.
    ///
    /// Once the token fires, `next` yields [`Error::Cancelled`] ahead of
    /// any buffered rows and closes the channel, so the driver task stops
    /// at its next send.
    pub fn bind_cancellation(&mut self, token: CancellationToken) {
        self.cancel = Some(token);
    }

    /// Receive the next row, or `None` once the set is exhausted.
    pub async fn next(&mut self) -> Option<Result<Row>> {
        let Some(token) = self.cancel.clone() else {
            return self.rx.recv().await;
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.rx.close();
                Some(Err(Error::Cancelled))
            }
            item = self.rx.recv() => item,
        }
    }
}

/// Parameterized access to one database, safe for concurrent use.
///
/// Implementations own pooling and transport. Values are always bound
/// through `?` placeholders; SQL text arrives fully assembled.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Execute a statement, returning the affected-row count and any
    /// generated identifier.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    /// Execute a query, returning a streaming cursor over its rows.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<ResultSet>;

    /// Verify the connection is alive.
    async fn ping(&self) -> Result<()>;

    /// Close the underlying pool.
    async fn close(&self);

    /// Backend identifier (e.g. "sqlite", "mysql").
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_row_get_by_name() {
        let columns = Arc::new(vec!["id".to_string(), "name".to_string()]);
        let row = Row {
            columns,
            values: vec![Value::Int(7), Value::Text("Dybala".into())],
        };
        assert_eq!(row.get("id"), Some(&Value::Int(7)));
        assert_eq!(row.get("missing"), None);
    }

    #[tokio::test]
    async fn test_result_set_drains_channel() {
        let (tx, mut rs) = ResultSet::channel();
        let columns = Arc::new(vec!["id".to_string()]);
        tx.send(Ok(Row {
            columns: Arc::clone(&columns),
            values: vec![Value::Int(1)],
        }))
        .await
        .unwrap();
        drop(tx);

        assert!(rs.next().await.is_some());
        assert!(rs.next().await.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_preempts_buffered_rows() {
        let (tx, mut rs) = ResultSet::channel();
        let token = CancellationToken::new();
        rs.bind_cancellation(token.clone());

        let columns = Arc::new(vec!["id".to_string()]);
        let row = || Row {
            columns: Arc::clone(&columns),
            values: vec![Value::Int(1)],
        };

        tx.send(Ok(row())).await.unwrap();
        assert!(rs.next().await.unwrap().is_ok());

        // Rows already sitting in the channel must not outrank the token.
        tx.send(Ok(row())).await.unwrap();
        token.cancel();
        let item = rs.next().await.unwrap();
        assert!(matches!(item, Err(Error::Cancelled)));

        // The cursor closed its side; the sender observes it.
        assert!(tx.send(Ok(row())).await.is_err());
    }
}
