use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, TransactionBehavior, ffi};
use tracing::debug;

use crate::error::SQLError;
use crate::traits::{Row, SQLExecutor, SQLStore, Value};

/// How long a writer waits on a lock held by another process before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
///
/// One connection behind a mutex: every statement and every transaction
/// runs to completion before the next one starts.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path).map_err(|e| SQLError::Connection(e.to_string()))?;

        // Enable WAL mode for better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Self::configure(&conn)?;

        debug!(path = %path.display(), "sqlite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn =
            Connection::open_in_memory().map_err(|e| SQLError::Connection(e.to_string()))?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection) -> Result<(), SQLError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| SQLError::Connection(e.to_string()))
    }
}

impl SQLExecutor for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Query(e.to_string()))?;
        run_query(&conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;
        run_exec(&conn, sql, params)
    }
}

impl SQLStore for SqliteStore {
    fn transaction(
        &self,
        body: &mut dyn FnMut(&dyn SQLExecutor) -> Result<(), SQLError>,
    ) -> Result<(), SQLError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Transaction(e.to_string()))?;

        // IMMEDIATE takes the write lock up front so two processes sharing
        // the file cannot both read-then-write.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| SQLError::Transaction(e.to_string()))?;

        // Dropping `tx` without commit rolls back.
        body(&TxExecutor { conn: &tx })?;

        tx.commit()
            .map_err(|e| SQLError::Transaction(e.to_string()))
    }
}

/// Executor handed to transaction bodies.
struct TxExecutor<'a> {
    conn: &'a Connection,
}

impl SQLExecutor for TxExecutor<'_> {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        run_query(self.conn, sql, params)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        run_exec(self.conn, sql, params)
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

fn run_query(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            let mut columns = Vec::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                columns.push((name.clone(), row_value_at(row, i)));
            }
            Ok(Row { columns })
        })
        .map_err(|e| SQLError::Query(e.to_string()))?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
    }
    Ok(result)
}

fn run_exec(conn: &Connection, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
    let bound = bind_params(params);
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

    let affected = conn
        .execute(sql, param_refs.as_slice())
        .map_err(classify_exec_error)?;

    Ok(affected as u64)
}

/// Map constraint failures to their own variants so callers can react
/// to a duplicate key without string matching.
fn classify_exec_error(e: rusqlite::Error) -> SQLError {
    if let rusqlite::Error::SqliteFailure(ref err, _) = e {
        if err.code == ErrorCode::ConstraintViolation {
            return match err.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    SQLError::UniqueViolation(e.to_string())
                }
                _ => SQLError::ConstraintViolation(e.to_string()),
            };
        }
    }
    SQLError::Execution(e.to_string())
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> Value {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx) {
        Ok(ValueRef::Integer(i)) => Value::Integer(i),
        Ok(ValueRef::Real(f)) => Value::Real(f),
        Ok(ValueRef::Text(t)) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        Ok(ValueRef::Blob(b)) => Value::Blob(b.to_vec()),
        Ok(ValueRef::Null) | Err(_) => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::traits::in_transaction;

    fn store_with_schema() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec(
                "CREATE TABLE counters (id TEXT PRIMARY KEY, n INTEGER NOT NULL CHECK (n >= 0))",
                &[],
            )
            .unwrap();
        store
            .exec(
                "CREATE TABLE members (counter_id TEXT NOT NULL, who TEXT NOT NULL, \
                 PRIMARY KEY (counter_id, who))",
                &[],
            )
            .unwrap();
        store
            .exec("INSERT INTO counters (id, n) VALUES ('c', 0)", &[])
            .unwrap();
        store
    }

    fn counter(store: &dyn SQLExecutor) -> i64 {
        store
            .query("SELECT n FROM counters WHERE id = 'c'", &[])
            .unwrap()[0]
            .get_i64("n")
            .unwrap()
    }

    #[test]
    fn query_and_exec_roundtrip() {
        let store = store_with_schema();
        let affected = store
            .exec(
                "INSERT INTO members (counter_id, who) VALUES (?1, ?2)",
                &[Value::from("c"), Value::from("alice")],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let rows = store
            .query("SELECT who FROM members WHERE counter_id = ?1", &["c".into()])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("who"), Some("alice"));
    }

    #[test]
    fn duplicate_key_is_unique_violation() {
        let store = store_with_schema();
        let insert = "INSERT INTO members (counter_id, who) VALUES ('c', 'bob')";
        store.exec(insert, &[]).unwrap();
        let err = store.exec(insert, &[]).unwrap_err();
        assert!(err.is_unique_violation(), "got {err:?}");
    }

    #[test]
    fn check_failure_is_constraint_violation() {
        let store = store_with_schema();
        let err = store
            .exec("UPDATE counters SET n = n - 1 WHERE id = 'c'", &[])
            .unwrap_err();
        assert!(matches!(err, SQLError::ConstraintViolation(_)), "got {err:?}");
    }

    #[test]
    fn transaction_commits_all_statements() {
        let store = store_with_schema();
        let out: Result<u64, SQLError> = in_transaction(&store, |tx| {
            tx.exec("INSERT INTO members (counter_id, who) VALUES ('c', 'a')", &[])?;
            tx.exec("UPDATE counters SET n = n + 1 WHERE id = 'c'", &[])
        });
        assert_eq!(out.unwrap(), 1);
        assert_eq!(counter(&store), 1);
    }

    #[test]
    fn failing_body_rolls_back_everything() {
        let store = store_with_schema();
        let out: Result<(), SQLError> = in_transaction(&store, |tx| {
            tx.exec("INSERT INTO members (counter_id, who) VALUES ('c', 'a')", &[])?;
            tx.exec("UPDATE counters SET n = n + 1 WHERE id = 'c'", &[])?;
            Err(SQLError::Execution("boom".into()))
        });
        assert!(matches!(out, Err(SQLError::Execution(_))));
        assert_eq!(counter(&store), 0);
        let rows = store.query("SELECT who FROM members", &[]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn unique_violation_inside_transaction_keeps_it_usable() {
        let store = store_with_schema();
        store
            .exec("INSERT INTO members (counter_id, who) VALUES ('c', 'a')", &[])
            .unwrap();

        let out: Result<bool, SQLError> = in_transaction(&store, |tx| {
            match tx.exec("INSERT INTO members (counter_id, who) VALUES ('c', 'a')", &[]) {
                Err(SQLError::UniqueViolation(_)) => {}
                other => panic!("expected unique violation, got {other:?}"),
            }
            tx.exec("INSERT INTO members (counter_id, who) VALUES ('c', 'b')", &[])?;
            Ok(true)
        });
        assert!(out.unwrap());
        let rows = store.query("SELECT who FROM members ORDER BY who", &[]).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn caller_error_type_passes_through() {
        #[derive(Debug, PartialEq)]
        enum AppError {
            Gone,
            Sql(String),
        }
        impl From<SQLError> for AppError {
            fn from(e: SQLError) -> Self {
                AppError::Sql(e.to_string())
            }
        }

        let store = store_with_schema();
        let out: Result<(), AppError> = in_transaction(&store, |tx| {
            tx.exec("UPDATE counters SET n = n + 5 WHERE id = 'c'", &[])?;
            Err(AppError::Gone)
        });
        assert_eq!(out, Err(AppError::Gone));
        assert_eq!(counter(&store), 0);
    }

    #[test]
    fn concurrent_deltas_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("t.db")).unwrap());
        store
            .exec("CREATE TABLE counters (id TEXT PRIMARY KEY, n INTEGER NOT NULL)", &[])
            .unwrap();
        store
            .exec("INSERT INTO counters (id, n) VALUES ('c', 0)", &[])
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let r: Result<u64, SQLError> = in_transaction(store.as_ref(), |tx| {
                            tx.exec("UPDATE counters SET n = n + 1 WHERE id = 'c'", &[])
                        });
                        r.unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter(store.as_ref()), 200);
    }
}
