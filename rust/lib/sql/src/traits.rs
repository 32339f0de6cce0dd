use crate::error::SQLError;

/// A dynamically-typed SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A row returned from a SQL query: column name to value.
#[derive(Debug, Clone)]
pub struct Row {
    pub columns: Vec<(String, Value)>,
}

impl Row {
    /// Get a column value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a text column value by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get an integer column value by name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Get a nullable text column; `None` for SQL NULL or a missing column.
    pub fn get_opt_str(&self, name: &str) -> Option<String> {
        self.get_str(name).map(str::to_string)
    }
}

/// Statement execution. Implemented by the store itself (autocommit) and
/// by the handle passed into [`SQLStore::transaction`].
pub trait SQLExecutor {
    /// Execute a query and return rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError>;

    /// Execute a statement (INSERT/UPDATE/DELETE) and return affected row count.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError>;
}

/// SQLStore provides a SQL execution interface backed by an embedded database.
pub trait SQLStore: SQLExecutor + Send + Sync {
    /// Run `body` inside one transaction.
    ///
    /// Commits if `body` returns `Ok`, rolls back otherwise. Conflicting
    /// writers are serialized by the store; nothing of an aborted body is
    /// ever visible to other callers.
    fn transaction(
        &self,
        body: &mut dyn FnMut(&dyn SQLExecutor) -> Result<(), SQLError>,
    ) -> Result<(), SQLError>;
}

/// Typed front-end to [`SQLStore::transaction`].
///
/// The body may fail with the caller's own error type; such a failure rolls
/// the transaction back and is returned unchanged. Storage failures around
/// the body (begin, commit) are converted through `From<SQLError>`.
pub fn in_transaction<T, E, F>(store: &dyn SQLStore, body: F) -> Result<T, E>
where
    E: From<SQLError>,
    F: FnOnce(&dyn SQLExecutor) -> Result<T, E>,
{
    let mut body = Some(body);
    let mut outcome: Option<Result<T, E>> = None;

    let committed = store.transaction(&mut |tx| {
        let body = body
            .take()
            .ok_or_else(|| SQLError::Transaction("transaction body re-entered".into()))?;
        match body(tx) {
            Ok(v) => {
                outcome = Some(Ok(v));
                Ok(())
            }
            Err(e) => {
                outcome = Some(Err(e));
                Err(SQLError::Aborted)
            }
        }
    });

    match (committed, outcome) {
        (Ok(()), Some(result)) => result,
        (Err(SQLError::Aborted), Some(Err(e))) => Err(e),
        (Err(e), _) => Err(E::from(e)),
        (Ok(()), None) => Err(E::from(SQLError::Transaction(
            "transaction body did not run".into(),
        ))),
    }
}
