use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// A UNIQUE or PRIMARY KEY constraint rejected the statement.
    /// The statement had no effect; an enclosing transaction is still usable.
    #[error("unique violation: {0}")]
    UniqueViolation(String),

    /// Any other constraint (CHECK, NOT NULL, FOREIGN KEY) rejected the statement.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    /// The transaction body returned an error of its own; everything was rolled back.
    #[error("transaction aborted")]
    Aborted,
}

impl SQLError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, SQLError::UniqueViolation(_))
    }
}
