//! Error types for the federated SQL execution core.

use thiserror::Error;

/// Errors raised while rewriting, evaluating, or executing a statement.
#[derive(Debug, Error)]
pub enum FedSqlError {
    /// A placeholder reached the evaluator without a bound value.
    #[error("unbound placeholder in expression: {0}")]
    UnboundPlaceholder(String),

    /// An identifier could not be resolved against the current row or
    /// outer context.
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// `*`/`t.*` appeared where a scalar value was required.
    #[error("wildcard not allowed in this expression context: {0}")]
    WildcardInExpression(String),

    /// A scalar function name the evaluator does not recognise.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// A function was called with the wrong number or shape of arguments.
    #[error("invalid arguments to {name}: {reason}")]
    InvalidFunctionArgs {
        /// The function name.
        name: String,
        /// Why the arguments were rejected.
        reason: String,
    },

    /// An operator/node combination the evaluator does not support.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// A comma-separated `FROM` list exceeded the comma-join cap.
    #[error("comma-join list has {found} tables, exceeding the cap of {limit}")]
    TooManyCommaJoins {
        /// How many tables were listed.
        found: usize,
        /// The configured cap.
        limit: usize,
    },

    /// A scalar subquery yielded more than one row.
    #[error("scalar subquery returned more than one row: {0}")]
    ScalarSubqueryTooManyRows(String),

    /// A scalar subquery yielded more than one column.
    #[error("scalar subquery returned more than one column: {0}")]
    ScalarSubqueryTooManyColumns(String),

    /// A set operation combined two statements with different column
    /// counts.
    #[error("set operation arity mismatch: left has {left} columns, right has {right}")]
    SetOpArityMismatch {
        /// Left-hand column count.
        left: usize,
        /// Right-hand column count.
        right: usize,
    },

    /// `DELETE` was planned without a `WHERE` clause.
    #[error("DELETE requires a WHERE clause; use the table source directly for a mass delete")]
    DeleteWithoutWhere,

    /// A row rejected by the write planner's scope filter or row
    /// validator.
    #[error("row violates write scope: {0}")]
    ScopeViolation(String),

    /// A mutable partial query was built over a base containing a join or
    /// set operation.
    #[error("mutations require a single-table base; found a join or set operation")]
    MutationBaseNotSingleTable,

    /// An opaque error surfaced by a concrete table source.
    #[error("table source error: {0}")]
    Source(#[from] Box<dyn std::error::Error + Send + Sync>),

    /// The configured deadline was reached mid-iteration.
    #[error("query execution exceeded its deadline")]
    QueryTimeout,

    /// A configured row-count cap was reached.
    #[error("row count cap of {limit} exceeded")]
    RowCapExceeded {
        /// The configured cap.
        limit: usize,
    },
}

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, FedSqlError>;
