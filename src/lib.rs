//! # oxide-fedsql
//!
//! A federated SQL execution core: evaluate `SELECT`/`INSERT`/`UPDATE`/
//! `DELETE` statements against any number of heterogeneous virtual tables
//! behind a uniform [`source::TableSource`] protocol, with full
//! three-valued-logic expression evaluation, joins, subqueries,
//! aggregation, windowing, set operations, and recursive CTEs.
//!
//! This crate does not parse SQL text — it consumes an already-built
//! [`ast::Statement`] tree (from a parser living elsewhere) and plans,
//! rewrites, and executes it. The pipeline stages:
//!
//! - [`rewrite`] pushes `NOT` down through an [`ast::Expr`] tree into De
//!   Morgan-normal form. [`exec`] and [`write`] run every `WHERE`/`HAVING`/
//!   `ON`/scope filter through it before pushdown planning and predicate
//!   matching, so a NOT-heavy predicate still flattens into per-table
//!   conjuncts instead of surviving as one opaque negation.
//! - [`eval`] evaluates an [`ast::Expr`] against a row and an
//!   [`eval::OuterContext`] of enclosing correlated rows, using
//!   three-valued [`value::Truth`] throughout.
//! - [`source`] is the virtual table protocol every data source
//!   implements; [`registry`] tracks the sources available to a
//!   statement.
//! - [`exec`] is the federated query executor: `WITH` evaluation, `FROM`
//!   composition with predicate pushdown, filtering, grouping and
//!   aggregation, windowing, set operations, ordering, and paging.
//! - [`write`] plans `INSERT`/`UPDATE`/`DELETE` against a single
//!   table source, scoped by an optional filter.
//!
//! ## Example
//!
//! ```
//! use oxide_fedsql::ast::{Expr, SelectColumn, SelectStatement, TableRef};
//! use oxide_fedsql::clock::SystemClock;
//! use oxide_fedsql::exec::QueryExecutor;
//! use oxide_fedsql::registry::TableRegistry;
//! use oxide_fedsql::row::Row;
//! use oxide_fedsql::source::{ColumnInfo, IndexKind, MemoryTableSource};
//! use oxide_fedsql::value::Value;
//!
//! let mut registry = TableRegistry::new();
//! registry.register(
//!     "users",
//!     Box::new(
//!         MemoryTableSource::new(vec![ColumnInfo {
//!             name: "name".into(),
//!             declared_type: "TEXT".into(),
//!             nullable: false,
//!             index_kind: IndexKind::None,
//!         }])
//!         .with_row(Row::new().with("name", Value::Text("alice".into()))),
//!     ),
//! );
//!
//! let clock = SystemClock;
//! let executor = QueryExecutor::new(&registry, &clock);
//!
//! let mut stmt = SelectStatement::empty();
//! stmt.select_list = vec![SelectColumn::new(Expr::column("name"))];
//! stmt.from = Some(TableRef::table("users"));
//!
//! let result = executor.execute(&stmt).unwrap();
//! assert_eq!(result.rows.len(), 1);
//! ```

pub mod ast;
pub mod clock;
pub mod dialect;
pub mod error;
pub mod eval;
pub mod exec;
pub mod registry;
pub mod rewrite;
pub mod row;
pub mod source;
pub mod value;
pub mod write;

pub use error::{FedSqlError, Result};
pub use exec::{ExecutionLimits, QueryExecutor, QueryResult};
pub use registry::TableRegistry;
pub use row::Row;
pub use value::{Truth, Value};
pub use write::WritePlanner;
