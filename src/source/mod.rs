//! The table source protocol (C4): the uniform interface every virtual
//! table — in-memory, file-backed, HTTP-backed, or a passthrough SQL
//! driver — exposes to the executor.

mod memory;

pub use memory::MemoryTableSource;

use crate::ast::Expr;
use crate::error::Result;
use crate::row::Row;

/// A column's static description, as reported by [`TableSource::columns`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// The declared SQL type name, e.g. `"INTEGER"`. Informational only —
    /// the executor does not enforce it.
    pub declared_type: String,
    /// Whether `NULL` is a legal value for this column.
    pub nullable: bool,
    /// What kind of index backs this column, if any.
    pub index_kind: IndexKind,
}

/// What index support, if any, a column has — consulted by predicate
/// pushdown and hash-join detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// No index.
    None,
    /// A unique index (at most one matching row).
    Unique,
    /// A non-unique index.
    NonUnique,
}

/// The result of asking a source to absorb part of a predicate.
pub struct PushdownResult {
    /// The (possibly new) source, having absorbed what it can.
    pub source: Box<dyn TableSource>,
    /// The leftover predicate the executor must still apply. `None` means
    /// the source fully satisfied the filter.
    pub residual: Option<Expr>,
}

/// The uniform interface exposed by a virtual table.
///
/// Implementors may be backed by memory, a file, a network call, or a
/// concrete SQL driver; this crate ships only [`MemoryTableSource`] (A4)
/// as a reference implementation and test fixture.
pub trait TableSource: std::fmt::Debug {
    /// An iterator over this source's rows. Not guaranteed restartable
    /// unless the implementation documents otherwise.
    fn iterate(&self) -> Result<Box<dyn Iterator<Item = Row> + '_>>;

    /// The row count, which must agree with exhaustively draining
    /// [`TableSource::iterate`].
    fn count(&self) -> Result<usize>;

    /// The ordered column descriptors for this source.
    fn columns(&self) -> &[ColumnInfo];

    /// Attempts to push `filter` into the source. The default
    /// implementation declines: it returns the filter unchanged as the
    /// residual and does not reconstruct `self`, so the executor always
    /// re-applies the filter in full.
    ///
    /// A source that can do better — e.g. a memory source doing
    /// equality lookup on an indexed column — returns a new source plus
    /// whatever part of `filter` it could not absorb (or `None` for
    /// none left). The returned source may yield a superset of the true
    /// result only when the residual fully captures what's left to
    /// check.
    fn try_apply_filter(self: Box<Self>, filter: Expr) -> PushdownResult
    where
        Self: 'static,
    {
        PushdownResult {
            source: self,
            residual: Some(filter),
        }
    }

    /// Inserts a row, for mutable sources. Default: unsupported.
    fn insert(&mut self, _row: Row) -> Result<()> {
        Err(crate::error::FedSqlError::UnsupportedOperator(
            "insert not supported by this table source".into(),
        ))
    }

    /// Updates rows matching `filter` by applying `changes`, returning the
    /// count affected. Default: unsupported.
    fn update(&mut self, _filter: &Expr, _changes: &[(String, crate::value::Value)]) -> Result<usize> {
        Err(crate::error::FedSqlError::UnsupportedOperator(
            "update not supported by this table source".into(),
        ))
    }

    /// Deletes rows matching `filter`, returning the count affected.
    /// Default: unsupported.
    fn delete(&mut self, _filter: &Expr) -> Result<usize> {
        Err(crate::error::FedSqlError::UnsupportedOperator(
            "delete not supported by this table source".into(),
        ))
    }
}
