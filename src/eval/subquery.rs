//! Subquery dispatch: the evaluator never runs a subquery itself — it
//! calls back into a caller-supplied [`SubqueryExecutor`], so this crate's
//! expression layer never has to know the executor's concrete type.

use crate::ast::SelectStatement;
use crate::error::Result;
use crate::row::Row;

use super::OuterContext;

/// Executes a subquery's body and returns its materialised rows.
///
/// Implemented by the query executor (C5), which closes over its
/// per-statement state (CTE table, table registry, deadline). Supplied to
/// the [`super::Evaluator`] at construction.
pub trait SubqueryExecutor {
    /// Runs `query` with `outer_row`/`outer_ctx` available for correlation,
    /// returning every row it yields.
    ///
    /// Called fresh for each distinct outer-row binding when `query` is
    /// correlated; implementations are free to memoise non-correlated
    /// subqueries for the life of the top-level statement (§3 Lifecycles).
    fn execute(&self, query: &SelectStatement, outer_row: &Row, outer_ctx: &OuterContext) -> Result<Vec<Row>>;
}
