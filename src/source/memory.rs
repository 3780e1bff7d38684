//! `MemoryTableSource` (A4): the `Vec<Row>`-backed reference
//! implementation of [`super::TableSource`], used by this crate's own
//! tests and as a minimal starting point for downstream integrators. Not
//! a production virtual table — pushdown only recognises trivial
//! equality on an indexed column.

use crate::ast::{BinaryOp, Expr, LiteralKind};
use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

use super::{ColumnInfo, IndexKind, PushdownResult, TableSource};

/// An in-memory table backed by a `Vec<Row>`.
#[derive(Debug, Clone)]
pub struct MemoryTableSource {
    columns: Vec<ColumnInfo>,
    rows: Vec<Row>,
}

impl MemoryTableSource {
    /// Creates a source with the given column descriptors and no rows.
    #[must_use]
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, in-memory builder style.
    #[must_use]
    pub fn with_row(mut self, row: Row) -> Self {
        self.rows.push(row);
        self
    }

    /// Appends many rows.
    #[must_use]
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Row>) -> Self {
        self.rows.extend(rows);
        self
    }

    fn indexed_column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name == name && c.index_kind != IndexKind::None)
    }
}

impl TableSource for MemoryTableSource {
    fn iterate(&self) -> Result<Box<dyn Iterator<Item = Row> + '_>> {
        Ok(Box::new(self.rows.iter().cloned()))
    }

    fn count(&self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn try_apply_filter(mut self: Box<Self>, filter: Expr) -> PushdownResult {
        // Only a single `col = literal` conjunct on an indexed column is
        // recognised; anything else is handed back untouched.
        if let Expr::Binary {
            left,
            op: BinaryOp::Eq,
            right,
        } = &filter
        {
            if let (
                Expr::Identifier { parts },
                Expr::Literal {
                    value,
                    kind: LiteralKind::Number | LiteralKind::String | LiteralKind::Bool,
                },
            ) = (left.as_ref(), right.as_ref())
            {
                if let Some(col) = parts.last() {
                    if self.indexed_column(col).is_some() {
                        let col = col.clone();
                        let value = value.clone();
                        self.rows
                            .retain(|row| row.get(&col).is_some_and(|v| v.loose_eq(&value)));
                        return PushdownResult {
                            source: self,
                            residual: None,
                        };
                    }
                }
            }
        }
        PushdownResult {
            source: self,
            residual: Some(filter),
        }
    }

    fn insert(&mut self, row: Row) -> Result<()> {
        self.rows.push(row);
        Ok(())
    }

    fn update(&mut self, filter: &Expr, changes: &[(String, Value)]) -> Result<usize> {
        let mut affected = 0;
        for row in &mut self.rows {
            if matches_filter(filter, row) {
                for (col, value) in changes {
                    row.set(col.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn delete(&mut self, filter: &Expr) -> Result<usize> {
        let before = self.rows.len();
        self.rows.retain(|row| !matches_filter(filter, row));
        Ok(before - self.rows.len())
    }
}

/// A minimal, evaluator-free filter match used only by this reference
/// source's own `update`/`delete`: the executor is expected to have
/// already applied the real evaluator-backed filter before calling
/// these, but a standalone source must still be able to honour a filter
/// passed directly by tests.
fn matches_filter(filter: &Expr, row: &Row) -> bool {
    match filter {
        Expr::Binary {
            left,
            op: BinaryOp::Eq,
            right,
        } => match (left.as_ref(), right.as_ref()) {
            (Expr::Identifier { parts }, Expr::Literal { value, .. }) => parts
                .last()
                .and_then(|col| row.get(col))
                .is_some_and(|v| v.loose_eq(value)),
            _ => false,
        },
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => matches_filter(left, row) && matches_filter(right, row),
        _ => false,
    }
}
