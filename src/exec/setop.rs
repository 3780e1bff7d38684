//! `UNION [ALL]` / `INTERSECT` / `EXCEPT` (§4.4 stage 7).
//!
//! Deduplication (everywhere but `UNION ALL`) and membership tests use
//! [`Row::row_eq`], which treats `NULL = NULL` as equal — the SQL
//! `DISTINCT`-family convention, distinct from three-valued expression
//! equality.

use crate::ast::SetOp;
use crate::error::{FedSqlError, Result};
use crate::row::Row;

/// Combines `left` and `right` per `op`. Errors if the two sides don't
/// have the same column count (`columns` is used only for the arity
/// check and the error message).
pub fn apply(op: SetOp, left: Vec<Row>, left_columns: &[String], right: Vec<Row>, right_columns: &[String]) -> Result<Vec<Row>> {
    if left_columns.len() != right_columns.len() {
        return Err(FedSqlError::SetOpArityMismatch {
            left: left_columns.len(),
            right: right_columns.len(),
        });
    }

    Ok(match op {
        SetOp::UnionAll => {
            let mut out = left;
            out.extend(right);
            out
        }
        SetOp::Union => {
            let mut out = dedupe(left);
            for row in right {
                if !out.iter().any(|r| r.row_eq(&row)) {
                    out.push(row);
                }
            }
            out
        }
        SetOp::Intersect => dedupe(left)
            .into_iter()
            .filter(|row| right.iter().any(|r| r.row_eq(row)))
            .collect(),
        SetOp::Except => dedupe(left)
            .into_iter()
            .filter(|row| !right.iter().any(|r| r.row_eq(row)))
            .collect(),
    })
}

fn dedupe(rows: Vec<Row>) -> Vec<Row> {
    let mut out: Vec<Row> = Vec::new();
    for row in rows {
        if !out.iter().any(|r| r.row_eq(&row)) {
            out.push(row);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn row(n: i64) -> Row {
        Row::new().with("n", Value::Int(n))
    }

    fn cols() -> Vec<String> {
        vec!["n".to_string()]
    }

    #[test]
    fn union_all_keeps_duplicates() {
        let out = apply(SetOp::UnionAll, vec![row(1), row(1)], &cols(), vec![row(1)], &cols()).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn union_dedupes_across_both_sides() {
        let out = apply(SetOp::Union, vec![row(1), row(2)], &cols(), vec![row(2), row(3)], &cols()).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn intersect_keeps_only_common_rows() {
        let out = apply(SetOp::Intersect, vec![row(1), row(2)], &cols(), vec![row(2), row(3)], &cols()).unwrap();
        assert_eq!(out, vec![row(2)]);
    }

    #[test]
    fn except_removes_rows_present_on_the_right() {
        let out = apply(SetOp::Except, vec![row(1), row(2)], &cols(), vec![row(2)], &cols()).unwrap();
        assert_eq!(out, vec![row(1)]);
    }

    #[test]
    fn arity_mismatch_errors() {
        let err = apply(SetOp::UnionAll, vec![row(1)], &cols(), vec![row(1)], &["n".into(), "m".into()]);
        assert!(matches!(err, Err(FedSqlError::SetOpArityMismatch { left: 1, right: 2 })));
    }
}
