//! `WITH` clause evaluation (§4.4 stage 1), including `WITH RECURSIVE`.
//!
//! A recursive CTE's body is its anchor member optionally chained to a
//! recursive member through `UNION`/`UNION ALL` (the only legal
//! combinators there). Evaluation runs the anchor once, then repeatedly
//! re-runs the recursive member with only the *previous* iteration's new
//! rows exposed under the CTE's own name (the "working table" of the
//! standard algorithm), stopping once an iteration produces nothing new
//! — new-row detection uses [`crate::row::Row::row_eq`], so `NULL`
//! columns compare equal the way `UNION` dedup does.

use std::collections::HashMap;

use crate::ast::{CommonTableExpr, SelectStatement, SetOp};
use crate::error::Result;
use crate::eval::OuterContext;
use crate::row::Row;

use super::join::{self, Scan};
use super::QueryExecutor;

/// Evaluates every CTE in `ctes`, in order (later ones may reference
/// earlier ones by name), returning the resulting scope.
pub fn evaluate_ctes(executor: &QueryExecutor<'_>, ctes: &[CommonTableExpr], outer_ctx: &OuterContext) -> Result<HashMap<String, Scan>> {
    let mut scope: HashMap<String, Scan> = HashMap::new();
    for cte in ctes {
        let scan = if cte.recursive {
            evaluate_recursive(executor, cte, &scope, outer_ctx)?
        } else {
            let result = executor.execute_with_scope(&cte.query, &Row::new(), outer_ctx, &scope)?;
            join::scan_from_rows(result.rows, &result.columns, &cte.name)
        };
        scope.insert(cte.name.clone(), scan);
    }
    Ok(scope)
}

fn evaluate_recursive(executor: &QueryExecutor<'_>, cte: &CommonTableExpr, scope: &HashMap<String, Scan>, outer_ctx: &OuterContext) -> Result<Scan> {
    let Some(set_op) = cte.query.set_op.clone() else {
        // No recursive member was chained on; behaves like a plain CTE.
        let result = executor.execute_with_scope(&cte.query, &Row::new(), outer_ctx, scope)?;
        return Ok(join::scan_from_rows(result.rows, &result.columns, &cte.name));
    };

    let anchor_stmt = SelectStatement {
        set_op: None,
        ..(*cte.query).clone()
    };
    let recursive_stmt = set_op.right;

    let anchor = executor.execute_with_scope(&anchor_stmt, &Row::new(), outer_ctx, scope)?;
    let mut accumulated = anchor.rows.clone();
    let mut working = anchor.rows;

    while !working.is_empty() {
        let mut recur_scope = scope.clone();
        recur_scope.insert(cte.name.clone(), join::scan_from_rows(working, &anchor.columns, &cte.name));
        let step = executor.execute_with_scope(&recursive_stmt, &Row::new(), outer_ctx, &recur_scope)?;

        let new_rows: Vec<Row> = match set_op.op {
            SetOp::UnionAll => step.rows,
            _ => step
                .rows
                .into_iter()
                .filter(|row| !accumulated.iter().any(|seen| seen.row_eq(row)))
                .collect(),
        };

        if new_rows.is_empty() {
            break;
        }
        accumulated.extend(new_rows.clone());
        working = new_rows;
    }

    Ok(join::scan_from_rows(accumulated, &anchor.columns, &cte.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, SelectColumn, TableRef};
    use crate::clock::FixedClock;
    use crate::registry::TableRegistry;
    use crate::source::{ColumnInfo, IndexKind, MemoryTableSource};
    use crate::value::Value;
    use chrono::NaiveDateTime;

    fn clock() -> FixedClock {
        FixedClock(NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap())
    }

    #[test]
    fn non_recursive_cte_is_available_under_its_name() {
        let clock = clock();
        let mut registry = TableRegistry::new();
        registry.register(
            "t",
            Box::new(
                MemoryTableSource::new(vec![ColumnInfo {
                    name: "n".into(),
                    declared_type: "INTEGER".into(),
                    nullable: false,
                    index_kind: IndexKind::None,
                }])
                .with_row(Row::new().with("n", Value::Int(1))),
            ),
        );
        let executor = QueryExecutor::new(&registry, &clock);

        let mut inner = SelectStatement::empty();
        inner.select_list = vec![SelectColumn::new(Expr::column("n"))];
        inner.from = Some(TableRef::table("t"));

        let cte = CommonTableExpr {
            name: "c".into(),
            columns: Vec::new(),
            query: Box::new(inner),
            recursive: false,
        };

        let scope = evaluate_ctes(&executor, std::slice::from_ref(&cte), &OuterContext::new()).unwrap();
        assert!(scope.contains_key("c"));
        assert_eq!(scope["c"].rows.len(), 1);
    }

    #[test]
    fn recursive_cte_stops_when_no_new_rows() {
        let clock = clock();
        let registry = TableRegistry::new();
        let executor = QueryExecutor::new(&registry, &clock);

        let mut anchor = SelectStatement::empty();
        anchor.select_list = vec![SelectColumn::new(Expr::integer(1))];

        let mut recursive = SelectStatement::empty();
        recursive.select_list = vec![SelectColumn::new(Expr::column("n").binary(crate::ast::BinaryOp::Add, Expr::integer(1)))];
        recursive.from = Some(TableRef::table("counter"));
        recursive.where_clause = Some(Expr::column("n").binary(crate::ast::BinaryOp::Lt, Expr::integer(3)));

        anchor.select_list = vec![SelectColumn::with_alias(Expr::integer(1), "n")];
        recursive.select_list = vec![SelectColumn::with_alias(
            Expr::column("n").binary(crate::ast::BinaryOp::Add, Expr::integer(1)),
            "n",
        )];

        anchor.set_op = Some(crate::ast::SetOperation {
            op: SetOp::UnionAll,
            right: Box::new(recursive),
        });

        let cte = CommonTableExpr {
            name: "counter".into(),
            columns: Vec::new(),
            query: Box::new(anchor),
            recursive: true,
        };

        let scope = evaluate_ctes(&executor, std::slice::from_ref(&cte), &OuterContext::new()).unwrap();
        let mut values: Vec<i64> = scope["counter"]
            .rows
            .iter()
            .filter_map(|r| match r.get("n") {
                Some(Value::Int(n)) => Some(*n),
                _ => None,
            })
            .collect();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
