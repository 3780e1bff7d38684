//! Window function computation (`ROW_NUMBER`, `RANK`, `DENSE_RANK`), folded
//! into the projection stage (§4.4 stage 6) rather than run after set
//! operations — see `DESIGN.md` for why.
//!
//! Each window expression partitions the input rows by its `PARTITION BY`
//! list, sorts each partition by its `ORDER BY` list, and assigns a value
//! per row within that partition. The computed values are handed back
//! aligned with the input row order so the caller can substitute them by
//! position.

use crate::ast::{Expr, FunctionCall, LiteralKind, OrderDirection, WindowFn};
use crate::error::Result;
use crate::eval::{Evaluator, OuterContext};
use crate::row::Row;
use crate::value::Value;

/// Rewrites `expr`'s `Expr::Window` nodes into one `Expr::Literal` per row
/// in `rows`, producing a `Vec<Expr>` of the same length aligned by
/// position — mirrors [`super::aggregate::substitute_aggregates`]'s
/// recursive structure, except a window value varies per row so the
/// result is a row-aligned vector rather than a single rewritten `Expr`.
pub fn substitute_windows_for_all_rows(evaluator: &Evaluator<'_>, expr: &Expr, rows: &[Row], outer_ctx: &OuterContext) -> Result<Vec<Expr>> {
    let literal = |value: Value| Expr::Literal { value, kind: LiteralKind::Number };

    Ok(match expr {
        Expr::Window { func, partition_by, order_by } => {
            let values = compute_window(evaluator, *func, partition_by, order_by, rows, outer_ctx)?;
            values.into_iter().map(literal).collect()
        }
        Expr::Binary { left, op, right } => {
            let left = substitute_windows_for_all_rows(evaluator, left, rows, outer_ctx)?;
            let right = substitute_windows_for_all_rows(evaluator, right, rows, outer_ctx)?;
            left.into_iter()
                .zip(right)
                .map(|(l, r)| Expr::Binary {
                    left: Box::new(l),
                    op: *op,
                    right: Box::new(r),
                })
                .collect()
        }
        Expr::Unary { op, expr } => substitute_windows_for_all_rows(evaluator, expr, rows, outer_ctx)?
            .into_iter()
            .map(|e| Expr::Unary { op: *op, expr: Box::new(e) })
            .collect(),
        Expr::FunctionCall(call) => {
            let per_arg = call
                .args
                .iter()
                .map(|a| substitute_windows_for_all_rows(evaluator, a, rows, outer_ctx))
                .collect::<Result<Vec<_>>>()?;
            (0..rows.len())
                .map(|i| {
                    Expr::FunctionCall(FunctionCall {
                        name: call.name.clone(),
                        args: per_arg.iter().map(|col| col[i].clone()).collect(),
                    })
                })
                .collect()
        }
        Expr::Between { expr, low, high, negated } => {
            let expr = substitute_windows_for_all_rows(evaluator, expr, rows, outer_ctx)?;
            let low = substitute_windows_for_all_rows(evaluator, low, rows, outer_ctx)?;
            let high = substitute_windows_for_all_rows(evaluator, high, rows, outer_ctx)?;
            (0..rows.len())
                .map(|i| Expr::Between {
                    expr: Box::new(expr[i].clone()),
                    low: Box::new(low[i].clone()),
                    high: Box::new(high[i].clone()),
                    negated: *negated,
                })
                .collect()
        }
        Expr::In { left, values, negated } => {
            let left = substitute_windows_for_all_rows(evaluator, left, rows, outer_ctx)?;
            let per_value = values
                .iter()
                .map(|v| substitute_windows_for_all_rows(evaluator, v, rows, outer_ctx))
                .collect::<Result<Vec<_>>>()?;
            (0..rows.len())
                .map(|i| Expr::In {
                    left: Box::new(left[i].clone()),
                    values: per_value.iter().map(|col| col[i].clone()).collect(),
                    negated: *negated,
                })
                .collect()
        }
        Expr::IsNull { expr, negated } => substitute_windows_for_all_rows(evaluator, expr, rows, outer_ctx)?
            .into_iter()
            .map(|e| Expr::IsNull { expr: Box::new(e), negated: *negated })
            .collect(),
        Expr::Like { left, pattern, negated } => {
            let left = substitute_windows_for_all_rows(evaluator, left, rows, outer_ctx)?;
            let pattern = substitute_windows_for_all_rows(evaluator, pattern, rows, outer_ctx)?;
            left.into_iter()
                .zip(pattern)
                .map(|(l, p)| Expr::Like {
                    left: Box::new(l),
                    pattern: Box::new(p),
                    negated: *negated,
                })
                .collect()
        }
        Expr::CaseWhen { operand, branches, else_branch } => {
            let operand = operand
                .as_deref()
                .map(|o| substitute_windows_for_all_rows(evaluator, o, rows, outer_ctx))
                .transpose()?;
            let per_branch = branches
                .iter()
                .map(|(w, t)| {
                    Ok((
                        substitute_windows_for_all_rows(evaluator, w, rows, outer_ctx)?,
                        substitute_windows_for_all_rows(evaluator, t, rows, outer_ctx)?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            let else_branch = else_branch
                .as_deref()
                .map(|e| substitute_windows_for_all_rows(evaluator, e, rows, outer_ctx))
                .transpose()?;
            (0..rows.len())
                .map(|i| Expr::CaseWhen {
                    operand: operand.as_ref().map(|o| Box::new(o[i].clone())),
                    branches: per_branch.iter().map(|(w, t)| (w[i].clone(), t[i].clone())).collect(),
                    else_branch: else_branch.as_ref().map(|e| Box::new(e[i].clone())),
                })
                .collect()
        }
        // Aggregates are substituted by their own stage; subqueries,
        // literals and bare identifiers don't vary by the window's row
        // alignment, so the same node is broadcast to every row.
        other => vec![other.clone(); rows.len()],
    })
}

/// Computes one `Expr::Window` node's value for every row in `rows`,
/// returned in the same order.
pub fn compute_window(
    evaluator: &Evaluator<'_>,
    func: WindowFn,
    partition_by: &[Expr],
    order_by: &[crate::ast::OrderBy],
    rows: &[Row],
    outer_ctx: &OuterContext,
) -> Result<Vec<Value>> {
    let mut partition_keys = Vec::with_capacity(rows.len());
    for row in rows {
        let key = partition_by
            .iter()
            .map(|e| evaluator.eval(e, row, outer_ctx))
            .collect::<Result<Vec<_>>>()?;
        partition_keys.push(key);
    }

    let mut partitions: Vec<(Vec<Value>, Vec<usize>)> = Vec::new();
    for (idx, key) in partition_keys.iter().enumerate() {
        match partitions.iter_mut().find(|(k, _)| keys_equal(k, key)) {
            Some((_, members)) => members.push(idx),
            None => partitions.push((key.clone(), vec![idx])),
        }
    }

    let mut out = vec![Value::Null; rows.len()];
    for (_, mut members) in partitions {
        sort_partition(evaluator, &mut members, order_by, rows, outer_ctx)?;
        assign_ranks(func, &members, order_by, rows, evaluator, outer_ctx, &mut out)?;
    }
    Ok(out)
}

fn keys_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
}

fn sort_partition(
    evaluator: &Evaluator<'_>,
    members: &mut [usize],
    order_by: &[crate::ast::OrderBy],
    rows: &[Row],
    outer_ctx: &OuterContext,
) -> Result<()> {
    let mut keyed: Vec<(usize, Vec<Value>)> = members
        .iter()
        .map(|&idx| {
            let key = order_by
                .iter()
                .map(|o| evaluator.eval(&o.expr, &rows[idx], outer_ctx))
                .collect::<Result<Vec<_>>>()?;
            Ok((idx, key))
        })
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by(|(_, a), (_, b)| {
        for (i, ob) in order_by.iter().enumerate() {
            let ordering = a[i].total_cmp(&b[i]);
            let ordering = if ob.direction == OrderDirection::Desc {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });

    for (slot, (idx, _)) in members.iter_mut().zip(keyed) {
        *slot = idx;
    }
    Ok(())
}

fn assign_ranks(
    func: WindowFn,
    members: &[usize],
    order_by: &[crate::ast::OrderBy],
    rows: &[Row],
    evaluator: &Evaluator<'_>,
    outer_ctx: &OuterContext,
    out: &mut [Value],
) -> Result<()> {
    let mut previous_key: Option<Vec<Value>> = None;
    let mut rank = 0i64;
    let mut dense_rank = 0i64;

    for (position, &idx) in members.iter().enumerate() {
        let key = order_by
            .iter()
            .map(|o| evaluator.eval(&o.expr, &rows[idx], outer_ctx))
            .collect::<Result<Vec<_>>>()?;

        let is_new = match &previous_key {
            Some(prev) => !keys_equal(prev, &key),
            None => true,
        };

        if is_new {
            rank = position as i64 + 1;
            dense_rank += 1;
        }
        previous_key = Some(key);

        out[idx] = match func {
            WindowFn::RowNumber => Value::Int(position as i64 + 1),
            WindowFn::Rank => Value::Int(rank),
            WindowFn::DenseRank => Value::Int(dense_rank),
        };
    }
    Ok(())
}
