//! `GROUP BY` partitioning and aggregate computation (§4.4 stage 4).
//!
//! Grouping uses row-equality (`Null = Null`), preserving first-encounter
//! order. Aggregate nodes found anywhere in an expression (`SELECT`,
//! `HAVING`, `ORDER BY`) are computed against a group's member rows and
//! spliced back in as literals, so the rest of the tree evaluates through
//! the ordinary [`crate::eval::Evaluator`] with no special casing.

use crate::ast::{AggregateFn, Expr, LiteralKind};
use crate::error::Result;
use crate::eval::{Evaluator, OuterContext};
use crate::row::Row;
use crate::value::Value;

/// One `GROUP BY` partition: the representative row (its first member,
/// used to resolve non-aggregated column references) and every member.
pub struct Group {
    pub representative: Row,
    pub members: Vec<Row>,
}

/// Partitions `rows` by the tuple of `group_by` expressions, in
/// first-encounter order. With an empty `group_by` but a non-empty input,
/// the whole input is a single group (only valid when the caller already
/// knows an aggregate appears in the select list).
pub fn group_rows(evaluator: &Evaluator<'_>, rows: Vec<Row>, group_by: &[Expr], outer_ctx: &OuterContext) -> Result<Vec<Group>> {
    if group_by.is_empty() {
        return Ok(if rows.is_empty() {
            Vec::new()
        } else {
            vec![Group {
                representative: rows[0].clone(),
                members: rows,
            }]
        });
    }

    let mut groups: Vec<(Vec<Value>, Group)> = Vec::new();
    for row in rows {
        let key = group_by
            .iter()
            .map(|e| evaluator.eval(e, &row, outer_ctx))
            .collect::<Result<Vec<_>>>()?;
        match groups.iter_mut().find(|(k, _)| keys_equal(k, &key)) {
            Some((_, group)) => group.members.push(row),
            None => groups.push((
                key,
                Group {
                    representative: row.clone(),
                    members: vec![row],
                },
            )),
        }
    }
    Ok(groups.into_iter().map(|(_, group)| group).collect())
}

fn keys_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
}

/// Rewrites every [`Expr::Aggregate`] node in `expr` into a literal
/// computed against `group`'s members, leaving every other node as-is
/// (but rebuilt, since `Expr` owns its children).
pub fn substitute_aggregates(evaluator: &Evaluator<'_>, expr: &Expr, group: &[Row], outer_ctx: &OuterContext) -> Result<Expr> {
    Ok(match expr {
        Expr::Aggregate { func, distinct, expr: arg } => {
            let value = compute_aggregate(evaluator, *func, *distinct, arg.as_deref(), group, outer_ctx)?;
            Expr::Literal {
                value,
                kind: LiteralKind::Number,
            }
        }
        Expr::Binary { left, op, right } => Expr::Binary {
            left: Box::new(substitute_aggregates(evaluator, left, group, outer_ctx)?),
            op: *op,
            right: Box::new(substitute_aggregates(evaluator, right, group, outer_ctx)?),
        },
        Expr::Unary { op, expr } => Expr::Unary {
            op: *op,
            expr: Box::new(substitute_aggregates(evaluator, expr, group, outer_ctx)?),
        },
        Expr::FunctionCall(call) => Expr::FunctionCall(crate::ast::FunctionCall {
            name: call.name.clone(),
            args: call
                .args
                .iter()
                .map(|a| substitute_aggregates(evaluator, a, group, outer_ctx))
                .collect::<Result<Vec<_>>>()?,
        }),
        Expr::Between { expr, low, high, negated } => Expr::Between {
            expr: Box::new(substitute_aggregates(evaluator, expr, group, outer_ctx)?),
            low: Box::new(substitute_aggregates(evaluator, low, group, outer_ctx)?),
            high: Box::new(substitute_aggregates(evaluator, high, group, outer_ctx)?),
            negated: *negated,
        },
        Expr::In { left, values, negated } => Expr::In {
            left: Box::new(substitute_aggregates(evaluator, left, group, outer_ctx)?),
            values: values
                .iter()
                .map(|v| substitute_aggregates(evaluator, v, group, outer_ctx))
                .collect::<Result<Vec<_>>>()?,
            negated: *negated,
        },
        Expr::IsNull { expr, negated } => Expr::IsNull {
            expr: Box::new(substitute_aggregates(evaluator, expr, group, outer_ctx)?),
            negated: *negated,
        },
        Expr::Like { left, pattern, negated } => Expr::Like {
            left: Box::new(substitute_aggregates(evaluator, left, group, outer_ctx)?),
            pattern: Box::new(substitute_aggregates(evaluator, pattern, group, outer_ctx)?),
            negated: *negated,
        },
        Expr::CaseWhen {
            operand,
            branches,
            else_branch,
        } => Expr::CaseWhen {
            operand: operand
                .as_ref()
                .map(|o| substitute_aggregates(evaluator, o, group, outer_ctx))
                .transpose()?
                .map(Box::new),
            branches: branches
                .iter()
                .map(|(when, then)| {
                    Ok((
                        substitute_aggregates(evaluator, when, group, outer_ctx)?,
                        substitute_aggregates(evaluator, then, group, outer_ctx)?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?,
            else_branch: else_branch
                .as_ref()
                .map(|e| substitute_aggregates(evaluator, e, group, outer_ctx))
                .transpose()?
                .map(Box::new),
        },
        // Literals, placeholders, identifiers, subqueries, niladic
        // functions, windows, and wildcards carry no aggregate node and
        // are returned unchanged; subqueries are correlated to the
        // group's representative row elsewhere, not rewritten here.
        other => other.clone(),
    })
}

fn compute_aggregate(
    evaluator: &Evaluator<'_>,
    func: AggregateFn,
    distinct: bool,
    arg: Option<&Expr>,
    group: &[Row],
    outer_ctx: &OuterContext,
) -> Result<Value> {
    if matches!(func, AggregateFn::Count) && arg.is_none() {
        return Ok(Value::Int(group.len() as i64));
    }
    let Some(arg) = arg else {
        return Ok(Value::Null);
    };

    let mut values = group
        .iter()
        .map(|row| evaluator.eval(arg, row, outer_ctx))
        .collect::<Result<Vec<_>>>()?;

    if distinct {
        let mut deduped: Vec<Value> = Vec::new();
        for v in values {
            if !deduped.iter().any(|d| d.loose_eq(&v)) {
                deduped.push(v);
            }
        }
        values = deduped;
    }

    let non_null: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();

    Ok(match func {
        AggregateFn::Count => Value::Int(non_null.len() as i64),
        AggregateFn::Sum => {
            if non_null.is_empty() {
                Value::Null
            } else {
                Value::Float(non_null.iter().filter_map(|v| v.as_f64()).sum())
            }
        }
        AggregateFn::Avg => {
            if non_null.is_empty() {
                Value::Null
            } else {
                let sum: f64 = non_null.iter().filter_map(|v| v.as_f64()).sum();
                Value::Float(sum / non_null.len() as f64)
            }
        }
        AggregateFn::Min => non_null
            .into_iter()
            .min_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
        AggregateFn::Max => non_null
            .into_iter()
            .max_by(|a, b| a.total_cmp(b))
            .cloned()
            .unwrap_or(Value::Null),
    })
}
