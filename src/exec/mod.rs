//! The query executor (C5): the ten-stage pipeline that turns a
//! [`SelectStatement`] into a [`QueryResult`] — `WITH` evaluation, `FROM`
//! composition, `WHERE` filtering, `GROUP BY`/`HAVING`, projection (with
//! window functions folded in), set operations, `ORDER BY`, and
//! `OFFSET`/`LIMIT`.
//!
//! Subqueries are dispatched back into this same pipeline through
//! [`crate::eval::SubqueryExecutor`], so a correlated subquery sees the
//! same CTE scope, registry, and clock as its enclosing statement.

pub mod aggregate;
pub mod cte;
pub mod join;
pub mod pushdown;
pub mod setop;
pub mod window;

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;

use crate::ast::{Expr, JoinClause, OrderDirection, SelectColumn, SelectStatement, TableRef};
use crate::clock::Clock;
use crate::error::{FedSqlError, Result};
use crate::eval::{Evaluator, OuterContext, SubqueryExecutor};
use crate::registry::TableRegistry;
use crate::row::Row;
use crate::rewrite;
use crate::value::Value;

use join::Scan;

/// Per-statement execution limits (§5 "Resource limits").
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    /// The largest `FROM` tree, by leaf count, this executor accepts
    /// before raising [`FedSqlError::TooManyCommaJoins`]. Applied to any
    /// `FROM` shape, not only a literal comma list — see `DESIGN.md`.
    pub comma_join_limit: usize,
    /// When set, checked at the start of every statement evaluation
    /// (including each recursive-CTE round and subquery dispatch);
    /// exceeding it raises [`FedSqlError::QueryTimeout`].
    pub deadline: Option<Instant>,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            comma_join_limit: 4,
            deadline: None,
        }
    }
}

/// A materialised `SELECT` result: the projection's column labels, in
/// order, plus every output row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Column labels in projection order.
    pub columns: Vec<String>,
    /// Output rows, already filtered/grouped/sorted/limited.
    pub rows: Vec<Row>,
}

/// Executes `SELECT` statements against a [`TableRegistry`].
pub struct QueryExecutor<'a> {
    pub(crate) registry: &'a TableRegistry,
    pub(crate) clock: &'a dyn Clock,
    limits: ExecutionLimits,
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor with default limits.
    #[must_use]
    pub fn new(registry: &'a TableRegistry, clock: &'a dyn Clock) -> Self {
        Self {
            registry,
            clock,
            limits: ExecutionLimits::default(),
        }
    }

    /// Overrides this executor's [`ExecutionLimits`].
    #[must_use]
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Runs a top-level (non-correlated) `SELECT`.
    pub fn execute(&self, stmt: &SelectStatement) -> Result<QueryResult> {
        self.execute_inner(stmt, &Row::new(), &OuterContext::new())
    }

    /// Runs `stmt` with `outer_row`/`outer_ctx` already established (a
    /// subquery body), and no extra CTE scope beyond `stmt`'s own `WITH`.
    pub(crate) fn execute_inner(&self, stmt: &SelectStatement, outer_row: &Row, outer_ctx: &OuterContext) -> Result<QueryResult> {
        self.execute_with_scope(stmt, outer_row, outer_ctx, &HashMap::new())
    }

    /// Runs `stmt` with an additional CTE scope merged in ahead of
    /// `stmt`'s own `WITH` clause — used by recursive-CTE evaluation to
    /// expose the working table to the anchor/recursive members.
    pub(crate) fn execute_with_scope(
        &self,
        stmt: &SelectStatement,
        outer_row: &Row,
        outer_ctx: &OuterContext,
        extra_ctes: &HashMap<String, Scan>,
    ) -> Result<QueryResult> {
        let _ = outer_row; // only meaningful at the SubqueryExecutor boundary, where it's pushed onto outer_ctx.
        self.check_deadline()?;

        let span = tracing::debug_span!("select_statement");
        let _enter = span.enter();

        let mut cte_scope = extra_ctes.clone();
        cte_scope.extend(cte::evaluate_ctes(self, &stmt.ctes, outer_ctx)?);

        let evaluator = Evaluator::new(self.clock, self);

        // De Morgan-normalize WHERE/HAVING/ON before pushdown planning, so a
        // NOT-heavy predicate like `NOT (a.x = 1 AND b.y = 2)` still flattens
        // into per-table conjuncts instead of surviving as one opaque NOT.
        let where_clause = stmt.where_clause.clone().map(rewrite::rewrite);
        let having = stmt.having.clone().map(rewrite::rewrite);
        let from = stmt.from.as_ref().map(rewrite_table_ref);

        let (scan, residual_filter) = match &from {
            Some(table_ref) => {
                let leaf_count = table_ref.leaf_count();
                if leaf_count > self.limits.comma_join_limit {
                    return Err(FedSqlError::TooManyCommaJoins {
                        found: leaf_count,
                        limit: self.limits.comma_join_limit,
                    });
                }
                let leaves = collect_leaf_names(table_ref);
                let plan = pushdown::plan(where_clause.clone(), &leaves);
                let scan = join::compose_from(self, table_ref, &cte_scope, &plan.per_table, outer_ctx)?;
                let residual = combine_residual(plan.residual, scan.leftover.clone());
                (scan, residual)
            }
            None => (
                Scan {
                    rows: vec![Row::new()],
                    leaves: Vec::new(),
                    leftover: None,
                },
                where_clause.clone(),
            ),
        };
        debug!(stage = "from_composition", rows = scan.rows.len());
        let leaves = scan.leaves;
        let mut rows = scan.rows;

        if let Some(filter) = &residual_filter {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                self.check_deadline()?;
                if evaluator.eval_bool(filter, &row, outer_ctx)?.is_true() {
                    kept.push(row);
                }
            }
            rows = kept;
        }
        debug!(stage = "where_filter", rows = rows.len());

        let needs_grouping = !stmt.group_by.is_empty() || stmt.select_list.iter().any(|c| contains_aggregate(&c.expr));
        let mut projected = if needs_grouping {
            self.project_grouped(&evaluator, stmt, having.as_ref(), rows, outer_ctx)?
        } else {
            self.project_plain(&evaluator, &stmt.select_list, &rows, &leaves, outer_ctx)?
        };
        debug!(stage = "group_by_and_projection", rows = projected.len());

        if stmt.distinct {
            projected = dedupe(projected);
        }

        let columns = projection_labels(&stmt.select_list);
        let (projected, columns) = if let Some(set_op) = &stmt.set_op {
            let right = self.execute_with_scope(&set_op.right, outer_row, outer_ctx, extra_ctes)?;
            let combined = setop::apply(set_op.op, projected, &columns, right.rows, &right.columns)?;
            (combined, columns)
        } else {
            (projected, columns)
        };
        let mut projected = projected;
        debug!(stage = "set_op", rows = projected.len());

        if !stmt.order_by.is_empty() {
            self.sort_rows(&evaluator, &mut projected, &stmt.order_by, outer_ctx)?;
        }
        debug!(stage = "order_by", rows = projected.len());

        let offset = self.eval_row_count(&evaluator, stmt.offset.as_ref(), outer_ctx)?.unwrap_or(0);
        let limit = self.eval_row_count(&evaluator, stmt.limit.as_ref(), outer_ctx)?;
        let projected = apply_offset_limit(projected, offset, limit);
        debug!(stage = "offset_limit", rows = projected.len());

        Ok(QueryResult { columns, rows: projected })
    }

    fn project_plain(
        &self,
        evaluator: &Evaluator<'_>,
        select_list: &[SelectColumn],
        rows: &[Row],
        leaves: &[(String, Vec<crate::source::ColumnInfo>)],
        outer_ctx: &OuterContext,
    ) -> Result<Vec<Row>> {
        let mut per_column: Vec<Vec<Expr>> = Vec::with_capacity(select_list.len());
        for col in select_list {
            per_column.push(window::substitute_windows_for_all_rows(evaluator, &col.expr, rows, outer_ctx)?);
        }

        let mut out = Vec::with_capacity(rows.len());
        for (row_idx, row) in rows.iter().enumerate() {
            let mut out_row = Row::new();
            for (col_idx, col) in select_list.iter().enumerate() {
                match &col.expr {
                    Expr::Wildcard { table } => expand_wildcard(&mut out_row, table.as_deref(), leaves, row),
                    _ => {
                        let expr = &per_column[col_idx][row_idx];
                        let value = evaluator.eval(expr, row, outer_ctx)?;
                        let label = col.alias.clone().unwrap_or_else(|| column_label(&col.expr));
                        out_row.set(label, value);
                    }
                }
            }
            out.push(out_row);
        }
        Ok(out)
    }

    fn project_grouped(
        &self,
        evaluator: &Evaluator<'_>,
        stmt: &SelectStatement,
        having: Option<&Expr>,
        rows: Vec<Row>,
        outer_ctx: &OuterContext,
    ) -> Result<Vec<Row>> {
        let groups = aggregate::group_rows(evaluator, rows, &stmt.group_by, outer_ctx)?;
        let mut out = Vec::with_capacity(groups.len());
        for group in &groups {
            if let Some(having) = having {
                let rewritten = aggregate::substitute_aggregates(evaluator, having, &group.members, outer_ctx)?;
                if !evaluator.eval_bool(&rewritten, &group.representative, outer_ctx)?.is_true() {
                    continue;
                }
            }
            let mut out_row = Row::new();
            for col in &stmt.select_list {
                let rewritten = aggregate::substitute_aggregates(evaluator, &col.expr, &group.members, outer_ctx)?;
                let value = evaluator.eval(&rewritten, &group.representative, outer_ctx)?;
                let label = col.alias.clone().unwrap_or_else(|| column_label(&col.expr));
                out_row.set(label, value);
            }
            out.push(out_row);
        }
        Ok(out)
    }

    fn sort_rows(&self, evaluator: &Evaluator<'_>, rows: &mut [Row], order_by: &[crate::ast::OrderBy], outer_ctx: &OuterContext) -> Result<()> {
        let mut keyed: Vec<(Row, Vec<Value>)> = rows
            .iter()
            .map(|row| {
                let key = order_by
                    .iter()
                    .map(|o| evaluator.eval(&o.expr, row, outer_ctx))
                    .collect::<Result<Vec<_>>>()?;
                Ok((row.clone(), key))
            })
            .collect::<Result<Vec<_>>>()?;

        keyed.sort_by(|(_, a), (_, b)| {
            for (i, ob) in order_by.iter().enumerate() {
                let (av, bv) = (&a[i], &b[i]);
                let null_ordering = ob.nulls.unwrap_or(match ob.direction {
                    OrderDirection::Asc => crate::ast::NullOrdering::Last,
                    OrderDirection::Desc => crate::ast::NullOrdering::First,
                });
                let ordering = match (av.is_null(), bv.is_null()) {
                    (true, true) => std::cmp::Ordering::Equal,
                    (true, false) => match null_ordering {
                        crate::ast::NullOrdering::First => std::cmp::Ordering::Less,
                        crate::ast::NullOrdering::Last => std::cmp::Ordering::Greater,
                    },
                    (false, true) => match null_ordering {
                        crate::ast::NullOrdering::First => std::cmp::Ordering::Greater,
                        crate::ast::NullOrdering::Last => std::cmp::Ordering::Less,
                    },
                    (false, false) => {
                        let cmp = av.total_cmp(bv);
                        if ob.direction == OrderDirection::Desc {
                            cmp.reverse()
                        } else {
                            cmp
                        }
                    }
                };
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });

        for (slot, (row, _)) in rows.iter_mut().zip(keyed) {
            *slot = row;
        }
        Ok(())
    }

    fn eval_row_count(&self, evaluator: &Evaluator<'_>, expr: Option<&Expr>, outer_ctx: &OuterContext) -> Result<Option<usize>> {
        let Some(expr) = expr else { return Ok(None) };
        let value = evaluator.eval(expr, &Row::new(), outer_ctx)?;
        Ok(match value {
            Value::Int(i) => Some(i.max(0) as usize),
            Value::Float(f) => Some(f.max(0.0) as usize),
            _ => None,
        })
    }

    fn check_deadline(&self) -> Result<()> {
        match self.limits.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(FedSqlError::QueryTimeout),
            _ => Ok(()),
        }
    }
}

impl<'a> SubqueryExecutor for QueryExecutor<'a> {
    fn execute(&self, query: &SelectStatement, outer_row: &Row, outer_ctx: &OuterContext) -> Result<Vec<Row>> {
        let pushed = outer_ctx.pushed(outer_row.clone());
        Ok(self.execute_with_scope(query, outer_row, &pushed, &HashMap::new())?.rows)
    }
}

/// Re-derives a `TableRef` tree with every `JOIN ... ON` predicate
/// De Morgan-normalized, so [`join::compose_from`]'s equi-join detection
/// and the WHERE-side pushdown planner see the same normal form.
fn rewrite_table_ref(table_ref: &TableRef) -> TableRef {
    match table_ref {
        TableRef::Join { left, join } => TableRef::Join {
            left: Box::new(rewrite_table_ref(left)),
            join: Box::new(JoinClause {
                join_type: join.join_type,
                table: rewrite_table_ref(&join.table),
                on: join.on.clone().map(rewrite::rewrite),
            }),
        },
        other => other.clone(),
    }
}

/// Combines a pushdown plan's cross-table residual with the per-table
/// filters a source declined to absorb, so the WHERE stage re-checks
/// exactly what wasn't already proven true, instead of the whole
/// original predicate.
fn combine_residual(a: Option<Expr>, b: Option<Expr>) -> Option<Expr> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.and(b)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

/// Gathers every leaf table's binding name under `table_ref`, in
/// left-to-right order, for pushdown planning and the comma-join cap.
fn collect_leaf_names(table_ref: &TableRef) -> Vec<String> {
    match table_ref {
        TableRef::Table { name, alias, .. } => vec![alias.clone().unwrap_or_else(|| name.clone())],
        TableRef::Subquery { alias, .. } => vec![alias.clone()],
        TableRef::Join { left, join } => {
            let mut names = collect_leaf_names(left);
            names.extend(collect_leaf_names(&join.table));
            names
        }
    }
}

/// Whether `expr` contains an [`Expr::Aggregate`] node anywhere, which
/// forces the grouped projection path even with an empty `GROUP BY`.
fn contains_aggregate(expr: &Expr) -> bool {
    match expr {
        Expr::Aggregate { .. } => true,
        Expr::Binary { left, right, .. } => contains_aggregate(left) || contains_aggregate(right),
        Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } => contains_aggregate(expr),
        Expr::FunctionCall(call) => call.args.iter().any(contains_aggregate),
        Expr::Between { expr, low, high, .. } => contains_aggregate(expr) || contains_aggregate(low) || contains_aggregate(high),
        Expr::In { left, values, .. } => contains_aggregate(left) || values.iter().any(contains_aggregate),
        Expr::Like { left, pattern, .. } => contains_aggregate(left) || contains_aggregate(pattern),
        Expr::CaseWhen { operand, branches, else_branch } => {
            operand.as_deref().is_some_and(contains_aggregate)
                || branches.iter().any(|(w, t)| contains_aggregate(w) || contains_aggregate(t))
                || else_branch.as_deref().is_some_and(contains_aggregate)
        }
        // A subquery's own aggregates belong to its own grouping stage, not
        // the enclosing statement's.
        Expr::Literal { .. }
        | Expr::Placeholder { .. }
        | Expr::Identifier { .. }
        | Expr::InSubquery { .. }
        | Expr::Subquery { .. }
        | Expr::NiladicFn(_)
        | Expr::Window { .. }
        | Expr::Wildcard { .. } => false,
    }
}

fn expand_wildcard(out_row: &mut Row, table: Option<&str>, leaves: &[(String, Vec<crate::source::ColumnInfo>)], row: &Row) {
    for (alias, columns) in leaves {
        if table.is_some_and(|t| t != alias) {
            continue;
        }
        for col in columns {
            let key = format!("{alias}.{}", col.name);
            let value = row.get(&key).cloned().unwrap_or(Value::Null);
            out_row.set(col.name.clone(), value);
        }
    }
}

fn column_label(expr: &Expr) -> String {
    match expr {
        Expr::Identifier { parts } => parts.last().cloned().unwrap_or_default(),
        other => other.to_string(),
    }
}

fn projection_labels(select_list: &[SelectColumn]) -> Vec<String> {
    select_list
        .iter()
        .map(|col| match (&col.alias, &col.expr) {
            (Some(alias), _) => alias.clone(),
            (None, Expr::Wildcard { .. }) => "*".to_string(),
            (None, expr) => column_label(expr),
        })
        .collect()
}

fn dedupe(rows: Vec<Row>) -> Vec<Row> {
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    for row in rows {
        if !out.iter().any(|r: &Row| r.row_eq(&row)) {
            out.push(row);
        }
    }
    out
}

fn apply_offset_limit(rows: Vec<Row>, offset: usize, limit: Option<usize>) -> Vec<Row> {
    let skipped = rows.into_iter().skip(offset);
    match limit {
        Some(limit) => skipped.take(limit).collect(),
        None => skipped.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, JoinClause, JoinType, NullOrdering, OrderBy, SelectStatement};
    use crate::clock::FixedClock;
    use crate::source::{ColumnInfo, IndexKind, MemoryTableSource};
    use crate::value::Value;
    use chrono::NaiveDateTime;

    fn clock() -> FixedClock {
        FixedClock(NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap())
    }

    fn users() -> Box<dyn crate::source::TableSource> {
        Box::new(
            MemoryTableSource::new(vec![
                ColumnInfo {
                    name: "id".into(),
                    declared_type: "INTEGER".into(),
                    nullable: false,
                    index_kind: IndexKind::Unique,
                },
                ColumnInfo {
                    name: "name".into(),
                    declared_type: "TEXT".into(),
                    nullable: false,
                    index_kind: IndexKind::None,
                },
            ])
            .with_rows([
                Row::new().with("id", Value::Int(1)).with("name", Value::Text("alice".into())),
                Row::new().with("id", Value::Int(2)).with("name", Value::Text("bob".into())),
            ]),
        )
    }

    fn orders() -> Box<dyn crate::source::TableSource> {
        Box::new(
            MemoryTableSource::new(vec![
                ColumnInfo {
                    name: "user_id".into(),
                    declared_type: "INTEGER".into(),
                    nullable: false,
                    index_kind: IndexKind::None,
                },
                ColumnInfo {
                    name: "total".into(),
                    declared_type: "FLOAT".into(),
                    nullable: false,
                    index_kind: IndexKind::None,
                },
            ])
            .with_rows([
                Row::new().with("user_id", Value::Int(1)).with("total", Value::Float(10.0)),
                Row::new().with("user_id", Value::Int(1)).with("total", Value::Float(30.0)),
                Row::new().with("user_id", Value::Int(2)).with("total", Value::Float(5.0)),
            ]),
        )
    }

    #[test]
    fn select_with_where_and_order_by() {
        let clock = clock();
        let mut registry = TableRegistry::new();
        registry.register("users", users());
        let executor = QueryExecutor::new(&registry, &clock);

        let mut stmt = SelectStatement::empty();
        stmt.select_list = vec![SelectColumn::new(Expr::column("name"))];
        stmt.from = Some(TableRef::table("users"));
        stmt.where_clause = Some(Expr::column("id").binary(BinaryOp::Gt, Expr::integer(0)));
        stmt.order_by = vec![OrderBy {
            expr: Expr::column("name"),
            direction: OrderDirection::Desc,
            nulls: Some(NullOrdering::Last),
        }];

        let result = executor.execute(&stmt).unwrap();
        let names: Vec<&Value> = result.rows.iter().map(|r| r.get("name").unwrap()).collect();
        assert_eq!(names, vec![&Value::Text("bob".into()), &Value::Text("alice".into())]);
    }

    #[test]
    fn join_and_group_by_aggregates_per_user() {
        let clock = clock();
        let mut registry = TableRegistry::new();
        registry.register("users", users());
        registry.register("orders", orders());
        let executor = QueryExecutor::new(&registry, &clock);

        let mut stmt = SelectStatement::empty();
        stmt.select_list = vec![
            SelectColumn::new(Expr::qualified_column("u", "name")),
            SelectColumn::with_alias(
                Expr::Aggregate {
                    func: crate::ast::AggregateFn::Sum,
                    distinct: false,
                    expr: Some(Box::new(Expr::qualified_column("o", "total"))),
                },
                "spent",
            ),
        ];
        stmt.from = Some(TableRef::Join {
            left: Box::new(TableRef::table("users").alias("u")),
            join: Box::new(JoinClause {
                join_type: JoinType::Inner,
                table: TableRef::table("orders").alias("o"),
                on: Some(Expr::qualified_column("o", "user_id").eq(Expr::qualified_column("u", "id"))),
            }),
        });
        stmt.group_by = vec![Expr::qualified_column("u", "name")];
        stmt.order_by = vec![OrderBy {
            expr: Expr::column("name"),
            direction: OrderDirection::Asc,
            nulls: None,
        }];

        let result = executor.execute(&stmt).unwrap();
        assert_eq!(result.rows.len(), 2);
        let alice = result.rows.iter().find(|r| r.get("name") == Some(&Value::Text("alice".into()))).unwrap();
        assert_eq!(alice.get("spent"), Some(&Value::Float(40.0)));
    }

    #[test]
    fn limit_and_offset_slice_the_result() {
        let clock = clock();
        let mut registry = TableRegistry::new();
        registry.register("orders", orders());
        let executor = QueryExecutor::new(&registry, &clock);

        let mut stmt = SelectStatement::empty();
        stmt.select_list = vec![SelectColumn::new(Expr::column("total"))];
        stmt.from = Some(TableRef::table("orders"));
        stmt.order_by = vec![OrderBy {
            expr: Expr::column("total"),
            direction: OrderDirection::Asc,
            nulls: None,
        }];
        stmt.limit = Some(Expr::integer(1));
        stmt.offset = Some(Expr::integer(1));

        let result = executor.execute(&stmt).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get("total"), Some(&Value::Float(10.0)));
    }

    #[test]
    fn wildcard_expands_to_every_leaf_column() {
        let clock = clock();
        let mut registry = TableRegistry::new();
        registry.register("users", users());
        let executor = QueryExecutor::new(&registry, &clock);

        let mut stmt = SelectStatement::empty();
        stmt.select_list = vec![SelectColumn::new(Expr::Wildcard { table: None })];
        stmt.from = Some(TableRef::table("users"));

        let result = executor.execute(&stmt).unwrap();
        assert_eq!(result.rows.len(), 2);
        assert!(result.rows[0].get("id").is_some());
        assert!(result.rows[0].get("name").is_some());
    }

    #[test]
    fn comma_join_cap_rejects_oversized_from_tree() {
        let clock = clock();
        let registry = TableRegistry::new();
        let executor = QueryExecutor::new(&registry, &clock).with_limits(ExecutionLimits {
            comma_join_limit: 2,
            deadline: None,
        });

        let mut from = TableRef::table("a");
        for name in ["b", "c", "d"] {
            from = TableRef::Join {
                left: Box::new(from),
                join: Box::new(JoinClause {
                    join_type: JoinType::Cross,
                    table: TableRef::table(name),
                    on: None,
                }),
            };
        }
        let mut stmt = SelectStatement::empty();
        stmt.select_list = vec![SelectColumn::new(Expr::integer(1))];
        stmt.from = Some(from);

        let err = executor.execute(&stmt);
        assert!(matches!(err, Err(FedSqlError::TooManyCommaJoins { found: 4, limit: 2 })));
    }

    #[test]
    fn scalar_subquery_in_select_list_is_correlated() {
        let clock = clock();
        let mut registry = TableRegistry::new();
        registry.register("users", users());
        registry.register("orders", orders());
        let executor = QueryExecutor::new(&registry, &clock);

        let mut subquery = SelectStatement::empty();
        subquery.select_list = vec![SelectColumn::new(Expr::Aggregate {
            func: crate::ast::AggregateFn::Sum,
            distinct: false,
            expr: Some(Box::new(Expr::column("total"))),
        })];
        subquery.from = Some(TableRef::table("orders"));
        subquery.where_clause = Some(Expr::column("user_id").eq(Expr::qualified_column("u", "id")));

        let mut stmt = SelectStatement::empty();
        stmt.select_list = vec![
            SelectColumn::new(Expr::qualified_column("u", "name")),
            SelectColumn::with_alias(
                Expr::Subquery {
                    query: Box::new(subquery),
                    kind: crate::ast::SubqueryKind::Scalar,
                    left: None,
                    negated: false,
                },
                "spent",
            ),
        ];
        stmt.from = Some(TableRef::table("users").alias("u"));
        stmt.order_by = vec![OrderBy {
            expr: Expr::qualified_column("u", "name"),
            direction: OrderDirection::Asc,
            nulls: None,
        }];

        let result = executor.execute(&stmt).unwrap();
        let alice = &result.rows[0];
        assert_eq!(alice.get("spent"), Some(&Value::Float(40.0)));
        let bob = &result.rows[1];
        assert_eq!(bob.get("spent"), Some(&Value::Float(5.0)));
    }

    #[test]
    fn negated_conjunction_in_where_still_filters_correctly() {
        let clock = clock();
        let mut registry = TableRegistry::new();
        registry.register("users", users());
        registry.register("orders", orders());
        let executor = QueryExecutor::new(&registry, &clock);

        let mut stmt = SelectStatement::empty();
        stmt.select_list = vec![SelectColumn::new(Expr::qualified_column("u", "name"))];
        stmt.from = Some(TableRef::Join {
            left: Box::new(TableRef::table("users").alias("u")),
            join: Box::new(JoinClause {
                join_type: JoinType::Inner,
                table: TableRef::table("orders").alias("o"),
                on: Some(Expr::qualified_column("o", "user_id").eq(Expr::qualified_column("u", "id"))),
            }),
        });
        // NOT (u.id = 2 AND o.total > 0) rewrites to per-table conjuncts
        // (u.id != 2) OR (o.total <= 0) — exercised here as an un-pushable
        // OR so the post-composition residual filter still has to run it.
        stmt.where_clause = Some(
            Expr::qualified_column("u", "id")
                .eq(Expr::integer(2))
                .binary(BinaryOp::And, Expr::qualified_column("o", "total").gt(Expr::integer(0)))
                .not(),
        );

        let result = executor.execute(&stmt).unwrap();
        let names: Vec<&Value> = result.rows.iter().map(|r| r.get("name").unwrap()).collect();
        assert!(!names.contains(&&Value::Text("bob".into())));
        assert!(names.contains(&&Value::Text("alice".into())));
    }
}
