//! `FROM` composition: resolves a [`TableRef`] tree into a row stream,
//! qualifying columns by alias and folding explicit joins left-to-right
//! with outer-join NULL padding (§4.4 "Outer-join rules").

use std::collections::{HashMap, HashSet};

use crate::ast::{BinaryOp, Expr, JoinType, TableRef};
use crate::error::Result;
use crate::eval::{Evaluator, OuterContext};
use crate::row::Row;
use crate::source::ColumnInfo;
use crate::value::Value;

use super::QueryExecutor;

/// A composed row stream plus enough schema to build a NULL-padded row
/// for each of its leaf tables, for outer-join padding one level up.
pub struct Scan {
    pub rows: Vec<Row>,
    pub leaves: Vec<(String, Vec<ColumnInfo>)>,
    /// A single-table pushdown conjunct a source declined to absorb
    /// (its [`crate::source::PushdownResult::residual`]), bubbled up so
    /// the caller can still apply it instead of silently dropping it.
    pub leftover: Option<Expr>,
}

impl Scan {
    fn null_row(&self) -> Row {
        let mut row = Row::new();
        for (alias, columns) in &self.leaves {
            for col in columns {
                row.set(format!("{alias}.{}", col.name), Value::Null);
                row.set(col.name.clone(), Value::Null);
            }
        }
        row
    }
}

/// Qualifies every column in `row` under `alias`, keeping both the
/// qualified (`alias.col`) and bare (`col`) key (§3 Row invariants).
pub fn qualify_row(row: &Row, alias: &str) -> Row {
    let mut out = Row::new();
    for (k, v) in row.iter() {
        out.set(format!("{alias}.{k}"), v.clone());
        out.set(k, v.clone());
    }
    out
}

/// Resolves `table_ref` into a composed [`Scan`], folding any joins.
///
/// `pushdown` maps a leaf's binding name to a single-table conjunct the
/// planner determined applies to it (§4.4 "Predicate pushdown"). It is
/// handed to the leaf source's [`crate::source::TableSource::try_apply_filter`]
/// purely as a row-count optimization — the WHERE stage always
/// re-evaluates the full predicate afterwards, so an index-less source
/// that declines the filter is still correct, just unfiltered here.
pub fn compose_from(
    executor: &QueryExecutor<'_>,
    table_ref: &TableRef,
    cte_scope: &HashMap<String, Scan>,
    pushdown: &HashMap<String, Expr>,
    outer_ctx: &OuterContext,
) -> Result<Scan> {
    match table_ref {
        TableRef::Table { name, alias, .. } => {
            let binding = alias.clone().unwrap_or_else(|| name.clone());
            if let Some(cte) = cte_scope.get(name) {
                return Ok(requalify(cte, &binding));
            }
            let source = executor.registry.source_for(name)?;
            let columns = source.columns().to_vec();
            let (source, leftover) = match pushdown.get(&binding) {
                Some(filter) => {
                    let applied = source.try_apply_filter(filter.clone());
                    (applied.source, applied.residual)
                }
                None => (source, None),
            };
            let rows = source.iterate()?.map(|r| qualify_row(&r, &binding)).collect();
            Ok(Scan {
                rows,
                leaves: vec![(binding, columns)],
                leftover,
            })
        }
        TableRef::Subquery { query, alias } => {
            let result = executor.execute_inner(query, &Row::new(), outer_ctx)?;
            Ok(scan_from_result(&result, alias))
        }
        TableRef::Join { left, join } => {
            let left_scan = compose_from(executor, left, cte_scope, pushdown, outer_ctx)?;
            let right_scan = compose_from(executor, &join.table, cte_scope, pushdown, outer_ctx)?;
            let rows = join_rows(executor, &left_scan, &right_scan, join.join_type, join.on.as_ref(), outer_ctx)?;
            let leftover = combine_leftover(left_scan.leftover, right_scan.leftover);
            let mut leaves = left_scan.leaves;
            leaves.extend(right_scan.leaves);
            Ok(Scan { rows, leaves, leftover })
        }
    }
}

/// ANDs two bubbled-up leftover pushdown conjuncts together.
fn combine_leftover(a: Option<Expr>, b: Option<Expr>) -> Option<Expr> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.and(b)),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

/// Builds a [`Scan`] out of a query result, qualifying every row under
/// `binding` and synthesising column descriptors (derived rows carry no
/// declared type or index).
pub fn scan_from_result(result: &super::QueryResult, binding: &str) -> Scan {
    scan_from_rows(result.rows.clone(), &result.columns, binding)
}

/// Builds a [`Scan`] directly from rows plus their column names, used by
/// CTE evaluation to expose an already-computed working set under a
/// name.
pub fn scan_from_rows(rows: Vec<Row>, columns: &[String], binding: &str) -> Scan {
    let column_infos = columns
        .iter()
        .map(|name| ColumnInfo {
            name: name.clone(),
            declared_type: String::new(),
            nullable: true,
            index_kind: crate::source::IndexKind::None,
        })
        .collect();
    let rows = rows.iter().map(|r| qualify_row(r, binding)).collect();
    Scan {
        rows,
        leaves: vec![(binding.to_string(), column_infos)],
        leftover: None,
    }
}

fn requalify(scan: &Scan, binding: &str) -> Scan {
    // A CTE referenced under a different alias than its declared name:
    // re-derive bare keys from the CTE's own leaf set, then re-qualify
    // under the new binding.
    let rows = scan
        .rows
        .iter()
        .map(|row| {
            let bare = Row::new().joined_with(row);
            qualify_row(&bare, binding)
        })
        .collect();
    let columns = scan.leaves.iter().flat_map(|(_, cols)| cols.iter().cloned()).collect();
    Scan {
        rows,
        leaves: vec![(binding.to_string(), columns)],
        leftover: scan.leftover.clone(),
    }
}

#[allow(clippy::too_many_arguments)]
fn join_rows(
    executor: &QueryExecutor<'_>,
    left: &Scan,
    right: &Scan,
    join_type: JoinType,
    on: Option<&Expr>,
    outer_ctx: &OuterContext,
) -> Result<Vec<Row>> {
    let evaluator = Evaluator::new(executor.clock, executor);

    let left_aliases: HashSet<&str> = left.leaves.iter().map(|(alias, _)| alias.as_str()).collect();
    let right_aliases: HashSet<&str> = right.leaves.iter().map(|(alias, _)| alias.as_str()).collect();

    let equi_key = on.and_then(|predicate| equi_join_key(predicate, &left_aliases, &right_aliases).map(|keys| (predicate, keys)));

    match equi_key {
        Some((predicate, (left_key, right_key))) => {
            hash_join_rows(&evaluator, left, right, join_type, predicate, left_key, right_key, outer_ctx)
        }
        None => nested_loop_join_rows(&evaluator, left, right, join_type, on, outer_ctx),
    }
}

/// Splits `expr` along top-level `AND`s, for scanning a join's `ON` clause
/// for a usable equi-join conjunct without discarding the rest of it.
fn split_conjuncts_ref(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Binary { op: BinaryOp::And, left, right } => {
            let mut out = split_conjuncts_ref(left);
            out.extend(split_conjuncts_ref(right));
            out
        }
        other => vec![other],
    }
}

/// True if every qualified (`alias.col`) column `expr` references belongs
/// to `aliases` and at least one such reference exists.
fn references_only(expr: &Expr, aliases: &HashSet<&str>) -> bool {
    let mut any = false;
    let mut only = true;
    collect_table_refs(expr, &mut |alias| {
        any = true;
        if !aliases.contains(alias) {
            only = false;
        }
    });
    any && only
}

fn collect_table_refs(expr: &Expr, visit: &mut impl FnMut(&str)) {
    match expr {
        Expr::Identifier { parts } if parts.len() == 2 => visit(&parts[0]),
        Expr::Binary { left, right, .. } => {
            collect_table_refs(left, visit);
            collect_table_refs(right, visit);
        }
        Expr::Unary { expr, .. } => collect_table_refs(expr, visit),
        _ => {}
    }
}

/// Looks for a top-level `left.a = right.b` (or reversed) equi-join
/// conjunct in `on` attributable one-side-each to `left_aliases` and
/// `right_aliases`, the hint SPEC_FULL.md §4.4 calls for preferring a
/// hash-join strategy. Any other conjuncts in `on` are still fully
/// re-checked by [`hash_join_rows`] — this only narrows candidates.
fn equi_join_key<'a>(on: &'a Expr, left_aliases: &HashSet<&str>, right_aliases: &HashSet<&str>) -> Option<(&'a Expr, &'a Expr)> {
    for conjunct in split_conjuncts_ref(on) {
        let Expr::Binary { op: BinaryOp::Eq, left, right } = conjunct else {
            continue;
        };
        if references_only(left, left_aliases) && references_only(right, right_aliases) {
            return Some((left, right));
        }
        if references_only(right, left_aliases) && references_only(left, right_aliases) {
            return Some((right, left));
        }
    }
    None
}

/// Normalizes a [`Value`] into a hash-bucketable string key, collapsing
/// cross-kind numeric equality (`Int`/`Float`) into the same bucket.
/// `Null` never buckets — it never equi-joins anything.
fn bucket_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Int(_) | Value::Float(_) => value.as_f64().map(|f| format!("n:{f}")),
        Value::Bool(b) => Some(format!("b:{b}")),
        Value::Text(s) => Some(format!("t:{s}")),
        Value::Bytes(b) => Some(format!("y:{b:?}")),
    }
}

#[allow(clippy::too_many_arguments)]
fn hash_join_rows(
    evaluator: &Evaluator<'_>,
    left: &Scan,
    right: &Scan,
    join_type: JoinType,
    on: &Expr,
    left_key: &Expr,
    right_key: &Expr,
    outer_ctx: &OuterContext,
) -> Result<Vec<Row>> {
    let mut buckets: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, right_row) in right.rows.iter().enumerate() {
        let key = evaluator.eval(right_key, right_row, outer_ctx)?;
        if let Some(bucket) = bucket_key(&key) {
            buckets.entry(bucket).or_default().push(idx);
        }
    }

    let mut out = Vec::new();
    let mut right_matched = vec![false; right.rows.len()];

    for left_row in &left.rows {
        let mut matched_any = false;
        let left_value = evaluator.eval(left_key, left_row, outer_ctx)?;
        if let Some(bucket) = bucket_key(&left_value) {
            if let Some(candidates) = buckets.get(&bucket) {
                for &idx in candidates {
                    let combined = left_row.joined_with(&right.rows[idx]);
                    if evaluator.eval_bool(on, &combined, outer_ctx)?.is_true() {
                        matched_any = true;
                        right_matched[idx] = true;
                        out.push(combined);
                    }
                }
            }
        }
        if !matched_any && join_type.pads_left() {
            out.push(left_row.joined_with(&right.null_row()));
        }
    }

    if join_type.pads_right() {
        for (idx, right_row) in right.rows.iter().enumerate() {
            if !right_matched[idx] {
                out.push(left.null_row().joined_with(right_row));
            }
        }
    }

    Ok(out)
}

fn nested_loop_join_rows(
    evaluator: &Evaluator<'_>,
    left: &Scan,
    right: &Scan,
    join_type: JoinType,
    on: Option<&Expr>,
    outer_ctx: &OuterContext,
) -> Result<Vec<Row>> {
    let mut out = Vec::new();
    let mut right_matched = vec![false; right.rows.len()];

    for left_row in &left.rows {
        let mut matched_any = false;
        for (idx, right_row) in right.rows.iter().enumerate() {
            let combined = left_row.joined_with(right_row);
            let keep = match on {
                Some(predicate) => evaluator.eval_bool(predicate, &combined, outer_ctx)?.is_true(),
                None => true,
            };
            if keep {
                matched_any = true;
                right_matched[idx] = true;
                out.push(combined);
            }
        }
        if !matched_any && join_type.pads_left() {
            out.push(left_row.joined_with(&right.null_row()));
        }
    }

    if join_type.pads_right() {
        for (idx, right_row) in right.rows.iter().enumerate() {
            if !right_matched[idx] {
                out.push(left.null_row().joined_with(right_row));
            }
        }
    }

    Ok(out)
}
