//! Predicate pushdown planning for the comma-join `FROM` path (§4.4).
//!
//! Flattens a `WHERE` expression along `AND`, sorts each conjunct into
//! "applies to exactly one named table" (pushed to that leaf) or
//! "everything else" (left as a residual filter evaluated after
//! composition). Equi-join hints across two leaves are not used to pick
//! a join strategy in this implementation — composition always folds
//! left-to-right and relies on the residual filter, which is correct (if
//! not the fastest possible) for every input.

use std::collections::{HashMap, HashSet};

use crate::ast::{BinaryOp, Expr};

/// The result of planning pushdown over a `WHERE` clause.
pub struct PushdownPlan {
    /// Per-leaf-table conjuncts that can be applied directly to that
    /// table's source.
    pub per_table: HashMap<String, Expr>,
    /// Everything left over — evaluated once against the composed row.
    pub residual: Option<Expr>,
}

/// Plans pushdown of `where_clause` over the named leaf tables.
#[must_use]
pub fn plan(where_clause: Option<Expr>, leaves: &[String]) -> PushdownPlan {
    let Some(where_clause) = where_clause else {
        return PushdownPlan {
            per_table: HashMap::new(),
            residual: None,
        };
    };

    let mut per_table: HashMap<String, Expr> = HashMap::new();
    let mut residual: Option<Expr> = None;
    let leaf_set: HashSet<&str> = leaves.iter().map(String::as_str).collect();

    for conjunct in split_conjuncts(where_clause) {
        let referenced = referenced_tables(&conjunct);
        let single_leaf = match referenced.len() {
            1 => referenced.iter().next().filter(|t| leaf_set.contains(t.as_str())).cloned(),
            _ => None,
        };
        match single_leaf {
            Some(table) => {
                per_table
                    .entry(table)
                    .and_modify(|existing| *existing = existing.clone().and(conjunct.clone()))
                    .or_insert(conjunct);
            }
            None => {
                residual = Some(match residual.take() {
                    Some(acc) => acc.and(conjunct),
                    None => conjunct,
                });
            }
        }
    }

    PushdownPlan { per_table, residual }
}

/// Splits `expr` into its top-level `AND` conjuncts.
fn split_conjuncts(expr: Expr) -> Vec<Expr> {
    match expr {
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => {
            let mut out = split_conjuncts(*left);
            out.extend(split_conjuncts(*right));
            out
        }
        other => vec![other],
    }
}

/// The set of table qualifiers referenced by two-part identifiers in
/// `expr`. A one-part (unqualified) identifier contributes nothing — an
/// unqualified reference cannot be safely attributed to a single leaf.
fn referenced_tables(expr: &Expr) -> HashSet<String> {
    let mut out = HashSet::new();
    collect_referenced_tables(expr, &mut out);
    out
}

fn collect_referenced_tables(expr: &Expr, out: &mut HashSet<String>) {
    match expr {
        Expr::Identifier { parts } if parts.len() == 2 => {
            out.insert(parts[0].clone());
        }
        Expr::Identifier { .. } | Expr::Literal { .. } | Expr::Placeholder { .. } | Expr::NiladicFn(_) | Expr::Wildcard { .. } => {}
        Expr::Binary { left, right, .. } => {
            collect_referenced_tables(left, out);
            collect_referenced_tables(right, out);
        }
        Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } => collect_referenced_tables(expr, out),
        Expr::FunctionCall(call) => call.args.iter().for_each(|a| collect_referenced_tables(a, out)),
        Expr::Between { expr, low, high, .. } => {
            collect_referenced_tables(expr, out);
            collect_referenced_tables(low, out);
            collect_referenced_tables(high, out);
        }
        Expr::In { left, values, .. } => {
            collect_referenced_tables(left, out);
            values.iter().for_each(|v| collect_referenced_tables(v, out));
        }
        Expr::InSubquery { left, .. } => collect_referenced_tables(left, out),
        Expr::Like { left, pattern, .. } => {
            collect_referenced_tables(left, out);
            collect_referenced_tables(pattern, out);
        }
        Expr::CaseWhen {
            operand,
            branches,
            else_branch,
        } => {
            if let Some(operand) = operand {
                collect_referenced_tables(operand, out);
            }
            for (when, then) in branches {
                collect_referenced_tables(when, out);
                collect_referenced_tables(then, out);
            }
            if let Some(else_branch) = else_branch {
                collect_referenced_tables(else_branch, out);
            }
        }
        Expr::Subquery { left, .. } => {
            if let Some(left) = left {
                collect_referenced_tables(left, out);
            }
        }
        Expr::Aggregate { expr, .. } => {
            if let Some(expr) = expr {
                collect_referenced_tables(expr, out);
            }
        }
        Expr::Window { partition_by, .. } => partition_by.iter().for_each(|e| collect_referenced_tables(e, out)),
    }
}
