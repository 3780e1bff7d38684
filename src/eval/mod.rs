//! The expression evaluator (C3): SQL three-valued logic, NULL
//! propagation, comparison coercion, scalar functions, `CASE`, `LIKE`, and
//! subquery dispatch.
//!
//! `Aggregate` and `Window` nodes are not evaluated here — they are only
//! legal in a `SELECT`/`HAVING`/`ORDER BY` list and are computed by the
//! query executor's grouping/windowing stages, which substitute their
//! results before the surrounding expression reaches [`Evaluator::eval`].

pub mod functions;
pub mod like;
pub mod subquery;

use std::cmp::Ordering;

use crate::ast::{BinaryOp, Expr, SubqueryKind, UnaryOp};
use crate::clock::Clock;
use crate::error::{FedSqlError, Result};
use crate::row::Row;
use crate::value::{Truth, Value};

pub use subquery::SubqueryExecutor;

/// The stack of enclosing rows available to a correlated subquery,
/// innermost first.
#[derive(Debug, Clone, Default)]
pub struct OuterContext {
    frames: Vec<Row>,
}

impl OuterContext {
    /// An empty context, for a top-level (non-subquery) evaluation.
    #[must_use]
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Returns a new context with `row` pushed as the innermost frame.
    #[must_use]
    pub fn pushed(&self, row: Row) -> Self {
        let mut frames = Vec::with_capacity(self.frames.len() + 1);
        frames.push(row);
        frames.extend(self.frames.iter().cloned());
        Self { frames }
    }

    fn resolve(&self, parts: &[String]) -> Option<Value> {
        self.frames.iter().find_map(|row| resolve_in_row(parts, row).cloned())
    }
}

fn resolve_in_row<'a>(parts: &[String], row: &'a Row) -> Option<&'a Value> {
    match parts {
        [a, b] => {
            let qualified = format!("{a}.{b}");
            row.get(&qualified).or_else(|| row.get(b)).or_else(|| row.get(a))
        }
        [a] => row.get(a),
        _ => None,
    }
}

/// Evaluates expressions against a row and an outer correlation context.
pub struct Evaluator<'a> {
    clock: &'a dyn Clock,
    subqueries: &'a dyn SubqueryExecutor,
}

impl<'a> Evaluator<'a> {
    /// Creates an evaluator with an injected clock and subquery callback.
    #[must_use]
    pub fn new(clock: &'a dyn Clock, subqueries: &'a dyn SubqueryExecutor) -> Self {
        Self { clock, subqueries }
    }

    /// Evaluates `expr` against `row`/`outer`, yielding a [`Value`].
    pub fn eval(&self, expr: &Expr, row: &Row, outer: &OuterContext) -> Result<Value> {
        match expr {
            Expr::Literal { value, .. } => Ok(value.clone()),

            Expr::Placeholder { bound: false, .. } => {
                Err(FedSqlError::UnboundPlaceholder(format!("{expr:?}")))
            }
            Expr::Placeholder { bound: true, value } => Ok(value.clone()),

            Expr::Identifier { parts } => resolve_in_row(parts, row)
                .cloned()
                .or_else(|| outer.resolve(parts))
                .ok_or_else(|| FedSqlError::UnknownIdentifier(parts.join("."))),

            Expr::Binary { left, op, right } => self.eval_binary(*op, left, right, row, outer),

            Expr::Unary { op, expr } => self.eval_unary(*op, expr, row, outer),

            Expr::FunctionCall(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|a| self.eval(a, row, outer))
                    .collect::<Result<Vec<_>>>()?;
                functions::call(&call.name, args)
            }

            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => self.eval_between(expr, low, high, *negated, row, outer),

            Expr::In {
                left,
                values,
                negated,
            } => self.eval_in_list(left, values, *negated, row, outer),

            Expr::InSubquery {
                left,
                subquery,
                negated,
            } => {
                let left_value = self.eval(left, row, outer)?;
                let rows = self.subqueries.execute(subquery, row, outer)?;
                Ok(truth_to_value(in_subquery_truth(&left_value, &rows, *negated)?))
            }

            Expr::IsNull { expr, negated } => {
                let is_null = self.eval(expr, row, outer)?.is_null();
                Ok(Value::Bool(is_null != *negated))
            }

            Expr::Like {
                left,
                pattern,
                negated,
            } => {
                let left_value = self.eval(left, row, outer)?;
                let pattern_value = self.eval(pattern, row, outer)?;
                if left_value.is_null() || pattern_value.is_null() {
                    return Ok(Value::Null);
                }
                let matched = like::like_match(&left_value.to_text(), &pattern_value.to_text())?;
                Ok(Value::Bool(matched != *negated))
            }

            Expr::CaseWhen {
                operand,
                branches,
                else_branch,
            } => self.eval_case(operand.as_deref(), branches, else_branch.as_deref(), row, outer),

            Expr::Subquery {
                query,
                kind,
                left,
                negated,
            } => self.eval_subquery(query, *kind, left.as_deref(), *negated, row, outer),

            Expr::NiladicFn(func) => Ok(Value::Text(niladic_value(*func, self.clock))),

            Expr::Aggregate { .. } => Err(FedSqlError::UnsupportedOperator(
                "aggregate functions are only valid in a SELECT/HAVING/ORDER BY list, evaluated by the grouping stage".into(),
            )),
            Expr::Window { .. } => Err(FedSqlError::UnsupportedOperator(
                "window functions are only valid in a SELECT/ORDER BY list, evaluated by the windowing stage".into(),
            )),
            Expr::Wildcard { .. } => {
                Err(FedSqlError::WildcardInExpression(format!("{expr:?}")))
            }
        }
    }

    /// Evaluates `expr` as a predicate, collapsing the resulting [`Value`]
    /// into [`Truth`]. `Bool` maps directly; `Null` maps to `Unknown`.
    pub fn eval_bool(&self, expr: &Expr, row: &Row, outer: &OuterContext) -> Result<Truth> {
        value_to_truth(self.eval(expr, row, outer)?, expr)
    }

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr, row: &Row, outer: &OuterContext) -> Result<Value> {
        match op {
            BinaryOp::And => {
                let lt = self.eval_bool(left, row, outer)?;
                if lt == Truth::False {
                    return Ok(Value::Bool(false));
                }
                let rt = self.eval_bool(right, row, outer)?;
                Ok(truth_to_value(lt.and(rt)))
            }
            BinaryOp::Or => {
                let lt = self.eval_bool(left, row, outer)?;
                if lt == Truth::True {
                    return Ok(Value::Bool(true));
                }
                let rt = self.eval_bool(right, row, outer)?;
                Ok(truth_to_value(lt.or(rt)))
            }
            BinaryOp::Concat => {
                let lv = self.eval(left, row, outer)?;
                let rv = self.eval(right, row, outer)?;
                if lv.is_null() || rv.is_null() {
                    return Ok(Value::Null);
                }
                Ok(Value::Text(format!("{}{}", lv.to_text(), rv.to_text())))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let lv = self.eval(left, row, outer)?;
                let rv = self.eval(right, row, outer)?;
                eval_arithmetic(op, lv, rv)
            }
            _ if op.is_comparison() => {
                let lv = self.eval(left, row, outer)?;
                let rv = self.eval(right, row, outer)?;
                eval_comparison(op, lv, rv)
            }
            _ => Err(FedSqlError::UnsupportedOperator(op.as_str().to_string())),
        }
    }

    fn eval_unary(&self, op: UnaryOp, expr: &Expr, row: &Row, outer: &OuterContext) -> Result<Value> {
        let value = self.eval(expr, row, outer)?;
        match op {
            UnaryOp::Not => Ok(match value {
                Value::Null => Value::Null,
                Value::Bool(b) => Value::Bool(!b),
                other => return Err(type_error("NOT", &other)),
            }),
            UnaryOp::Plus => Ok(value),
            UnaryOp::Neg => Ok(match value {
                Value::Null => Value::Null,
                Value::Int(i) => Value::Int(-i),
                Value::Float(f) => Value::Float(-f),
                other => return Err(type_error("unary -", &other)),
            }),
        }
    }

    fn eval_between(
        &self,
        expr: &Expr,
        low: &Expr,
        high: &Expr,
        negated: bool,
        row: &Row,
        outer: &OuterContext,
    ) -> Result<Value> {
        let v = self.eval(expr, row, outer)?;
        let lo = self.eval(low, row, outer)?;
        let hi = self.eval(high, row, outer)?;
        if v.is_null() || lo.is_null() || hi.is_null() {
            return Ok(Value::Null);
        }
        let within = v.total_cmp(&lo) != Ordering::Less && v.total_cmp(&hi) != Ordering::Greater;
        Ok(Value::Bool(within != negated))
    }

    fn eval_in_list(&self, left: &Expr, values: &[Expr], negated: bool, row: &Row, outer: &OuterContext) -> Result<Value> {
        let left_value = self.eval(left, row, outer)?;
        if left_value.is_null() {
            return Ok(Value::Bool(negated));
        }
        let mut found = false;
        for candidate in values {
            let candidate_value = self.eval(candidate, row, outer)?;
            if !candidate_value.is_null() && left_value.loose_eq(&candidate_value) {
                found = true;
                break;
            }
        }
        Ok(Value::Bool(found != negated))
    }

    #[allow(clippy::too_many_arguments)]
    fn eval_case(
        &self,
        operand: Option<&Expr>,
        branches: &[(Expr, Expr)],
        else_branch: Option<&Expr>,
        row: &Row,
        outer: &OuterContext,
    ) -> Result<Value> {
        if let Some(operand) = operand {
            let operand_value = self.eval(operand, row, outer)?;
            for (when, then) in branches {
                let when_value = self.eval(when, row, outer)?;
                if operand_value.loose_eq(&when_value) {
                    return self.eval(then, row, outer);
                }
            }
        } else {
            for (when, then) in branches {
                if self.eval_bool(when, row, outer)? == Truth::True {
                    return self.eval(then, row, outer);
                }
            }
        }
        else_branch.map_or(Ok(Value::Null), |e| self.eval(e, row, outer))
    }

    fn eval_subquery(
        &self,
        query: &crate::ast::SelectStatement,
        kind: SubqueryKind,
        left: Option<&Expr>,
        negated: bool,
        row: &Row,
        outer: &OuterContext,
    ) -> Result<Value> {
        let rows = self.subqueries.execute(query, row, outer)?;
        match kind {
            SubqueryKind::Scalar => scalar_subquery_value(&rows, query),
            SubqueryKind::Exists => Ok(Value::Bool(!rows.is_empty() != negated)),
            SubqueryKind::All(cmp_op) | SubqueryKind::Any(cmp_op) => {
                let left_expr = left.ok_or_else(|| {
                    FedSqlError::UnsupportedOperator("ALL/ANY subquery missing left operand".into())
                })?;
                let left_value = self.eval(left_expr, row, outer)?;
                let is_all = matches!(kind, SubqueryKind::All(_));
                quantified_comparison(cmp_op, &left_value, &rows, is_all)
            }
        }
    }
}

fn type_error(op: &str, value: &Value) -> FedSqlError {
    FedSqlError::UnsupportedOperator(format!("{op} requires a boolean operand, got {value}"))
}

fn value_to_truth(value: Value, expr: &Expr) -> Result<Truth> {
    match value {
        Value::Bool(b) => Ok(Truth::from_bool(b)),
        Value::Null => Ok(Truth::Unknown),
        other => Err(FedSqlError::UnsupportedOperator(format!(
            "expected a boolean result from {expr:?}, got {other}"
        ))),
    }
}

const fn truth_to_value(truth: Truth) -> Value {
    match truth {
        Truth::True => Value::Bool(true),
        Truth::False => Value::Bool(false),
        Truth::Unknown => Value::Null,
    }
}

fn eval_comparison(op: BinaryOp, lv: Value, rv: Value) -> Result<Value> {
    if lv.is_null() || rv.is_null() {
        return Ok(Value::Null);
    }
    let result = match op {
        BinaryOp::Eq => lv.loose_eq(&rv),
        BinaryOp::NotEq => !lv.loose_eq(&rv),
        BinaryOp::Lt => lv.total_cmp(&rv) == Ordering::Less,
        BinaryOp::LtEq => lv.total_cmp(&rv) != Ordering::Greater,
        BinaryOp::Gt => lv.total_cmp(&rv) == Ordering::Greater,
        BinaryOp::GtEq => lv.total_cmp(&rv) != Ordering::Less,
        _ => return Err(FedSqlError::UnsupportedOperator(op.as_str().to_string())),
    };
    Ok(Value::Bool(result))
}

fn eval_arithmetic(op: BinaryOp, lv: Value, rv: Value) -> Result<Value> {
    if lv.is_null() || rv.is_null() {
        return Ok(Value::Null);
    }
    let (Some(l), Some(r)) = (lv.as_f64(), rv.as_f64()) else {
        return Err(FedSqlError::UnsupportedOperator(format!(
            "{} requires numeric operands",
            op.as_str()
        )));
    };
    let both_int = matches!(lv, Value::Int(_)) && matches!(rv, Value::Int(_));
    match op {
        BinaryOp::Add => Ok(promote(l + r, both_int)),
        BinaryOp::Sub => Ok(promote(l - r, both_int)),
        BinaryOp::Mul => Ok(promote(l * r, both_int)),
        BinaryOp::Div => {
            if r == 0.0 {
                return Ok(Value::Null);
            }
            Ok(if both_int {
                Value::Int((l as i64) / (r as i64))
            } else {
                Value::Float(l / r)
            })
        }
        BinaryOp::Mod => {
            if r == 0.0 {
                return Ok(Value::Null);
            }
            Ok(if both_int {
                Value::Int((l as i64) % (r as i64))
            } else {
                Value::Float(l % r)
            })
        }
        _ => unreachable!("eval_arithmetic called with non-arithmetic op"),
    }
}

fn promote(result: f64, both_int: bool) -> Value {
    if both_int {
        Value::Int(result as i64)
    } else {
        Value::Float(result)
    }
}

fn niladic_value(func: crate::ast::NiladicFn, clock: &dyn Clock) -> String {
    use crate::ast::NiladicFn;
    let now = clock.now();
    match func {
        NiladicFn::CurrentDate => now.format("%Y-%m-%d").to_string(),
        NiladicFn::CurrentTime => now.format("%H:%M:%S").to_string(),
        NiladicFn::CurrentTimestamp => now.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

fn scalar_subquery_value(rows: &[Row], _query: &crate::ast::SelectStatement) -> Result<Value> {
    if rows.len() > 1 {
        return Err(FedSqlError::ScalarSubqueryTooManyRows(format!("{} rows", rows.len())));
    }
    let Some(row) = rows.first() else {
        return Ok(Value::Null);
    };
    if row.len() > 1 {
        return Err(FedSqlError::ScalarSubqueryTooManyColumns(format!("{} columns", row.len())));
    }
    Ok(row.iter().next().map_or(Value::Null, |(_, v)| v.clone()))
}

fn in_subquery_truth(left: &Value, rows: &[Row], negated: bool) -> Result<Truth> {
    if left.is_null() {
        return Ok(Truth::Unknown);
    }
    let mut saw_null = false;
    let mut matched = false;
    for row in rows {
        let Some((_, value)) = row.iter().next() else {
            continue;
        };
        if value.is_null() {
            saw_null = true;
        } else if left.loose_eq(value) {
            matched = true;
            break;
        }
    }
    let truth = if matched {
        Truth::True
    } else if saw_null {
        Truth::Unknown
    } else {
        Truth::False
    };
    Ok(if negated { truth.not() } else { truth })
}

fn quantified_comparison(op: BinaryOp, left: &Value, rows: &[Row], is_all: bool) -> Result<Value> {
    if rows.is_empty() {
        return Ok(Value::Bool(is_all));
    }
    let mut saw_unknown = false;
    for row in rows {
        let Some((_, value)) = row.iter().next() else {
            continue;
        };
        let truth = value_to_truth(eval_comparison(op, left.clone(), value.clone())?, &Expr::null())?;
        match (is_all, truth) {
            (true, Truth::False) => return Ok(Value::Bool(false)),
            (false, Truth::True) => return Ok(Value::Bool(true)),
            (_, Truth::Unknown) => saw_unknown = true,
            _ => {}
        }
    }
    if saw_unknown {
        return Ok(Value::Null);
    }
    Ok(Value::Bool(is_all))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::value::Value;
    use chrono::NaiveDateTime;

    struct NoSubqueries;
    impl SubqueryExecutor for NoSubqueries {
        fn execute(&self, _query: &crate::ast::SelectStatement, _outer_row: &Row, _outer_ctx: &OuterContext) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    fn eval_value(expr: &Expr) -> Value {
        let clock = FixedClock(NaiveDateTime::parse_from_str("2024-06-15 10:20:30", "%Y-%m-%d %H:%M:%S").unwrap());
        let subqueries = NoSubqueries;
        let evaluator = Evaluator::new(&clock, &subqueries);
        evaluator.eval(expr, &Row::new(), &OuterContext::new()).unwrap()
    }

    #[test]
    fn and_short_circuits_on_false() {
        assert_eq!(
            eval_value(&Expr::boolean(false).and(Expr::null())),
            Value::Bool(false)
        );
    }

    #[test]
    fn or_short_circuits_on_true() {
        assert_eq!(eval_value(&Expr::boolean(true).or(Expr::null())), Value::Bool(true));
    }

    #[test]
    fn and_with_null_and_true_is_null() {
        assert_eq!(eval_value(&Expr::boolean(true).and(Expr::null())), Value::Null);
    }

    #[test]
    fn or_with_null_and_false_is_null() {
        assert_eq!(eval_value(&Expr::boolean(false).or(Expr::null())), Value::Null);
    }

    #[test]
    fn equality_with_both_null_is_unknown_in_expression_context() {
        assert_eq!(eval_value(&Expr::null().eq(Expr::null())), Value::Null);
    }

    #[test]
    fn division_by_zero_is_null_not_error() {
        assert_eq!(
            eval_value(&Expr::integer(1).binary(BinaryOp::Div, Expr::integer(0))),
            Value::Null
        );
    }

    #[test]
    fn integer_division_truncates() {
        assert_eq!(
            eval_value(&Expr::integer(7).binary(BinaryOp::Div, Expr::integer(2))),
            Value::Int(3)
        );
    }

    #[test]
    fn arithmetic_promotes_to_float() {
        assert_eq!(
            eval_value(&Expr::integer(1).binary(BinaryOp::Add, Expr::Literal {
                value: Value::Float(0.5),
                kind: crate::ast::LiteralKind::Number,
            })),
            Value::Float(1.5)
        );
    }

    #[test]
    fn between_excludes_on_null_bound() {
        let e = Expr::integer(5).between(Expr::null(), Expr::integer(10));
        assert_eq!(eval_value(&e), Value::Null);
    }

    #[test]
    fn in_list_false_on_null_left() {
        assert_eq!(eval_value(&Expr::null().in_list(vec![Expr::integer(1)])), Value::Bool(false));
    }

    #[test]
    fn in_empty_list_is_false() {
        assert_eq!(eval_value(&Expr::integer(1).in_list(vec![])), Value::Bool(false));
    }

    #[test]
    fn is_null_never_returns_unknown() {
        assert_eq!(eval_value(&Expr::null().is_null()), Value::Bool(true));
        assert_eq!(eval_value(&Expr::integer(1).is_null()), Value::Bool(false));
    }

    #[test]
    fn like_is_null_when_either_side_null() {
        let e = Expr::Like {
            left: Box::new(Expr::null()),
            pattern: Box::new(Expr::string("a%")),
            negated: false,
        };
        assert_eq!(eval_value(&e), Value::Null);
    }

    #[test]
    fn searched_case_returns_matching_branch() {
        let e = Expr::CaseWhen {
            operand: None,
            branches: vec![(Expr::boolean(false), Expr::integer(1)), (Expr::boolean(true), Expr::integer(2))],
            else_branch: Some(Box::new(Expr::integer(3))),
        };
        assert_eq!(eval_value(&e), Value::Int(2));
    }

    #[test]
    fn simple_case_uses_loose_equality_and_falls_to_else() {
        let e = Expr::CaseWhen {
            operand: Some(Box::new(Expr::integer(5))),
            branches: vec![(Expr::integer(1), Expr::string("one"))],
            else_branch: Some(Box::new(Expr::string("other"))),
        };
        assert_eq!(eval_value(&e), Value::Text("other".into()));
    }

    #[test]
    fn case_without_else_is_null() {
        let e = Expr::CaseWhen {
            operand: None,
            branches: vec![(Expr::boolean(false), Expr::integer(1))],
            else_branch: None,
        };
        assert_eq!(eval_value(&e), Value::Null);
    }

    #[test]
    fn niladic_current_date_reads_injected_clock() {
        assert_eq!(
            eval_value(&Expr::NiladicFn(crate::ast::NiladicFn::CurrentDate)),
            Value::Text("2024-06-15".into())
        );
        assert_eq!(
            eval_value(&Expr::NiladicFn(crate::ast::NiladicFn::CurrentTimestamp)),
            Value::Text("2024-06-15 10:20:30".into())
        );
    }

    #[test]
    fn qualified_identifier_resolution_order() {
        let row = Row::new().with("a.b", Value::Int(1)).with("b", Value::Int(2));
        let clock = FixedClock(NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap());
        let subqueries = NoSubqueries;
        let evaluator = Evaluator::new(&clock, &subqueries);
        let value = evaluator
            .eval(&Expr::qualified_column("a", "b"), &row, &OuterContext::new())
            .unwrap();
        assert_eq!(value, Value::Int(1));
    }

    #[test]
    fn unresolved_identifier_errors() {
        let clock = FixedClock(NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap());
        let subqueries = NoSubqueries;
        let evaluator = Evaluator::new(&clock, &subqueries);
        let err = evaluator.eval(&Expr::column("missing"), &Row::new(), &OuterContext::new());
        assert!(err.is_err());
    }

    #[test]
    fn outer_context_is_consulted_after_current_row() {
        let clock = FixedClock(NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap());
        let subqueries = NoSubqueries;
        let evaluator = Evaluator::new(&clock, &subqueries);
        let outer = OuterContext::new().pushed(Row::new().with("x", Value::Int(9)));
        let value = evaluator.eval(&Expr::column("x"), &Row::new(), &outer).unwrap();
        assert_eq!(value, Value::Int(9));
    }

    #[test]
    fn unbound_placeholder_errors() {
        let e = Expr::Placeholder {
            bound: false,
            value: Value::Null,
        };
        let clock = FixedClock(NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap());
        let subqueries = NoSubqueries;
        let evaluator = Evaluator::new(&clock, &subqueries);
        assert!(evaluator.eval(&e, &Row::new(), &OuterContext::new()).is_err());
    }

    #[test]
    fn wildcard_in_expression_context_errors() {
        let e = Expr::Wildcard { table: None };
        assert!(std::panic::catch_unwind(|| eval_value(&e)).is_err());
    }
}
