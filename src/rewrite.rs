//! The negation rewriter (C2): pushes `NOT` through a predicate tree,
//! flipping comparisons and applying De Morgan's laws, so that the
//! evaluator never has to special-case a negated compound expression.
//!
//! `rewrite` is a pure function: `rewrite(rewrite(n)) == rewrite(n)` for
//! any `n`, and it never changes what a predicate evaluates to — only how
//! it is shaped.

use crate::ast::{BinaryOp, Expr, UnaryOp};

/// Rewrites `expr` to push `NOT` inward, to a fixed point.
///
/// Applies, in priority order, on every post-order pass: `NOT BETWEEN`
/// expansion, `NOT IN` expansion over literal lists, comparison flipping,
/// De Morgan's laws over `AND`/`OR`, double-negation elimination, and
/// `IS NULL`/`LIKE` negation-flag toggling. Passes repeat until a pass
/// produces no change.
#[must_use]
pub fn rewrite(expr: Expr) -> Expr {
    let mut current = expr;
    loop {
        let next = rewrite_pass(current.clone());
        if next == current {
            return next;
        }
        current = next;
    }
}

fn rewrite_pass(expr: Expr) -> Expr {
    match expr {
        Expr::Between {
            expr,
            low,
            high,
            negated: true,
        } => {
            let expr = rewrite_pass(*expr);
            let low = rewrite_pass(*low);
            let high = rewrite_pass(*high);
            Expr::Binary {
                left: Box::new(Expr::Binary {
                    left: Box::new(expr.clone()),
                    op: BinaryOp::Lt,
                    right: Box::new(low),
                }),
                op: BinaryOp::Or,
                right: Box::new(Expr::Binary {
                    left: Box::new(expr),
                    op: BinaryOp::Gt,
                    right: Box::new(high),
                }),
            }
        }
        Expr::Between {
            expr,
            low,
            high,
            negated: false,
        } => Expr::Between {
            expr: Box::new(rewrite_pass(*expr)),
            low: Box::new(rewrite_pass(*low)),
            high: Box::new(rewrite_pass(*high)),
            negated: false,
        },

        Expr::In {
            left,
            values,
            negated: true,
        } => {
            let left = rewrite_pass(*left);
            let values: Vec<Expr> = values.into_iter().map(rewrite_pass).collect();
            let mut conjuncts = values.into_iter().map(|value| Expr::Binary {
                left: Box::new(left.clone()),
                op: BinaryOp::NotEq,
                right: Box::new(value),
            });
            match conjuncts.next() {
                None => Expr::boolean(true),
                Some(first) => conjuncts.fold(first, |acc, next| Expr::Binary {
                    left: Box::new(acc),
                    op: BinaryOp::And,
                    right: Box::new(next),
                }),
            }
        }
        Expr::In {
            left,
            values,
            negated: false,
        } => Expr::In {
            left: Box::new(rewrite_pass(*left)),
            values: values.into_iter().map(rewrite_pass).collect(),
            negated: false,
        },

        Expr::InSubquery {
            left,
            subquery,
            negated,
        } => Expr::InSubquery {
            left: Box::new(rewrite_pass(*left)),
            subquery,
            negated,
        },

        Expr::Unary {
            op: UnaryOp::Not,
            expr: inner,
        } => rewrite_not(*inner),

        Expr::Binary { left, op, right } => Expr::Binary {
            left: Box::new(rewrite_pass(*left)),
            op,
            right: Box::new(rewrite_pass(*right)),
        },

        Expr::Unary { op, expr } => Expr::Unary {
            op,
            expr: Box::new(rewrite_pass(*expr)),
        },

        Expr::IsNull { expr, negated } => Expr::IsNull {
            expr: Box::new(rewrite_pass(*expr)),
            negated,
        },

        Expr::Like {
            left,
            pattern,
            negated,
        } => Expr::Like {
            left: Box::new(rewrite_pass(*left)),
            pattern: Box::new(rewrite_pass(*pattern)),
            negated,
        },

        Expr::CaseWhen {
            operand,
            branches,
            else_branch,
        } => Expr::CaseWhen {
            operand: operand.map(|o| Box::new(rewrite_pass(*o))),
            branches: branches
                .into_iter()
                .map(|(when, then)| (rewrite_pass(when), rewrite_pass(then)))
                .collect(),
            else_branch: else_branch.map(|e| Box::new(rewrite_pass(*e))),
        },

        Expr::FunctionCall(call) => Expr::FunctionCall(crate::ast::FunctionCall {
            name: call.name,
            args: call.args.into_iter().map(rewrite_pass).collect(),
        }),

        Expr::Subquery {
            query,
            kind,
            left,
            negated,
        } => Expr::Subquery {
            query,
            kind,
            left: left.map(|l| Box::new(rewrite_pass(*l))),
            negated,
        },

        Expr::Aggregate {
            func,
            distinct,
            expr,
        } => Expr::Aggregate {
            func,
            distinct,
            expr: expr.map(|e| Box::new(rewrite_pass(*e))),
        },

        // Leaves and nodes with no boolean sub-structure to push NOT through.
        other @ (Expr::Literal { .. }
        | Expr::Placeholder { .. }
        | Expr::Identifier { .. }
        | Expr::NiladicFn(_)
        | Expr::Window { .. }
        | Expr::Wildcard { .. }) => other,
    }
}

/// Pushes a `NOT` that wraps `inner` one level further in, per the rule
/// table in the module docs.
fn rewrite_not(inner: Expr) -> Expr {
    match inner {
        // Rule 3: flip comparisons.
        Expr::Binary { left, op, right } if op.is_comparison() => {
            let flipped = op.flip().expect("is_comparison implies flip is Some");
            rewrite_pass(Expr::Binary {
                left,
                op: flipped,
                right,
            })
        }

        // Rule 4: De Morgan.
        Expr::Binary {
            left,
            op: BinaryOp::And,
            right,
        } => rewrite_pass(Expr::Binary {
            left: Box::new(left.not()),
            op: BinaryOp::Or,
            right: Box::new(right.not()),
        }),
        Expr::Binary {
            left,
            op: BinaryOp::Or,
            right,
        } => rewrite_pass(Expr::Binary {
            left: Box::new(left.not()),
            op: BinaryOp::And,
            right: Box::new(right.not()),
        }),

        // Rule 5: double negation.
        Expr::Unary {
            op: UnaryOp::Not,
            expr,
        } => rewrite_pass(*expr),

        // Rule 6: toggle negated flag.
        Expr::IsNull { expr, negated } => Expr::IsNull {
            expr: Box::new(rewrite_pass(*expr)),
            negated: !negated,
        },
        Expr::Like {
            left,
            pattern,
            negated,
        } => Expr::Like {
            left: Box::new(rewrite_pass(*left)),
            pattern: Box::new(rewrite_pass(*pattern)),
            negated: !negated,
        },

        // Rule 1/2 operate on NOT BETWEEN / NOT IN directly, not via this
        // path, but a bare `NOT (x BETWEEN ...)` arrives here as a Unary
        // wrapping a non-negated Between/In — toggle and let the next
        // fixed-point pass expand it.
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => rewrite_pass(Expr::Between {
            expr,
            low,
            high,
            negated: !negated,
        }),
        Expr::In {
            left,
            values,
            negated,
        } => rewrite_pass(Expr::In {
            left,
            values,
            negated: !negated,
        }),
        Expr::InSubquery {
            left,
            subquery,
            negated,
        } => Expr::InSubquery {
            left: Box::new(rewrite_pass(*left)),
            subquery,
            negated: !negated,
        },

        // Rule 7: anything else, keep the NOT but rewrite underneath.
        other => rewrite_pass(other).not(),
    }
}
