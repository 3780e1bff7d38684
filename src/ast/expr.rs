//! Expression AST types.
//!
//! This tree is produced by an external parser (out of scope for this
//! crate) and handed to [`crate::rewrite::rewrite`] and
//! [`crate::eval::Evaluator`]. Every variant here is one the rewriter or
//! evaluator must recognise.

use std::fmt;

use crate::value::Value;

/// The kind tag carried alongside a literal, mirroring how the parser
/// classified it before the value was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    /// `NULL`.
    Null,
    /// `TRUE` / `FALSE`.
    Bool,
    /// Any numeric literal.
    Number,
    /// A quoted string literal.
    String,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `=`
    Eq,
    /// `<>` / `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `AND`
    And,
    /// `OR`
    Or,
    /// `||`
    Concat,
}

impl BinaryOp {
    /// Returns the SQL representation of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Concat => "||",
        }
    }

    /// Whether this operator is one of the six comparisons the negation
    /// rewriter knows how to flip (`NOT (a CMP b)` → flipped `CMP`).
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// Returns the operator whose result is the logical negation of this
    /// one, for the six comparison operators. `None` for non-comparisons.
    #[must_use]
    pub const fn flip(self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::NotEq),
            Self::NotEq => Some(Self::Eq),
            Self::Lt => Some(Self::GtEq),
            Self::LtEq => Some(Self::Gt),
            Self::Gt => Some(Self::LtEq),
            Self::GtEq => Some(Self::Lt),
            _ => None,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical `NOT`.
    Not,
    /// Arithmetic negation `-x`.
    Neg,
    /// Unary plus `+x` (identity).
    Plus,
}

/// A function call expression (scalar functions; aggregates and window
/// functions are their own node kinds, see [`Expr::Aggregate`] and
/// [`Expr::Window`]).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Function name, matched case-insensitively.
    pub name: String,
    /// Argument expressions.
    pub args: Vec<Expr>,
}

/// Which aggregate function an [`Expr::Aggregate`] node computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// `COUNT`
    Count,
    /// `SUM`
    Sum,
    /// `AVG`
    Avg,
    /// `MIN`
    Min,
    /// `MAX`
    Max,
}

/// Which window function an [`Expr::Window`] node computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFn {
    /// `ROW_NUMBER()`
    RowNumber,
    /// `RANK()`
    Rank,
    /// `DENSE_RANK()`
    DenseRank,
}

/// Which niladic (argument-less) built-in an [`Expr::NiladicFn`] node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NiladicFn {
    /// `CURRENT_DATE`
    CurrentDate,
    /// `CURRENT_TIME`
    CurrentTime,
    /// `CURRENT_TIMESTAMP`
    CurrentTimestamp,
}

/// Which wrapping form a [`Expr::Subquery`] node uses, and with what
/// comparison operator for the quantified-comparison forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryKind {
    /// Used in an expression context, must yield at most one row of one
    /// column.
    Scalar,
    /// `EXISTS (...)`.
    Exists,
    /// `expr op ALL (...)`.
    All(BinaryOp),
    /// `expr op ANY (...)` (a.k.a. `SOME`).
    Any(BinaryOp),
}

/// An SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal {
        /// The literal's value.
        value: Value,
        /// The syntactic kind the parser classified it as.
        kind: LiteralKind,
    },

    /// A bound placeholder (`?` or `:name`). Must be `bound = true` by the
    /// time it reaches the evaluator — an unbound placeholder is a bind
    /// error.
    Placeholder {
        /// Whether a value has been bound.
        bound: bool,
        /// The bound value (meaningless while `bound == false`).
        value: Value,
    },

    /// A column reference, one or two path components (`col` or
    /// `table.col`).
    Identifier {
        /// One or two path segments.
        parts: Vec<String>,
    },

    /// A binary expression.
    Binary {
        /// Left operand.
        left: Box<Expr>,
        /// Operator.
        op: BinaryOp,
        /// Right operand.
        right: Box<Expr>,
    },

    /// A unary expression.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        expr: Box<Expr>,
    },

    /// A scalar function call.
    FunctionCall(FunctionCall),

    /// `BETWEEN` / `NOT BETWEEN`.
    Between {
        /// Expression under test.
        expr: Box<Expr>,
        /// Lower bound (inclusive).
        low: Box<Expr>,
        /// Upper bound (inclusive).
        high: Box<Expr>,
        /// `NOT BETWEEN`.
        negated: bool,
    },

    /// `IN` / `NOT IN`, literal list form.
    In {
        /// Expression under test.
        left: Box<Expr>,
        /// Candidate values.
        values: Vec<Expr>,
        /// `NOT IN`.
        negated: bool,
    },

    /// `IN (subquery)` / `NOT IN (subquery)`.
    InSubquery {
        /// Expression under test.
        left: Box<Expr>,
        /// The subquery.
        subquery: Box<super::SelectStatement>,
        /// `NOT IN`.
        negated: bool,
    },

    /// `IS NULL` / `IS NOT NULL`.
    IsNull {
        /// Expression under test.
        expr: Box<Expr>,
        /// `IS NOT NULL`.
        negated: bool,
    },

    /// `LIKE` / `NOT LIKE`.
    Like {
        /// Expression under test.
        left: Box<Expr>,
        /// Pattern expression.
        pattern: Box<Expr>,
        /// `NOT LIKE`.
        negated: bool,
    },

    /// `CASE`, both simple (`operand` set) and searched (`operand` absent)
    /// forms.
    CaseWhen {
        /// Simple-form operand, compared to each `when` with loose
        /// equality. Absent for the searched form, where each `when` is
        /// itself evaluated as boolean.
        operand: Option<Box<Expr>>,
        /// `(when, then)` branch pairs, tried in order.
        branches: Vec<(Expr, Expr)>,
        /// `ELSE` expression; `NULL` if absent.
        else_branch: Option<Box<Expr>>,
    },

    /// A subquery used outside of `IN`: scalar context, `EXISTS`,
    /// `ALL`/`ANY` quantified comparison.
    Subquery {
        /// The subquery AST.
        query: Box<super::SelectStatement>,
        /// Which wrapping form applies.
        kind: SubqueryKind,
        /// For `ALL`/`ANY`, the left-hand expression being compared.
        /// `None` for `Scalar`/`Exists`.
        left: Option<Box<Expr>>,
        /// `NOT EXISTS`.
        negated: bool,
    },

    /// `CURRENT_DATE` / `CURRENT_TIME` / `CURRENT_TIMESTAMP`.
    NiladicFn(NiladicFn),

    /// An aggregate function reference (`COUNT`, `SUM`, `AVG`, `MIN`,
    /// `MAX`), only legal in a `SELECT`/`HAVING`/`ORDER BY` list.
    Aggregate {
        /// Which aggregate.
        func: AggregateFn,
        /// `DISTINCT` variant.
        distinct: bool,
        /// Argument expression; `None` only for `COUNT(*)`.
        expr: Option<Box<Expr>>,
    },

    /// A window function reference.
    Window {
        /// Which window function.
        func: WindowFn,
        /// `PARTITION BY` expressions.
        partition_by: Vec<Expr>,
        /// `ORDER BY` expressions within each partition.
        order_by: Vec<super::OrderBy>,
    },

    /// `*` or `t.*` in a `SELECT` list.
    Wildcard {
        /// Table qualifier, if `t.*`.
        table: Option<String>,
    },
}

impl Expr {
    /// Creates an unqualified column reference.
    #[must_use]
    pub fn column(name: impl Into<String>) -> Self {
        Self::Identifier {
            parts: vec![name.into()],
        }
    }

    /// Creates a qualified column reference (`table.col`).
    #[must_use]
    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Identifier {
            parts: vec![table.into(), name.into()],
        }
    }

    /// Creates an integer literal.
    #[must_use]
    pub fn integer(value: i64) -> Self {
        Self::Literal {
            value: Value::Int(value),
            kind: LiteralKind::Number,
        }
    }

    /// Creates a boolean literal.
    #[must_use]
    pub fn boolean(value: bool) -> Self {
        Self::Literal {
            value: Value::Bool(value),
            kind: LiteralKind::Bool,
        }
    }

    /// Creates a string literal.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal {
            value: Value::Text(value.into()),
            kind: LiteralKind::String,
        }
    }

    /// Creates a `NULL` literal.
    #[must_use]
    pub fn null() -> Self {
        Self::Literal {
            value: Value::Null,
            kind: LiteralKind::Null,
        }
    }

    /// Wraps `self` in a binary expression.
    #[must_use]
    pub fn binary(self, op: BinaryOp, right: Self) -> Self {
        Self::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// `self = right`.
    #[must_use]
    pub fn eq(self, right: Self) -> Self {
        self.binary(BinaryOp::Eq, right)
    }

    /// `self > right`.
    #[must_use]
    pub fn gt(self, right: Self) -> Self {
        self.binary(BinaryOp::Gt, right)
    }

    /// `self AND right`.
    #[must_use]
    pub fn and(self, right: Self) -> Self {
        self.binary(BinaryOp::And, right)
    }

    /// `self OR right`.
    #[must_use]
    pub fn or(self, right: Self) -> Self {
        self.binary(BinaryOp::Or, right)
    }

    /// `NOT self`.
    #[must_use]
    pub fn not(self) -> Self {
        Self::Unary {
            op: UnaryOp::Not,
            expr: Box::new(self),
        }
    }

    /// `self IS NULL`.
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// `self IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    /// `self BETWEEN low AND high`.
    #[must_use]
    pub fn between(self, low: Self, high: Self) -> Self {
        Self::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    /// `self IN (values)`.
    #[must_use]
    pub fn in_list(self, values: Vec<Self>) -> Self {
        Self::In {
            left: Box::new(self),
            values,
            negated: false,
        }
    }

    /// `self NOT IN (values)`.
    #[must_use]
    pub fn not_in_list(self, values: Vec<Self>) -> Self {
        Self::In {
            left: Box::new(self),
            values,
            negated: true,
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value, .. } => write!(f, "{value}"),
            Self::Placeholder { .. } => write!(f, "?"),
            Self::Identifier { parts } => write!(f, "{}", parts.join(".")),
            Self::Binary { left, op, right } => write!(f, "({left} {} {right})", op.as_str()),
            Self::Unary { op, expr } => match op {
                UnaryOp::Not => write!(f, "(NOT {expr})"),
                UnaryOp::Neg => write!(f, "(-{expr})"),
                UnaryOp::Plus => write!(f, "(+{expr})"),
            },
            Self::FunctionCall(call) => write!(f, "{call}"),
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "({expr}{not} BETWEEN {low} AND {high})")
            }
            Self::In { left, values, negated } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "({left}{not} IN (")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "))")
            }
            Self::InSubquery { left, subquery, negated } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "({left}{not} IN ({subquery}))")
            }
            Self::IsNull { expr, negated } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "({expr} IS{not} NULL)")
            }
            Self::Like { left, pattern, negated } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "({left}{not} LIKE {pattern})")
            }
            Self::CaseWhen {
                operand,
                branches,
                else_branch,
            } => {
                write!(f, "CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {operand}")?;
                }
                for (when, then) in branches {
                    write!(f, " WHEN {when} THEN {then}")?;
                }
                if let Some(else_branch) = else_branch {
                    write!(f, " ELSE {else_branch}")?;
                }
                write!(f, " END")
            }
            Self::Subquery {
                query,
                kind,
                left,
                negated,
            } => {
                if let Some(left) = left {
                    write!(f, "{left} ")?;
                }
                match kind {
                    SubqueryKind::Scalar => write!(f, "({query})"),
                    SubqueryKind::Exists => {
                        let not = if *negated { "NOT " } else { "" };
                        write!(f, "{not}EXISTS ({query})")
                    }
                    SubqueryKind::All(op) => write!(f, "{} ALL ({query})", op.as_str()),
                    SubqueryKind::Any(op) => write!(f, "{} ANY ({query})", op.as_str()),
                }
            }
            Self::NiladicFn(func) => write!(
                f,
                "{}",
                match func {
                    NiladicFn::CurrentDate => "CURRENT_DATE",
                    NiladicFn::CurrentTime => "CURRENT_TIME",
                    NiladicFn::CurrentTimestamp => "CURRENT_TIMESTAMP",
                }
            ),
            Self::Aggregate { func, distinct, expr } => {
                let name = match func {
                    AggregateFn::Count => "COUNT",
                    AggregateFn::Sum => "SUM",
                    AggregateFn::Avg => "AVG",
                    AggregateFn::Min => "MIN",
                    AggregateFn::Max => "MAX",
                };
                let distinct = if *distinct { "DISTINCT " } else { "" };
                match expr {
                    Some(expr) => write!(f, "{name}({distinct}{expr})"),
                    None => write!(f, "{name}(*)"),
                }
            }
            Self::Window {
                func,
                partition_by,
                order_by,
            } => {
                let name = match func {
                    WindowFn::RowNumber => "ROW_NUMBER",
                    WindowFn::Rank => "RANK",
                    WindowFn::DenseRank => "DENSE_RANK",
                };
                write!(f, "{name}() OVER (")?;
                if !partition_by.is_empty() {
                    write!(f, "PARTITION BY ")?;
                    for (i, e) in partition_by.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{e}")?;
                    }
                }
                if !order_by.is_empty() {
                    write!(f, " ORDER BY ")?;
                    for (i, o) in order_by.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{o}")?;
                    }
                }
                write!(f, ")")
            }
            Self::Wildcard { table } => match table {
                Some(t) => write!(f, "{t}.*"),
                None => write!(f, "*"),
            },
        }
    }
}
