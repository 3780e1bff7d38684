//! The abstract syntax tree this crate operates on.
//!
//! Construction (parsing SQL text into this tree) is an external
//! collaborator's job; this crate consumes an already-built tree through
//! [`crate::rewrite`], [`crate::eval`], [`crate::exec`], and [`crate::write`].

mod expr;
mod statement;

pub use expr::{
    AggregateFn, BinaryOp, Expr, FunctionCall, LiteralKind, NiladicFn, SubqueryKind, UnaryOp,
    WindowFn,
};
pub use statement::{
    CommonTableExpr, ConflictAction, DeleteStatement, InsertSource, InsertStatement, JoinClause,
    JoinType, NullOrdering, OnConflict, OrderBy, OrderDirection, SelectColumn, SelectStatement,
    SetOp, SetOperation, Statement, TableRef, UpdateAssignment, UpdateStatement,
};
