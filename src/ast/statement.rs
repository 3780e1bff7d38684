//! SQL statement AST types.

use std::fmt;

use super::expr::Expr;

/// Order direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Ascending order (default).
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderDirection {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Null ordering for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    /// NULLs sort first.
    First,
    /// NULLs sort last.
    Last,
}

impl NullOrdering {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

impl fmt::Display for NullOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An `ORDER BY` clause entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The expression to order by.
    pub expr: Expr,
    /// `ASC` or `DESC`.
    pub direction: OrderDirection,
    /// Explicit null placement, if given.
    pub nulls: Option<NullOrdering>,
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// `INNER JOIN`, and the implicit join of a comma-separated `FROM`
    /// list once an `ON`/`WHERE` predicate ties the two sides together.
    Inner,
    /// `LEFT [OUTER] JOIN`.
    Left,
    /// `RIGHT [OUTER] JOIN`.
    Right,
    /// `FULL [OUTER] JOIN`.
    Full,
    /// `CROSS JOIN`, and a bare comma in `FROM` before any predicate is
    /// known to apply.
    Cross,
}

impl JoinType {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }

    /// Whether unmatched rows from the left side are padded with NULLs.
    #[must_use]
    pub const fn pads_left(self) -> bool {
        matches!(self, Self::Left | Self::Full)
    }

    /// Whether unmatched rows from the right side are padded with NULLs.
    #[must_use]
    pub const fn pads_right(self) -> bool {
        matches!(self, Self::Right | Self::Full)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `JOIN` clause attached to the table reference on its left.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// The type of join.
    pub join_type: JoinType,
    /// The right-hand table.
    pub table: TableRef,
    /// The join condition, absent only for `CROSS JOIN` and comma-joins
    /// not yet matched to a predicate by pushdown.
    pub on: Option<Expr>,
}

/// A table reference in a `FROM` clause.
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// A named table, resolved against the table registry (or a CTE name
    /// in scope).
    Table {
        /// Schema name, if qualified.
        schema: Option<String>,
        /// Table (or CTE) name.
        name: String,
        /// Alias, if given.
        alias: Option<String>,
    },
    /// A derived table (subquery in `FROM`).
    Subquery {
        /// The subquery.
        query: Box<SelectStatement>,
        /// Alias (required for derived tables).
        alias: String,
    },
    /// A joined pair, read left-to-right; a comma-separated `FROM` list of
    /// more than two tables is a left-deep chain of these with
    /// [`JoinType::Cross`] until a predicate is pushed onto one of them.
    Join {
        /// Left side.
        left: Box<TableRef>,
        /// The join clause describing the right side and how it attaches.
        join: Box<JoinClause>,
    },
}

impl TableRef {
    /// Creates a simple table reference.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table {
            schema: None,
            name: name.into(),
            alias: None,
        }
    }

    /// Creates a table reference with schema.
    #[must_use]
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Table {
            schema: Some(schema.into()),
            name: name.into(),
            alias: None,
        }
    }

    /// Adds an alias to this table reference.
    #[must_use]
    pub fn alias(self, alias: impl Into<String>) -> Self {
        match self {
            Self::Table { schema, name, .. } => Self::Table {
                schema,
                name,
                alias: Some(alias.into()),
            },
            Self::Subquery { query, .. } => Self::Subquery {
                query,
                alias: alias.into(),
            },
            Self::Join { left, join } => Self::Join {
                left: Box::new((*left).alias(alias)),
                join,
            },
        }
    }

    /// The effective name rows from this reference are addressed by
    /// (alias if present, else the table name). Returns `None` for an
    /// un-aliased `Join` (the chain is addressed through its leaves).
    #[must_use]
    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Self::Table { alias, name, .. } => Some(alias.as_deref().unwrap_or(name)),
            Self::Subquery { alias, .. } => Some(alias),
            Self::Join { .. } => None,
        }
    }

    /// Counts the number of base table/subquery leaves feeding this
    /// reference — the quantity the comma-join cap (§5) bounds.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Table { .. } | Self::Subquery { .. } => 1,
            Self::Join { left, join } => left.leaf_count() + join.table.leaf_count(),
        }
    }
}

/// Set-operator combining two `SELECT`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    /// `UNION` (duplicate rows removed).
    Union,
    /// `UNION ALL` (duplicates retained).
    UnionAll,
    /// `INTERSECT`.
    Intersect,
    /// `EXCEPT` (a.k.a. `MINUS`).
    Except,
}

/// A `UNION`/`INTERSECT`/`EXCEPT` applied to a `SELECT`, chaining the next
/// statement on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    /// Which combination.
    pub op: SetOp,
    /// The right-hand statement.
    pub right: Box<SelectStatement>,
}

/// A named subquery introduced by `WITH`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpr {
    /// The name bound for this CTE, visible to the statement it precedes
    /// and, when recursive, to its own body.
    pub name: String,
    /// Explicit column names, if given.
    pub columns: Vec<String>,
    /// The CTE body.
    pub query: Box<SelectStatement>,
    /// Whether this is a `WITH RECURSIVE` member.
    pub recursive: bool,
}

/// A `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// `WITH` clause CTEs, in dependency order.
    pub ctes: Vec<CommonTableExpr>,
    /// Whether `SELECT DISTINCT` was specified.
    pub distinct: bool,
    /// The projection list.
    pub select_list: Vec<SelectColumn>,
    /// The `FROM` clause; `None` for a `FROM`-less `SELECT`.
    pub from: Option<TableRef>,
    /// The `WHERE` predicate.
    pub where_clause: Option<Expr>,
    /// `GROUP BY` expressions.
    pub group_by: Vec<Expr>,
    /// The `HAVING` predicate.
    pub having: Option<Expr>,
    /// `ORDER BY` entries.
    pub order_by: Vec<OrderBy>,
    /// `LIMIT` row cap.
    pub limit: Option<Expr>,
    /// `OFFSET` row skip.
    pub offset: Option<Expr>,
    /// A trailing set operation chaining another `SELECT`, if any.
    pub set_op: Option<SetOperation>,
}

impl SelectStatement {
    /// An empty, `FROM`-less `SELECT` with no projection — a starting
    /// point for builders and tests.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ctes: Vec::new(),
            distinct: false,
            select_list: Vec::new(),
            from: None,
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            set_op: None,
        }
    }
}

/// A column in a `SELECT` list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    /// The expression.
    pub expr: Expr,
    /// Column alias.
    pub alias: Option<String>,
}

impl SelectColumn {
    /// Creates a new select column.
    #[must_use]
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    /// Creates a select column with an alias.
    #[must_use]
    pub fn with_alias(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// An `INSERT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Schema name, if qualified.
    pub schema: Option<String>,
    /// Target table.
    pub table: String,
    /// Target column names; empty means "all columns, in table order".
    pub columns: Vec<String>,
    /// The rows or query supplying values.
    pub values: InsertSource,
    /// `ON CONFLICT`/`ON DUPLICATE KEY` upsert clause.
    pub on_conflict: Option<OnConflict>,
}

/// Source of data for `INSERT`.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// `VALUES (...), (...), ...`.
    Values(Vec<Vec<Expr>>),
    /// `INSERT ... SELECT ...`.
    Query(Box<SelectStatement>),
    /// `DEFAULT VALUES`.
    DefaultValues,
}

/// Upsert clause (`ON CONFLICT` / `ON DUPLICATE KEY UPDATE` / `MERGE`,
/// depending on dialect — see [`crate::dialect::Dialect::upsert_form`]).
#[derive(Debug, Clone, PartialEq)]
pub struct OnConflict {
    /// Conflict target columns; empty means "the table's natural key".
    pub columns: Vec<String>,
    /// Action to take on conflict.
    pub action: ConflictAction,
}

/// Action to take on conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAction {
    /// `DO NOTHING`.
    DoNothing,
    /// `DO UPDATE SET ...`.
    DoUpdate(Vec<UpdateAssignment>),
}

/// An `UPDATE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Schema name, if qualified.
    pub schema: Option<String>,
    /// Target table.
    pub table: String,
    /// Alias, if given.
    pub alias: Option<String>,
    /// `SET` assignments.
    pub assignments: Vec<UpdateAssignment>,
    /// Additional `FROM` sources for a join-qualified update.
    pub from: Option<TableRef>,
    /// `WHERE` predicate; `None` updates every row.
    pub where_clause: Option<Expr>,
}

/// An assignment in `UPDATE ... SET`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAssignment {
    /// Column name.
    pub column: String,
    /// Value expression.
    pub value: Expr,
}

/// A `DELETE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Schema name, if qualified.
    pub schema: Option<String>,
    /// Target table.
    pub table: String,
    /// Alias, if given.
    pub alias: Option<String>,
    /// `WHERE` predicate. Unlike `UPDATE`, this is mandatory at the
    /// planning layer — see [`crate::write::WritePlanner`].
    pub where_clause: Option<Expr>,
}

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `SELECT` statement.
    Select(SelectStatement),
    /// `INSERT` statement.
    Insert(InsertStatement),
    /// `UPDATE` statement.
    Update(UpdateStatement),
    /// `DELETE` statement.
    Delete(DeleteStatement),
}

// ===================================================================
// Display implementations
// ===================================================================

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.expr, self.direction)?;
        if let Some(nulls) = &self.nulls {
            write!(f, " {nulls}")?;
        }
        Ok(())
    }
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.join_type, self.table)?;
        if let Some(on) = &self.on {
            write!(f, " ON {on}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table {
                schema,
                name,
                alias,
            } => {
                if let Some(s) = schema {
                    write!(f, "{s}.")?;
                }
                write!(f, "{name}")?;
                if let Some(a) = alias {
                    write!(f, " AS {a}")?;
                }
                Ok(())
            }
            Self::Subquery { query, alias } => write!(f, "({query}) AS {alias}"),
            Self::Join { left, join } => write!(f, "{left} {join}"),
        }
    }
}

impl fmt::Display for SelectColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        if let Some(a) = &self.alias {
            write!(f, " AS {a}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SetOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION ALL",
            SetOp::Intersect => "INTERSECT",
            SetOp::Except => "EXCEPT",
        };
        write!(f, "{op} {}", self.right)
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.ctes.is_empty() {
            write!(f, "WITH ")?;
            for (i, cte) in self.ctes.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                if cte.recursive {
                    write!(f, "RECURSIVE ")?;
                }
                write!(f, "{} AS ({})", cte.name, cte.query)?;
            }
            write!(f, " ")?;
        }
        write!(f, "SELECT")?;
        if self.distinct {
            write!(f, " DISTINCT")?;
        }
        for (i, col) in self.select_list.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {col}")?;
        }
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY")?;
            for (i, g) in self.group_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {g}")?;
            }
        }
        if let Some(h) = &self.having {
            write!(f, " HAVING {h}")?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY")?;
            for (i, o) in self.order_by.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {o}")?;
            }
        }
        if let Some(l) = &self.limit {
            write!(f, " LIMIT {l}")?;
        }
        if let Some(o) = &self.offset {
            write!(f, " OFFSET {o}")?;
        }
        if let Some(set_op) = &self.set_op {
            write!(f, " {set_op}")?;
        }
        Ok(())
    }
}

impl fmt::Display for InsertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Values(rows) => {
                write!(f, "VALUES")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " (")?;
                    for (j, val) in row.iter().enumerate() {
                        if j > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{val}")?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
            Self::Query(q) => write!(f, "{q}"),
            Self::DefaultValues => write!(f, "DEFAULT VALUES"),
        }
    }
}

impl fmt::Display for OnConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ON CONFLICT (")?;
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{col}")?;
        }
        write!(f, ") {}", self.action)
    }
}

impl fmt::Display for ConflictAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoNothing => write!(f, "DO NOTHING"),
            Self::DoUpdate(assignments) => {
                write!(f, "DO UPDATE SET")?;
                for (i, a) in assignments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {a}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "INSERT INTO ")?;
        if let Some(s) = &self.schema {
            write!(f, "{s}.")?;
        }
        write!(f, "{}", self.table)?;
        if !self.columns.is_empty() {
            write!(f, " (")?;
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{col}")?;
            }
            write!(f, ")")?;
        }
        write!(f, " {}", self.values)?;
        if let Some(oc) = &self.on_conflict {
            write!(f, " {oc}")?;
        }
        Ok(())
    }
}

impl fmt::Display for UpdateAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.column, self.value)
    }
}

impl fmt::Display for UpdateStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE ")?;
        if let Some(s) = &self.schema {
            write!(f, "{s}.")?;
        }
        write!(f, "{}", self.table)?;
        if let Some(a) = &self.alias {
            write!(f, " AS {a}")?;
        }
        write!(f, " SET")?;
        for (i, a) in self.assignments.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {a}")?;
        }
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        Ok(())
    }
}

impl fmt::Display for DeleteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM ")?;
        if let Some(s) = &self.schema {
            write!(f, "{s}.")?;
        }
        write!(f, "{}", self.table)?;
        if let Some(a) = &self.alias {
            write!(f, " AS {a}")?;
        }
        if let Some(w) = &self.where_clause {
            write!(f, " WHERE {w}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(s) => write!(f, "{s}"),
            Self::Insert(i) => write!(f, "{i}"),
            Self::Update(u) => write!(f, "{u}"),
            Self::Delete(d) => write!(f, "{d}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_direction_as_str() {
        assert_eq!(OrderDirection::Asc.as_str(), "ASC");
        assert_eq!(OrderDirection::Desc.as_str(), "DESC");
    }

    #[test]
    fn join_type_padding() {
        assert!(JoinType::Left.pads_left());
        assert!(!JoinType::Left.pads_right());
        assert!(JoinType::Full.pads_left() && JoinType::Full.pads_right());
        assert!(!JoinType::Inner.pads_left());
    }

    #[test]
    fn table_ref_builder() {
        let table = TableRef::table("users").alias("u");
        assert!(
            matches!(&table, TableRef::Table { name, alias, .. } if name == "users" && alias.as_deref() == Some("u"))
        );
        assert_eq!(table.binding_name(), Some("u"));
    }

    #[test]
    fn leaf_count_counts_comma_join_chain() {
        let chain = TableRef::Join {
            left: Box::new(TableRef::Join {
                left: Box::new(TableRef::table("a")),
                join: Box::new(JoinClause {
                    join_type: JoinType::Cross,
                    table: TableRef::table("b"),
                    on: None,
                }),
            }),
            join: Box::new(JoinClause {
                join_type: JoinType::Cross,
                table: TableRef::table("c"),
                on: None,
            }),
        };
        assert_eq!(chain.leaf_count(), 3);
    }

    #[test]
    fn select_statement_empty_has_no_clauses() {
        let stmt = SelectStatement::empty();
        assert!(stmt.from.is_none());
        assert!(stmt.select_list.is_empty());
        assert!(stmt.set_op.is_none());
    }
}
