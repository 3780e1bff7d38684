//! The write planner (C6): backs `INSERT`/`UPDATE`/`DELETE` expressed over
//! a composable scope filter, combining a caller-supplied predicate with
//! the backing scope's own filter and delegating to a [`TableSource`].

use crate::ast::{ConflictAction, Expr, OnConflict, TableRef};
use crate::dialect::{Dialect, UpsertForm};
use crate::error::{FedSqlError, Result};
use crate::eval::{Evaluator, OuterContext};
use crate::rewrite;
use crate::row::Row;
use crate::source::TableSource;
use crate::value::Value;

/// A reusable scope for mutations: a single base table plus an optional
/// `WHERE` predicate every affected row must already satisfy (or, for
/// `INSERT`, that the new row must satisfy).
///
/// Construction rejects any base wider than one table — joins and set
/// operations are not valid mutation targets (§4.5, §7 "Mutation").
#[derive(Debug, Clone)]
pub struct MutablePartialQuery {
    table: String,
    filter: Option<Expr>,
}

impl MutablePartialQuery {
    /// Builds a scope over `base`, erroring if `base` is not a single
    /// table/subquery leaf.
    pub fn new(base: &TableRef, filter: Option<Expr>) -> Result<Self> {
        if base.leaf_count() != 1 {
            return Err(FedSqlError::MutationBaseNotSingleTable);
        }
        let table = base
            .binding_name()
            .ok_or(FedSqlError::MutationBaseNotSingleTable)?
            .to_string();
        Ok(Self {
            table,
            filter: filter.map(rewrite::rewrite),
        })
    }

    /// The bound table's logical name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The scope's own filter, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }
}

/// A row-level gate invoked before a mutation is allowed to affect a row
/// (or, for `INSERT`, the row about to be inserted).
pub type RowValidator<'a> = dyn Fn(&Row) -> Result<()> + 'a;

/// Plans and executes `INSERT`/`UPDATE`/`DELETE` against a [`TableSource`],
/// honouring a [`MutablePartialQuery`] scope.
pub struct WritePlanner<'a> {
    evaluator: &'a Evaluator<'a>,
}

impl<'a> WritePlanner<'a> {
    /// Creates a planner backed by `evaluator`, used to check scope
    /// filters against candidate rows.
    #[must_use]
    pub fn new(evaluator: &'a Evaluator<'a>) -> Self {
        Self { evaluator }
    }

    /// Inserts `row`, validating it against `scope`'s filter (if any) and
    /// `row_validator` (if given) before delegating to `source.insert`.
    pub fn insert(
        &self,
        source: &mut dyn TableSource,
        scope: &MutablePartialQuery,
        row: Row,
        row_validator: Option<&RowValidator<'_>>,
    ) -> Result<()> {
        if let Some(filter) = scope.filter() {
            if !self.row_satisfies(filter, &row)? {
                return Err(FedSqlError::ScopeViolation(format!(
                    "row does not satisfy scope filter for table {}",
                    scope.table()
                )));
            }
        }
        if let Some(validator) = row_validator {
            validator(&row)?;
        }
        source.insert(row)
    }

    /// Inserts `row` as an upsert: the same scope/validator checks as
    /// [`Self::insert`], then resolves `on_conflict` to the `dialect`'s
    /// [`UpsertForm`] and hands it back to the caller (§4.5 "Upsert
    /// surface") — the planner never assembles passthrough SQL itself, it
    /// only decides which form applies and still performs the logical
    /// insert against `source`.
    pub fn insert_with_upsert(
        &self,
        source: &mut dyn TableSource,
        scope: &MutablePartialQuery,
        row: Row,
        dialect: Dialect,
        on_conflict: &OnConflict,
        row_validator: Option<&RowValidator<'_>>,
    ) -> Result<UpsertForm> {
        if let Some(filter) = scope.filter() {
            if !self.row_satisfies(filter, &row)? {
                return Err(FedSqlError::ScopeViolation(format!(
                    "row does not satisfy scope filter for table {}",
                    scope.table()
                )));
            }
        }
        if let Some(validator) = row_validator {
            validator(&row)?;
        }
        let update_columns: Vec<String> = match &on_conflict.action {
            ConflictAction::DoNothing => Vec::new(),
            ConflictAction::DoUpdate(assignments) => assignments.iter().map(|a| a.column.clone()).collect(),
        };
        let form = dialect.upsert_form(&on_conflict.columns, &update_columns);
        source.insert(row)?;
        Ok(form)
    }

    /// Updates rows matching `scope`'s filter AND'ed with `call_filter`,
    /// applying `changes`. Invokes `row_validator` on every to-be-affected
    /// row before delegating to `source.update`.
    pub fn update(
        &self,
        source: &mut dyn TableSource,
        scope: &MutablePartialQuery,
        call_filter: Option<&Expr>,
        changes: &[(String, Value)],
        row_validator: Option<&RowValidator<'_>>,
    ) -> Result<usize> {
        let combined = combine(scope.filter(), call_filter);
        if let Some(validator) = row_validator {
            self.validate_matching(source, combined.as_ref(), validator)?;
        }
        match combined {
            Some(filter) => source.update(&filter, changes),
            None => source.update(&Expr::boolean(true), changes),
        }
    }

    /// Deletes rows matching `scope`'s filter AND'ed with `call_filter`.
    /// Errors if the combined filter is absent — mass delete must bypass
    /// the planner.
    pub fn delete(
        &self,
        source: &mut dyn TableSource,
        scope: &MutablePartialQuery,
        call_filter: Option<&Expr>,
        row_validator: Option<&RowValidator<'_>>,
    ) -> Result<usize> {
        let combined = combine(scope.filter(), call_filter).ok_or(FedSqlError::DeleteWithoutWhere)?;
        if let Some(validator) = row_validator {
            self.validate_matching(source, Some(&combined), validator)?;
        }
        source.delete(&combined)
    }

    fn row_satisfies(&self, filter: &Expr, row: &Row) -> Result<bool> {
        Ok(self.evaluator.eval_bool(filter, row, &OuterContext::new())?.is_true())
    }

    fn validate_matching(
        &self,
        source: &mut dyn TableSource,
        filter: Option<&Expr>,
        validator: &RowValidator<'_>,
    ) -> Result<()> {
        for row in source.iterate()? {
            let matches = match filter {
                Some(f) => self.row_satisfies(f, &row)?,
                None => true,
            };
            if matches {
                validator(&row)?;
            }
        }
        Ok(())
    }
}

fn combine(scope: Option<&Expr>, call: Option<&Expr>) -> Option<Expr> {
    // `scope`'s filter was already rewritten in `MutablePartialQuery::new`;
    // `call` is normalized here since it arrives fresh at each call site.
    let call = call.cloned().map(rewrite::rewrite);
    match (scope, call) {
        (Some(a), Some(b)) => Some(a.clone().and(b)),
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{SelectStatement, TableRef};
    use crate::clock::FixedClock;
    use crate::eval::subquery::SubqueryExecutor;
    use crate::source::{ColumnInfo, IndexKind, MemoryTableSource};
    use chrono::NaiveDateTime;

    struct NoSubqueries;
    impl SubqueryExecutor for NoSubqueries {
        fn execute(&self, _query: &SelectStatement, _outer_row: &Row, _outer_ctx: &OuterContext) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    fn evaluator() -> (FixedClock, NoSubqueries) {
        (
            FixedClock(NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap()),
            NoSubqueries,
        )
    }

    fn fixture() -> MemoryTableSource {
        MemoryTableSource::new(vec![ColumnInfo {
            name: "id".into(),
            declared_type: "INTEGER".into(),
            nullable: false,
            index_kind: IndexKind::Unique,
        }])
        .with_rows([Row::new().with("id", Value::Int(1)), Row::new().with("id", Value::Int(2))])
    }

    #[test]
    fn delete_without_where_errors() {
        let (clock, subqueries) = evaluator();
        let evaluator = Evaluator::new(&clock, &subqueries);
        let planner = WritePlanner::new(&evaluator);
        let mut source = fixture();
        let scope = MutablePartialQuery::new(&TableRef::table("t"), None).unwrap();
        let err = planner.delete(&mut source, &scope, None, None);
        assert!(matches!(err, Err(FedSqlError::DeleteWithoutWhere)));
    }

    #[test]
    fn delete_with_call_filter_removes_matching_rows() {
        let (clock, subqueries) = evaluator();
        let evaluator = Evaluator::new(&clock, &subqueries);
        let planner = WritePlanner::new(&evaluator);
        let mut source = fixture();
        let scope = MutablePartialQuery::new(&TableRef::table("t"), None).unwrap();
        let filter = Expr::column("id").eq(Expr::integer(1));
        let deleted = planner.delete(&mut source, &scope, Some(&filter), None).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(source.count().unwrap(), 1);
    }

    #[test]
    fn insert_violating_scope_filter_errors() {
        let (clock, subqueries) = evaluator();
        let evaluator = Evaluator::new(&clock, &subqueries);
        let planner = WritePlanner::new(&evaluator);
        let mut source = fixture();
        let scope_filter = Expr::column("id").gt(Expr::integer(10));
        let scope = MutablePartialQuery::new(&TableRef::table("t"), Some(scope_filter)).unwrap();
        let row = Row::new().with("id", Value::Int(1));
        let result = planner.insert(&mut source, &scope, row, None);
        assert!(matches!(result, Err(FedSqlError::ScopeViolation(_))));
    }

    #[test]
    fn insert_satisfying_scope_filter_succeeds() {
        let (clock, subqueries) = evaluator();
        let evaluator = Evaluator::new(&clock, &subqueries);
        let planner = WritePlanner::new(&evaluator);
        let mut source = fixture();
        let scope_filter = Expr::column("id").gt(Expr::integer(10));
        let scope = MutablePartialQuery::new(&TableRef::table("t"), Some(scope_filter)).unwrap();
        let row = Row::new().with("id", Value::Int(20));
        planner.insert(&mut source, &scope, row, None).unwrap();
        assert_eq!(source.count().unwrap(), 3);
    }

    #[test]
    fn mutable_partial_query_rejects_a_join_base() {
        use crate::ast::{JoinClause, JoinType};
        let join_base = TableRef::Join {
            left: Box::new(TableRef::table("a")),
            join: Box::new(JoinClause {
                join_type: JoinType::Cross,
                table: TableRef::table("b"),
                on: None,
            }),
        };
        let err = MutablePartialQuery::new(&join_base, None);
        assert!(matches!(err, Err(FedSqlError::MutationBaseNotSingleTable)));
    }

    #[test]
    fn update_applies_combined_filter_and_validator_sees_only_matching_rows() {
        let (clock, subqueries) = evaluator();
        let evaluator = Evaluator::new(&clock, &subqueries);
        let planner = WritePlanner::new(&evaluator);
        let mut source = fixture();
        let scope = MutablePartialQuery::new(&TableRef::table("t"), None).unwrap();
        let seen = std::cell::RefCell::new(Vec::new());
        let validator = |row: &Row| {
            seen.borrow_mut().push(row.get("id").cloned());
            Ok(())
        };
        let filter = Expr::column("id").eq(Expr::integer(2));
        let updated = planner
            .update(&mut source, &scope, Some(&filter), &[("id".into(), Value::Int(99))], Some(&validator))
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(*seen.borrow(), vec![Some(Value::Int(2))]);
    }

    #[test]
    fn insert_with_upsert_resolves_dialect_form_and_still_inserts() {
        use crate::ast::UpdateAssignment;

        let (clock, subqueries) = evaluator();
        let evaluator = Evaluator::new(&clock, &subqueries);
        let planner = WritePlanner::new(&evaluator);
        let mut source = fixture();
        let scope = MutablePartialQuery::new(&TableRef::table("t"), None).unwrap();
        let on_conflict = OnConflict {
            columns: vec!["id".into()],
            action: ConflictAction::DoUpdate(vec![UpdateAssignment {
                column: "id".into(),
                value: Expr::integer(3),
            }]),
        };
        let row = Row::new().with("id", Value::Int(3));
        let form = planner
            .insert_with_upsert(&mut source, &scope, row, Dialect::Postgres, &on_conflict, None)
            .unwrap();
        assert!(matches!(form, UpsertForm::OnConflictDoUpdate { .. }));
        assert_eq!(source.count().unwrap(), 3);
    }

    #[test]
    fn insert_with_upsert_still_honours_scope_violation() {
        let (clock, subqueries) = evaluator();
        let evaluator = Evaluator::new(&clock, &subqueries);
        let planner = WritePlanner::new(&evaluator);
        let mut source = fixture();
        let scope_filter = Expr::column("id").gt(Expr::integer(10));
        let scope = MutablePartialQuery::new(&TableRef::table("t"), Some(scope_filter)).unwrap();
        let on_conflict = OnConflict {
            columns: vec!["id".into()],
            action: ConflictAction::DoNothing,
        };
        let row = Row::new().with("id", Value::Int(1));
        let result = planner.insert_with_upsert(&mut source, &scope, row, Dialect::Sqlite, &on_conflict, None);
        assert!(matches!(result, Err(FedSqlError::ScopeViolation(_))));
    }

    #[test]
    fn negated_scope_filter_is_normalized_before_matching() {
        let (clock, subqueries) = evaluator();
        let evaluator = Evaluator::new(&clock, &subqueries);
        let planner = WritePlanner::new(&evaluator);
        let mut source = fixture();
        // NOT (NOT (id = 1)) eliminates to id = 1, so row id=1 still satisfies scope.
        let scope_filter = Expr::column("id").eq(Expr::integer(1)).not().not();
        let scope = MutablePartialQuery::new(&TableRef::table("t"), Some(scope_filter)).unwrap();
        let row = Row::new().with("id", Value::Int(1));
        planner.insert(&mut source, &scope, row, None).unwrap();
        assert_eq!(source.count().unwrap(), 3);
    }
}
