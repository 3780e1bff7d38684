//! Dialect-specific surface concerns: identifier quoting and the upsert
//! form a [`crate::write::WritePlanner`] resolves an `ON CONFLICT` clause
//! to. The core never serialises full passthrough SQL itself — this module
//! only decides *which form* applies and hands back a description.

mod generic;

pub use generic::UpsertForm;

/// A backing SQL dialect tag, carried alongside the AST and table
/// registry (§6). Affects only identifier quoting and upsert-form
/// selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// MySQL / MariaDB.
    MySql,
    /// PostgreSQL.
    Postgres,
    /// SQLite.
    Sqlite,
    /// Microsoft SQL Server.
    SqlServer,
    /// Oracle.
    Oracle,
    /// No specific backing SQL dialect; ANSI-ish defaults.
    Generic,
    /// A non-SQL virtual table source (CSV, in-memory, etc.) — quoting
    /// still follows the generic convention for any passthrough diagnostics.
    Virtual,
}

impl Dialect {
    /// The character used to open an identifier quote.
    #[must_use]
    pub const fn identifier_quote(self) -> char {
        match self {
            Self::MySql => '`',
            Self::SqlServer => '[',
            Self::Postgres | Self::Sqlite | Self::Oracle | Self::Generic | Self::Virtual => '"',
        }
    }

    const fn closing_quote(self) -> char {
        match self {
            Self::SqlServer => ']',
            other => other.identifier_quote(),
        }
    }

    /// Quotes a single identifier segment, doubling any embedded closing
    /// quote character to escape it.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        let open = self.identifier_quote();
        let close = self.closing_quote();
        let escaped = name.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// Quotes a dotted path (`schema.table.column`), quoting each segment
    /// independently and rejoining with `.`.
    #[must_use]
    pub fn quote_path(self, segments: &[&str]) -> String {
        segments
            .iter()
            .map(|s| self.quote_identifier(s))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Resolves which upsert surface form this dialect uses for an
    /// insert-or-update against `conflict_columns`, given the columns that
    /// would be updated on conflict (`update_columns`). `update_columns`
    /// empty (every column is part of the conflict key) selects the
    /// "do nothing" variant on dialects that distinguish it.
    #[must_use]
    pub fn upsert_form(self, conflict_columns: &[String], update_columns: &[String]) -> UpsertForm {
        match self {
            Self::MySql => UpsertForm::OnDuplicateKeyUpdate {
                update_columns: update_columns.to_vec(),
            },
            Self::Postgres | Self::Sqlite | Self::Generic | Self::Virtual => {
                if update_columns.is_empty() {
                    UpsertForm::OnConflictDoNothing {
                        conflict_columns: conflict_columns.to_vec(),
                    }
                } else {
                    UpsertForm::OnConflictDoUpdate {
                        conflict_columns: conflict_columns.to_vec(),
                        update_columns: update_columns.to_vec(),
                    }
                }
            }
            Self::SqlServer | Self::Oracle => UpsertForm::Merge {
                conflict_columns: conflict_columns.to_vec(),
                update_columns: update_columns.to_vec(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_quotes_with_backtick() {
        assert_eq!(Dialect::MySql.quote_identifier("order"), "`order`");
    }

    #[test]
    fn sql_server_quotes_with_brackets() {
        assert_eq!(Dialect::SqlServer.quote_identifier("order"), "[order]");
    }

    #[test]
    fn postgres_quotes_with_double_quote_and_escapes_embedded_quote() {
        assert_eq!(Dialect::Postgres.quote_identifier(r#"a"b"#), r#""a""b""#);
    }

    #[test]
    fn quote_path_quotes_each_segment() {
        assert_eq!(Dialect::Generic.quote_path(&["s", "t", "c"]), "\"s\".\"t\".\"c\"");
    }

    #[test]
    fn mysql_ignores_conflict_columns_in_upsert_form() {
        let form = Dialect::MySql.upsert_form(&["id".into()], &["name".into()]);
        assert!(matches!(form, UpsertForm::OnDuplicateKeyUpdate { .. }));
    }

    #[test]
    fn postgres_does_nothing_when_every_column_is_a_conflict_column() {
        let form = Dialect::Postgres.upsert_form(&["id".into()], &[]);
        assert!(matches!(form, UpsertForm::OnConflictDoNothing { .. }));
    }

    #[test]
    fn postgres_does_update_when_non_conflict_columns_remain() {
        let form = Dialect::Postgres.upsert_form(&["id".into()], &["name".into()]);
        assert!(matches!(form, UpsertForm::OnConflictDoUpdate { .. }));
    }

    #[test]
    fn sql_server_and_oracle_use_merge() {
        assert!(matches!(
            Dialect::SqlServer.upsert_form(&["id".into()], &["name".into()]),
            UpsertForm::Merge { .. }
        ));
        assert!(matches!(
            Dialect::Oracle.upsert_form(&["id".into()], &["name".into()]),
            UpsertForm::Merge { .. }
        ));
    }
}
