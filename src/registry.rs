//! The table registry: maps logical table names to the [`TableSource`]
//! backing them.
//!
//! Reads hand out a per-statement materialised snapshot (`source_for`),
//! matching §5's "non-restartable sources must be materialised before
//! multiple passes" and sidestepping the need to thread ownership of the
//! live backing source through the executor — a self-join simply calls
//! `source_for` twice and gets two independent copies. Writes go through
//! [`TableRegistry::get_mut`], which borrows the real, persistent source.

use std::collections::HashMap;

use crate::error::{FedSqlError, Result};
use crate::source::{MemoryTableSource, TableSource};

/// Maps logical table names to their backing [`TableSource`].
#[derive(Debug, Default)]
pub struct TableRegistry {
    sources: HashMap<String, Box<dyn TableSource>>,
}

impl TableRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Registers `source` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, source: Box<dyn TableSource>) {
        self.sources.insert(name.into(), source);
    }

    /// Returns a materialised, independently-owned snapshot of the named
    /// source's current rows and column descriptors — safe to filter,
    /// iterate multiple times, or use twice in the same statement (a
    /// self-join).
    pub fn source_for(&self, name: &str) -> Result<Box<dyn TableSource>> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| FedSqlError::UnknownIdentifier(name.to_string()))?;
        let snapshot = MemoryTableSource::new(source.columns().to_vec()).with_rows(source.iterate()?);
        Ok(Box::new(snapshot))
    }

    /// Borrows the real, persistent source for a mutation.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut dyn TableSource> {
        self.sources
            .get_mut(name)
            .map(Box::as_mut)
            .ok_or_else(|| FedSqlError::UnknownIdentifier(name.to_string()))
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use crate::source::{ColumnInfo, IndexKind};
    use crate::value::Value;

    fn fixture() -> Box<dyn TableSource> {
        Box::new(
            MemoryTableSource::new(vec![ColumnInfo {
                name: "id".into(),
                declared_type: "INTEGER".into(),
                nullable: false,
                index_kind: IndexKind::Unique,
            }])
            .with_row(Row::new().with("id", Value::Int(1))),
        )
    }

    #[test]
    fn source_for_unknown_table_errors() {
        let registry = TableRegistry::new();
        assert!(registry.source_for("missing").is_err());
    }

    #[test]
    fn source_for_returns_independent_snapshots() {
        let mut registry = TableRegistry::new();
        registry.register("t", fixture());
        let a = registry.source_for("t").unwrap();
        let b = registry.source_for("t").unwrap();
        assert_eq!(a.count().unwrap(), 1);
        assert_eq!(b.count().unwrap(), 1);
    }

    #[test]
    fn get_mut_mutates_the_persistent_source() {
        let mut registry = TableRegistry::new();
        registry.register("t", fixture());
        registry.get_mut("t").unwrap().insert(Row::new().with("id", Value::Int(2))).unwrap();
        assert_eq!(registry.source_for("t").unwrap().count().unwrap(), 2);
    }
}
