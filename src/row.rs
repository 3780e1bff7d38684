//! The row type flowing through evaluation and execution.

use std::collections::BTreeMap;

use crate::value::Value;

/// An ordered map from column name to value.
///
/// Composite rows produced by joins hold both qualified (`table.col`) and
/// unqualified (`col`) keys; on unqualified collisions the inner-most
/// (most recently joined) source wins, matching how [`crate::eval`]
/// resolves identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    /// An empty row.
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: BTreeMap::new(),
        }
    }

    /// Inserts or overwrites a column value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.columns.insert(name.into(), value);
    }

    /// Builder-style column insertion.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Looks up a column by its exact key as stored (`col` or
    /// `table.col`).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.columns.get(key)
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterates `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All keys whose unqualified segment (after the last `.`) equals
    /// `name` — used to expand `*`/`t.*` projections and to resolve
    /// unqualified identifiers against composite rows.
    #[must_use]
    pub fn keys_matching_unqualified(&self, name: &str) -> Vec<&str> {
        self.columns
            .keys()
            .filter(|k| k.as_str() == name || k.rsplit('.').next() == Some(name))
            .map(String::as_str)
            .collect()
    }

    /// Merges `other` into a new row, with `other`'s keys winning on
    /// unqualified collisions (it is the "inner-most" / most-recently
    /// joined side in a left-to-right join fold).
    #[must_use]
    pub fn joined_with(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (k, v) in &other.columns {
            merged.columns.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Row-equality per §4.4: same arity and every column either both
    /// `Null` or loosely equal. Used by `DISTINCT`, `GROUP BY`, set
    /// operations, and recursive CTE fixpoint detection.
    #[must_use]
    pub fn row_eq(&self, other: &Self) -> bool {
        if self.columns.len() != other.columns.len() {
            return false;
        }
        self.columns.iter().all(|(k, v)| match other.columns.get(k) {
            Some(ov) => v.loose_eq(ov),
            None => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_with_inner_wins_on_unqualified_collision() {
        let left = Row::new().with("id", Value::Int(1)).with("t1.id", Value::Int(1));
        let right = Row::new().with("id", Value::Int(2)).with("t2.id", Value::Int(2));
        let joined = left.joined_with(&right);
        assert_eq!(joined.get("id"), Some(&Value::Int(2)));
        assert_eq!(joined.get("t1.id"), Some(&Value::Int(1)));
        assert_eq!(joined.get("t2.id"), Some(&Value::Int(2)));
    }

    #[test]
    fn row_eq_treats_null_as_equal() {
        let a = Row::new().with("x", Value::Null);
        let b = Row::new().with("x", Value::Null);
        assert!(a.row_eq(&b));
    }

    #[test]
    fn row_eq_differs_on_arity() {
        let a = Row::new().with("x", Value::Int(1));
        let b = Row::new().with("x", Value::Int(1)).with("y", Value::Int(2));
        assert!(!a.row_eq(&b));
    }

    #[test]
    fn keys_matching_unqualified_finds_qualified_columns() {
        let row = Row::new().with("u.id", Value::Int(1)).with("o.id", Value::Int(2));
        let mut matches = row.keys_matching_unqualified("id");
        matches.sort_unstable();
        assert_eq!(matches, vec!["o.id", "u.id"]);
    }
}
