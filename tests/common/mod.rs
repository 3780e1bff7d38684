#![allow(dead_code)]

//! The three-table fixture shared by the end-to-end scenario tests.

use chrono::NaiveDateTime;

use oxide_fedsql::ast::TableRef;
use oxide_fedsql::clock::FixedClock;
use oxide_fedsql::registry::TableRegistry;
use oxide_fedsql::row::Row;
use oxide_fedsql::source::{ColumnInfo, IndexKind, MemoryTableSource};
use oxide_fedsql::value::Value;

pub fn clock() -> FixedClock {
    FixedClock(NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap())
}

fn col(name: &str, declared_type: &str, index_kind: IndexKind) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        declared_type: declared_type.to_string(),
        nullable: true,
        index_kind,
    }
}

/// Builds the shared end-to-end fixture registry:
/// `products(id, name, price, stock, category)`,
/// `users(id, name, active)`, `orders(id, user_id, total)`.
pub fn registry() -> TableRegistry {
    let mut registry = TableRegistry::new();

    registry.register(
        "products",
        Box::new(
            MemoryTableSource::new(vec![
                col("id", "INTEGER", IndexKind::Unique),
                col("name", "TEXT", IndexKind::None),
                col("price", "FLOAT", IndexKind::None),
                col("stock", "INTEGER", IndexKind::None),
                col("category", "TEXT", IndexKind::None),
            ])
            .with_rows([
                Row::new()
                    .with("id", Value::Int(1))
                    .with("name", Value::Text("Widget".into()))
                    .with("price", Value::Float(9.99))
                    .with("stock", Value::Int(100))
                    .with("category", Value::Text("gadgets".into())),
                Row::new()
                    .with("id", Value::Int(2))
                    .with("name", Value::Text("Gizmo".into()))
                    .with("price", Value::Float(19.99))
                    .with("stock", Value::Int(0))
                    .with("category", Value::Text("gadgets".into())),
                Row::new()
                    .with("id", Value::Int(3))
                    .with("name", Value::Text("Thing".into()))
                    .with("price", Value::Null)
                    .with("stock", Value::Int(5))
                    .with("category", Value::Text("tools".into())),
            ]),
        ),
    );

    registry.register(
        "users",
        Box::new(
            MemoryTableSource::new(vec![
                col("id", "INTEGER", IndexKind::Unique),
                col("name", "TEXT", IndexKind::None),
                col("active", "INTEGER", IndexKind::None),
            ])
            .with_rows([
                Row::new().with("id", Value::Int(1)).with("name", Value::Text("Ada".into())).with("active", Value::Int(1)),
                Row::new().with("id", Value::Int(2)).with("name", Value::Text("Bo".into())).with("active", Value::Int(0)),
                Row::new().with("id", Value::Int(3)).with("name", Value::Text("Cy".into())).with("active", Value::Int(1)),
            ]),
        ),
    );

    registry.register(
        "orders",
        Box::new(
            MemoryTableSource::new(vec![
                col("id", "INTEGER", IndexKind::Unique),
                col("user_id", "INTEGER", IndexKind::None),
                col("total", "FLOAT", IndexKind::None),
            ])
            .with_rows([
                Row::new().with("id", Value::Int(10)).with("user_id", Value::Int(1)).with("total", Value::Float(50.0)),
                Row::new().with("id", Value::Int(11)).with("user_id", Value::Int(1)).with("total", Value::Float(20.0)),
                Row::new().with("id", Value::Int(12)).with("user_id", Value::Int(3)).with("total", Value::Float(99.5)),
            ]),
        ),
    );

    registry
}

pub fn table(name: &str) -> TableRef {
    TableRef::table(name)
}
