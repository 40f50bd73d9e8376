//! Size-bounded prompt context.

use super::ContextPolicy;
use crate::domain::Schema;
use indexmap::IndexMap;

/// Database → table → `"Primary keys: a, b"` or `"No primary keys"`.
pub type KeySummary = IndexMap<String, IndexMap<String, String>>;

/// Length of the compact JSON rendering of `schema`.
#[must_use]
pub fn serialized_len(schema: &Schema) -> usize {
    serde_json::to_string(schema).map_or(0, |json| json.len())
}

/// Fit `schema` into the prompt budget.
///
/// When `selected_database` is present in the schema, only that database is
/// returned, with full column detail. Otherwise every column is cut down to
/// `Field`, `Type`, `Key` and `References`; if the result still serializes
/// to more than [`ContextPolicy::size_threshold`] bytes, databases with more
/// than [`ContextPolicy::large_database_tables`] tables also lose `Type`.
/// References always survive.
#[must_use]
pub fn limit_context(
    schema: &Schema,
    selected_database: Option<&str>,
    policy: &ContextPolicy,
) -> Schema {
    if let Some((database, tables)) =
        selected_database.and_then(|name| schema.database(name).map(|tables| (name, tables)))
    {
        let mut focused = Schema::new();
        focused.insert_database(database, tables.clone());
        return focused;
    }

    let mut limited: Schema = schema
        .iter()
        .map(|(database, tables)| {
            let tables = tables
                .iter()
                .map(|(table, columns)| {
                    (table.clone(), columns.iter().map(|c| c.essentials()).collect())
                })
                .collect();
            (database.clone(), tables)
        })
        .collect();

    let size = serialized_len(&limited);
    if size > policy.size_threshold {
        tracing::info!(
            size,
            threshold = policy.size_threshold,
            "Schema context too large, dropping column types in large databases"
        );
        for (_, tables) in limited.iter_mut() {
            if tables.len() <= policy.large_database_tables {
                continue;
            }
            for column in tables.values_mut().flatten() {
                column.data_type = None;
            }
        }
    }

    limited
}

/// Primary key columns of every table, as used for the reduced retry prompt.
#[must_use]
pub fn primary_key_summary(schema: &Schema) -> KeySummary {
    schema
        .iter()
        .map(|(database, tables)| {
            let summary = tables
                .iter()
                .map(|(table, columns)| {
                    let keys: Vec<&str> = columns
                        .iter()
                        .filter(|c| c.is_primary_key())
                        .map(|c| c.name.as_str())
                        .collect();
                    let text = if keys.is_empty() {
                        "No primary keys".to_string()
                    } else {
                        format!("Primary keys: {}", keys.join(", "))
                    };
                    (table.clone(), text)
                })
                .collect();
            (database.clone(), summary)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, ColumnRef, KeyKind, Reference};

    fn detailed_column(name: &str) -> Column {
        let mut column = Column::new(name)
            .with_type("varchar(255)")
            .with_key(KeyKind::None);
        column.extra.insert("Null".into(), "YES".into());
        column.extra.insert("Extra".into(), "".into());
        column
    }

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.ensure_table("shop", "orders").extend([
            Column::new("id").with_type("int").with_key(KeyKind::Primary),
            detailed_column("customer_id")
                .with_reference(Reference::new(&ColumnRef::new("shop", "customers", "id"))),
        ]);
        schema.ensure_table("crm", "contacts").push(detailed_column("email"));
        schema
    }

    #[test]
    fn test_selected_database_keeps_full_detail() {
        let limited = limit_context(&schema(), Some("crm"), &ContextPolicy::default());
        assert_eq!(limited.len(), 1);
        let email = limited.column("crm", "contacts", "email").unwrap();
        assert_eq!(email.extra.len(), 2);
    }

    #[test]
    fn test_unknown_selection_projects_all_databases() {
        let limited = limit_context(&schema(), Some("nope"), &ContextPolicy::default());
        assert_eq!(limited.len(), 2);
        let column = limited.column("shop", "orders", "customer_id").unwrap();
        assert!(column.extra.is_empty());
        assert_eq!(column.data_type.as_deref(), Some("varchar(255)"));
        assert_eq!(column.references().len(), 1);
    }

    #[test]
    fn test_oversized_context_drops_types_only_in_large_databases() {
        let mut schema = schema();
        let orders_id = ColumnRef::new("shop", "orders", "id");
        for i in 0..20 {
            schema
                .ensure_table("warehouse", &format!("table_{i}"))
                .push(detailed_column("sku").with_reference(Reference::new(&orders_id)));
        }
        let policy = ContextPolicy {
            size_threshold: 100,
            large_database_tables: 15,
            sample_tables: 3,
        };

        let limited = limit_context(&schema, None, &policy);

        let sku = limited.column("warehouse", "table_7", "sku").unwrap();
        assert!(sku.data_type.is_none());
        assert_eq!(sku.key, Some(KeyKind::None));
        assert_eq!(sku.references().len(), 1);

        let id = limited.column("shop", "orders", "id").unwrap();
        assert_eq!(id.data_type.as_deref(), Some("int"));
    }

    #[test]
    fn test_primary_key_summary() {
        let mut schema = schema();
        schema
            .ensure_table("shop", "order_items")
            .extend([
                Column::new("order_id").with_key(KeyKind::Primary),
                Column::new("line").with_key(KeyKind::Primary),
            ]);

        let summary = primary_key_summary(&schema);
        assert_eq!(summary["shop"]["orders"], "Primary keys: id");
        assert_eq!(summary["shop"]["order_items"], "Primary keys: order_id, line");
        assert_eq!(summary["crm"]["contacts"], "No primary keys");
    }
}
