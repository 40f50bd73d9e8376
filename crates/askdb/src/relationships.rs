//! Cross-table references layered on top of column metadata.
//!
//! Servers do not report these edges, so they only ever come from the cache
//! snapshot, a portable schema file or explicit edits made here. Edges are
//! one-way: adding `a -> b` never creates `b -> a`.

use crate::domain::{
    Column, ColumnRef, Reference, RelationshipEdge, Schema, DEFAULT_RELATIONSHIP_TYPE,
};
use crate::error::{Error, Result};

/// Whether [`add_reference`] created a new edge or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceChange {
    /// A new edge was appended.
    Added,
    /// An edge to the same target already existed; its type was overwritten.
    Updated,
}

/// Column at `address`, appending a bare `{name}` column (and any missing
/// database and table entries) if it is not there yet.
fn column_entry<'a>(schema: &'a mut Schema, address: &ColumnRef) -> &'a mut Column {
    let columns = schema.ensure_table(&address.database, &address.table);
    let index = match columns.iter().position(|c| c.name == address.column) {
        Some(index) => index,
        None => {
            columns.push(Column::new(&address.column));
            columns.len() - 1
        }
    };
    &mut columns[index]
}

/// Add or update the edge `source -> target`.
///
/// Missing source entries are created. A target that is not in the schema
/// is stubbed as a column carrying only its name, so every edge points at
/// something that exists. Edges are keyed by target: adding the same target
/// twice updates the relationship type in place.
pub fn add_reference(
    schema: &mut Schema,
    source: &ColumnRef,
    target: &ColumnRef,
    relationship_type: Option<&str>,
) -> ReferenceChange {
    column_entry(schema, source);

    if schema
        .column(&target.database, &target.table, &target.column)
        .is_none()
    {
        tracing::debug!(target = %target, "Creating placeholder for reference target");
        column_entry(schema, target);
    }

    let relationship_type = relationship_type.unwrap_or(DEFAULT_RELATIONSHIP_TYPE);
    let references = column_entry(schema, source)
        .references
        .get_or_insert_with(Vec::new);

    if let Some(existing) = references.iter_mut().find(|r| r.points_to(target)) {
        existing.relationship_type = relationship_type.to_string();
        ReferenceChange::Updated
    } else {
        references.push(Reference::new(target).with_type(relationship_type));
        ReferenceChange::Added
    }
}

/// Remove the edge `source -> target`.
///
/// A column left without references has its reference list cleared
/// entirely rather than kept as an empty list.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the source table, the source column or the
/// edge itself does not exist.
pub fn remove_reference(schema: &mut Schema, source: &ColumnRef, target: &ColumnRef) -> Result<()> {
    let columns = schema
        .table_mut(&source.database, &source.table)
        .ok_or_else(|| {
            Error::NotFound(format!("Table {}.{} not found", source.database, source.table))
        })?;

    let column = columns
        .iter_mut()
        .find(|c| c.name == source.column)
        .ok_or_else(|| Error::NotFound(format!("Column {source} not found")))?;

    let references = column.references.as_mut().ok_or_else(|| edge_not_found(source, target))?;
    let before = references.len();
    references.retain(|r| !r.points_to(target));
    if references.len() == before {
        return Err(edge_not_found(source, target));
    }

    if references.is_empty() {
        column.references = None;
    }
    Ok(())
}

fn edge_not_found(source: &ColumnRef, target: &ColumnRef) -> Error {
    Error::NotFound(format!("Relationship {source} -> {target} not found"))
}

/// Every edge in the schema, in database, table, column, then reference order.
#[must_use]
pub fn list_references(schema: &Schema) -> Vec<RelationshipEdge> {
    let mut edges = Vec::new();
    for (database, tables) in schema {
        for (table, columns) in tables {
            for column in columns {
                let source = ColumnRef::new(database, table, &column.name);
                for reference in column.references() {
                    edges.push(RelationshipEdge::new(
                        &source,
                        &reference.target(),
                        Some(&reference.relationship_type),
                    ));
                }
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KeyKind;

    fn shop() -> Schema {
        let mut schema = Schema::new();
        schema.ensure_table("shop", "orders").extend([
            Column::new("id").with_key(KeyKind::Primary),
            Column::new("customer_id").with_key(KeyKind::Foreign),
        ]);
        schema
            .ensure_table("shop", "customers")
            .push(Column::new("id").with_key(KeyKind::Primary));
        schema
    }

    fn orders_customer() -> ColumnRef {
        ColumnRef::new("shop", "orders", "customer_id")
    }

    fn customers_id() -> ColumnRef {
        ColumnRef::new("shop", "customers", "id")
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut schema = shop();
        assert_eq!(
            add_reference(&mut schema, &orders_customer(), &customers_id(), None),
            ReferenceChange::Added
        );
        assert_eq!(
            add_reference(&mut schema, &orders_customer(), &customers_id(), None),
            ReferenceChange::Updated
        );
        assert_eq!(list_references(&schema).len(), 1);
    }

    #[test]
    fn test_add_updates_type_in_place() {
        let mut schema = shop();
        add_reference(&mut schema, &orders_customer(), &customers_id(), None);
        add_reference(&mut schema, &orders_customer(), &customers_id(), Some("ONE_TO_ONE"));

        let refs = schema.column("shop", "orders", "customer_id").unwrap().references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].relationship_type, "ONE_TO_ONE");
    }

    #[test]
    fn test_add_stubs_unknown_target_table() {
        let mut schema = shop();
        let target = ColumnRef::new("crm", "contacts", "contact_id");
        add_reference(&mut schema, &orders_customer(), &target, None);

        let contacts = schema.table("crm", "contacts").unwrap();
        assert_eq!(contacts, &[Column::new("contact_id")]);
    }

    #[test]
    fn test_add_creates_missing_source() {
        let mut schema = Schema::new();
        let source = ColumnRef::new("hr", "staff", "manager_id");
        let target = ColumnRef::new("hr", "staff", "id");
        add_reference(&mut schema, &source, &target, None);

        let staff = schema.table("hr", "staff").unwrap();
        let names: Vec<&str> = staff.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["manager_id", "id"]);
        assert_eq!(staff[0].references().len(), 1);
        assert!(staff[1].references.is_none());
    }

    #[test]
    fn test_reverse_edge_not_created() {
        let mut schema = shop();
        add_reference(&mut schema, &orders_customer(), &customers_id(), None);
        assert!(schema.column("shop", "customers", "id").unwrap().references.is_none());
    }

    #[test]
    fn test_remove_last_reference_clears_attribute() {
        let mut schema = shop();
        add_reference(&mut schema, &orders_customer(), &customers_id(), None);
        remove_reference(&mut schema, &orders_customer(), &customers_id()).unwrap();

        let column = schema.column("shop", "orders", "customer_id").unwrap();
        assert!(column.references.is_none());
        let json = serde_json::to_string(column).unwrap();
        assert!(!json.contains("References"));
    }

    #[test]
    fn test_remove_keeps_other_references() {
        let mut schema = shop();
        let other = ColumnRef::new("crm", "contacts", "id");
        add_reference(&mut schema, &orders_customer(), &customers_id(), None);
        add_reference(&mut schema, &orders_customer(), &other, None);
        remove_reference(&mut schema, &orders_customer(), &customers_id()).unwrap();

        let refs = schema.column("shop", "orders", "customer_id").unwrap().references();
        assert_eq!(refs.len(), 1);
        assert!(refs[0].points_to(&other));
    }

    #[test]
    fn test_remove_reports_what_is_missing() {
        let mut schema = shop();

        let missing_table = ColumnRef::new("shop", "nope", "x");
        let err = remove_reference(&mut schema, &missing_table, &customers_id()).unwrap_err();
        assert_eq!(err.to_string(), "Not found: Table shop.nope not found");

        let missing_column = ColumnRef::new("shop", "orders", "x");
        let err = remove_reference(&mut schema, &missing_column, &customers_id()).unwrap_err();
        assert_eq!(err.to_string(), "Not found: Column shop.orders.x not found");

        let err = remove_reference(&mut schema, &orders_customer(), &customers_id()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_list_follows_schema_order() {
        let mut schema = shop();
        add_reference(
            &mut schema,
            &ColumnRef::new("shop", "customers", "id"),
            &ColumnRef::new("crm", "contacts", "id"),
            Some("ONE_TO_ONE"),
        );
        add_reference(&mut schema, &orders_customer(), &customers_id(), None);

        let edges: Vec<String> = list_references(&schema).iter().map(ToString::to_string).collect();
        assert_eq!(
            edges,
            vec![
                "shop.orders.customer_id -> shop.customers.id (MANY_TO_ONE)",
                "shop.customers.id -> crm.contacts.id (ONE_TO_ONE)",
            ]
        );
    }
}
