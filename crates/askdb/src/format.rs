//! Compact, human-editable schema notation.
//!
//! One line per table, a blank line between databases, `#` or `//` starting
//! a comment line:
//!
//! ```text
//! shop.orders: id(int,PK), customer_id(int,FK,REF=shop.customers.id), note
//! shop.customers: id(int,PK), email(varchar(255))
//! ```
//!
//! Each column is a name optionally followed by a parenthesized attribute
//! list. Attributes are matched in this order:
//!
//! 1. `PK` / `PRIMARY` sets the key to primary
//! 2. `FK` / `FOREIGN` sets the key to foreign
//! 3. `key=value`: `REF=db.table.column` becomes a [`Reference`], anything
//!    else is kept as an extra attribute
//! 4. anything else is the column type; if several are given the last wins
//!
//! Decoding never fails. Lines that do not look like `database.table: columns`
//! are skipped, and a column whose attribute group is malformed keeps its
//! name but loses its attributes.

use crate::domain::{Column, ColumnRef, KeyKind, Reference, Schema};
use std::fmt::Write;

/// Decode compact notation into a schema.
#[must_use]
pub fn decode(text: &str) -> Schema {
    let mut schema = Schema::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let Some((database, table, columns_text)) = split_table_line(line) else {
            tracing::debug!(
                line_number = index + 1,
                "Skipping line without 'database.table:' prefix"
            );
            continue;
        };

        let mut columns: Vec<Column> = Vec::new();
        for token in split_top_level(columns_text) {
            let Some(column) = parse_column(token) else {
                continue;
            };
            match columns.iter_mut().find(|c| c.name == column.name) {
                Some(existing) => *existing = column,
                None => columns.push(column),
            }
        }

        *schema.ensure_table(database, table) = columns;
    }

    schema
}

/// Encode a schema into compact notation.
///
/// Emits any non-`PK`/`FK` key value verbatim, then the type, then `PK` or
/// `FK`, then one `REF=` per reference. Extra attributes are not written.
///
/// A verbatim key value such as `UNI` does not survive decoding as a key,
/// but the column type does.
#[must_use]
pub fn encode(schema: &Schema) -> String {
    let mut out = String::new();

    for (index, (database, tables)) in schema.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        for (table, columns) in tables {
            let rendered: Vec<String> = columns.iter().map(encode_column).collect();
            // Writing into a String cannot fail.
            let _ = writeln!(out, "{database}.{table}: {}", rendered.join(", "));
        }
    }

    out
}

fn encode_column(column: &Column) -> String {
    let mut attributes: Vec<String> = Vec::new();

    // An unrecognized key tag decodes as a type, so it must precede the real one.
    if let Some(KeyKind::Other(raw)) = &column.key {
        if !raw.is_empty() {
            attributes.push(raw.clone());
        }
    }

    if let Some(data_type) = &column.data_type {
        attributes.push(data_type.clone());
    }

    match &column.key {
        Some(KeyKind::Primary) => attributes.push("PK".to_string()),
        Some(KeyKind::Foreign) => attributes.push("FK".to_string()),
        Some(KeyKind::None | KeyKind::Other(_)) | None => {}
    }

    for reference in column.references() {
        attributes.push(format!("REF={}", reference.target()));
    }

    if attributes.is_empty() {
        column.name.clone()
    } else {
        format!("{}({})", column.name, attributes.join(","))
    }
}

/// Split `database.table: columns` into its three parts.
fn split_table_line(line: &str) -> Option<(&str, &str, &str)> {
    let (database, rest) = line.split_once('.')?;
    let (table, columns) = rest.split_once(':')?;

    let database = database.trim();
    let table = table.trim();
    let columns = columns.trim();

    if database.is_empty() || table.is_empty() || columns.is_empty() {
        return None;
    }
    Some((database, table, columns))
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;

    for (index, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());

    parts.into_iter().filter(|part| !part.is_empty()).collect()
}

/// Returns `true` if every `(` in `text` is closed and no `)` is unmatched.
fn is_balanced(text: &str) -> bool {
    let mut depth: i32 = 0;
    for ch in text.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

fn parse_column(token: &str) -> Option<Column> {
    let Some(open) = token.find('(') else {
        let name = token.trim();
        return (!name.is_empty()).then(|| Column::new(name));
    };

    let name = token[..open].trim();
    if name.is_empty() {
        return None;
    }
    let mut column = Column::new(name);

    let group = &token[open..];
    if !group.ends_with(')') || !is_balanced(group) {
        tracing::debug!(column = name, group, "Dropping malformed attribute group");
        return Some(column);
    }

    let inner = &group[1..group.len() - 1];
    for attribute in split_top_level(inner) {
        apply_attribute(&mut column, attribute);
    }

    Some(column)
}

fn apply_attribute(column: &mut Column, attribute: &str) {
    let upper = attribute.to_ascii_uppercase();

    if upper == "PK" || upper == "PRIMARY" {
        column.key = Some(KeyKind::Primary);
    } else if upper == "FK" || upper == "FOREIGN" {
        column.key = Some(KeyKind::Foreign);
    } else if let Some((key, value)) = attribute.split_once('=') {
        let key = key.trim();
        let value = value.trim();
        if key.eq_ignore_ascii_case("REF") {
            match ColumnRef::parse(value) {
                Some(target) => {
                    let references = column.references.get_or_insert_with(Vec::new);
                    if !references.iter().any(|r| r.points_to(&target)) {
                        references.push(Reference::new(&target));
                    }
                }
                None => {
                    tracing::debug!(
                        column = %column.name,
                        value,
                        "Skipping malformed REF attribute"
                    );
                }
            }
        } else if !key.is_empty() {
            column
                .extra
                .insert(key.to_string(), serde_json::Value::String(value.to_string()));
        }
    } else {
        column.data_type = Some(attribute.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_decode_basic_line() {
        let schema =
            decode("shop.orders: id(int,PK), customer_id(int,FK,REF=shop.customers.id), note");
        let columns = schema.table("shop", "orders").unwrap();

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].data_type.as_deref(), Some("int"));
        assert_eq!(columns[0].key, Some(KeyKind::Primary));

        assert_eq!(columns[1].key, Some(KeyKind::Foreign));
        let refs = columns[1].references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target(), ColumnRef::new("shop", "customers", "id"));
        assert_eq!(refs[0].relationship_type, "MANY_TO_ONE");

        assert_eq!(columns[2], Column::new("note"));
    }

    #[test]
    fn test_decode_skips_comments_and_bad_lines() {
        let text = "\
# exported schema
// another comment
not a table line
shop.orders: id

crm.contacts: email(varchar(255))
";
        let schema = decode(text);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.table_count(), 2);
        assert_eq!(
            schema.column("crm", "contacts", "email").unwrap().data_type.as_deref(),
            Some("varchar(255)")
        );
    }

    #[test]
    fn test_decode_nested_type_with_commas() {
        let schema = decode("shop.products: price(decimal(10,2),FK), state(enum('a','b'))");
        let columns = schema.table("shop", "products").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].data_type.as_deref(), Some("decimal(10,2)"));
        assert_eq!(columns[0].key, Some(KeyKind::Foreign));
        assert_eq!(columns[1].data_type.as_deref(), Some("enum('a','b')"));
    }

    #[test]
    fn test_decode_last_type_wins() {
        let schema = decode("shop.orders: id(int,bigint)");
        let column = schema.column("shop", "orders", "id").unwrap();
        assert_eq!(column.data_type.as_deref(), Some("bigint"));
    }

    #[rstest]
    #[case("id(pk)", KeyKind::Primary)]
    #[case("id(PRIMARY)", KeyKind::Primary)]
    #[case("id(fk)", KeyKind::Foreign)]
    #[case("id(Foreign)", KeyKind::Foreign)]
    fn test_decode_key_tags_case_insensitive(#[case] token: &str, #[case] expected: KeyKind) {
        let schema = decode(&format!("db.t: {token}"));
        assert_eq!(schema.column("db", "t", "id").unwrap().key, Some(expected));
    }

    #[test]
    fn test_decode_malformed_group_keeps_column() {
        let schema = decode("shop.orders: id(int,PK, total(decimal), status");
        let columns = schema.table("shop", "orders").unwrap();
        // Unbalanced group swallows the rest of the line into one token.
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0], Column::new("id"));

        let schema = decode("shop.orders: id(int)), total(decimal)");
        let columns = schema.table("shop", "orders").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0], Column::new("id"));
        assert_eq!(columns[1].data_type.as_deref(), Some("decimal"));
    }

    #[test]
    fn test_decode_generic_and_bad_ref_attributes() {
        let schema = decode("shop.orders: customer_id(REF=shop.customers, note=legacy)");
        let column = schema.column("shop", "orders", "customer_id").unwrap();
        assert!(column.references.is_none());
        assert_eq!(column.extra["note"], "legacy");
    }

    #[test]
    fn test_decode_repeated_table_replaces_definition() {
        let schema = decode("shop.orders: id\nshop.orders: code, total");
        let names: Vec<&str> = schema
            .table("shop", "orders")
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["code", "total"]);
    }

    #[test]
    fn test_decode_duplicate_ref_kept_once() {
        let schema = decode("a.b: c(REF=x.y.z,REF=x.y.z)");
        assert_eq!(schema.column("a", "b", "c").unwrap().references().len(), 1);
    }

    #[test]
    fn test_encode_layout() {
        let mut schema = Schema::new();
        schema.ensure_table("shop", "orders").extend([
            Column::new("id").with_type("int").with_key(KeyKind::Primary),
            Column::new("customer_id")
                .with_type("int")
                .with_key(KeyKind::Foreign)
                .with_reference(Reference::new(&ColumnRef::new("shop", "customers", "id"))),
            Column::new("note").with_key(KeyKind::None),
        ]);
        schema.ensure_table("crm", "contacts").extend([
            Column::new("email").with_key(KeyKind::Other("UNI".into())),
            Column::new("handle")
                .with_type("varchar(64)")
                .with_key(KeyKind::Other("UNI".into())),
        ]);

        let text = encode(&schema);
        assert_eq!(
            text,
            "shop.orders: id(int,PK), customer_id(int,FK,REF=shop.customers.id), note\n\
             \n\
             crm.contacts: email(UNI), handle(UNI,varchar(64))\n"
        );
    }

    #[test]
    fn test_unique_key_does_not_replace_type() {
        let mut schema = Schema::new();
        schema.ensure_table("crm", "contacts").push(
            Column::new("email")
                .with_type("varchar(255)")
                .with_key(KeyKind::Other("UNI".into())),
        );

        let decoded = decode(&encode(&schema));
        let email = decoded.column("crm", "contacts", "email").unwrap();
        assert_eq!(email.data_type.as_deref(), Some("varchar(255)"));
        assert_eq!(email.key, None);
    }

    #[test]
    fn test_round_trip_preserves_keys_refs_and_types() {
        let text = "\
shop.orders: id(int unsigned,PK), customer_id(int,FK,REF=shop.customers.id,REF=crm.contacts.id)
shop.customers: id(int,PK), email(varchar(255)), joined_at(datetime)

crm.contacts: id(bigint,PK)
";
        let decoded = decode(text);
        let again = decode(&encode(&decoded));
        assert_eq!(decoded, again);
    }
}
