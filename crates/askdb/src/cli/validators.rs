//! CLI input validation functions.
//!
//! Used by clap's `value_parser` attribute so bad input is rejected at parse
//! time, before any workspace or database is touched.

use crate::domain::ColumnRef;

/// Validate a `database.table.column` address.
pub fn validate_column_ref(s: &str) -> Result<ColumnRef, String> {
    ColumnRef::parse(s).ok_or_else(|| {
        format!("Invalid column address: '{}'. Expected format: database.table.column", s.trim())
    })
}

/// Validate a database or table name.
///
/// Names cannot be empty, contain whitespace, or contain backticks.
pub fn validate_identifier(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Name cannot be empty".to_string());
    }

    if s.chars().any(char::is_whitespace) {
        return Err(format!("Name cannot contain whitespace: '{s}'"));
    }

    if s.contains('`') {
        return Err(format!("Name cannot contain backticks: '{s}'"));
    }

    Ok(s.to_string())
}

/// Validate free text such as a question or a SQL statement.
pub fn validate_text(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Text cannot be empty".to_string());
    }
    Ok(s.to_string())
}

/// Validate a relationship type label such as `MANY_TO_ONE`.
pub fn validate_relationship_type(s: &str) -> Result<String, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Relationship type cannot be empty".to_string());
    }

    if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!(
            "Relationship type must contain only letters, digits and underscores: '{s}'"
        ));
    }

    Ok(s.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_validate_column_ref() {
        let parsed = validate_column_ref(" shop.orders.customer_id ").unwrap();
        assert_eq!(parsed, ColumnRef::new("shop", "orders", "customer_id"));
    }

    #[rstest]
    #[case::two_parts("shop.orders")]
    #[case::four_parts("a.b.c.d")]
    #[case::empty_part("shop..id")]
    #[case::empty("")]
    fn test_validate_column_ref_invalid(#[case] input: &str) {
        let err = validate_column_ref(input).unwrap_err();
        assert!(err.contains("database.table.column"));
    }

    #[rstest]
    #[case::plain("shop", Ok("shop"))]
    #[case::trimmed("  shop_db ", Ok("shop_db"))]
    #[case::empty("", Err("empty"))]
    #[case::whitespace("my shop", Err("whitespace"))]
    #[case::backtick("sh`op", Err("backticks"))]
    fn test_validate_identifier(#[case] input: &str, #[case] expected: Result<&str, &str>) {
        match (validate_identifier(input), expected) {
            (Ok(name), Ok(want)) => assert_eq!(name, want),
            (Err(err), Err(fragment)) => assert!(err.contains(fragment), "got: {err}"),
            (got, want) => panic!("expected {want:?}, got {got:?}"),
        }
    }

    #[test]
    fn test_validate_text() {
        assert_eq!(validate_text("  how many orders? ").unwrap(), "how many orders?");
        assert!(validate_text("   ").is_err());
    }

    #[rstest]
    #[case::upper("ONE_TO_ONE", "ONE_TO_ONE")]
    #[case::lower("many_to_many", "MANY_TO_MANY")]
    fn test_validate_relationship_type(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate_relationship_type(input).unwrap(), expected);
    }

    #[test]
    fn test_validate_relationship_type_rejects_symbols() {
        assert!(validate_relationship_type("one-to-one").is_err());
    }
}
