//! Guard for statements submitted by users or generated by the model.

use crate::error::{Error, Result};

const READ_ONLY_PREFIXES: [&str; 3] = ["select", "show", "describe"];

/// Returns `true` if the trimmed statement starts with `select`, `show` or
/// `describe`, ignoring case.
#[must_use]
pub fn is_read_only(sql: &str) -> bool {
    let lowered = sql.trim().to_lowercase();
    READ_ONLY_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// Reject anything [`is_read_only`] does not accept.
///
/// # Errors
///
/// Returns [`Error::Validation`] for empty or non read-only statements.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(Error::Validation("SQL query is required".to_string()));
    }
    if !is_read_only(sql) {
        return Err(Error::Validation(
            "Only read-only queries are permitted".to_string(),
        ));
    }
    Ok(())
}
