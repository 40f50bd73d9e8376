//! Working out which database a question or a statement is about.

use crate::domain::{is_system_database, Schema};

fn name_variants(name: &str) -> [Option<String>; 4] {
    let lower = name.to_lowercase();
    [
        Some(lower.clone()),
        Some(lower.replace('_', " ")),
        lower.strip_suffix("db").map(str::to_string),
        lower.strip_suffix("_db").map(str::to_string),
    ]
}

/// First database whose name appears in `question`.
///
/// Besides the plain name, `sales_data` also matches `sales data`, `shopdb`
/// matches `shop` and `shop_db` matches `shop`. Matching is case-insensitive
/// substring containment. An empty variant never matches.
#[must_use]
pub fn detect_database<'a>(question: &str, databases: &'a [String]) -> Option<&'a str> {
    let question = question.to_lowercase();
    let detected = databases.iter().find(|database| {
        name_variants(database)
            .into_iter()
            .flatten()
            .any(|variant| !variant.is_empty() && question.contains(&variant))
    })?;
    tracing::debug!(database = %detected, "Detected database from question");
    Some(detected)
}

/// Every database named in `question`, by plain name or with underscores
/// read as spaces.
#[must_use]
pub fn mentioned_databases<'a>(question: &str, databases: &'a [String]) -> Vec<&'a str> {
    let question = question.to_lowercase();
    databases
        .iter()
        .filter(|database| {
            let lower = database.to_lowercase();
            !lower.is_empty()
                && (question.contains(&lower) || question.contains(&lower.replace('_', " ")))
        })
        .map(String::as_str)
        .collect()
}

/// The `db` of the first `FROM db.table` in `sql`, case-insensitive.
#[must_use]
pub fn qualified_database(sql: &str) -> Option<String> {
    let lower = sql.to_ascii_lowercase();
    let bytes = lower.as_bytes();

    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find("from") {
        let start = search_from + found;
        search_from = start + "from".len();

        let mut pos = search_from;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos == search_from {
            continue;
        }

        let name_start = pos;
        while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
            pos += 1;
        }
        if pos > name_start && bytes.get(pos) == Some(&b'.') {
            return Some(sql[name_start..pos].to_string());
        }
    }
    None
}

/// Pick the database to run a question against.
///
/// Precedence: `explicit`, then a name detected in `question`, then the first
/// database of the reduced context, then the first non-system database of
/// `databases`, then any database at all. Returns `None` only when there is
/// no database anywhere.
#[must_use]
pub fn resolve_target_database(
    question: &str,
    explicit: Option<&str>,
    reduced: &Schema,
    databases: &[String],
) -> Option<String> {
    if let Some(explicit) = explicit.filter(|name| !name.is_empty()) {
        return Some(explicit.to_string());
    }
    if let Some(detected) = detect_database(question, databases) {
        return Some(detected.to_string());
    }
    if let Some(first) = reduced.database_names().next() {
        return Some(first.to_string());
    }
    databases
        .iter()
        .find(|name| !is_system_database(name))
        .or_else(|| databases.first())
        .cloned()
}
