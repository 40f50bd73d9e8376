//! Keyword relevance filtering.
//!
//! Matching is plain substring containment on lower-cased names, so the
//! keyword `user` also selects `users_archive`. Loose matching keeps the
//! fallback sample rare.

use crate::domain::{DatabaseSchema, Schema};

/// Words ignored when extracting keywords from a question.
pub const STOP_WORDS: [&str; 10] = [
    "what", "when", "where", "which", "how", "many", "much", "were", "does", "have",
];

/// Lower-cased, whitespace-separated words longer than three characters,
/// minus [`STOP_WORDS`]. Punctuation is kept as part of the word.
#[must_use]
pub fn keywords(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > 3 && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

fn matches_any(name: &str, keywords: &[String]) -> bool {
    let name = name.to_lowercase();
    keywords.iter().any(|keyword| name.contains(keyword.as_str()))
}

/// The part of `schema` that looks relevant to `question`.
///
/// A table is relevant when its name or any of its column names contains a
/// keyword. A database whose name contains a keyword but none of whose tables
/// matched is included whole. When nothing matches at all, the first
/// `sample_tables` tables of every database are returned instead, so the
/// result is only empty when `schema` is.
#[must_use]
pub fn reduce_schema(question: &str, schema: &Schema, sample_tables: usize) -> Schema {
    let keywords = keywords(question);
    tracing::debug!(?keywords, "Reducing schema for question");

    let mut reduced = Schema::new();

    for (database, tables) in schema {
        let database_matches = matches_any(database, &keywords);

        let relevant: DatabaseSchema = tables
            .iter()
            .filter(|(table, columns)| {
                matches_any(table, &keywords)
                    || columns.iter().any(|c| matches_any(&c.name, &keywords))
            })
            .map(|(table, columns)| (table.clone(), columns.clone()))
            .collect();

        if !relevant.is_empty() {
            reduced.insert_database(database.clone(), relevant);
        } else if database_matches {
            reduced.insert_database(database.clone(), tables.clone());
        }
    }

    if reduced.is_empty() {
        tracing::debug!("No relevant tables found, sampling schema");
        return sample_schema(schema, sample_tables);
    }
    reduced
}

/// The first `per_database` tables of every database, in schema order.
#[must_use]
pub fn sample_schema(schema: &Schema, per_database: usize) -> Schema {
    schema
        .iter()
        .map(|(database, tables)| {
            let sample: DatabaseSchema = tables
                .iter()
                .take(per_database)
                .map(|(table, columns)| (table.clone(), columns.clone()))
                .collect();
            (database.clone(), sample)
        })
        .collect()
}
