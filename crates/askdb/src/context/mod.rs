//! Choosing which part of a schema goes into a prompt.
//!
//! Three passes, applied in this order by the question-answering flow:
//!
//! 1. [`reduce_schema`] keeps the tables whose names (or whose database or
//!    column names) overlap with the question's keywords
//! 2. [`limit_context`] trims column detail until the serialized context fits
//!    the size budget, never touching relationships
//! 3. [`primary_key_summary`] is the last-resort context used when the model
//!    still reports a token limit
//!
//! [`resolve`] holds the heuristics that pick the database a question is about.

mod limit;
mod reduce;
pub mod resolve;

pub use limit::{limit_context, primary_key_summary, serialized_len, KeySummary};
pub use reduce::{keywords, reduce_schema, sample_schema, STOP_WORDS};
pub use resolve::{
    detect_database, mentioned_databases, qualified_database, resolve_target_database,
};

/// Tuning knobs for context reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextPolicy {
    /// Serialized JSON length above which column types are dropped.
    pub size_threshold: usize,
    /// Databases with more tables than this lose their column types once
    /// the threshold is exceeded.
    pub large_database_tables: usize,
    /// Tables per database in the fallback sample.
    pub sample_tables: usize,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            size_threshold: 50_000,
            large_database_tables: 15,
            sample_tables: 3,
        }
    }
}
