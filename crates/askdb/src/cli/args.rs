//! CLI argument structs for all commands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::types::SchemaFormatArg;
use super::validators::{
    validate_column_ref, validate_identifier, validate_relationship_type, validate_text,
};
use crate::domain::{ColumnRef, DEFAULT_RELATIONSHIP_TYPE};

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Serve schemas from this file instead of a live MySQL server
    ///
    /// Accepts the JSON cache format or the compact text notation. The path
    /// is stored relative to the workspace root.
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<String>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `tables` command
#[derive(Parser, Debug, Clone)]
pub struct TablesArgs {
    /// Database to list tables for
    #[arg(value_parser = validate_identifier)]
    pub database: String,
}

/// Arguments for the `describe` command
#[derive(Parser, Debug, Clone)]
pub struct DescribeArgs {
    /// Database containing the table
    #[arg(value_parser = validate_identifier)]
    pub database: String,

    /// Table to describe
    #[arg(value_parser = validate_identifier)]
    pub table: String,
}

/// Arguments for the `query` command
#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Read-only statement (SELECT, SHOW or DESCRIBE)
    #[arg(value_parser = validate_text)]
    pub sql: String,

    /// Database to run the statement against
    #[arg(short, long, value_parser = validate_identifier)]
    pub database: String,
}

/// Arguments for the `cache` command
#[derive(Parser, Debug, Clone)]
pub struct CacheArgs {
    /// Cache subcommand
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Schema cache actions
#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Introspect databases and write them to the cache
    ///
    /// Without `--database`, every non-system database is cached. An existing
    /// cache is kept unless `--refresh` is given.
    Build {
        /// Only these databases; merged into the existing cache
        #[arg(short, long = "database", value_parser = validate_identifier)]
        databases: Vec<String>,

        /// Rebuild the full cache even if one exists
        #[arg(long, conflicts_with = "databases")]
        refresh: bool,
    },

    /// Print the cached schema
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        format: SchemaFormatArg,
    },

    /// Replace the cache with a schema file (JSON or compact text)
    Import {
        /// File to import
        file: PathBuf,
    },
}

/// Arguments for the `rel` command
#[derive(Parser, Debug, Clone)]
pub struct RelArgs {
    /// Relationship subcommand
    #[command(subcommand)]
    pub action: RelAction,
}

/// Relationship management actions
#[derive(Subcommand, Debug, Clone)]
pub enum RelAction {
    /// Record that a column references another column
    Add {
        /// Referencing column (database.table.column)
        #[arg(value_parser = validate_column_ref)]
        source: ColumnRef,

        /// Referenced column (database.table.column)
        #[arg(value_parser = validate_column_ref)]
        target: ColumnRef,

        /// Relationship label
        #[arg(
            short = 't',
            long = "type",
            value_parser = validate_relationship_type,
            default_value = DEFAULT_RELATIONSHIP_TYPE
        )]
        relationship_type: String,
    },

    /// Remove a recorded reference
    Remove {
        /// Referencing column (database.table.column)
        #[arg(value_parser = validate_column_ref)]
        source: ColumnRef,

        /// Referenced column (database.table.column)
        #[arg(value_parser = validate_column_ref)]
        target: ColumnRef,
    },

    /// List every recorded reference
    List,
}

/// Arguments for the `context` command
#[derive(Parser, Debug, Clone)]
pub struct ContextArgs {
    /// Question to build the context for
    #[arg(value_parser = validate_text)]
    pub question: String,

    /// Restrict the context to one database
    #[arg(short, long, value_parser = validate_identifier)]
    pub database: Option<String>,
}

/// Arguments for the `ask` command
#[derive(Parser, Debug, Clone)]
pub struct AskArgs {
    /// Question in plain language
    #[arg(value_parser = validate_text)]
    pub question: String,

    /// Database to ask about; detected from the question when omitted
    #[arg(short, long, value_parser = validate_identifier)]
    pub database: Option<String>,
}
