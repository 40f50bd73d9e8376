//! MCP server for askdb schema context and natural-language querying.
//!
//! This crate provides an MCP (Model Context Protocol) server that exposes
//! an askdb workspace (its database server, schema cache and relationship
//! graph) to AI assistants.
//!
//! # Architecture
//!
//! The server uses the `rmcp` crate for MCP protocol handling and wraps one
//! [`askdb::app::App`] per workspace.
//!
//! # Tools
//!
//! ## Context Management
//! - `set_context` - Set the workspace root for all operations
//! - `where_am_i` - Show current workspace context
//!
//! ## Schema Discovery
//! - `list_databases` - List user databases
//! - `list_tables` - List the tables of a database
//! - `describe_table` - Show the columns of a table
//! - `run_query` - Run a read-only statement
//!
//! ## Schema Cache
//! - `cache_schema` - Cache the schema of every database
//! - `generate_schema` - Cache the schema of named databases
//! - `import_schema` - Load a portable schema file into the cache
//! - `get_cached_schema` - Fetch the cache as JSON or compact text
//!
//! ## Relationships
//! - `add_relationship` - Record a column reference
//! - `list_relationships` - List recorded references
//! - `delete_relationship` - Remove a recorded reference
//!
//! ## Questions
//! - `ask` - Answer a question with generated SQL and an explanation

pub mod context;
pub mod error;
pub mod models;
pub mod server;
pub mod tools;

pub use error::{Error, Result};
pub use server::AskdbMcpServer;
