//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a new askdb workspace
//! - `databases`: List non-system databases
//! - `tables`: List the tables of a database
//! - `describe`: Show the columns of a table
//! - `query`: Run a read-only statement
//! - `cache`: Build, show or import the schema cache
//! - `rel`: Add, list or remove column references
//! - `context`: Show the schema context a question would be sent with
//! - `ask`: Answer a question in plain language
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! askdb init --snapshot schema.txt
//! askdb cache build
//! askdb rel add shop.orders.customer_id crm.customers.id
//! askdb ask "how many orders were placed last week" --database shop
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{
    AskArgs, CacheAction, CacheArgs, ContextArgs, DescribeArgs, InitArgs, QueryArgs, RelAction,
    RelArgs, TablesArgs,
};
pub use types::SchemaFormatArg;
pub use validators::{
    validate_column_ref, validate_identifier, validate_relationship_type, validate_text,
};

/// askdb - ask questions of your databases in plain language
///
/// Keeps a curated schema cache in `.askdb/db_schema.json`, enriched with
/// column references the databases do not declare, and uses it to turn
/// questions into read-only SQL.
#[derive(Parser, Debug)]
#[command(name = "askdb")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new askdb workspace
    ///
    /// Creates the `.askdb/` directory with a default configuration.
    Init(InitArgs),

    /// List databases, excluding system databases
    Databases,

    /// List the tables of a database
    ///
    /// Served from the cache when the database is cached.
    Tables(TablesArgs),

    /// Show the columns of a table
    Describe(DescribeArgs),

    /// Run a read-only SQL statement
    ///
    /// Only statements starting with SELECT, SHOW or DESCRIBE are accepted.
    Query(QueryArgs),

    /// Manage the schema cache
    Cache(CacheArgs),

    /// Manage column references
    Rel(RelArgs),

    /// Show the reduced schema context for a question
    Context(ContextArgs),

    /// Answer a question with generated SQL
    ///
    /// Requires an API key in the environment variable named by
    /// `llm.api-key-env` (default `OPENAI_API_KEY`).
    Ask(AskArgs),
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command
    ///
    /// # Errors
    ///
    /// Returns any error raised by the command.
    pub async fn execute(&self) -> Result<()> {
        use crate::app::App;
        use crate::output::OutputMode;

        let output_mode = OutputMode::from_flag(self.json);

        let Some(command) = &self.command else {
            println!("askdb - ask questions of your databases");
            println!("Use --help for more information");
            return Ok(());
        };

        if let Commands::Init(args) = command {
            return execute::execute_init(args).await;
        }

        let app = App::from_directory(&std::env::current_dir()?).await?;
        match command {
            Commands::Init(_) => Ok(()),
            Commands::Databases => execute::execute_databases(&app, output_mode).await,
            Commands::Tables(args) => execute::execute_tables(&app, args, output_mode).await,
            Commands::Describe(args) => execute::execute_describe(&app, args, output_mode).await,
            Commands::Query(args) => execute::execute_query(&app, args, output_mode).await,
            Commands::Cache(args) => execute::execute_cache(&app, args, output_mode).await,
            Commands::Rel(args) => execute::execute_rel(&app, args, output_mode).await,
            Commands::Context(args) => execute::execute_context(&app, args, output_mode).await,
            Commands::Ask(args) => execute::execute_ask(&app, args, output_mode).await,
        }
    }
}
