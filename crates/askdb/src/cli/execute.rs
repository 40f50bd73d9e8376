//! Command execution logic.

use anyhow::Result;

use super::args::{
    AskArgs, CacheAction, CacheArgs, ContextArgs, DescribeArgs, InitArgs, QueryArgs, RelAction,
    RelArgs, TablesArgs,
};
use super::types::SchemaFormatArg;
use crate::app::App;
use crate::domain::{RelationshipEdge, Schema};
use crate::output::{self, OutputConfig, OutputMode};

/// Execute the init command
pub async fn execute_init(args: &InitArgs) -> Result<()> {
    use crate::commands::init;

    let current_dir = std::env::current_dir()?;

    if !args.quiet {
        println!(
            "Initializing askdb workspace{}...",
            args.snapshot
                .as_ref()
                .map(|file| format!(" with snapshot '{file}'"))
                .unwrap_or_default()
        );
    }

    let result = init::init(&current_dir, args.snapshot.as_deref()).await?;

    if !args.quiet {
        println!("Initialized askdb in {}", result.askdb_dir.display());
        println!("  Config: {}", result.config_file.display());
        println!("  Cache:  {}", result.cache_file.display());
        println!("  Driver: {}", result.driver);
    }

    Ok(())
}

/// Execute the databases command
pub async fn execute_databases(app: &App, output_mode: OutputMode) -> Result<()> {
    let databases = app.service().list_user_databases().await?;
    output::print_names("database", &databases, output_mode)?;
    Ok(())
}

/// Execute the tables command
pub async fn execute_tables(app: &App, args: &TablesArgs, output_mode: OutputMode) -> Result<()> {
    let tables = app.service().list_tables(&args.database).await?;
    output::print_names("table", &tables, output_mode)?;
    Ok(())
}

/// Execute the describe command
pub async fn execute_describe(
    app: &App,
    args: &DescribeArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let columns = app.service().describe_table(&args.database, &args.table).await?;
    output::print_columns(&args.database, &args.table, &columns, output_mode)?;
    Ok(())
}

/// Execute the query command
pub async fn execute_query(app: &App, args: &QueryArgs, output_mode: OutputMode) -> Result<()> {
    let rows = app.service().run_query(&args.sql, &args.database).await?;
    output::print_rows(&rows, output_mode)?;
    Ok(())
}

fn print_cache_summary(
    app: &App,
    verb: &str,
    schema: &Schema,
    output_mode: OutputMode,
) -> Result<()> {
    let path = app.config().cache_path(app.root_dir());
    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "cache_file": path.display().to_string(),
            "databases": schema.database_names().collect::<Vec<_>>(),
            "tables": schema.table_count(),
        }))?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            println!(
                "{} {} database(s), {} table(s) into {}",
                output::success(verb, &config),
                schema.len(),
                schema.table_count(),
                path.display()
            );
        }
    }
    Ok(())
}

/// Execute the cache command
pub async fn execute_cache(app: &App, args: &CacheArgs, output_mode: OutputMode) -> Result<()> {
    let service = app.service();

    match &args.action {
        CacheAction::Build { databases, refresh } => {
            let schema = if databases.is_empty() {
                service.cache_full_schema(*refresh).await?
            } else {
                service.build_context_for(databases).await?
            };
            print_cache_summary(app, "Cached", &schema, output_mode)?;
        }
        CacheAction::Show { format } => {
            let schema = service.cached_schema().await?;
            match (format, output_mode) {
                (SchemaFormatArg::Json, _) => output::print_json(&schema)?,
                (SchemaFormatArg::Text, OutputMode::Json) => {
                    let text = crate::format::encode(&schema);
                    output::print_json(&serde_json::json!({ "text": text }))?;
                }
                (SchemaFormatArg::Text, OutputMode::Text) => {
                    output::print_message(crate::format::encode(&schema).trim_end())?;
                }
            }
        }
        CacheAction::Import { file } => {
            let schema = service.import_portable_file(file).await?;
            print_cache_summary(app, "Imported", &schema, output_mode)?;
        }
    }

    Ok(())
}

/// Execute the rel command
pub async fn execute_rel(app: &App, args: &RelArgs, output_mode: OutputMode) -> Result<()> {
    let service = app.service();
    let config = OutputConfig::from_env();

    match &args.action {
        RelAction::Add {
            source,
            target,
            relationship_type,
        } => {
            let edge = RelationshipEdge::new(source, target, Some(relationship_type));
            service.add_relationship(&edge).await?;
            match output_mode {
                OutputMode::Json => output::print_json(&edge)?,
                OutputMode::Text => {
                    println!("{} {edge}", output::success("Added relationship", &config));
                }
            }
        }
        RelAction::Remove { source, target } => {
            service.remove_relationship(source, target).await?;
            match output_mode {
                OutputMode::Json => output::print_json(&serde_json::json!({
                    "removed": true,
                    "source": source.to_string(),
                    "target": target.to_string(),
                }))?,
                OutputMode::Text => println!(
                    "{} {source} -> {target}",
                    output::success("Removed relationship", &config)
                ),
            }
        }
        RelAction::List => {
            let edges = service.list_relationships().await;
            output::print_relationships(&edges, output_mode)?;
        }
    }

    Ok(())
}

/// Execute the context command
pub async fn execute_context(app: &App, args: &ContextArgs, output_mode: OutputMode) -> Result<()> {
    use crate::assistant::prompt_context;

    let policy = app.config().policy();
    let context =
        prompt_context(app.service(), &args.question, args.database.as_deref(), &policy).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "database": context.database,
            "context": context.limited,
        }))?,
        OutputMode::Text => {
            let config = OutputConfig::from_env();
            println!(
                "Database: {}",
                context
                    .database
                    .as_deref()
                    .map_or_else(|| "(none detected)".to_string(), |db| output::info(db, &config))
            );
            println!(
                "Context:  {} database(s), {} table(s)",
                context.limited.len(),
                context.limited.table_count()
            );
            println!();
            output::print_message(crate::format::encode(&context.limited).trim_end())?;
        }
    }

    Ok(())
}

/// Execute the ask command
pub async fn execute_ask(app: &App, args: &AskArgs, output_mode: OutputMode) -> Result<()> {
    let assistant = app.assistant()?;
    let answer = assistant.answer(&args.question, args.database.as_deref()).await;
    output::print_answer(&answer, output_mode)?;
    Ok(())
}
