//! Output formatting for CLI commands.
//!
//! Every printer has a text form for people and a JSON form for scripts.
//! Text writers take any [`Write`] so they can be tested against a buffer.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers

pub mod color;

use crate::assistant::QueryAnswer;
use crate::domain::{Column, RelationshipEdge};
use crate::introspect::Row;
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::io::{self, Write};

pub use color::{error, info, success, warning};

use color::{accent, bold, colorize_key, dimmed};

const DEFAULT_TERMINAL_WIDTH: u16 = 80;
const DEFAULT_MAX_CONTENT_WIDTH: usize = 100;
const MAX_CELL_WIDTH: usize = 40;

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Maximum content width for text wrapping.
    pub max_width: usize,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new `OutputConfig` with explicit values.
    pub fn new(max_width: usize, use_colors: bool) -> Self {
        Self {
            max_width,
            use_colors,
        }
    }

    /// Create an `OutputConfig` from environment variables.
    ///
    /// Reads:
    /// - `ASKDB_MAX_WIDTH`: Maximum content width (default: 100)
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `ASKDB_COLOR`: Set to "0" or "false" to disable colors (default: true)
    pub fn from_env() -> Self {
        let max_width = match env::var("ASKDB_MAX_WIDTH") {
            Ok(s) if !s.is_empty() => s.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    env_var = "ASKDB_MAX_WIDTH",
                    value = %s,
                    default = DEFAULT_MAX_CONTENT_WIDTH,
                    "Invalid value, using default"
                );
                DEFAULT_MAX_CONTENT_WIDTH
            }),
            _ => DEFAULT_MAX_CONTENT_WIDTH,
        };

        // https://no-color.org/
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("ASKDB_COLOR")
                .map_or(true, |v| v != "0" && !v.eq_ignore_ascii_case("false"));

        Self {
            max_width,
            use_colors,
        }
    }

    fn content_width(&self) -> usize {
        get_terminal_width().min(self.max_width)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_CONTENT_WIDTH,
            use_colors: true,
        }
    }
}

fn get_terminal_width() -> usize {
    terminal_size::terminal_size()
        .map_or(usize::from(DEFAULT_TERMINAL_WIDTH), |(w, _)| usize::from(w.0))
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

impl OutputMode {
    /// `Json` when `json` is set, else `Text`.
    pub fn from_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }
}

// ============================================================================
// Public Dispatch Functions
// ============================================================================

/// Print a simple message
pub fn print_message(msg: &str) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{msg}")
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(handle, "{json}")
}

/// Print a list of database or table names under `noun` ("database", "table").
pub fn print_names(noun: &str, names: &[String], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&names),
        OutputMode::Text => {
            let stdout = io::stdout();
            write_names(&mut stdout.lock(), noun, names, &OutputConfig::from_env())
        }
    }
}

/// Print the columns of one table.
pub fn print_columns(
    database: &str,
    table: &str,
    columns: &[Column],
    mode: OutputMode,
) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&columns),
        OutputMode::Text => {
            let stdout = io::stdout();
            write_columns(&mut stdout.lock(), database, table, columns, &OutputConfig::from_env())
        }
    }
}

/// Print query result rows.
pub fn print_rows(rows: &[Row], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&rows),
        OutputMode::Text => {
            let stdout = io::stdout();
            write_rows(&mut stdout.lock(), rows, &OutputConfig::from_env())
        }
    }
}

/// Print relationship edges.
pub fn print_relationships(edges: &[RelationshipEdge], mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(&edges),
        OutputMode::Text => {
            let stdout = io::stdout();
            write_relationships(&mut stdout.lock(), edges, &OutputConfig::from_env())
        }
    }
}

/// Print the outcome of a question.
pub fn print_answer(answer: &QueryAnswer, mode: OutputMode) -> io::Result<()> {
    match mode {
        OutputMode::Json => print_json(answer),
        OutputMode::Text => {
            let stdout = io::stdout();
            let config = OutputConfig::from_env();
            let width = config.content_width();
            write_answer(&mut stdout.lock(), answer, width, &config)
        }
    }
}

// ============================================================================
// Text Formatting
// ============================================================================

fn write_names<W: Write>(
    w: &mut W,
    noun: &str,
    names: &[String],
    config: &OutputConfig,
) -> io::Result<()> {
    if names.is_empty() {
        writeln!(w, "No {noun}s found.")?;
        return Ok(());
    }

    writeln!(w, "Found {} {noun}(s):", names.len())?;
    for name in names {
        writeln!(w, "  {}", info(name, config))?;
    }
    Ok(())
}

fn write_columns<W: Write>(
    w: &mut W,
    database: &str,
    table: &str,
    columns: &[Column],
    config: &OutputConfig,
) -> io::Result<()> {
    writeln!(w, "{}", bold(&format!("{database}.{table}"), config))?;
    if columns.is_empty() {
        writeln!(w, "  (no columns)")?;
        return Ok(());
    }

    let name_width = columns.iter().map(|c| c.name.chars().count()).max().unwrap_or(0);
    let type_width = columns
        .iter()
        .map(|c| c.data_type.as_deref().unwrap_or("").chars().count())
        .max()
        .unwrap_or(0);

    for column in columns {
        let data_type = column.data_type.as_deref().unwrap_or("");
        let mut line = format!(
            "  {:<name_width$}  {}{}  {}",
            column.name,
            dimmed(data_type, config),
            " ".repeat(type_width - data_type.chars().count()),
            colorize_key(column.key.as_ref(), config),
        );
        for reference in column.references() {
            line.push_str(&format!(" {}", accent(&format!("-> {}", reference.target()), config)));
        }
        writeln!(w, "{}", line.trim_end())?;
    }
    Ok(())
}

fn cell(value: &Value) -> String {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > MAX_CELL_WIDTH {
        let truncated: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{truncated}...")
    } else {
        text
    }
}

fn write_rows<W: Write>(w: &mut W, rows: &[Row], config: &OutputConfig) -> io::Result<()> {
    let Some(first) = rows.first() else {
        writeln!(w, "No rows returned.")?;
        return Ok(());
    };

    let headers: Vec<&String> = first.keys().collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(h.as_str()).map_or_else(String::new, cell))
                .collect()
        })
        .collect();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header_line: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, width)| format!("{h:<width$}"))
        .collect();
    writeln!(w, "{}", bold(header_line.join("  ").trim_end(), config))?;

    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    writeln!(w, "{}", dimmed(&rule.join("  "), config))?;

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{value:<width$}"))
            .collect();
        writeln!(w, "{}", line.join("  ").trim_end())?;
    }

    writeln!(w)?;
    writeln!(w, "{} row(s)", rows.len())?;
    Ok(())
}

fn write_relationships<W: Write>(
    w: &mut W,
    edges: &[RelationshipEdge],
    config: &OutputConfig,
) -> io::Result<()> {
    if edges.is_empty() {
        writeln!(w, "No relationships found.")?;
        return Ok(());
    }

    writeln!(w, "Found {} relationship(s):", edges.len())?;
    for edge in edges {
        writeln!(
            w,
            "  {} -> {} {}",
            info(&edge.source().to_string(), config),
            accent(&edge.target().to_string(), config),
            dimmed(&format!("({})", edge.relationship_type), config),
        )?;
    }
    Ok(())
}

fn write_answer<W: Write>(
    w: &mut W,
    answer: &QueryAnswer,
    width: usize,
    config: &OutputConfig,
) -> io::Result<()> {
    if let Some(sql) = &answer.sql {
        writeln!(w, "{}", bold("SQL:", config))?;
        for line in sql.lines() {
            writeln!(w, "  {}", info(line, config))?;
        }
        writeln!(w)?;
    }

    if let Some(rows) = &answer.results {
        write_rows(w, rows, config)?;
        writeln!(w)?;
    }

    let explanation = if answer.sql.is_none() {
        warning(&wrap_text(&answer.explanation, width).join("\n"), config)
    } else {
        wrap_text(&answer.explanation, width).join("\n")
    };
    writeln!(w, "{explanation}")
}

/// Wrap text to fit within a given width, preserving existing line breaks.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    text.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, max_width.max(1))
                    .into_iter()
                    .map(std::borrow::Cow::into_owned)
                    .collect()
            }
        })
        .collect()
}
