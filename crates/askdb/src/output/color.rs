//! Color and styling helpers for CLI output.
//!
//! Semantic theme:
//!   - Success: green   (cache writes, added relationships)
//!   - Error:   red     (failures)
//!   - Warning: yellow  (model refusals, truncation notes)
//!   - Info:    cyan    (database and table names, SQL)
//!   - Accent:  magenta (references)
//!   - Muted:   dimmed  (field labels, types)
//!   - Emphasis: bold   (section headers, primary keys)

use crate::domain::KeyKind;
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply semantic "info" color (cyan) to text.
pub fn info(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}

pub(crate) fn accent(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.magenta().to_string()
}

pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// Key tag as shown in column listings: `PK`, `FK`, the raw value, or nothing.
pub(crate) fn key_tag(key: Option<&KeyKind>) -> &str {
    match key {
        Some(KeyKind::Primary) => "PK",
        Some(KeyKind::Foreign) => "FK",
        Some(KeyKind::Other(raw)) => raw,
        Some(KeyKind::None) | None => "",
    }
}

/// Colorize a key tag by kind.
pub(crate) fn colorize_key(key: Option<&KeyKind>, config: &OutputConfig) -> String {
    let tag = key_tag(key);
    if !config.use_colors {
        return tag.to_string();
    }
    match key {
        Some(KeyKind::Primary) => tag.yellow().bold().to_string(),
        Some(KeyKind::Foreign) => tag.cyan().to_string(),
        _ => tag.to_string(),
    }
}
