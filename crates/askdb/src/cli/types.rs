//! CLI value enums.

use clap::ValueEnum;

/// Output format for `cache show`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaFormatArg {
    /// The JSON cache document
    #[default]
    Json,
    /// Compact one-line-per-table notation
    Text,
}

impl std::fmt::Display for SchemaFormatArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Text => write!(f, "text"),
        }
    }
}
