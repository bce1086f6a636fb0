//! Decode configuration.
//!
//! Options are resolved in three layers: [`DecodeOptions::default`], then the
//! environment (`.env` loaded by `dotenvy` in `main`), then CLI flags.

use serde::{Deserialize, Serialize};
use std::env;

use crate::api::logs::log_warning;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Header label that actually holds the presentation literal.
pub const DEFAULT_PRESENTATION_COLUMN: &str = "post";

/// Header label that actually holds the post literal.
pub const DEFAULT_POST_COLUMN: &str = "presentation";

/// Upper bound on decode workers.
pub const MAX_WORKERS: usize = 64;

/// How the two literal columns map onto their roles.
///
/// Upstream exports label the columns the wrong way round: the column named
/// `post` carries the presentation literal and vice versa. `Swapped` reads
/// them accordingly. `AsLabelled` trusts the labels and is a breaking change
/// for existing exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnLayout {
    #[default]
    Swapped,
    AsLabelled,
}

impl ColumnLayout {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "swapped" | "swap" => Some(Self::Swapped),
            "as-labelled" | "as_labelled" | "labelled" | "as-labeled" => Some(Self::AsLabelled),
            _ => None,
        }
    }
}

/// Options for a decode run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Field delimiter (auto-detect if not specified).
    pub delimiter: Option<char>,

    /// Column role mapping.
    pub layout: ColumnLayout,

    /// Header that holds the presentation literal under [`ColumnLayout::Swapped`].
    pub presentation_column: String,

    /// Header that holds the post literal under [`ColumnLayout::Swapped`].
    pub post_column: String,

    /// Number of decode workers; 1 decodes sequentially.
    pub workers: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            layout: ColumnLayout::Swapped,
            presentation_column: DEFAULT_PRESENTATION_COLUMN.to_string(),
            post_column: DEFAULT_POST_COLUMN.to_string(),
            workers: 1,
        }
    }
}

impl DecodeOptions {
    /// Defaults overridden by `FACTCHECK_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().merge_env(|key| env::var(key).ok())
    }

    /// Apply overrides from a variable lookup. Invalid values are ignored.
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("FACTCHECK_DELIMITER") {
            match parse_delimiter(&raw) {
                Some(d) => self.delimiter = Some(d),
                None => log_warning(format!("Ignoring FACTCHECK_DELIMITER='{}'", raw)),
            }
        }
        if let Some(raw) = lookup("FACTCHECK_COLUMN_LAYOUT") {
            match ColumnLayout::from_name(&raw) {
                Some(layout) => self.layout = layout,
                None => log_warning(format!("Ignoring FACTCHECK_COLUMN_LAYOUT='{}'", raw)),
            }
        }
        if let Some(name) = lookup("FACTCHECK_PRESENTATION_COLUMN").filter(|s| !s.trim().is_empty()) {
            self.presentation_column = name.trim().to_string();
        }
        if let Some(name) = lookup("FACTCHECK_POST_COLUMN").filter(|s| !s.trim().is_empty()) {
            self.post_column = name.trim().to_string();
        }
        if let Some(raw) = lookup("FACTCHECK_WORKERS") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n >= 1 => self.workers = n.min(MAX_WORKERS),
                _ => log_warning(format!("Ignoring FACTCHECK_WORKERS='{}'", raw)),
            }
        }
        self
    }

    /// Header names `(presentation, post)` after applying the layout.
    pub fn resolved_columns(&self) -> (&str, &str) {
        match self.layout {
            ColumnLayout::Swapped => (&self.presentation_column, &self.post_column),
            ColumnLayout::AsLabelled => (&self.post_column, &self.presentation_column),
        }
    }
}

/// Server port from `FACTCHECK_PORT`, falling back to [`DEFAULT_PORT`].
pub fn port_from_env() -> u16 {
    env::var("FACTCHECK_PORT")
        .ok()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Accepts a single character or the names `tab`, `\t`, `comma`, `semicolon`, `pipe`.
pub fn parse_delimiter(raw: &str) -> Option<char> {
    match raw.to_lowercase().as_str() {
        "tab" | "\\t" | "\t" => Some('\t'),
        "comma" => Some(','),
        "semicolon" => Some(';'),
        "pipe" => Some('|'),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Some(c),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_layout_is_swapped() {
        let options = DecodeOptions::default();
        assert_eq!(options.layout, ColumnLayout::Swapped);
        assert_eq!(options.resolved_columns(), ("post", "presentation"));
    }

    #[test]
    fn test_as_labelled_reverses_columns() {
        let options = DecodeOptions {
            layout: ColumnLayout::AsLabelled,
            ..Default::default()
        };
        assert_eq!(options.resolved_columns(), ("presentation", "post"));
    }

    #[test]
    fn test_env_overrides() {
        let options = DecodeOptions::default().merge_env(lookup(&[
            ("FACTCHECK_DELIMITER", "tab"),
            ("FACTCHECK_COLUMN_LAYOUT", "as-labelled"),
            ("FACTCHECK_WORKERS", "4"),
            ("FACTCHECK_POST_COLUMN", " payload "),
        ]));
        assert_eq!(options.delimiter, Some('\t'));
        assert_eq!(options.layout, ColumnLayout::AsLabelled);
        assert_eq!(options.workers, 4);
        assert_eq!(options.post_column, "payload");
    }

    #[test]
    fn test_invalid_env_values_ignored() {
        let options = DecodeOptions::default().merge_env(lookup(&[
            ("FACTCHECK_DELIMITER", "::"),
            ("FACTCHECK_COLUMN_LAYOUT", "sideways"),
            ("FACTCHECK_WORKERS", "0"),
        ]));
        assert_eq!(options, DecodeOptions::default());
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";"), Some(';'));
        assert_eq!(parse_delimiter("Pipe"), Some('|'));
        assert_eq!(parse_delimiter(""), None);
        assert_eq!(parse_delimiter("ab"), None);
    }
}
