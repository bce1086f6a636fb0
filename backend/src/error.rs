//! Error types for the export decoder.
//!
//! Failures are split by how far they propagate:
//!
//! - [`SourceError`] - the source file cannot be read (run-fatal, `SourceUnreadable`)
//! - [`RowError`] - one row cannot be decoded (row-fatal, the row is skipped)
//! - [`LiteralError`] - one decode strategy rejected a literal
//! - [`FieldIssue`] - a field fell back to its default (non-fatal)
//! - [`ServerError`] - HTTP layer errors
//!
//! Only [`SourceError`] ever ends a run. Everything else is recorded in
//! [`crate::pipeline::DecodeDiagnostics`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Source Errors (run-fatal)
// =============================================================================

/// The export file could not be turned into rows.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to open or read the file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The delimited table is malformed beyond recovery (e.g. unreadable header).
    #[error("Invalid table format: {0}")]
    Csv(#[from] csv::Error),

    /// Zero bytes, or no header line.
    #[error("Export file is empty")]
    EmptyFile,

    /// A header line but no data rows.
    #[error("Export file has no data rows")]
    NoRows,

    /// One of the two literal columns is missing from the header.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// The table reader only supports single-byte delimiters.
    #[error("Unsupported delimiter: {0:?}")]
    InvalidDelimiter(char),
}

// =============================================================================
// Literal Errors (one strategy)
// =============================================================================

/// A literal was rejected by a parser.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[error("at byte {offset}: {message}")]
pub struct LiteralError {
    /// Byte offset into the (normalized) literal.
    pub offset: usize,
    pub message: String,
}

impl LiteralError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for LiteralError {
    fn from(err: serde_json::Error) -> Self {
        // serde_json reports line/column; the column is the best offset we get
        Self::new(err.column().saturating_sub(1), err.to_string())
    }
}

/// One failed attempt in the strategy chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy: String,
    pub error: LiteralError,
}

// =============================================================================
// Row Errors (row-fatal)
// =============================================================================

/// Why a row was skipped.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RowError {
    /// Every decode strategy rejected the value literal.
    #[error("Value literal unparseable ({})", describe_attempts(attempts))]
    ValueLiteralUnparseable { attempts: Vec<StrategyFailure> },

    /// The record itself could not be read from the table.
    #[error("Row unreadable: {message}")]
    RowUnreadable { message: String },

    /// The worker decoding this row died.
    #[error("Worker failed: {message}")]
    WorkerFailed { message: String },
}

fn describe_attempts(attempts: &[StrategyFailure]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.strategy, a.error))
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Field Issues (non-fatal)
// =============================================================================

/// A field that was defaulted instead of decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldIssue {
    /// The presentation literal has no match for this field.
    FieldExtractionMiss { field: String },

    /// The value was present but could not be coerced to the field's class.
    TypeCoercionFailure { field: String, value: String },
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldIssue::FieldExtractionMiss { field } => {
                write!(f, "field '{}' not found, defaulted", field)
            }
            FieldIssue::TypeCoercionFailure { field, value } => {
                write!(f, "field '{}' (value '{}') not coercible, defaulted", field, value)
            }
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Source could not be decoded at all.
    #[error("Source unreadable: {0}")]
    Source(#[from] SourceError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Socket / runtime failure.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for reading the source table.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for a single decode strategy.
pub type LiteralResult<T> = Result<T, LiteralError>;

/// Result type for decoding one row.
pub type RowResult<T> = Result<T, RowError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: SourceError = io.into();
        assert!(err.to_string().contains("no such file"));

        let server: ServerError = SourceError::NoRows.into();
        assert!(server.to_string().contains("no data rows"));
    }

    #[test]
    fn test_unparseable_lists_every_attempt() {
        let err = RowError::ValueLiteralUnparseable {
            attempts: vec![
                StrategyFailure {
                    strategy: "native-literal".into(),
                    error: LiteralError::new(3, "unexpected character '@'"),
                },
                StrategyFailure {
                    strategy: "strict-json".into(),
                    error: LiteralError::new(0, "expected value"),
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("native-literal: at byte 3"));
        assert!(msg.contains("strict-json"));
    }

    #[test]
    fn test_row_error_serializes_with_kind_tag() {
        let err = RowError::RowUnreadable {
            message: "bad utf-8".into(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "rowUnreadable");
        assert_eq!(json["message"], "bad utf-8");
    }

    #[test]
    fn test_field_issue_format() {
        let issue = FieldIssue::TypeCoercionFailure {
            field: "like_count".into(),
            value: "lots".into(),
        };
        let msg = issue.to_string();
        assert!(msg.contains("like_count"));
        assert!(msg.contains("lots"));
    }
}
