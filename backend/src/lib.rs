//! # factcheck - decoder for fact-checking export files
//!
//! Reads a delimited export whose cells hold stringified record literals and
//! turns each row into a typed `(PresentationRecord, PostRecord)` pair.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │ Export file │────▶│   Reader    │────▶│   Decoders   │────▶│ Normalizer  │
//! │ (ISO/UTF8)  │     │ (auto-enc)  │     │ (regex+chain)│     │ (typed+ext) │
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────────┘
//!                                 row failures → diagnostics, run continues
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use factcheck::{decode_file, DecodeOptions};
//!
//! let output = decode_file("export.csv", &DecodeOptions::default());
//! println!("Decoded {} rows", output.rows.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Presentation and post records
//! - [`config`] - Decode options and environment overrides
//! - [`reader`] - Export reading with auto-detection
//! - [`decode`] - Presentation extraction and the value strategy chain
//! - [`normalize`] - Mapping onto the typed post schema
//! - [`pipeline`] - Row aggregation and diagnostics
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Decoding
pub mod decode;
pub mod normalize;
pub mod reader;

// Aggregation
pub mod pipeline;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    FieldIssue, LiteralError, RowError, ServerError, SourceError, StrategyFailure,
};

// =============================================================================
// Re-exports - Models & Config
// =============================================================================

pub use config::{ColumnLayout, DecodeOptions};
pub use models::{
    DecodedRow, GenericFields, KeyFinding, PostRecord, PresentationRecord, RecommendedAction,
};

// =============================================================================
// Re-exports - Decoding
// =============================================================================

pub use decode::{
    decode_presentation, decode_value, extract_presentation, parse_literal, DecodeStrategy,
    NativeLiteralStrategy, StrategyChain, StrictJsonStrategy,
};
pub use normalize::{normalize, Normalized};
pub use reader::{read_bytes, read_file, RawRow, ReadResult};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    decode_bytes, decode_bytes_concurrent, decode_file, decode_file_concurrent, decode_read,
    decode_read_concurrent, decode_row, decode_rows, decode_rows_concurrent, DecodeDiagnostics,
    DecodeOutput, RowDecode,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, DecodeResponse, JobStatus};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
