//! Row aggregation: reader → decoders → normalizer, one row at a time.
//!
//! A failure inside one row's pipeline stops at the row boundary. The row is
//! skipped, its index and reason land in [`DecodeDiagnostics`], and the run
//! goes on. Only an unreadable source ends a run, and even then the result is
//! an empty row sequence plus the reason rather than an error.
//!
//! # Example
//!
//! ```rust,ignore
//! use factcheck::{decode_file, DecodeOptions};
//!
//! let output = decode_file("export.csv", &DecodeOptions::default());
//! eprintln!("{}", output.diagnostics.summary());
//! for row in &output.rows {
//!     println!("{} {}", row.presentation.title, row.post.post_id);
//! }
//! ```

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::path::Path;

use crate::api::logs::{log_error, log_info, log_row_warning, log_success, log_warning};
use crate::config::{ColumnLayout, DecodeOptions, MAX_WORKERS};
use crate::decode::{decode_value, extract_presentation};
use crate::error::{FieldIssue, RowError, RowResult, SourceError};
use crate::models::DecodedRow;
use crate::normalize::normalize;
use crate::reader::{read_bytes, read_file, RawRow, ReadResult};

/// One decoded row and the fields that had to be defaulted on the way.
#[derive(Debug, Clone)]
pub struct RowDecode {
    pub row: DecodedRow,
    pub issues: Vec<FieldIssue>,
}

/// Decode a single row. Pure: depends only on the two literals.
pub fn decode_row(raw: &RawRow) -> RowResult<RowDecode> {
    let fields = decode_value(&raw.post)?;
    let (presentation, mut issues) = extract_presentation(&raw.presentation);
    let normalized = normalize(fields);
    issues.extend(normalized.issues);

    Ok(RowDecode {
        row: DecodedRow {
            row: raw.index,
            presentation,
            post: normalized.record,
        },
        issues,
    })
}

/// A row left out of the output.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: RowError,
}

/// A field defaulted in a row that was kept.
#[derive(Debug, Clone, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub issue: FieldIssue,
}

/// Where the rows came from.
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub layout: ColumnLayout,
}

/// What happened during a decode run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeDiagnostics {
    /// Data rows seen, readable or not.
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: Vec<SkippedRow>,
    pub issues: Vec<RowIssue>,
    /// Set when the source itself could not be read.
    pub source_error: Option<String>,
    pub source: Option<SourceInfo>,
    pub started_at: DateTime<Utc>,
}

impl DecodeDiagnostics {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            skipped: Vec::new(),
            issues: Vec::new(),
            source_error: None,
            source: None,
            started_at,
        }
    }

    pub fn is_source_unreadable(&self) -> bool {
        self.source_error.is_some()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        if let Some(ref reason) = self.source_error {
            return format!("Source unreadable: {}", reason);
        }
        format!(
            "Decoded {} of {} rows ({} skipped, {} field issues)",
            self.succeeded,
            self.attempted,
            self.skipped.len(),
            self.issues.len()
        )
    }
}

/// Decoded rows in source order, plus diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeOutput {
    pub rows: Vec<DecodedRow>,
    pub diagnostics: DecodeDiagnostics,
}

impl DecodeOutput {
    /// Empty result for a source that could not be read.
    pub fn source_unreadable(error: &SourceError) -> Self {
        log_error(format!("Source unreadable: {}", error));
        let mut diagnostics = DecodeDiagnostics::new(Utc::now());
        diagnostics.source_error = Some(error.to_string());
        Self {
            rows: Vec::new(),
            diagnostics,
        }
    }
}

// =============================================================================
// Sequential
// =============================================================================

/// Decode an export file. Never fails; see [`DecodeDiagnostics::source_error`].
pub fn decode_file<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> DecodeOutput {
    log_info(format!("Reading {}", path.as_ref().display()));
    match read_file(path, options) {
        Ok(read) => decode_read(read, options),
        Err(e) => DecodeOutput::source_unreadable(&e),
    }
}

/// Decode an export held in memory.
pub fn decode_bytes(bytes: &[u8], options: &DecodeOptions) -> DecodeOutput {
    match read_bytes(bytes, options) {
        Ok(read) => decode_read(read, options),
        Err(e) => DecodeOutput::source_unreadable(&e),
    }
}

/// Decode rows a reader already produced.
pub fn decode_read(read: ReadResult, options: &DecodeOptions) -> DecodeOutput {
    let started_at = Utc::now();
    let (rows, unreadable, source) = split_read(read, options);
    let results = rows.iter().map(|raw| (raw.index, decode_row(raw))).collect();
    aggregate(results, unreadable, Some(source), started_at)
}

/// Decode rows one after another.
pub fn decode_rows(rows: Vec<RawRow>) -> DecodeOutput {
    let started_at = Utc::now();
    let results = rows.iter().map(|raw| (raw.index, decode_row(raw))).collect();
    aggregate(results, Vec::new(), None, started_at)
}

// =============================================================================
// Concurrent
// =============================================================================

/// Decode rows on up to `workers` blocking tasks.
///
/// Rows are split into contiguous chunks, one task per chunk. Results are put
/// back into source order. If a task panics, every row of its chunk is
/// skipped as [`RowError::WorkerFailed`].
pub async fn decode_rows_concurrent(rows: Vec<RawRow>, workers: usize) -> DecodeOutput {
    let started_at = Utc::now();
    let results = fan_out(rows, workers).await;
    aggregate(results, Vec::new(), None, started_at)
}

/// Concurrent counterpart of [`decode_read`], using `options.workers`.
pub async fn decode_read_concurrent(read: ReadResult, options: &DecodeOptions) -> DecodeOutput {
    let started_at = Utc::now();
    let (rows, unreadable, source) = split_read(read, options);
    let results = fan_out(rows, options.workers).await;
    aggregate(results, unreadable, Some(source), started_at)
}

/// Concurrent counterpart of [`decode_file`].
pub async fn decode_file_concurrent<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> DecodeOutput {
    log_info(format!("Reading {}", path.as_ref().display()));
    match tokio::fs::read(path.as_ref()).await {
        Ok(bytes) => decode_bytes_concurrent(&bytes, options).await,
        Err(e) => DecodeOutput::source_unreadable(&SourceError::Io(e)),
    }
}

/// Concurrent counterpart of [`decode_bytes`].
pub async fn decode_bytes_concurrent(bytes: &[u8], options: &DecodeOptions) -> DecodeOutput {
    match read_bytes(bytes, options) {
        Ok(read) => decode_read_concurrent(read, options).await,
        Err(e) => DecodeOutput::source_unreadable(&e),
    }
}

async fn fan_out(rows: Vec<RawRow>, workers: usize) -> Vec<(usize, RowResult<RowDecode>)> {
    if rows.is_empty() {
        return Vec::new();
    }
    let workers = workers.clamp(1, MAX_WORKERS);
    let chunk_size = rows.len().div_ceil(workers);

    let mut chunks = Vec::with_capacity(workers);
    let mut rest = rows.into_iter().peekable();
    while rest.peek().is_some() {
        let chunk: Vec<RawRow> = rest.by_ref().take(chunk_size).collect();
        chunks.push(chunk);
    }
    log_info(format!("Decoding on {} worker(s)", chunks.len()));

    let tasks = chunks.into_iter().map(|chunk| {
        let indices: Vec<usize> = chunk.iter().map(|raw| raw.index).collect();
        let handle = tokio::task::spawn_blocking(move || {
            chunk
                .iter()
                .map(|raw| (raw.index, decode_row(raw)))
                .collect::<Vec<_>>()
        });
        async move {
            match handle.await {
                Ok(results) => results,
                Err(e) => {
                    let message = e.to_string();
                    indices
                        .into_iter()
                        .map(|index| {
                            let reason = RowError::WorkerFailed {
                                message: message.clone(),
                            };
                            (index, Err(reason))
                        })
                        .collect()
                }
            }
        }
    });

    let mut results: Vec<_> = join_all(tasks).await.into_iter().flatten().collect();
    results.sort_by_key(|(index, _)| *index);
    results
}

// =============================================================================
// Aggregation
// =============================================================================

fn split_read(
    read: ReadResult,
    options: &DecodeOptions,
) -> (Vec<RawRow>, Vec<(usize, RowError)>, SourceInfo) {
    log_success(format!("Detected encoding: {}", read.encoding));
    log_success(format!("Detected delimiter: '{}'", format_delimiter(read.delimiter)));
    log_success(format!("Read {} rows", read.row_count()));

    let source = SourceInfo {
        encoding: read.encoding,
        delimiter: read.delimiter,
        headers: read.headers,
        layout: options.layout,
    };
    (read.rows, read.unreadable, source)
}

fn aggregate(
    results: Vec<(usize, RowResult<RowDecode>)>,
    unreadable: Vec<(usize, RowError)>,
    source: Option<SourceInfo>,
    started_at: DateTime<Utc>,
) -> DecodeOutput {
    let mut diagnostics = DecodeDiagnostics::new(started_at);
    diagnostics.attempted = results.len() + unreadable.len();
    diagnostics.source = source;

    let mut rows = Vec::with_capacity(results.len());
    let mut skipped: Vec<SkippedRow> = unreadable
        .into_iter()
        .map(|(row, reason)| SkippedRow { row, reason })
        .collect();

    for (index, result) in results {
        match result {
            Ok(decoded) => {
                diagnostics
                    .issues
                    .extend(decoded.issues.into_iter().map(|issue| RowIssue { row: index, issue }));
                rows.push(decoded.row);
            }
            Err(reason) => skipped.push(SkippedRow { row: index, reason }),
        }
    }

    skipped.sort_by_key(|s| s.row);
    for s in &skipped {
        log_row_warning(s.row, format!("Skipped: {}", s.reason));
    }

    diagnostics.succeeded = rows.len();
    diagnostics.skipped = skipped;

    if rows.is_empty() && diagnostics.attempted > 0 {
        log_warning(format!("No rows decoded out of {}", diagnostics.attempted));
    } else {
        log_success(diagnostics.summary());
    }

    DecodeOutput { rows, diagnostics }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
