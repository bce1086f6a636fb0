//! Export table reader with encoding and delimiter auto-detection.
//!
//! Turns the export file into [`RawRow`]s: one presentation literal and one
//! post literal per data row, with the column-role remap from
//! [`ColumnLayout`] already applied. Nothing downstream sees the header labels.

use std::path::Path;

use crate::config::DecodeOptions;
use crate::error::{RowError, SourceError, SourceResult};

/// The two literals of one data row, keyed by their actual role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Zero-based data row index (header excluded). Only fully empty lines are
    /// not data rows.
    pub index: usize,
    pub presentation: String,
    pub post: String,
}

impl RawRow {
    pub fn new(index: usize, presentation: impl Into<String>, post: impl Into<String>) -> Self {
        Self {
            index,
            presentation: presentation.into(),
            post: post.into(),
        }
    }
}

/// Result of reading an export with metadata
#[derive(Debug)]
pub struct ReadResult {
    /// Rows ready for decoding
    pub rows: Vec<RawRow>,
    /// Records the table reader rejected, by row index
    pub unreadable: Vec<(usize, RowError)>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers as labelled in the file
    pub headers: Vec<String>,
}

impl ReadResult {
    /// Data rows seen, readable or not.
    pub fn row_count(&self) -> usize {
        self.rows.len() + self.unreadable.len()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8, so this never fails.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let text = match encoding.to_lowercase().as_str() {
        // Latin-1 labels decode as windows-1252, the WHATWG mapping for them.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Read an export file.
///
/// The file is read in one call and released before parsing starts.
pub fn read_file<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> SourceResult<ReadResult> {
    let bytes = std::fs::read(path.as_ref())?;
    read_bytes(&bytes, options)
}

/// Read an export from raw bytes with encoding auto-detection.
pub fn read_bytes(bytes: &[u8], options: &DecodeOptions) -> SourceResult<ReadResult> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(SourceError::EmptyFile);
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    read_str(&content, encoding, options)
}

/// Read an already-decoded export.
pub fn read_str(content: &str, encoding: String, options: &DecodeOptions) -> SourceResult<ReadResult> {
    if content.trim().is_empty() {
        return Err(SourceError::EmptyFile);
    }

    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(content));
    if !delimiter.is_ascii() {
        return Err(SourceError::InvalidDelimiter(delimiter));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let (presentation_label, post_label) = options.resolved_columns();
    let presentation_idx = column_index(&headers, presentation_label)?;
    let post_idx = column_index(&headers, post_label)?;

    let mut rows = Vec::new();
    let mut unreadable = Vec::new();
    let mut index = 0;

    for record in reader.records() {
        match record {
            Ok(record) => {
                let cell = |i: usize| record.get(i).map(str::trim).unwrap_or("").to_string();
                rows.push(RawRow::new(index, cell(presentation_idx), cell(post_idx)));
            }
            Err(e) => unreadable.push((
                index,
                RowError::RowUnreadable {
                    message: e.to_string(),
                },
            )),
        }
        index += 1;
    }

    if rows.is_empty() && unreadable.is_empty() {
        return Err(SourceError::NoRows);
    }

    Ok(ReadResult {
        rows,
        unreadable,
        encoding,
        delimiter,
        headers,
    })
}

fn column_index(headers: &[String], label: &str) -> SourceResult<usize> {
    headers
        .iter()
        .position(|h| h == label)
        .ok_or_else(|| SourceError::MissingColumn(label.to_string()))
}
