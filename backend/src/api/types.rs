//! REST API types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::DecodedRow;
use crate::pipeline::{DecodeDiagnostics, DecodeOutput};

/// Response sent after an export upload is decoded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeResponse {
    /// Unique job identifier
    pub job_id: String,

    pub status: JobStatus,

    /// Decoded rows in source order
    pub rows: Vec<DecodedRow>,

    pub diagnostics: DecodeDiagnostics,
}

/// Overall outcome of a decode job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Every row decoded without defaults.
    Ready,
    /// Some rows skipped or fields defaulted.
    Warning,
    /// The source could not be read.
    Error,
}

impl JobStatus {
    pub fn of(diagnostics: &DecodeDiagnostics) -> Self {
        if diagnostics.is_source_unreadable() {
            JobStatus::Error
        } else if diagnostics.skipped.is_empty() && diagnostics.issues.is_empty() {
            JobStatus::Ready
        } else {
            JobStatus::Warning
        }
    }
}

impl From<DecodeOutput> for DecodeResponse {
    fn from(output: DecodeOutput) -> Self {
        DecodeResponse {
            job_id: Uuid::new_v4().to_string(),
            status: JobStatus::of(&output.diagnostics),
            rows: output.rows,
            diagnostics: output.diagnostics,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": JobStatus::Error,
        "error": error,
        "rows": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::pipeline::decode_rows;
    use crate::reader::RawRow;

    #[test]
    fn test_status_from_diagnostics() {
        let clean = decode_rows(vec![RawRow::new(
            0,
            "title='t' key_findings=F(findings=[]) recommended_actions=R(recommendations=[]) process='p' status='s'",
            "{'post_id': 'x'}",
        )]);
        assert_eq!(DecodeResponse::from(clean).status, JobStatus::Ready);

        let skipped = decode_rows(vec![RawRow::new(0, "", "garbage")]);
        assert_eq!(DecodeResponse::from(skipped).status, JobStatus::Warning);

        let unreadable = DecodeOutput::source_unreadable(&SourceError::EmptyFile);
        assert_eq!(DecodeResponse::from(unreadable).status, JobStatus::Error);
    }

    #[test]
    fn test_response_is_camel_case() {
        let response = DecodeResponse::from(decode_rows(vec![RawRow::new(0, "", "{'a': 1}")]));
        let json = serde_json::to_value(&response).unwrap();

        assert!(json["jobId"].is_string());
        assert_eq!(json["status"], "warning");
        assert_eq!(json["rows"][0]["post"]["a"], 1);
        assert_eq!(json["diagnostics"]["attempted"], 1);
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("No file provided");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "No file provided");
        assert!(body["rows"].as_array().unwrap().is_empty());
    }
}
