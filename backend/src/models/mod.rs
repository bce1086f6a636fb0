//! Domain models for the export decoder.
//!
//! - [`PresentationRecord`] - title, ranked findings and actions, process status
//! - [`PostRecord`] - typed post fields plus an extension map for unknown keys
//! - [`DecodedRow`] - the pair emitted for every successfully decoded row
//! - [`GenericFields`] - untyped key/value output of the value decoder

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Untyped mapping produced by the value decoder before the schema is applied.
pub type GenericFields = Map<String, Value>;

// =============================================================================
// Presentation
// =============================================================================

/// One ranked finding of a fact-check presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFinding {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// One ranked recommendation of a fact-check presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub action: String,
    pub rationale: String,
}

/// Fixed-shape record recovered from the presentation literal.
///
/// `findings` and `actions` keep the order of the source literal; the order
/// is the ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationRecord {
    pub title: String,
    pub findings: Vec<KeyFinding>,
    pub actions: Vec<RecommendedAction>,
    pub process: String,
    pub status: String,
    pub message: Option<String>,
}

// =============================================================================
// Post
// =============================================================================

/// Every key of the fixed post schema.
pub const FIXED_FIELDS: &[&str] = &[
    "post_id",
    "text",
    "post_text",
    "user_name",
    "user_handle",
    "user_verified",
    "user_location",
    "user_description",
    "user_followers_count",
    "user_following_count",
    "user_statuses_count",
    "user_created_at",
    "post_created_at",
    "repost_count",
    "reply_count",
    "like_count",
    "quote_count",
    "impression_count",
    "bookmark_count",
    "priority_score",
    "engagement_score",
    "amplifiability_score",
    "urgency_score",
    "top_claims",
    "emotional_tone",
    "is_checkworthy",
    "has_checkworthy_claims",
];

/// Whether `name` belongs to the fixed post schema.
pub fn is_fixed_field(name: &str) -> bool {
    FIXED_FIELDS.contains(&name)
}

/// Typed post record.
///
/// Every fixed field always holds a value. Keys the schema does not know live
/// in the extension map, which never contains a fixed field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub post_id: String,
    pub text: String,
    /// Legacy alias of `text`.
    pub post_text: String,
    pub user_name: String,
    pub user_handle: String,
    pub user_verified: bool,
    pub user_location: String,
    pub user_description: String,
    pub user_followers_count: i64,
    pub user_following_count: i64,
    pub user_statuses_count: i64,
    pub user_created_at: String,
    pub post_created_at: String,
    pub repost_count: i64,
    pub reply_count: i64,
    pub like_count: i64,
    pub quote_count: i64,
    pub impression_count: i64,
    pub bookmark_count: i64,
    pub priority_score: f64,
    pub engagement_score: f64,
    pub amplifiability_score: f64,
    pub urgency_score: f64,
    pub top_claims: Vec<String>,
    pub emotional_tone: String,
    pub is_checkworthy: bool,
    pub has_checkworthy_claims: bool,

    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

impl PostRecord {
    /// Store an unknown key. Fixed schema names are refused and returned as `false`.
    pub fn insert_extension(&mut self, name: impl Into<String>, value: Value) -> bool {
        let name = name.into();
        if is_fixed_field(&name) {
            return false;
        }
        self.extensions.insert(name, value);
        true
    }

    /// Extension value by its original key, `None` when absent.
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.extensions.get(name)
    }

    pub fn extensions(&self) -> &BTreeMap<String, Value> {
        &self.extensions
    }

    /// Look up any attribute by name, fixed or extension.
    ///
    /// Unknown names read as `None` rather than an error.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        let value = match name {
            "post_id" => Value::from(self.post_id.as_str()),
            "text" => Value::from(self.text.as_str()),
            "post_text" => Value::from(self.post_text.as_str()),
            "user_name" => Value::from(self.user_name.as_str()),
            "user_handle" => Value::from(self.user_handle.as_str()),
            "user_verified" => Value::from(self.user_verified),
            "user_location" => Value::from(self.user_location.as_str()),
            "user_description" => Value::from(self.user_description.as_str()),
            "user_followers_count" => Value::from(self.user_followers_count),
            "user_following_count" => Value::from(self.user_following_count),
            "user_statuses_count" => Value::from(self.user_statuses_count),
            "user_created_at" => Value::from(self.user_created_at.as_str()),
            "post_created_at" => Value::from(self.post_created_at.as_str()),
            "repost_count" => Value::from(self.repost_count),
            "reply_count" => Value::from(self.reply_count),
            "like_count" => Value::from(self.like_count),
            "quote_count" => Value::from(self.quote_count),
            "impression_count" => Value::from(self.impression_count),
            "bookmark_count" => Value::from(self.bookmark_count),
            "priority_score" => Value::from(self.priority_score),
            "engagement_score" => Value::from(self.engagement_score),
            "amplifiability_score" => Value::from(self.amplifiability_score),
            "urgency_score" => Value::from(self.urgency_score),
            "top_claims" => Value::from(self.top_claims.clone()),
            "emotional_tone" => Value::from(self.emotional_tone.as_str()),
            "is_checkworthy" => Value::from(self.is_checkworthy),
            "has_checkworthy_claims" => Value::from(self.has_checkworthy_claims),
            other => return self.extensions.get(other).cloned(),
        };
        Some(value)
    }
}

// =============================================================================
// Decoded Row
// =============================================================================

/// The unit the decoder emits: one presentation paired with its post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRow {
    /// Zero-based data row index in the source table.
    pub row: usize,
    pub presentation: PresentationRecord,
    pub post: PostRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fixed_fields_cover_record() {
        let record = PostRecord::default();
        for name in FIXED_FIELDS {
            assert!(record.attribute(name).is_some(), "{} not resolvable", name);
        }
        assert_eq!(FIXED_FIELDS.len(), 27);
    }

    #[test]
    fn test_extension_never_shadows_fixed_field() {
        let mut record = PostRecord::default();
        assert!(!record.insert_extension("like_count", json!(99)));
        assert!(record.extension("like_count").is_none());
        assert_eq!(record.attribute("like_count"), Some(json!(0)));

        assert!(record.insert_extension("cluster_id", json!("c-7")));
        assert_eq!(record.extension("cluster_id"), Some(&json!("c-7")));
        assert_eq!(record.attribute("cluster_id"), Some(json!("c-7")));
    }

    #[test]
    fn test_missing_attribute_is_none() {
        let record = PostRecord::default();
        assert_eq!(record.attribute("not_a_field"), None);
        assert_eq!(record.extension("not_a_field"), None);
    }

    #[test]
    fn test_extensions_flatten_on_serialize() {
        let mut record = PostRecord::default();
        record.post_id = "p1".into();
        record.insert_extension("sentiment", json!(0.4));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["post_id"], "p1");
        assert_eq!(json["sentiment"], 0.4);
        assert!(json.get("extensions").is_none());
    }

    #[test]
    fn test_key_finding_serializes_type() {
        let finding = KeyFinding {
            kind: "claim".into(),
            description: "Misleading chart".into(),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "claim");
    }
}
