//! Schema normalization: [`GenericFields`] → [`PostRecord`].
//!
//! Every coercion is total. A value that cannot be coerced becomes the class
//! default and is reported as [`FieldIssue::TypeCoercionFailure`]; absent and
//! null values default silently. Keys outside the fixed schema are copied
//! verbatim into the record's extension map.

use serde_json::Value;

use crate::decode::literal::parse_literal;
use crate::error::FieldIssue;
use crate::models::{GenericFields, PostRecord};

/// Normalized record plus the fields that had to be defaulted.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub record: PostRecord,
    pub issues: Vec<FieldIssue>,
}

/// Map generic fields onto the typed post schema.
pub fn normalize(fields: GenericFields) -> Normalized {
    let mut coercer = Coercer::default();
    let mut record = PostRecord::default();

    for (key, value) in fields {
        match key.as_str() {
            "post_id" => record.post_id = to_text(&value),
            "text" => record.text = to_text(&value),
            "post_text" => record.post_text = to_text(&value),
            "user_name" => record.user_name = to_text(&value),
            "user_handle" => record.user_handle = to_text(&value),
            "user_location" => record.user_location = to_text(&value),
            "user_description" => record.user_description = to_text(&value),
            "user_created_at" => record.user_created_at = to_text(&value),
            "post_created_at" => record.post_created_at = to_text(&value),
            "emotional_tone" => record.emotional_tone = to_text(&value),

            "user_followers_count" => record.user_followers_count = coercer.integer(&key, &value),
            "user_following_count" => record.user_following_count = coercer.integer(&key, &value),
            "user_statuses_count" => record.user_statuses_count = coercer.integer(&key, &value),
            "repost_count" => record.repost_count = coercer.integer(&key, &value),
            "reply_count" => record.reply_count = coercer.integer(&key, &value),
            "like_count" => record.like_count = coercer.integer(&key, &value),
            "quote_count" => record.quote_count = coercer.integer(&key, &value),
            "impression_count" => record.impression_count = coercer.integer(&key, &value),
            "bookmark_count" => record.bookmark_count = coercer.integer(&key, &value),

            "priority_score" => record.priority_score = coercer.float(&key, &value),
            "engagement_score" => record.engagement_score = coercer.float(&key, &value),
            "amplifiability_score" => record.amplifiability_score = coercer.float(&key, &value),
            "urgency_score" => record.urgency_score = coercer.float(&key, &value),

            "user_verified" => record.user_verified = coercer.boolean(&key, &value),
            "is_checkworthy" => record.is_checkworthy = coercer.boolean(&key, &value),
            "has_checkworthy_claims" => {
                record.has_checkworthy_claims = coercer.boolean(&key, &value)
            }

            "top_claims" => record.top_claims = coercer.string_list(&key, &value),

            _ => {
                record.insert_extension(key, value);
            }
        }
    }

    // Legacy alias: fill whichever of text/post_text is missing from the other.
    if record.text.is_empty() && !record.post_text.is_empty() {
        record.text = record.post_text.clone();
    } else if record.post_text.is_empty() && !record.text.is_empty() {
        record.post_text = record.text.clone();
    }

    Normalized {
        record,
        issues: coercer.issues,
    }
}

/// Stringify a value. Null is the empty string.
pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A value as a finite real number. Strings are trimmed and parsed.
fn to_real(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Parse a string as a list literal, native grammar first, then JSON.
fn parse_list(s: &str) -> Option<Vec<Value>> {
    if let Ok(Value::Array(items)) = parse_literal(s) {
        return Some(items);
    }
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Array(items)) => Some(items),
        _ => None,
    }
}

fn strings_of(items: &[Value]) -> Vec<String> {
    items.iter().map(to_text).collect()
}

/// Applies class coercions and remembers which ones fell back to a default.
#[derive(Debug, Default)]
struct Coercer {
    issues: Vec<FieldIssue>,
}

impl Coercer {
    fn failed(&mut self, field: &str, value: &Value) {
        self.issues.push(FieldIssue::TypeCoercionFailure {
            field: field.to_string(),
            value: to_text(value),
        });
    }

    fn integer(&mut self, field: &str, value: &Value) -> i64 {
        if value.is_null() {
            return 0;
        }
        match to_real(value) {
            Some(n) => n.trunc() as i64,
            None => {
                self.failed(field, value);
                0
            }
        }
    }

    fn float(&mut self, field: &str, value: &Value) -> f64 {
        if value.is_null() {
            return 0.0;
        }
        to_real(value).unwrap_or_else(|| {
            self.failed(field, value);
            0.0
        })
    }

    fn boolean(&mut self, field: &str, value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::String(s) if s.eq_ignore_ascii_case("true") => true,
            Value::String(s) if s.eq_ignore_ascii_case("false") => false,
            other => {
                self.failed(field, other);
                false
            }
        }
    }

    fn string_list(&mut self, field: &str, value: &Value) -> Vec<String> {
        match value {
            Value::Array(items) => strings_of(items),
            Value::Null => Vec::new(),
            Value::String(s) if s.trim().is_empty() => Vec::new(),
            Value::String(s) => match parse_list(s) {
                Some(items) => strings_of(&items),
                None => vec![s.clone()],
            },
            other => {
                self.failed(field, other);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FIXED_FIELDS;
    use serde_json::json;

    fn fields(value: Value) -> GenericFields {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fields must be an object"),
        }
    }

    #[test]
    fn test_every_fixed_field_is_consumed() {
        let all: GenericFields = FIXED_FIELDS
            .iter()
            .map(|name| (name.to_string(), Value::Null))
            .collect();
        let normalized = normalize(all);

        assert!(normalized.record.extensions().is_empty());
        assert!(normalized.issues.is_empty());
    }

    #[test]
    fn test_nan_integer_defaults_to_zero_silently() {
        let normalized = normalize(fields(json!({"like_count": null, "repost_count": 4})));
        assert_eq!(normalized.record.like_count, 0);
        assert_eq!(normalized.record.repost_count, 4);
        assert!(normalized.issues.is_empty());
    }

    #[test]
    fn test_empty_input_gives_defaults() {
        let normalized = normalize(GenericFields::new());
        assert_eq!(normalized.record, PostRecord::default());
        assert!(normalized.issues.is_empty());
    }

    #[test]
    fn test_class_coercions() {
        let normalized = normalize(fields(json!({
            "post_id": 12345,
            "user_verified": "TRUE",
            "is_checkworthy": true,
            "like_count": "338.0",
            "repost_count": 12.9,
            "priority_score": "0.5",
            "engagement_score": 3.14,
            "urgency_score": null,
            "user_name": null
        })));
        let r = normalized.record;

        assert_eq!(r.post_id, "12345");
        assert!(r.user_verified);
        assert!(r.is_checkworthy);
        assert_eq!(r.like_count, 338);
        assert_eq!(r.repost_count, 12);
        assert_eq!(r.priority_score, 0.5);
        assert_eq!(r.engagement_score, 3.14);
        assert_eq!(r.urgency_score, 0.0);
        assert_eq!(r.user_name, "");
        assert!(normalized.issues.is_empty());
    }

    #[test]
    fn test_uncoercible_values_default_and_report() {
        let normalized = normalize(fields(json!({
            "like_count": "many",
            "urgency_score": "nan",
            "user_verified": "yes",
            "top_claims": 7
        })));
        let r = &normalized.record;

        assert_eq!(r.like_count, 0);
        assert_eq!(r.urgency_score, 0.0);
        assert!(!r.user_verified);
        assert!(r.top_claims.is_empty());

        let failed: Vec<_> = normalized
            .issues
            .iter()
            .map(|i| match i {
                FieldIssue::TypeCoercionFailure { field, .. } => field.as_str(),
                other => panic!("unexpected issue {:?}", other),
            })
            .collect();
        assert_eq!(failed.len(), 4);
        assert!(failed.contains(&"like_count"));
        assert!(failed.contains(&"urgency_score"));
    }

    #[test]
    fn test_top_claims_forms() {
        let from_literal = normalize(fields(json!({"top_claims": "['claim one', 'claim two']"})));
        assert_eq!(from_literal.record.top_claims, vec!["claim one", "claim two"]);

        let from_json = normalize(fields(json!({"top_claims": "[\"a\", 2]"})));
        assert_eq!(from_json.record.top_claims, vec!["a", "2"]);

        let scalar = normalize(fields(json!({"top_claims": "just one claim"})));
        assert_eq!(scalar.record.top_claims, vec!["just one claim"]);

        let native = normalize(fields(json!({"top_claims": ["x", null, 3]})));
        assert_eq!(native.record.top_claims, vec!["x", "", "3"]);

        let empty = normalize(fields(json!({"top_claims": ""})));
        assert!(empty.record.top_claims.is_empty());
    }

    #[test]
    fn test_unknown_keys_go_to_extensions_verbatim() {
        let normalized = normalize(fields(json!({
            "post_id": "p1",
            "cluster_id": "338.0",
            "sentiment": {"label": "neg", "score": 0.9}
        })));
        let r = normalized.record;

        assert_eq!(r.extension("cluster_id"), Some(&json!("338.0")));
        assert_eq!(r.extension("sentiment"), Some(&json!({"label": "neg", "score": 0.9})));
        assert!(r.extension("post_id").is_none());
        assert_eq!(r.extensions().len(), 2);
    }

    #[test]
    fn test_text_alias_synthesized_from_either_side() {
        let legacy = normalize(fields(json!({"post_text": "legacy body"}))).record;
        assert_eq!(legacy.text, "legacy body");
        assert_eq!(legacy.post_text, "legacy body");

        let current = normalize(fields(json!({"text": "current body"}))).record;
        assert_eq!(current.post_text, "current body");
    }

    #[test]
    fn test_text_alias_both_present_kept_as_given() {
        let r = normalize(fields(json!({"text": "new", "post_text": "old"}))).record;
        assert_eq!(r.text, "new");
        assert_eq!(r.post_text, "old");
    }

    #[test]
    fn test_to_text() {
        assert_eq!(to_text(&json!(true)), "True");
        assert_eq!(to_text(&json!(3.0)), "3.0");
        assert_eq!(to_text(&json!(["a"])), r#"["a"]"#);
    }
}
