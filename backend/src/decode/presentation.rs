//! Presentation literal extraction.
//!
//! The presentation literal has a semi-fixed shape:
//!
//! ```text
//! title='…' key_findings=PostFindings(findings=[KeyFinding(type='…', description='…'), …])
//! recommended_actions=FactCheckerRecommendations(recommendations=[RecommendedAction(action='…', rationale='…'), …])
//! process='…' status='…' message=None
//! ```
//!
//! Each field is matched on its own against the whole literal, so order and
//! omissions in the source never affect unrelated fields. A missing field
//! becomes its default and is reported as a [`FieldIssue::FieldExtractionMiss`].

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::literal::unescape;
use crate::error::FieldIssue;
use crate::models::{KeyFinding, PresentationRecord, RecommendedAction};

/// A quoted value: `'…'` or `"…"`, closed by the same quote, escapes allowed.
/// Expands to two capture groups, one per quote style.
const QUOTED: &str = r#"(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#;

/// Block contents up to the closing `]`, skipping brackets inside quotes.
const BLOCK_BODY: &str = r#"((?:'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|[^\]'"])*)"#;

fn build(pattern: String) -> Regex {
    Regex::new(&format!("(?s){}", pattern)).expect("valid presentation regex")
}

static TITLE: Lazy<Regex> = Lazy::new(|| build(format!(r"\btitle\s*=\s*{}", QUOTED)));
static PROCESS: Lazy<Regex> = Lazy::new(|| build(format!(r"\bprocess\s*=\s*{}", QUOTED)));
static STATUS: Lazy<Regex> = Lazy::new(|| build(format!(r"\bstatus\s*=\s*{}", QUOTED)));
static MESSAGE: Lazy<Regex> =
    Lazy::new(|| build(format!(r"\bmessage\s*=\s*(?:(None)\b|{})", QUOTED)));

static FINDINGS_BLOCK: Lazy<Regex> = Lazy::new(|| {
    build(format!(
        r"\bkey_findings\s*=\s*\w+\(\s*findings\s*=\s*\[{}\]\s*\)",
        BLOCK_BODY
    ))
});
static FINDINGS_BLOCK_LOOSE: Lazy<Regex> = Lazy::new(|| {
    build(r"\bkey_findings\s*=\s*\w+\(\s*findings\s*=\s*\[(.*?)\]\s*\)".to_string())
});
static ACTIONS_BLOCK: Lazy<Regex> = Lazy::new(|| {
    build(format!(
        r"\brecommended_actions\s*=\s*\w+\(\s*recommendations\s*=\s*\[{}\]\s*\)",
        BLOCK_BODY
    ))
});
static ACTIONS_BLOCK_LOOSE: Lazy<Regex> = Lazy::new(|| {
    build(
        r"\brecommended_actions\s*=\s*\w+\(\s*recommendations\s*=\s*\[(.*?)\]\s*\)".to_string(),
    )
});

static KEY_FINDING: Lazy<Regex> = Lazy::new(|| {
    build(format!(
        r"KeyFinding\(\s*type\s*=\s*{q}\s*,\s*description\s*=\s*{q}\s*\)",
        q = QUOTED
    ))
});
static RECOMMENDED_ACTION: Lazy<Regex> = Lazy::new(|| {
    build(format!(
        r"RecommendedAction\(\s*action\s*=\s*{q}\s*,\s*rationale\s*=\s*{q}",
        q = QUOTED
    ))
});

/// The value of the quoted group pair starting at `group`, unescaped.
fn quoted(caps: &Captures, group: usize) -> Option<String> {
    caps.get(group)
        .or_else(|| caps.get(group + 1))
        .map(|m| unescape(m.as_str()))
}

fn scalar(re: &Regex, literal: &str) -> Option<String> {
    re.captures(literal).and_then(|caps| quoted(&caps, 1))
}

fn block<'a>(strict: &Regex, loose: &Regex, literal: &'a str) -> Option<&'a str> {
    strict
        .captures(literal)
        .or_else(|| loose.captures(literal))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Extract a presentation record. Never fails.
pub fn decode_presentation(literal: &str) -> PresentationRecord {
    extract_presentation(literal).0
}

/// Extract a presentation record and report which fields were missing.
pub fn extract_presentation(literal: &str) -> (PresentationRecord, Vec<FieldIssue>) {
    let mut misses = Vec::new();
    let mut miss = |field: &str| {
        misses.push(FieldIssue::FieldExtractionMiss {
            field: field.to_string(),
        })
    };

    let title = scalar(&TITLE, literal).unwrap_or_else(|| {
        miss("title");
        String::new()
    });

    let findings = match block(&FINDINGS_BLOCK, &FINDINGS_BLOCK_LOOSE, literal) {
        Some(body) => KEY_FINDING
            .captures_iter(body)
            .map(|caps| KeyFinding {
                kind: quoted(&caps, 1).unwrap_or_default(),
                description: quoted(&caps, 3).unwrap_or_default(),
            })
            .collect(),
        None => {
            miss("key_findings");
            Vec::new()
        }
    };

    let actions = match block(&ACTIONS_BLOCK, &ACTIONS_BLOCK_LOOSE, literal) {
        Some(body) => RECOMMENDED_ACTION
            .captures_iter(body)
            .map(|caps| RecommendedAction {
                action: quoted(&caps, 1).unwrap_or_default(),
                rationale: quoted(&caps, 3).unwrap_or_default(),
            })
            .collect(),
        None => {
            miss("recommended_actions");
            Vec::new()
        }
    };

    let process = scalar(&PROCESS, literal).unwrap_or_else(|| {
        miss("process");
        String::new()
    });

    let status = scalar(&STATUS, literal).unwrap_or_else(|| {
        miss("status");
        String::new()
    });

    let message = MESSAGE.captures(literal).and_then(|caps| {
        if caps.get(1).is_some() {
            None
        } else {
            quoted(&caps, 2)
        }
    });

    let record = PresentationRecord {
        title,
        findings,
        actions,
        process,
        status,
        message,
    };
    (record, misses)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE: &str = "title='Vaccine claim cluster' \
        key_findings=PostFindings(findings=[KeyFinding(type='misleading', description='Cherry-picked data'), \
        KeyFinding(type='false', description='Fabricated quote')]) \
        recommended_actions=FactCheckerRecommendations(recommendations=[RecommendedAction(action='Publish rebuttal', rationale='High reach'), \
        RecommendedAction(action='Monitor', rationale='Low urgency')]) \
        process='fact_check' status='completed' message=None";

    #[test]
    fn test_full_record_in_order() {
        let (record, misses) = extract_presentation(SINGLE);

        assert!(misses.is_empty());
        assert_eq!(record.title, "Vaccine claim cluster");
        assert_eq!(record.findings.len(), 2);
        assert_eq!(record.findings[0].kind, "misleading");
        assert_eq!(record.findings[1].description, "Fabricated quote");
        assert_eq!(record.actions[0].action, "Publish rebuttal");
        assert_eq!(record.actions[1].rationale, "Low urgency");
        assert_eq!(record.process, "fact_check");
        assert_eq!(record.status, "completed");
        assert_eq!(record.message, None);
    }

    #[test]
    fn test_double_and_single_quotes_decode_identically() {
        let double = SINGLE.replace('\'', "\"");
        assert_eq!(decode_presentation(&double), decode_presentation(SINGLE));
    }

    #[test]
    fn test_mixed_quotes_and_apostrophes() {
        let literal = r#"title="O'Brien's claim" key_findings=PostFindings(findings=[KeyFinding(type='quote', description="He didn't say 'that'")]) message='Needs review'"#;
        let record = decode_presentation(literal);

        assert_eq!(record.title, "O'Brien's claim");
        assert_eq!(record.findings[0].description, "He didn't say 'that'");
        assert_eq!(record.message.as_deref(), Some("Needs review"));
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let literal = "status='done' message='ok' process='p' \
            recommended_actions=X(recommendations=[RecommendedAction(action='a', rationale='r')]) \
            title='T' key_findings=Y(findings=[])";
        let (record, misses) = extract_presentation(literal);

        assert!(misses.is_empty());
        assert_eq!(record.title, "T");
        assert!(record.findings.is_empty());
        assert_eq!(record.actions.len(), 1);
        assert_eq!(record.status, "done");
    }

    #[test]
    fn test_missing_fields_default_and_are_reported() {
        let (record, misses) = extract_presentation("title='Only a title'");

        assert_eq!(record.title, "Only a title");
        assert!(record.findings.is_empty());
        assert!(record.actions.is_empty());
        assert_eq!(record.process, "");
        assert_eq!(record.message, None);

        let fields: Vec<String> = misses
            .iter()
            .map(|m| match m {
                FieldIssue::FieldExtractionMiss { field } => field.clone(),
                other => panic!("unexpected issue {:?}", other),
            })
            .collect();
        assert_eq!(
            fields,
            vec!["key_findings", "recommended_actions", "process", "status"]
        );
    }

    #[test]
    fn test_brackets_inside_descriptions() {
        let literal = "key_findings=PostFindings(findings=[KeyFinding(type='a', description='see [1])'), KeyFinding(type='b', description='ok')])";
        let record = decode_presentation(literal);

        assert_eq!(record.findings.len(), 2);
        assert_eq!(record.findings[0].description, "see [1])");
        assert_eq!(record.findings[1].kind, "b");
    }

    #[test]
    fn test_escaped_quotes_unescaped() {
        let record = decode_presentation(r"title='It\'s back' status='a\\b'");
        assert_eq!(record.title, "It's back");
        assert_eq!(record.status, "a\\b");
    }

    #[test]
    fn test_garbage_never_fails() {
        let record = decode_presentation("nan");
        assert_eq!(record, PresentationRecord::default());
    }
}
