//! Text rewrites applied to value literals before parsing.
//!
//! Every rewrite here only touches text *outside* quoted strings, so a post
//! mentioning "financial" or quoting `"nan"` is never altered.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

/// `np.float64(3.14)`, `numpy.int32(-2)`, `np.float64(nan)`.
static WRAPPER_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:np|numpy)\.u?(?:float|int)(?:8|16|32|64|128)?\(\s*([-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?|nan)\s*\)",
    )
    .expect("valid wrapper regex")
});

/// A string value that still looks like a wrapper call after parsing.
static RESIDUAL_WRAPPER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:np|numpy)\.[A-Za-z_]\w*\s*\(.*\)\s*$").expect("valid residual wrapper regex")
});

/// The number inside a residual wrapper.
static WRAPPED_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*([-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?)\s*\)").expect("valid number regex")
});

static NAN_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bnan\b").expect("valid nan regex"));

static STRICT_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:nan|NaN|None|True|False)\b").expect("valid token regex"));

// =============================================================================
// Bare-text rewrites
// =============================================================================

/// Replace wrapper calls with the number they wrap.
pub fn unwrap_wrappers(bare: &str) -> Cow<'_, str> {
    WRAPPER_CALL.replace_all(bare, "${1}")
}

/// Replace the bare `nan` token with `None`.
pub fn nan_to_none(bare: &str) -> Cow<'_, str> {
    NAN_TOKEN.replace_all(bare, "None")
}

/// `nan`/`None` → `null`, `True`/`False` → `true`/`false`.
pub fn strict_tokens(bare: &str) -> Cow<'_, str> {
    STRICT_TOKENS.replace_all(bare, |caps: &Captures| match &caps[0] {
        "True" => "true",
        "False" => "false",
        _ => "null",
    })
}

/// Apply `rewrite` to every span outside quotes, copying quoted spans verbatim.
///
/// Quotes are lexed the way the native literal grammar lexes them: a string
/// opens at `'` or `"` and closes at the next unescaped occurrence of the same
/// character.
pub fn rewrite_bare<F>(literal: &str, rewrite: F) -> String
where
    F: Fn(&str) -> Cow<'_, str>,
{
    let mut out = String::with_capacity(literal.len());
    let mut bare_start = 0;
    let mut iter = literal.char_indices();

    while let Some((i, c)) = iter.next() {
        if c != '\'' && c != '"' {
            continue;
        }
        out.push_str(&rewrite(&literal[bare_start..i]));

        let mut end = literal.len();
        while let Some((j, d)) = iter.next() {
            if d == '\\' {
                iter.next();
            } else if d == c {
                end = j + d.len_utf8();
                break;
            }
        }
        out.push_str(&literal[i..end]);
        bare_start = end;
    }

    out.push_str(&rewrite(&literal[bare_start..]));
    out
}

// =============================================================================
// Quote translation for the strict parser
// =============================================================================

/// Rewrite a single-quoted literal as strict JSON text.
///
/// Single-quoted spans become double-quoted. A `'` only closes a span when the
/// next non-space character is structural (`, : } ] )`) or the input ends, so
/// apostrophes inside values survive. Bare text goes through wrapper
/// unwrapping and [`strict_tokens`].
pub fn translate_quotes(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len() + 16);
    let mut bare_start = 0;
    let mut i = 0;

    while i < literal.len() {
        let rest = &literal[i..];
        let Some(c) = rest.chars().next() else { break };

        match c {
            '\'' | '"' => {
                flush_bare(&mut out, &literal[bare_start..i]);
                let body_start = i + 1;
                let body_end = if c == '\'' {
                    find_single_close(literal, body_start)
                } else {
                    find_double_close(literal, body_start)
                };

                match body_end {
                    Some(end) => {
                        push_json_string(&mut out, &literal[body_start..end], c);
                        i = end + 1;
                    }
                    None => {
                        // Unterminated: hand the remainder to the parser as is.
                        out.push_str(&literal[i..]);
                        i = literal.len();
                    }
                }
                bare_start = i;
            }
            _ => i += c.len_utf8(),
        }
    }

    flush_bare(&mut out, &literal[bare_start..]);
    out
}

fn flush_bare(out: &mut String, bare: &str) {
    let unwrapped = unwrap_wrappers(bare);
    out.push_str(&strict_tokens(&unwrapped));
}

/// Byte offset of the closing `'` for a span whose body starts at `from`.
fn find_single_close(literal: &str, from: usize) -> Option<usize> {
    let mut iter = literal[from..].char_indices();
    while let Some((offset, c)) = iter.next() {
        match c {
            '\\' => {
                iter.next();
            }
            '\'' => {
                let at = from + offset;
                let after = literal[at + 1..].trim_start();
                if after.is_empty() || after.starts_with([',', ':', '}', ']', ')']) {
                    return Some(at);
                }
            }
            _ => {}
        }
    }
    None
}

fn find_double_close(literal: &str, from: usize) -> Option<usize> {
    let mut iter = literal[from..].char_indices();
    while let Some((offset, c)) = iter.next() {
        match c {
            '\\' => {
                iter.next();
            }
            '"' => return Some(from + offset),
            _ => {}
        }
    }
    None
}

/// Emit `body` as a JSON string. Escapes JSON lacks are converted.
fn push_json_string(out: &mut String, body: &str, quote: char) {
    out.push('"');
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some('x') => out.push_str("\\u00"),
                Some(next @ ('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u')) => {
                    out.push('\\');
                    out.push(next);
                }
                Some(other) => {
                    out.push_str("\\\\");
                    out.push(other);
                }
                None => out.push_str("\\\\"),
            },
            '"' if quote == '\'' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }

    out.push('"');
}

// =============================================================================
// Residual wrappers
// =============================================================================

/// Whether a parsed string value still has wrapper-call shape.
pub fn is_residual_wrapper(value: &str) -> bool {
    RESIDUAL_WRAPPER.is_match(value)
}

/// The number inside a residual wrapper, or 0.0 when it cannot be isolated.
pub fn residual_wrapper_number(value: &str) -> f64 {
    WRAPPED_NUMBER
        .captures(value)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_wrappers() {
        assert_eq!(unwrap_wrappers("{'a': np.float64(3.14)}"), "{'a': 3.14}");
        assert_eq!(unwrap_wrappers("numpy.int64(-2)"), "-2");
        assert_eq!(unwrap_wrappers("np.float32(1e-3)"), "1e-3");
        assert_eq!(unwrap_wrappers("np.float64(nan)"), "nan");
        assert_eq!(unwrap_wrappers("np.uint8(7)"), "7");
        assert_eq!(unwrap_wrappers("np.array([1])"), "np.array([1])");
    }

    #[test]
    fn test_nan_token_only() {
        assert_eq!(nan_to_none("{'a': nan, 'b': [nan]}"), "{'a': None, 'b': [None]}");
        assert_eq!(nan_to_none("financial nanny"), "financial nanny");
    }

    #[test]
    fn test_rewrite_bare_skips_quoted_spans() {
        let literal = r#"{'topic': 'nan', "note": "np.float64(1.0) 'x'", 'v': nan}"#;
        let out = rewrite_bare(literal, |bare| nan_to_none(bare));
        assert_eq!(
            out,
            r#"{'topic': 'nan', "note": "np.float64(1.0) 'x'", 'v': None}"#
        );
    }

    #[test]
    fn test_rewrite_bare_handles_escaped_quotes() {
        let literal = r"{'a': 'it\'s nan', 'b': nan}";
        let out = rewrite_bare(literal, |bare| nan_to_none(bare));
        assert_eq!(out, r"{'a': 'it\'s nan', 'b': None}");
    }

    #[test]
    fn test_translate_quotes_keeps_apostrophes() {
        let literal = "{'text': 'O'Brien's claim', 'n': nan, 'ok': True}";
        assert_eq!(
            translate_quotes(literal),
            r#"{"text": "O'Brien's claim", "n": null, "ok": true}"#
        );
    }

    #[test]
    fn test_translate_quotes_escapes_inner_double_quotes() {
        let literal = r#"{'q': 'he said "no"', 'e': 'it\'s'}"#;
        assert_eq!(
            translate_quotes(literal),
            r#"{"q": "he said \"no\"", "e": "it's"}"#
        );
    }

    #[test]
    fn test_translate_quotes_passes_double_quoted() {
        let literal = r#"{"a": "x 'y' None", 'b': None, 'c': np.float64(2.5)}"#;
        assert_eq!(
            translate_quotes(literal),
            r#"{"a": "x 'y' None", "b": null, "c": 2.5}"#
        );
    }

    #[test]
    fn test_residual_wrapper() {
        assert!(is_residual_wrapper("np.float64(3.5)"));
        assert!(is_residual_wrapper(" numpy.float64(-1) "));
        assert!(!is_residual_wrapper("float64(3.5)"));
        assert!(!is_residual_wrapper("see np.float64(3.5) here"));

        assert_eq!(residual_wrapper_number("np.float64(3.5)"), 3.5);
        assert_eq!(residual_wrapper_number("np.float64(-1)"), -1.0);
        assert_eq!(residual_wrapper_number("np.float64(nan)"), 0.0);
        assert_eq!(residual_wrapper_number("np.datetime64('2024')"), 0.0);
    }
}
