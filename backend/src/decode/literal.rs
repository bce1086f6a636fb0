//! Parser for native structured literals.
//!
//! Accepts the dict/list/tuple/scalar literal syntax the export writer
//! produces (`{'a': [1, 2.5, None], "b": True}`) and yields a
//! [`serde_json::Value`]. It is not a general expression
//! grammar: no calls, no names other than `True`, `False` and `None`.

use serde_json::{Map, Number, Value};

use crate::error::{LiteralError, LiteralResult};

/// Nesting limit.
const MAX_DEPTH: usize = 128;

/// Parse one complete literal. Trailing non-whitespace is an error.
pub fn parse_literal(input: &str) -> LiteralResult<Value> {
    let mut parser = Parser { src: input, pos: 0 };
    let value = parser.value(0)?;
    parser.skip_ws();
    if parser.pos < input.len() {
        return Err(parser.error("trailing characters after literal"));
    }
    Ok(value)
}

/// Resolve backslash escapes inside a quoted string body.
///
/// Unknown escapes are kept verbatim, backslash included.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(width).collect();
                let decoded = (digits.len() == width)
                    .then(|| u32::from_str_radix(&digits, 16).ok())
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(ch) => {
                        out.push(ch);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(kind);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError::new(self.pos, message)
    }

    fn expect(&mut self, want: char) -> LiteralResult<()> {
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", want, c))),
            None => Err(self.error(format!("expected '{}', found end of input", want))),
        }
    }

    fn value(&mut self, depth: usize) -> LiteralResult<Value> {
        if depth > MAX_DEPTH {
            return Err(self.error("literal nested too deeply"));
        }
        self.skip_ws();
        match self.peek() {
            Some('{') => self.dict(depth),
            Some('[') => self.sequence(depth, ']').map(|(items, _)| Value::Array(items)),
            Some('(') => self.tuple(depth),
            Some('\'' | '"') => self.strings().map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.name(),
            Some(c) => Err(self.error(format!("unexpected character '{}'", c))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn dict(&mut self, depth: usize) -> LiteralResult<Value> {
        self.expect('{')?;
        let mut map = Map::new();

        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(Value::Object(map));
            }

            let key_pos = self.pos;
            let key = dict_key(self.value(depth + 1)?)
                .ok_or_else(|| LiteralError::new(key_pos, "dictionary key must be a scalar"))?;
            self.skip_ws();
            self.expect(':')?;
            let value = self.value(depth + 1)?;
            map.insert(key, value);

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                Some(c) => return Err(self.error(format!("expected ',' or '}}', found '{}'", c))),
                None => return Err(self.error("unterminated dictionary")),
            }
        }
    }

    /// Comma-separated values up to `close`. Also reports whether a comma was seen.
    fn sequence(&mut self, depth: usize, close: char) -> LiteralResult<(Vec<Value>, bool)> {
        self.bump();
        let mut items = Vec::new();
        let mut saw_comma = false;

        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                return Ok((items, saw_comma));
            }

            items.push(self.value(depth + 1)?);

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    saw_comma = true;
                    self.bump();
                }
                Some(c) if c == close => {}
                Some(c) => {
                    return Err(self.error(format!("expected ',' or '{}', found '{}'", close, c)))
                }
                None => return Err(self.error(format!("unterminated sequence, missing '{}'", close))),
            }
        }
    }

    /// `(x)` is a parenthesised value; `()`, `(x,)` and `(x, y)` are tuples.
    fn tuple(&mut self, depth: usize) -> LiteralResult<Value> {
        let (mut items, saw_comma) = self.sequence(depth, ')')?;
        if items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    /// One quoted string, plus any adjacent ones (`'a' "b"` is `"ab"`).
    fn strings(&mut self) -> LiteralResult<String> {
        let mut out = self.string()?;
        loop {
            let save = self.pos;
            self.skip_ws();
            if matches!(self.peek(), Some('\'' | '"')) {
                out.push_str(&self.string()?);
            } else {
                self.pos = save;
                return Ok(out);
            }
        }
    }

    fn string(&mut self) -> LiteralResult<String> {
        let start = self.pos;
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let body_start = self.pos;

        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                c if c == quote => {
                    let body = &self.src[body_start..self.pos - quote.len_utf8()];
                    return Ok(unescape(body));
                }
                _ => {}
            }
        }

        Err(LiteralError::new(start, "unterminated string"))
    }

    fn number(&mut self) -> LiteralResult<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }

        let mut digits = 0;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => digits += 1,
                '_' => {}
                '.' if !is_float => is_float = true,
                _ => break,
            }
            self.bump();
        }
        if digits == 0 {
            return Err(LiteralError::new(start, "expected a number"));
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('-' | '+')) {
                self.bump();
            }
            let exp_start = self.pos;
            while matches!(self.peek(), Some('0'..='9')) {
                self.bump();
            }
            if self.pos == exp_start {
                return Err(self.error("malformed exponent"));
            }
        }

        let text: String = self.src[start..self.pos].chars().filter(|&c| c != '_').collect();
        if !is_float {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::from(n));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError::new(start, format!("invalid number '{}'", text)))
    }

    fn name(&mut self) -> LiteralResult<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "True" => Ok(Value::Bool(true)),
            "False" => Ok(Value::Bool(false)),
            "None" => Ok(Value::Null),
            other => Err(LiteralError::new(start, format!("unexpected name '{}'", other))),
        }
    }
}

/// Dictionary keys become strings; containers cannot be keys.
fn dict_key(key: Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Null => Some("None".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_dict() {
        let value = parse_literal(
            "{'post_id': '123', \"counts\": [1, 2.5, -3], 'ok': True, 'gone': None}",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({"post_id": "123", "counts": [1, 2.5, -3], "ok": true, "gone": null})
        );
    }

    #[test]
    fn test_double_quoted_string_keeps_apostrophe() {
        let value = parse_literal(r#"{'text': "O'Brien's claim"}"#).unwrap();
        assert_eq!(value["text"], "O'Brien's claim");
    }

    #[test]
    fn test_escapes() {
        let value = parse_literal(r"'it\'s\n\x41é'").unwrap();
        assert_eq!(value, json!("it's\nAé"));
    }

    #[test]
    fn test_tuples_and_parentheses() {
        assert_eq!(parse_literal("(1, 2)").unwrap(), json!([1, 2]));
        assert_eq!(parse_literal("(1,)").unwrap(), json!([1]));
        assert_eq!(parse_literal("()").unwrap(), json!([]));
        assert_eq!(parse_literal("(7)").unwrap(), json!(7));
    }

    #[test]
    fn test_trailing_commas_and_adjacent_strings() {
        assert_eq!(parse_literal("['a', 'b',]").unwrap(), json!(["a", "b"]));
        assert_eq!(parse_literal("{'k': 'ab' \"cd\",}").unwrap(), json!({"k": "abcd"}));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_literal("1e3").unwrap(), json!(1000.0));
        assert_eq!(parse_literal(".5").unwrap(), json!(0.5));
        assert_eq!(parse_literal("1_000").unwrap(), json!(1000));
        assert_eq!(parse_literal("99999999999999999999").unwrap(), json!(1e20));
    }

    #[test]
    fn test_non_string_keys_are_stringified() {
        let value = parse_literal("{1: 'a', True: 'b'}").unwrap();
        assert_eq!(value, json!({"1": "a", "True": "b"}));
    }

    #[test]
    fn test_rejects_bare_names_and_calls() {
        let err = parse_literal("{'score': nan}").unwrap_err();
        assert!(err.message.contains("nan"));
        assert_eq!(err.offset, 10);

        assert!(parse_literal("{'score': np.float64(1.0)}").is_err());
    }

    #[test]
    fn test_rejects_broken_quoting() {
        assert!(parse_literal("{'text': 'O'Brien's claim'}").is_err());
        assert!(parse_literal("{'text': 'unterminated}").is_err());
    }

    #[test]
    fn test_rejects_trailing_input_and_empty() {
        assert!(parse_literal("{} {}").is_err());
        assert!(parse_literal("").is_err());
        assert!(parse_literal("   ").is_err());
    }

    #[test]
    fn test_depth_limit() {
        let deep = "[".repeat(MAX_DEPTH + 5);
        let err = parse_literal(&deep).unwrap_err();
        assert!(err.message.contains("deeply"));
    }
}
