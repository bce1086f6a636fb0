//! Strategy chain for value literals.
//!
//! Each [`DecodeStrategy`] is a pure function from literal text to a mapping or
//! an explicit failure. [`StrategyChain`] tries them in order, stops at the
//! first success and otherwise reports every attempt.

use once_cell::sync::Lazy;
use serde_json::Value;

use super::literal::parse_literal;
use super::rewrite::{
    is_residual_wrapper, nan_to_none, residual_wrapper_number, rewrite_bare, translate_quotes,
    unwrap_wrappers,
};
use crate::error::{LiteralError, LiteralResult, RowError, RowResult, StrategyFailure};
use crate::models::GenericFields;

/// Nested score diagnostics the exporter embeds; not part of the post schema.
pub const DIAGNOSTIC_FIELD: &str = "priority_score_breakdown";

/// One way of turning a value literal into fields.
pub trait DecodeStrategy: Send + Sync + std::fmt::Debug {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Decode the literal, or explain why not.
    fn decode(&self, literal: &str) -> LiteralResult<GenericFields>;
}

/// Unwrap wrapper calls, turn `nan` into `None`, parse the native literal grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLiteralStrategy;

impl DecodeStrategy for NativeLiteralStrategy {
    fn name(&self) -> &'static str {
        "native-literal"
    }

    fn decode(&self, literal: &str) -> LiteralResult<GenericFields> {
        let normalized = rewrite_bare(literal, |bare| {
            let unwrapped = unwrap_wrappers(bare);
            nan_to_none(&unwrapped).into_owned().into()
        });
        into_mapping(parse_literal(&normalized)?)
    }
}

/// Translate quoting and tokens to strict JSON, parse with `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictJsonStrategy;

impl DecodeStrategy for StrictJsonStrategy {
    fn name(&self) -> &'static str {
        "strict-json"
    }

    fn decode(&self, literal: &str) -> LiteralResult<GenericFields> {
        let translated = translate_quotes(literal);
        let value: Value = serde_json::from_str(&translated)?;
        into_mapping(value)
    }
}

fn into_mapping(value: Value) -> LiteralResult<GenericFields> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(LiteralError::new(
            0,
            format!("expected a mapping, found {}", kind_of(&other)),
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Ordered strategies with short-circuit on first success.
#[derive(Debug)]
pub struct StrategyChain {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Native literal first, strict JSON second.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(NativeLiteralStrategy),
            Box::new(StrictJsonStrategy),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Decode a value literal and clean up the result.
    ///
    /// Fails with [`RowError::ValueLiteralUnparseable`] listing every attempt
    /// when no strategy succeeds.
    pub fn decode(&self, literal: &str) -> RowResult<GenericFields> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match strategy.decode(literal) {
                Ok(fields) => return Ok(post_process(fields)),
                Err(error) => attempts.push(StrategyFailure {
                    strategy: strategy.name().to_string(),
                    error,
                }),
            }
        }

        Err(RowError::ValueLiteralUnparseable { attempts })
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::standard()
    }
}

static STANDARD_CHAIN: Lazy<StrategyChain> = Lazy::new(StrategyChain::standard);

/// Decode a value literal with the standard chain.
pub fn decode_value(literal: &str) -> RowResult<GenericFields> {
    STANDARD_CHAIN.decode(literal)
}

/// Drop [`DIAGNOSTIC_FIELD`] and settle residual wrapper strings to numbers.
fn post_process(mut fields: GenericFields) -> GenericFields {
    fields.remove(DIAGNOSTIC_FIELD);
    for value in fields.values_mut() {
        settle_wrappers(value);
    }
    fields
}

fn settle_wrappers(value: &mut Value) {
    match value {
        Value::String(s) if is_residual_wrapper(s) => {
            let number = residual_wrapper_number(s);
            *value = Value::from(number);
        }
        Value::Array(items) => items.iter_mut().for_each(settle_wrappers),
        _ => {}
    }
}
