//! Literal decoding.
//!
//! - `presentation`: pattern extraction of the presentation literal
//! - `strategy`: ordered strategy chain for the value literal
//! - `literal`: native structured-literal parser used by the chain
//! - `rewrite`: quote-aware text rewrites applied before parsing
//!
//! ## Usage Flow
//!
//! ```text
//! presentation literal → extract_presentation → PresentationRecord
//! value literal        → decode_value         → GenericFields → normalize
//! ```

pub mod literal;
pub mod presentation;
pub mod rewrite;
pub mod strategy;

pub use literal::parse_literal;
pub use presentation::{decode_presentation, extract_presentation};
pub use strategy::{
    decode_value, DecodeStrategy, NativeLiteralStrategy, StrategyChain, StrictJsonStrategy,
    DIAGNOSTIC_FIELD,
};
