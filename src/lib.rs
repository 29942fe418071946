//! Formula engine for calculated fields.
//!
//! Formulas such as `IF([score] >= 90, "A", "B")` are tokenized, parsed into
//! an [`ASTNode`] tree and evaluated asynchronously against a per-record
//! [`Context`]. `AI_*` functions reach an optional enrichment provider through
//! a cache and fall back to safe defaults when it is unavailable.

pub mod ast;
pub mod config;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod functions;

pub use ast::{tokenize, ASTNode, Context, Evaluator, Parser, Token, TokenKind, Value};
pub use config::EngineConfig;
pub use engine::{FormulaEngine, Validation};
pub use error::{EvalError, FormulaError, LexError, ParseError};

use log::warn;
use once_cell::sync::Lazy;

static DEFAULT_ENGINE: Lazy<FormulaEngine> = Lazy::new(|| {
    let config = EngineConfig::from_env().unwrap_or_else(|e| {
        warn!("Ignoring enrichment configuration: {}", e);
        EngineConfig::default()
    });
    FormulaEngine::new(config)
});

/// Process-wide engine configured from the `CALCFIELD_*` environment
/// variables on first use.
pub fn default_engine() -> &'static FormulaEngine {
    &DEFAULT_ENGINE
}

/// Parses and evaluates `formula` against `context` with the default engine.
pub async fn evaluate_formula(formula: &str, context: &Context) -> Result<Value, FormulaError> {
    default_engine().evaluate_formula(formula, context).await
}

/// Parses `formula` without evaluating it. Never fails.
pub fn validate_formula(formula: &str) -> Validation {
    default_engine().validate_formula(formula)
}

pub fn parse_formula(formula: &str) -> Result<ASTNode, FormulaError> {
    Parser::parse_formula(formula)
}
