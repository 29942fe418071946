use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning formula text into tokens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedString { position: usize },
    #[error("Unterminated field reference starting at position {position}")]
    UnterminatedField { position: usize },
    #[error("Malformed number '{literal}' at position {position}")]
    MalformedNumber { literal: String, position: usize },
}

/// Errors raised while building the AST from a token stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Expected {expected} but found {found} at position {position}")]
    Expected {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("Unexpected token {found} at position {position}")]
    UnexpectedToken { found: String, position: usize },
}

/// Errors raised while walking an AST.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Division by zero")]
    DivisionByZero,
    /// The AST violates an invariant the parser guarantees.
    #[error("Malformed AST node: {0}")]
    MalformedNode(String),
    #[error("{name} failed: {message}")]
    Function { name: String, message: String },
}

/// Failures talking to the enrichment provider. Always absorbed by the AI
/// functions, which fall back to their documented default value.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Enrichment request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Enrichment provider responded with status {0}")]
    Status(u16),
    #[error("Enrichment provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Malformed enrichment response: {0}")]
    Malformed(String),
    #[error("No enrichment provider configured")]
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Environment variable {name} has invalid value '{value}'")]
    InvalidVar { name: String, value: String },
}

/// Everything `evaluate_formula` can reject with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("formula evaluation failed: {0}")]
    Eval(#[from] EvalError),
}
