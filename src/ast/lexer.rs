//! Scans formula text into a flat token stream terminated by `Eof`.
//!
//! Lexical rules, in priority order:
//! - whitespace is skipped
//! - `(` `)` `,` are single-character tokens
//! - `+ - * / > < = !` start an operator; a directly following `=` is folded in
//! - `"` or `'` start a string; `\` keeps the next character literally
//! - `[` starts a field reference running to `]`, taken verbatim
//! - a digit starts a number (`[0-9.]+`, at most one decimal point)
//! - a letter or `_` starts an identifier, emitted as `Function` when the next
//!   non-blank character is `(`

use crate::error::LexError;
use log::debug;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    String(String),
    Identifier(String),
    Function(String),
    Operator(String),
    LParen,
    RParen,
    Comma,
    Field(String),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::String(s) => write!(f, "string \"{}\"", s),
            TokenKind::Identifier(s) => write!(f, "identifier '{}'", s),
            TokenKind::Function(s) => write!(f, "function '{}'", s),
            TokenKind::Operator(op) => write!(f, "'{}'", op),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Field(name) => write!(f, "field [{}]", name),
            TokenKind::Eof => write!(f, "end of formula"),
        }
    }
}

/// A classified lexical unit. `position` is the character offset of its first
/// character in the formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }
}

const OPERATOR_CHARS: &[char] = &['+', '-', '*', '/', '>', '<', '=', '!'];

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    /// Consumes the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        debug!("Tokenized {} tokens", tokens.len());
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let start = self.pos;

        let Some(ch) = self.bump() else {
            return Ok(Token::new(TokenKind::Eof, start));
        };

        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            ch if OPERATOR_CHARS.contains(&ch) => self.read_operator(ch),
            '"' | '\'' => self.read_string(ch, start)?,
            '[' => self.read_field(start)?,
            ch if ch.is_ascii_digit() => self.read_number(ch, start)?,
            ch if ch.is_ascii_alphabetic() || ch == '_' => self.read_identifier(ch),
            ch => {
                return Err(LexError::UnexpectedCharacter {
                    ch,
                    position: start,
                })
            }
        };

        Ok(Token::new(kind, start))
    }

    fn read_operator(&mut self, first: char) -> TokenKind {
        let mut op = String::from(first);
        if self.peek() == Some('=') {
            self.pos += 1;
            op.push('=');
        }
        TokenKind::Operator(op)
    }

    fn read_string(&mut self, quote: char, start: usize) -> Result<TokenKind, LexError> {
        let mut result = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '\\' => match self.bump() {
                    Some(escaped) => result.push(escaped),
                    None => break,
                },
                ch if ch == quote => return Ok(TokenKind::String(result)),
                ch => result.push(ch),
            }
        }
        Err(LexError::UnterminatedString { position: start })
    }

    fn read_field(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut name = String::new();
        while let Some(ch) = self.bump() {
            if ch == ']' {
                return Ok(TokenKind::Field(name));
            }
            name.push(ch);
        }
        Err(LexError::UnterminatedField { position: start })
    }

    fn read_number(&mut self, first: char, start: usize) -> Result<TokenKind, LexError> {
        let mut literal = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '.' {
                literal.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }

        // `1.2.3` is rejected here rather than leaking a NaN into evaluation.
        if literal.matches('.').count() > 1 {
            return Err(LexError::MalformedNumber {
                literal,
                position: start,
            });
        }

        literal
            .parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| LexError::MalformedNumber {
                literal,
                position: start,
            })
    }

    fn read_identifier(&mut self, first: char) -> TokenKind {
        let mut ident = String::from(first);
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.pos += 1;
            } else {
                break;
            }
        }

        self.skip_whitespace();
        if self.peek() == Some('(') {
            TokenKind::Function(ident)
        } else {
            TokenKind::Identifier(ident)
        }
    }
}

/// Tokenizes `formula`, terminating the stream with an `Eof` token.
pub fn tokenize(formula: &str) -> Result<Vec<Token>, LexError> {
    debug!("Tokenizing formula: {}", formula);
    Lexer::new(formula).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(formula: &str) -> Vec<TokenKind> {
        tokenize(formula)
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_arithmetic_tokens_with_positions() {
        let tokens = tokenize("2 + 3 * 4").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Number(2.0), 0),
                Token::new(TokenKind::Operator("+".to_string()), 2),
                Token::new(TokenKind::Number(3.0), 4),
                Token::new(TokenKind::Operator("*".to_string()), 6),
                Token::new(TokenKind::Number(4.0), 8),
                Token::new(TokenKind::Eof, 9),
            ]
        );
    }

    #[test]
    fn test_two_character_operators() {
        assert_eq!(
            kinds(">= <= == != = !"),
            vec![
                TokenKind::Operator(">=".to_string()),
                TokenKind::Operator("<=".to_string()),
                TokenKind::Operator("==".to_string()),
                TokenKind::Operator("!=".to_string()),
                TokenKind::Operator("=".to_string()),
                TokenKind::Operator("!".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_function_versus_identifier() {
        assert_eq!(
            kinds("SUM ([a]) total"),
            vec![
                TokenKind::Function("SUM".to_string()),
                TokenKind::LParen,
                TokenKind::Field("a".to_string()),
                TokenKind::RParen,
                TokenKind::Identifier("total".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes_keep_next_character() {
        assert_eq!(
            kinds(r#""say \"hi\"\n" 'it\'s'"#),
            vec![
                TokenKind::String("say \"hi\"n".to_string()),
                TokenKind::String("it's".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_field_names_are_verbatim() {
        assert_eq!(
            kinds("[First Name] [a\\b]"),
            vec![
                TokenKind::Field("First Name".to_string()),
                TokenKind::Field("a\\b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_decimal_number() {
        assert_eq!(kinds("12.5"), vec![TokenKind::Number(12.5), TokenKind::Eof]);
    }

    #[test]
    fn test_multiple_decimal_points_rejected() {
        assert_eq!(
            tokenize("1 + 1.2.3"),
            Err(LexError::MalformedNumber {
                literal: "1.2.3".to_string(),
                position: 4,
            })
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            tokenize("[a] @ 2"),
            Err(LexError::UnexpectedCharacter {
                ch: '@',
                position: 4
            })
        );
    }

    #[test]
    fn test_unterminated_literals() {
        assert_eq!(
            tokenize("CONCAT(\"abc"),
            Err(LexError::UnterminatedString { position: 7 })
        );
        assert_eq!(
            tokenize("[name"),
            Err(LexError::UnterminatedField { position: 0 })
        );
    }

    #[test]
    fn test_empty_input_yields_eof() {
        assert_eq!(kinds("   "), vec![TokenKind::Eof]);
    }
}
