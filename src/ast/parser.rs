//! Recursive descent over the token stream.
//!
//! ```text
//! formula        --> comparison EOF
//! comparison     --> additive ( (">" | "<" | ">=" | "<=" | "==" | "!=" | "=") additive )*
//! additive       --> multiplicative ( ("+" | "-") multiplicative )*
//! multiplicative --> unary ( ("*" | "/") unary )*
//! unary          --> ("+" | "-" | "!") unary | primary
//! primary        --> NUMBER | STRING | IDENTIFIER | FIELD | call | "(" comparison ")"
//! call           --> FUNCTION "(" ( comparison ( "," comparison )* )? ")"
//! ```

use crate::ast::lexer::{tokenize, Token, TokenKind};
use crate::ast::{ASTNode, Operator, UnaryOperator, Value};
use crate::error::{FormulaError, ParseError};
use log::{debug, trace};

pub struct FormulaParser {
    tokens: Vec<Token>,
    current: usize,
}

impl FormulaParser {
    /// Tokenizes and parses formula text.
    pub fn parse_formula(input: &str) -> Result<ASTNode, FormulaError> {
        debug!("Parsing formula: {}", input);
        let tokens = tokenize(input)?;
        Ok(Self::parse(tokens)?)
    }

    /// Builds the AST from a token stream produced by the lexer.
    pub fn parse(mut tokens: Vec<Token>) -> Result<ASTNode, ParseError> {
        if tokens.last().map(|token| &token.kind) != Some(&TokenKind::Eof) {
            let position = tokens.last().map_or(0, |token| token.position + 1);
            tokens.push(Token::new(TokenKind::Eof, position));
        }

        let mut parser = FormulaParser { tokens, current: 0 };
        let ast = parser.parse_comparison()?;

        if parser.peek().kind != TokenKind::Eof {
            return Err(parser.expected("end of formula"));
        }

        debug!("Parse result: {:?}", ast);
        Ok(ast)
    }

    fn peek(&self) -> &Token {
        // `parse` guarantees a trailing Eof, which is never consumed.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.current += 1;
        }
        token
    }

    fn expected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        ParseError::Expected {
            expected: expected.to_string(),
            found: token.kind.to_string(),
            position: token.position,
        }
    }

    fn expect(&mut self, kind: TokenKind, description: &str) -> Result<Token, ParseError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.expected(description))
        }
    }

    /// Operator symbol of the current token, if it is one of `accepted`.
    fn match_operator(&self, accepted: &[&str]) -> Option<String> {
        match &self.peek().kind {
            TokenKind::Operator(op) if accepted.contains(&op.as_str()) => Some(op.clone()),
            _ => None,
        }
    }

    fn parse_comparison(&mut self) -> Result<ASTNode, ParseError> {
        let mut node = self.parse_additive()?;

        while let Some(symbol) = self.match_operator(&[">", "<", ">=", "<=", "==", "!=", "="]) {
            self.advance();
            let operator = binary_operator(&symbol);
            let right = self.parse_additive()?;
            trace!("Comparison {}", operator);
            node = ASTNode::BinaryOperation {
                left: Box::new(node),
                operator,
                right: Box::new(right),
            };
        }

        Ok(node)
    }

    fn parse_additive(&mut self) -> Result<ASTNode, ParseError> {
        let mut node = self.parse_multiplicative()?;

        while let Some(symbol) = self.match_operator(&["+", "-"]) {
            self.advance();
            let operator = binary_operator(&symbol);
            let right = self.parse_multiplicative()?;
            node = ASTNode::BinaryOperation {
                left: Box::new(node),
                operator,
                right: Box::new(right),
            };
        }

        Ok(node)
    }

    fn parse_multiplicative(&mut self) -> Result<ASTNode, ParseError> {
        let mut node = self.parse_unary()?;

        while let Some(symbol) = self.match_operator(&["*", "/"]) {
            self.advance();
            let operator = binary_operator(&symbol);
            let right = self.parse_unary()?;
            node = ASTNode::BinaryOperation {
                left: Box::new(node),
                operator,
                right: Box::new(right),
            };
        }

        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<ASTNode, ParseError> {
        if let Some(symbol) = self.match_operator(&["+", "-", "!"]) {
            self.advance();
            let operator = match symbol.as_str() {
                "+" => UnaryOperator::Plus,
                "-" => UnaryOperator::Minus,
                _ => UnaryOperator::Not,
            };
            let operand = self.parse_unary()?;
            return Ok(ASTNode::UnaryOperation {
                operator,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ASTNode, ParseError> {
        let token = self.advance();
        trace!("Primary {:?}", token);

        match token.kind {
            TokenKind::Number(n) => Ok(ASTNode::Literal(Value::Number(n))),
            TokenKind::String(s) => Ok(ASTNode::Literal(Value::Text(s))),
            TokenKind::Identifier(ident) => Ok(ASTNode::Literal(match ident.as_str() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                // Bare words are text constants, not lookups.
                _ => Value::Text(ident),
            })),
            TokenKind::Field(name) => Ok(ASTNode::Field(name)),
            TokenKind::Function(name) => self.parse_function_call(name),
            TokenKind::LParen => {
                let inner = self.parse_comparison()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                position: token.position,
            }),
        }
    }

    fn parse_function_call(&mut self, name: String) -> Result<ASTNode, ParseError> {
        self.expect(TokenKind::LParen, &format!("'(' after {}", name))?;

        let mut args = Vec::new();
        if self.peek().kind == TokenKind::RParen {
            self.advance();
            return Ok(ASTNode::FunctionCall { name, args });
        }

        loop {
            args.push(self.parse_comparison()?);

            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                    if self.peek().kind == TokenKind::RParen {
                        return Err(self.expected("argument after ','"));
                    }
                }
                TokenKind::RParen => {
                    self.advance();
                    break;
                }
                _ => return Err(self.expected("',' or ')'")),
            }
        }

        debug!("Function call {} with {} args", name, args.len());
        Ok(ASTNode::FunctionCall { name, args })
    }
}

/// Only called with symbols the caller already matched against the grammar.
fn binary_operator(symbol: &str) -> Operator {
    Operator::try_from(symbol).unwrap_or(Operator::Equal)
}
