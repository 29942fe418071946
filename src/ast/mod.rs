use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

mod evaluator;
mod lexer;
mod parser;
mod registry;
mod value;

pub use evaluator::*;
pub use lexer::{tokenize, Lexer, Token, TokenKind};
pub use parser::FormulaParser as Parser;
pub use registry::*;
pub use value::*;

/// Immutable syntax tree for a parsed formula. Evaluation never mutates it, so
/// one tree can be evaluated against any number of contexts.
#[derive(Debug, Clone, PartialEq)]
pub enum ASTNode {
    /// Number, text or boolean constant.
    Literal(Value),
    /// `[name]` reference resolved against the evaluation context.
    Field(String),
    FunctionCall {
        name: String,
        args: Vec<ASTNode>,
    },
    BinaryOperation {
        left: Box<ASTNode>,
        operator: Operator,
        right: Box<ASTNode>,
    },
    UnaryOperation {
        operator: UnaryOperator,
        operand: Box<ASTNode>,
    },
}

impl ASTNode {
    /// Field names referenced anywhere in the tree, sorted and deduplicated.
    pub fn fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.visit(&mut |node| {
            if let ASTNode::Field(name) = node {
                fields.insert(name.clone());
            }
        });
        fields
    }

    /// Uppercased names of every function called in the tree.
    pub fn functions(&self) -> BTreeSet<String> {
        let mut functions = BTreeSet::new();
        self.visit(&mut |node| {
            if let ASTNode::FunctionCall { name, .. } = node {
                functions.insert(name.to_uppercase());
            }
        });
        functions
    }

    fn visit(&self, f: &mut impl FnMut(&ASTNode)) {
        f(self);
        match self {
            ASTNode::Literal(_) | ASTNode::Field(_) => {}
            ASTNode::FunctionCall { args, .. } => args.iter().for_each(|arg| arg.visit(f)),
            ASTNode::BinaryOperation { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            ASTNode::UnaryOperation { operand, .. } => operand.visit(f),
        }
    }
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            write!(f, "\\")?;
        }
        write!(f, "{}", ch)?;
    }
    write!(f, "\"")
}

/// Canonical formula text. Binary operations are fully parenthesised so the
/// output re-parses to an equivalent tree.
impl fmt::Display for ASTNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ASTNode::Literal(Value::Text(text)) => write_string_literal(f, text),
            ASTNode::Literal(Value::Number(n)) if *n < 0.0 => write!(f, "(-{})", -n),
            ASTNode::Literal(value) => write!(f, "{}", value),
            ASTNode::Field(name) => write!(f, "[{}]", name),
            ASTNode::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            ASTNode::BinaryOperation {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            ASTNode::UnaryOperation { operator, operand } => {
                write!(f, "{}{}", operator, operand)
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Equal,
    NotEqual,
}

impl Operator {
    /// Applies the operator to already evaluated operands.
    pub fn apply(&self, left: Value, right: Value) -> Result<Value, crate::error::EvalError> {
        match self {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
            Operator::Divide => left / right,
            Operator::GreaterThan => Ok(compare_with(&left, &right, Ordering::is_gt)),
            Operator::LessThan => Ok(compare_with(&left, &right, Ordering::is_lt)),
            Operator::GreaterThanOrEqual => Ok(compare_with(&left, &right, Ordering::is_ge)),
            Operator::LessThanOrEqual => Ok(compare_with(&left, &right, Ordering::is_le)),
            Operator::Equal => Ok(Value::Boolean(left.loose_eq(&right))),
            Operator::NotEqual => Ok(Value::Boolean(!left.loose_eq(&right))),
        }
    }

    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            Operator::Add | Operator::Subtract | Operator::Multiply | Operator::Divide
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanOrEqual => "<=",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
        }
    }
}

/// Unordered pairs (NaN involved) compare false for every ordering operator.
fn compare_with(left: &Value, right: &Value, accept: fn(Ordering) -> bool) -> Value {
    Value::Boolean(left.compare(right).is_some_and(accept))
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl TryFrom<&str> for Operator {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            ">" => Ok(Operator::GreaterThan),
            "<" => Ok(Operator::LessThan),
            ">=" => Ok(Operator::GreaterThanOrEqual),
            "<=" => Ok(Operator::LessThanOrEqual),
            // A bare `=` is accepted as equality.
            "==" | "=" => Ok(Operator::Equal),
            "!=" => Ok(Operator::NotEqual),
            _ => Err(format!("Unknown operator: {}", value)),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

impl UnaryOperator {
    pub fn apply(&self, operand: Value) -> Value {
        match self {
            UnaryOperator::Plus => Value::Number(operand.to_number()),
            UnaryOperator::Minus => Value::Number(-operand.to_number()),
            UnaryOperator::Not => Value::Boolean(!operand.is_truthy()),
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
        })
    }
}

impl TryFrom<&str> for UnaryOperator {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "+" => Ok(UnaryOperator::Plus),
            "-" => Ok(UnaryOperator::Minus),
            "!" => Ok(UnaryOperator::Not),
            _ => Err(format!("Unknown unary operator: {}", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_from_symbol() {
        assert_eq!(Operator::try_from("="), Ok(Operator::Equal));
        assert_eq!(Operator::try_from(">="), Ok(Operator::GreaterThanOrEqual));
        assert!(Operator::try_from("!").is_err());
        assert_eq!(UnaryOperator::try_from("!"), Ok(UnaryOperator::Not));
    }

    #[test]
    fn test_comparison_operators_on_raw_values() {
        let gt = Operator::GreaterThan;
        assert_eq!(
            gt.apply(Value::from("b"), Value::from("a")),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            gt.apply(Value::from("abc"), Value::from(1.0)),
            Ok(Value::Boolean(false))
        );
        assert_eq!(
            Operator::LessThanOrEqual.apply(Value::Null, Value::from(0.0)),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            Operator::NotEqual.apply(Value::from("5"), Value::from(5.0)),
            Ok(Value::Boolean(false))
        );
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(UnaryOperator::Minus.apply(Value::from("4")), Value::from(-4.0));
        assert_eq!(UnaryOperator::Plus.apply(Value::from(true)), Value::from(1.0));
        assert_eq!(UnaryOperator::Not.apply(Value::from("")), Value::from(true));
    }

    #[test]
    fn test_fields_and_functions_listing() {
        let ast = ASTNode::FunctionCall {
            name: "concat".to_string(),
            args: vec![
                ASTNode::Field("lastName".to_string()),
                ASTNode::FunctionCall {
                    name: "Upper".to_string(),
                    args: vec![ASTNode::Field("firstName".to_string())],
                },
                ASTNode::Field("lastName".to_string()),
            ],
        };
        assert_eq!(
            ast.fields().into_iter().collect::<Vec<_>>(),
            vec!["firstName".to_string(), "lastName".to_string()]
        );
        assert_eq!(
            ast.functions().into_iter().collect::<Vec<_>>(),
            vec!["CONCAT".to_string(), "UPPER".to_string()]
        );
    }

    #[test]
    fn test_display_is_canonical_formula_text() {
        let ast = ASTNode::BinaryOperation {
            left: Box::new(ASTNode::Literal(Value::from(2.0))),
            operator: Operator::Add,
            right: Box::new(ASTNode::BinaryOperation {
                left: Box::new(ASTNode::Field("qty".to_string())),
                operator: Operator::Multiply,
                right: Box::new(ASTNode::Literal(Value::from("say \"x\""))),
            }),
        };
        assert_eq!(ast.to_string(), r#"(2 + ([qty] * "say \"x\""))"#);
    }
}
