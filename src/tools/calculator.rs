//! `calculate`: arithmetic expression evaluation
//!
//! Accepts decimal numbers, `+ - * /`, parentheses and unary sign. Anything
//! else is rejected before evaluation.

use serde_json::{json, Value};

use crate::error::{RegistryError, ToolError};
use crate::mcp::registry::{Arguments, ToolRegistry};
use crate::tools::str_arg;

/// Deepest parenthesis / unary nesting accepted
const MAX_DEPTH: usize = 64;

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        "calculate",
        "Evaluate an arithmetic expression using numbers, + - * / and parentheses",
        &calculate_schema(),
        |args: &Arguments| {
            let expression = str_arg(args, "expression")?;
            let value = evaluate(expression)?;
            Ok(number_value(value))
        },
    )
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<f64, ToolError> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(ToolError::InvalidArgument("expression is empty".to_string()));
    }

    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr(0)?;
    if let Some(token) = parser.peek() {
        return Err(ToolError::InvalidArgument(format!(
            "unexpected {} after end of expression",
            token
        )));
    }
    if !value.is_finite() {
        return Err(ToolError::Failed("result is not a finite number".to_string()));
    }
    Ok(value)
}

/// Integral results become JSON integers so `20.0` renders as `20`
fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, ToolError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = literal.parse::<f64>().map_err(|_| {
                    ToolError::InvalidArgument(format!("invalid number '{}' at position {}", literal, pos))
                })?;
                tokens.push(Token::Number(number));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => {
                return Err(ToolError::InvalidArgument(format!(
                    "unsupported character '{}' at position {}; only numbers, + - * / and parentheses are allowed",
                    other, pos
                )))
            }
        };
        tokens.push(token);
        chars.next();
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self, depth: usize) -> Result<f64, ToolError> {
        let mut value = self.term(depth)?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term(depth)?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self, depth: usize) -> Result<f64, ToolError> {
        let mut value = self.factor(depth)?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor(depth)?;
            value = if op == Token::Star {
                value * rhs
            } else {
                if rhs == 0.0 {
                    return Err(ToolError::DivisionByZero);
                }
                value / rhs
            };
        }
        Ok(value)
    }

    // factor := ('+' | '-') factor | number | '(' expr ')'
    fn factor(&mut self, depth: usize) -> Result<f64, ToolError> {
        if depth > MAX_DEPTH {
            return Err(ToolError::InvalidArgument("expression is nested too deeply".to_string()));
        }

        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Minus) => Ok(-self.factor(depth + 1)?),
            Some(Token::Plus) => self.factor(depth + 1),
            Some(Token::LParen) => {
                let value = self.expr(depth + 1)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(ToolError::InvalidArgument("missing closing parenthesis".to_string())),
                }
            }
            Some(token) => Err(ToolError::InvalidArgument(format!("unexpected {}", token))),
            None => Err(ToolError::InvalidArgument("unexpected end of expression".to_string())),
        }
    }
}

fn calculate_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "expression": {
                "type": "string",
                "description": "Arithmetic expression, e.g. \"(2 + 3) * 4\""
            }
        },
        "required": ["expression"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("10 + 5 * 2").unwrap(), 20.0);
        assert_eq!(evaluate("(10 + 5) * 2").unwrap(), 30.0);
        assert_eq!(evaluate("2 - 3 - 4").unwrap(), -5.0);
        assert_eq!(evaluate("8 / 4 / 2").unwrap(), 1.0);
    }

    #[test]
    fn test_unary_and_decimals() {
        assert_eq!(evaluate("-3 + 5").unwrap(), 2.0);
        assert_eq!(evaluate("-(2 * 1.5)").unwrap(), -3.0);
        assert_eq!(evaluate("7 / 2").unwrap(), 3.5);
    }

    #[test]
    fn test_rejects_non_arithmetic() {
        for input in ["import os", "2 ** 3", "5 % 2", "__import__('os')", "1; 2", "x + 1"] {
            assert!(
                matches!(evaluate(input), Err(ToolError::InvalidArgument(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_malformed_expressions() {
        for input in ["", "   ", "(1 + 2", "1 +", "1 2", "()", "1..2"] {
            assert!(evaluate(input).is_err(), "accepted {:?}", input);
        }
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(evaluate("1 / (2 - 2)"), Err(ToolError::DivisionByZero)));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert!(evaluate(&deep).is_err());
        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(evaluate(&shallow).unwrap(), 1.0);
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(20.0).to_string(), "20");
        assert_eq!(number_value(3.5).to_string(), "3.5");
        assert_eq!(number_value(-4.0).to_string(), "-4");
    }
}
