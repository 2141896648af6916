//! Calculator tool for restricted arithmetic

use async_trait::async_trait;
use sales_core::{Result, Tool, ToolResult};
use serde_json::{json, Value};
use thiserror::Error;

const ALLOWED_CHARS: &str = "0123456789+-*/(). ";
const MAX_DEPTH: usize = 64;

/// Evaluate a restricted arithmetic expression.
///
/// Only digits, `+ - * / ( ) .` and spaces are accepted. The result is
/// always text meant for the model, never an error.
pub fn calculate(expression: &str) -> String {
    match evaluate(expression) {
        Ok(text) | Err(text) => text,
    }
}

/// Result text on success, error text otherwise
fn evaluate(expression: &str) -> std::result::Result<String, String> {
    if !expression.chars().all(|c| ALLOWED_CHARS.contains(c)) {
        return Err("Calculation error: invalid characters in expression.".to_string());
    }
    if expression.contains("__") {
        return Err("Calculation error: potentially unsafe expression.".to_string());
    }

    Parser::new(expression)
        .parse()
        .map(|value| format!("Calculation result for '{}': {}", expression, format_number(value)))
        .map_err(|e| format!("Calculation error for '{}': {}", expression, e))
}

#[derive(Debug, Clone, PartialEq, Error)]
enum CalcError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected '{0}' at position {1}")]
    Unexpected(char, usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression is nested too deeply")]
    TooDeep,

    #[error("result is not a finite number")]
    NotFinite,
}

type CalcResult = std::result::Result<f64, CalcError>;

/// Recursive-descent parser over the expression bytes.
///
/// ```text
/// expr   := term (('+' | '-') term)*
/// term   := unary (('*' | '/' | '//') unary)*
/// unary  := ('+' | '-') unary | power
/// power  := atom ('**' unary)?
/// atom   := number | '(' expr ')'
/// ```
struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    fn parse(mut self) -> CalcResult {
        if self.peek().is_none() {
            return Err(CalcError::Empty);
        }
        let value = self.expr()?;
        match self.peek() {
            None => finite(value),
            Some(c) => Err(CalcError::Unexpected(c as char, self.pos)),
        }
    }

    fn peek(&mut self) -> Option<u8> {
        while self.src.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
        self.src.get(self.pos).copied()
    }

    fn peek_pair(&mut self, first: u8, second: u8) -> bool {
        self.peek() == Some(first) && self.src.get(self.pos + 1) == Some(&second)
    }

    fn expr(&mut self) -> CalcResult {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(b'+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(b'-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> CalcResult {
        let mut value = self.unary()?;
        loop {
            if self.peek_pair(b'/', b'/') {
                self.pos += 2;
                let rhs = self.unary()?;
                value = divide(value, rhs)?.floor();
            } else {
                match self.peek() {
                    Some(b'*') => {
                        self.pos += 1;
                        value *= self.unary()?;
                    }
                    Some(b'/') => {
                        self.pos += 1;
                        let rhs = self.unary()?;
                        value = divide(value, rhs)?;
                    }
                    _ => return Ok(value),
                }
            }
        }
    }

    fn unary(&mut self) -> CalcResult {
        self.nested(|p| match p.peek() {
            Some(b'-') => {
                p.pos += 1;
                Ok(-p.unary()?)
            }
            Some(b'+') => {
                p.pos += 1;
                p.unary()
            }
            _ => p.power(),
        })
    }

    fn power(&mut self) -> CalcResult {
        let base = self.atom()?;
        if self.peek_pair(b'*', b'*') {
            self.pos += 2;
            let exponent = self.unary()?;
            return finite(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> CalcResult {
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let value = self.nested(|p| p.expr())?;
                match self.peek() {
                    Some(b')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(c) => Err(CalcError::Unexpected(c as char, self.pos)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == b'.' => self.number(),
            Some(c) => Err(CalcError::Unexpected(c as char, self.pos)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> CalcResult {
        let start = self.pos;
        while let Some(&c) = self.src.get(self.pos) {
            if c.is_ascii_digit() || c == b'.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        text.parse::<f64>()
            .map_err(|_| CalcError::InvalidNumber(text))
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> CalcResult) -> CalcResult {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

fn divide(lhs: f64, rhs: f64) -> CalcResult {
    if rhs == 0.0 {
        return Err(CalcError::DivisionByZero);
    }
    Ok(lhs / rhs)
}

fn finite(value: f64) -> CalcResult {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalcError::NotFinite)
    }
}

/// Whole numbers print without a fractional part
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Calculator tool exposed to the expert model
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Performs mathematical calculations. Accepts digits, + - * / ( ) . and spaces (e.g., '(5000 * 12) * 0.9')"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "The arithmetic expression to evaluate"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let expression = input["expression"].as_str().ok_or_else(|| {
            sales_core::Error::ToolExecution("Missing 'expression' parameter".to_string())
        })?;

        tracing::debug!(expression = %expression, "Calculating");

        match evaluate(expression) {
            Ok(output) => Ok(ToolResult::success(output)),
            Err(output) => Ok(ToolResult::error(output)),
        }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(calculate("2+2"), "Calculation result for '2+2': 4");
        assert_eq!(calculate("2 + 3 * 4"), "Calculation result for '2 + 3 * 4': 14");
        assert_eq!(calculate("(2 + 3) * 4"), "Calculation result for '(2 + 3) * 4': 20");
        assert_eq!(calculate("7 / 2"), "Calculation result for '7 / 2': 3.5");
        assert_eq!(calculate("8000 * 12"), "Calculation result for '8000 * 12': 96000");
    }

    #[test]
    fn test_unary_power_and_floor_division() {
        assert_eq!(calculate("-3 + 5"), "Calculation result for '-3 + 5': 2");
        assert_eq!(calculate("--4"), "Calculation result for '--4': 4");
        assert_eq!(calculate("2**10"), "Calculation result for '2**10': 1024");
        assert_eq!(calculate("-2**2"), "Calculation result for '-2**2': -4");
        assert_eq!(calculate("7 // 2"), "Calculation result for '7 // 2': 3");
        assert_eq!(calculate(".5 * 4"), "Calculation result for '.5 * 4': 2");
    }

    #[test]
    fn test_rejected_characters() {
        assert_eq!(
            calculate("2+2; rm -rf"),
            "Calculation error: invalid characters in expression."
        );
        assert_eq!(
            calculate("import os"),
            "Calculation error: invalid characters in expression."
        );
    }

    #[test]
    fn test_evaluation_errors() {
        assert_eq!(calculate("1/0"), "Calculation error for '1/0': division by zero");
        assert_eq!(calculate(""), "Calculation error for '': empty expression");
        assert!(calculate("(1+2").contains("unexpected end"));
        assert!(calculate("1..2").contains("invalid number"));
        assert!(calculate("2 3").contains("unexpected '3'"));
        assert!(calculate("2***3").starts_with("Calculation error for"));
    }

    #[test]
    fn test_deep_nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(calculate(&deep).contains("nested too deeply"));

        let minus = "-".repeat(500) + "1";
        assert!(calculate(&minus).contains("nested too deeply"));
    }

    #[test]
    fn test_evaluate_separates_outcomes() {
        assert_eq!(evaluate("6*7"), Ok("Calculation result for '6*7': 42".to_string()));
        assert_eq!(
            evaluate("1/0"),
            Err("Calculation error for '1/0': division by zero".to_string())
        );
        assert!(evaluate("__").is_err());
    }

    #[tokio::test]
    async fn test_division_by_zero_is_tool_error() {
        let result = CalculatorTool::new()
            .execute(json!({"expression": "5 / (2 - 2)"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.output.contains("division by zero"));
    }

    #[tokio::test]
    async fn test_tool_execute() {
        let tool = CalculatorTool::new();
        let ok = tool.execute(json!({"expression": "2+2"})).await.unwrap();
        assert!(!ok.is_error);
        assert!(ok.output.contains('4'));

        let rejected = tool
            .execute(json!({"expression": "2+2; rm -rf"}))
            .await
            .unwrap();
        assert!(rejected.is_error);
        assert!(rejected.output.contains("invalid characters"));

        assert!(tool.execute(json!({})).await.is_err());
    }
}
