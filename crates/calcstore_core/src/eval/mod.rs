//! Arithmetic expression evaluator.
//!
//! # Responsibility
//! - Turn user text into a numeric value and its canonical result string.
//! - Report malformed or semantically invalid input as a typed fault.
//!
//! # Invariants
//! - Input is fully tokenized and parsed before any arithmetic runs.
//! - Work is bounded by `MAX_EXPRESSION_LEN` and `MAX_NESTING_DEPTH`;
//!   exceeding either is a syntax fault.
//! - Result text is a pure function of the input (locale-independent).
//! - No shared state; safe to call from any thread.

mod lexer;
mod parser;
mod program;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Longest accepted expression, in bytes.
pub const MAX_EXPRESSION_LEN: usize = 4096;
/// Deepest accepted nesting of parentheses and unary operators.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Coarse fault class used by callers that only care about the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Input is malformed or exceeds a work bound.
    Syntax,
    /// Input is well-formed but has no finite value.
    Evaluation,
}

/// Evaluator fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Malformed input; `offset` is the byte offset of the offending token.
    Syntax { offset: usize, message: String },
    DivisionByZero,
    /// A literal, intermediate, or final value is not finite.
    Overflow,
}

impl EvalError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Syntax { .. } => FaultKind::Syntax,
            Self::DivisionByZero | Self::Overflow => FaultKind::Evaluation,
        }
    }
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax { offset, message } => {
                write!(f, "syntax error at offset {offset}: {message}")
            }
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::Overflow => write!(f, "numeric overflow"),
        }
    }
}

impl Error for EvalError {}

/// Successful evaluation output.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    /// Canonical text, see [`format_value`].
    pub text: String,
}

/// Evaluates one arithmetic expression.
///
/// # Errors
/// - `EvalError::Syntax` for empty, malformed, oversized, or too deeply
///   nested input.
/// - `EvalError::DivisionByZero` / `EvalError::Overflow` for well-formed
///   input without a finite value.
pub fn evaluate(expression: &str) -> Result<Evaluation, EvalError> {
    if expression.len() > MAX_EXPRESSION_LEN {
        return Err(EvalError::syntax(
            MAX_EXPRESSION_LEN,
            format!("expression longer than {MAX_EXPRESSION_LEN} bytes"),
        ));
    }

    let tokens = lexer::tokenize(expression)?;
    let program = parser::compile(&tokens, expression.len())?;
    let value = program::execute(&program)?;

    Ok(Evaluation {
        value,
        text: format_value(value),
    })
}

/// Renders a finite value as canonical result text.
///
/// Integral values have no decimal point, other values use the shortest
/// decimal that round-trips. Negative zero renders as `0`.
pub fn format_value(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}
