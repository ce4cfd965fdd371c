//! Tokenizer for arithmetic expressions.
//!
//! # Invariants
//! - The whole input is tokenized before parsing starts.
//! - Offsets are byte offsets into the original input.

use super::EvalError;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
        .expect("valid number regex")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Token {
    /// Literal value. May be infinite for oversized literals; the executor
    /// reports that as overflow.
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Token {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Plus => "`+`",
            Self::Minus => "`-`",
            Self::Star => "`*`",
            Self::Slash => "`/`",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SpannedToken {
    pub token: Token,
    pub offset: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<SpannedToken>, EvalError> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while let Some(ch) = input[offset..].chars().next() {
        if ch.is_ascii_whitespace() {
            offset += 1;
            continue;
        }

        let token = match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '0'..='9' | '.' => {
                let literal = NUMBER_RE
                    .find(&input[offset..])
                    .map(|m| m.as_str())
                    .ok_or_else(|| EvalError::syntax(offset, "malformed number literal"))?;
                let value = literal.parse::<f64>().map_err(|_| {
                    EvalError::syntax(offset, format!("malformed number literal `{literal}`"))
                })?;
                tokens.push(SpannedToken {
                    token: Token::Number(value),
                    offset,
                });
                offset += literal.len();
                continue;
            }
            other => {
                return Err(EvalError::syntax(
                    offset,
                    format!("unexpected character `{}`", other.escape_default()),
                ));
            }
        };

        tokens.push(SpannedToken { token, offset });
        offset += ch.len_utf8();
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::{tokenize, Token};
    use crate::eval::EvalError;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn tokenizes_operators_and_literals() {
        assert_eq!(
            kinds("(1.5 + .5) * 2e1"),
            vec![
                Token::LParen,
                Token::Number(1.5),
                Token::Plus,
                Token::Number(0.5),
                Token::RParen,
                Token::Star,
                Token::Number(20.0),
            ]
        );
    }

    #[test]
    fn records_byte_offsets() {
        let tokens = tokenize("  7 /2").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![2, 4, 5]);
    }

    #[test]
    fn rejects_unknown_characters() {
        let err = tokenize("2 ^ 3").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { offset: 2, .. }));

        let err = tokenize("1 + x").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { offset: 4, .. }));
    }

    #[test]
    fn lone_dot_is_not_a_number() {
        let err = tokenize("1 + .").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { offset: 4, .. }));
    }

    #[test]
    fn oversized_literal_lexes_as_infinity() {
        assert_eq!(kinds("1e999"), vec![Token::Number(f64::INFINITY)]);
    }
}
