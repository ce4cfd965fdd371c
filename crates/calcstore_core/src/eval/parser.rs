//! Recursive-descent parser that compiles tokens into a postfix program.
//!
//! Grammar:
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := NUMBER | '(' expr ')'
//! ```
//!
//! # Invariants
//! - Recursion depth never exceeds `MAX_NESTING_DEPTH`.
//! - The full token stream must be consumed; trailing tokens are an error.

use super::lexer::{SpannedToken, Token};
use super::program::Instr;
use super::{EvalError, MAX_NESTING_DEPTH};

pub(crate) fn compile(
    tokens: &[SpannedToken],
    input_len: usize,
) -> Result<Vec<Instr>, EvalError> {
    if tokens.is_empty() {
        return Err(EvalError::syntax(0, "expression is empty"));
    }

    let mut parser = Parser {
        tokens,
        input_len,
        pos: 0,
        depth: 0,
        program: Vec::with_capacity(tokens.len()),
    };
    parser.expr()?;

    if let Some(extra) = parser.peek() {
        let message = match extra.token {
            Token::RParen => "unbalanced `)`".to_string(),
            other => format!("unexpected {} after complete expression", other.describe()),
        };
        return Err(EvalError::syntax(extra.offset, message));
    }

    Ok(parser.program)
}

struct Parser<'t> {
    tokens: &'t [SpannedToken],
    input_len: usize,
    pos: usize,
    depth: usize,
    program: Vec<Instr>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<SpannedToken> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<SpannedToken> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn enter(&mut self, offset: usize) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(EvalError::syntax(
                offset,
                format!("expression nests deeper than {MAX_NESTING_DEPTH} levels"),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn expr(&mut self) -> Result<(), EvalError> {
        self.term()?;
        while let Some(next) = self.peek() {
            let instr = match next.token {
                Token::Plus => Instr::Add,
                Token::Minus => Instr::Sub,
                _ => break,
            };
            self.pos += 1;
            self.term()?;
            self.program.push(instr);
        }
        Ok(())
    }

    fn term(&mut self) -> Result<(), EvalError> {
        self.unary()?;
        while let Some(next) = self.peek() {
            let instr = match next.token {
                Token::Star => Instr::Mul,
                Token::Slash => Instr::Div,
                _ => break,
            };
            self.pos += 1;
            self.unary()?;
            self.program.push(instr);
        }
        Ok(())
    }

    fn unary(&mut self) -> Result<(), EvalError> {
        let Some(next) = self.peek() else {
            return self.primary();
        };
        match next.token {
            Token::Minus | Token::Plus => {
                self.pos += 1;
                self.enter(next.offset)?;
                self.unary()?;
                self.leave();
                if next.token == Token::Minus {
                    self.program.push(Instr::Neg);
                }
                Ok(())
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<(), EvalError> {
        let Some(next) = self.bump() else {
            return Err(EvalError::syntax(self.input_len, "unexpected end of expression"));
        };

        match next.token {
            Token::Number(value) => {
                self.program.push(Instr::Push(value));
                Ok(())
            }
            Token::LParen => {
                self.enter(next.offset)?;
                self.expr()?;
                self.leave();
                match self.bump() {
                    Some(SpannedToken {
                        token: Token::RParen,
                        ..
                    }) => Ok(()),
                    Some(other) => Err(EvalError::syntax(
                        other.offset,
                        format!("expected `)` but found {}", other.token.describe()),
                    )),
                    None => Err(EvalError::syntax(next.offset, "unbalanced `(`")),
                }
            }
            other => Err(EvalError::syntax(
                next.offset,
                format!("unexpected {}", other.describe()),
            )),
        }
    }
}
